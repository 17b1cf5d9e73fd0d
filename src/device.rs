//! External collaborator interfaces (§6). The core depends only on these
//! narrow traits; concrete D3D12/device-wrapper code lives entirely outside
//! this crate.

use crate::resource::{ResourceState, Subresource, TextureDesc, ViewDesc};

/// Opaque identifier for a realised physical texture. The registry is the
/// only thing that interprets these beyond equality/hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalTexture(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalView(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    Primary,
    AsyncCompute,
}

/// Opaque to the graph; produced by a recorder submission and consumed only
/// to defer resource release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SyncPoint {
    pub queue: QueueKind,
    pub value: u64,
}

/// Synchronous device operations the graph needs to realise virtual
/// resources into physical ones.
pub trait Device {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_texture(&self, desc: &TextureDesc) -> Result<PhysicalTexture, Self::Error>;
    fn create_view(
        &self,
        desc: &ViewDesc,
        texture: PhysicalTexture,
    ) -> Result<PhysicalView, Self::Error>;
    fn destroy(&self, resource: PhysicalTexture);
}

/// A group of up to eight colour views plus an optional depth-stencil view,
/// resolved to physical views, ready to be bound by `begin_render_pass`.
pub struct PhysicalRenderTargetGroup {
    pub colors: Vec<PhysicalView>,
    pub depth_stencil: Option<PhysicalView>,
}

/// Command-recording surface. All calls are synchronous from the graph's
/// point of view; a blocking `submit`/`wait` blocks the graph with it.
pub trait CommandRecorder {
    type Error: std::error::Error + Send + Sync + 'static;

    fn open(&mut self) -> Result<(), Self::Error>;
    fn close(&mut self) -> Result<(), Self::Error>;

    fn transition(
        &mut self,
        resource: PhysicalTexture,
        before: ResourceState,
        after: ResourceState,
        subresource: Subresource,
    ) -> Result<(), Self::Error>;
    fn uav_barrier(&mut self, resource: PhysicalTexture) -> Result<(), Self::Error>;
    fn flush_barriers(&mut self) -> Result<(), Self::Error>;

    fn begin_render_pass(
        &mut self,
        target_group: &PhysicalRenderTargetGroup,
    ) -> Result<(), Self::Error>;
    fn end_render_pass(&mut self) -> Result<(), Self::Error>;

    fn set_viewport(&mut self, rect: Rect) -> Result<(), Self::Error>;
    fn set_scissor(&mut self, rect: Rect) -> Result<(), Self::Error>;

    fn submit(&mut self) -> Result<SyncPoint, Self::Error>;
    fn wait(&mut self, sync: SyncPoint) -> Result<(), Self::Error>;
}

/// Current render/viewport resolutions and their dirty flags, consulted
/// once per compile.
pub trait ResolutionSource {
    fn render_resolution(&self) -> (u32, u32);
    fn viewport_resolution(&self) -> (u32, u32);
    fn render_resolution_dirty(&self) -> bool;
    fn viewport_resolution_dirty(&self) -> bool;
    fn clear_dirty_flags(&mut self);
}
