//! Virtual resource, view and render-target-group descriptors (§3).

use crate::handle::{RenderTargetGroupSlot, ResourceSlot, ViewSlot};
use bitflags::bitflags;
use smallvec::SmallVec;

pub const MAX_RENDER_TARGETS: usize = 8;

bitflags! {
    /// Allowed usage flags for a virtual texture; the registry rejects a
    /// request (as `ResourceUnavailable`) the device can't satisfy.
    pub struct UsageFlags: u32 {
        const RENDER_TARGET     = 0b0000_0001;
        const DEPTH_STENCIL     = 0b0000_0010;
        const SHADER_RESOURCE   = 0b0000_0100;
        const UNORDERED_ACCESS  = 0b0000_1000;
        const COPY_SOURCE       = 0b0001_0000;
        const COPY_DEST         = 0b0010_0000;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    Tex1d,
    Tex2d,
    Tex3d,
    Cube,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    D32Float,
    D24UnormS8Uint,
}

/// Width/height are resolved against the current frame resolution pair at
/// realisation time; `Fixed` opts a resource out of resolution tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extent {
    Render,
    Viewport,
    Fixed { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

#[derive(Clone, Copy, Debug)]
pub struct TextureDesc {
    pub dimension: TextureDimension,
    pub format: Format,
    pub extent: Extent,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: UsageFlags,
    pub clear_value: Option<ClearValue>,
}

impl TextureDesc {
    pub fn new_2d(format: Format, extent: Extent, usage: UsageFlags) -> Self {
        Self {
            dimension: TextureDimension::Tex2d,
            format,
            extent,
            mip_levels: 1,
            array_layers: 1,
            usage,
            clear_value: None,
        }
    }

    pub fn subresource_count(&self) -> u32 {
        self.mip_levels.max(1) * self.array_layers.max(1)
    }

    pub fn subresource_index(&self, mip: u32, array_slice: u32) -> u32 {
        mip * self.array_layers.max(1) + array_slice
    }
}

/// A single mip x array slice, or the whole resource. See GLOSSARY.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subresource {
    All,
    Index(u32),
}

/// Fixed usage-state enumeration a physical resource can occupy (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    RenderTarget,
    DepthWrite,
    DepthRead,
    ShaderResource,
    UnorderedAccess,
    CopySource,
    CopyDest,
    Present,
    Unknown,
}

impl ResourceState {
    /// Two read-only requests for the same resource within a dependency
    /// level combine into one transition when they name the same state;
    /// see SPEC_FULL §D.1.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            ResourceState::ShaderResource | ResourceState::DepthRead | ResourceState::CopySource
        )
    }

    pub fn is_exclusive_write(self) -> bool {
        matches!(
            self,
            ResourceState::RenderTarget
                | ResourceState::DepthWrite
                | ResourceState::UnorderedAccess
                | ResourceState::CopyDest
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    RenderTarget,
    DepthStencil,
    ShaderResource,
    UnorderedAccess,
}

#[derive(Clone, Copy, Debug)]
pub struct ViewDesc {
    pub kind: ViewKind,
    pub resource: TextureHandle,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_array_slice: u32,
    pub array_count: u32,
    pub srgb: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct RenderTargetGroupDesc {
    pub colors: SmallVec<[ViewHandle; MAX_RENDER_TARGETS]>,
    pub depth_stencil: Option<ViewHandle>,
}

pub use crate::handle::{RenderTargetGroupHandle, TextureHandle, ViewHandle};
