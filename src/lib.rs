mod arena;
mod compiler;
mod device;
mod error;
mod executor;
mod graph;
mod handle;
mod mesh_cache;
mod registry;
mod resource;
mod scheduler;
mod scope;
mod state_tracker;

pub use device::{
    CommandRecorder, Device, PhysicalRenderTargetGroup, PhysicalTexture, PhysicalView, QueueKind,
    Rect, ResolutionSource, SyncPoint,
};
pub use error::{RenderGraphError, Result};
pub use graph::{Graph, PassBuilder};
pub use handle::{RenderTargetGroupHandle, TextureHandle, ViewHandle};
pub use mesh_cache::{decode as decode_mesh_cache, encode as encode_mesh_cache, Mesh, Meshlet, Vertex};
pub use registry::Registry;
pub use resource::{
    ClearValue, Extent, Format, RenderTargetGroupDesc, ResourceState, Subresource, TextureDesc,
    TextureDimension, UsageFlags, ViewDesc, ViewKind, MAX_RENDER_TARGETS,
};
pub use scheduler::Scheduler;
pub use scope::{PassScope, ViewData};

pub use arena::FrameArena;
