//! Typed handle plumbing.
//!
//! Virtual resources are addressed through `slotmap`-backed generation+index
//! keys rather than the bare monotonic ids the source engine used, so a
//! stale handle from a previous frame is detectable by generation mismatch
//! instead of relying on the graph's frame scope alone. Each `Graph`
//! instance additionally stamps every handle it hands out with a `GraphId`;
//! resolving a handle against the wrong graph is a `ForeignHandle` error
//! rather than undefined behaviour.

use slotmap::new_key_type;
use std::sync::atomic::{AtomicU64, Ordering};

new_key_type! {
    pub(crate) struct ResourceSlot;
    pub(crate) struct ViewSlot;
    pub(crate) struct RenderTargetGroupSlot;
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A handle to a virtual texture. Only interpretable by the `Graph` that
/// created it; see invariant 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub(crate) slot: ResourceSlot,
    pub(crate) graph: GraphId,
}

impl TextureHandle {
    pub(crate) fn slot(&self) -> ResourceSlot {
        self.slot
    }

    pub(crate) fn graph_id(&self) -> GraphId {
        self.graph
    }
}

/// A handle to a view onto a virtual texture (render-target, depth-stencil,
/// shader-resource or unordered-access).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewHandle {
    pub(crate) slot: ViewSlot,
    pub(crate) graph: GraphId,
}

impl ViewHandle {
    pub(crate) fn graph_id(&self) -> GraphId {
        self.graph
    }
}

/// A handle to a render-target group (up to eight colour views plus one
/// optional depth-stencil view).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetGroupHandle {
    pub(crate) slot: RenderTargetGroupSlot,
    pub(crate) graph: GraphId,
}
