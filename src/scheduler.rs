//! Declaration-phase bookkeeping (§4.3).
//!
//! `Scheduler` owns the slot maps backing every virtual resource, view and
//! render-target group declared this frame, and stamps every handle it
//! mints with the graph's current frame generation (`GraphId`). `reset`
//! clears the slot maps and advances the generation, so a handle captured
//! by a pass body from a previous frame is rejected as foreign rather than
//! silently resolved against the wrong data.
//!
//! `Scheduler` is re-exported and its handle-keyed lookups (`texture_desc`,
//! `texture_name`) are `pub`: a pass's execute callback is handed `&Scheduler`
//! alongside `&mut Registry` (spec §2), so both must be usable from outside
//! this crate. The declaration-time mutators (`create_texture` and friends)
//! stay crate-private since callers only reach them through `PassBuilder`.

use crate::handle::{GraphId, RenderTargetGroupSlot, ResourceSlot, ViewSlot};
use crate::resource::{
    RenderTargetGroupDesc, RenderTargetGroupHandle, TextureDesc, TextureHandle, ViewDesc,
    ViewHandle,
};
use slotmap::SlotMap;

pub(crate) struct ResourceSlotData {
    pub name: String,
    pub desc: TextureDesc,
    pub create_pass_idx: usize,
}

pub struct Scheduler {
    pub(crate) graph_id: GraphId,
    pub(crate) resources: SlotMap<ResourceSlot, ResourceSlotData>,
    pub(crate) views: SlotMap<ViewSlot, ViewDesc>,
    pub(crate) render_target_groups: SlotMap<RenderTargetGroupSlot, RenderTargetGroupDesc>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            graph_id: GraphId::next(),
            resources: SlotMap::with_key(),
            views: SlotMap::with_key(),
            render_target_groups: SlotMap::with_key(),
        }
    }

    /// Clears every declared resource/view/render-target group and advances
    /// the frame generation, invalidating every handle minted before this
    /// call. Two successive resets without any intervening declarations
    /// reproduce the same handle sequence (invariant 7), since slot maps are
    /// cleared rather than left to grow.
    pub(crate) fn reset(&mut self) {
        self.resources.clear();
        self.views.clear();
        self.render_target_groups.clear();
        self.graph_id = GraphId::next();
    }

    pub(crate) fn create_texture(
        &mut self,
        name: impl Into<String>,
        desc: TextureDesc,
        create_pass_idx: usize,
    ) -> TextureHandle {
        let slot = self.resources.insert(ResourceSlotData {
            name: name.into(),
            desc,
            create_pass_idx,
        });
        TextureHandle {
            slot,
            graph: self.graph_id,
        }
    }

    pub(crate) fn create_view(&mut self, desc: ViewDesc) -> ViewHandle {
        let slot = self.views.insert(desc);
        ViewHandle {
            slot,
            graph: self.graph_id,
        }
    }

    pub(crate) fn create_render_target(
        &mut self,
        desc: RenderTargetGroupDesc,
    ) -> RenderTargetGroupHandle {
        let slot = self.render_target_groups.insert(desc);
        RenderTargetGroupHandle {
            slot,
            graph: self.graph_id,
        }
    }

    /// Looks up a declared texture's descriptor by its public handle. A
    /// pass's execute callback receives `&Scheduler` alongside the
    /// `Registry` (spec §2) precisely so it can resolve a handle's
    /// descriptor without threading it through separately.
    pub fn texture_desc(&self, handle: TextureHandle) -> &TextureDesc {
        &self.resources[handle.slot].desc
    }

    /// Looks up a declared texture's diagnostic name by its public handle.
    pub fn texture_name(&self, handle: TextureHandle) -> &str {
        &self.resources[handle.slot].name
    }

    pub(crate) fn texture_name_by_slot(&self, slot: ResourceSlot) -> &str {
        &self.resources[slot].name
    }

    pub(crate) fn texture_desc_by_slot(&self, slot: ResourceSlot) -> &TextureDesc {
        &self.resources[slot].desc
    }
}
