//! Level-by-level pass execution (§4.7, §5).
//!
//! For every dependency level: batch and emit the resource-state
//! transitions every pass in the level needs before any of them runs, then
//! run each pass's execute callback in declaration order. A same-level pass
//! that is not the first to target `UnorderedAccess` on a resource gets a
//! UAV barrier recorded immediately before its own callback, so the barrier
//! actually sits between the two writers' commands on the recorded stream
//! (a state transition alone wouldn't order them, since the state doesn't
//! change) rather than in front of every callback in the level.

use crate::compiler::CompiledPlan;
use crate::device::{CommandRecorder, Device};
use crate::error::{RenderGraphError, Result};
use crate::graph::Pass;
use crate::handle::ResourceSlot;
use crate::registry::Registry;
use crate::resource::{ResourceState, Subresource};
use crate::scheduler::Scheduler;
use crate::scope::ViewData;
use crate::state_tracker::{combine_level_state, ResourceStateTracker};
use std::collections::HashMap;

pub(crate) fn execute_plan<D: Device, R: CommandRecorder>(
    plan: &CompiledPlan,
    scheduler: &Scheduler,
    registry: &mut Registry<D>,
    tracker: &mut ResourceStateTracker,
    mut passes: Vec<Pass<D, R>>,
    recorder: &mut R,
    view_data: ViewData,
) -> Result<()> {
    let render_resolution = (view_data.render_width, view_data.render_height);
    let viewport_resolution = (view_data.viewport_width, view_data.viewport_height);

    tracker.begin_command_list();
    recorder.open().map_err(RenderGraphError::recorder)?;

    for level in &plan.levels {
        let mut desired: HashMap<(ResourceSlot, u32), Vec<ResourceState>> = HashMap::new();
        for &pass_idx in &level.passes {
            let pass = &passes[pass_idx];
            for access in pass.reads.iter().chain(pass.writes.iter()) {
                let count = scheduler.texture_desc_by_slot(access.resource).subresource_count();
                let indices: Vec<u32> = match access.subresource {
                    Subresource::All => (0..count.max(1)).collect(),
                    Subresource::Index(i) => vec![i],
                };
                for index in indices {
                    desired.entry((access.resource, index)).or_default().push(access.state);
                }
            }
        }

        let mut barriers = Vec::new();
        for (&(resource_slot, subresource_index), states) in &desired {
            let name = scheduler.texture_name_by_slot(resource_slot);
            let target_state = combine_level_state(name, states)?;
            let desc = scheduler.texture_desc_by_slot(resource_slot);
            let physical = registry.resolve_texture(name, desc, render_resolution, viewport_resolution)?;
            let subresource_count = desc.subresource_count();
            barriers.extend(tracker.request(
                physical,
                Subresource::Index(subresource_index),
                subresource_count,
                target_state,
            ));
        }

        for barrier in barriers {
            recorder
                .transition(barrier.resource, barrier.before, barrier.after, barrier.subresource)
                .map_err(RenderGraphError::recorder)?;
        }
        recorder.flush_barriers().map_err(RenderGraphError::recorder)?;

        let mut last_uav_writer: HashMap<ResourceSlot, usize> = HashMap::new();
        for &pass_idx in &level.passes {
            let uav_resources: Vec<ResourceSlot> = passes[pass_idx]
                .writes
                .iter()
                .filter(|access| access.state == ResourceState::UnorderedAccess)
                .map(|access| access.resource)
                .collect();

            for resource in uav_resources {
                if let Some(&previous) = last_uav_writer.get(&resource) {
                    if previous != pass_idx {
                        let name = scheduler.texture_name_by_slot(resource);
                        let desc = scheduler.texture_desc_by_slot(resource);
                        let physical =
                            registry.resolve_texture(name, desc, render_resolution, viewport_resolution)?;
                        recorder.uav_barrier(physical).map_err(RenderGraphError::recorder)?;
                    }
                }
                last_uav_writer.insert(resource, pass_idx);
            }

            let pass = &mut passes[pass_idx];
            if let Some(execute) = pass.execute.take() {
                execute(&mut pass.scope, scheduler, registry, recorder)?;
            }
        }
    }

    recorder.close().map_err(RenderGraphError::recorder)?;
    tracker.end_command_list();
    Ok(())
}
