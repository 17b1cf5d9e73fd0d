//! Resource-state tracking and barrier batching (§4.5, §4.7).
//!
//! Two state tables exist. `global` persists across frames, keyed by the
//! physical resource the registry handed out — it is how a render target
//! that survives a resolution-stable frame boundary is known to already sit
//! in, say, `ShaderResource` rather than assumed `Common`. `list_local`
//! exists only for the command list currently being recorded and is
//! dropped wholesale at the end of `execute`; the first touch of a physical
//! resource within a list reads its starting state from `global`, and every
//! later touch in that same list reads `list_local`. Conceptually this
//! mirrors a dedicated patch-up command list that runs its barriers ahead
//! of the primary list and is then discarded — the trait surface in
//! `device.rs` only exposes one recorder, so here that list's barriers are
//! simply the first ones emitted on it.

use crate::device::PhysicalTexture;
use crate::error::{RenderGraphError, Result};
use crate::resource::{ResourceState, Subresource};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SubresourceStates {
    Uniform(ResourceState),
    PerSubresource(Vec<ResourceState>),
}

impl SubresourceStates {
    fn get(&self, index: u32) -> ResourceState {
        match self {
            SubresourceStates::Uniform(state) => *state,
            SubresourceStates::PerSubresource(states) => {
                states.get(index as usize).copied().unwrap_or(ResourceState::Unknown)
            }
        }
    }

    fn set(&mut self, index: u32, count: u32, state: ResourceState) {
        match self {
            SubresourceStates::Uniform(existing) if *existing == state => {}
            SubresourceStates::Uniform(existing) => {
                let mut expanded = vec![*existing; count.max(1) as usize];
                if let Some(slot) = expanded.get_mut(index as usize) {
                    *slot = state;
                }
                *self = SubresourceStates::PerSubresource(expanded);
            }
            SubresourceStates::PerSubresource(states) => {
                if (index as usize) < states.len() {
                    states[index as usize] = state;
                }
            }
        }
    }

    fn collapse_if_uniform(&mut self) {
        if let SubresourceStates::PerSubresource(states) = self {
            if let Some(&first) = states.first() {
                if states.iter().all(|&s| s == first) {
                    *self = SubresourceStates::Uniform(first);
                }
            }
        }
    }
}

/// A single transition to record on the command list, `before -> after` for
/// either the whole resource (`Subresource::All`) or one subresource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TransitionBarrier {
    pub resource: PhysicalTexture,
    pub subresource: Subresource,
    pub before: ResourceState,
    pub after: ResourceState,
}

/// Combines every access a dependency level makes to one subresource into
/// the single state it must end the level in. Invariant 4 (producers
/// strictly precede their readers) guarantees a level never mixes a write
/// with reads of the *same* subresource, so the only remaining ambiguity is
/// two reads that disagree, which is reported rather than silently
/// resolved (SPEC_FULL §D.1).
pub(crate) fn combine_level_state(resource: &str, states: &[ResourceState]) -> Result<ResourceState> {
    if states.is_empty() {
        return Ok(ResourceState::Common);
    }
    let writes: Vec<ResourceState> =
        states.iter().copied().filter(|s| s.is_exclusive_write()).collect();
    if let Some(&first) = writes.first() {
        if writes.iter().any(|&s| s != first) {
            return Err(RenderGraphError::StateTrackingFailure {
                resource: resource.to_string(),
                detail: "dependency level requests two different exclusive-write states".into(),
            });
        }
        return Ok(first);
    }
    let first = states[0];
    if states.iter().any(|&s| s != first) {
        return Err(RenderGraphError::StateTrackingFailure {
            resource: resource.to_string(),
            detail: "dependency level requests two incompatible read states".into(),
        });
    }
    Ok(first)
}

pub(crate) struct ResourceStateTracker {
    global: HashMap<PhysicalTexture, SubresourceStates>,
    list_local: HashMap<PhysicalTexture, SubresourceStates>,
}

impl ResourceStateTracker {
    pub(crate) fn new() -> Self {
        Self {
            global: HashMap::new(),
            list_local: HashMap::new(),
        }
    }

    /// Discards the per-list overlay; called once at the start of `execute`.
    pub(crate) fn begin_command_list(&mut self) {
        self.list_local.clear();
    }

    /// Promotes every resource touched this list into the persisted global
    /// table, so the next frame's first touch sees where this one left off.
    pub(crate) fn end_command_list(&mut self) {
        for (resource, state) in self.list_local.drain() {
            self.global.insert(resource, state);
        }
    }

    fn current_state(&self, resource: PhysicalTexture, subresource: u32) -> ResourceState {
        if let Some(state) = self.list_local.get(&resource) {
            return state.get(subresource);
        }
        self.global
            .get(&resource)
            .map(|s| s.get(subresource))
            .unwrap_or(ResourceState::Common)
    }

    /// Requests the whole resource (or one subresource) end this point in
    /// the list in `desired`, returning the (possibly batched) barriers
    /// needed to get there. A transition that is already satisfied is
    /// omitted.
    pub(crate) fn request(
        &mut self,
        resource: PhysicalTexture,
        subresource: Subresource,
        subresource_count: u32,
        desired: ResourceState,
    ) -> Vec<TransitionBarrier> {
        let count = subresource_count.max(1);
        let indices: Vec<u32> = match subresource {
            Subresource::All => (0..count).collect(),
            Subresource::Index(i) => vec![i],
        };

        let mut barriers = Vec::new();
        let all_whole_resource = matches!(subresource, Subresource::All) && count > 1;
        if all_whole_resource {
            let before_states: Vec<ResourceState> =
                indices.iter().map(|&i| self.current_state(resource, i)).collect();
            let uniform_before = before_states.iter().all(|&s| s == before_states[0]);
            if uniform_before && before_states[0] != desired {
                barriers.push(TransitionBarrier {
                    resource,
                    subresource: Subresource::All,
                    before: before_states[0],
                    after: desired,
                });
            } else if !uniform_before {
                for (&index, &before) in indices.iter().zip(before_states.iter()) {
                    if before != desired {
                        barriers.push(TransitionBarrier {
                            resource,
                            subresource: Subresource::Index(index),
                            before,
                            after: desired,
                        });
                    }
                }
            }
        } else {
            for &index in &indices {
                let before = self.current_state(resource, index);
                if before != desired {
                    barriers.push(TransitionBarrier {
                        resource,
                        subresource: Subresource::Index(index),
                        before,
                        after: desired,
                    });
                }
            }
        }

        let entry = self
            .list_local
            .entry(resource)
            .or_insert_with(|| SubresourceStates::Uniform(ResourceState::Common));
        for &index in &indices {
            entry.set(index, count, desired);
        }
        entry.collapse_if_uniform();

        barriers
    }

    pub(crate) fn forget(&mut self, resource: PhysicalTexture) {
        self.global.remove(&resource);
        self.list_local.remove(&resource);
    }
}
