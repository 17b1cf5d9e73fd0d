//! Top-level graph: pass declaration, compilation and execution (§4, §5).
//!
//! `Graph` is long-lived across frames so the `Registry`'s physical-resource
//! cache and the caller's `ResolutionSource` persist between them; only
//! `Scheduler` (declared resources) and the pass list are rebuilt every
//! frame, mirroring the teacher's closure-based declare API (`add_pass` /
//! `create` / `read` / `write` / `render`) from `rg/src/pass_builder.rs`.
//! Unlike the older Drop-finalised builder in the prototype `src/rg.rs`,
//! `render` consumes the builder directly — no self-referential bookkeeping
//! is needed since nothing here keeps a reference into the arena alive
//! across the declare/execute boundary (see DESIGN.md).

use crate::arena::FrameArena;
use crate::compiler::{self, CompiledPlan, PassDeclaration, ResourceAccess};
use crate::device::{CommandRecorder, Device, ResolutionSource};
use crate::error::{RenderGraphError, Result};
use crate::executor;
use crate::handle::ResourceSlot;
use crate::registry::Registry;
use crate::resource::{
    RenderTargetGroupDesc, RenderTargetGroupHandle, ResourceState, Subresource, TextureDesc,
    TextureHandle, ViewDesc, ViewHandle,
};
use crate::scheduler::Scheduler;
use crate::scope::{PassScope, ViewData};
use crate::state_tracker::ResourceStateTracker;

pub(crate) type ExecuteFn<D, R> =
    Box<dyn FnOnce(&mut PassScope, &Scheduler, &mut Registry<D>, &mut R) -> Result<()>>;

pub(crate) struct Pass<D: Device, R: CommandRecorder> {
    pub(crate) name: String,
    pub(crate) reads: Vec<ResourceAccess>,
    pub(crate) writes: Vec<ResourceAccess>,
    pub(crate) scope: PassScope,
    pub(crate) execute: Option<ExecuteFn<D, R>>,
}

/// A pass's signature is what `Graph::compile` compares frame-to-frame to
/// decide whether the previous compiled plan can be reused (SPEC_FULL §D,
/// mirroring `RenderGraph::GraphDirty` in the source). Resource *names*
/// stand in for handles here since handles themselves don't survive a
/// `Scheduler::reset`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PassSignature {
    name: String,
    reads: Vec<(String, Subresource, ResourceStateKey)>,
    writes: Vec<(String, Subresource, ResourceStateKey)>,
}

// `ResourceState` isn't `Hash`/`Eq`-derived beyond PartialEq+Eq which it
// already has; this alias just documents intent at the call site.
type ResourceStateKey = ResourceState;

/// A frame-scoped, declarative scheduler over virtual resources.
///
/// `Graph` owns the frame arena, the per-frame resource scheduler, the
/// cross-frame physical-resource registry, and the cross-submission
/// resource-state tracker. It is generic over the host's `Device` and
/// `CommandRecorder` implementations, per §6 — the core never depends on
/// anything else.
pub struct Graph<D: Device, R: CommandRecorder> {
    arena: FrameArena,
    scheduler: Scheduler,
    registry: Registry<D>,
    tracker: ResourceStateTracker,
    passes: Vec<Pass<D, R>>,
    view_data: ViewData,
    plan: Option<CompiledPlan>,
    last_signature: Option<Vec<PassSignature>>,
    cached_plan: Option<CompiledPlan>,
}

impl<D: Device, R: CommandRecorder> Graph<D, R> {
    pub fn new(device: D, arena_capacity_bytes: usize) -> Self {
        Self {
            arena: FrameArena::new(arena_capacity_bytes),
            scheduler: Scheduler::new(),
            registry: Registry::new(device),
            tracker: ResourceStateTracker::new(),
            passes: Vec::new(),
            view_data: ViewData::default(),
            plan: None,
            last_signature: None,
            cached_plan: None,
        }
    }

    pub fn device(&self) -> &D {
        self.registry.device()
    }

    /// Clears the previous frame's declared resources and passes and primes
    /// `PassScope::get::<ViewData>()` with the current resolution pair.
    /// Must be called once before any `add_pass` this frame.
    pub fn begin_frame(&mut self, resolution: &dyn ResolutionSource) {
        self.arena.reset();
        self.scheduler.reset();
        self.passes.clear();
        self.view_data = ViewData {
            render_width: resolution.render_resolution().0,
            render_height: resolution.render_resolution().1,
            viewport_width: resolution.viewport_resolution().0,
            viewport_height: resolution.viewport_resolution().1,
        };
    }

    /// Begins declaring a new pass. The returned builder borrows `self`
    /// mutably, so only one pass can be mid-declaration at a time.
    pub fn add_pass(&mut self, name: impl Into<String>) -> Result<PassBuilder<'_, D, R>> {
        let name = name.into();
        if self.passes.iter().any(|p| p.name == name) {
            return Err(RenderGraphError::DuplicatePassName(name));
        }
        let scope = PassScope::new(self.view_data);
        Ok(PassBuilder {
            graph: self,
            name,
            reads: Vec::new(),
            writes: Vec::new(),
            scope,
        })
    }

    fn signature(&self) -> Vec<PassSignature> {
        self.passes
            .iter()
            .map(|pass| PassSignature {
                name: pass.name.clone(),
                reads: pass
                    .reads
                    .iter()
                    .map(|a| {
                        (
                            self.scheduler.texture_name_by_slot(a.resource).to_string(),
                            a.subresource,
                            a.state,
                        )
                    })
                    .collect(),
                writes: pass
                    .writes
                    .iter()
                    .map(|a| {
                        (
                            self.scheduler.texture_name_by_slot(a.resource).to_string(),
                            a.subresource,
                            a.state,
                        )
                    })
                    .collect(),
            })
            .collect()
    }

    /// Builds (or reuses) the topological order and dependency-level
    /// partition for this frame's declared passes.
    pub fn compile(&mut self) -> Result<()> {
        let signature = self.signature();
        if self.last_signature.as_ref() == Some(&signature) {
            if let Some(plan) = &self.cached_plan {
                self.plan = Some(plan.clone());
                return Ok(());
            }
        }

        let declarations: Vec<PassDeclaration<'_>> = self
            .passes
            .iter()
            .map(|pass| PassDeclaration {
                name: &pass.name,
                reads: &pass.reads,
                writes: &pass.writes,
            })
            .collect();

        let scheduler = &self.scheduler;
        let plan = compiler::compile(&declarations, |slot| {
            scheduler.texture_desc_by_slot(slot).subresource_count()
        })?;
        log::debug!(
            "graph: recompiled {} passes into {} dependency levels",
            self.passes.len(),
            plan.levels.len()
        );

        self.cached_plan = Some(plan.clone());
        self.last_signature = Some(signature);
        self.plan = Some(plan);
        Ok(())
    }

    /// Runs every declared pass in dependency-level order, batching
    /// resource-state transitions ahead of each level, then releases any
    /// physical resource no longer declared this frame.
    pub fn execute(&mut self, recorder: &mut R, resolution: &mut dyn ResolutionSource) -> Result<()> {
        let plan = self
            .plan
            .take()
            .ok_or_else(|| RenderGraphError::StateTrackingFailure {
                resource: "<graph>".into(),
                detail: "execute called before compile".into(),
            })?;

        let passes = std::mem::take(&mut self.passes);
        let result = executor::execute_plan(
            &plan,
            &self.scheduler,
            &mut self.registry,
            &mut self.tracker,
            passes,
            recorder,
            self.view_data,
        );

        let keep: Vec<&str> = self
            .scheduler
            .resources
            .values()
            .map(|data| data.name.as_str())
            .collect();
        self.registry.retain(&keep);
        resolution.clear_dirty_flags();

        result
    }
}

/// Accumulates one pass's declared reads/writes/creates until `render`
/// finalises it into the owning `Graph`.
pub struct PassBuilder<'g, D: Device, R: CommandRecorder> {
    graph: &'g mut Graph<D, R>,
    name: String,
    reads: Vec<ResourceAccess>,
    writes: Vec<ResourceAccess>,
    scope: PassScope,
}

impl<'g, D: Device, R: CommandRecorder> PassBuilder<'g, D, R> {
    fn check_handle_slot(&self, graph_id: crate::handle::GraphId) -> Result<()> {
        if graph_id != self.graph.scheduler.graph_id {
            return Err(RenderGraphError::ForeignHandle {
                pass: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn create(&mut self, name: impl Into<String>, desc: TextureDesc) -> TextureHandle {
        let pass_idx = self.graph.passes.len();
        self.graph.scheduler.create_texture(name, desc, pass_idx)
    }

    pub fn create_view(&mut self, desc: ViewDesc) -> Result<ViewHandle> {
        self.check_handle_slot(desc.resource.graph_id())?;
        Ok(self.graph.scheduler.create_view(desc))
    }

    /// Groups up to eight colour view handles and an optional depth-stencil
    /// view handle into one render-target binding. Every handle in `desc`
    /// is checked against this graph's `GraphId`, exactly like `read`,
    /// `write` and `create_view`, so a stale or foreign `ViewHandle` smuggled
    /// into a render-target group is caught here too.
    pub fn create_render_target(
        &mut self,
        desc: RenderTargetGroupDesc,
    ) -> Result<RenderTargetGroupHandle> {
        for color in &desc.colors {
            self.check_handle_slot(color.graph_id())?;
        }
        if let Some(depth_stencil) = desc.depth_stencil {
            self.check_handle_slot(depth_stencil.graph_id())?;
        }
        Ok(self.graph.scheduler.create_render_target(desc))
    }

    /// Declares a read of `handle` in `state`, over `subresource`.
    pub fn read(
        &mut self,
        handle: TextureHandle,
        state: ResourceState,
        subresource: Subresource,
    ) -> Result<TextureHandle> {
        self.check_handle_slot(handle.graph_id())?;
        self.reads.push(ResourceAccess {
            resource: handle.slot(),
            subresource,
            state,
        });
        Ok(handle)
    }

    /// Declares a write of `handle` in `state`, over `subresource`. Reading
    /// and writing the same handle within one pass is a legal read-write;
    /// a second, different pass later writing the same subresource is
    /// rejected at compile time as a `WriteSetOverlap`.
    pub fn write(
        &mut self,
        handle: TextureHandle,
        state: ResourceState,
        subresource: Subresource,
    ) -> Result<TextureHandle> {
        self.check_handle_slot(handle.graph_id())?;
        self.writes.push(ResourceAccess {
            resource: handle.slot(),
            subresource,
            state,
        });
        Ok(handle)
    }

    pub fn scope(&mut self) -> &mut PassScope {
        &mut self.scope
    }

    /// Finalises the pass, consuming the builder. `execute` runs once this
    /// pass's dependency level is reached during `Graph::execute`.
    pub fn render<F>(self, execute: F)
    where
        F: FnOnce(&mut PassScope, &Scheduler, &mut Registry<D>, &mut R) -> Result<()> + 'static,
    {
        self.graph.passes.push(Pass {
            name: self.name,
            reads: self.reads,
            writes: self.writes,
            scope: self.scope,
            execute: Some(Box::new(execute)),
        });
    }
}
