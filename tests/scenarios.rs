//! End-to-end scenarios driving the public `Graph` API against a mock
//! `Device`/`CommandRecorder`, mirroring the fixture style in
//! `panxinmiao-myth`'s integration tests (one file per concern, plain
//! `#[test]`s, no property-testing harness).

use kaguya_rg::{
    CommandRecorder, Device, Extent, Format, Graph, PhysicalRenderTargetGroup, PhysicalTexture,
    PhysicalView, QueueKind, Rect, ResolutionSource, ResourceState, Subresource, SyncPoint,
    TextureDesc, UsageFlags,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
#[error("mock device/recorder error")]
struct MockError;

struct MockDevice {
    next_id: AtomicU64,
    destroyed: Mutex<Vec<u64>>,
}

impl MockDevice {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            destroyed: Mutex::new(Vec::new()),
        }
    }
}

impl Device for MockDevice {
    type Error = MockError;

    fn create_texture(&self, _desc: &TextureDesc) -> Result<PhysicalTexture, Self::Error> {
        Ok(PhysicalTexture(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn create_view(
        &self,
        _desc: &kaguya_rg::ViewDesc,
        _texture: PhysicalTexture,
    ) -> Result<PhysicalView, Self::Error> {
        Ok(PhysicalView(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn destroy(&self, resource: PhysicalTexture) {
        self.destroyed.lock().unwrap().push(resource.0);
    }
}

/// A single recorded event, in emission order, so a test can check that a
/// barrier actually landed *between* two pass callbacks rather than merely
/// counting how many of each kind occurred (keeping `transitions` and
/// `uav_barriers` in separate vectors can't distinguish the two).
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Transition(PhysicalTexture, ResourceState, ResourceState, Subresource),
    UavBarrier(PhysicalTexture),
    PassRan(&'static str),
}

#[derive(Default)]
struct MockRecorder {
    transitions: Vec<(PhysicalTexture, ResourceState, ResourceState, Subresource)>,
    uav_barriers: Vec<PhysicalTexture>,
    timeline: Vec<Event>,
}

impl MockRecorder {
    /// Called from a pass's execute callback to stamp its place on the
    /// combined timeline.
    fn mark_ran(&mut self, pass: &'static str) {
        self.timeline.push(Event::PassRan(pass));
    }
}

impl CommandRecorder for MockRecorder {
    type Error = MockError;

    fn open(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn transition(
        &mut self,
        resource: PhysicalTexture,
        before: ResourceState,
        after: ResourceState,
        subresource: Subresource,
    ) -> Result<(), Self::Error> {
        self.transitions.push((resource, before, after, subresource));
        self.timeline.push(Event::Transition(resource, before, after, subresource));
        Ok(())
    }
    fn uav_barrier(&mut self, resource: PhysicalTexture) -> Result<(), Self::Error> {
        self.uav_barriers.push(resource);
        self.timeline.push(Event::UavBarrier(resource));
        Ok(())
    }
    fn flush_barriers(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn begin_render_pass(&mut self, _target_group: &PhysicalRenderTargetGroup) -> Result<(), Self::Error> {
        Ok(())
    }
    fn end_render_pass(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_viewport(&mut self, _rect: Rect) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_scissor(&mut self, _rect: Rect) -> Result<(), Self::Error> {
        Ok(())
    }
    fn submit(&mut self) -> Result<SyncPoint, Self::Error> {
        Ok(SyncPoint {
            queue: QueueKind::Primary,
            value: 0,
        })
    }
    fn wait(&mut self, _sync: SyncPoint) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct FixedResolution {
    render: (u32, u32),
    viewport: (u32, u32),
    dirty: bool,
}

impl FixedResolution {
    fn new(width: u32, height: u32) -> Self {
        Self {
            render: (width, height),
            viewport: (width, height),
            dirty: false,
        }
    }
}

impl ResolutionSource for FixedResolution {
    fn render_resolution(&self) -> (u32, u32) {
        self.render
    }
    fn viewport_resolution(&self) -> (u32, u32) {
        self.viewport
    }
    fn render_resolution_dirty(&self) -> bool {
        self.dirty
    }
    fn viewport_resolution_dirty(&self) -> bool {
        self.dirty
    }
    fn clear_dirty_flags(&mut self) {
        self.dirty = false;
    }
}

fn rt_desc() -> TextureDesc {
    TextureDesc::new_2d(Format::Rgba16Float, Extent::Render, UsageFlags::RENDER_TARGET)
}

/// S1 — linear chain: A writes T1, B reads T1 writes T2, C reads T2.
#[test]
fn s1_linear_chain() {
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);
    let resolution = FixedResolution::new(1920, 1080);
    graph.begin_frame(&resolution);

    let mut a = graph.add_pass("A").unwrap();
    let t1 = a.create("T1", rt_desc());
    a.write(t1, ResourceState::RenderTarget, Subresource::All).unwrap();
    a.render(|_, _, _, _| Ok(()));

    let mut b = graph.add_pass("B").unwrap();
    b.read(t1, ResourceState::ShaderResource, Subresource::All).unwrap();
    let t2 = b.create("T2", rt_desc());
    b.write(t2, ResourceState::RenderTarget, Subresource::All).unwrap();
    b.render(|_, _, _, _| Ok(()));

    let mut c = graph.add_pass("C").unwrap();
    c.read(t2, ResourceState::ShaderResource, Subresource::All).unwrap();
    c.render(|_, _, _, _| Ok(()));

    graph.compile().unwrap();
    let mut recorder = MockRecorder::default();
    let mut resolution = FixedResolution::new(1920, 1080);
    graph.execute(&mut recorder, &mut resolution).unwrap();

    // Two transitions: T1 common->shader-resource, T2 common->shader-resource.
    assert_eq!(recorder.transitions.len(), 2);
    assert!(recorder
        .transitions
        .iter()
        .all(|(_, before, after, _)| *before == ResourceState::Common
            && *after == ResourceState::ShaderResource));
}

/// S2 — diamond: A writes T1; B reads T1 writes T2; C reads T1 writes T3;
/// D reads T2 and T3. Level 1 = {B, C}, one shared barrier on T1.
#[test]
fn s2_diamond() {
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);
    let resolution = FixedResolution::new(1920, 1080);
    graph.begin_frame(&resolution);

    let mut a = graph.add_pass("A").unwrap();
    let t1 = a.create("T1", rt_desc());
    a.write(t1, ResourceState::RenderTarget, Subresource::All).unwrap();
    a.render(|_, _, _, _| Ok(()));

    let mut b = graph.add_pass("B").unwrap();
    b.read(t1, ResourceState::ShaderResource, Subresource::All).unwrap();
    let t2 = b.create("T2", rt_desc());
    b.write(t2, ResourceState::RenderTarget, Subresource::All).unwrap();
    b.render(|_, _, _, _| Ok(()));

    let mut c = graph.add_pass("C").unwrap();
    c.read(t1, ResourceState::ShaderResource, Subresource::All).unwrap();
    let t3 = c.create("T3", rt_desc());
    c.write(t3, ResourceState::RenderTarget, Subresource::All).unwrap();
    c.render(|_, _, _, _| Ok(()));

    let mut d = graph.add_pass("D").unwrap();
    d.read(t2, ResourceState::ShaderResource, Subresource::All).unwrap();
    d.read(t3, ResourceState::ShaderResource, Subresource::All).unwrap();
    d.render(|_, _, _, _| Ok(()));

    graph.compile().unwrap();
    let mut recorder = MockRecorder::default();
    let mut resolution = FixedResolution::new(1920, 1080);
    graph.execute(&mut recorder, &mut resolution).unwrap();

    // Exactly one transition into T1's new state, shared by B and C.
    let t1_transitions = recorder
        .transitions
        .iter()
        .filter(|(_, before, _, _)| *before == ResourceState::Common)
        .count();
    assert_eq!(t1_transitions, 1);
}

/// S3 — UAV read-write in the same level: two writers of the same UAV
/// resource get a UAV barrier between them; writers of different resources
/// don't.
#[test]
fn s3_uav_hazard_same_level() {
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);
    let resolution = FixedResolution::new(1920, 1080);
    graph.begin_frame(&resolution);

    let mut creator = graph.add_pass("Creator").unwrap();
    let u = creator.create("U", rt_desc());
    creator.write(u, ResourceState::RenderTarget, Subresource::All).unwrap();
    creator.render(|_, _, _, recorder: &mut MockRecorder| {
        recorder.mark_ran("Creator");
        Ok(())
    });

    let mut x = graph.add_pass("X").unwrap();
    x.read(u, ResourceState::ShaderResource, Subresource::All).unwrap();
    x.write(u, ResourceState::UnorderedAccess, Subresource::All).unwrap();
    x.render(|_, _, _, recorder: &mut MockRecorder| {
        recorder.mark_ran("X");
        Ok(())
    });

    let mut y = graph.add_pass("Y").unwrap();
    y.read(u, ResourceState::ShaderResource, Subresource::All).unwrap();
    y.write(u, ResourceState::UnorderedAccess, Subresource::All).unwrap();
    y.render(|_, _, _, recorder: &mut MockRecorder| {
        recorder.mark_ran("Y");
        Ok(())
    });

    graph.compile().unwrap();
    let mut recorder = MockRecorder::default();
    let mut resolution = FixedResolution::new(1920, 1080);
    graph.execute(&mut recorder, &mut resolution).unwrap();

    assert_eq!(recorder.uav_barriers.len(), 1);

    // The barrier must sit strictly between X's and Y's callbacks on the
    // recorded timeline, not in front of both.
    let x_ran = recorder.timeline.iter().position(|e| *e == Event::PassRan("X")).unwrap();
    let y_ran = recorder.timeline.iter().position(|e| *e == Event::PassRan("Y")).unwrap();
    let barrier_at = recorder
        .timeline
        .iter()
        .position(|e| matches!(e, Event::UavBarrier(_)))
        .unwrap();
    assert!(x_ran < barrier_at, "X must run before the UAV barrier");
    assert!(barrier_at < y_ran, "the UAV barrier must run before Y");
}

/// S4 — cycle: A reads T writes T', B reads T' writes T.
#[test]
fn s4_cycle_is_rejected() {
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);
    let resolution = FixedResolution::new(1920, 1080);
    graph.begin_frame(&resolution);

    // A reads T (produced later by B), writes T'.
    // We have to mint T's handle before A declares its read, since a
    // handle must come from some `create` call; B is the one that writes
    // it, but handles can be created by any pass ahead of being written.
    let mut setup = graph.add_pass("Setup").unwrap();
    let t = setup.create("T", rt_desc());
    let t_prime = setup.create("T_prime", rt_desc());
    setup.render(|_, _, _, _| Ok(()));

    let mut a = graph.add_pass("A").unwrap();
    a.read(t, ResourceState::ShaderResource, Subresource::All).unwrap();
    a.write(t_prime, ResourceState::RenderTarget, Subresource::All).unwrap();
    a.render(|_, _, _, _| Ok(()));

    let mut b = graph.add_pass("B").unwrap();
    b.read(t_prime, ResourceState::ShaderResource, Subresource::All).unwrap();
    b.write(t, ResourceState::RenderTarget, Subresource::All).unwrap();
    b.render(|_, _, _, _| Ok(()));

    let err = graph.compile().unwrap_err();
    match err {
        kaguya_rg::RenderGraphError::CycleDetected { cycle } => {
            assert!(cycle.contains(&"A".to_string()));
            assert!(cycle.contains(&"B".to_string()));
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

/// S5 — resolution change: re-declaring "Albedo" at a new render resolution
/// destroys the old physical texture and creates a new one; the virtual
/// handle sequence is unaffected.
#[test]
fn s5_resolution_change_recreates_physical_texture() {
    let device_destroyed;
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);

    {
        let resolution = FixedResolution::new(1920, 1080);
        graph.begin_frame(&resolution);
        let mut pass = graph.add_pass("Albedo").unwrap();
        let albedo = pass.create("Albedo", rt_desc());
        pass.write(albedo, ResourceState::RenderTarget, Subresource::All).unwrap();
        pass.render(|_, _, _, _| Ok(()));
        graph.compile().unwrap();
        let mut recorder = MockRecorder::default();
        let mut resolution = FixedResolution::new(1920, 1080);
        graph.execute(&mut recorder, &mut resolution).unwrap();
    }

    {
        let resolution = FixedResolution::new(2560, 1440);
        graph.begin_frame(&resolution);
        let mut pass = graph.add_pass("Albedo").unwrap();
        let albedo = pass.create("Albedo", rt_desc());
        pass.write(albedo, ResourceState::RenderTarget, Subresource::All).unwrap();
        pass.render(|_, _, _, _| Ok(()));
        graph.compile().unwrap();
        let mut recorder = MockRecorder::default();
        let mut resolution = FixedResolution::new(2560, 1440);
        graph.execute(&mut recorder, &mut resolution).unwrap();
    }

    device_destroyed = graph.device().destroyed.lock().unwrap().len();
    assert_eq!(device_destroyed, 1, "exactly the stale 1920x1080 Albedo should be destroyed");
}

/// S6 — aliasing split subresource: A writes mip 0 as a render target, B
/// reads mip 0, C writes mip 1; mip 1 is untouched by the A->B transition.
#[test]
fn s6_subresource_split() {
    let mut graph: Graph<MockDevice, MockRecorder> = Graph::new(MockDevice::new(), 8192);
    let resolution = FixedResolution::new(1920, 1080);
    graph.begin_frame(&resolution);

    let mut desc = rt_desc();
    desc.mip_levels = 2;

    let mut a = graph.add_pass("A").unwrap();
    let t = a.create("T", desc);
    a.write(t, ResourceState::RenderTarget, Subresource::Index(0)).unwrap();
    a.render(|_, _, _, _| Ok(()));

    let mut b = graph.add_pass("B").unwrap();
    b.read(t, ResourceState::ShaderResource, Subresource::Index(0)).unwrap();
    b.render(|_, _, _, _| Ok(()));

    let mut c = graph.add_pass("C").unwrap();
    c.write(t, ResourceState::RenderTarget, Subresource::Index(1)).unwrap();
    c.render(|_, _, _, _| Ok(()));

    graph.compile().unwrap();
    let mut recorder = MockRecorder::default();
    let mut resolution = FixedResolution::new(1920, 1080);
    graph.execute(&mut recorder, &mut resolution).unwrap();

    let mip0_transitions = recorder
        .transitions
        .iter()
        .filter(|(_, _, _, sub)| *sub == Subresource::Index(0))
        .count();
    let mip1_transitions = recorder
        .transitions
        .iter()
        .filter(|(_, _, _, sub)| *sub == Subresource::Index(1))
        .count();
    assert_eq!(mip0_transitions, 1);
    assert_eq!(mip1_transitions, 1);
}
