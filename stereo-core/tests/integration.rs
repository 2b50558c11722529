//! Integration tests: topology resolution against TOML fixtures, role
//! assignment properties, and the render-target handoff across threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use stereo_core::context::GpuContext;
use stereo_core::stereo::{Backend, FovTangents, RenderTarget, WindowBackend, WindowSurface};
use stereo_core::{
    Eye, Fixture, FramebufferId, GpuIndexSource, HeadsetPose, PresentConfig, PresentationPlan,
    Rect, ResolveError, ResolverOptions, Role, StereoDisplay, StereoError, SurfaceError,
    TextureHandle, Topology, TopologyWarning, VrMode,
};

// ── Helpers ──────────────────────────────────────────────────────

fn options(debug_fallback: bool, clone_vr_identity: bool) -> ResolverOptions {
    ResolverOptions {
        clone_vr_identity,
        debug_fallback,
    }
}

fn resolve_with(text: &str, options: ResolverOptions) -> Result<Topology, ResolveError> {
    Fixture::from_toml(text)
        .expect("fixture parses")
        .resolve(options)
}

/// Resolve with release-build semantics (no debug fallback).
fn resolve(text: &str) -> Result<Topology, ResolveError> {
    resolve_with(text, options(false, false))
}

fn gpu_of(topology: &Topology, name: &str) -> Option<(u32, GpuIndexSource)> {
    topology
        .display_by_name(name)
        .and_then(|d| d.gpu())
        .map(|g| (g.index, g.source))
}

fn has_warning(topology: &Topology, pred: impl Fn(&TopologyWarning) -> bool) -> bool {
    topology.warnings().iter().any(pred)
}

/// Three desktop monitors; A is primary.
const THREE_MONITORS: &str = r#"
    [[monitor]]
    name = "A"
    rect = { x = 0, y = 0, width = 1920, height = 1080 }
    primary = true

    [[monitor]]
    name = "B"
    rect = { x = 1920, y = 0, width = 1920, height = 1080 }

    [[monitor]]
    name = "C"
    rect = { x = 3840, y = 0, width = 1920, height = 1080 }
"#;

fn three_monitors(rest: &str) -> String {
    format!("{THREE_MONITORS}\n{rest}")
}

// ── Monitor and adapter correlation ──────────────────────────────

#[test]
fn test_adapter_outputs_assign_gpu_indices() {
    let text = three_monitors(
        r#"
        [[adapter]]
        description = "GPU 0"
        outputs = ["A", "B"]

        [[adapter]]
        description = "GPU 1"
        outputs = ["C", "\\\\.\\DISPLAY9"]
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();

    assert_eq!(gpu_of(&topology, "A"), Some((0, GpuIndexSource::Adapter)));
    assert_eq!(gpu_of(&topology, "B"), Some((0, GpuIndexSource::Adapter)));
    assert_eq!(gpu_of(&topology, "C"), Some((1, GpuIndexSource::Adapter)));
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::UnmatchedOutput { adapter: 1, name } if name == r"\\.\DISPLAY9"
    )));
}

#[test]
fn test_broken_adapter_keeps_enumeration_index() {
    let text = three_monitors(
        r#"
        [[adapter]]
        broken = true

        [[adapter]]
        description = "GPU 1"
        outputs = ["A"]
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();

    assert_eq!(gpu_of(&topology, "A"), Some((1, GpuIndexSource::Adapter)));
    assert_eq!(gpu_of(&topology, "B"), None);
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::AdapterSkipped { adapter: 0, .. }
    )));
}

#[test]
fn test_adapter_api_down_is_fatal() {
    // Root keys must precede the first table header.
    let text = format!("adapter_api_down = true\n{THREE_MONITORS}");
    let err = resolve_with(&text, options(true, false)).unwrap_err();
    assert!(matches!(err, ResolveError::AdapterConnection(_)));
}

#[test]
fn test_missing_primary_is_fatal() {
    let text = r#"
        [[monitor]]
        name = "A"
        rect = { x = 0, y = 0, width = 1920, height = 1080 }
    "#;
    let err = resolve_with(text, options(true, false)).unwrap_err();
    assert!(matches!(err, ResolveError::NoPrimaryDisplay));
}

#[test]
fn test_monitor_enumeration_failure_is_fatal() {
    let err = resolve_with("monitor_enumeration_fails = true", options(true, false)).unwrap_err();
    assert!(matches!(err, ResolveError::MonitorEnumeration(_)));
}

#[test]
fn test_undescribed_and_degenerate_monitors_are_skipped() {
    let text = three_monitors(
        r#"
        [[monitor]]
        name = "GHOST"

        [[monitor]]
        name = "FLAT"
        rect = { x = 0, y = 0, width = 0, height = 1080 }
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();
    assert_eq!(topology.displays().len(), 3);
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::IncompleteMonitor { index: 3, .. }
    )));
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::RejectedMonitor { name, .. } if name == "FLAT"
    )));
}

// ── Vendor correlation ───────────────────────────────────────────

#[test]
fn test_vendor_fills_gpu_index_adapters_missed() {
    let text = three_monitors(
        r#"
        [[adapter]]
        description = "GPU 0"
        outputs = ["A"]

        [vendor]
        logical_gpus = 2

        [[vendor.display]]
        name = "A"
        id = 1
        logical_gpu = 1
        physical_gpus = 1

        [[vendor.display]]
        name = "C"
        id = 3
        logical_gpu = 1
        physical_gpus = 1
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();

    // The adapter pass wrote A first and keeps it.
    assert_eq!(gpu_of(&topology, "A"), Some((0, GpuIndexSource::Adapter)));
    assert_eq!(gpu_of(&topology, "C"), Some((1, GpuIndexSource::Vendor)));
    let c = topology.display_by_name("C").unwrap();
    assert_eq!(c.vendor_display_id(), Some(3));
    assert_eq!(c.vendor_physical_gpu_count(), Some(1));
    // Grouping is off, so nothing is a valid mosaic.
    assert!(!c.valid_mosaic());
}

#[test]
fn test_vendor_display_without_id_is_skipped() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1

        [[vendor.display]]
        name = "B"
        physical_gpus = 1

        [[vendor.display]]
        name = "Z"
        id = 9
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::VendorDisplaySkipped { .. }
    )));
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::UnmatchedVendorDisplay { name } if name == "Z"
    )));
    assert_eq!(
        topology.display_by_name("B").unwrap().vendor_display_id(),
        None
    );
}

#[test]
fn test_vendor_inconsistency_is_fatal() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1

        [[vendor.display]]
        name = "B"
        id = 2
        "#,
    );
    let err = resolve_with(&text, options(true, false)).unwrap_err();
    match err {
        ResolveError::VendorInconsistency { display, .. } => assert_eq!(display, "B"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_logical_gpu_is_fatal() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1

        [[vendor.display]]
        name = "B"
        id = 2
        logical_gpu = 5
        physical_gpus = 1
        "#,
    );
    let err = resolve_with(&text, options(true, false)).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownLogicalGpu { .. }));
}

#[test]
fn test_grouping_query_failure_is_fatal() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1
        grouping_query_fails = true
        "#,
    );
    let err = resolve_with(&text, options(true, false)).unwrap_err();
    assert!(matches!(err, ResolveError::VendorGrouping(_)));
}

#[test]
fn test_unknown_group_warns() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1
        grouping_enabled = true

        [[vendor.group]]
        members = [99, 98]
        width = 3840
        height = 1080
        refresh_rate = 60
        "#,
    );
    let topology = resolve_with(&text, options(true, false)).unwrap();
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::UnknownGroup { group: 0, members } if members == &vec![99, 98]
    )));
}

// ── Role assignment ──────────────────────────────────────────────

const MOSAIC_132: &str = r#"
    [[monitor]]
    name = "DESK"
    rect = { x = 0, y = 0, width = 1920, height = 1080 }
    primary = true

    [[monitor]]
    name = "WALL3"
    rect = { x = 1920, y = 0, width = 5760, height = 1080 }

    [[monitor]]
    name = "WALL2"
    rect = { x = 7680, y = 0, width = 3840, height = 1080 }

    [[adapter]]
    description = "GPU 0"
    outputs = ["DESK"]

    [[adapter]]
    description = "GPU 1"
    outputs = ["WALL3", "WALL2"]

    [vendor]
    logical_gpus = 2
    grouping_enabled = true

    [[vendor.display]]
    name = "DESK"
    id = 1
    logical_gpu = 0
    physical_gpus = 1

    [[vendor.display]]
    name = "WALL3"
    id = 2
    logical_gpu = 1
    physical_gpus = 1

    [[vendor.display]]
    name = "WALL2"
    id = 3
    logical_gpu = 1
    physical_gpus = 1

    [[vendor.group]]
    members = [1]
    width = 1920
    height = 1080
    refresh_rate = 60
    rows = 1
    columns = 1

    [[vendor.group]]
    members = [2]
    width = 5760
    height = 1080
    refresh_rate = 120
    rows = 1
    columns = 3

    [[vendor.group]]
    members = [3]
    width = 3840
    height = 1080
    refresh_rate = 120
    rows = 1
    columns = 2
"#;

#[test]
fn test_mosaic_resolves_to_largest_valid_group() {
    let topology = resolve(MOSAIC_132).unwrap();

    let sizes: Vec<u32> = topology
        .displays()
        .iter()
        .map(|d| d.vendor_group_size())
        .collect();
    assert_eq!(sizes, vec![1, 3, 2]);
    let valid: Vec<bool> = topology
        .displays()
        .iter()
        .map(|d| d.valid_mosaic())
        .collect();
    assert_eq!(valid, vec![false, true, true]);

    assert_eq!(topology.mosaic().unwrap().name(), "WALL3");
    assert_eq!(topology.mosaic().unwrap().refresh_rate(), 120);
    assert_eq!(topology.control().name(), "DESK");
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::Unassigned { display } if display == "WALL2"
    )));
}

#[test]
fn test_control_resolves_to_display_on_other_gpu() {
    // A and B on GPU 0 with A the mosaic; C alone on GPU 1.
    let text = three_monitors(
        r#"
        [[adapter]]
        description = "GPU 0"
        outputs = ["A", "B"]

        [[adapter]]
        description = "GPU 1"
        outputs = ["C"]

        [vendor]
        logical_gpus = 2
        grouping_enabled = true

        [[vendor.display]]
        name = "A"
        id = 1
        logical_gpu = 0
        physical_gpus = 2

        [[vendor.group]]
        members = [1]
        width = 3840
        height = 1080
        refresh_rate = 60
        rows = 1
        columns = 2
        "#,
    );
    let topology = resolve(&text).unwrap();
    assert_eq!(topology.mosaic().unwrap().name(), "A");
    assert_eq!(topology.control().name(), "C");
    assert_eq!(topology.primary().name(), "A");
    assert!(!has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::ControlSharesGpu { .. }
    )));
}

#[test]
fn test_no_presentation_display_is_fatal_in_release() {
    let text = three_monitors(
        r#"
        [vendor]
        logical_gpus = 1
        grouping_enabled = false
        "#,
    );
    assert!(matches!(
        resolve(&text).unwrap_err(),
        ResolveError::NoPresentationDisplay
    ));

    // The debug fallback puts the mosaic role on the primary instead.
    let topology = resolve_with(&text, options(true, false)).unwrap();
    assert_eq!(topology.mosaic().unwrap().name(), "A");
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::DebugFallback { role: "mosaic", .. }
    )));
}

// ── VR identification ────────────────────────────────────────────

const EXTENDED_HMD: &str = r#"
    [[monitor]]
    name = "P"
    rect = { x = 0, y = 0, width = 1920, height = 1080 }
    primary = true

    [[monitor]]
    name = "H"
    rect = { x = 1920, y = 0, width = 2160, height = 1200 }

    [[adapter]]
    description = "GPU 0"
    outputs = ["P"]

    [[adapter]]
    description = "GPU 1"
    outputs = ["H"]

    [vr]
    mode = "extended"
    bounds = { x = -5000, y = 77, width = 2160, height = 1200 }
    render_size = [1512, 1680]
"#;

#[test]
fn test_vr_matches_headset_size_not_position() {
    let topology = resolve(EXTENDED_HMD).unwrap();
    let vr = topology.vr().unwrap();
    assert_eq!(vr.name(), "H");
    assert_eq!(vr.virtual_screen_rect(), Rect::new(1920, 0, 2160, 1200));
    assert_eq!(vr.render_resolution(), (3024, 1680));
    assert_eq!(topology.control().name(), "P");

    let headset = topology.headset().unwrap();
    assert_eq!(headset.mode, VrMode::Extended);
    assert_eq!(headset.rect.x, -5000);
    assert!(!topology.direct_mode());
}

#[test]
fn test_vr_clone_gets_its_own_identity() {
    let topology = resolve_with(EXTENDED_HMD, options(false, true)).unwrap();
    let vr = topology.vr().unwrap();
    assert_eq!(vr.name(), "H [HMD]");
    assert_eq!(vr.render_resolution(), (3024, 1680));
    assert_eq!(vr.logical_gpu_index(), Some(1));

    // The clone is not a listed display and the original keeps its size.
    assert_eq!(topology.displays().len(), 2);
    let h = topology.display_by_name("H").unwrap();
    assert_eq!(h.render_resolution(), (2160, 1200));
    assert!(!topology.roles_of(h).contains(&Role::Vr));
}

#[test]
fn test_vr_runtime_failure_degrades_to_no_vr() {
    let text = format!("{MOSAIC_132}\n[vr]\nmode = \"extended\"\nbounds = {{ x = 0, y = 0, width = 1920, height = 1080 }}\nrender_size = [960, 1080]\nfails = true\n");
    let topology = resolve(&text).unwrap();
    assert!(topology.vr().is_none());
    assert!(topology.headset().is_none());
    assert!(has_warning(&topology, |w| matches!(
        w,
        TopologyWarning::VrUnavailable { .. }
    )));
}

#[test]
fn test_direct_mode_headset_counts_as_vr() {
    let text = r#"
        [[monitor]]
        name = "P"
        rect = { x = 0, y = 0, width = 2560, height = 1440 }
        primary = true

        [vr]
        mode = "direct"
        bounds = { x = 0, y = 0, width = 2160, height = 1200 }
        render_size = [1512, 1680]
    "#;
    let topology = resolve(text).unwrap();
    assert!(topology.direct_mode());
    assert!(topology.vr().is_none());
    assert_eq!(topology.control().name(), "P");
    assert_eq!(topology.headset().unwrap().rect, Rect::new(0, 0, 2560, 1440));
}

// ── Reporting ────────────────────────────────────────────────────

#[test]
fn test_report_lists_roles_and_warnings() {
    let topology = resolve(MOSAIC_132).unwrap();
    let report = topology.report();
    assert_eq!(report.displays.len(), 3);
    assert_eq!(report.displays[0].roles, vec![Role::Primary, Role::Control]);
    assert_eq!(report.displays[1].roles, vec![Role::Mosaic]);
    assert!(report.displays[2].roles.is_empty());

    let json = report.to_json_pretty().unwrap();
    assert!(json.contains("\"name\": \"WALL3\""));
    assert!(json.contains("\"valid_mosaic\": true"));
    assert!(json.contains("\"mosaic\""));
    assert!(json.contains("WALL2"));
}

#[test]
fn test_verify_unchanged_detects_new_monitor() {
    let fixture = Fixture::from_toml(MOSAIC_132).unwrap();
    let topology = fixture.resolve(options(false, false)).unwrap();
    assert!(topology.verify_unchanged(&mut fixture.sources().monitors));

    let grown = Fixture::from_toml(&format!(
        "{MOSAIC_132}\n[[monitor]]\nname = \"NEW\"\nrect = {{ x = 0, y = 2000, width = 800, height = 600 }}\n"
    ))
    .unwrap();
    assert!(!topology.verify_unchanged(&mut grown.sources().monitors));
}

// ── Presentation plan ────────────────────────────────────────────

#[test]
fn test_plan_uses_mosaic_window() {
    let topology = resolve(MOSAIC_132).unwrap();
    let plan = PresentationPlan::select(&topology, None).unwrap();
    assert_eq!(plan.display.unwrap().name(), "WALL3");
    assert_eq!(plan.render_size, (5760, 1080));

    let err = PresentationPlan::select(&topology, Some(stereo_core::BackendKind::Compositor))
        .unwrap_err();
    assert!(err.to_string().contains("compositor backend unavailable"));
}

// ── Render-target handoff ────────────────────────────────────────

#[derive(Default)]
struct FrameCounter {
    blits: AtomicUsize,
    swaps: AtomicUsize,
}

struct CountingWindow(Arc<FrameCounter>);

impl WindowSurface for CountingWindow {
    fn blit(&mut self, target: &RenderTarget) -> Result<(), SurfaceError> {
        assert!(target.framebuffer(Eye::Left).is_valid());
        self.0.blits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), SurfaceError> {
        self.0.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct NoopContext;

impl GpuContext for NoopContext {
    fn make_current(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn release_current(&mut self) {}

    fn flush(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

fn window_display(counter: &Arc<FrameCounter>) -> StereoDisplay {
    let backend = Backend::Window(WindowBackend {
        surface: Box::new(CountingWindow(Arc::clone(counter))),
        fov: FovTangents::symmetric(1.4, 1.0),
        ipd: 0.064,
    });
    StereoDisplay::with_instant_deadline(
        backend,
        RenderTarget::side_by_side(FramebufferId(1), TextureHandle(100), 5760, 1080),
        Box::new(NoopContext),
        PresentConfig {
            deadline: Duration::from_secs(1),
            acquire_poll: Duration::from_millis(5),
        },
    )
}

#[test]
fn test_producer_and_pose_reader_share_display() {
    const FRAMES: usize = 25;
    let counter = Arc::new(FrameCounter::default());
    let display = window_display(&counter);

    let producer = display.clone();
    let render = thread::spawn(move || {
        for _ in 0..FRAMES {
            let drawable = producer.wait_next_drawable().unwrap();
            assert!(producer.owns_drawable());
            assert_eq!(drawable.viewport(Eye::Right), Rect::new(2880, 0, 2880, 1080));
            drawable.submit().unwrap();
        }
    });

    let poser = display.clone();
    let poses = thread::spawn(move || {
        (0..FRAMES)
            .map(|_| poser.wait_get_poses().unwrap())
            .collect::<Vec<HeadsetPose>>()
    });

    render.join().unwrap();
    let poses = poses.join().unwrap();
    assert_eq!(poses.len(), FRAMES);
    assert!(poses.iter().all(|p| !p.valid));
    assert_eq!(counter.blits.load(Ordering::SeqCst), FRAMES);
    assert_eq!(counter.swaps.load(Ordering::SeqCst), FRAMES);
}

#[test]
fn test_drawables_alternate_between_threads() {
    let counter = Arc::new(FrameCounter::default());
    let display = window_display(&counter);
    let (tx, rx) = mpsc::channel();

    let workers: Vec<_> = (0..3)
        .map(|worker| {
            let display = display.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    let drawable = display.wait_next_drawable().unwrap();
                    tx.send(worker).unwrap();
                    drawable.submit().unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(rx.iter().count(), 30);
    assert_eq!(counter.blits.load(Ordering::SeqCst), 30);
    assert!(!display.owns_drawable());
}

#[test]
fn test_outstanding_drawable_is_reported() {
    let counter = Arc::new(FrameCounter::default());
    let display = window_display(&counter);
    let drawable = display.wait_next_drawable().unwrap();
    assert!(matches!(
        display.wait_next_drawable(),
        Err(StereoError::DrawableOutstanding)
    ));
    drawable.submit().unwrap();
    drawable.submit().unwrap();
    assert_eq!(counter.swaps.load(Ordering::SeqCst), 1);
    assert_eq!(drawable.framebuffer(Eye::Left), FramebufferId::INVALID);
}
