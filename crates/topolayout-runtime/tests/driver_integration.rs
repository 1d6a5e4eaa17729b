//! Integration tests for the layout driver against in-memory scenes.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use topolayout_core::{
    ElementId, ElementView, ForceDirectedLogical, ForceDirectedPhysical, GraphLayout, LayoutBudget,
    LogicalForceConfig, LogicalLayout, LogicalVisualization, MirrorLayout, PhysicalForceConfig,
    PhysicalLayout, PhysicalVisualization, Vector2,
};
use topolayout_runtime::{LayoutDriver, LogicalScene, PhysicalScene, PositionBoard, RequestOutcome};

const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Fixtures
// ============================================================================

fn force_directed() -> PhysicalLayout {
    let config = PhysicalForceConfig {
        budget: LayoutBudget::iterations_only(10),
        seed: Some(99),
        ..Default::default()
    };
    PhysicalLayout::ForceDirected(ForceDirectedPhysical::new(config).unwrap())
}

/// Two hosts wired to the ports of one switch, plus a pinned host.
fn small_office() -> PhysicalScene {
    let mut scene = PhysicalScene::new();
    scene.add_device(ElementId(1), ElementView::new(0.0, 0.0)).unwrap();
    scene
        .add_port(ElementId(2), Some(ElementId(1)), ElementView::new(0.0, 0.0))
        .unwrap();
    scene
        .add_port(ElementId(3), Some(ElementId(1)), ElementView::new(0.0, 0.0))
        .unwrap();
    scene.add_host(ElementId(10), ElementView::new(-120.0, 40.0)).unwrap();
    scene.add_host(ElementId(11), ElementView::new(130.0, -60.0)).unwrap();
    scene
        .add_host(ElementId(12), ElementView::new(33.3, 33.3).pinned())
        .unwrap();
    scene.connect(ElementId(10), ElementId(2)).unwrap();
    scene.connect(ElementId(11), ElementId(3)).unwrap();
    scene
}

// ============================================================================
// Guard and delivery
// ============================================================================

#[test]
fn test_request_while_running_is_dropped() {
    let driver = LayoutDriver::new("office", force_directed());
    let scene = small_office();
    let snapshot = scene.physical_snapshot();
    let (release, gate) = mpsc::channel::<()>();

    let first = driver
        .request_layout(move || {
            let _ = gate.recv();
            snapshot
        })
        .unwrap();
    assert_eq!(first, RequestOutcome::Started);
    assert!(driver.is_running());

    let snapshot = scene.physical_snapshot();
    let second = driver.request_layout(move || snapshot).unwrap();
    assert_eq!(second, RequestOutcome::Dropped);

    release.send(()).unwrap();
    let mut scene = scene;
    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.passes, 1);
    assert!(!driver.is_running());

    let snapshot = scene.physical_snapshot();
    let third = driver.request_layout(move || snapshot).unwrap();
    assert_eq!(third, RequestOutcome::Started);
    driver.drain_timeout(&mut scene, WAIT);
}

#[test]
fn test_frames_move_free_elements_to_whole_units() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();

    for _ in 0..20 {
        let snapshot = scene.physical_snapshot();
        driver.request_layout(move || snapshot).unwrap();
        let report = driver.drain_timeout(&mut scene, WAIT);
        assert_eq!(report.failed, 0);
        assert!(!report.relayout_requested);
    }

    for id in [1, 10, 11] {
        let position = scene.position(ElementId(id)).unwrap();
        assert_eq!(position.x, position.x.floor());
        assert_eq!(position.y, position.y.floor());
    }
    assert_ne!(
        scene.position(ElementId(10)),
        Some(Vector2::new(-120.0, 40.0))
    );
    // Pinned host keeps its fractional position.
    assert_eq!(scene.position(ElementId(12)), Some(Vector2::new(33.3, 33.3)));
}

#[test]
fn test_ports_follow_their_device_across_frames() {
    let config = PhysicalForceConfig {
        budget: LayoutBudget::iterations_only(10),
        seed: Some(4),
        ..Default::default()
    };
    let layout = PhysicalLayout::ForceDirected(ForceDirectedPhysical::new(config).unwrap());
    let driver = LayoutDriver::new("switch", layout);

    let mut scene = PhysicalScene::new();
    scene.add_device(ElementId(1), ElementView::new(0.0, 0.0)).unwrap();
    scene
        .add_port(ElementId(2), Some(ElementId(1)), ElementView::new(10.0, 0.0))
        .unwrap();
    scene.add_host(ElementId(3), ElementView::new(-100.0, 30.0)).unwrap();
    scene.connect(ElementId(3), ElementId(2)).unwrap();

    for _ in 0..5 {
        let snapshot = scene.physical_snapshot();
        driver.request_layout(move || snapshot).unwrap();
        let report = driver.drain_timeout(&mut scene, WAIT);
        assert_eq!(report.failed, 0);
    }

    let device = scene.position(ElementId(1)).unwrap();
    let port = scene.position(ElementId(2)).unwrap();
    assert_ne!(device, Vector2::new(0.0, 0.0));
    assert_eq!(port.minus(device), Vector2::new(10.0, 0.0));
}

#[test]
fn test_elements_changed_mid_pass_are_skipped() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();
    let snapshot = scene.physical_snapshot();
    let (release, gate) = mpsc::channel::<()>();
    driver
        .request_layout(move || {
            let _ = gate.recv();
            snapshot
        })
        .unwrap();

    // Mutations on the owning thread while the pass is in flight.
    scene.remove(ElementId(11)).unwrap();
    scene.set_subject_to_layout(ElementId(10), false).unwrap();
    release.send(()).unwrap();

    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(scene.position(ElementId(10)), Some(Vector2::new(-120.0, 40.0)));
    assert!(scene.position(ElementId(11)).is_none());
}

#[test]
fn test_reset_discards_in_flight_result() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();
    let snapshot = scene.physical_snapshot();
    let (release, gate) = mpsc::channel::<()>();
    driver
        .request_layout(move || {
            let _ = gate.recv();
            snapshot
        })
        .unwrap();

    driver.reset(PhysicalLayout::None);
    release.send(()).unwrap();

    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.stale, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(scene.position(ElementId(10)), Some(Vector2::new(-120.0, 40.0)));
    assert!(!driver.is_running());
    assert_eq!(driver.generation(), 1);
}

#[test]
fn test_reset_layout_is_not_run_with_old_snapshot() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();
    let snapshot = scene.physical_snapshot();
    let (release, gate) = mpsc::channel::<()>();
    driver
        .request_layout(move || {
            let _ = gate.recv();
            snapshot
        })
        .unwrap();

    driver.reset(force_directed());
    release.send(()).unwrap();

    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.stale, 1);
    assert_eq!(report.applied, 0);
    driver.with_layout(|layout| match layout {
        PhysicalLayout::ForceDirected(solver) => {
            assert!(solver.registry().is_empty());
            assert_eq!(solver.last_pass().iterations, 0);
        }
        other => panic!("unexpected layout {}", other.name()),
    });
}

#[test]
fn test_panicking_worker_releases_guard() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();
    driver
        .request_layout(|| -> topolayout_core::PhysicalSnapshot { panic!("snapshot failed") })
        .unwrap();

    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.failed, 1);
    assert!(!driver.is_running());
}

#[test]
fn test_invalid_snapshot_reports_failure() {
    let driver = LayoutDriver::new("office", force_directed());
    let mut scene = small_office();
    let snapshot = topolayout_core::PhysicalSnapshot::builder()
        .host(ElementId(1), ElementView::new(0.0, 0.0))
        .wire(ElementId(1), ElementId(404))
        .build();
    driver.request_layout(move || snapshot).unwrap();

    let report = driver.drain_timeout(&mut scene, WAIT);
    assert_eq!(report.failed, 1);
    assert!(!driver.is_running());
}

// ============================================================================
// Logical scenes and mirroring
// ============================================================================

#[test]
fn test_logical_scene_round_trip() {
    let config = LogicalForceConfig {
        budget: LayoutBudget::iterations_only(10),
        seed: Some(4),
        ..Default::default()
    };
    let driver = LayoutDriver::new(
        "logical",
        LogicalLayout::ForceDirected(ForceDirectedLogical::new(config).unwrap()),
    );
    let mut scene = LogicalScene::new();
    scene.set_viewport(1024.0, 768.0);
    for (n, (x, y)) in [(-200.0, 0.0), (200.0, 10.0), (0.0, 150.0)].into_iter().enumerate() {
        scene
            .add_vertex(ElementId(n as u64), ElementView::new(x, y))
            .unwrap();
    }
    scene.connect(ElementId(0), ElementId(1)).unwrap();

    for _ in 0..5 {
        let snapshot = scene.logical_snapshot();
        driver.request_layout(move || snapshot).unwrap();
        driver.drain_timeout(&mut scene, WAIT);
    }
    for id in 0..3 {
        let position = scene.position(ElementId(id)).unwrap();
        assert!(position.is_finite());
        assert_eq!(position.x, position.x.floor());
    }
    assert_eq!(driver.with_layout(|layout| match layout {
        LogicalLayout::ForceDirected(solver) => solver.registry().len(),
        _ => 0,
    }), 3);
}

#[test]
fn test_mirror_follows_published_board() {
    let leader = LayoutDriver::new("leader", force_directed());
    let mut leading = small_office();
    let board = PositionBoard::new();
    let follower = LayoutDriver::new(
        "follower",
        PhysicalLayout::Mirror(MirrorLayout::new(Arc::new(board.clone()))),
    );
    let mut following = small_office();

    for _ in 0..3 {
        let snapshot = leading.physical_snapshot();
        leader.request_layout(move || snapshot).unwrap();
        leader.drain_timeout(&mut leading, WAIT);
        board.publish(leading.positions());

        let snapshot = following.physical_snapshot();
        follower.request_layout(move || snapshot).unwrap();
        follower.drain_timeout(&mut following, WAIT);
    }

    for id in [1, 10, 11] {
        assert_eq!(following.position(ElementId(id)), leading.position(ElementId(id)));
    }
    // Pinned in both scenes, so never mirrored.
    assert_eq!(following.position(ElementId(12)), Some(Vector2::new(33.3, 33.3)));
}
