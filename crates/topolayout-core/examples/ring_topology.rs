//! Lay out a ring of switches, each with a few attached hosts.
//!
//! Run with: cargo run -p topolayout-core --example ring_topology

use std::time::Instant;

use topolayout_core::{
    ElementId, ElementView, ForceDirectedPhysical, PhysicalForceConfig, PhysicalSnapshot,
    PositionMap, Vector2,
};

const SWITCHES: u64 = 8;
const HOSTS_PER_SWITCH: u64 = 3;
const FRAMES: usize = 120;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut positions = initial_positions();
    let mut layout = ForceDirectedPhysical::new(PhysicalForceConfig {
        seed: Some(42),
        ..Default::default()
    })?;

    println!("=== Ring topology ===");
    println!(
        "{} switches, {} hosts, {} frames",
        SWITCHES,
        SWITCHES * HOSTS_PER_SWITCH,
        FRAMES
    );

    let start = Instant::now();
    for frame in 0..FRAMES {
        let snapshot = build_snapshot(&positions);
        let placed = layout.execute_layout(&snapshot)?;
        // Apply the way a renderer would: whole world units only.
        for (id, position) in placed {
            positions.insert(id, Vector2::new(position.x.floor(), position.y.floor()));
        }

        if frame == 0 || frame == FRAMES / 2 || frame == FRAMES - 1 {
            let (width, height) = extent(&positions);
            println!(
                "  frame {:3}: {} iterations, extent {:.0} x {:.0}",
                frame,
                layout.last_pass().iterations,
                width,
                height
            );
        }
    }

    println!();
    println!("Total time: {:.2?}", start.elapsed());
    Ok(())
}

fn switch_id(n: u64) -> ElementId {
    ElementId(n)
}

fn port_id(switch: u64, slot: u64) -> ElementId {
    ElementId(1_000 + switch * 10 + slot)
}

fn host_id(switch: u64, slot: u64) -> ElementId {
    ElementId(10_000 + switch * 10 + slot)
}

fn initial_positions() -> PositionMap {
    let mut positions = PositionMap::new();
    for s in 0..SWITCHES {
        let angle = s as f64 * 0.7;
        positions.insert(switch_id(s), Vector2::new(angle.cos() * 40.0, angle.sin() * 40.0));
        for h in 0..HOSTS_PER_SWITCH {
            let jitter = (s * HOSTS_PER_SWITCH + h) as f64;
            positions.insert(
                host_id(s, h),
                Vector2::new((jitter * 13.37).sin() * 60.0, (jitter * 7.13).cos() * 60.0),
            );
        }
    }
    positions
}

/// Ports sit on top of their switch, one per host. Switches are wired to
/// their ring neighbours directly.
fn build_snapshot(positions: &PositionMap) -> PhysicalSnapshot {
    let mut builder = PhysicalSnapshot::builder();
    for s in 0..SWITCHES {
        let at = positions[&switch_id(s)];
        builder = builder.device(switch_id(s), ElementView::new(at.x, at.y));
        for slot in 0..HOSTS_PER_SWITCH {
            builder = builder.port(port_id(s, slot), Some(switch_id(s)), ElementView::new(at.x, at.y));
        }
        for h in 0..HOSTS_PER_SWITCH {
            let host = positions[&host_id(s, h)];
            builder = builder
                .host(host_id(s, h), ElementView::new(host.x, host.y))
                .wire(host_id(s, h), port_id(s, h));
        }
    }
    for s in 0..SWITCHES {
        let next = (s + 1) % SWITCHES;
        builder = builder.wire(switch_id(s), switch_id(next));
    }
    builder.build()
}

fn extent(positions: &PositionMap) -> (f64, f64) {
    let (min_x, max_x, min_y, max_y) = positions.values().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    );
    (max_x - min_x, max_y - min_y)
}
