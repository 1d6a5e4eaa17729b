//! Run command implementation.
//!
//! Loads a topology document, drives frames through a background layout
//! driver exactly as a UI would (request, then drain on this thread) and
//! reports the final positions.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use topolayout_core::{
    ElementId, ForceDirectedLogical, ForceDirectedPhysical, GraphLayout, LogicalLayout,
    LogicalVisualization, PhysicalLayout, PhysicalVisualization, PositionMap, Vector2,
};
use topolayout_runtime::{DrainReport, LayoutDriver, LayoutTarget, RequestOutcome};

use crate::config::Config;
use crate::topology::TopologyDocument;

/// How `tl run` prints positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" | "text" => Ok(Self::Table),
            _ => anyhow::bail!("Unknown format: {}. Use 'json' or 'table'", s),
        }
    }
}

/// Result of a run, as written in JSON form.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub kind: String,
    pub frames: usize,
    pub passes_started: usize,
    pub requests_dropped: usize,
    pub totals: DrainReport,
    pub elapsed_ms: u128,
    pub positions: BTreeMap<ElementId, Vector2>,
}

/// Execute `tl run`.
pub fn execute(
    config: &Config,
    topology: &Path,
    frames: usize,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let document = TopologyDocument::load(topology)?;
    info!(
        topology = %topology.display(),
        kind = document.kind(),
        frames,
        "run_start"
    );

    let timeout = Duration::from_millis(config.frame_timeout_ms);
    let summary = match &document {
        TopologyDocument::Physical(physical) => {
            let mut scene = physical.to_scene()?;
            let layout = PhysicalLayout::ForceDirected(
                ForceDirectedPhysical::new(config.physical.clone())
                    .context("Invalid physical layout configuration")?,
            );
            let driver = LayoutDriver::new("physical", layout);
            let mut summary = drive(&driver, &mut scene, frames, timeout, |scene| {
                scene.physical_snapshot()
            })?;
            summary.positions = sorted(scene.positions());
            summary
        }
        TopologyDocument::Logical(logical) => {
            let mut scene = logical.to_scene()?;
            let layout = LogicalLayout::ForceDirected(
                ForceDirectedLogical::new(config.logical.clone())
                    .context("Invalid logical layout configuration")?,
            );
            let driver = LayoutDriver::new("logical", layout);
            let mut summary = drive(&driver, &mut scene, frames, timeout, |scene| {
                scene.logical_snapshot()
            })?;
            summary.positions = sorted(scene.positions());
            summary
        }
    };

    info!(
        passes = summary.totals.passes,
        applied = summary.totals.applied,
        dropped = summary.requests_dropped,
        elapsed_ms = summary.elapsed_ms as u64,
        "run_complete"
    );

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
        OutputFormat::Table => render_table(&summary),
    };
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            println!("✅ Wrote {} positions to {}", summary.positions.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

/// Request one pass per frame and apply it before the next frame.
fn drive<L, T>(
    driver: &LayoutDriver<L>,
    scene: &mut T,
    frames: usize,
    timeout: Duration,
    snapshot_of: impl Fn(&T) -> L::Snapshot,
) -> Result<RunSummary>
where
    L: GraphLayout + Send + 'static,
    L::Snapshot: Send + 'static,
    T: LayoutTarget,
{
    let start = Instant::now();
    let mut summary = RunSummary {
        kind: driver.name().to_string(),
        frames,
        passes_started: 0,
        requests_dropped: 0,
        totals: DrainReport::default(),
        elapsed_ms: 0,
        positions: BTreeMap::new(),
    };

    for frame in 0..frames {
        let snapshot = snapshot_of(scene);
        match driver.request_layout(move || snapshot)? {
            RequestOutcome::Started => summary.passes_started += 1,
            RequestOutcome::Dropped => summary.requests_dropped += 1,
        }
        let report = driver.drain_timeout(scene, timeout);
        if report.failed > 0 {
            warn!(frame, "layout_frame_failed");
        }
        summary.totals.merge(report);
    }

    // Let the last pass land if it overran its frame.
    if driver.is_running() {
        let report = driver.drain_timeout(scene, timeout);
        summary.totals.merge(report);
    }

    summary.elapsed_ms = start.elapsed().as_millis();
    Ok(summary)
}

fn sorted(positions: PositionMap) -> BTreeMap<ElementId, Vector2> {
    positions.into_iter().collect()
}

fn render_table(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} layout: {} frames, {} passes, {} positions applied\n",
        summary.kind, summary.frames, summary.totals.passes, summary.totals.applied
    ));
    out.push_str(&format!("{:-<40}\n", ""));
    out.push_str(&format!("{:<10} {:>12} {:>12}\n", "element", "x", "y"));
    for (id, position) in &summary.positions {
        out.push_str(&format!(
            "{:<10} {:>12.1} {:>12.1}\n",
            id.0, position.x, position.y
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_table_lists_every_position() {
        let mut positions = BTreeMap::new();
        positions.insert(ElementId(2), Vector2::new(3.0, -4.0));
        positions.insert(ElementId(1), Vector2::new(0.0, 0.0));
        let summary = RunSummary {
            kind: "physical".to_string(),
            frames: 1,
            passes_started: 1,
            requests_dropped: 0,
            totals: DrainReport::default(),
            elapsed_ms: 0,
            positions,
        };
        let table = render_table(&summary);
        assert!(table.starts_with("physical layout"));
        let rows: Vec<&str> = table.lines().skip(3).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with('1'));
    }
}
