//! The closed set of layout strategies a visualization can select.
//!
//! Each graph kind has a tagged variant over force-directed physics, a mirror
//! of another visualization and no layout at all. [`GraphLayout`] is the
//! shape the rendering side drives them through.

use crate::logical::ForceDirectedLogical;
use crate::mirror::MirrorLayout;
use crate::physical::ForceDirectedPhysical;
use crate::snapshot::{LogicalSnapshot, PhysicalSnapshot};
use crate::{PositionMap, Result};

/// A layout the rendering side can run once per layout pass.
pub trait GraphLayout {
    /// What one pass reads from the visualization.
    type Snapshot;

    /// Whether the caller should schedule another pass immediately after
    /// applying this one's positions.
    fn requires_forced_update(&self) -> bool;

    /// Compute world positions for the elements in `snapshot`.
    fn execute_layout(&mut self, snapshot: &Self::Snapshot) -> Result<PositionMap>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Layout strategy for a physical-graph visualization.
#[derive(Debug, Default)]
pub enum PhysicalLayout {
    ForceDirected(ForceDirectedPhysical),
    Mirror(MirrorLayout),
    #[default]
    None,
}

impl GraphLayout for PhysicalLayout {
    type Snapshot = PhysicalSnapshot;

    fn requires_forced_update(&self) -> bool {
        match self {
            PhysicalLayout::ForceDirected(layout) => layout.requires_forced_update(),
            PhysicalLayout::Mirror(_) | PhysicalLayout::None => false,
        }
    }

    fn execute_layout(&mut self, snapshot: &PhysicalSnapshot) -> Result<PositionMap> {
        match self {
            PhysicalLayout::ForceDirected(layout) => layout.execute_layout(snapshot),
            PhysicalLayout::Mirror(mirror) => Ok(mirror.mirror(snapshot.placeable())),
            PhysicalLayout::None => Ok(PositionMap::new()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PhysicalLayout::ForceDirected(_) => "force_directed",
            PhysicalLayout::Mirror(_) => "mirror",
            PhysicalLayout::None => "none",
        }
    }
}

/// Layout strategy for a logical-graph visualization.
#[derive(Debug, Default)]
pub enum LogicalLayout {
    ForceDirected(ForceDirectedLogical),
    Mirror(MirrorLayout),
    #[default]
    None,
}

impl GraphLayout for LogicalLayout {
    type Snapshot = LogicalSnapshot;

    fn requires_forced_update(&self) -> bool {
        match self {
            LogicalLayout::ForceDirected(layout) => layout.requires_forced_update(),
            LogicalLayout::Mirror(_) | LogicalLayout::None => false,
        }
    }

    fn execute_layout(&mut self, snapshot: &LogicalSnapshot) -> Result<PositionMap> {
        match self {
            LogicalLayout::ForceDirected(layout) => layout.execute_layout(snapshot),
            LogicalLayout::Mirror(mirror) => Ok(mirror.mirror(snapshot.placeable())),
            LogicalLayout::None => Ok(PositionMap::new()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            LogicalLayout::ForceDirected(_) => "force_directed",
            LogicalLayout::Mirror(_) => "mirror",
            LogicalLayout::None => "none",
        }
    }
}
