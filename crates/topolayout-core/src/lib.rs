//! Incremental force-directed layout for network topology visualizations.
//!
//! This crate positions the elements of two simulations that run once per
//! UI layout pass on a continuously mutating graph:
//!
//! - **physical**: hosts, devices, the ports owned by devices and the wires
//!   between them ([`ForceDirectedPhysical`])
//! - **logical**: address vertices, their edges and a grouping relation
//!   ([`ForceDirectedLogical`])
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Snapshot (per pass)                    │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Live sets   │───▶│  Registry   │───▶│  Refresh    │     │
//! │  │ (elements)  │    │ (reconcile) │    │ weight/loc  │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Solver loop (iteration + time budget)            │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Pairwise   │───▶│    Wire     │───▶│  Integrate  │     │
//! │  │ host forces │    │   forces    │    │  and decay  │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Position map                         │
//! │  Simulation locations scaled back to world coordinates      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cost
//!
//! The pairwise pass is O(participating hosts × tracked elements) per
//! iteration. Every pass is capped by [`LayoutBudget`] (10 iterations or
//! 3 ms by default), so large graphs degrade to fewer iterations per frame
//! instead of stalling the caller.

mod budget;
mod config;
mod element;
mod error;
mod logical;
mod mirror;
mod physical;
mod registry;
mod snapshot;
mod strategy;
mod vector;

pub use budget::{LayoutBudget, PassClock, PassStats};
pub use config::{LogicalForceConfig, PhysicalForceConfig, SpeedRange};
pub use element::{ElementId, ElementRole, ElementView, Wire};
pub use error::LayoutError;
pub use logical::{adjacency, ForceDirectedLogical};
pub use mirror::{MirrorLayout, PositionSource};
pub use physical::ForceDirectedPhysical;
pub use registry::{ElementRegistry, ElementState, Projection, ReconcileDelta};
pub use snapshot::{
    LogicalSnapshot, LogicalSnapshotBuilder, LogicalVisualization, PhysicalSnapshot,
    PhysicalSnapshotBuilder, PhysicalVisualization,
};
pub use strategy::{GraphLayout, LogicalLayout, PhysicalLayout};
pub use vector::Vector2;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// World-space positions produced by one layout pass, keyed by element.
pub type PositionMap = std::collections::HashMap<ElementId, Vector2>;
