//! Runtime plumbing for topolayout: background layout passes, in-memory
//! scenes and shared committed positions.
//!
//! ## Threading
//!
//! ```text
//!   owning thread                         worker thread (one per pass)
//!   ─────────────                         ────────────────────────────
//!   request_layout ──(guard set)──spawn──▶ snapshot()
//!        │                                 execute_layout()
//!        │                                      │
//!   drain(target) ◀────────── mpsc ─────── PassMessage
//!   apply floored positions
//!   (guard cleared)
//! ```
//!
//! A request made while the guard is set is dropped. Results started before
//! a [`LayoutDriver::reset`] are discarded.

mod board;
mod driver;
mod error;
mod scene;

pub use board::PositionBoard;
pub use driver::{DrainReport, LayoutDriver, LayoutTarget, PassMessage, RequestOutcome};
pub use error::RuntimeError;
pub use scene::{LogicalScene, PhysicalScene};
