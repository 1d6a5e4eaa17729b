//! Error types for layout operations.

use thiserror::Error;

use crate::element::ElementId;

/// Errors that can occur while preparing or running a layout pass.
///
/// Degenerate numeric inputs (coincident elements, zero-length vectors) are
/// not errors; the solvers branch around them.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A wire or edge refers to an element outside the live sets.
    #[error("{connection} endpoint {element} is not part of the live element sets")]
    MissingEndpoint {
        connection: &'static str,
        element: ElementId,
    },

    /// An ownership entry refers to a device or port outside the live sets.
    #[error("ownership entry {device} -> {port} refers to an element that is not live")]
    MissingOwner { device: ElementId, port: ElementId },

    /// A force configuration value is out of range.
    #[error("invalid layout configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Configuration (de)serialization failed.
    #[error("configuration serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
