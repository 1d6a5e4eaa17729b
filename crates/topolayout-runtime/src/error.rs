//! Error types for the layout runtime.

use thiserror::Error;

/// Errors raised while scheduling a layout pass.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The worker thread for a pass could not be started.
    #[error("failed to spawn layout worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A scene operation referred to an element the scene does not hold.
    #[error("unknown element {0}")]
    UnknownElement(topolayout_core::ElementId),

    /// An element id is already in use in the scene.
    #[error("element {0} already exists")]
    DuplicateElement(topolayout_core::ElementId),
}
