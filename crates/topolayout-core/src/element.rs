//! Layout participants and the read-only view the solvers take of them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vector::Vector2;

/// Opaque identity of a layout participant.
///
/// Elements are compared by identity only; two elements with identical
/// coordinates are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The simulation role an element plays in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRole {
    /// A free-standing endpoint in the physical graph.
    Host,
    /// An endpoint owned by a device; moves only with its device.
    Port,
    /// A device carrying zero or more ports.
    Device,
    /// A vertex of the logical graph.
    Vertex,
}

impl ElementRole {
    pub fn label(self) -> &'static str {
        match self {
            ElementRole::Host => "host",
            ElementRole::Port => "port",
            ElementRole::Device => "device",
            ElementRole::Vertex => "vertex",
        }
    }

    /// Whether the element appears in the output position map.
    pub fn is_placed(self) -> bool {
        !matches!(self, ElementRole::Port)
    }
}

/// What a solver reads from a visualization element at pass start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementView {
    /// Current world-space position.
    pub world: Vector2,
    /// False when the user pinned the element.
    pub subject_to_layout: bool,
    /// Tangent direction a wire curve leaves this endpoint at.
    #[serde(default)]
    pub control: Vector2,
}

impl ElementView {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            world: Vector2::new(x, y),
            subject_to_layout: true,
            control: Vector2::ZERO,
        }
    }

    pub fn pinned(mut self) -> Self {
        self.subject_to_layout = false;
        self
    }

    pub fn with_control(mut self, x: f64, y: f64) -> Self {
        self.control = Vector2::new(x, y);
        self
    }
}

/// A directed connection between two physical elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    pub source: ElementId,
    pub destination: ElementId,
}

impl Wire {
    pub fn new(source: ElementId, destination: ElementId) -> Self {
        Self {
            source,
            destination,
        }
    }
}
