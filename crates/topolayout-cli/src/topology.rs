//! Topology documents read by `tl run`.
//!
//! A document is JSON tagged by `kind`:
//!
//! ```json
//! { "kind": "physical",
//!   "hosts":   [{ "id": 1, "x": -40, "y": 10 }],
//!   "devices": [{ "id": 2 }],
//!   "ports":   [{ "id": 3, "owner": 2 }],
//!   "wires":   [{ "source": 1, "destination": 3 }] }
//! ```
//!
//! Logical documents list `vertices` (with optional `groups`), `edges` as
//! id pairs and an optional `viewport`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use topolayout_core::{ElementId, ElementView, Vector2, Wire};
use topolayout_runtime::{LogicalScene, PhysicalScene};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TopologyDocument {
    Physical(PhysicalDocument),
    Logical(LogicalDocument),
}

impl TopologyDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topology from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse topology {}", path.display()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TopologyDocument::Physical(_) => "physical",
            TopologyDocument::Logical(_) => "logical",
        }
    }
}

/// A placed element: position, pin state and wire tangent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: ElementId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Vector2>,
}

impl NodeRecord {
    fn view(&self) -> ElementView {
        let mut view = ElementView::new(self.x, self.y);
        view.subject_to_layout = !self.pinned;
        if let Some(control) = self.control {
            view.control = control;
        }
        view
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRecord {
    #[serde(flatten)]
    pub node: NodeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ElementId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicalDocument {
    #[serde(default)]
    pub hosts: Vec<NodeRecord>,
    #[serde(default)]
    pub devices: Vec<NodeRecord>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl PhysicalDocument {
    pub fn to_scene(&self) -> Result<PhysicalScene> {
        let mut scene = PhysicalScene::new();
        for host in &self.hosts {
            scene
                .add_host(host.id, host.view())
                .with_context(|| format!("Invalid host {}", host.id))?;
        }
        for device in &self.devices {
            scene
                .add_device(device.id, device.view())
                .with_context(|| format!("Invalid device {}", device.id))?;
        }
        for port in &self.ports {
            scene
                .add_port(port.node.id, port.owner, port.node.view())
                .with_context(|| format!("Invalid port {}", port.node.id))?;
        }
        for wire in &self.wires {
            scene
                .connect(wire.source, wire.destination)
                .with_context(|| format!("Invalid wire {} -> {}", wire.source, wire.destination))?;
        }
        Ok(scene)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexRecord {
    #[serde(flatten)]
    pub node: NodeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalDocument {
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<(ElementId, ElementId)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportSize>,
}

impl LogicalDocument {
    pub fn to_scene(&self) -> Result<LogicalScene> {
        let mut scene = LogicalScene::new();
        if let Some(viewport) = self.viewport {
            scene.set_viewport(viewport.width, viewport.height);
        }
        for vertex in &self.vertices {
            let id = vertex.node.id;
            scene
                .add_vertex(id, vertex.node.view())
                .with_context(|| format!("Invalid vertex {id}"))?;
            if vertex.groups.is_some() {
                scene.set_groups(id, vertex.groups.clone())?;
            }
        }
        for (a, b) in &self.edges {
            scene
                .connect(*a, *b)
                .with_context(|| format!("Invalid edge {a} - {b}"))?;
        }
        Ok(scene)
    }
}
