//! Immutable per-pass snapshots of a visualization's live element sets.
//!
//! The visualization mutates its elements on the UI thread while a pass runs
//! on a worker thread, so a pass never reads the visualization directly: it
//! reads a snapshot copied at pass start. Mutations made after that point are
//! picked up by the next pass.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::element::{ElementId, ElementView, Wire};
use crate::error::LayoutError;
use crate::vector::Vector2;
use crate::Result;

/// Anything that can produce a physical-graph snapshot.
pub trait PhysicalVisualization {
    fn physical_snapshot(&self) -> PhysicalSnapshot;
}

/// Anything that can produce a logical-graph snapshot.
pub trait LogicalVisualization {
    fn logical_snapshot(&self) -> LogicalSnapshot;
}

/// Hosts, ports, devices and wires of the physical graph at pass start.
#[derive(Debug, Clone, Default)]
pub struct PhysicalSnapshot {
    hosts: IndexSet<ElementId>,
    ports: IndexSet<ElementId>,
    devices: IndexSet<ElementId>,
    wires: Vec<Wire>,
    ports_of: HashMap<ElementId, Vec<ElementId>>,
    owner_of: HashMap<ElementId, ElementId>,
    views: HashMap<ElementId, ElementView>,
}

impl PhysicalSnapshot {
    pub fn builder() -> PhysicalSnapshotBuilder {
        PhysicalSnapshotBuilder::default()
    }

    pub fn hosts(&self) -> &IndexSet<ElementId> {
        &self.hosts
    }

    pub fn ports(&self) -> &IndexSet<ElementId> {
        &self.ports
    }

    pub fn devices(&self) -> &IndexSet<ElementId> {
        &self.devices
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Ports owned by `device`, empty when it owns none.
    pub fn ports_of(&self, device: ElementId) -> &[ElementId] {
        self.ports_of
            .get(&device)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The device owning `port`, if any.
    pub fn owner_of(&self, port: ElementId) -> Option<ElementId> {
        self.owner_of.get(&port).copied()
    }

    pub fn view(&self, id: ElementId) -> Option<&ElementView> {
        self.views.get(&id)
    }

    pub fn is_port(&self, id: ElementId) -> bool {
        self.ports.contains(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.hosts.contains(&id) || self.ports.contains(&id) || self.devices.contains(&id)
    }

    /// Total number of live elements.
    pub fn len(&self) -> usize {
        self.hosts.len() + self.ports.len() + self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements that receive a position from a layout: hosts and devices.
    pub fn placeable(&self) -> impl Iterator<Item = (ElementId, &ElementView)> + '_ {
        self.hosts
            .iter()
            .chain(self.devices.iter())
            .filter_map(move |id| self.views.get(id).map(|view| (*id, view)))
    }

    /// Check wires and ownership only refer to live elements.
    pub fn validate(&self) -> Result<()> {
        for wire in &self.wires {
            for element in [wire.source, wire.destination] {
                if !self.contains(element) || !self.views.contains_key(&element) {
                    return Err(LayoutError::MissingEndpoint {
                        connection: "wire",
                        element,
                    });
                }
            }
        }
        for (device, ports) in &self.ports_of {
            for port in ports {
                if !self.devices.contains(device) || !self.ports.contains(port) {
                    return Err(LayoutError::MissingOwner {
                        device: *device,
                        port: *port,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`PhysicalSnapshot`].
#[derive(Debug, Default)]
pub struct PhysicalSnapshotBuilder {
    snapshot: PhysicalSnapshot,
}

impl PhysicalSnapshotBuilder {
    pub fn host(mut self, id: ElementId, view: ElementView) -> Self {
        self.snapshot.hosts.insert(id);
        self.snapshot.views.insert(id, view);
        self
    }

    pub fn device(mut self, id: ElementId, view: ElementView) -> Self {
        self.snapshot.devices.insert(id);
        self.snapshot.views.insert(id, view);
        self
    }

    /// Add a port, optionally owned by `owner`.
    pub fn port(mut self, id: ElementId, owner: Option<ElementId>, view: ElementView) -> Self {
        self.snapshot.ports.insert(id);
        self.snapshot.views.insert(id, view);
        if let Some(device) = owner {
            let owned = self.snapshot.ports_of.entry(device).or_default();
            if !owned.contains(&id) {
                owned.push(id);
            }
            self.snapshot.owner_of.insert(id, device);
        }
        self
    }

    pub fn wire(mut self, source: ElementId, destination: ElementId) -> Self {
        self.snapshot.wires.push(Wire::new(source, destination));
        self
    }

    pub fn build(self) -> PhysicalSnapshot {
        self.snapshot
    }
}

/// Vertices, edges and group memberships of the logical graph at pass start.
#[derive(Debug, Clone)]
pub struct LogicalSnapshot {
    vertices: IndexSet<ElementId>,
    edges: Vec<(ElementId, ElementId)>,
    groups: HashMap<ElementId, Vec<String>>,
    views: HashMap<ElementId, ElementView>,
    viewport: Vector2,
}

impl Default for LogicalSnapshot {
    fn default() -> Self {
        Self {
            vertices: IndexSet::new(),
            edges: Vec::new(),
            groups: HashMap::new(),
            views: HashMap::new(),
            viewport: Vector2::new(1.0, 1.0),
        }
    }
}

impl LogicalSnapshot {
    pub fn builder() -> LogicalSnapshotBuilder {
        LogicalSnapshotBuilder::default()
    }

    pub fn vertices(&self) -> &IndexSet<ElementId> {
        &self.vertices
    }

    pub fn edges(&self) -> &[(ElementId, ElementId)] {
        &self.edges
    }

    /// Values of the current grouping for `vertex`; `None` when the vertex
    /// has no value for it.
    pub fn groups_of(&self, vertex: ElementId) -> Option<&[String]> {
        self.groups.get(&vertex).map(Vec::as_slice)
    }

    pub fn view(&self, id: ElementId) -> Option<&ElementView> {
        self.views.get(&id)
    }

    /// Width and height of the viewport the graph is drawn in.
    pub fn viewport(&self) -> Vector2 {
        self.viewport
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.vertices.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn placeable(&self) -> impl Iterator<Item = (ElementId, &ElementView)> + '_ {
        self.vertices
            .iter()
            .filter_map(move |id| self.views.get(id).map(|view| (*id, view)))
    }

    pub fn validate(&self) -> Result<()> {
        for (a, b) in &self.edges {
            for element in [*a, *b] {
                if !self.vertices.contains(&element) {
                    return Err(LayoutError::MissingEndpoint {
                        connection: "edge",
                        element,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`LogicalSnapshot`].
#[derive(Debug, Default)]
pub struct LogicalSnapshotBuilder {
    snapshot: LogicalSnapshot,
}

impl LogicalSnapshotBuilder {
    pub fn vertex(mut self, id: ElementId, view: ElementView) -> Self {
        self.snapshot.vertices.insert(id);
        self.snapshot.views.insert(id, view);
        self
    }

    /// Add a vertex carrying values for the current grouping.
    pub fn grouped_vertex<I, S>(mut self, id: ElementId, view: ElementView, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snapshot.vertices.insert(id);
        self.snapshot.views.insert(id, view);
        let mut values: Vec<String> = groups.into_iter().map(Into::into).collect();
        values.sort();
        values.dedup();
        self.snapshot.groups.insert(id, values);
        self
    }

    pub fn edge(mut self, a: ElementId, b: ElementId) -> Self {
        self.snapshot.edges.push((a, b));
        self
    }

    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.snapshot.viewport = Vector2::new(width, height);
        self
    }

    pub fn build(self) -> LogicalSnapshot {
        self.snapshot
    }
}
