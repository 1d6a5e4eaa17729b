//! In-memory visualizations: the mutable element sets a layout reads from
//! and writes back to.
//!
//! Scenes are owned by one thread. Layout workers never see them directly;
//! they get an immutable snapshot taken by the owner.

use indexmap::IndexMap;

use topolayout_core::{
    ElementId, ElementView, LogicalSnapshot, LogicalVisualization, PhysicalSnapshot,
    PhysicalVisualization, PositionMap, Vector2, Wire,
};

use crate::driver::LayoutTarget;
use crate::error::RuntimeError;

type Result<T> = std::result::Result<T, RuntimeError>;

/// A port and the device it belongs to, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PortEntry {
    owner: Option<ElementId>,
    view: ElementView,
}

/// Hosts, devices, ports and wires of a physical-graph visualization.
#[derive(Debug, Clone, Default)]
pub struct PhysicalScene {
    hosts: IndexMap<ElementId, ElementView>,
    devices: IndexMap<ElementId, ElementView>,
    ports: IndexMap<ElementId, PortEntry>,
    wires: Vec<Wire>,
}

impl PhysicalScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.hosts.contains_key(&id) || self.devices.contains_key(&id) || self.ports.contains_key(&id)
    }

    /// Number of hosts, devices and ports.
    pub fn len(&self) -> usize {
        self.hosts.len() + self.devices.len() + self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn add_host(&mut self, id: ElementId, view: ElementView) -> Result<()> {
        self.ensure_free(id)?;
        self.hosts.insert(id, view);
        Ok(())
    }

    pub fn add_device(&mut self, id: ElementId, view: ElementView) -> Result<()> {
        self.ensure_free(id)?;
        self.devices.insert(id, view);
        Ok(())
    }

    /// Add a port, optionally owned by an existing device.
    pub fn add_port(
        &mut self,
        id: ElementId,
        owner: Option<ElementId>,
        view: ElementView,
    ) -> Result<()> {
        self.ensure_free(id)?;
        if let Some(device) = owner {
            if !self.devices.contains_key(&device) {
                return Err(RuntimeError::UnknownElement(device));
            }
        }
        self.ports.insert(id, PortEntry { owner, view });
        Ok(())
    }

    pub fn connect(&mut self, source: ElementId, destination: ElementId) -> Result<()> {
        for id in [source, destination] {
            if !self.contains(id) {
                return Err(RuntimeError::UnknownElement(id));
            }
        }
        self.wires.push(Wire::new(source, destination));
        Ok(())
    }

    /// Remove an element with its wires. Removing a device removes its
    /// ports too. Returns the removed ids.
    pub fn remove(&mut self, id: ElementId) -> Result<Vec<ElementId>> {
        if !self.contains(id) {
            return Err(RuntimeError::UnknownElement(id));
        }
        let mut removed = vec![id];
        if self.devices.shift_remove(&id).is_some() {
            let owned: Vec<ElementId> = self
                .ports
                .iter()
                .filter(|(_, entry)| entry.owner == Some(id))
                .map(|(port, _)| *port)
                .collect();
            for port in owned {
                self.ports.shift_remove(&port);
                removed.push(port);
            }
        } else {
            self.hosts.shift_remove(&id);
            self.ports.shift_remove(&id);
        }
        self.wires
            .retain(|wire| !removed.contains(&wire.source) && !removed.contains(&wire.destination));
        Ok(removed)
    }

    /// Pin or release an element.
    pub fn set_subject_to_layout(&mut self, id: ElementId, subject: bool) -> Result<()> {
        self.view_mut(id)?.subject_to_layout = subject;
        Ok(())
    }

    /// Set the tangent wires leave `id` at.
    pub fn set_control(&mut self, id: ElementId, control: Vector2) -> Result<()> {
        self.view_mut(id)?.control = control;
        Ok(())
    }

    /// Move an element, e.g. when the user drags it. Ports owned by a moved
    /// device keep their offset from it.
    pub fn move_to(&mut self, id: ElementId, position: Vector2) -> Result<()> {
        let view = self.view_mut(id)?;
        let delta = position.minus(view.world);
        view.world = position;
        if self.devices.contains_key(&id) {
            self.shift_ports_of(id, delta);
        }
        Ok(())
    }

    fn shift_ports_of(&mut self, device: ElementId, delta: Vector2) {
        if delta.is_zero() || !delta.is_finite() {
            return;
        }
        for entry in self.ports.values_mut() {
            if entry.owner == Some(device) {
                entry.view.world.add(delta);
            }
        }
    }

    pub fn view(&self, id: ElementId) -> Option<&ElementView> {
        self.hosts
            .get(&id)
            .or_else(|| self.devices.get(&id))
            .or_else(|| self.ports.get(&id).map(|entry| &entry.view))
    }

    pub fn position(&self, id: ElementId) -> Option<Vector2> {
        self.view(id).map(|view| view.world)
    }

    /// Current positions of hosts and devices.
    pub fn positions(&self) -> PositionMap {
        self.hosts
            .iter()
            .chain(self.devices.iter())
            .map(|(id, view)| (*id, view.world))
            .collect()
    }

    fn view_mut(&mut self, id: ElementId) -> Result<&mut ElementView> {
        if let Some(view) = self.hosts.get_mut(&id) {
            return Ok(view);
        }
        if let Some(view) = self.devices.get_mut(&id) {
            return Ok(view);
        }
        match self.ports.get_mut(&id) {
            Some(entry) => Ok(&mut entry.view),
            None => Err(RuntimeError::UnknownElement(id)),
        }
    }

    fn ensure_free(&self, id: ElementId) -> Result<()> {
        if self.contains(id) {
            return Err(RuntimeError::DuplicateElement(id));
        }
        Ok(())
    }
}

impl PhysicalVisualization for PhysicalScene {
    fn physical_snapshot(&self) -> PhysicalSnapshot {
        let mut builder = PhysicalSnapshot::builder();
        for (id, view) in &self.hosts {
            builder = builder.host(*id, *view);
        }
        for (id, view) in &self.devices {
            builder = builder.device(*id, *view);
        }
        for (id, entry) in &self.ports {
            builder = builder.port(*id, entry.owner, entry.view);
        }
        for wire in &self.wires {
            builder = builder.wire(wire.source, wire.destination);
        }
        builder.build()
    }
}

impl LayoutTarget for PhysicalScene {
    fn accepts(&self, id: ElementId) -> bool {
        self.view(id).is_some_and(|view| view.subject_to_layout)
    }

    fn set_position(&mut self, id: ElementId, position: Vector2) {
        let _ = self.move_to(id, position);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct VertexEntry {
    view: ElementView,
    groups: Option<Vec<String>>,
}

/// Vertices, edges and the current grouping of a logical-graph
/// visualization.
#[derive(Debug, Clone)]
pub struct LogicalScene {
    vertices: IndexMap<ElementId, VertexEntry>,
    edges: Vec<(ElementId, ElementId)>,
    viewport: Vector2,
}

impl Default for LogicalScene {
    fn default() -> Self {
        Self {
            vertices: IndexMap::new(),
            edges: Vec::new(),
            viewport: Vector2::new(1.0, 1.0),
        }
    }
}

impl LogicalScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn viewport(&self) -> Vector2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Vector2::new(width, height);
    }

    pub fn add_vertex(&mut self, id: ElementId, view: ElementView) -> Result<()> {
        if self.contains(id) {
            return Err(RuntimeError::DuplicateElement(id));
        }
        self.vertices.insert(id, VertexEntry { view, groups: None });
        Ok(())
    }

    /// Set the values `id` has for the current grouping; `None` clears them.
    pub fn set_groups(&mut self, id: ElementId, groups: Option<Vec<String>>) -> Result<()> {
        let entry = self
            .vertices
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownElement(id))?;
        entry.groups = groups;
        Ok(())
    }

    pub fn connect(&mut self, a: ElementId, b: ElementId) -> Result<()> {
        for id in [a, b] {
            if !self.contains(id) {
                return Err(RuntimeError::UnknownElement(id));
            }
        }
        self.edges.push((a, b));
        Ok(())
    }

    pub fn remove(&mut self, id: ElementId) -> Result<()> {
        if self.vertices.shift_remove(&id).is_none() {
            return Err(RuntimeError::UnknownElement(id));
        }
        self.edges.retain(|(a, b)| *a != id && *b != id);
        Ok(())
    }

    pub fn set_subject_to_layout(&mut self, id: ElementId, subject: bool) -> Result<()> {
        let entry = self
            .vertices
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownElement(id))?;
        entry.view.subject_to_layout = subject;
        Ok(())
    }

    pub fn position(&self, id: ElementId) -> Option<Vector2> {
        self.vertices.get(&id).map(|entry| entry.view.world)
    }

    pub fn positions(&self) -> PositionMap {
        self.vertices
            .iter()
            .map(|(id, entry)| (*id, entry.view.world))
            .collect()
    }
}

impl LogicalVisualization for LogicalScene {
    fn logical_snapshot(&self) -> LogicalSnapshot {
        let mut builder = LogicalSnapshot::builder().viewport(self.viewport.x, self.viewport.y);
        for (id, entry) in &self.vertices {
            builder = match &entry.groups {
                Some(groups) => builder.grouped_vertex(*id, entry.view, groups.iter().cloned()),
                None => builder.vertex(*id, entry.view),
            };
        }
        for (a, b) in &self.edges {
            builder = builder.edge(*a, *b);
        }
        builder.build()
    }
}

impl LayoutTarget for LogicalScene {
    fn accepts(&self, id: ElementId) -> bool {
        self.vertices
            .get(&id)
            .is_some_and(|entry| entry.view.subject_to_layout)
    }

    fn set_position(&mut self, id: ElementId, position: Vector2) {
        if let Some(entry) = self.vertices.get_mut(&id) {
            entry.view.world = position;
        }
    }
}
