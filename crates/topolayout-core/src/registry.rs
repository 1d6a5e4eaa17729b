//! Per-element simulation state and frame-boundary reconciliation.
//!
//! The registry is an arena: a dense, insertion-ordered table of
//! [`ElementState`] keyed by [`ElementId`]. It is the only place element state
//! is created, mutated between passes, or destroyed. Membership is driven
//! explicitly by [`ElementRegistry::reconcile`] at the start of every pass.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::SpeedRange;
use crate::element::{ElementId, ElementRole};
use crate::snapshot::{LogicalSnapshot, PhysicalSnapshot};
use crate::vector::Vector2;

/// Simulation state of one tracked element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    /// Role assigned at the most recent reconciliation.
    pub role: ElementRole,
    /// Accumulated impulses; persists across passes as momentum.
    pub velocity: Vector2,
    /// Position in simulation space.
    pub location: Vector2,
    /// Influence multiplier in pairwise forces.
    pub weight: f64,
    /// Snapshot of the element's layout flag for this pass.
    pub participates_this_frame: bool,
}

impl ElementState {
    fn new(role: ElementRole, velocity: Vector2) -> Self {
        Self {
            role,
            velocity,
            location: Vector2::ZERO,
            weight: 1.0,
            participates_this_frame: false,
        }
    }
}

/// Mapping between world coordinates and simulation coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// `world = sim * scale` on both axes.
    Uniform { scale: f64 },
    /// Per-axis scaling proportional to the viewport, with an optional
    /// square-to-circle perspective correction.
    Viewport {
        scale_x: f64,
        scale_y: f64,
        distort: bool,
    },
}

impl Projection {
    /// Viewport projection whose axes are the normalized viewport size times
    /// `unit_scale`. A degenerate viewport is treated as square.
    pub fn for_viewport(viewport: Vector2, unit_scale: f64, distort: bool) -> Self {
        let mut axes = viewport;
        if !axes.is_finite() || axes.x <= 0.0 || axes.y <= 0.0 {
            axes = Vector2::new(1.0, 1.0);
        }
        axes.normalize();
        Projection::Viewport {
            scale_x: axes.x * unit_scale,
            scale_y: axes.y * unit_scale,
            distort,
        }
    }

    pub fn world_to_sim(&self, world: Vector2) -> Vector2 {
        match *self {
            Projection::Uniform { scale } => Vector2::new(world.x / scale, world.y / scale),
            Projection::Viewport {
                scale_x,
                scale_y,
                distort,
            } => {
                let mut point = world;
                if distort {
                    remove_distortion(&mut point);
                }
                Vector2::new(point.x / scale_x, point.y / scale_y)
            }
        }
    }

    pub fn sim_to_world(&self, sim: Vector2) -> Vector2 {
        match *self {
            Projection::Uniform { scale } => Vector2::new(sim.x * scale, sim.y * scale),
            Projection::Viewport {
                scale_x,
                scale_y,
                distort,
            } => {
                let mut point = Vector2::new(sim.x * scale_x, sim.y * scale_y);
                if distort {
                    apply_distortion(&mut point);
                }
                point
            }
        }
    }

    /// World units per simulation unit along each axis.
    pub fn axis_scale(&self) -> Vector2 {
        match *self {
            Projection::Uniform { scale } => Vector2::new(scale, scale),
            Projection::Viewport {
                scale_x, scale_y, ..
            } => Vector2::new(scale_x, scale_y),
        }
    }
}

/// Push a point from the unit circle out onto the unit square.
fn apply_distortion(point: &mut Vector2) {
    if point.is_zero() {
        return;
    }
    let magnitude = point.magnitude();
    let ratio = if point.x.abs() < point.y.abs() {
        magnitude / point.y.abs()
    } else {
        magnitude / point.x.abs()
    };
    point.multiply(ratio);
}

/// Inverse of [`apply_distortion`].
fn remove_distortion(point: &mut Vector2) {
    if point.is_zero() {
        return;
    }
    let magnitude = point.magnitude();
    let ratio = if point.x.abs() < point.y.abs() {
        point.y.abs() / magnitude
    } else {
        point.x.abs() / magnitude
    };
    point.multiply(ratio);
}

/// Membership changes made by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileDelta {
    pub added: usize,
    pub removed: usize,
    pub role_changes: usize,
}

/// Owner of every [`ElementState`].
#[derive(Debug)]
pub struct ElementRegistry {
    states: IndexMap<ElementId, ElementState>,
    projection: Projection,
    rng: StdRng,
}

impl ElementRegistry {
    /// Create an empty registry. `seed` makes initial velocities reproducible.
    pub fn new(projection: Projection, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            states: IndexMap::new(),
            projection,
            rng,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn world_to_sim(&self, world: Vector2) -> Vector2 {
        self.projection.world_to_sim(world)
    }

    pub fn sim_to_world(&self, location: Vector2) -> Vector2 {
        self.projection.sim_to_world(location)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementState> {
        self.states.get_mut(&id)
    }

    /// State of a reconciled element.
    ///
    /// # Panics
    /// When `id` was never reconciled into the registry; callers must
    /// reconcile before querying.
    pub fn state(&self, id: ElementId) -> &ElementState {
        match self.states.get(&id) {
            Some(state) => state,
            None => panic!("element {id} queried before reconciliation"),
        }
    }

    /// Mutable state of a reconciled element.
    ///
    /// # Panics
    /// When `id` was never reconciled into the registry.
    pub fn state_mut(&mut self, id: ElementId) -> &mut ElementState {
        match self.states.get_mut(&id) {
            Some(state) => state,
            None => panic!("element {id} queried before reconciliation"),
        }
    }

    /// Dense index of a reconciled element.
    ///
    /// # Panics
    /// When `id` was never reconciled into the registry.
    pub fn index_of(&self, id: ElementId) -> usize {
        match self.states.get_index_of(&id) {
            Some(index) => index,
            None => panic!("element {id} queried before reconciliation"),
        }
    }

    pub(crate) fn at(&self, index: usize) -> (ElementId, &ElementState) {
        let (id, state) = self
            .states
            .get_index(index)
            .unwrap_or_else(|| panic!("registry index {index} out of bounds"));
        (*id, state)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut ElementState {
        let (_, state) = self
            .states
            .get_index_mut(index)
            .unwrap_or_else(|| panic!("registry index {index} out of bounds"));
        state
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &ElementState)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.states.keys().copied()
    }

    /// Drop all state; the next reconciliation starts momentum from scratch.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Match tracked membership to the physical live sets.
    ///
    /// Removes state for elements in none of the sets and creates state for
    /// newly observed ones. An element listed in several sets takes the role
    /// port, then device, then host. Calling it again with the same sets is a
    /// no-op.
    pub fn reconcile(
        &mut self,
        hosts: &IndexSet<ElementId>,
        ports: &IndexSet<ElementId>,
        devices: &IndexSet<ElementId>,
        speed_for: impl Fn(ElementRole) -> SpeedRange,
    ) -> ReconcileDelta {
        let live = ports
            .iter()
            .map(|id| (*id, ElementRole::Port))
            .chain(devices.iter().map(|id| (*id, ElementRole::Device)))
            .chain(hosts.iter().map(|id| (*id, ElementRole::Host)));
        self.reconcile_with(live, speed_for)
    }

    /// Match tracked membership to the logical vertex set.
    pub fn reconcile_vertices(
        &mut self,
        vertices: &IndexSet<ElementId>,
        speed: SpeedRange,
    ) -> ReconcileDelta {
        let live = vertices.iter().map(|id| (*id, ElementRole::Vertex));
        self.reconcile_with(live, |_| speed)
    }

    fn reconcile_with(
        &mut self,
        live: impl Iterator<Item = (ElementId, ElementRole)>,
        speed_for: impl Fn(ElementRole) -> SpeedRange,
    ) -> ReconcileDelta {
        let mut roles: IndexMap<ElementId, ElementRole> = IndexMap::new();
        for (id, role) in live {
            roles.entry(id).or_insert(role);
        }

        let before = self.states.len();
        self.states.retain(|id, _| roles.contains_key(id));
        let mut delta = ReconcileDelta {
            removed: before - self.states.len(),
            ..Default::default()
        };

        for (id, role) in roles {
            match self.states.get_mut(&id) {
                Some(state) => {
                    if state.role != role {
                        trace!(element = %id, from = state.role.label(), to = role.label(), "element_role_changed");
                        state.role = role;
                        delta.role_changes += 1;
                    }
                }
                None => {
                    let velocity = initial_velocity(&mut self.rng, speed_for(role));
                    self.states.insert(id, ElementState::new(role, velocity));
                    delta.added += 1;
                }
            }
        }

        if delta != ReconcileDelta::default() {
            trace!(
                added = delta.added,
                removed = delta.removed,
                role_changes = delta.role_changes,
                tracked = self.states.len(),
                "registry_reconciled"
            );
        }
        delta
    }

    /// Recompute weight, location and participation from a physical snapshot.
    ///
    /// Ports owned by a device weigh `1 / port count` of that device and lose
    /// any velocity; they only ever move with their device.
    ///
    /// # Panics
    /// When a tracked element is missing from the snapshot, which means the
    /// registry was not reconciled against it.
    pub fn refresh_derived_state(&mut self, snapshot: &PhysicalSnapshot) {
        let projection = self.projection;
        let mut port_counts: HashMap<ElementId, usize> = HashMap::new();
        for (id, state) in self.states.iter_mut() {
            let view = match snapshot.view(*id) {
                Some(view) => view,
                None => panic!("element {id} tracked but absent from the snapshot"),
            };

            let owner = match state.role {
                ElementRole::Port => snapshot.owner_of(*id),
                _ => None,
            };
            match owner {
                Some(device) => {
                    let count = *port_counts
                        .entry(device)
                        .or_insert_with(|| snapshot.ports_of(device).len());
                    state.weight = if count > 0 { 1.0 / count as f64 } else { 1.0 };
                    state.velocity = Vector2::ZERO;
                }
                None => state.weight = 1.0,
            }

            state.location = projection.world_to_sim(view.world);
            state.participates_this_frame = view.subject_to_layout && view.world.is_finite();
        }
    }

    /// Recompute location and participation from a logical snapshot.
    ///
    /// Vertices that do not participate lose their velocity so they start
    /// from rest when released.
    ///
    /// # Panics
    /// When a tracked vertex is missing from the snapshot.
    pub fn refresh_vertices(&mut self, snapshot: &LogicalSnapshot) {
        let projection = self.projection;
        for (id, state) in self.states.iter_mut() {
            let view = match snapshot.view(*id) {
                Some(view) => view,
                None => panic!("vertex {id} tracked but absent from the snapshot"),
            };
            state.weight = 1.0;
            state.location = projection.world_to_sim(view.world);
            state.participates_this_frame = view.subject_to_layout && view.world.is_finite();
            if !state.participates_this_frame {
                state.velocity = Vector2::ZERO;
            }
        }
    }
}

/// A random direction with a magnitude drawn from `range`.
fn initial_velocity(rng: &mut StdRng, range: SpeedRange) -> Vector2 {
    if range.is_still() {
        return Vector2::ZERO;
    }
    let mut velocity = Vector2::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5);
    velocity.normalize();
    let speed = if range.max > range.min {
        rng.random_range(range.min..range.max)
    } else {
        range.min
    };
    velocity.multiply(speed);
    velocity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementView;

    fn ids(values: &[u64]) -> IndexSet<ElementId> {
        values.iter().map(|v| ElementId(*v)).collect()
    }

    fn speeds(role: ElementRole) -> SpeedRange {
        match role {
            ElementRole::Host => SpeedRange::new(0.05, 0.15),
            ElementRole::Device => SpeedRange::new(0.5, 1.5),
            _ => SpeedRange::STILL,
        }
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let mut registry = ElementRegistry::new(Projection::Uniform { scale: 50.0 }, Some(7));
        let delta = registry.reconcile(&ids(&[1, 2]), &ids(&[3]), &ids(&[4]), speeds);
        assert_eq!(delta.added, 4);
        assert_eq!(registry.len(), 4);

        let delta = registry.reconcile(&ids(&[1]), &ids(&[]), &ids(&[4, 5]), speeds);
        assert_eq!(delta.removed, 2);
        assert_eq!(delta.added, 1);
        assert!(!registry.contains(ElementId(2)));
        assert!(!registry.contains(ElementId(3)));
        assert_eq!(registry.state(ElementId(5)).role, ElementRole::Device);
    }

    #[test]
    fn test_initial_speed_by_role() {
        let mut registry = ElementRegistry::new(Projection::Uniform { scale: 50.0 }, Some(11));
        registry.reconcile(&ids(&[1]), &ids(&[2]), &ids(&[3]), speeds);

        let host = registry.state(ElementId(1)).velocity.magnitude();
        assert!((0.05 - 1e-12..0.15 + 1e-12).contains(&host), "host speed {host}");
        assert_eq!(registry.state(ElementId(2)).velocity, Vector2::ZERO);
        let device = registry.state(ElementId(3)).velocity.magnitude();
        assert!((0.5 - 1e-12..1.5 + 1e-12).contains(&device), "device speed {device}");
    }

    #[test]
    fn test_role_precedence() {
        let mut registry = ElementRegistry::new(Projection::Uniform { scale: 50.0 }, Some(1));
        registry.reconcile(&ids(&[1]), &ids(&[1]), &ids(&[]), speeds);
        assert_eq!(registry.state(ElementId(1)).role, ElementRole::Port);

        let delta = registry.reconcile(&ids(&[1]), &ids(&[]), &ids(&[]), speeds);
        assert_eq!(delta.role_changes, 1);
        assert_eq!(registry.state(ElementId(1)).role, ElementRole::Host);
    }

    #[test]
    #[should_panic(expected = "queried before reconciliation")]
    fn test_unreconciled_lookup_panics() {
        let registry = ElementRegistry::new(Projection::Uniform { scale: 50.0 }, Some(1));
        registry.state(ElementId(42));
    }

    #[test]
    fn test_uniform_projection_round_trip() {
        let projection = Projection::Uniform { scale: 50.0 };
        let sim = projection.world_to_sim(Vector2::new(100.0, -25.0));
        assert_eq!(sim, Vector2::new(2.0, -0.5));
        assert_eq!(projection.sim_to_world(sim), Vector2::new(100.0, -25.0));
    }

    #[test]
    fn test_viewport_projection_inverts() {
        let projection = Projection::for_viewport(Vector2::new(800.0, 600.0), 160.0, true);
        let world = Vector2::new(120.0, -45.0);
        let back = projection.sim_to_world(projection.world_to_sim(world));
        assert!((back.x - world.x).abs() < 1e-9);
        assert!((back.y - world.y).abs() < 1e-9);

        let scale = projection.axis_scale();
        assert!((scale.x - 128.0).abs() < 1e-9);
        assert!((scale.y - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_viewport_is_square() {
        let projection = Projection::for_viewport(Vector2::ZERO, 160.0, false);
        let scale = projection.axis_scale();
        assert_eq!(scale.x, scale.y);
        assert!(scale.x.is_finite());
    }

    #[test]
    fn test_refresh_marks_non_finite_as_still() {
        let snapshot = PhysicalSnapshot::builder()
            .host(ElementId(1), ElementView::new(f64::NAN, 0.0))
            .build();
        let mut registry = ElementRegistry::new(Projection::Uniform { scale: 50.0 }, Some(1));
        registry.reconcile(snapshot.hosts(), snapshot.ports(), snapshot.devices(), speeds);
        registry.refresh_derived_state(&snapshot);
        assert!(!registry.state(ElementId(1)).participates_this_frame);
    }
}
