//! Force-directed layout of the logical graph.
//!
//! Vertices are treated as isolated entities of equal mass. Every vertex is
//! repelled by every other vertex, attracted to the vertices it shares an
//! edge with, attracted to (or repelled from) vertices by shared values of the
//! current grouping, and pulled toward the origin. Vertices move one at a
//! time, so later vertices in an iteration already see the earlier ones at
//! their new locations.
//!
//! Coordinates are scaled in proportion to the viewport so vertices spread to
//! fill it, and optionally pass through a square-to-circle perspective
//! transform.

use petgraph::graphmap::UnGraphMap;
use tracing::debug;

use crate::budget::PassStats;
use crate::config::LogicalForceConfig;
use crate::element::ElementId;
use crate::registry::{ElementRegistry, Projection};
use crate::snapshot::LogicalSnapshot;
use crate::vector::Vector2;
use crate::{PositionMap, Result};

/// Incremental force-directed solver for logical-graph vertices.
#[derive(Debug)]
pub struct ForceDirectedLogical {
    config: LogicalForceConfig,
    registry: ElementRegistry,
    last_pass: PassStats,
}

impl ForceDirectedLogical {
    pub fn new(config: LogicalForceConfig) -> Result<Self> {
        config.validate()?;
        let projection = Projection::for_viewport(
            Vector2::new(1.0, 1.0),
            config.unit_scale,
            config.apply_distortion,
        );
        let registry = ElementRegistry::new(projection, config.seed);
        Ok(Self {
            config,
            registry,
            last_pass: PassStats::default(),
        })
    }

    pub fn config(&self) -> &LogicalForceConfig {
        &self.config
    }

    /// Replace the coefficients. Takes effect at the next pass.
    pub fn set_config(&mut self, config: LogicalForceConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    pub fn last_pass(&self) -> PassStats {
        self.last_pass
    }

    pub fn requires_forced_update(&self) -> bool {
        false
    }

    /// Run one budgeted pass and return world positions for every
    /// participating vertex.
    pub fn execute_layout(&mut self, snapshot: &LogicalSnapshot) -> Result<PositionMap> {
        let mut clock = self.config.budget.start();
        snapshot.validate()?;

        self.prepare(snapshot);
        if snapshot.is_empty() {
            self.last_pass = PassStats::default();
            return Ok(PositionMap::new());
        }

        let adjacency = adjacency(snapshot);
        while clock.next_iteration() {
            self.step(snapshot, &adjacency);
        }

        let mut positions = PositionMap::new();
        for id in snapshot.vertices() {
            let state = self.registry.state(*id);
            if state.participates_this_frame {
                positions.insert(*id, self.registry.sim_to_world(state.location));
            }
        }

        self.last_pass = PassStats {
            iterations: clock.iterations(),
            elapsed: clock.elapsed(),
            tracked: self.registry.len(),
            placed: positions.len(),
        };
        debug!(
            iterations = self.last_pass.iterations,
            elapsed_us = self.last_pass.elapsed.as_micros() as u64,
            tracked = self.last_pass.tracked,
            placed = self.last_pass.placed,
            "logical_layout_pass"
        );
        Ok(positions)
    }

    /// Update the projection for the snapshot's viewport, reconcile and
    /// refresh derived state.
    pub fn prepare(&mut self, snapshot: &LogicalSnapshot) {
        self.registry.set_projection(Projection::for_viewport(
            snapshot.viewport(),
            self.config.unit_scale,
            self.config.apply_distortion,
        ));
        self.registry
            .reconcile_vertices(snapshot.vertices(), self.config.initial_speed);
        self.registry.refresh_vertices(snapshot);
    }

    /// One solver iteration over every vertex.
    pub fn step(&mut self, snapshot: &LogicalSnapshot, adjacency: &UnGraphMap<ElementId, ()>) {
        let c = &self.config;
        let equilibrium_squared = c.equilibrium_distance * c.equilibrium_distance;
        let min_distance_squared = c.min_effective_distance * c.min_effective_distance;
        let axis_scale = self.registry.projection().axis_scale();

        for vertex in snapshot.vertices() {
            let index = self.registry.index_of(*vertex);
            let (_, state) = self.registry.at(index);
            if !state.participates_this_frame {
                self.registry.at_mut(index).velocity = Vector2::ZERO;
                continue;
            }
            let here = state.location;
            let mut velocity = state.velocity;
            velocity.multiply(c.momentum_decay);

            let groups = snapshot.groups_of(*vertex);

            for other in snapshot.vertices() {
                let there = self.registry.state(*other).location;
                if !there.is_finite() {
                    continue;
                }

                let mut direction;
                let mut force = 0.0;
                if other == vertex {
                    direction = here;
                    force -= c.origin_mass * c.equilibrium_distance.min(direction.magnitude());
                    direction.normalize();
                } else {
                    direction = there.minus(here);
                    let mut distance_squared = direction.magnitude_squared();
                    // Coincident vertices have no direction to push along.
                    if distance_squared == 0.0 {
                        continue;
                    }
                    direction.normalize();
                    distance_squared = distance_squared.max(min_distance_squared);

                    force -= 1.0 / distance_squared;
                    if adjacency.contains_edge(*vertex, *other) {
                        force += 1.0 / equilibrium_squared;
                    }
                    if let (Some(mine), Some(theirs)) = (groups, snapshot.groups_of(*other)) {
                        for value in mine {
                            if theirs.contains(value) {
                                force += c.grouping_coefficient / equilibrium_squared;
                            } else {
                                force -= c.grouping_repulsion_coefficient / equilibrium_squared;
                            }
                        }
                    }
                }
                direction.multiply(force * c.force_multiplier);
                velocity.add(direction);
            }

            // Quantize movement to the noise-reduction step in world units.
            let step_x = (velocity.x * axis_scale.x / c.noise_reduction).floor() * c.noise_reduction;
            let step_y = (velocity.y * axis_scale.y / c.noise_reduction).floor() * c.noise_reduction;

            let state = self.registry.at_mut(index);
            state.velocity = velocity;
            state
                .location
                .add_xy(step_x / axis_scale.x, step_y / axis_scale.y);
        }
    }
}

/// Undirected adjacency of the snapshot's edges.
pub fn adjacency(snapshot: &LogicalSnapshot) -> UnGraphMap<ElementId, ()> {
    let mut graph = UnGraphMap::new();
    for id in snapshot.vertices() {
        graph.add_node(*id);
    }
    for (a, b) in snapshot.edges() {
        graph.add_edge(*a, *b, ());
    }
    graph
}
