//! Force-directed layout of the physical graph.
//!
//! Each pass reconciles the registry with the snapshot's live sets, then runs
//! up to [`LayoutBudget::max_iterations`](crate::LayoutBudget) iterations of
//! three strictly ordered phases:
//!
//! 1. pairwise host forces: center seeking plus weighted inverse-square
//!    repulsion from every other tracked element;
//! 2. wire forces: attraction, local inverse control, remote control and
//!    rigidity on every non-port participating endpoint;
//! 3. integration: a device first carries its owned ports by its velocity,
//!    then moves itself, then its velocity decays.
//!
//! Ports never accumulate velocity of their own. Wires joining two ports
//! apply no force.

use tracing::debug;

use crate::budget::PassStats;
use crate::config::{PhysicalForceConfig, SpeedRange};
use crate::element::{ElementId, ElementRole};
use crate::registry::{ElementRegistry, Projection};
use crate::snapshot::PhysicalSnapshot;
use crate::vector::Vector2;
use crate::{PositionMap, Result};

/// Incremental force-directed solver for hosts, devices and ports.
#[derive(Debug)]
pub struct ForceDirectedPhysical {
    config: PhysicalForceConfig,
    registry: ElementRegistry,
    last_pass: PassStats,
}

impl ForceDirectedPhysical {
    pub fn new(config: PhysicalForceConfig) -> Result<Self> {
        config.validate()?;
        let registry = ElementRegistry::new(
            Projection::Uniform {
                scale: config.world_scale,
            },
            config.seed,
        );
        Ok(Self {
            config,
            registry,
            last_pass: PassStats::default(),
        })
    }

    pub fn config(&self) -> &PhysicalForceConfig {
        &self.config
    }

    /// Replace the coefficients; tracked state and momentum are kept.
    pub fn set_config(&mut self, config: PhysicalForceConfig) -> Result<()> {
        config.validate()?;
        self.registry.set_projection(Projection::Uniform {
            scale: config.world_scale,
        });
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

    /// The solver settles through the normal periodic layout trigger.
    pub fn requires_forced_update(&self) -> bool {
        false
    }

    /// Run one budgeted pass and return world positions for every
    /// participating host and device.
    pub fn execute_layout(&mut self, snapshot: &PhysicalSnapshot) -> Result<PositionMap> {
        let mut clock = self.config.budget.start();
        snapshot.validate()?;

        self.prepare(snapshot);
        while clock.next_iteration() {
            self.step(snapshot);
        }
        let positions = self.positions(snapshot);

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
            "physical_layout_pass"
        );
        Ok(positions)
    }

    /// Reconcile membership and refresh derived state from `snapshot`.
    pub fn prepare(&mut self, snapshot: &PhysicalSnapshot) {
        let host_speed = self.config.host_speed;
        let device_speed = self.config.device_speed;
        self.registry.reconcile(
            snapshot.hosts(),
            snapshot.ports(),
            snapshot.devices(),
            |role| match role {
                ElementRole::Host => host_speed,
                ElementRole::Device => device_speed,
                _ => SpeedRange::STILL,
            },
        );
        self.registry.refresh_derived_state(snapshot);
    }

    /// One solver iteration. `prepare` must have run for `snapshot`.
    pub fn step(&mut self, snapshot: &PhysicalSnapshot) {
        self.apply_host_forces(snapshot);
        self.apply_wire_forces(snapshot);
        self.integrate(snapshot);
    }

    fn apply_host_forces(&mut self, snapshot: &PhysicalSnapshot) {
        let multiplier = self.config.global_force_multiplier;
        let center_seeking = self.config.force_center_seeking;
        let repulsion = self.config.coefficient_repulsion;
        let min_distance_squared = self.config.min_effective_distance_squared;

        for host in snapshot.hosts() {
            let index = self.registry.index_of(*host);
            let (_, state) = self.registry.at(index);
            if !state.participates_this_frame || state.role != ElementRole::Host {
                continue;
            }
            let here = state.location;

            let mut impulse = Vector2::ZERO;
            for other in 0..self.registry.len() {
                if other == index {
                    let magnitude = here.magnitude();
                    // No pull on a host sitting at the origin.
                    if magnitude != 0.0 {
                        impulse.add_xy(
                            multiplier * here.x / magnitude * -center_seeking,
                            multiplier * here.y / magnitude * -center_seeking,
                        );
                    }
                    continue;
                }

                let (_, source) = self.registry.at(other);
                if !source.location.is_finite() {
                    continue;
                }
                let offset = here.minus(source.location);
                let distance = offset.magnitude();
                if distance == 0.0 {
                    continue;
                }
                let strength = multiplier * source.weight * repulsion
                    / (distance * distance).max(min_distance_squared);
                impulse.add_xy(
                    strength * offset.x / distance,
                    strength * offset.y / distance,
                );
            }
            self.registry.at_mut(index).velocity.add(impulse);
        }
    }

    fn apply_wire_forces(&mut self, snapshot: &PhysicalSnapshot) {
        let multiplier = self.config.global_force_multiplier;
        let control = self.config.coefficient_control_force;
        let rigidity = self.config.coefficient_rigidity;
        let ideal_distance = self.config.default_equilibrium_distance;
        let attraction = self.config.coefficient_attraction / (ideal_distance * ideal_distance);

        for wire in snapshot.wires() {
            let source_index = self.registry.index_of(wire.source);
            let destination_index = self.registry.index_of(wire.destination);
            let source = self.registry.at(source_index).1.clone();
            let destination = self.registry.at(destination_index).1.clone();

            if !source.participates_this_frame && !destination.participates_this_frame {
                continue;
            }

            let offset = source.location.minus(destination.location);
            if offset.is_zero() || !offset.is_finite() {
                continue;
            }

            let source_is_port = source.role == ElementRole::Port;
            let destination_is_port = destination.role == ElementRole::Port;
            if source_is_port && destination_is_port {
                // TODO: attract the owning devices to each other once devices
                // repel one another.
                continue;
            }

            let distance = offset.magnitude();
            // Unit vector from destination to source.
            let toward_source = Vector2::new(offset.x / distance, offset.y / distance);

            let source_control = control_of(snapshot, wire.source);
            let destination_control = control_of(snapshot, wire.destination);

            let start_end = Vector2::new(-toward_source.x, -toward_source.y);
            let control_span = destination_control.minus(source_control);
            let bend = if control_span.magnitude() == 0.0 {
                None
            } else {
                let mut direction = control_span;
                direction.normalize();
                Some(start_end.cross(direction))
            };

            if !source_is_port && source.participates_this_frame {
                let velocity = &mut self.registry.at_mut(source_index).velocity;
                let pull = multiplier * attraction * destination.weight;
                velocity.add_xy(pull * -toward_source.x, pull * -toward_source.y);
                velocity.add_xy(
                    multiplier * control * -source_control.x,
                    multiplier * control * -source_control.y,
                );
                velocity.add_xy(
                    multiplier * control * destination_control.x,
                    multiplier * control * destination_control.y,
                );
                if let Some(bend) = bend {
                    let strength = multiplier * rigidity * bend;
                    velocity.add_xy(strength * -start_end.y, strength * start_end.x);
                }
            }

            if !destination_is_port && destination.participates_this_frame {
                let velocity = &mut self.registry.at_mut(destination_index).velocity;
                let pull = multiplier * attraction * source.weight;
                velocity.add_xy(pull * toward_source.x, pull * toward_source.y);
                velocity.add_xy(
                    multiplier * control * -destination_control.x,
                    multiplier * control * -destination_control.y,
                );
                velocity.add_xy(
                    multiplier * control * source_control.x,
                    multiplier * control * source_control.y,
                );
                if let Some(bend) = bend {
                    let strength = multiplier * rigidity * bend;
                    velocity.add_xy(strength * start_end.y, strength * -start_end.x);
                }
            }
        }
    }

    fn integrate(&mut self, snapshot: &PhysicalSnapshot) {
        let decay = self.config.velocity_decay;
        for index in 0..self.registry.len() {
            let (id, state) = self.registry.at(index);
            if !state.participates_this_frame {
                continue;
            }
            let velocity = state.velocity;

            // Ports ride on their device's displacement before the device moves.
            if state.role == ElementRole::Device {
                for port in snapshot.ports_of(id) {
                    let port_index = self.registry.index_of(*port);
                    self.registry.at_mut(port_index).location.add(velocity);
                }
            }

            let state = self.registry.at_mut(index);
            state.location.add(velocity);
            state.velocity.multiply(decay);
        }
    }

    fn positions(&self, snapshot: &PhysicalSnapshot) -> PositionMap {
        let mut positions = PositionMap::new();
        for id in snapshot.hosts().iter().chain(snapshot.devices().iter()) {
            let state = self.registry.state(*id);
            if state.participates_this_frame && state.role.is_placed() {
                positions.insert(*id, self.registry.sim_to_world(state.location));
            }
        }
        positions
    }
}

fn control_of(snapshot: &PhysicalSnapshot, id: ElementId) -> Vector2 {
    snapshot
        .view(id)
        .map(|view| view.control)
        .unwrap_or_default()
}
