use super::{Action, Agent, Decision, LifecycleState};
use crate::allocator;
use crate::registry::ObjectRegistry;
use crate::world::{AvailableObject, DeliveryZone};
use tracing::{debug, info};

/// Result of running one snapshot through an agent
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub decision: Decision,

    /// This snapshot completed a delivery
    pub delivered: bool,
}

impl Agent {
    /// Advance the state machine with this snapshot's holding flag and the
    /// cubes visible to the agent. Call `observe` first so the decision
    /// uses the current position.
    pub fn step(
        &mut self,
        holding: bool,
        available: &[AvailableObject],
        zone: &DeliveryZone,
        registry: &mut ObjectRegistry,
    ) -> Step {
        let delivered = self.apply_holding(holding, registry);

        if let Some(decision) = self.sticky_decision(available, zone, registry) {
            return Step {
                decision,
                delivered,
            };
        }

        self.action = None;
        let decision = self.decide_fresh(available, zone, registry);
        Step {
            decision,
            delivered,
        }
    }

    /// Track pick-ups and drops. Returns true when a drop completed a delivery.
    pub(super) fn apply_holding(&mut self, holding: bool, registry: &mut ObjectRegistry) -> bool {
        if holding == self.holding {
            return false;
        }
        self.holding = holding;

        if holding {
            if let Some(target) = self.target {
                registry.set_held(self.id, target, true);
            }
            return false;
        }

        if !self.delivering {
            // Dropped outside a delivery: the cube is an ordinary target again
            if let Some(target) = self.target {
                registry.set_held(self.id, target, false);
            }
            return false;
        }

        let total = self.metrics.record_delivery();
        if let Some(target) = self.target.take() {
            registry.release_if_owner(self.id, target);
        }
        self.delivering = false;
        self.action = None;
        self.state = LifecycleState::Exploring;

        info!(agent_id = %self.id, deliveries = total, "Delivery completed");
        true
    }

    /// Repeat the in-progress action while it is still valid and unfinished
    fn sticky_decision(
        &self,
        available: &[AvailableObject],
        zone: &DeliveryZone,
        registry: &ObjectRegistry,
    ) -> Option<Decision> {
        match self.action? {
            Action::AcquireTarget(object_id) => {
                if self.holding || registry.owner_of(object_id) != Some(self.id) {
                    return None;
                }
                available
                    .iter()
                    .find(|o| o.id == object_id)
                    .map(|o| Decision::GoToObject { target: o.clone() })
            }
            Action::Deliver => {
                if !self.holding || zone.within_reach(&self.position) {
                    return None;
                }
                Some(Decision::GoToDeliveryZone {
                    target: zone.position,
                })
            }
        }
    }

    fn decide_fresh(
        &mut self,
        available: &[AvailableObject],
        zone: &DeliveryZone,
        registry: &mut ObjectRegistry,
    ) -> Decision {
        if !self.holding {
            if let Some(target) = self.target {
                if !available.iter().any(|o| o.id == target) {
                    debug!(agent_id = %self.id, object_id = %target, "Target no longer available");
                    self.drop_target(registry);
                }
            }
        }

        if self.holding {
            self.delivering = true;
            if zone.within_reach(&self.position) {
                self.state = LifecycleState::Depositing;
                return Decision::DepositCube;
            }
            self.state = LifecycleState::Transporting;
            self.action = Some(Action::Deliver);
            return Decision::GoToDeliveryZone {
                target: zone.position,
            };
        }

        if let Some(object) = allocator::find_target(&self.position, available, self.id, registry) {
            if let Some(previous) = self.target.replace(object.id) {
                if previous != object.id {
                    registry.release_if_owner(self.id, previous);
                }
            }
            self.state = LifecycleState::AcquiringTarget;
            self.action = Some(Action::AcquireTarget(object.id));
            return Decision::GoToObject { target: object };
        }

        self.drop_target(registry);
        self.state = LifecycleState::Exploring;
        Decision::Explore
    }

    fn drop_target(&mut self, registry: &mut ObjectRegistry) {
        if let Some(target) = self.target.take() {
            registry.release_if_owner(self.id, target);
        }
    }
}
