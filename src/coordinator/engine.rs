use super::EntryError;
use crate::agent::{AgentDecision, AgentStore};
use crate::clock::Timestamp;
use crate::config::CoordinatorConfig;
use crate::metrics::{MetricsReport, MotionFilter};
use crate::registry::ObjectRegistry;
use crate::world::{AgentId, DeliveryZone, WorldSnapshot};
use std::collections::HashSet;
use tracing::warn;

/// Engine parameters derived from configuration
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub zone: DeliveryZone,
    pub motion: MotionFilter,
    pub claim_expiry_snapshots: u32,
}

impl From<&CoordinatorConfig> for EngineSettings {
    fn from(config: &CoordinatorConfig) -> Self {
        Self {
            zone: config.delivery_zone.zone(),
            motion: MotionFilter {
                movement_threshold: config.agents.movement_threshold,
                min_sample_interval_secs: config.agents.min_sample_interval_secs,
            },
            claim_expiry_snapshots: config.agents.claim_expiry_snapshots,
        }
    }
}

/// Result of one decision pass
#[derive(Clone, Debug, Default)]
pub struct DecisionOutcome {
    pub decisions: Vec<AgentDecision>,
    pub rejected: usize,
    pub deliveries: u64,
    pub expired_claims: usize,
}

/// Result of one metrics pass
#[derive(Clone, Debug, Default)]
pub struct MetricsOutcome {
    pub reports: Vec<MetricsReport>,
    pub errors: Vec<EntryError>,
}

/// Agent records and claim table. Every pass takes `&mut self`, so a pass
/// is one serialized transaction over both.
#[derive(Debug)]
pub struct Engine {
    agents: AgentStore,
    registry: ObjectRegistry,
}

impl Engine {
    pub fn new(max_agents: usize) -> Self {
        Self {
            agents: AgentStore::new(max_agents),
            registry: ObjectRegistry::new(),
        }
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn clear(&mut self) {
        self.agents.clear();
        self.registry.clear();
    }

    /// Run every entry through its agent's state machine in request order.
    ///
    /// Afterwards, agents missing from the snapshot age toward claim expiry
    /// and unheld claims on cubes nobody reports any more are dropped.
    pub fn run_decisions(
        &mut self,
        snapshot: &WorldSnapshot,
        settings: &EngineSettings,
        wall_now: Timestamp,
    ) -> DecisionOutcome {
        let mut outcome = DecisionOutcome {
            decisions: Vec::with_capacity(snapshot.entries.len()),
            ..Default::default()
        };

        for entry in &snapshot.entries {
            let observation = match entry {
                Ok(observation) => observation,
                Err(rejected) => {
                    warn!(agent_id = ?rejected.agent_id, error = %rejected.error, "Rejected agent entry");
                    outcome
                        .decisions
                        .push(AgentDecision::error(rejected.agent_id, rejected.error.to_string()));
                    outcome.rejected += 1;
                    continue;
                }
            };

            let agent = match self.agents.admit(
                observation.agent_id,
                observation.position,
                observation.time,
                wall_now,
            ) {
                Ok(agent) => agent,
                Err(e) => {
                    outcome
                        .decisions
                        .push(AgentDecision::error(Some(observation.agent_id), e.to_string()));
                    outcome.rejected += 1;
                    continue;
                }
            };

            agent.mark_seen();
            let now = agent.resolve_time(observation.time, wall_now);
            agent.observe(observation.position, now, &settings.motion);

            let step = agent.step(
                observation.holding,
                snapshot.available_for(observation),
                &settings.zone,
                &mut self.registry,
            );
            if step.delivered {
                outcome.deliveries += 1;
            }
            outcome
                .decisions
                .push(AgentDecision::new(observation.agent_id, step.decision));
        }

        outcome.expired_claims = self.expire_silent_agents(snapshot, settings);

        // A batch with no usable entry says nothing about which cubes exist
        if snapshot.entries.iter().any(|e| e.is_ok()) {
            self.registry.retain_present(&snapshot.present_object_ids());
        }

        outcome
    }

    /// Update motion metrics and report each agent in the snapshot
    pub fn run_metrics(
        &mut self,
        snapshot: &WorldSnapshot,
        settings: &EngineSettings,
        wall_now: Timestamp,
    ) -> MetricsOutcome {
        let mut outcome = MetricsOutcome::default();

        for entry in &snapshot.entries {
            let observation = match entry {
                Ok(observation) => observation,
                Err(rejected) => {
                    outcome.errors.push(EntryError {
                        agent_id: rejected.agent_id,
                        message: rejected.error.to_string(),
                    });
                    continue;
                }
            };

            match self.agents.admit(
                observation.agent_id,
                observation.position,
                observation.time,
                wall_now,
            ) {
                Ok(agent) => {
                    let now = agent.resolve_time(observation.time, wall_now);
                    agent.observe(observation.position, now, &settings.motion);
                    outcome.reports.push(agent.report());
                }
                Err(e) => outcome.errors.push(EntryError {
                    agent_id: Some(observation.agent_id),
                    message: e.to_string(),
                }),
            }
        }

        outcome
    }

    /// Age agents absent from this snapshot; release claims of those that
    /// just reached the expiry streak. Returns the number of claims released.
    fn expire_silent_agents(&mut self, snapshot: &WorldSnapshot, settings: &EngineSettings) -> usize {
        let present: HashSet<AgentId> = snapshot.agent_ids().into_iter().collect();
        let mut released_total = 0;

        for agent in self.agents.iter_mut() {
            if present.contains(&agent.id()) {
                continue;
            }
            if agent.mark_missed() != settings.claim_expiry_snapshots {
                continue;
            }

            let released = agent.expire_claims(&mut self.registry);
            if !released.is_empty() {
                warn!(
                    agent_id = %agent.id(),
                    missed = settings.claim_expiry_snapshots,
                    released = ?released,
                    "Releasing claims of silent agent"
                );
                released_total += released.len();
            }
        }

        released_total
    }
}
