// Agent records and the per-agent decision state machine

mod lifecycle;
mod store;

pub use lifecycle::Step;
pub use store::{AdmitError, AgentStore};

use crate::clock::{ClockSource, Timestamp};
use crate::metrics::{AgentMetrics, MetricsReport, MotionFilter};
use crate::registry::ObjectRegistry;
use crate::world::{AgentId, AvailableObject, ObjectId, Position};
use serde::Serialize;


/// Where an agent is in its acquire → transport → deposit cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// No target, no cube
    Exploring,
    /// Moving toward a claimed cube
    AcquiringTarget,
    /// Carrying a cube toward the delivery zone
    Transporting,
    /// At the delivery zone, releasing the cube
    Depositing,
}

/// In-progress action that is repeated until its completion condition holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    AcquireTarget(ObjectId),
    Deliver,
}

/// Instruction returned to the client for one agent
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum Decision {
    GoToObject { target: AvailableObject },
    GoToDeliveryZone { target: Position },
    DepositCube,
    Explore,
    Error { message: String },
}

/// A decision paired with the agent it belongs to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentDecision {
    #[serde(rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(flatten)]
    pub decision: Decision,
}

impl AgentDecision {
    pub fn new(agent_id: AgentId, decision: Decision) -> Self {
        Self {
            agent_id: Some(agent_id),
            decision,
        }
    }

    pub fn error(agent_id: Option<AgentId>, message: impl Into<String>) -> Self {
        Self {
            agent_id,
            decision: Decision::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.decision, Decision::Error { .. })
    }
}

/// Canonical record for one agent, kept across requests
#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    position: Position,
    holding: bool,
    state: LifecycleState,
    target: Option<ObjectId>,
    action: Option<Action>,

    /// Set once the agent is sent toward (or is at) the zone with a cube;
    /// the next drop counts as a delivery
    delivering: bool,

    /// Consecutive decision batches this agent was absent from
    missed_snapshots: u32,

    clock: ClockSource,
    last_seen_at: Timestamp,
    metrics: AgentMetrics,
}

impl Agent {
    pub fn new(id: AgentId, position: Position, clock: ClockSource, now: Timestamp) -> Self {
        Self {
            id,
            position,
            holding: false,
            state: LifecycleState::Exploring,
            target: None,
            action: None,
            delivering: false,
            missed_snapshots: 0,
            clock,
            last_seen_at: now,
            metrics: AgentMetrics::new(position, now),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn holding(&self) -> bool {
        self.holding
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn clock(&self) -> ClockSource {
        self.clock
    }

    pub fn metrics(&self) -> &AgentMetrics {
        &self.metrics
    }

    pub fn missed_snapshots(&self) -> u32 {
        self.missed_snapshots
    }

    /// Normalize an observation's time onto this agent's clock.
    ///
    /// A reported-clock agent that sends no time keeps its last time; a
    /// wall-clock agent ignores reported times. Time never moves backwards.
    pub fn resolve_time(&mut self, reported: Option<f64>, wall: Timestamp) -> Timestamp {
        let candidate = match self.clock {
            ClockSource::Reported => reported
                .map(Timestamp::from_secs)
                .unwrap_or(self.last_seen_at),
            ClockSource::Wall => wall,
        };
        if candidate > self.last_seen_at {
            self.last_seen_at = candidate;
        }
        self.last_seen_at
    }

    /// Record a reported position. Returns the distance counted toward metrics.
    pub fn observe(&mut self, position: Position, now: Timestamp, filter: &MotionFilter) -> f64 {
        self.position = position;
        self.metrics.record_position(position, now, filter)
    }

    pub fn mark_seen(&mut self) {
        self.missed_snapshots = 0;
    }

    /// Count one missed decision batch, returning the new streak length
    pub fn mark_missed(&mut self) -> u32 {
        self.missed_snapshots = self.missed_snapshots.saturating_add(1);
        self.missed_snapshots
    }

    /// Give up every claim this agent owns after it stopped reporting in
    pub fn expire_claims(&mut self, registry: &mut ObjectRegistry) -> Vec<ObjectId> {
        let released = registry.release_owned_by(self.id);
        self.target = None;
        self.action = None;
        if !self.holding {
            self.state = LifecycleState::Exploring;
        }
        released
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics.report(self.id, self.last_seen_at)
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            agent_id: self.id,
            state: self.state,
            holding: self.holding,
            target_object_id: self.target,
            position: self.position,
            clock: self.clock,
            missed_snapshots: self.missed_snapshots,
            metrics: self.report(),
        }
    }
}

/// Read-only view of an agent published after each batch
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub agent_id: AgentId,
    pub state: LifecycleState,
    pub holding: bool,
    pub target_object_id: Option<ObjectId>,
    pub position: Position,
    pub clock: ClockSource,
    pub missed_snapshots: u32,
    pub metrics: MetricsReport,
}
