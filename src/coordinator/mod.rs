// Coordination service: runs whole snapshots through the engine as one batch

mod engine;

pub use engine::{DecisionOutcome, Engine, EngineSettings, MetricsOutcome};

use crate::agent::{AgentDecision, AgentStatus};
use crate::clock::WallClock;
use crate::config::CoordinatorConfig;
use crate::metrics::{MetricsReport, ServiceMetrics, ServiceMetricsSnapshot};
use crate::world::{AgentId, ObjectId, WorldSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;


/// Overall outcome of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every entry was processed
    Ok,
    /// At least one entry was answered with an error
    Partial,
}

impl BatchStatus {
    fn from_rejected(rejected: usize) -> Self {
        if rejected == 0 {
            BatchStatus::Ok
        } else {
            BatchStatus::Partial
        }
    }
}

/// Response to a decision request, one decision per request entry
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBatch {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub decisions: Vec<AgentDecision>,
}

/// An entry a metrics request could not account for
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub message: String,
}

/// Response to a metrics request
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBatch {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub metrics: Vec<MetricsReport>,
    pub errors: Vec<EntryError>,
}

/// Status board entry: agent view plus publication time
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntry {
    #[serde(flatten)]
    pub status: AgentStatus,
    pub last_updated: DateTime<Utc>,
}

/// One row of the claim table
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub object_id: ObjectId,
    pub owner_agent_id: AgentId,
    pub held: bool,
}

/// Service-wide counters plus board size
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub started_at: DateTime<Utc>,
    pub tracked_agents: usize,
    #[serde(flatten)]
    pub counters: ServiceMetricsSnapshot,
}

/// Decision-and-coordination engine behind the transport boundary.
///
/// All mutable engine state sits behind one async mutex. Batches hold it for
/// their whole pass, and tokio's mutex hands it out in request order, so
/// overlapping requests are applied first-in-first-applied. After each pass
/// the agent views are copied to a lock-free board for read-only queries.
pub struct CoordinationService {
    config: CoordinatorConfig,
    settings: EngineSettings,
    engine: Mutex<Engine>,
    board: DashMap<AgentId, BoardEntry>,
    clock: WallClock,

    /// Service counters
    pub metrics: ServiceMetrics,
}

impl CoordinationService {
    pub fn new(config: CoordinatorConfig) -> Self {
        let settings = EngineSettings::from(&config);
        info!(
            max_agents = config.agents.max_agents,
            zone = ?settings.zone,
            claim_expiry_snapshots = settings.claim_expiry_snapshots,
            "Coordination service created"
        );

        Self {
            engine: Mutex::new(Engine::new(config.agents.max_agents)),
            settings,
            config,
            board: DashMap::new(),
            clock: WallClock::new(),
            metrics: ServiceMetrics::new(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Decide the next action for every agent in the snapshot
    pub async fn decide(&self, snapshot: &WorldSnapshot) -> DecisionBatch {
        let batch_id = Uuid::now_v7();

        let outcome = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.run_decisions(snapshot, &self.settings, self.clock.now());
            self.publish(&engine);
            outcome
        };

        self.metrics
            .record_decision_batch(outcome.decisions.len(), outcome.rejected);
        self.metrics.record_deliveries(outcome.deliveries);
        self.metrics.record_expired_claims(outcome.expired_claims);

        debug!(
            batch_id = %batch_id,
            entries = outcome.decisions.len(),
            rejected = outcome.rejected,
            deliveries = outcome.deliveries,
            "Decision batch processed"
        );

        DecisionBatch {
            batch_id,
            status: BatchStatus::from_rejected(outcome.rejected),
            decisions: outcome.decisions,
        }
    }

    /// Update motion metrics from the snapshot and report every agent in it
    pub async fn report_metrics(&self, snapshot: &WorldSnapshot) -> MetricsBatch {
        let batch_id = Uuid::now_v7();

        let outcome = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.run_metrics(snapshot, &self.settings, self.clock.now());
            self.publish(&engine);
            outcome
        };

        self.metrics.record_metrics_batch(outcome.errors.len());
        debug!(
            batch_id = %batch_id,
            reported = outcome.reports.len(),
            rejected = outcome.errors.len(),
            "Metrics batch processed"
        );

        MetricsBatch {
            batch_id,
            status: BatchStatus::from_rejected(outcome.errors.len()),
            metrics: outcome.reports,
            errors: outcome.errors,
        }
    }

    /// Forget every agent and claim. Service counters keep running.
    pub async fn reset(&self) {
        let mut engine = self.engine.lock().await;
        let agents = engine.agents().len();
        let claims = engine.registry().len();
        engine.clear();
        self.board.clear();
        info!(agents = agents, claims = claims, "Coordination state reset");
    }

    /// Release all claims and log final counters before the process exits
    pub async fn shutdown(&self) {
        let mut engine = self.engine.lock().await;
        let stats = self.metrics.get_snapshot();
        info!(
            agents = engine.agents().len(),
            claims = engine.registry().len(),
            decision_batches = stats.decision_batches,
            deliveries = stats.deliveries,
            "Coordination service shutting down"
        );
        engine.clear();
        self.board.clear();
    }

    /// Current claim table
    pub async fn claims(&self) -> Vec<ClaimView> {
        let engine = self.engine.lock().await;
        engine
            .registry()
            .claims()
            .into_iter()
            .map(|(object_id, claim)| ClaimView {
                object_id,
                owner_agent_id: claim.owner,
                held: claim.held,
            })
            .collect()
    }

    /// Last published view of one agent
    pub fn agent_status(&self, agent_id: AgentId) -> Option<BoardEntry> {
        self.board.get(&agent_id).map(|e| e.value().clone())
    }

    /// Last published view of every agent, ordered by id
    pub fn agent_statuses(&self) -> Vec<BoardEntry> {
        let mut entries: Vec<BoardEntry> = self.board.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.status.agent_id);
        entries
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            started_at: self.clock.started_at(),
            tracked_agents: self.board.len(),
            counters: self.metrics.get_snapshot(),
        }
    }

    /// Copy agent views to the board. Runs under the engine lock so the
    /// board never goes backwards relative to batch order.
    fn publish(&self, engine: &Engine) {
        let now = Utc::now();
        for agent in engine.agents().iter() {
            self.board.insert(
                agent.id(),
                BoardEntry {
                    status: agent.status(),
                    last_updated: now,
                },
            );
        }
    }
}
