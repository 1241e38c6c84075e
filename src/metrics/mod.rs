// Per-agent performance metrics and service-level counters

mod service;

pub use service::{ServiceMetrics, ServiceMetricsSnapshot};

use crate::clock::Timestamp;
use crate::world::{AgentId, Position};
use serde::Serialize;

/// Floor for elapsed minutes in the delivery rate
const MIN_ELAPSED_MINUTES: f64 = 1.0;

/// Floor for distance in the efficiency ratio
const MIN_DISTANCE: f64 = 1.0;

/// Scale applied to deliveries-per-unit-distance
const EFFICIENCY_SCALE: f64 = 10_000.0;

/// Which position reports count toward distance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionFilter {
    /// Deltas below this are jitter
    pub movement_threshold: f64,

    /// Samples closer than this to the last counted one are not counted
    pub min_sample_interval_secs: f64,
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self {
            movement_threshold: 1.0,
            min_sample_interval_secs: 0.1,
        }
    }
}

/// Motion and delivery history for one agent.
///
/// Fed from the same noisy position stream as the decision logic. Every
/// report replaces the last position; only the delta from the previous
/// report can count, and only when it clears the jitter threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentMetrics {
    cumulative_distance: f64,
    deliveries: u64,
    created_at: Timestamp,
    last_movement_at: Timestamp,
    last_position: Position,
}

impl AgentMetrics {
    pub fn new(position: Position, now: Timestamp) -> Self {
        Self {
            cumulative_distance: 0.0,
            deliveries: 0,
            created_at: now,
            last_movement_at: now,
            last_position: position,
        }
    }

    /// Account for a reported position. Returns the distance counted.
    ///
    /// A report within `min_sample_interval_secs` of the last counted
    /// movement counts nothing but still replaces the position.
    pub fn record_position(
        &mut self,
        position: Position,
        now: Timestamp,
        filter: &MotionFilter,
    ) -> f64 {
        let previous = std::mem::replace(&mut self.last_position, position);

        if now.secs_since(self.last_movement_at) < filter.min_sample_interval_secs {
            return 0.0;
        }

        let distance = previous.distance_to(&position);
        if distance < filter.movement_threshold {
            return 0.0;
        }

        self.cumulative_distance += distance;
        self.last_movement_at = now;
        distance
    }

    /// Count one completed delivery, returning the new total
    pub fn record_delivery(&mut self) -> u64 {
        self.deliveries += 1;
        self.deliveries
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }

    pub fn cumulative_distance(&self) -> f64 {
        self.cumulative_distance
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_movement_at(&self) -> Timestamp {
        self.last_movement_at
    }

    pub fn elapsed_minutes(&self, now: Timestamp) -> f64 {
        now.secs_since(self.created_at) / 60.0
    }

    /// Derived metrics as of `now`
    pub fn report(&self, agent_id: AgentId, now: Timestamp) -> MetricsReport {
        let elapsed_minutes = self.elapsed_minutes(now);
        MetricsReport {
            agent_id,
            cubes_delivered: self.deliveries,
            total_distance: round2(self.cumulative_distance),
            efficiency_ratio: round2(efficiency_ratio(self.deliveries, self.cumulative_distance)),
            delivery_rate: round2(delivery_rate(self.deliveries, elapsed_minutes)),
            elapsed_minutes: round2(elapsed_minutes),
        }
    }
}

/// Per-agent metrics response entry
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub agent_id: AgentId,
    pub cubes_delivered: u64,
    pub total_distance: f64,
    pub efficiency_ratio: f64,
    pub delivery_rate: f64,
    pub elapsed_minutes: f64,
}

/// Deliveries per minute, with a one-minute floor on the denominator
pub fn delivery_rate(deliveries: u64, elapsed_minutes: f64) -> f64 {
    deliveries as f64 / elapsed_minutes.max(MIN_ELAPSED_MINUTES)
}

/// Deliveries per unit distance, scaled by 10 000, with a one-unit floor
pub fn efficiency_ratio(deliveries: u64, distance: f64) -> f64 {
    deliveries as f64 / distance.max(MIN_DISTANCE) * EFFICIENCY_SCALE
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
