use chrono::{DateTime, Utc};
use serde::Serialize;

/// Seconds on an agent's clock.
///
/// Every agent runs on exactly one clock, picked the first time it is seen:
/// the client's `time` field when the client sends one, otherwise the
/// service's wall clock. Timestamps from the two sources are never compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize)]
pub struct Timestamp(f64);

impl Timestamp {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, never negative
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

/// Which clock an agent's timestamps come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    Reported,
    Wall,
}

/// Service wall clock, measured in seconds from service start
#[derive(Clone, Debug)]
pub struct WallClock {
    started_at: DateTime<Utc>,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn now(&self) -> Timestamp {
        let elapsed = Utc::now() - self.started_at;
        Timestamp::from_secs(elapsed.num_milliseconds() as f64 / 1000.0)
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_since_clamps_backwards_time() {
        let later = Timestamp::from_secs(10.0);
        let earlier = Timestamp::from_secs(4.0);
        assert_eq!(later.secs_since(earlier), 6.0);
        assert_eq!(earlier.secs_since(later), 0.0);
    }

    #[test]
    fn test_wall_clock_starts_near_zero() {
        let clock = WallClock::new();
        let now = clock.now().as_secs();
        assert!((0.0..5.0).contains(&now));
    }
}
