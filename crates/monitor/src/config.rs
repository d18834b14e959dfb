use std::time::Duration;
use vision_core::interfaces::DECISION_THRESHOLD;

use crate::debounce::DebounceRule;
use crate::MonitorError;

/// What the loop does when a frame cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// End the session at the first failed read.
    Abort,
    /// Sleep `backoff` and try again; end after `max_consecutive` failures in a row.
    Retry {
        backoff: Duration,
        max_consecutive: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Minimum time between classifications.
    pub sample_interval: Duration,
    /// Camera poll / quit-check cadence.
    pub poll_interval: Duration,
    pub alert_threshold: u32,
    pub decision_threshold: f32,
    pub rule: DebounceRule,
    pub read_failure: ReadFailurePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            poll_interval: Duration::from_millis(30),
            alert_threshold: 2,
            decision_threshold: DECISION_THRESHOLD,
            rule: DebounceRule::default(),
            read_failure: ReadFailurePolicy::Abort,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.sample_interval.is_zero() {
            return Err(MonitorError::Config("sample_interval must be > 0".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(MonitorError::Config("poll_interval must be > 0".into()));
        }
        if self.alert_threshold == 0 {
            return Err(MonitorError::Config("alert_threshold must be >= 1".into()));
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(MonitorError::Config(format!(
                "decision_threshold {} must be in (0, 1)",
                self.decision_threshold
            )));
        }
        if let ReadFailurePolicy::Retry {
            max_consecutive: 0, ..
        } = self.read_failure
        {
            return Err(MonitorError::Config(
                "retry policy needs max_consecutive >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MonitorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.alert_threshold, 2);
        assert_eq!(cfg.sample_interval, Duration::from_secs(5));
    }

    #[test]
    fn rejects_degenerate_values() {
        let bad = [
            MonitorConfig {
                alert_threshold: 0,
                ..Default::default()
            },
            MonitorConfig {
                sample_interval: Duration::ZERO,
                ..Default::default()
            },
            MonitorConfig {
                decision_threshold: 1.0,
                ..Default::default()
            },
            MonitorConfig {
                read_failure: ReadFailurePolicy::Retry {
                    backoff: Duration::from_millis(10),
                    max_consecutive: 0,
                },
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(MonitorError::Config(_))));
        }
    }
}
