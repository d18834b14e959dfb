//! Consecutive-positive debouncing of per-frame labels.

use serde::Deserialize;

/// How a new label extends the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebounceRule {
    /// Every abnormal sample extends the streak; a normal one resets it.
    #[default]
    ConsecutivePositive,
    /// The streak grows only when this sample and the previous one are both
    /// abnormal; the first abnormal sample of a run leaves it at 0.
    PairedPositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceUpdate {
    pub streak: u32,
    pub alert: bool,
}

#[derive(Debug, Clone)]
pub struct DebounceState {
    rule: DebounceRule,
    alert_threshold: u32,
    counter: u32,
    last_label: Option<bool>,
}

impl DebounceState {
    pub fn new(rule: DebounceRule, alert_threshold: u32) -> Self {
        Self {
            rule,
            alert_threshold,
            counter: 0,
            last_label: None,
        }
    }

    pub fn observe(&mut self, abnormal: bool) -> DebounceUpdate {
        let extends = match self.rule {
            DebounceRule::ConsecutivePositive => abnormal,
            DebounceRule::PairedPositive => abnormal && self.last_label == Some(true),
        };
        self.counter = if extends {
            self.counter.saturating_add(1)
        } else {
            0
        };
        self.last_label = Some(abnormal);
        DebounceUpdate {
            streak: self.counter,
            alert: self.is_alert(),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn last_label(&self) -> Option<bool> {
        self.last_label
    }

    pub fn is_alert(&self) -> bool {
        self.counter >= self.alert_threshold
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.last_label = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alerts(rule: DebounceRule, labels: &[bool]) -> Vec<bool> {
        let mut state = DebounceState::new(rule, 2);
        labels.iter().map(|&l| state.observe(l).alert).collect()
    }

    #[test]
    fn first_positive_is_not_an_alert() {
        let mut state = DebounceState::new(DebounceRule::ConsecutivePositive, 2);
        assert_eq!(
            state.observe(true),
            DebounceUpdate {
                streak: 1,
                alert: false
            }
        );
    }

    #[test]
    fn neg_pos_pos_alerts_on_third() {
        assert_eq!(
            alerts(DebounceRule::ConsecutivePositive, &[false, true, true]),
            vec![false, false, true]
        );
    }

    #[test]
    fn interrupted_streak_never_alerts() {
        assert_eq!(
            alerts(DebounceRule::ConsecutivePositive, &[true, false, true]),
            vec![false, false, false]
        );
    }

    #[test]
    fn paired_rule_needs_three_in_a_row() {
        assert_eq!(
            alerts(DebounceRule::PairedPositive, &[true, true, true, false, true, true]),
            vec![false, false, true, false, false, false]
        );
    }
}
