//! Labeled schedule storage.
//!
//! A solve returns trajectories without touching shared state; callers that
//! want to keep a result persist it here under a run label (for example
//! `"central"` or `"exchange-admm"`) so several algorithm runs over the same
//! district can be compared afterwards. Labels are only written through
//! [`ScheduleSet::copy_schedule`], never mid-iteration.

use crate::Trajectory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labeled power schedules for one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSet {
    schedules: BTreeMap<String, Trajectory>,
}

impl ScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalizes a solve result under the given label, replacing any
    /// previously stored schedule with the same label.
    pub fn copy_schedule(&mut self, label: &str, trajectory: Trajectory) {
        self.schedules.insert(label.to_string(), trajectory);
    }

    pub fn get(&self, label: &str) -> Option<&Trajectory> {
        self.schedules.get(label)
    }

    /// Stored labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.schedules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_schedule_replaces_label() {
        let mut set = ScheduleSet::new();
        set.copy_schedule("central", Trajectory::from_values(vec![1.0, 2.0]));
        set.copy_schedule("central", Trajectory::from_values(vec![3.0, 4.0]));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("central").unwrap().values(), &[3.0, 4.0]);
        assert!(set.get("exchange-admm").is_none());
    }

    #[test]
    fn test_labels_sorted() {
        let mut set = ScheduleSet::new();
        set.copy_schedule("exchange-admm", Trajectory::zeros(2));
        set.copy_schedule("central", Trajectory::zeros(2));

        let labels: Vec<&str> = set.labels().collect();
        assert_eq!(labels, vec!["central", "exchange-admm"]);
    }
}
