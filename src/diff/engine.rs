//! Baseline owner for the publishing side

use super::Tracked;
use crate::model::{Group, StateSnapshot};
use crate::proto::GroupDelta;

/// Retains the last-published state and produces per-group deltas
///
/// The baseline starts at the neutral seeds, so the first diff of a group is
/// effectively a full dump. It is only ever modified by [`diff`](Self::diff)
/// and [`diff_group`](Self::diff_group), and only for values actually emitted.
#[derive(Debug, Default)]
pub struct DiffEngine {
    baseline: StateSnapshot,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> &StateSnapshot {
        &self.baseline
    }

    /// Diff a single group; `None` when nothing changed
    pub fn diff_group(&mut self, group: Group, new: &StateSnapshot) -> Option<GroupDelta> {
        let base = &mut self.baseline;
        match group {
            Group::Config => base.config.track(&new.config).map(GroupDelta::Config),
            Group::Io => base.io.track(&new.io).map(GroupDelta::Io),
            Group::Task => base.task.track(&new.task).map(GroupDelta::Task),
            Group::Interp => base.interp.track(&new.interp).map(GroupDelta::Interp),
            Group::Motion => base.motion.track(&new.motion).map(GroupDelta::Motion),
        }
    }

    /// Diff every group in publish order, skipping unchanged groups
    pub fn diff(&mut self, new: &StateSnapshot) -> Vec<GroupDelta> {
        Group::ALL
            .into_iter()
            .filter_map(|group| self.diff_group(group, new))
            .collect()
    }

    /// Complete dump of one group's baseline
    pub fn full_update(&self, group: Group) -> GroupDelta {
        let base = &self.baseline;
        match group {
            Group::Config => GroupDelta::Config(base.config.dump()),
            Group::Io => GroupDelta::Io(base.io.dump()),
            Group::Task => GroupDelta::Task(base.task.dump()),
            Group::Interp => GroupDelta::Interp(base.interp.dump()),
            Group::Motion => GroupDelta::Motion(base.motion.dump()),
        }
    }
}

/// Apply a received delta to a mirrored snapshot
pub fn merge_group(snapshot: &mut StateSnapshot, delta: &GroupDelta) {
    match delta {
        GroupDelta::Config(d) => snapshot.config.merge(d),
        GroupDelta::Io(d) => snapshot.io.merge(d),
        GroupDelta::Task(d) => snapshot.task.merge(d),
        GroupDelta::Interp(d) => snapshot.interp.merge(d),
        GroupDelta::Motion(d) => snapshot.motion.merge(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MotionAxis, Position};
    use crate::proto::TaskState;

    fn sample() -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        snapshot.config.axes = 3;
        snapshot.motion.axis = vec![MotionAxis {
            enabled: true,
            ..Default::default()
        }];
        snapshot
    }

    #[test]
    fn test_first_diff_then_quiet() {
        let mut engine = DiffEngine::new();
        let new = sample();

        let deltas = engine.diff(&new);
        assert_eq!(deltas.len(), 2);

        let motion = deltas.iter().find_map(|d| match d {
            GroupDelta::Motion(m) => Some(m),
            _ => None,
        });
        let motion = motion.unwrap();
        assert_eq!(motion.axis.len(), 1);
        assert_eq!(motion.axis[0].index, 0);
        assert_eq!(motion.axis[0].enabled, Some(true));

        let config = deltas.iter().find_map(|d| match d {
            GroupDelta::Config(c) => Some(c),
            _ => None,
        });
        assert_eq!(config.unwrap().axes, Some(3));

        assert!(engine.diff(&new).is_empty());
    }

    #[test]
    fn test_identical_within_epsilon_emits_nothing() {
        let mut engine = DiffEngine::new();
        let mut snapshot = sample();
        snapshot.motion.position = Position::new(10.0, 20.0, 30.0);
        engine.diff(&snapshot);

        snapshot.motion.position.x += 0.00004;
        snapshot.motion.current_vel += 0.00002;
        assert!(engine.diff(&snapshot).is_empty());
    }

    #[test]
    fn test_publish_order() {
        let mut engine = DiffEngine::new();
        let mut snapshot = sample();
        snapshot.task.task_state = TaskState::On;
        snapshot.io.estop = true;
        snapshot.interp.command = "G0 X1".to_string();

        let groups: Vec<Group> = engine.diff(&snapshot).iter().map(GroupDelta::group).collect();
        assert_eq!(
            groups,
            vec![
                Group::Io,
                Group::Task,
                Group::Interp,
                Group::Motion,
                Group::Config
            ]
        );
    }

    #[test]
    fn test_full_update_reflects_baseline() {
        let mut engine = DiffEngine::new();
        engine.diff(&sample());

        let GroupDelta::Config(config) = engine.full_update(Group::Config) else {
            panic!("expected config dump");
        };
        assert_eq!(config.axes, Some(3));
        // Fields never emitted are still present in a dump
        assert_eq!(config.max_velocity, Some(0.0));
    }

    #[test]
    fn test_diff_group_leaves_other_groups() {
        let mut engine = DiffEngine::new();
        let new = sample();
        assert!(engine.diff_group(Group::Config, &new).is_some());
        assert!(engine.baseline().motion.axis.is_empty());
        assert!(engine.diff_group(Group::Motion, &new).is_some());
        assert_eq!(engine.baseline().motion.axis.len(), 1);
    }

    #[test]
    fn test_merge_group_mirrors_baseline() {
        let mut engine = DiffEngine::new();
        let mut mirror = StateSnapshot::default();
        for delta in engine.diff(&sample()) {
            merge_group(&mut mirror, &delta);
        }
        assert_eq!(&mirror, engine.baseline());
    }
}
