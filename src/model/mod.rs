//! Machine status snapshot model
//!
//! A [`StateSnapshot`] is one consistent read of the machine, split into five
//! groups. Each group is published on its own topic.
//!
//! | Group | Topic | Sub-collections |
//! |-------|-------|-----------------|
//! | Config | `config` | `axis`, `program_extension` |
//! | IO | `io` | `tool_table` |
//! | Task | `task` | |
//! | Interp | `interp` | `gcodes`, `mcodes`, `settings` |
//! | Motion | `motion` | `axis`, `din`, `dout`, `ain`, `aout`, `limit` |
//!
//! `Default` for every type is the neutral seed the diff baseline starts
//! from, so the first comparison against a fresh baseline is a full dump.

mod position;

pub use position::{POSITION_EPSILON, Position, float_changed};

use crate::proto::{
    AxisType, CanonUnits, ExecState, InterpState, KinematicsType, MotionState, MotionType,
    OriginIndex, PositionFeedback, PositionOffset, TaskMode, TaskState, TimeUnits, TrajMode,
};
use std::fmt;

/// Status domain, one per topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Config,
    Io,
    Task,
    Interp,
    Motion,
}

impl Group {
    /// Publish order within a poll cycle
    pub const ALL: [Group; 5] = [
        Group::Io,
        Group::Task,
        Group::Interp,
        Group::Motion,
        Group::Config,
    ];

    pub fn topic(self) -> &'static str {
        match self {
            Group::Config => "config",
            Group::Io => "io",
            Group::Task => "task",
            Group::Interp => "interp",
            Group::Motion => "motion",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Group> {
        Group::ALL.into_iter().find(|g| g.topic() == topic)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// Complete machine status at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub config: ConfigStatus,
    pub io: IoStatus,
    pub task: TaskStatus,
    pub interp: InterpStatus,
    pub motion: MotionStatus,
}

/// Static machine configuration (limits, units, kinematics)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStatus {
    pub default_acceleration: f64,
    pub angular_units: f64,
    pub axes: i32,
    pub axis: Vec<ConfigAxis>,
    pub axis_mask: i32,
    pub cycle_time: f64,
    pub debug: i32,
    pub kinematics_type: KinematicsType,
    pub linear_units: f64,
    pub max_acceleration: f64,
    pub max_velocity: f64,
    pub program_units: CanonUnits,
    pub default_velocity: f64,
    pub program_extension: Vec<String>,
    pub position_offset: PositionOffset,
    pub position_feedback: PositionFeedback,
    pub max_feed_override: f64,
    pub min_feed_override: f64,
    pub max_spindle_override: f64,
    pub min_spindle_override: f64,
    pub default_spindle_speed: f64,
    pub default_linear_velocity: f64,
    pub min_velocity: f64,
    pub max_linear_velocity: f64,
    pub min_linear_velocity: f64,
    pub default_angular_velocity: f64,
    pub max_angular_velocity: f64,
    pub min_angular_velocity: f64,
    pub increments: String,
    pub grids: String,
    pub lathe: bool,
    pub geometry: String,
    pub arcdivision: i32,
    pub no_force_homing: bool,
    pub remote_path: String,
    pub time_units: TimeUnits,
    pub name: String,
}

/// Per-axis configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigAxis {
    pub axis_type: AxisType,
    pub backlash: f64,
    pub max_ferror: f64,
    pub max_position_limit: f64,
    pub min_ferror: f64,
    pub min_position_limit: f64,
    pub units: f64,
    /// -1 means the axis does not take part in homing
    pub home_sequence: i32,
}

impl Default for ConfigAxis {
    fn default() -> Self {
        Self {
            axis_type: AxisType::default(),
            backlash: 0.0,
            max_ferror: 0.0,
            max_position_limit: 0.0,
            min_ferror: 0.0,
            min_position_limit: 0.0,
            units: 0.0,
            home_sequence: -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoStatus {
    pub estop: bool,
    pub flood: bool,
    pub lube: bool,
    pub lube_level: i32,
    pub mist: bool,
    pub pocket_prepped: i32,
    pub tool_in_spindle: i32,
    pub tool_offset: Position,
    pub tool_table: Vec<ToolEntry>,
}

/// One row of the tool table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolEntry {
    pub id: i32,
    pub offset: Position,
    pub diameter: f64,
    pub frontangle: f64,
    pub backangle: f64,
    pub orientation: i32,
}

/// Task controller state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatus {
    pub echo_serial_number: i32,
    pub exec_state: ExecState,
    /// Currently loaded program
    pub file: String,
    pub input_timeout: bool,
    pub optional_stop: bool,
    pub read_line: i32,
    pub task_mode: TaskMode,
    pub task_paused: bool,
    pub task_state: TaskState,
    /// Interpreter subroutine nesting depth (0 = top level)
    pub call_level: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpStatus {
    pub command: String,
    pub gcodes: Vec<i32>,
    pub interp_state: InterpState,
    pub interpreter_errcode: i32,
    pub mcodes: Vec<i32>,
    pub settings: Vec<f64>,
}

/// Trajectory, spindle, I/O and per-axis motion state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionStatus {
    pub active_queue: i32,
    pub actual_position: Position,
    pub adaptive_feed_enabled: bool,
    pub ain: Vec<f64>,
    pub aout: Vec<f64>,
    pub axis: Vec<MotionAxis>,
    pub block_delete: bool,
    pub current_line: i32,
    pub current_vel: f64,
    pub delay_left: f64,
    pub din: Vec<bool>,
    pub distance_to_go: f64,
    pub dout: Vec<bool>,
    pub dtg: Position,
    pub enabled: bool,
    pub feed_hold_enabled: bool,
    pub feed_override_enabled: bool,
    pub feedrate: f64,
    pub g5x_index: OriginIndex,
    pub g5x_offset: Position,
    pub g92_offset: Position,
    pub id: i32,
    pub inpos: bool,
    pub joint_actual_position: Position,
    pub joint_position: Position,
    pub limit: Vec<i32>,
    pub motion_line: i32,
    pub motion_type: MotionType,
    pub motion_mode: TrajMode,
    pub paused: bool,
    pub position: Position,
    pub probe_tripped: bool,
    pub probe_val: i32,
    pub probed_position: Position,
    pub probing: bool,
    pub queue: i32,
    pub queue_full: bool,
    pub rotation_xy: f64,
    pub spindle_brake: bool,
    pub spindle_direction: i32,
    pub spindle_enabled: bool,
    pub spindle_increasing: i32,
    pub spindle_override_enabled: bool,
    pub spindle_speed: f64,
    pub spindlerate: f64,
    pub state: MotionState,
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionAxis {
    pub enabled: bool,
    pub fault: bool,
    pub ferror_current: f64,
    pub ferror_highmark: f64,
    pub homed: bool,
    pub homing: bool,
    pub inpos: bool,
    pub input: f64,
    pub max_hard_limit: bool,
    pub max_soft_limit: bool,
    pub min_hard_limit: bool,
    pub min_soft_limit: bool,
    pub output: f64,
    pub override_limits: bool,
    pub velocity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_roundtrip() {
        for group in Group::ALL {
            assert_eq!(Group::from_topic(group.topic()), Some(group));
        }
        assert_eq!(Group::from_topic("status"), None);
    }

    #[test]
    fn test_neutral_seeds() {
        let snapshot = StateSnapshot::default();
        assert_eq!(snapshot.task.exec_state, ExecState::Error);
        assert_eq!(snapshot.task.task_mode, TaskMode::Manual);
        assert_eq!(snapshot.task.task_state, TaskState::Estop);
        assert_eq!(snapshot.interp.interp_state, InterpState::Idle);
        assert_eq!(snapshot.motion.motion_mode, TrajMode::Free);
        assert_eq!(snapshot.motion.g5x_index, OriginIndex::G54);
        assert_eq!(snapshot.motion.state, MotionState::Uninitialized);
        assert_eq!(ConfigAxis::default().home_sequence, -1);
    }
}
