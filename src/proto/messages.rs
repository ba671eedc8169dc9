//! Protobuf message definitions
//!
//! Hand-written prost messages. Every status field is `optional` so a delta
//! carries only what changed; sub-collection entries carry their index.
//!
//! ```text
//! Container
//! ├── type            (MessageType)
//! ├── note[]          error/command replies
//! ├── pparams         keepalive on full updates
//! ├── interp_name     command target
//! ├── command         command parameters
//! └── delta (oneof)   config | io | task | interp | motion
//! ```

use super::types::{
    AxisType, CanonUnits, ExecState, InterpState, KinematicsType, MessageType, MotionState,
    MotionType, OriginIndex, PositionFeedback, PositionOffset, TaskMode, TaskState, TimeUnits,
    TrajMode,
};

/// Top-level message on every channel
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Container {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(string, repeated, tag = "2")]
    pub note: Vec<String>,
    #[prost(message, optional, tag = "3")]
    pub pparams: Option<ProtocolParameters>,
    #[prost(string, optional, tag = "4")]
    pub interp_name: Option<String>,
    #[prost(message, optional, tag = "5")]
    pub command: Option<CommandParameters>,
    #[prost(oneof = "GroupDelta", tags = "10, 11, 12, 13, 14")]
    pub delta: Option<GroupDelta>,
}

/// Status payload, one variant per group
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum GroupDelta {
    #[prost(message, tag = "10")]
    Config(ConfigDelta),
    #[prost(message, tag = "11")]
    Io(IoDelta),
    #[prost(message, tag = "12")]
    Task(TaskDelta),
    #[prost(message, tag = "13")]
    Interp(InterpDelta),
    #[prost(message, tag = "14")]
    Motion(MotionDelta),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtocolParameters {
    /// Milliseconds between keepalive pings
    #[prost(int32, tag = "1")]
    pub keepalive_timer: i32,
}

/// Partial 9-axis pose
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    #[prost(double, optional, tag = "1")]
    pub x: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub y: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub z: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub a: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub b: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub c: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub u: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub v: Option<f64>,
    #[prost(double, optional, tag = "9")]
    pub w: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalogValue {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(double, tag = "2")]
    pub value: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DigitalValue {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(bool, tag = "2")]
    pub value: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntValue {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(int32, tag = "2")]
    pub value: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextValue {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigDelta {
    #[prost(double, optional, tag = "1")]
    pub default_acceleration: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub angular_units: Option<f64>,
    #[prost(int32, optional, tag = "3")]
    pub axes: Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub axis: Vec<ConfigAxisDelta>,
    #[prost(int32, optional, tag = "5")]
    pub axis_mask: Option<i32>,
    #[prost(double, optional, tag = "6")]
    pub cycle_time: Option<f64>,
    #[prost(int32, optional, tag = "7")]
    pub debug: Option<i32>,
    #[prost(enumeration = "KinematicsType", optional, tag = "8")]
    pub kinematics_type: Option<i32>,
    #[prost(double, optional, tag = "10")]
    pub linear_units: Option<f64>,
    #[prost(double, optional, tag = "11")]
    pub max_acceleration: Option<f64>,
    #[prost(double, optional, tag = "12")]
    pub max_velocity: Option<f64>,
    #[prost(enumeration = "CanonUnits", optional, tag = "13")]
    pub program_units: Option<i32>,
    #[prost(double, optional, tag = "14")]
    pub default_velocity: Option<f64>,
    #[prost(message, repeated, tag = "15")]
    pub program_extension: Vec<TextValue>,
    #[prost(enumeration = "PositionOffset", optional, tag = "16")]
    pub position_offset: Option<i32>,
    #[prost(enumeration = "PositionFeedback", optional, tag = "17")]
    pub position_feedback: Option<i32>,
    #[prost(double, optional, tag = "18")]
    pub max_feed_override: Option<f64>,
    #[prost(double, optional, tag = "19")]
    pub min_feed_override: Option<f64>,
    #[prost(double, optional, tag = "20")]
    pub max_spindle_override: Option<f64>,
    #[prost(double, optional, tag = "21")]
    pub min_spindle_override: Option<f64>,
    #[prost(double, optional, tag = "22")]
    pub default_spindle_speed: Option<f64>,
    #[prost(double, optional, tag = "23")]
    pub default_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "24")]
    pub min_velocity: Option<f64>,
    #[prost(double, optional, tag = "25")]
    pub max_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "26")]
    pub min_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "27")]
    pub default_angular_velocity: Option<f64>,
    #[prost(double, optional, tag = "28")]
    pub max_angular_velocity: Option<f64>,
    #[prost(double, optional, tag = "29")]
    pub min_angular_velocity: Option<f64>,
    #[prost(string, optional, tag = "30")]
    pub increments: Option<String>,
    #[prost(string, optional, tag = "31")]
    pub grids: Option<String>,
    #[prost(bool, optional, tag = "32")]
    pub lathe: Option<bool>,
    #[prost(string, optional, tag = "33")]
    pub geometry: Option<String>,
    #[prost(int32, optional, tag = "34")]
    pub arcdivision: Option<i32>,
    #[prost(bool, optional, tag = "35")]
    pub no_force_homing: Option<bool>,
    #[prost(string, optional, tag = "36")]
    pub remote_path: Option<String>,
    #[prost(enumeration = "TimeUnits", optional, tag = "37")]
    pub time_units: Option<i32>,
    #[prost(string, optional, tag = "38")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigAxisDelta {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(enumeration = "AxisType", optional, tag = "2")]
    pub axis_type: Option<i32>,
    #[prost(double, optional, tag = "3")]
    pub backlash: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub max_ferror: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub max_position_limit: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub min_ferror: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub min_position_limit: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub units: Option<f64>,
    #[prost(int32, optional, tag = "9")]
    pub home_sequence: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IoDelta {
    #[prost(bool, optional, tag = "1")]
    pub estop: Option<bool>,
    #[prost(bool, optional, tag = "2")]
    pub flood: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub lube: Option<bool>,
    #[prost(int32, optional, tag = "4")]
    pub lube_level: Option<i32>,
    #[prost(bool, optional, tag = "5")]
    pub mist: Option<bool>,
    #[prost(int32, optional, tag = "6")]
    pub pocket_prepped: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub tool_in_spindle: Option<i32>,
    #[prost(message, optional, tag = "8")]
    pub tool_offset: Option<Position>,
    #[prost(message, repeated, tag = "9")]
    pub tool_table: Vec<ToolEntryDelta>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToolEntryDelta {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(int32, optional, tag = "2")]
    pub id: Option<i32>,
    #[prost(message, optional, tag = "3")]
    pub offset: Option<Position>,
    #[prost(double, optional, tag = "4")]
    pub diameter: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub frontangle: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub backangle: Option<f64>,
    #[prost(int32, optional, tag = "7")]
    pub orientation: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskDelta {
    #[prost(int32, optional, tag = "1")]
    pub echo_serial_number: Option<i32>,
    #[prost(enumeration = "ExecState", optional, tag = "2")]
    pub exec_state: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub file: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub input_timeout: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub optional_stop: Option<bool>,
    #[prost(int32, optional, tag = "6")]
    pub read_line: Option<i32>,
    #[prost(enumeration = "TaskMode", optional, tag = "7")]
    pub task_mode: Option<i32>,
    #[prost(bool, optional, tag = "8")]
    pub task_paused: Option<bool>,
    #[prost(enumeration = "TaskState", optional, tag = "9")]
    pub task_state: Option<i32>,
    #[prost(int32, optional, tag = "10")]
    pub call_level: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InterpDelta {
    #[prost(string, optional, tag = "1")]
    pub command: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub gcodes: Vec<IntValue>,
    #[prost(enumeration = "InterpState", optional, tag = "3")]
    pub interp_state: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub interpreter_errcode: Option<i32>,
    #[prost(message, repeated, tag = "5")]
    pub mcodes: Vec<IntValue>,
    #[prost(message, repeated, tag = "6")]
    pub settings: Vec<AnalogValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MotionDelta {
    #[prost(int32, optional, tag = "1")]
    pub active_queue: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub actual_position: Option<Position>,
    #[prost(bool, optional, tag = "3")]
    pub adaptive_feed_enabled: Option<bool>,
    #[prost(message, repeated, tag = "4")]
    pub ain: Vec<AnalogValue>,
    #[prost(message, repeated, tag = "5")]
    pub aout: Vec<AnalogValue>,
    #[prost(message, repeated, tag = "6")]
    pub axis: Vec<MotionAxisDelta>,
    #[prost(bool, optional, tag = "7")]
    pub block_delete: Option<bool>,
    #[prost(int32, optional, tag = "8")]
    pub current_line: Option<i32>,
    #[prost(double, optional, tag = "9")]
    pub current_vel: Option<f64>,
    #[prost(double, optional, tag = "10")]
    pub delay_left: Option<f64>,
    #[prost(message, repeated, tag = "11")]
    pub din: Vec<DigitalValue>,
    #[prost(double, optional, tag = "12")]
    pub distance_to_go: Option<f64>,
    #[prost(message, repeated, tag = "13")]
    pub dout: Vec<DigitalValue>,
    #[prost(message, optional, tag = "14")]
    pub dtg: Option<Position>,
    #[prost(bool, optional, tag = "15")]
    pub enabled: Option<bool>,
    #[prost(bool, optional, tag = "16")]
    pub feed_hold_enabled: Option<bool>,
    #[prost(bool, optional, tag = "17")]
    pub feed_override_enabled: Option<bool>,
    #[prost(double, optional, tag = "18")]
    pub feedrate: Option<f64>,
    #[prost(enumeration = "OriginIndex", optional, tag = "19")]
    pub g5x_index: Option<i32>,
    #[prost(message, optional, tag = "20")]
    pub g5x_offset: Option<Position>,
    #[prost(message, optional, tag = "21")]
    pub g92_offset: Option<Position>,
    #[prost(int32, optional, tag = "22")]
    pub id: Option<i32>,
    #[prost(bool, optional, tag = "23")]
    pub inpos: Option<bool>,
    #[prost(message, optional, tag = "24")]
    pub joint_actual_position: Option<Position>,
    #[prost(message, optional, tag = "25")]
    pub joint_position: Option<Position>,
    #[prost(message, repeated, tag = "26")]
    pub limit: Vec<IntValue>,
    #[prost(int32, optional, tag = "27")]
    pub motion_line: Option<i32>,
    #[prost(enumeration = "MotionType", optional, tag = "28")]
    pub motion_type: Option<i32>,
    #[prost(enumeration = "TrajMode", optional, tag = "29")]
    pub motion_mode: Option<i32>,
    #[prost(bool, optional, tag = "30")]
    pub paused: Option<bool>,
    #[prost(message, optional, tag = "31")]
    pub position: Option<Position>,
    #[prost(bool, optional, tag = "32")]
    pub probe_tripped: Option<bool>,
    #[prost(int32, optional, tag = "33")]
    pub probe_val: Option<i32>,
    #[prost(message, optional, tag = "34")]
    pub probed_position: Option<Position>,
    #[prost(bool, optional, tag = "35")]
    pub probing: Option<bool>,
    #[prost(int32, optional, tag = "36")]
    pub queue: Option<i32>,
    #[prost(bool, optional, tag = "37")]
    pub queue_full: Option<bool>,
    #[prost(double, optional, tag = "38")]
    pub rotation_xy: Option<f64>,
    #[prost(bool, optional, tag = "39")]
    pub spindle_brake: Option<bool>,
    #[prost(int32, optional, tag = "40")]
    pub spindle_direction: Option<i32>,
    #[prost(bool, optional, tag = "41")]
    pub spindle_enabled: Option<bool>,
    #[prost(int32, optional, tag = "42")]
    pub spindle_increasing: Option<i32>,
    #[prost(bool, optional, tag = "43")]
    pub spindle_override_enabled: Option<bool>,
    #[prost(double, optional, tag = "44")]
    pub spindle_speed: Option<f64>,
    #[prost(double, optional, tag = "45")]
    pub spindlerate: Option<f64>,
    #[prost(enumeration = "MotionState", optional, tag = "46")]
    pub state: Option<i32>,
    #[prost(double, optional, tag = "47")]
    pub max_velocity: Option<f64>,
    #[prost(double, optional, tag = "48")]
    pub max_acceleration: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MotionAxisDelta {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(bool, optional, tag = "2")]
    pub enabled: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub fault: Option<bool>,
    #[prost(double, optional, tag = "4")]
    pub ferror_current: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub ferror_highmark: Option<f64>,
    #[prost(bool, optional, tag = "6")]
    pub homed: Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub homing: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub inpos: Option<bool>,
    #[prost(double, optional, tag = "9")]
    pub input: Option<f64>,
    #[prost(bool, optional, tag = "10")]
    pub max_hard_limit: Option<bool>,
    #[prost(bool, optional, tag = "11")]
    pub max_soft_limit: Option<bool>,
    #[prost(bool, optional, tag = "12")]
    pub min_hard_limit: Option<bool>,
    #[prost(bool, optional, tag = "13")]
    pub min_soft_limit: Option<bool>,
    #[prost(double, optional, tag = "14")]
    pub output: Option<f64>,
    #[prost(bool, optional, tag = "15")]
    pub override_limits: Option<bool>,
    #[prost(double, optional, tag = "16")]
    pub velocity: Option<f64>,
}

/// Parameters of a command request
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandParameters {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(double, optional, tag = "2")]
    pub velocity: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub distance: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub scale: Option<f64>,
    #[prost(bool, optional, tag = "5")]
    pub enable: Option<bool>,
    #[prost(double, optional, tag = "6")]
    pub value: Option<f64>,
    #[prost(int32, optional, tag = "7")]
    pub line_number: Option<i32>,
    #[prost(string, optional, tag = "8")]
    pub path: Option<String>,
    #[prost(string, optional, tag = "9")]
    pub command: Option<String>,
    #[prost(enumeration = "TaskMode", optional, tag = "10")]
    pub task_mode: Option<i32>,
    #[prost(enumeration = "TaskState", optional, tag = "11")]
    pub task_state: Option<i32>,
    #[prost(enumeration = "TrajMode", optional, tag = "12")]
    pub traj_mode: Option<i32>,
    #[prost(int32, optional, tag = "13")]
    pub debug_level: Option<i32>,
    #[prost(message, optional, tag = "14")]
    pub pose: Option<Position>,
    #[prost(message, optional, tag = "15")]
    pub tool_data: Option<ToolData>,
}

/// Tool table row for offset updates
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToolData {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(double, optional, tag = "2")]
    pub z_offset: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub x_offset: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub diameter: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub frontangle: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub backangle: Option<f64>,
    #[prost(int32, optional, tag = "7")]
    pub orientation: Option<i32>,
}
