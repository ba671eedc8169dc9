//! Typed commands decoded from command-channel requests

use crate::error::{Error, Result};
use crate::model::Position;
use crate::proto::{CommandParameters, Container, MessageType, TaskMode, TaskState, TrajMode};

/// Interpreter that executes program and task commands
const EXECUTE_INTERP: &str = "execute";

/// Tool table row written by [`Command::SetToolOffset`]
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOffset {
    pub tool: i32,
    pub z_offset: f64,
    pub x_offset: f64,
    pub diameter: f64,
    pub frontangle: f64,
    pub backangle: f64,
    pub orientation: i32,
}

/// Controller command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Task and interpreter
    Abort,
    Pause,
    Resume,
    Step,
    Run { line: i32 },
    Open { path: String },
    Execute { mdi: String },
    PlanInit,
    SetMode(TaskMode),
    SetState(TaskState),
    SetBlockDelete(bool),
    SetOptionalStop(bool),

    // Trajectory
    SetTrajMode(TrajMode),
    SetFeedScale(f64),
    SetSpindleScale(f64),
    SetMaxVelocity(f64),
    SetFeedHold(bool),
    SetFeedOverride(bool),
    SetSpindleOverride(bool),
    SetAdaptiveFeed(bool),
    TeleopEnable(bool),
    TeleopVector(Position),

    // Axes
    Home { axis: i32 },
    Unhome { axis: i32 },
    AxisAbort { axis: i32 },
    Jog { axis: i32, velocity: f64 },
    IncrJog { axis: i32, velocity: f64, distance: f64 },
    OverrideLimits,
    SetMaxPositionLimit { axis: i32, value: f64 },
    SetMinPositionLimit { axis: i32, value: f64 },

    // Spindle and coolant
    SpindleOn { speed: f64 },
    SpindleOff,
    SpindleIncrease,
    SpindleDecrease,
    SpindleConstant,
    SpindleBrake(bool),
    Flood(bool),
    Mist(bool),

    // I/O, tools, misc
    SetDigitalOutput { index: i32, value: bool },
    SetAnalogOutput { index: i32, value: f64 },
    SetDebug(i32),
    LoadToolTable,
    SetToolOffset(ToolOffset),
}

fn param<T>(
    params: Option<&CommandParameters>,
    get: impl FnOnce(&CommandParameters) -> Option<T>,
) -> Result<T> {
    params.and_then(get).ok_or(Error::WrongParameters)
}

fn enum_param<E: TryFrom<i32>>(raw: Option<i32>) -> Option<E> {
    raw.and_then(|v| E::try_from(v).ok())
}

impl Command {
    /// Decode a command request
    ///
    /// Fails with [`Error::WrongParameters`] when a required parameter is
    /// missing or out of range, or when a task command does not name the
    /// `execute` interpreter, and with [`Error::UnknownCommand`] for message
    /// types that are not commands.
    pub fn from_container(rx: &Container) -> Result<Command> {
        let kind = rx.message_type().ok_or(Error::UnknownCommand)?;
        let p = rx.command.as_ref();
        let interp = || match rx.interp_name.as_deref() {
            Some(EXECUTE_INTERP) => Ok(()),
            _ => Err(Error::WrongParameters),
        };

        let command = match kind {
            MessageType::TaskAbort => {
                interp()?;
                Command::Abort
            }
            MessageType::TaskPlanPause => {
                interp()?;
                Command::Pause
            }
            MessageType::TaskPlanResume => {
                interp()?;
                Command::Resume
            }
            MessageType::TaskPlanStep => {
                interp()?;
                Command::Step
            }
            MessageType::TaskPlanRun => {
                let line = param(p, |p| p.line_number)?;
                interp()?;
                Command::Run { line }
            }
            MessageType::TaskPlanOpen => {
                let path = param(p, |p| p.path.clone())?;
                interp()?;
                Command::Open { path }
            }
            MessageType::TaskPlanExecute => {
                let mdi = param(p, |p| p.command.clone())?;
                interp()?;
                Command::Execute { mdi }
            }
            MessageType::TaskPlanInit => {
                interp()?;
                Command::PlanInit
            }
            MessageType::TaskSetMode => {
                let mode = param(p, |p| enum_param(p.task_mode))?;
                interp()?;
                Command::SetMode(mode)
            }
            MessageType::TaskSetState => {
                let state = param(p, |p| enum_param(p.task_state))?;
                interp()?;
                Command::SetState(state)
            }
            MessageType::TaskPlanSetBlockDelete => Command::SetBlockDelete(param(p, |p| p.enable)?),
            MessageType::TaskPlanSetOptionalStop => {
                Command::SetOptionalStop(param(p, |p| p.enable)?)
            }

            MessageType::TrajSetMode => Command::SetTrajMode(param(p, |p| enum_param(p.traj_mode))?),
            MessageType::TrajSetScale => Command::SetFeedScale(param(p, |p| p.scale)?),
            MessageType::TrajSetSpindleScale => Command::SetSpindleScale(param(p, |p| p.scale)?),
            MessageType::TrajSetMaxVelocity => Command::SetMaxVelocity(param(p, |p| p.velocity)?),
            MessageType::TrajSetFeedHoldEnable => Command::SetFeedHold(param(p, |p| p.enable)?),
            MessageType::TrajSetFeedOverrideEnable => {
                Command::SetFeedOverride(param(p, |p| p.enable)?)
            }
            MessageType::TrajSetSpindleOverrideEnable => {
                Command::SetSpindleOverride(param(p, |p| p.enable)?)
            }
            MessageType::MotionAdaptive => Command::SetAdaptiveFeed(param(p, |p| p.enable)?),
            MessageType::TrajSetTeleopEnable => Command::TeleopEnable(param(p, |p| p.enable)?),
            MessageType::TrajSetTeleopVector => {
                let pose = param(p, |p| p.pose.clone())?;
                // Rotary components are required, auxiliary axes default to zero
                let (Some(a), Some(b), Some(c)) = (pose.a, pose.b, pose.c) else {
                    return Err(Error::WrongParameters);
                };
                Command::TeleopVector(Position {
                    a,
                    b,
                    c,
                    u: pose.u.unwrap_or(0.0),
                    v: pose.v.unwrap_or(0.0),
                    w: pose.w.unwrap_or(0.0),
                    ..Default::default()
                })
            }

            MessageType::AxisHome => Command::Home {
                axis: param(p, |p| p.index)?,
            },
            MessageType::AxisUnhome => Command::Unhome {
                axis: param(p, |p| p.index)?,
            },
            MessageType::AxisAbort => Command::AxisAbort {
                axis: param(p, |p| p.index)?,
            },
            MessageType::AxisJog => Command::Jog {
                axis: param(p, |p| p.index)?,
                velocity: param(p, |p| p.velocity)?,
            },
            MessageType::AxisIncrJog => Command::IncrJog {
                axis: param(p, |p| p.index)?,
                velocity: param(p, |p| p.velocity)?,
                distance: param(p, |p| p.distance)?,
            },
            MessageType::AxisOverrideLimits => Command::OverrideLimits,
            MessageType::AxisSetMaxPositionLimit => Command::SetMaxPositionLimit {
                axis: param(p, |p| p.index)?,
                value: param(p, |p| p.value)?,
            },
            MessageType::AxisSetMinPositionLimit => Command::SetMinPositionLimit {
                axis: param(p, |p| p.index)?,
                value: param(p, |p| p.value)?,
            },

            MessageType::SpindleOn => Command::SpindleOn {
                speed: param(p, |p| p.velocity)?,
            },
            MessageType::SpindleOff => Command::SpindleOff,
            MessageType::SpindleIncrease => Command::SpindleIncrease,
            MessageType::SpindleDecrease => Command::SpindleDecrease,
            MessageType::SpindleConstant => Command::SpindleConstant,
            MessageType::SpindleBrakeEngage => Command::SpindleBrake(true),
            MessageType::SpindleBrakeRelease => Command::SpindleBrake(false),
            MessageType::CoolantFloodOn => Command::Flood(true),
            MessageType::CoolantFloodOff => Command::Flood(false),
            MessageType::CoolantMistOn => Command::Mist(true),
            MessageType::CoolantMistOff => Command::Mist(false),

            MessageType::MotionSetDigitalOutput => Command::SetDigitalOutput {
                index: param(p, |p| p.index)?,
                value: param(p, |p| p.enable)?,
            },
            MessageType::MotionSetAnalogOutput => Command::SetAnalogOutput {
                index: param(p, |p| p.index)?,
                value: param(p, |p| p.value)?,
            },
            MessageType::SetDebug => Command::SetDebug(param(p, |p| p.debug_level)?),
            MessageType::ToolLoadToolTable => Command::LoadToolTable,
            MessageType::ToolSetOffset => {
                let data = param(p, |p| p.tool_data.clone())?;
                let tool = data.index.ok_or(Error::WrongParameters)?;
                Command::SetToolOffset(ToolOffset {
                    tool,
                    z_offset: data.z_offset.unwrap_or(0.0),
                    x_offset: data.x_offset.unwrap_or(0.0),
                    diameter: data.diameter.unwrap_or(0.0),
                    frontangle: data.frontangle.unwrap_or(0.0),
                    backangle: data.backangle.unwrap_or(0.0),
                    orientation: data.orientation.unwrap_or(0),
                })
            }

            MessageType::Ping
            | MessageType::PingAcknowledge
            | MessageType::Error
            | MessageType::FullUpdate
            | MessageType::IncrementalUpdate
            | MessageType::NmlError
            | MessageType::NmlText
            | MessageType::NmlDisplay
            | MessageType::OperatorError
            | MessageType::OperatorText
            | MessageType::OperatorDisplay => return Err(Error::UnknownCommand),
        };
        Ok(command)
    }

    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Command::Abort => "abort",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Step => "step",
            Command::Run { .. } => "run",
            Command::Open { .. } => "open",
            Command::Execute { .. } => "execute",
            Command::PlanInit => "plan_init",
            Command::SetMode(_) => "set_mode",
            Command::SetState(_) => "set_state",
            Command::SetBlockDelete(_) => "set_block_delete",
            Command::SetOptionalStop(_) => "set_optional_stop",
            Command::SetTrajMode(_) => "set_traj_mode",
            Command::SetFeedScale(_) => "set_feed_scale",
            Command::SetSpindleScale(_) => "set_spindle_scale",
            Command::SetMaxVelocity(_) => "set_max_velocity",
            Command::SetFeedHold(_) => "set_feed_hold",
            Command::SetFeedOverride(_) => "set_feed_override",
            Command::SetSpindleOverride(_) => "set_spindle_override",
            Command::SetAdaptiveFeed(_) => "set_adaptive_feed",
            Command::TeleopEnable(_) => "teleop_enable",
            Command::TeleopVector(_) => "teleop_vector",
            Command::Home { .. } => "home",
            Command::Unhome { .. } => "unhome",
            Command::AxisAbort { .. } => "axis_abort",
            Command::Jog { .. } => "jog",
            Command::IncrJog { .. } => "incr_jog",
            Command::OverrideLimits => "override_limits",
            Command::SetMaxPositionLimit { .. } => "set_max_position_limit",
            Command::SetMinPositionLimit { .. } => "set_min_position_limit",
            Command::SpindleOn { .. } => "spindle_on",
            Command::SpindleOff => "spindle_off",
            Command::SpindleIncrease => "spindle_increase",
            Command::SpindleDecrease => "spindle_decrease",
            Command::SpindleConstant => "spindle_constant",
            Command::SpindleBrake(_) => "spindle_brake",
            Command::Flood(_) => "flood",
            Command::Mist(_) => "mist",
            Command::SetDigitalOutput { .. } => "set_digital_output",
            Command::SetAnalogOutput { .. } => "set_analog_output",
            Command::SetDebug(_) => "set_debug",
            Command::LoadToolTable => "load_tool_table",
            Command::SetToolOffset(_) => "set_tool_offset",
        }
    }
}
