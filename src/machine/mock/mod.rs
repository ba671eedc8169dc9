//! Simulated machine for running the relay without a controller
//!
//! One shared [`Simulation`] sits behind a `parking_lot::Mutex`. The
//! [`ControlSystem`] handed to the service holds three handles onto it, so
//! commands executed on the command thread show up in the next snapshot the
//! poll loop reads.
//!
//! # Behaviour
//!
//! | Command | Effect |
//! |---------|--------|
//! | state on/off/estop | task state, motion enable, io estop |
//! | home | axis homes on the next poll, position reset to 0 |
//! | jog / incremental jog | axis moves at `velocity` units/s, clamped to soft limits |
//! | open / run | loaded file, interpreter reads one line per poll |
//! | MDI `(MSG,...)` / `(DEBUG,...)` | operator display / text message |
//!
//! Actual position is the commanded position plus Gaussian noise
//! (`machine.position_noise`).
//!
//! Test hooks ([`SimulatedMachine::fail_next_polls`],
//! [`SimulatedMachine::push_error`], [`SimulatedMachine::update`]) let tests
//! drive snapshot failures and arbitrary state changes.

mod noise;

pub use noise::NoiseGenerator;

use super::{Command, CommandSink, ControlSystem, ErrorEvent, ErrorKind, ErrorSource, SnapshotSource};
use crate::config::MachineConfig;
use crate::error::{Error, Result};
use crate::model::{
    ConfigAxis, ConfigStatus, InterpStatus, IoStatus, MotionAxis, MotionStatus, Position,
    StateSnapshot, TaskStatus, ToolEntry,
};
use crate::proto::{
    AxisType, CanonUnits, ExecState, InterpState, KinematicsType, MotionState, MotionType,
    PositionFeedback, PositionOffset, TaskMode, TaskState, TrajMode,
};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

const MAX_AXES: usize = 9;
/// Lines in the simulated program
const PROGRAM_LINES: i32 = 100;
const SOFT_LIMIT: f64 = 500.0;
const SPINDLE_STEP: f64 = 100.0;

struct Jog {
    velocity: f64,
    remaining: Option<f64>,
}

struct Simulation {
    state: StateSnapshot,
    jogs: Vec<Option<Jog>>,
    errors: VecDeque<ErrorEvent>,
    failures: u32,
    executed: Vec<Command>,
    noise: NoiseGenerator,
    position_noise: f64,
    last_step: Option<Instant>,
}

/// Handle to a shared simulation
#[derive(Clone)]
pub struct SimulatedMachine {
    shared: Arc<Mutex<Simulation>>,
}

impl SimulatedMachine {
    pub fn new(config: &MachineConfig) -> Self {
        let axes = config.axes.clamp(1, MAX_AXES);
        info!(
            "Simulated machine: {} axes, {} tools, {} digital / {} analog I/O",
            axes, config.tools, config.digital_io, config.analog_io
        );
        let simulation = Simulation {
            state: initial_state(config, axes),
            jogs: (0..axes).map(|_| None).collect(),
            errors: VecDeque::new(),
            failures: 0,
            executed: Vec::new(),
            noise: NoiseGenerator::new(config.seed),
            position_noise: config.position_noise,
            last_step: None,
        };
        Self {
            shared: Arc::new(Mutex::new(simulation)),
        }
    }

    /// Collaborators for the service, all backed by this simulation
    pub fn control_system(&self) -> ControlSystem {
        ControlSystem {
            snapshot_source: Box::new(self.clone()),
            error_source: Box::new(self.clone()),
            command_sink: Box::new(self.clone()),
        }
    }

    /// Make the next `count` snapshot reads fail
    pub fn fail_next_polls(&self, count: u32) {
        self.shared.lock().failures = count;
    }

    pub fn push_error(&self, event: ErrorEvent) {
        self.shared.lock().errors.push_back(event);
    }

    /// Mutate the simulated state directly
    pub fn update(&self, f: impl FnOnce(&mut StateSnapshot)) {
        f(&mut self.shared.lock().state);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.shared.lock().state.clone()
    }

    /// Commands executed so far, oldest first
    pub fn executed(&self) -> Vec<Command> {
        self.shared.lock().executed.clone()
    }
}

impl SnapshotSource for SimulatedMachine {
    fn poll(&mut self) -> Result<StateSnapshot> {
        let mut sim = self.shared.lock();
        if sim.failures > 0 {
            sim.failures -= 1;
            return Err(Error::Snapshot("simulated read failure".to_string()));
        }
        let now = Instant::now();
        let dt = sim
            .last_step
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        sim.last_step = Some(now);
        sim.step(dt);
        Ok(sim.state.clone())
    }
}

impl ErrorSource for SimulatedMachine {
    fn poll_error(&mut self) -> Result<Option<ErrorEvent>> {
        Ok(self.shared.lock().errors.pop_front())
    }
}

impl CommandSink for SimulatedMachine {
    fn execute(&mut self, command: Command) -> Result<()> {
        let mut sim = self.shared.lock();
        sim.executed.push(command.clone());
        sim.state.task.echo_serial_number += 1;
        sim.apply(command)
    }
}

fn add_axis(position: &mut Position, axis: usize, delta: f64) {
    let mut values = position.axes();
    values[axis] += delta;
    *position = Position::from_axes(values);
}

fn set_axis(position: &mut Position, axis: usize, value: f64) {
    let mut values = position.axes();
    values[axis] = value;
    *position = Position::from_axes(values);
}

/// Extract the text of an MDI comment such as `(MSG, tool change)`
fn mdi_comment<'a>(mdi: &'a str, keyword: &str) -> Option<&'a str> {
    let body = mdi.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (head, text) = body.split_once(',')?;
    head.trim()
        .eq_ignore_ascii_case(keyword)
        .then(|| text.trim())
}

impl Simulation {
    fn axes(&self) -> usize {
        self.jogs.len()
    }

    fn axis_index(&self, axis: i32) -> Result<usize> {
        usize::try_from(axis)
            .ok()
            .filter(|&i| i < self.axes())
            .ok_or_else(|| Error::CommandFailed(format!("no such axis {}", axis)))
    }

    fn require_on(&self) -> Result<()> {
        if self.state.task.task_state == TaskState::On {
            Ok(())
        } else {
            Err(Error::CommandFailed("machine is not on".to_string()))
        }
    }

    fn step(&mut self, dt: f64) {
        let axes = self.axes();
        let mut speed_sq = 0.0;
        let mut dtg = Position::default();

        for i in 0..axes {
            let override_limits = self.state.motion.axis[i].override_limits;
            let (min, max) = {
                let cfg = &self.state.config.axis[i];
                (cfg.min_position_limit, cfg.max_position_limit)
            };

            let mut velocity = 0.0;
            if let Some(jog) = self.jogs[i].as_mut() {
                let mut delta = jog.velocity * dt;
                if let Some(remaining) = jog.remaining.as_mut() {
                    delta = delta.abs().min(*remaining) * jog.velocity.signum();
                    *remaining -= delta.abs();
                    set_axis(&mut dtg, i, *remaining);
                }
                velocity = jog.velocity;
                add_axis(&mut self.state.motion.position, i, delta);
                if jog.remaining.is_some_and(|r| r <= 0.0) {
                    self.jogs[i] = None;
                }
            }

            let value = self.state.motion.position.axes()[i];
            let axis = &mut self.state.motion.axis[i];
            axis.max_soft_limit = value > max;
            axis.min_soft_limit = value < min;
            if !override_limits && (axis.max_soft_limit || axis.min_soft_limit) {
                set_axis(&mut self.state.motion.position, i, value.clamp(min, max));
                self.jogs[i] = None;
                velocity = 0.0;
            }

            let axis = &mut self.state.motion.axis[i];
            if axis.homing {
                axis.homing = false;
                axis.homed = true;
                set_axis(&mut self.state.motion.position, i, 0.0);
            }
            axis.velocity = velocity;
            axis.inpos = velocity == 0.0;
            speed_sq += velocity * velocity;
        }

        let motion = &mut self.state.motion;
        motion.current_vel = speed_sq.sqrt();
        motion.inpos = motion.current_vel == 0.0;
        motion.dtg = dtg;
        motion.distance_to_go = dtg.axes().iter().map(|d| d * d).sum::<f64>().sqrt();
        motion.motion_type = if motion.inpos {
            MotionType::Unset
        } else {
            MotionType::Feed
        };
        motion.joint_position = motion.position;
        motion.actual_position = self.noise.jitter(motion.position, axes, self.position_noise);
        motion.joint_actual_position = motion.actual_position;
        for (i, axis) in motion.axis.iter_mut().enumerate() {
            let commanded = motion.position.axes()[i];
            axis.output = commanded;
            axis.input = motion.actual_position.axes()[i];
            axis.ferror_current = (axis.input - commanded).abs();
            axis.ferror_highmark = axis.ferror_highmark.max(axis.ferror_current);
        }

        if self.state.interp.interp_state == InterpState::Reading && !self.state.task.task_paused {
            let task = &mut self.state.task;
            task.read_line += 1;
            motion.current_line = task.read_line;
            motion.motion_line = task.read_line;
            if task.read_line >= PROGRAM_LINES {
                debug!("Simulated program {} finished", task.file);
                self.state.interp.interp_state = InterpState::Idle;
                task.exec_state = ExecState::Done;
            } else {
                task.exec_state = ExecState::WaitingForMotion;
            }
        }
    }

    fn stop_jogs(&mut self) {
        for jog in &mut self.jogs {
            *jog = None;
        }
    }

    fn set_state(&mut self, state: TaskState) -> Result<()> {
        match state {
            TaskState::Estop => {
                self.state.io.estop = true;
                self.state.motion.enabled = false;
                self.stop_jogs();
            }
            TaskState::EstopReset => self.state.io.estop = false,
            TaskState::Off => {
                self.state.motion.enabled = false;
                self.stop_jogs();
            }
            TaskState::On => {
                if self.state.io.estop {
                    return Err(Error::CommandFailed("emergency stop is active".to_string()));
                }
                self.state.motion.enabled = true;
            }
        }
        let enabled = self.state.motion.enabled;
        for axis in &mut self.state.motion.axis {
            axis.enabled = enabled;
        }
        self.state.task.task_state = state;
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Abort => {
                self.stop_jogs();
                self.state.interp.interp_state = InterpState::Idle;
                self.state.task.task_paused = false;
                self.state.task.exec_state = ExecState::Done;
            }
            Command::Pause => {
                self.state.task.task_paused = true;
                self.state.motion.paused = true;
                self.state.interp.interp_state = InterpState::Paused;
            }
            Command::Resume => {
                self.state.task.task_paused = false;
                self.state.motion.paused = false;
                self.state.interp.interp_state = InterpState::Reading;
            }
            Command::Step => {
                self.state.task.task_paused = true;
                self.state.task.read_line += 1;
            }
            Command::Run { line } => {
                self.require_on()?;
                if self.state.task.file.is_empty() {
                    return Err(Error::CommandFailed("no program loaded".to_string()));
                }
                self.state.task.task_mode = TaskMode::Auto;
                self.state.task.read_line = line.max(0);
                self.state.task.task_paused = false;
                self.state.interp.interp_state = InterpState::Reading;
            }
            Command::Open { path } => {
                if self.state.interp.interp_state != InterpState::Idle {
                    return Err(Error::CommandFailed("interpreter is busy".to_string()));
                }
                self.state.task.file = path;
                self.state.task.read_line = 0;
            }
            Command::Execute { mdi } => {
                self.require_on()?;
                if self.state.task.task_mode != TaskMode::Mdi {
                    return Err(Error::CommandFailed("not in MDI mode".to_string()));
                }
                if let Some(text) = mdi_comment(&mdi, "MSG") {
                    self.errors
                        .push_back(ErrorEvent::new(ErrorKind::OperatorDisplay, text));
                } else if let Some(text) = mdi_comment(&mdi, "DEBUG") {
                    self.errors
                        .push_back(ErrorEvent::new(ErrorKind::OperatorText, text));
                }
                self.state.interp.command = mdi;
            }
            Command::PlanInit => {
                self.state.interp.interp_state = InterpState::Idle;
                self.state.interp.interpreter_errcode = 0;
            }
            Command::SetMode(mode) => self.state.task.task_mode = mode,
            Command::SetState(state) => self.set_state(state)?,
            Command::SetBlockDelete(enable) => self.state.motion.block_delete = enable,
            Command::SetOptionalStop(enable) => self.state.task.optional_stop = enable,

            Command::SetTrajMode(mode) => self.state.motion.motion_mode = mode,
            Command::SetFeedScale(scale) => self.state.motion.feedrate = scale,
            Command::SetSpindleScale(scale) => self.state.motion.spindlerate = scale,
            Command::SetMaxVelocity(velocity) => self.state.motion.max_velocity = velocity,
            Command::SetFeedHold(enable) => self.state.motion.feed_hold_enabled = enable,
            Command::SetFeedOverride(enable) => self.state.motion.feed_override_enabled = enable,
            Command::SetSpindleOverride(enable) => {
                self.state.motion.spindle_override_enabled = enable
            }
            Command::SetAdaptiveFeed(enable) => self.state.motion.adaptive_feed_enabled = enable,
            Command::TeleopEnable(enable) => {
                self.state.motion.motion_mode = if enable {
                    TrajMode::Teleop
                } else {
                    TrajMode::Free
                };
            }
            Command::TeleopVector(_) => {
                if self.state.motion.motion_mode != TrajMode::Teleop {
                    return Err(Error::CommandFailed("teleop mode is not enabled".to_string()));
                }
            }

            Command::Home { axis } => {
                self.require_on()?;
                let i = self.axis_index(axis)?;
                self.state.motion.axis[i].homing = true;
            }
            Command::Unhome { axis } => {
                let i = self.axis_index(axis)?;
                self.state.motion.axis[i].homed = false;
            }
            Command::AxisAbort { axis } => {
                let i = self.axis_index(axis)?;
                self.jogs[i] = None;
            }
            Command::Jog { axis, velocity } => {
                self.require_on()?;
                let i = self.axis_index(axis)?;
                self.jogs[i] = (velocity != 0.0).then_some(Jog {
                    velocity,
                    remaining: None,
                });
            }
            Command::IncrJog {
                axis,
                velocity,
                distance,
            } => {
                self.require_on()?;
                let i = self.axis_index(axis)?;
                let direction = if distance < 0.0 { -1.0 } else { 1.0 };
                self.jogs[i] = Some(Jog {
                    velocity: velocity.abs() * direction,
                    remaining: Some(distance.abs()),
                });
            }
            Command::OverrideLimits => {
                for axis in &mut self.state.motion.axis {
                    axis.override_limits = true;
                }
            }
            Command::SetMaxPositionLimit { axis, value } => {
                let i = self.axis_index(axis)?;
                self.state.config.axis[i].max_position_limit = value;
            }
            Command::SetMinPositionLimit { axis, value } => {
                let i = self.axis_index(axis)?;
                self.state.config.axis[i].min_position_limit = value;
            }

            Command::SpindleOn { speed } => {
                self.require_on()?;
                let motion = &mut self.state.motion;
                motion.spindle_enabled = speed != 0.0;
                motion.spindle_speed = speed.abs();
                motion.spindle_direction = speed.signum() as i32;
                motion.spindle_brake = false;
            }
            Command::SpindleOff => {
                let motion = &mut self.state.motion;
                motion.spindle_enabled = false;
                motion.spindle_speed = 0.0;
                motion.spindle_direction = 0;
                motion.spindle_increasing = 0;
            }
            Command::SpindleIncrease => {
                self.state.motion.spindle_speed += SPINDLE_STEP;
                self.state.motion.spindle_increasing = 1;
            }
            Command::SpindleDecrease => {
                let motion = &mut self.state.motion;
                motion.spindle_speed = (motion.spindle_speed - SPINDLE_STEP).max(0.0);
                motion.spindle_increasing = -1;
            }
            Command::SpindleConstant => self.state.motion.spindle_increasing = 0,
            Command::SpindleBrake(engage) => self.state.motion.spindle_brake = engage,
            Command::Flood(on) => self.state.io.flood = on,
            Command::Mist(on) => self.state.io.mist = on,

            Command::SetDigitalOutput { index, value } => {
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.state.motion.dout.get_mut(i))
                    .ok_or_else(|| Error::CommandFailed(format!("no digital output {}", index)))?;
                *slot = value;
            }
            Command::SetAnalogOutput { index, value } => {
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.state.motion.aout.get_mut(i))
                    .ok_or_else(|| Error::CommandFailed(format!("no analog output {}", index)))?;
                *slot = value;
            }
            Command::SetDebug(level) => self.state.config.debug = level,
            Command::LoadToolTable => debug!("Simulated tool table reload"),
            Command::SetToolOffset(offset) => {
                let entry = self
                    .state
                    .io
                    .tool_table
                    .iter_mut()
                    .find(|t| t.id == offset.tool)
                    .ok_or_else(|| Error::CommandFailed(format!("no tool {}", offset.tool)))?;
                entry.offset.z = offset.z_offset;
                entry.offset.x = offset.x_offset;
                entry.diameter = offset.diameter;
                entry.frontangle = offset.frontangle;
                entry.backangle = offset.backangle;
                entry.orientation = offset.orientation;
                if self.state.io.tool_in_spindle == offset.tool {
                    self.state.io.tool_offset = entry.offset;
                }
            }
        }
        Ok(())
    }
}

fn initial_state(config: &MachineConfig, axes: usize) -> StateSnapshot {
    let config_axes = (0..axes)
        .map(|i| ConfigAxis {
            axis_type: if i < 3 {
                AxisType::Linear
            } else {
                AxisType::Angular
            },
            max_ferror: 0.05,
            min_ferror: 0.01,
            max_position_limit: SOFT_LIMIT,
            min_position_limit: -SOFT_LIMIT,
            units: 1.0,
            home_sequence: i as i32,
            ..Default::default()
        })
        .collect();

    let tool_table = (1..=config.tools)
        .map(|id| ToolEntry {
            id: id as i32,
            diameter: id as f64,
            ..Default::default()
        })
        .collect();

    StateSnapshot {
        config: ConfigStatus {
            default_acceleration: 500.0,
            angular_units: 1.0,
            axes: axes as i32,
            axis: config_axes,
            axis_mask: (1 << axes) - 1,
            cycle_time: 0.001,
            kinematics_type: KinematicsType::Identity,
            linear_units: 1.0,
            max_acceleration: 1000.0,
            max_velocity: 100.0,
            program_units: CanonUnits::Mm,
            default_velocity: 25.0,
            program_extension: vec![".ngc G-code".to_string(), ".nc G-code".to_string()],
            position_offset: PositionOffset::Relative,
            position_feedback: PositionFeedback::Actual,
            max_feed_override: 1.5,
            max_spindle_override: 1.5,
            min_spindle_override: 0.5,
            default_spindle_speed: 1000.0,
            default_linear_velocity: 25.0,
            max_linear_velocity: 100.0,
            default_angular_velocity: 10.0,
            max_angular_velocity: 90.0,
            increments: "1mm .1mm .01mm".to_string(),
            grids: "0 10mm 20mm".to_string(),
            geometry: "XYZABCUVW".chars().take(axes).collect(),
            arcdivision: 64,
            remote_path: "/tmp/nc_files".to_string(),
            name: "Simulated machine".to_string(),
            ..Default::default()
        },
        io: IoStatus {
            estop: true,
            lube_level: 1,
            tool_table,
            ..Default::default()
        },
        task: TaskStatus {
            exec_state: ExecState::Done,
            task_mode: TaskMode::Manual,
            task_state: TaskState::Estop,
            ..Default::default()
        },
        interp: InterpStatus {
            gcodes: vec![0, 800, 170, 400, 210, 900, 940, 540, 490, 990, 640, 970, 911],
            mcodes: vec![0, 5, 9, 48, 53],
            settings: vec![0.0, 0.0, 0.0],
            interp_state: InterpState::Idle,
            ..Default::default()
        },
        motion: MotionStatus {
            ain: vec![0.0; config.analog_io],
            aout: vec![0.0; config.analog_io],
            axis: (0..axes)
                .map(|_| MotionAxis {
                    inpos: true,
                    ..Default::default()
                })
                .collect(),
            din: vec![false; config.digital_io],
            dout: vec![false; config.digital_io],
            feed_override_enabled: true,
            feedrate: 1.0,
            inpos: true,
            limit: vec![0; axes],
            spindle_override_enabled: true,
            spindlerate: 1.0,
            state: MotionState::Done,
            max_velocity: 100.0,
            max_acceleration: 1000.0,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn machine() -> SimulatedMachine {
        SimulatedMachine::new(&MachineConfig {
            seed: 1,
            ..Default::default()
        })
    }

    fn power_on(machine: &mut SimulatedMachine) {
        machine
            .execute(Command::SetState(TaskState::EstopReset))
            .unwrap();
        machine.execute(Command::SetState(TaskState::On)).unwrap();
    }

    #[test]
    fn test_initial_layout() {
        let snapshot = machine().snapshot();
        assert_eq!(snapshot.config.axes, 3);
        assert_eq!(snapshot.config.axis.len(), 3);
        assert_eq!(snapshot.config.axis_mask, 0b111);
        assert_eq!(snapshot.config.geometry, "XYZ");
        assert_eq!(snapshot.io.tool_table.len(), 4);
        assert_eq!(snapshot.motion.din.len(), 4);
        assert_eq!(snapshot.motion.aout.len(), 2);
        assert!(snapshot.io.estop);
    }

    #[test]
    fn test_power_on_requires_estop_reset() {
        let mut machine = machine();
        assert!(machine.execute(Command::SetState(TaskState::On)).is_err());
        power_on(&mut machine);
        let snapshot = machine.snapshot();
        assert_eq!(snapshot.task.task_state, TaskState::On);
        assert!(snapshot.motion.enabled);
        assert!(snapshot.motion.axis.iter().all(|a| a.enabled));
    }

    #[test]
    fn test_echo_serial_counts_commands() {
        let mut machine = machine();
        machine.execute(Command::Flood(true)).unwrap();
        let _ = machine.execute(Command::Home { axis: 0 });
        assert_eq!(machine.snapshot().task.echo_serial_number, 2);
        assert_eq!(machine.executed().len(), 2);
    }

    #[test]
    fn test_home_completes_on_next_poll() {
        let mut machine = machine();
        power_on(&mut machine);
        machine.execute(Command::Home { axis: 1 }).unwrap();
        assert!(machine.snapshot().motion.axis[1].homing);

        let snapshot = machine.poll().unwrap();
        assert!(snapshot.motion.axis[1].homed);
        assert!(!snapshot.motion.axis[1].homing);
    }

    #[test]
    fn test_invalid_axis() {
        let mut machine = machine();
        power_on(&mut machine);
        assert!(matches!(
            machine.execute(Command::Home { axis: 7 }),
            Err(Error::CommandFailed(_))
        ));
    }

    #[test]
    fn test_incremental_jog_stops_at_distance() {
        let machine = machine();
        let mut sim = machine.shared.lock();
        sim.state.task.task_state = TaskState::On;
        sim.apply(Command::IncrJog {
            axis: 0,
            velocity: 10.0,
            distance: -2.0,
        })
        .unwrap();

        sim.step(0.1);
        assert_relative_eq!(sim.state.motion.position.x, -1.0);
        assert_relative_eq!(sim.state.motion.current_vel, 10.0);
        sim.step(1.0);
        assert_relative_eq!(sim.state.motion.position.x, -2.0);
        sim.step(1.0);
        assert_relative_eq!(sim.state.motion.position.x, -2.0);
        assert!(sim.state.motion.inpos);
    }

    #[test]
    fn test_soft_limit_clamps_jog() {
        let machine = machine();
        let mut sim = machine.shared.lock();
        sim.state.task.task_state = TaskState::On;
        sim.apply(Command::Jog {
            axis: 2,
            velocity: 1000.0,
        })
        .unwrap();
        sim.step(1.0);
        assert_relative_eq!(sim.state.motion.position.z, SOFT_LIMIT);
        assert!(sim.state.motion.axis[2].max_soft_limit);
    }

    #[test]
    fn test_run_requires_program() {
        let mut machine = machine();
        power_on(&mut machine);
        assert!(machine.execute(Command::Run { line: 0 }).is_err());

        machine
            .execute(Command::Open {
                path: "part.ngc".to_string(),
            })
            .unwrap();
        machine.execute(Command::Run { line: 0 }).unwrap();
        let snapshot = machine.poll().unwrap();
        assert_eq!(snapshot.interp.interp_state, InterpState::Reading);
        assert_eq!(snapshot.task.read_line, 1);
    }

    #[test]
    fn test_mdi_message_goes_to_error_queue() {
        let mut machine = machine();
        power_on(&mut machine);
        machine.execute(Command::SetMode(TaskMode::Mdi)).unwrap();
        machine
            .execute(Command::Execute {
                mdi: "(MSG, change to tool 2)".to_string(),
            })
            .unwrap();

        let event = machine.poll_error().unwrap().unwrap();
        assert_eq!(event.kind, ErrorKind::OperatorDisplay);
        assert_eq!(event.text, "change to tool 2");
        assert!(machine.poll_error().unwrap().is_none());
    }

    #[test]
    fn test_failure_injection() {
        let mut machine = machine();
        machine.fail_next_polls(2);
        assert!(machine.poll().is_err());
        assert!(machine.poll().is_err());
        assert!(machine.poll().is_ok());
    }

    #[test]
    fn test_tool_offset_updates_table() {
        let mut machine = machine();
        machine
            .execute(Command::SetToolOffset(crate::machine::ToolOffset {
                tool: 2,
                z_offset: 15.5,
                x_offset: 0.0,
                diameter: 6.0,
                frontangle: 0.0,
                backangle: 0.0,
                orientation: 0,
            }))
            .unwrap();
        let entry = &machine.snapshot().io.tool_table[1];
        assert_relative_eq!(entry.offset.z, 15.5);
        assert_relative_eq!(entry.diameter, 6.0);
    }

    #[test]
    fn test_mdi_comment_parsing() {
        assert_eq!(mdi_comment("(MSG,hello)", "MSG"), Some("hello"));
        assert_eq!(mdi_comment("(debug, x=1)", "DEBUG"), Some("x=1"));
        assert_eq!(mdi_comment("G0 X1", "MSG"), None);
    }
}
