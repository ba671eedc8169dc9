//! Field-by-field comparators for the status groups

use super::{Element, Tracked, dump_list, merge_list, track_list};
use crate::model::{
    ConfigAxis, ConfigStatus, InterpStatus, IoStatus, MotionAxis, MotionStatus, TaskStatus,
    ToolEntry,
};
use crate::proto::{
    ConfigAxisDelta, ConfigDelta, InterpDelta, IoDelta, MotionAxisDelta, MotionDelta, TaskDelta,
    ToolEntryDelta,
};

/// Implements [`Tracked`] for a struct whose delta message mirrors it.
///
/// `fields` are optional scalars in the delta, `lists` are repeated entries.
macro_rules! impl_tracked {
    (
        $ty:ty => $delta:ty {
            fields: [$($field:ident),* $(,)?],
            lists: [$($list:ident),* $(,)?] $(,)?
        }
    ) => {
        impl Tracked for $ty {
            type Delta = $delta;

            fn track(&mut self, new: &Self) -> Option<$delta> {
                let mut delta = <$delta>::default();
                let mut changed = false;
                $(
                    if let Some(value) = self.$field.track(&new.$field) {
                        delta.$field = Some(value);
                        changed = true;
                    }
                )*
                $(
                    delta.$list = track_list(&mut self.$list, &new.$list);
                    changed |= !delta.$list.is_empty();
                )*
                changed.then_some(delta)
            }

            fn merge(&mut self, delta: &$delta) {
                $(
                    if let Some(value) = &delta.$field {
                        self.$field.merge(value);
                    }
                )*
                $(
                    merge_list(&mut self.$list, &delta.$list);
                )*
            }

            fn dump(&self) -> $delta {
                let mut delta = <$delta>::default();
                $(
                    delta.$field = Some(self.$field.dump());
                )*
                $(
                    delta.$list = dump_list(&self.$list);
                )*
                delta
            }
        }
    };
}

/// Implements [`Element`] for a struct whose delta carries an `index` field.
macro_rules! impl_indexed {
    ($($ty:ty => $delta:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                type Entry = $delta;

                fn entry(index: usize, mut delta: $delta) -> $delta {
                    delta.index = index as i32;
                    delta
                }

                fn entry_index(entry: &$delta) -> Option<usize> {
                    usize::try_from(entry.index).ok()
                }

                fn apply(&mut self, entry: &$delta) {
                    self.merge(entry);
                }
            }
        )*
    };
}

impl_tracked!(ConfigStatus => ConfigDelta {
    fields: [
        default_acceleration,
        angular_units,
        axes,
        axis_mask,
        cycle_time,
        debug,
        kinematics_type,
        linear_units,
        max_acceleration,
        max_velocity,
        program_units,
        default_velocity,
        position_offset,
        position_feedback,
        max_feed_override,
        min_feed_override,
        max_spindle_override,
        min_spindle_override,
        default_spindle_speed,
        default_linear_velocity,
        min_velocity,
        max_linear_velocity,
        min_linear_velocity,
        default_angular_velocity,
        max_angular_velocity,
        min_angular_velocity,
        increments,
        grids,
        lathe,
        geometry,
        arcdivision,
        no_force_homing,
        remote_path,
        time_units,
        name,
    ],
    lists: [axis, program_extension],
});

impl_tracked!(ConfigAxis => ConfigAxisDelta {
    fields: [
        axis_type,
        backlash,
        max_ferror,
        max_position_limit,
        min_ferror,
        min_position_limit,
        units,
        home_sequence,
    ],
    lists: [],
});

impl_tracked!(IoStatus => IoDelta {
    fields: [
        estop,
        flood,
        lube,
        lube_level,
        mist,
        pocket_prepped,
        tool_in_spindle,
        tool_offset,
    ],
    lists: [tool_table],
});

impl_tracked!(ToolEntry => ToolEntryDelta {
    fields: [id, offset, diameter, frontangle, backangle, orientation],
    lists: [],
});

impl_tracked!(InterpStatus => InterpDelta {
    fields: [command, interp_state, interpreter_errcode],
    lists: [gcodes, mcodes, settings],
});

impl_tracked!(MotionStatus => MotionDelta {
    fields: [
        active_queue,
        actual_position,
        adaptive_feed_enabled,
        block_delete,
        current_line,
        current_vel,
        delay_left,
        distance_to_go,
        dtg,
        enabled,
        feed_hold_enabled,
        feed_override_enabled,
        feedrate,
        g5x_index,
        g5x_offset,
        g92_offset,
        id,
        inpos,
        joint_actual_position,
        joint_position,
        motion_line,
        motion_type,
        motion_mode,
        paused,
        position,
        probe_tripped,
        probe_val,
        probed_position,
        probing,
        queue,
        queue_full,
        rotation_xy,
        spindle_brake,
        spindle_direction,
        spindle_enabled,
        spindle_increasing,
        spindle_override_enabled,
        spindle_speed,
        spindlerate,
        state,
        max_velocity,
        max_acceleration,
    ],
    lists: [ain, aout, axis, din, dout, limit],
});

impl_tracked!(MotionAxis => MotionAxisDelta {
    fields: [
        enabled,
        fault,
        ferror_current,
        ferror_highmark,
        homed,
        homing,
        inpos,
        input,
        max_hard_limit,
        max_soft_limit,
        min_hard_limit,
        min_soft_limit,
        output,
        override_limits,
        velocity,
    ],
    lists: [],
});

impl_indexed!(
    ConfigAxis => ConfigAxisDelta,
    ToolEntry => ToolEntryDelta,
    MotionAxis => MotionAxisDelta,
);

// Written out by hand: the loaded file is held back while the interpreter is
// inside a subroutine, otherwise remapped code makes the name flap.
impl Tracked for TaskStatus {
    type Delta = TaskDelta;

    fn track(&mut self, new: &Self) -> Option<TaskDelta> {
        let file = if new.call_level == 0 {
            self.file.track(&new.file)
        } else {
            None
        };

        let delta = TaskDelta {
            echo_serial_number: self.echo_serial_number.track(&new.echo_serial_number),
            exec_state: self.exec_state.track(&new.exec_state),
            file,
            input_timeout: self.input_timeout.track(&new.input_timeout),
            optional_stop: self.optional_stop.track(&new.optional_stop),
            read_line: self.read_line.track(&new.read_line),
            task_mode: self.task_mode.track(&new.task_mode),
            task_paused: self.task_paused.track(&new.task_paused),
            task_state: self.task_state.track(&new.task_state),
            call_level: self.call_level.track(&new.call_level),
        };
        (delta != TaskDelta::default()).then_some(delta)
    }

    fn merge(&mut self, delta: &TaskDelta) {
        if let Some(v) = delta.echo_serial_number {
            self.echo_serial_number = v;
        }
        if let Some(v) = delta.exec_state {
            self.exec_state.merge(&v);
        }
        if let Some(v) = &delta.file {
            self.file.clone_from(v);
        }
        if let Some(v) = delta.input_timeout {
            self.input_timeout = v;
        }
        if let Some(v) = delta.optional_stop {
            self.optional_stop = v;
        }
        if let Some(v) = delta.read_line {
            self.read_line = v;
        }
        if let Some(v) = delta.task_mode {
            self.task_mode.merge(&v);
        }
        if let Some(v) = delta.task_paused {
            self.task_paused = v;
        }
        if let Some(v) = delta.task_state {
            self.task_state.merge(&v);
        }
        if let Some(v) = delta.call_level {
            self.call_level = v;
        }
    }

    fn dump(&self) -> TaskDelta {
        TaskDelta {
            echo_serial_number: Some(self.echo_serial_number),
            exec_state: Some(self.exec_state.dump()),
            file: Some(self.file.clone()),
            input_timeout: Some(self.input_timeout),
            optional_stop: Some(self.optional_stop),
            read_line: Some(self.read_line),
            task_mode: Some(self.task_mode.dump()),
            task_paused: Some(self.task_paused),
            task_state: Some(self.task_state.dump()),
            call_level: Some(self.call_level),
        }
    }
}
