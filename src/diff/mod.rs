//! Selective diff between status snapshots
//!
//! # Overview
//!
//! Each status type knows how to compare itself against a newer value and
//! record only what changed:
//!
//! ```text
//! baseline (owned, mutable) ──┐
//!                             ├── track() ──> Option<Delta>   (baseline updated in place)
//! new snapshot (borrowed) ────┘
//! ```
//!
//! | Value | Comparison | Delta |
//! |-------|------------|-------|
//! | `f64` | `|a - b| > 1e-4` | `f64` |
//! | `i32`, `bool`, `String` | exact | same type |
//! | enumerations | exact | `i32` wire value |
//! | [`Position`] | per axis, 1e-4 | partial `proto::Position` |
//! | groups and list elements | field by field | prost delta message |
//!
//! # Sub-collections
//!
//! Lists use grow-then-diff: an index the baseline has never seen is first
//! appended as `Default` (the neutral seed), then diffed like any other entry.
//! A new element equal to its defaults grows the baseline but emits nothing.
//! Baseline lists never shrink.
//!
//! The receiving side uses [`Tracked::merge`] and [`merge_list`] with the same
//! seeds, so a mirror that starts from `Default` converges on the publisher's
//! baseline.

mod engine;
mod groups;

pub use engine::{DiffEngine, merge_group};

use crate::model::{Position, float_changed};
use crate::proto::{
    self, AnalogValue, AxisType, CanonUnits, DigitalValue, ExecState, IntValue, InterpState,
    KinematicsType, MotionState, MotionType, OriginIndex, PositionFeedback, PositionOffset,
    TaskMode, TaskState, TextValue, TimeUnits, TrajMode,
};

/// Largest list index a receiver will grow its baseline to
pub const MAX_LIST_LEN: usize = 4096;

/// A value whose changes can be tracked against a retained baseline
pub trait Tracked {
    /// Wire representation of a change
    type Delta;

    /// Compare `self` (the baseline) against `new`.
    ///
    /// Returns the delta if anything changed and updates `self` to hold
    /// exactly the values that were emitted.
    fn track(&mut self, new: &Self) -> Option<Self::Delta>;

    /// Apply a received delta
    fn merge(&mut self, delta: &Self::Delta);

    /// Delta with every field populated
    fn dump(&self) -> Self::Delta;
}

/// A value that can live in an index-addressed sub-collection
pub trait Element: Tracked + Default {
    /// Delta tagged with its list index
    type Entry;

    fn entry(index: usize, delta: Self::Delta) -> Self::Entry;

    /// Index carried by an entry, `None` if it is negative
    fn entry_index(entry: &Self::Entry) -> Option<usize>;

    fn apply(&mut self, entry: &Self::Entry);
}

impl Tracked for f64 {
    type Delta = f64;

    #[inline]
    fn track(&mut self, new: &f64) -> Option<f64> {
        if float_changed(*self, *new) {
            *self = *new;
            Some(*new)
        } else {
            None
        }
    }

    #[inline]
    fn merge(&mut self, delta: &f64) {
        *self = *delta;
    }

    #[inline]
    fn dump(&self) -> f64 {
        *self
    }
}

macro_rules! exact_tracked {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Tracked for $ty {
                type Delta = $ty;

                #[inline]
                fn track(&mut self, new: &$ty) -> Option<$ty> {
                    if *self != *new {
                        self.clone_from(new);
                        Some(new.clone())
                    } else {
                        None
                    }
                }

                #[inline]
                fn merge(&mut self, delta: &$ty) {
                    self.clone_from(delta);
                }

                #[inline]
                fn dump(&self) -> $ty {
                    self.clone()
                }
            }
        )*
    };
}

exact_tracked!(i32, bool, String);

// Unknown wire values fall back to the neutral seed.
macro_rules! enum_tracked {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Tracked for $ty {
                type Delta = i32;

                #[inline]
                fn track(&mut self, new: &$ty) -> Option<i32> {
                    if *self != *new {
                        *self = *new;
                        Some(*new as i32)
                    } else {
                        None
                    }
                }

                #[inline]
                fn merge(&mut self, delta: &i32) {
                    *self = <$ty>::try_from(*delta).unwrap_or_default();
                }

                #[inline]
                fn dump(&self) -> i32 {
                    *self as i32
                }
            }
        )*
    };
}

enum_tracked!(
    AxisType,
    CanonUnits,
    ExecState,
    InterpState,
    KinematicsType,
    MotionState,
    MotionType,
    OriginIndex,
    PositionFeedback,
    PositionOffset,
    TaskMode,
    TaskState,
    TimeUnits,
    TrajMode,
);

impl Tracked for Position {
    type Delta = proto::Position;

    fn track(&mut self, new: &Position) -> Option<proto::Position> {
        let delta = proto::Position {
            x: self.x.track(&new.x),
            y: self.y.track(&new.y),
            z: self.z.track(&new.z),
            a: self.a.track(&new.a),
            b: self.b.track(&new.b),
            c: self.c.track(&new.c),
            u: self.u.track(&new.u),
            v: self.v.track(&new.v),
            w: self.w.track(&new.w),
        };
        (delta != proto::Position::default()).then_some(delta)
    }

    fn merge(&mut self, delta: &proto::Position) {
        let slots = [
            (&mut self.x, delta.x),
            (&mut self.y, delta.y),
            (&mut self.z, delta.z),
            (&mut self.a, delta.a),
            (&mut self.b, delta.b),
            (&mut self.c, delta.c),
            (&mut self.u, delta.u),
            (&mut self.v, delta.v),
            (&mut self.w, delta.w),
        ];
        for (slot, value) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }

    fn dump(&self) -> proto::Position {
        proto::Position {
            x: Some(self.x),
            y: Some(self.y),
            z: Some(self.z),
            a: Some(self.a),
            b: Some(self.b),
            c: Some(self.c),
            u: Some(self.u),
            v: Some(self.v),
            w: Some(self.w),
        }
    }
}

macro_rules! scalar_element {
    ($($ty:ty => $entry:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                type Entry = $entry;

                fn entry(index: usize, delta: $ty) -> $entry {
                    $entry {
                        index: index as i32,
                        value: delta,
                    }
                }

                fn entry_index(entry: &$entry) -> Option<usize> {
                    usize::try_from(entry.index).ok()
                }

                fn apply(&mut self, entry: &$entry) {
                    self.merge(&entry.value);
                }
            }
        )*
    };
}

scalar_element!(
    f64 => AnalogValue,
    bool => DigitalValue,
    i32 => IntValue,
    String => TextValue,
);

/// Diff a sub-collection, growing the baseline to the new length
///
/// Returns one entry per index whose element changed.
pub fn track_list<T: Element>(base: &mut Vec<T>, new: &[T]) -> Vec<T::Entry> {
    let mut entries = Vec::new();
    for (index, item) in new.iter().enumerate() {
        if index == base.len() {
            base.push(T::default());
        }
        if let Some(delta) = base[index].track(item) {
            entries.push(T::entry(index, delta));
        }
    }
    entries
}

/// Apply received entries, growing with neutral seeds as needed
pub fn merge_list<T: Element>(base: &mut Vec<T>, entries: &[T::Entry]) {
    for entry in entries {
        let Some(index) = T::entry_index(entry).filter(|i| *i < MAX_LIST_LEN) else {
            log::debug!("Ignoring list entry with out-of-range index");
            continue;
        };
        if index >= base.len() {
            base.resize_with(index + 1, T::default);
        }
        base[index].apply(entry);
    }
}

/// Every element as a fully-populated entry
pub fn dump_list<T: Element>(base: &[T]) -> Vec<T::Entry> {
    base.iter()
        .enumerate()
        .map(|(index, item)| T::entry(index, item.dump()))
        .collect()
}
