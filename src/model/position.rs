//! Nine-axis position with tolerant equality

/// Two coordinates closer than this are considered equal.
pub const POSITION_EPSILON: f64 = 1e-4;

/// Whether two floating-point readings differ by more than the tolerance
///
/// NaN differs from every number but not from another NaN, so a stuck NaN
/// reading is reported once rather than every cycle.
#[inline]
pub fn float_changed(old: f64, new: f64) -> bool {
    if old.is_nan() || new.is_nan() {
        return old.is_nan() != new.is_nan();
    }
    (old - new).abs() > POSITION_EPSILON
}

/// Cartesian plus rotary and auxiliary axes (x, y, z, a, b, c, u, v, w)
///
/// `==` compares every axis within [`POSITION_EPSILON`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Axis values in x..w order
    pub fn axes(&self) -> [f64; 9] {
        [
            self.x, self.y, self.z, self.a, self.b, self.c, self.u, self.v, self.w,
        ]
    }

    pub fn from_axes(values: [f64; 9]) -> Self {
        let [x, y, z, a, b, c, u, v, w] = values;
        Self {
            x,
            y,
            z,
            a,
            b,
            c,
            u,
            v,
            w,
        }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.axes()
            .iter()
            .zip(other.axes().iter())
            .all(|(a, b)| !float_changed(*a, *b))
    }
}
