//! Seeded noise for simulated feedback

use crate::model::Position;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Seed 0 draws from entropy, any other value is reproducible
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    #[inline]
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Perturb the first `axes` coordinates
    pub fn jitter(&mut self, position: Position, axes: usize, stddev: f64) -> Position {
        let mut values = position.axes();
        for value in values.iter_mut().take(axes) {
            *value += self.gaussian(stddev);
        }
        Position::from_axes(values)
    }
}
