//! Cubic Hermite lookup table for expensive static transfer functions.
//!
//! The table is sampled once on a uniform grid (at prepare time, never on
//! the audio thread) and evaluated with cubic Hermite interpolation using
//! centred-difference slopes. Inputs outside the sampled range clamp to the
//! end values.
//!
//! No built-in stage uses it: the models evaluate their curves directly so
//! their outputs stay exact. It is exported for hosts that trade accuracy
//! for speed on a memoryless curve:
//!
//! ```rust
//! use ember_core::CubicLookup;
//!
//! let table = CubicLookup::build(|x| x / (1.0 + x.abs()), -3.0, 3.0, 2049);
//! assert!((table.eval(1.0) - 0.5).abs() < 1e-4);
//! assert_eq!(table.eval(10.0), table.eval(3.0));
//! ```

use alloc::vec::Vec;

/// Uniform-grid cubic Hermite approximation of `f: f32 -> f32`.
#[derive(Debug, Clone, Default)]
pub struct CubicLookup {
    values: Vec<f32>,
    slopes: Vec<f32>,
    min: f32,
    max: f32,
    step: f32,
    inv_step: f32,
}

impl CubicLookup {
    /// Samples `f` at `points` evenly spaced inputs over `[min, max]`.
    ///
    /// `points` is raised to at least 2 and the range is widened if empty.
    pub fn build(f: impl Fn(f32) -> f32, min: f32, max: f32, points: usize) -> Self {
        let points = points.max(2);
        let max = if max > min { max } else { min + 1.0 };
        let step = (max - min) / (points - 1) as f32;

        let values: Vec<f32> = (0..points).map(|i| f(min + i as f32 * step)).collect();

        let last = points - 1;
        let slopes = (0..points)
            .map(|i| {
                if i == 0 {
                    (values[1] - values[0]) / step
                } else if i == last {
                    (values[last] - values[last - 1]) / step
                } else {
                    (values[i + 1] - values[i - 1]) / (2.0 * step)
                }
            })
            .collect();

        Self {
            values,
            slopes,
            min,
            max,
            step,
            inv_step: 1.0 / step,
        }
    }

    /// Interpolated value at `x`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let Some(&first) = self.values.first() else {
            return 0.0;
        };
        if x <= self.min {
            return first;
        }
        let last = self.values.len() - 1;
        if x >= self.max {
            return self.values[last];
        }

        let position = (x - self.min) * self.inv_step;
        let index = position as usize;
        if index >= last {
            return self.values[last];
        }
        let t = position - index as f32;

        let y0 = self.values[index];
        let y1 = self.values[index + 1];
        let d0 = self.slopes[index] * self.step;
        let d1 = self.slopes[index + 1] * self.step;

        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * y0 + h10 * d0 + h01 * y1 + h11 * d1
    }

    /// Lower bound of the sampled range.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the sampled range.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Number of table points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the table was never built.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
