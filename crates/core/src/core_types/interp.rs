//! Bounded interpolation tables
//!
//! Property tables never extrapolate: queries outside the sampled domain are
//! clamped to the nearest edge before lookup. [`Interp1`] is a piecewise-linear
//! curve used for kr, capillary, equilibrium, rate and inhibitor curves.
//! [`Interp2`] is a bilinear table on a regular grid used for density and
//! viscosity as functions of pressure and temperature.

use crate::error::SeepageError;
use serde::{Deserialize, Serialize};

/// Piecewise-linear curve `y(x)` with clamped ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveSamples")]
pub struct Interp1 {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Unchecked form of [`Interp1`] read from storage
#[derive(Deserialize)]
struct CurveSamples {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<CurveSamples> for Interp1 {
    type Error = SeepageError;

    fn try_from(samples: CurveSamples) -> Result<Self, Self::Error> {
        Self::new(samples.x, samples.y)
    }
}

impl Interp1 {
    /// Create a curve from sample points
    ///
    /// # Errors
    /// Returns `InvalidTable` when the vectors are empty, differ in length,
    /// contain non-finite values or `x` is not strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SeepageError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(SeepageError::InvalidTable(format!(
                "curve needs matching non-empty samples, got {} x and {} y",
                x.len(),
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SeepageError::InvalidTable(
                "curve samples must be finite".to_string(),
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SeepageError::InvalidTable(
                "curve x samples must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { x, y })
    }

    /// A curve returning `value` everywhere
    pub fn constant(value: f64) -> Self {
        Self {
            x: vec![0.0],
            y: vec![value],
        }
    }

    /// Straight line through `(x0, y0)` and `(x1, y1)`, clamped outside
    ///
    /// # Errors
    /// Returns `InvalidTable` when `x1 <= x0`.
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, SeepageError> {
        Self::new(vec![x0, x1], vec![y0, y1])
    }

    /// Evaluate the curve at `x`
    ///
    /// A NaN query yields NaN.
    pub fn get(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x.is_nan() {
            return f64::NAN;
        }
        if n == 1 || x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }
        // First sample strictly greater than x; guaranteed in 1..n here.
        let hi = self.x.partition_point(|&xi| xi <= x);
        let lo = hi - 1;
        let t = (x - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }

    /// Sampled domain `(x_min, x_max)`
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Smallest sampled value
    pub fn min_value(&self) -> f64 {
        self.y.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// One axis of a regular grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// First sample position
    pub start: f64,
    /// Spacing between samples (ignored when `count == 1`)
    pub step: f64,
    /// Number of samples
    pub count: usize,
}

impl Axis {
    /// Axis with `count` samples spread evenly over `[min, max]`
    pub fn span(min: f64, max: f64, count: usize) -> Self {
        let step = if count > 1 {
            (max - min) / (count - 1) as f64
        } else {
            0.0
        };
        Self {
            start: min,
            step,
            count,
        }
    }

    fn is_valid(&self) -> bool {
        self.count >= 1
            && self.start.is_finite()
            && (self.count == 1 || (self.step.is_finite() && self.step > 0.0))
    }

    /// Sample position `i`
    pub fn at(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    /// Lower sample index and interpolation weight of the clamped position
    fn locate(&self, x: f64) -> (usize, f64) {
        if self.count == 1 {
            return (0, 0.0);
        }
        let last = (self.count - 1) as f64;
        let f = ((x - self.start) / self.step).clamp(0.0, last);
        let i = (f.floor() as usize).min(self.count - 2);
        (i, f - i as f64)
    }
}

/// Bilinear table `z(x, y)` on a regular grid with clamped edges
///
/// Data is stored x-major: `data[ix * y.count + iy]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSamples")]
pub struct Interp2 {
    x: Axis,
    y: Axis,
    data: Vec<f64>,
}

/// Unchecked form of [`Interp2`] read from storage
#[derive(Deserialize)]
struct GridSamples {
    x: Axis,
    y: Axis,
    data: Vec<f64>,
}

impl TryFrom<GridSamples> for Interp2 {
    type Error = SeepageError;

    fn try_from(samples: GridSamples) -> Result<Self, Self::Error> {
        Self::new(samples.x, samples.y, samples.data)
    }
}

impl Interp2 {
    /// Create a table from axes and x-major data
    ///
    /// # Errors
    /// Returns `InvalidTable` when an axis is degenerate, the data length does
    /// not match, or any value is non-finite.
    pub fn new(x: Axis, y: Axis, data: Vec<f64>) -> Result<Self, SeepageError> {
        if !x.is_valid() || !y.is_valid() {
            return Err(SeepageError::InvalidTable(
                "table axes need at least one sample and a positive step".to_string(),
            ));
        }
        if data.len() != x.count * y.count {
            return Err(SeepageError::InvalidTable(format!(
                "table expects {} values, got {}",
                x.count * y.count,
                data.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(SeepageError::InvalidTable(
                "table values must be finite".to_string(),
            ));
        }
        Ok(Self { x, y, data })
    }

    /// A table returning `value` everywhere
    pub fn constant(value: f64) -> Self {
        Self {
            x: Axis::span(0.0, 0.0, 1),
            y: Axis::span(0.0, 0.0, 1),
            data: vec![value],
        }
    }

    /// Sample `f(x, y)` on the given axes
    ///
    /// # Errors
    /// Returns `InvalidTable` under the same conditions as [`Interp2::new`].
    pub fn from_fn(x: Axis, y: Axis, f: impl Fn(f64, f64) -> f64) -> Result<Self, SeepageError> {
        let mut data = Vec::with_capacity(x.count * y.count);
        for ix in 0..x.count {
            for iy in 0..y.count {
                data.push(f(x.at(ix), y.at(iy)));
            }
        }
        Self::new(x, y, data)
    }

    /// Evaluate at `(x, y)`, clamping both coordinates into the table
    pub fn get(&self, x: f64, y: f64) -> f64 {
        let (ix, tx) = self.x.locate(x);
        let (iy, ty) = self.y.locate(y);
        let ny = self.y.count;
        let ix1 = (ix + 1).min(self.x.count - 1);
        let iy1 = (iy + 1).min(ny - 1);

        let z00 = self.data[ix * ny + iy];
        let z01 = self.data[ix * ny + iy1];
        let z10 = self.data[ix1 * ny + iy];
        let z11 = self.data[ix1 * ny + iy1];

        let z0 = z00 + ty * (z01 - z00);
        let z1 = z10 + ty * (z11 - z10);
        z0 + tx * (z1 - z0)
    }

    /// Smallest tabulated value
    pub fn min_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interp1_linear_and_clamped() {
        let curve = Interp1::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(curve.get(0.5), 1.0);
        assert_relative_eq!(curve.get(2.0), 1.0);
        assert_relative_eq!(curve.get(1.0), 2.0);
        // No extrapolation
        assert_relative_eq!(curve.get(-5.0), 0.0);
        assert_relative_eq!(curve.get(10.0), 0.0);
        assert_eq!(curve.domain(), (0.0, 3.0));
    }

    #[test]
    fn test_interp1_rejects_unsorted() {
        assert!(Interp1::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Interp1::new(vec![], vec![]).is_err());
        assert!(Interp1::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Interp1::new(vec![0.0, f64::NAN], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_interp1_nan_query() {
        let curve = Interp1::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 0.0]).unwrap();
        assert!(curve.get(f64::NAN).is_nan());
        assert!(Interp1::constant(4.0).get(f64::NAN).is_nan());
    }

    #[test]
    fn test_deserialize_validates_tables() {
        let curve: Interp1 = serde_json::from_str(r#"{"x": [0.0, 1.0], "y": [2.0, 3.0]}"#).unwrap();
        assert_relative_eq!(curve.get(0.5), 2.5);

        assert!(serde_json::from_str::<Interp1>(r#"{"x": [], "y": []}"#).is_err());
        assert!(serde_json::from_str::<Interp1>(r#"{"x": [1.0, 0.0], "y": [2.0, 3.0]}"#).is_err());
        assert!(serde_json::from_str::<Interp1>(r#"{"x": [0.0, 1.0], "y": [2.0]}"#).is_err());

        let axis = r#"{"start": 0.0, "step": 1.0, "count": 2}"#;
        let short = format!(r#"{{"x": {axis}, "y": {axis}, "data": [1.0, 2.0]}}"#);
        assert!(serde_json::from_str::<Interp2>(&short).is_err());
        let table = serde_json::to_string(&Interp2::constant(7.0)).unwrap();
        assert_eq!(serde_json::from_str::<Interp2>(&table).unwrap(), Interp2::constant(7.0));
    }

    #[test]
    fn test_interp2_bilinear() {
        // z = x + 10 y is reproduced exactly by bilinear interpolation
        let table =
            Interp2::from_fn(Axis::span(0.0, 2.0, 3), Axis::span(0.0, 1.0, 2), |x, y| {
                x + 10.0 * y
            })
            .unwrap();
        assert_relative_eq!(table.get(0.5, 0.5), 5.5);
        assert_relative_eq!(table.get(1.75, 0.25), 4.25);
    }

    #[test]
    fn test_interp2_clamps_domain() {
        let table =
            Interp2::from_fn(Axis::span(0.0, 1.0, 2), Axis::span(0.0, 1.0, 2), |x, y| x * y)
                .unwrap();
        assert_relative_eq!(table.get(-3.0, 0.5), 0.0);
        assert_relative_eq!(table.get(5.0, 5.0), 1.0);
        assert_relative_eq!(table.get(5.0, 0.5), 0.5);
    }

    #[test]
    fn test_interp2_constant() {
        let table = Interp2::constant(1000.0);
        assert_eq!(table.get(1.0e7, 350.0), 1000.0);
        assert_eq!(table.min_value(), 1000.0);
    }

    #[test]
    fn test_interp2_rejects_bad_shape() {
        let axis = Axis::span(0.0, 1.0, 2);
        assert!(Interp2::new(axis, axis, vec![1.0; 3]).is_err());
        assert!(Interp2::new(Axis::span(1.0, 1.0, 2), axis, vec![1.0; 4]).is_err());
    }
}
