//! Scalar-or-ensemble values with broadcasting arithmetic.
//!
//! Market data and measure characteristics may carry a probabilistic
//! ensemble (one sample per draw) instead of a point estimate. All arithmetic
//! broadcasts a scalar against an ensemble; two ensembles must agree in
//! length or the operation fails.

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A yearly time series, indexed by offset from the first horizon year.
pub type Series = Vec<Value>;

/// A single cell of market or metric data.
///
/// Deserializes from either a JSON/TOML number or an array of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Point estimate.
    Scalar(f64),
    /// One value per ensemble sample.
    Ensemble(Vec<f64>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Ensemble(v)
    }
}

impl Value {
    /// Number of ensemble samples, or `None` for a scalar.
    pub fn samples(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => None,
            Value::Ensemble(v) => Some(v.len()),
        }
    }

    /// Element `i`, broadcasting a scalar to every index.
    ///
    /// Callers must have reconciled `i` against [`Value::samples`] first.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            Value::Scalar(x) => *x,
            Value::Ensemble(v) => v[i],
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(*x)),
            Value::Ensemble(v) => Value::Ensemble(v.iter().map(|x| f(*x)).collect()),
        }
    }

    /// Combines two values element-wise, broadcasting scalars.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShapeMismatch`] for ensembles of unequal length.
    pub fn zip_with(
        &self,
        other: &Value,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, EngineError> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Scalar(a), Value::Ensemble(b)) => {
                Ok(Value::Ensemble(b.iter().map(|y| f(*a, *y)).collect()))
            }
            (Value::Ensemble(a), Value::Scalar(b)) => {
                Ok(Value::Ensemble(a.iter().map(|x| f(*x, *b)).collect()))
            }
            (Value::Ensemble(a), Value::Ensemble(b)) => {
                if a.len() != b.len() {
                    return Err(EngineError::ShapeMismatch {
                        left: a.len(),
                        right: b.len(),
                    });
                }
                Ok(Value::Ensemble(
                    a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect(),
                ))
            }
        }
    }

    pub fn try_add(&self, other: &Value) -> Result<Value, EngineError> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Value) -> Result<Value, EngineError> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn try_mul(&self, other: &Value) -> Result<Value, EngineError> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise division yielding 0 wherever the divisor is 0.
    pub fn div_or_zero(&self, other: &Value) -> Result<Value, EngineError> {
        self.zip_with(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    pub fn scale(&self, k: f64) -> Value {
        self.map(|x| x * k)
    }

    /// Arithmetic mean of the samples (the value itself for a scalar).
    pub fn mean(&self) -> f64 {
        match self {
            Value::Scalar(x) => *x,
            Value::Ensemble(v) if v.is_empty() => 0.0,
            Value::Ensemble(v) => v.iter().sum::<f64>() / v.len() as f64,
        }
    }

    /// Mean over the samples that are not [`crate::SENTINEL`], or the
    /// sentinel itself when none remain.
    pub fn applicable_mean(&self) -> f64 {
        let kept: Vec<f64> = match self {
            Value::Scalar(x) => vec![*x],
            Value::Ensemble(v) => v.clone(),
        }
        .into_iter()
        .filter(|x| *x != crate::SENTINEL)
        .collect();
        if kept.is_empty() {
            return crate::SENTINEL;
        }
        kept.iter().sum::<f64>() / kept.len() as f64
    }

    pub fn max(&self) -> f64 {
        match self {
            Value::Scalar(x) => *x,
            Value::Ensemble(v) => v.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// True when any sample satisfies `f`.
    pub fn any(&self, f: impl Fn(f64) -> bool) -> bool {
        match self {
            Value::Scalar(x) => f(*x),
            Value::Ensemble(v) => v.iter().any(|x| f(*x)),
        }
    }

    /// True when every sample is exactly zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Scalar(x) => *x == 0.0,
            Value::Ensemble(v) => v.iter().all(|x| *x == 0.0),
        }
    }

    /// Builds a value from per-sample results, collapsing to a scalar when
    /// no ensemble was involved.
    pub fn from_samples(samples: Option<usize>, values: Vec<f64>) -> Value {
        match samples {
            None => Value::Scalar(values.first().copied().unwrap_or(0.0)),
            Some(_) => Value::Ensemble(values),
        }
    }
}

/// Reconciles the ensemble length shared by a set of values.
///
/// # Errors
///
/// Returns [`EngineError::ShapeMismatch`] when two ensembles disagree.
pub fn common_samples(values: &[&Value]) -> Result<Option<usize>, EngineError> {
    let mut found: Option<usize> = None;
    for v in values {
        if let Some(n) = v.samples() {
            match found {
                None => found = Some(n),
                Some(m) if m != n => {
                    return Err(EngineError::ShapeMismatch { left: m, right: n });
                }
                Some(_) => {}
            }
        }
    }
    Ok(found)
}

/// Element-wise combination of two series of equal length.
pub fn zip_series(
    a: &Series,
    b: &Series,
    f: impl Fn(&Value, &Value) -> Result<Value, EngineError>,
) -> Result<Series, EngineError> {
    a.iter().zip(b).map(|(x, y)| f(x, y)).collect()
}

/// A series of `years` zero scalars.
pub fn zero_series(years: usize) -> Series {
    vec![Value::default(); years]
}

/// Gaussian noise via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Draws `samples` normal values around `mean`, floored at `floor`.
pub fn sample_normal(
    rng: &mut StdRng,
    mean: f64,
    std_dev: f64,
    samples: usize,
    floor: f64,
) -> Value {
    Value::Ensemble(
        (0..samples)
            .map(|_| (mean + gaussian_noise(rng, std_dev)).max(floor))
            .collect(),
    )
}
