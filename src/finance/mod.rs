//! Time-value-of-money primitives over annual cash flows.
//!
//! Every flow is indexed by year, position 0 being the investment year.

pub mod metrics;

const NEWTON_MAX_ITERATIONS: u32 = 100;
const NEWTON_EPSILON: f64 = 1e-9;
const IRR_GUESS: f64 = 0.10;
const BISECTION_MAX_ITERATIONS: u32 = 200;
/// Rate bracket scanned by the bisection fallback.
const RATE_FLOOR: f64 = -0.99;
const RATE_CEILING: f64 = 100.0;

/// Net present value of `flows` discounted at `rate`.
pub fn npv(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

fn npv_derivative(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / (1.0 + rate).powi(t as i32 + 1))
        .sum()
}

/// Level annual payment over `years` with the same present value as `npv`.
///
/// Falls back to a straight average when `rate` is zero.
pub fn annualize(npv: f64, rate: f64, years: u32) -> f64 {
    let n = years.max(1);
    if rate == 0.0 {
        return npv / f64::from(n);
    }
    npv * rate / (1.0 - (1.0 + rate).powi(-(n as i32)))
}

/// Internal rate of return of `flows`, or `None` when no finite root is
/// found.
///
/// Newton-Raphson from 10%; if that diverges, bisection over the first sign
/// change found in `[-0.99, 100]`.
pub fn irr(flows: &[f64]) -> Option<f64> {
    if flows.len() < 2 || flows.iter().any(|f| !f.is_finite()) {
        return None;
    }
    newton_irr(flows).or_else(|| bisection_irr(flows))
}

fn newton_irr(flows: &[f64]) -> Option<f64> {
    let mut rate = IRR_GUESS;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let value = npv(rate, flows);
        if !value.is_finite() {
            return None;
        }
        if value.abs() < NEWTON_EPSILON {
            return Some(rate);
        }
        let slope = npv_derivative(rate, flows);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        rate -= value / slope;
        if !(RATE_FLOOR..=RATE_CEILING).contains(&rate) {
            return None;
        }
    }
    None
}

fn bisection_irr(flows: &[f64]) -> Option<f64> {
    const STEPS: usize = 400;
    let step = (RATE_CEILING - RATE_FLOOR) / STEPS as f64;
    let mut lo = RATE_FLOOR;
    let mut f_lo = npv(lo, flows);
    let mut bracket = None;
    for i in 1..=STEPS {
        let hi = RATE_FLOOR + step * i as f64;
        let f_hi = npv(hi, flows);
        if f_lo.is_finite() && f_hi.is_finite() && f_lo.signum() != f_hi.signum() {
            bracket = Some((lo, hi, f_lo));
            break;
        }
        lo = hi;
        f_lo = f_hi;
    }

    let (mut lo, mut hi, mut f_lo) = bracket?;
    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(mid, flows);
        if f_mid.abs() < NEWTON_EPSILON || (hi - lo) < 1e-12 {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Years until the cumulative flows after position 0 recover the
/// investment at position 0, or `None` if they never do.
///
/// A non-negative investment pays back immediately. Recovery within a year
/// is interpolated linearly.
pub fn payback(flows: &[f64]) -> Option<f64> {
    let Some((&investment, rest)) = flows.split_first() else {
        return Some(0.0);
    };
    if investment >= 0.0 {
        return Some(0.0);
    }

    let mut remaining = -investment;
    for (a, &flow) in rest.iter().enumerate() {
        if flow >= remaining {
            return Some(a as f64 + remaining / flow);
        }
        remaining -= flow;
    }
    None
}
