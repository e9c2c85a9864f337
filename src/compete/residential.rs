//! Logit market shares for residential microsegments.

use super::Competitor;
use crate::SENTINEL;
use crate::ensemble::{Series, Value, common_samples};
use crate::error::EngineError;
use crate::measure::key::MicrosegmentKey;
use crate::measure::markets::ChoiceParams;

/// Annual (competed) fraction of `key` won by each competitor.
///
/// On-market measures score `exp(b1 * annualized capital cost + b2 *
/// annualized operating cost)` and split the market in proportion to score.
/// Exponents are shifted by their per-year maximum before exponentiating,
/// so the shares always sum to 1. Off-market measures get nothing, unless
/// nobody is on the market, in which case everyone gets an equal share.
///
/// # Errors
///
/// Returns [`EngineError::MissingChoiceData`] when a competitor lacks
/// coefficients or a usable residential ANPV for a year, and
/// [`EngineError::MissingConsumerMetrics`] when its consumer metrics have
/// not been computed.
pub fn competed_shares(
    key: &MicrosegmentKey,
    competitors: &[Competitor<'_>],
    years: usize,
) -> Result<Vec<Series>, EngineError> {
    let n = competitors.len();
    let mut shares = vec![Vec::with_capacity(years); n];

    for y in 0..years {
        let on: Vec<bool> = competitors.iter().map(|c| c.on_market(y)).collect();
        if !on.iter().any(|o| *o) {
            for s in shares.iter_mut() {
                s.push(Value::Scalar(1.0 / n as f64));
            }
            continue;
        }

        let mut exponents = Vec::with_capacity(n);
        for (c, on) in competitors.iter().zip(&on) {
            exponents.push(if *on { Some(exponent(key, c, y)?) } else { None });
        }
        let live: Vec<&Value> = exponents.iter().flatten().collect();
        let samples = common_samples(&live)?;
        let width = samples.unwrap_or(1);

        let peak: Vec<f64> = (0..width)
            .map(|e| live.iter().map(|v| v.at(e)).fold(f64::NEG_INFINITY, f64::max))
            .collect();
        let scores: Vec<Vec<f64>> = exponents
            .iter()
            .map(|x| {
                (0..width)
                    .map(|e| x.as_ref().map_or(0.0, |v| (v.at(e) - peak[e]).exp()))
                    .collect()
            })
            .collect();
        // the peak scores exp(0), so every total is at least 1
        let totals: Vec<f64> = (0..width)
            .map(|e| scores.iter().map(|s| s[e]).sum())
            .collect();
        for (s, score) in shares.iter_mut().zip(scores) {
            let split = score.iter().zip(&totals).map(|(x, t)| x / t).collect();
            s.push(Value::from_samples(samples, split));
        }
    }
    Ok(shares)
}

/// The logit exponent `b1 * capital + b2 * operating` of one competitor.
fn exponent(key: &MicrosegmentKey, c: &Competitor<'_>, y: usize) -> Result<Value, EngineError> {
    let missing = |what: &'static str| EngineError::MissingChoiceData {
        measure: c.name().to_string(),
        key: key.clone(),
        what,
    };
    let (b1, b2) = match &c.competition.choice {
        Some(ChoiceParams::Residential { b1, b2 }) => (
            b1.get(y).copied().ok_or_else(|| missing("b1 coefficient"))?,
            b2.get(y).copied().ok_or_else(|| missing("b2 coefficient"))?,
        ),
        _ => return Err(missing("residential choice coefficients")),
    };
    let anpv = c
        .consumer()?
        .years
        .get(y)
        .and_then(|year| year.anpv_residential.as_ref())
        .ok_or_else(|| missing("residential ANPV"))?;
    let is_sentinel = |x: f64| x == SENTINEL;
    if anpv.stock.any(is_sentinel) || anpv.energy.any(is_sentinel) {
        return Err(missing("residential ANPV (no addressable units)"));
    }
    let x = anpv
        .stock
        .zip_with(&anpv.energy, |stock, energy| b1 * stock + b2 * energy)?;
    if x.any(|v| !v.is_finite()) {
        return Err(missing("finite logit exponent"));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{competitor_fixture, residential_choice};
    use super::*;

    #[test]
    fn shares_follow_scores() {
        // exp(1) vs exp(3)
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 2), (-1.0, 0.0), [true, true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 2), (-3.0, 0.0), [true, true]);
        let comps = [a.competitor(), b.competitor()];
        let shares = competed_shares(&a.key, &comps, 2);
        assert!(shares.is_ok());
        if let Ok(shares) = shares {
            let e1 = 1f64.exp();
            let e3 = 3f64.exp();
            assert!((shares[0][0].at(0) - e1 / (e1 + e3)).abs() < 1e-12);
            assert!((shares[1][1].at(0) - e3 / (e1 + e3)).abs() < 1e-12);
        }
    }

    #[test]
    fn equal_scores_split_evenly() {
        let a = competitor_fixture("a", residential_choice(-0.003, -0.012, 1), (100.0, 50.0), [true, true]);
        let b = competitor_fixture("b", residential_choice(-0.003, -0.012, 1), (100.0, 50.0), [true, true]);
        let comps = [a.competitor(), b.competitor()];
        let shares = competed_shares(&a.key, &comps, 1).ok();
        assert_eq!(shares.map(|s| (s[0][0].at(0), s[1][0].at(0))), Some((0.5, 0.5)));
    }

    #[test]
    fn off_market_measure_gets_nothing() {
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 2), (1.0, 0.0), [false, true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 2), (3.0, 0.0), [true, true]);
        let comps = [a.competitor(), b.competitor()];
        let shares = competed_shares(&a.key, &comps, 2).ok();
        assert_eq!(shares.as_ref().map(|s| s[0][0].at(0)), Some(0.0));
        assert_eq!(shares.as_ref().map(|s| s[1][0].at(0)), Some(1.0));
    }

    #[test]
    fn nobody_on_market_splits_evenly() {
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 2), (1.0, 0.0), [false, false]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 2), (3.0, 0.0), [false, false]);
        let comps = [a.competitor(), b.competitor()];
        let shares = competed_shares(&a.key, &comps, 2).ok();
        assert_eq!(shares.map(|s| s[1][1].at(0)), Some(0.5));
    }

    #[test]
    fn extreme_exponents_still_partition() {
        // exp(-800) and exp(-900) both underflow when taken directly
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 1), (800.0, 0.0), [true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 1), (900.0, 0.0), [true]);
        let comps = [a.competitor(), b.competitor()];
        let shares = competed_shares(&a.key, &comps, 1).ok();
        assert!(shares.as_ref().is_some_and(|s| (s[0][0].at(0) - 1.0).abs() < 1e-12));
        assert!(shares.is_some_and(|s| s[1][0].at(0) >= 0.0 && s[1][0].at(0) < 1e-40));

        let c = competitor_fixture("c", residential_choice(1.0, 0.0, 1), (800.0, 0.0), [true]);
        let d = competitor_fixture("d", residential_choice(1.0, 0.0, 1), (800.0, 0.0), [true]);
        let comps = [c.competitor(), d.competitor()];
        let shares = competed_shares(&c.key, &comps, 1).ok();
        assert_eq!(shares.map(|s| (s[0][0].at(0), s[1][0].at(0))), Some((0.5, 0.5)));
    }

    #[test]
    fn sentinel_anpv_is_not_a_cost() {
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 1), (SENTINEL, 0.0), [true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 1), (3.0, 0.0), [true]);
        let comps = [a.competitor(), b.competitor()];
        assert!(matches!(
            competed_shares(&a.key, &comps, 1),
            Err(EngineError::MissingChoiceData { .. })
        ));
    }

    #[test]
    fn missing_coefficients_are_fatal() {
        let a = competitor_fixture("a", None, (1.0, 0.0), [true, true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 2), (3.0, 0.0), [true, true]);
        let comps = [a.competitor(), b.competitor()];
        assert!(matches!(
            competed_shares(&a.key, &comps, 2),
            Err(EngineError::MissingChoiceData { .. })
        ));
    }

    #[test]
    fn short_coefficient_series_is_fatal() {
        let a = competitor_fixture("a", residential_choice(-1.0, 0.0, 1), (1.0, 0.0), [true, true]);
        let b = competitor_fixture("b", residential_choice(-1.0, 0.0, 1), (3.0, 0.0), [true, true]);
        let comps = [a.competitor(), b.competitor()];
        assert!(competed_shares(&a.key, &comps, 2).is_err());
    }
}
