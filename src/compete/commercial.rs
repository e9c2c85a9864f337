//! Discount-tier market shares for commercial microsegments.

use super::Competitor;
use crate::SENTINEL;
use crate::ensemble::{Series, Value, common_samples};
use crate::error::EngineError;
use crate::finance::metrics::Anpv;
use crate::measure::key::MicrosegmentKey;
use crate::measure::markets::ChoiceParams;

/// Annual (competed) fraction of `key` won by each competitor.
///
/// In each discount-rate tier the cheapest on-market measure (annualized
/// capital plus operating cost at the tier's rate) takes the tier's whole
/// population weight; exact ties split it. Ensembles are compared element by
/// element.
///
/// # Errors
///
/// Returns [`EngineError::MissingChoiceData`] when the key has no tier
/// weights for a year or a competitor has no commercial ANPV.
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

        let weights = tier_weights(key, competitors, y)?;
        let mut tiers: Vec<Option<&[Anpv]>> = Vec::with_capacity(n);
        for (c, on) in competitors.iter().zip(&on) {
            tiers.push(if *on { Some(anpv_tiers(key, c, y)?) } else { None });
        }

        let mut costs_by_tier = Vec::with_capacity(weights.len());
        for t in 0..weights.len() {
            costs_by_tier.push(tier_costs(key, competitors, &tiers, t)?);
        }
        let all: Vec<&Value> = costs_by_tier.iter().flatten().flatten().collect();
        let samples = common_samples(&all)?;
        let width = samples.unwrap_or(1);

        let mut won = vec![vec![0.0; width]; n];
        for (costs, weight) in costs_by_tier.iter().zip(weights) {
            award_tier(costs, *weight, width, &mut won);
        }
        for (s, w) in shares.iter_mut().zip(won) {
            s.push(Value::from_samples(samples, w));
        }
    }
    Ok(shares)
}

fn tier_weights<'c>(
    key: &MicrosegmentKey,
    competitors: &'c [Competitor<'_>],
    y: usize,
) -> Result<&'c [f64], EngineError> {
    competitors
        .iter()
        .find_map(|c| match &c.competition.choice {
            Some(ChoiceParams::Commercial { tier_weights }) => tier_weights.get(y),
            _ => None,
        })
        .map(Vec::as_slice)
        .ok_or_else(|| EngineError::MissingChoiceData {
            measure: competitors
                .first()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            key: key.clone(),
            what: "commercial tier weights",
        })
}

fn anpv_tiers<'c>(
    key: &MicrosegmentKey,
    c: &'c Competitor<'_>,
    y: usize,
) -> Result<&'c [Anpv], EngineError> {
    c.consumer()?
        .years
        .get(y)
        .and_then(|year| year.anpv_commercial.as_deref())
        .ok_or_else(|| EngineError::MissingChoiceData {
            measure: c.name().to_string(),
            key: key.clone(),
            what: "commercial ANPV",
        })
}

/// Total annualized cost of each on-market competitor in tier `t`.
fn tier_costs(
    key: &MicrosegmentKey,
    competitors: &[Competitor<'_>],
    tiers: &[Option<&[Anpv]>],
    t: usize,
) -> Result<Vec<Option<Value>>, EngineError> {
    tiers
        .iter()
        .zip(competitors)
        .map(|(tier, c)| match tier {
            None => Ok(None),
            Some(anpv) => {
                let missing = |what: &'static str| EngineError::MissingChoiceData {
                    measure: c.name().to_string(),
                    key: key.clone(),
                    what,
                };
                let a = anpv
                    .get(t)
                    .ok_or_else(|| missing("commercial ANPV for every tier"))?;
                let is_sentinel = |x: f64| x == SENTINEL;
                if a.stock.any(is_sentinel) || a.energy.any(is_sentinel) {
                    return Err(missing("commercial ANPV (no addressable units)"));
                }
                a.stock.try_add(&a.energy).map(Some)
            }
        })
        .collect()
}

/// Adds `weight` to the cheapest competitors, per ensemble element.
fn award_tier(costs: &[Option<Value>], weight: f64, width: usize, won: &mut [Vec<f64>]) {
    for e in 0..width {
        let min = costs
            .iter()
            .flatten()
            .map(|c| c.at(e))
            .fold(f64::INFINITY, f64::min);
        let winners: Vec<usize> = costs
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_ref().is_some_and(|c| c.at(e) == min))
            .map(|(i, _)| i)
            .collect();
        if winners.is_empty() {
            continue;
        }
        let portion = weight / winners.len() as f64;
        for i in winners {
            won[i][e] += portion;
        }
    }
}
