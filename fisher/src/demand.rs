//! Closed-form Marshallian demand and indirect utility.
//!
//! These formulas are the verifier's independent ground truth: they never
//! touch the convex program, only prices, budgets and valuations.

use crate::utility::{normalized_weights, UtilityFamily};
use crate::MarketError;

/// The utility-maximizing bundle a buyer purchases at the given prices
/// with the given budget.
pub fn marshallian_demand(
    family: UtilityFamily,
    valuation: &[f64],
    prices: &[f64],
    budget: f64,
) -> Result<Vec<f64>, MarketError> {
    family.validate()?;
    check_lengths(valuation, prices)?;
    match family {
        UtilityFamily::Linear => Ok(linear_demand(valuation, prices, budget)),
        UtilityFamily::Quasilinear => {
            let net = net_valuation(valuation, prices);
            Ok(linear_demand(&net, prices, budget))
        }
        UtilityFamily::CobbDouglas => cobb_douglas_demand(valuation, prices, budget),
        UtilityFamily::Leontief => {
            let denom = leontief_denominator(valuation, prices)?;
            Ok(valuation
                .iter()
                .map(|v| if *v > 0.0 { v * budget / denom } else { 0.0 })
                .collect())
        }
        UtilityFamily::Ces { rho } => ces_demand(valuation, prices, budget, rho),
    }
}

/// The buyer's maximum attainable utility at the given prices and budget.
pub fn indirect_utility(
    family: UtilityFamily,
    valuation: &[f64],
    prices: &[f64],
    budget: f64,
) -> Result<f64, MarketError> {
    family.validate()?;
    check_lengths(valuation, prices)?;
    match family {
        UtilityFamily::Linear => Ok(budget * best_ratio(valuation, prices).max(0.0)),
        UtilityFamily::Quasilinear => {
            let net = net_valuation(valuation, prices);
            Ok(budget * best_ratio(&net, prices).max(0.0))
        }
        UtilityFamily::CobbDouglas => {
            let weights = normalized_weights(valuation);
            let mut product = 1.0;
            for (w, p) in weights.iter().zip(prices) {
                if *w > 0.0 {
                    if *p == 0.0 {
                        return Err(MarketError::DegeneratePrice);
                    }
                    product *= (budget * w / p).powf(*w);
                }
            }
            if weights.iter().all(|w| *w == 0.0) {
                return Ok(0.0);
            }
            Ok(product)
        }
        UtilityFamily::Leontief => {
            if valuation.iter().all(|v| *v <= 0.0) {
                return Ok(0.0);
            }
            let denom = leontief_denominator(valuation, prices)?;
            Ok(budget / denom)
        }
        UtilityFamily::Ces { rho } => {
            let bundle = ces_demand(valuation, prices, budget, rho)?;
            Ok(family.bundle_utility(valuation, &bundle, prices))
        }
    }
}

fn check_lengths(valuation: &[f64], prices: &[f64]) -> Result<(), MarketError> {
    if valuation.len() != prices.len() {
        return Err(MarketError::DimensionMismatch {
            context: "valuation vs prices",
            expected: prices.len(),
            found: valuation.len(),
        });
    }
    Ok(())
}

fn net_valuation(valuation: &[f64], prices: &[f64]) -> Vec<f64> {
    valuation.iter().zip(prices).map(|(v, p)| v - p).collect()
}

/// Value per unit of money for one good. A free good is infinitely
/// desirable when it carries positive value and worthless otherwise.
fn value_per_price(v: f64, p: f64) -> f64 {
    if p > 0.0 {
        v / p
    } else if v > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn best_ratio(valuation: &[f64], prices: &[f64]) -> f64 {
    valuation
        .iter()
        .zip(prices)
        .map(|(v, p)| value_per_price(*v, *p))
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Spend the whole budget on the best value-per-price good. Ties go to the
/// lowest-index maximizer; any split among tied goods reaches the same
/// utility, so the verification outcome does not depend on the choice.
/// With no good worth buying (all ratios at or below zero) the buyer
/// keeps its money and the bundle is empty.
fn linear_demand(valuation: &[f64], prices: &[f64], budget: f64) -> Vec<f64> {
    let mut bundle = vec![0.0; valuation.len()];
    let mut best: Option<(usize, f64)> = None;
    for (j, (v, p)) in valuation.iter().zip(prices).enumerate() {
        let ratio = value_per_price(*v, *p);
        if best.map_or(true, |(_, r)| ratio > r) {
            best = Some((j, ratio));
        }
    }
    if let Some((j, ratio)) = best {
        if ratio > 0.0 {
            bundle[j] = if prices[j] > 0.0 {
                budget / prices[j]
            } else {
                f64::INFINITY
            };
        }
    }
    bundle
}

fn cobb_douglas_demand(
    valuation: &[f64],
    prices: &[f64],
    budget: f64,
) -> Result<Vec<f64>, MarketError> {
    let weights = normalized_weights(valuation);
    weights
        .iter()
        .zip(prices)
        .map(|(w, p)| {
            if *w == 0.0 {
                Ok(0.0)
            } else if *p == 0.0 {
                Err(MarketError::DegeneratePrice)
            } else {
                Ok(budget * w / p)
            }
        })
        .collect()
}

/// Cost of the buyer's requirement bundle, sum_k p_k v_k. Zero cost with a
/// nonzero requirement means the buyer could scale up without bound.
fn leontief_denominator(valuation: &[f64], prices: &[f64]) -> Result<f64, MarketError> {
    let denom: f64 = valuation.iter().zip(prices).map(|(v, p)| v * p).sum();
    if denom <= 0.0 && valuation.iter().any(|v| *v > 0.0) {
        return Err(MarketError::DegeneratePrice);
    }
    Ok(denom)
}

/// Standard CES Marshallian demand,
/// x_j = b v_j^s p_j^(-s) / sum_k v_k^s p_k^(1-s) with s = 1/(1-rho).
/// A free good with positive weight admits unbounded consumption, which the
/// formula cannot represent.
fn ces_demand(
    valuation: &[f64],
    prices: &[f64],
    budget: f64,
    rho: f64,
) -> Result<Vec<f64>, MarketError> {
    if valuation.iter().all(|v| *v <= 0.0) {
        return Ok(vec![0.0; valuation.len()]);
    }
    for (v, p) in valuation.iter().zip(prices) {
        if *v > 0.0 && *p == 0.0 {
            return Err(MarketError::DegeneratePrice);
        }
    }
    let s = 1.0 / (1.0 - rho);
    let denom: f64 = valuation
        .iter()
        .zip(prices)
        .filter(|(v, _)| **v > 0.0)
        .map(|(v, p)| v.powf(s) * p.powf(1.0 - s))
        .sum();
    if denom <= 0.0 {
        return Err(MarketError::DegeneratePrice);
    }
    Ok(valuation
        .iter()
        .zip(prices)
        .map(|(v, p)| {
            if *v > 0.0 {
                budget * v.powf(s) * p.powf(-s) / denom
            } else {
                0.0
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn linear_demand_spends_everything_on_best_ratio() {
        // ratios 2, 3, 1 -> all money on good 1
        let bundle =
            marshallian_demand(UtilityFamily::Linear, &[4.0, 6.0, 1.0], &[2.0, 2.0, 1.0], 3.0)
                .unwrap();
        assert_eq!(bundle, vec![0.0, 1.5, 0.0]);
        let util =
            indirect_utility(UtilityFamily::Linear, &[4.0, 6.0, 1.0], &[2.0, 2.0, 1.0], 3.0)
                .unwrap();
        assert_relative_eq!(util, 9.0);
    }

    #[test]
    fn linear_demand_breaks_ties_toward_lower_index() {
        // both goods offer ratio 2; the split does not change the utility
        let bundle =
            marshallian_demand(UtilityFamily::Linear, &[2.0, 4.0], &[1.0, 2.0], 1.0).unwrap();
        assert_eq!(bundle, vec![1.0, 0.0]);
        let util = indirect_utility(UtilityFamily::Linear, &[2.0, 4.0], &[1.0, 2.0], 1.0).unwrap();
        assert_relative_eq!(util, 2.0);
    }

    #[test]
    fn linear_free_good_is_infinitely_desirable_only_when_valued() {
        let util =
            indirect_utility(UtilityFamily::Linear, &[1.0, 1.0], &[0.0, 1.0], 1.0).unwrap();
        assert!(util.is_infinite());

        // worthless free good is ignored
        let util =
            indirect_utility(UtilityFamily::Linear, &[0.0, 1.0], &[0.0, 1.0], 1.0).unwrap();
        assert_relative_eq!(util, 1.0);
    }

    #[test]
    fn linear_all_zero_valuations_buy_nothing() {
        let bundle =
            marshallian_demand(UtilityFamily::Linear, &[0.0, 0.0], &[1.0, 1.0], 1.0).unwrap();
        assert_eq!(bundle, vec![0.0, 0.0]);
    }

    #[test]
    fn quasilinear_keeps_money_when_no_good_nets_positive() {
        // every price exceeds the valuation
        let bundle =
            marshallian_demand(UtilityFamily::Quasilinear, &[1.0, 2.0], &[3.0, 3.0], 5.0)
                .unwrap();
        assert_eq!(bundle, vec![0.0, 0.0]);
        let util =
            indirect_utility(UtilityFamily::Quasilinear, &[1.0, 2.0], &[3.0, 3.0], 5.0).unwrap();
        assert_relative_eq!(util, 0.0);
    }

    #[test]
    fn quasilinear_matches_linear_on_net_values() {
        // net values (2, 1), ratios (2, 1) -> all budget on good 0
        let bundle =
            marshallian_demand(UtilityFamily::Quasilinear, &[3.0, 2.0], &[1.0, 1.0], 2.0)
                .unwrap();
        assert_eq!(bundle, vec![2.0, 0.0]);
        let util =
            indirect_utility(UtilityFamily::Quasilinear, &[3.0, 2.0], &[1.0, 1.0], 2.0).unwrap();
        assert_relative_eq!(util, 4.0);
    }

    #[test]
    fn cobb_douglas_demand_splits_budget_by_weight() {
        let bundle = marshallian_demand(
            UtilityFamily::CobbDouglas,
            &[0.75, 0.25],
            &[0.5, 0.5],
            1.0,
        )
        .unwrap();
        assert_relative_eq!(bundle[0], 1.5);
        assert_relative_eq!(bundle[1], 0.5);
    }

    #[test]
    fn cobb_douglas_demand_is_scale_invariant() {
        let base =
            marshallian_demand(UtilityFamily::CobbDouglas, &[3.0, 1.0], &[1.0, 2.0], 2.0).unwrap();
        let scaled = marshallian_demand(
            UtilityFamily::CobbDouglas,
            &[30.0, 10.0],
            &[1.0, 2.0],
            2.0,
        )
        .unwrap();
        for (a, b) in base.iter().zip(&scaled) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn cobb_douglas_flags_free_good_with_weight() {
        let err = marshallian_demand(UtilityFamily::CobbDouglas, &[1.0, 1.0], &[0.0, 1.0], 1.0)
            .unwrap_err();
        assert_eq!(err, MarketError::DegeneratePrice);
    }

    #[test]
    fn leontief_demand_is_proportional_and_exhausts_budget() {
        let valuation = [1.0, 2.0];
        let prices = [3.0, 1.0];
        let bundle =
            marshallian_demand(UtilityFamily::Leontief, &valuation, &prices, 2.0).unwrap();
        // denom = 3 + 2 = 5; bundle = (2/5) * v
        assert_relative_eq!(bundle[0], 0.4);
        assert_relative_eq!(bundle[1], 0.8);
        let spend: f64 = bundle.iter().zip(&prices).map(|(x, p)| x * p).sum();
        assert_relative_eq!(spend, 2.0);

        let util = indirect_utility(UtilityFamily::Leontief, &valuation, &prices, 2.0).unwrap();
        assert_relative_eq!(util, 0.4);
    }

    #[test]
    fn leontief_flags_zero_cost_requirement() {
        let err = indirect_utility(UtilityFamily::Leontief, &[1.0, 0.0], &[0.0, 1.0], 1.0)
            .unwrap_err();
        assert_eq!(err, MarketError::DegeneratePrice);
    }

    #[test]
    fn ces_demand_exhausts_budget() {
        let family = UtilityFamily::Ces { rho: 0.5 };
        let valuation = [2.0, 1.0, 4.0];
        let prices = [1.0, 2.0, 0.5];
        let bundle = marshallian_demand(family, &valuation, &prices, 3.0).unwrap();
        let spend: f64 = bundle.iter().zip(&prices).map(|(x, p)| x * p).sum();
        assert_relative_eq!(spend, 3.0, max_relative = 1e-12);
    }

    #[test]
    fn ces_demand_is_scale_invariant() {
        let family = UtilityFamily::Ces { rho: 0.3 };
        let base = marshallian_demand(family, &[1.0, 2.0], &[1.0, 1.5], 1.0).unwrap();
        let scaled = marshallian_demand(family, &[7.0, 14.0], &[1.0, 1.5], 1.0).unwrap();
        for (a, b) in base.iter().zip(&scaled) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn ces_indirect_utility_dominates_equal_split() {
        let family = UtilityFamily::Ces { rho: 0.5 };
        let valuation = [1.0, 3.0];
        let prices = [1.0, 1.0];
        let best = indirect_utility(family, &valuation, &prices, 2.0).unwrap();
        let split = family.bundle_utility(&valuation, &[1.0, 1.0], &prices);
        assert!(best > split);
    }

    #[test]
    fn ces_rejects_elasticity_outside_range() {
        let err = marshallian_demand(UtilityFamily::Ces { rho: 1.0 }, &[1.0], &[1.0], 1.0)
            .unwrap_err();
        assert_eq!(err, MarketError::InvalidElasticity(1.0));
    }

    #[test]
    fn ces_flags_free_good_with_weight() {
        let err = marshallian_demand(
            UtilityFamily::Ces { rho: 0.5 },
            &[1.0, 1.0],
            &[1.0, 0.0],
            1.0,
        )
        .unwrap_err();
        assert_eq!(err, MarketError::DegeneratePrice);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = marshallian_demand(UtilityFamily::Linear, &[1.0, 2.0], &[1.0], 1.0).unwrap_err();
        assert!(matches!(err, MarketError::DimensionMismatch { .. }));
    }
}
