//! Utility families and their direct utility functionals.

use std::fmt;
use std::str::FromStr;

use crate::MarketError;

/// The utility family shared by every buyer in a market instance.
///
/// The variant fixes both the shape of the engine's convex program and the
/// closed-form demand formulas the verifier uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UtilityFamily {
    /// u_i(x) = sum_j v_ij * x_ij
    Linear,
    /// u_i(x) = prod_j x_ij^v_ij with each buyer's weights summing to one
    CobbDouglas,
    /// u_i(x) = min_j x_ij / v_ij over goods with v_ij > 0
    Leontief,
    /// Linear utility over value net of price paid, with money retained freely
    Quasilinear,
    /// u_i(x) = (sum_j v_ij * x_ij^rho)^(1/rho), rho in (0, 1)
    Ces { rho: f64 },
}

impl UtilityFamily {
    /// Check family parameters. CES elasticity outside (0, 1) would make the
    /// engine's log-sum-of-powers objective non-concave, so it is rejected
    /// outright rather than extrapolated.
    pub fn validate(&self) -> Result<(), MarketError> {
        match self {
            UtilityFamily::Ces { rho } if !(*rho > 0.0 && *rho < 1.0) => {
                Err(MarketError::InvalidElasticity(*rho))
            }
            _ => Ok(()),
        }
    }

    /// Utility of a concrete bundle under this family.
    ///
    /// `prices` only matters for the quasilinear family, whose utility is
    /// measured net of the price paid per unit.
    pub fn bundle_utility(&self, valuation: &[f64], bundle: &[f64], prices: &[f64]) -> f64 {
        match self {
            UtilityFamily::Linear => valuation
                .iter()
                .zip(bundle)
                .map(|(v, x)| v * x)
                .sum(),
            UtilityFamily::Quasilinear => valuation
                .iter()
                .zip(prices)
                .zip(bundle)
                .map(|((v, p), x)| (v - p) * x)
                .sum(),
            UtilityFamily::CobbDouglas => {
                let weights = normalized_weights(valuation);
                if weights.iter().all(|w| *w == 0.0) {
                    return 0.0;
                }
                weights
                    .iter()
                    .zip(bundle)
                    .filter(|(w, _)| **w > 0.0)
                    .map(|(w, x)| x.powf(*w))
                    .product()
            }
            UtilityFamily::Leontief => {
                let min = valuation
                    .iter()
                    .zip(bundle)
                    .filter(|(v, _)| **v > 0.0)
                    .map(|(v, x)| x / v)
                    .fold(f64::INFINITY, f64::min);
                // a buyer that wants nothing gets utility zero
                if min.is_finite() { min } else { 0.0 }
            }
            UtilityFamily::Ces { rho } => {
                let sum: f64 = valuation
                    .iter()
                    .zip(bundle)
                    .filter(|(v, _)| **v > 0.0)
                    .map(|(v, x)| v * x.powf(*rho))
                    .sum();
                sum.powf(1.0 / rho)
            }
        }
    }
}

impl fmt::Display for UtilityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtilityFamily::Linear => write!(f, "linear"),
            UtilityFamily::CobbDouglas => write!(f, "cobb-douglas"),
            UtilityFamily::Leontief => write!(f, "leontief"),
            UtilityFamily::Quasilinear => write!(f, "quasilinear"),
            UtilityFamily::Ces { .. } => write!(f, "ces"),
        }
    }
}

impl FromStr for UtilityFamily {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(UtilityFamily::Linear),
            "cobb-douglas" => Ok(UtilityFamily::CobbDouglas),
            "leontief" => Ok(UtilityFamily::Leontief),
            "quasilinear" => Ok(UtilityFamily::Quasilinear),
            // rho = 0.5 is the conventional midpoint; callers wanting a
            // specific elasticity construct the variant directly
            "ces" => Ok(UtilityFamily::Ces { rho: 0.5 }),
            other => Err(MarketError::InvalidUtilityFamily(other.to_string())),
        }
    }
}

/// Normalize a valuation row into Cobb-Douglas exponents summing to one.
/// A row of zeros stays all zero.
pub fn normalized_weights(valuation: &[f64]) -> Vec<f64> {
    let total: f64 = valuation.iter().sum();
    if total <= 0.0 {
        return vec![0.0; valuation.len()];
    }
    valuation.iter().map(|v| v / total).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn parses_all_family_identifiers() {
        assert_eq!("linear".parse::<UtilityFamily>(), Ok(UtilityFamily::Linear));
        assert_eq!(
            "cobb-douglas".parse::<UtilityFamily>(),
            Ok(UtilityFamily::CobbDouglas)
        );
        assert_eq!(
            "leontief".parse::<UtilityFamily>(),
            Ok(UtilityFamily::Leontief)
        );
        assert_eq!(
            "quasilinear".parse::<UtilityFamily>(),
            Ok(UtilityFamily::Quasilinear)
        );
        assert_eq!(
            "ces".parse::<UtilityFamily>(),
            Ok(UtilityFamily::Ces { rho: 0.5 })
        );
    }

    #[test]
    fn rejects_unknown_identifier() {
        let err = "cobb_douglas".parse::<UtilityFamily>().unwrap_err();
        assert_eq!(
            err,
            MarketError::InvalidUtilityFamily("cobb_douglas".to_string())
        );
    }

    #[test]
    fn rejects_elasticity_outside_open_unit_interval() {
        for rho in [0.0, 1.0, -0.5, 1.5] {
            let err = UtilityFamily::Ces { rho }.validate().unwrap_err();
            assert_eq!(err, MarketError::InvalidElasticity(rho));
        }
        assert!(UtilityFamily::Ces { rho: 0.5 }.validate().is_ok());
        assert!(UtilityFamily::Linear.validate().is_ok());
    }

    #[test]
    fn linear_bundle_utility_is_dot_product() {
        let u = UtilityFamily::Linear.bundle_utility(&[2.0, 3.0], &[1.0, 0.5], &[1.0, 1.0]);
        assert_relative_eq!(u, 3.5);
    }

    #[test]
    fn quasilinear_bundle_utility_nets_out_prices() {
        let u =
            UtilityFamily::Quasilinear.bundle_utility(&[5.0, 2.0], &[1.0, 1.0], &[3.0, 4.0]);
        // (5 - 3) * 1 + (2 - 4) * 1
        assert_relative_eq!(u, 0.0);
    }

    #[test]
    fn cobb_douglas_bundle_utility_normalizes_weights() {
        // weights (3, 1) normalize to (0.75, 0.25)
        let u = UtilityFamily::CobbDouglas.bundle_utility(&[3.0, 1.0], &[16.0, 16.0], &[]);
        assert_relative_eq!(u, 16.0, max_relative = 1e-12);
    }

    #[test]
    fn leontief_bundle_utility_ignores_zero_requirements() {
        let u = UtilityFamily::Leontief.bundle_utility(&[1.0, 2.0, 0.0], &[0.5, 1.0, 0.0], &[]);
        assert_relative_eq!(u, 0.5);

        let empty = UtilityFamily::Leontief.bundle_utility(&[0.0, 0.0], &[1.0, 1.0], &[]);
        assert_relative_eq!(empty, 0.0);
    }

    #[test]
    fn ces_bundle_utility_matches_closed_form() {
        let rho = 0.5;
        let u = UtilityFamily::Ces { rho }.bundle_utility(&[1.0, 1.0], &[4.0, 9.0], &[]);
        // (4^0.5 + 9^0.5)^2 = 25
        assert_relative_eq!(u, 25.0, max_relative = 1e-12);
    }

    #[test]
    fn normalized_weights_handles_zero_row() {
        assert_eq!(normalized_weights(&[0.0, 0.0]), vec![0.0, 0.0]);
        let w = normalized_weights(&[1.0, 3.0]);
        assert_relative_eq!(w[0], 0.25);
        assert_relative_eq!(w[1], 0.75);
    }
}
