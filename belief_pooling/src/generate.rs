//! Random instance generation for pooling experiments.

use rand::rngs::StdRng;
use rand::Rng;

/// Random belief matrix: each forecaster's row is a probability
/// distribution over the outcomes.
pub fn random_beliefs(num_bidders: usize, num_goods: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..num_bidders)
        .map(|_| {
            let raw: Vec<f64> = (0..num_goods).map(|_| rng.random::<f64>()).collect();
            let total: f64 = raw.iter().sum();
            raw.iter().map(|v| v / total).collect()
        })
        .collect()
}

/// Random weight vector on the probability simplex, drawn as the spacings
/// between sorted uniforms so the weights sum to one exactly.
pub fn random_weights(num_bidders: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut cuts: Vec<f64> = (0..num_bidders.saturating_sub(1))
        .map(|_| rng.random::<f64>())
        .collect();
    cuts.sort_by(f64::total_cmp);

    let mut weights = Vec::with_capacity(num_bidders);
    let mut previous = 0.0;
    for cut in cuts {
        weights.push(cut - previous);
        previous = cut;
    }
    weights.push(1.0 - previous);
    weights
}
