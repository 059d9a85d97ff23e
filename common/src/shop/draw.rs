// Weighted choice with replacement

use crate::models::Egg;
use rand::Rng;

/// Draw `n` egg names, each independently weighted by its pull chance
///
/// Weights are normalised and scanned cumulatively. If rounding leaves the
/// cumulative sum just below the sampled value, the last egg with a positive
/// weight is taken so every draw yields a name. Returns an empty list when the
/// eggs carry no weight at all.
pub fn draw<R: Rng + ?Sized>(eggs: &[Egg], n: usize, rng: &mut R) -> Vec<String> {
    let total: f64 = eggs.iter().map(|e| e.chance.max(0.0)).sum();
    let Some(last_positive) = eggs.iter().rposition(|e| e.chance > 0.0) else {
        return Vec::new();
    };

    (0..n)
        .map(|_| {
            let r: f64 = rng.gen();
            let mut cumulative = 0.0;
            let picked = eggs
                .iter()
                .position(|egg| {
                    cumulative += egg.chance.max(0.0) / total;
                    r < cumulative && egg.chance > 0.0
                })
                .unwrap_or(last_positive);
            eggs[picked].name.clone()
        })
        .collect()
}
