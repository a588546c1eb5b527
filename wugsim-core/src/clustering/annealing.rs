//! Simulated annealing over discrete assignment vectors.
//!
//! The search space is `{0, ..., max_value - 1}^N`; a neighbour move rewrites
//! one coordinate to a different value. The temperature follows an
//! exponential decay from 1.0 at rate 0.005 with a floor of 0.001, which
//! halves in under 200 steps. Acceptance is Metropolis: improvements are
//! always taken, worsening moves with probability `exp(-delta / T)`. The
//! best state ever visited is returned, so the outcome never scores worse
//! than the supplied starting point.

use rand::Rng;
use rand::rngs::SmallRng;

const INITIAL_TEMPERATURE: f64 = 1.0;
const DECAY_RATE: f64 = 0.005;
const TEMPERATURE_FLOOR: f64 = 0.001;

fn temperature(step: usize) -> f64 {
    (INITIAL_TEMPERATURE * (-DECAY_RATE * step as f64).exp()).max(TEMPERATURE_FLOOR)
}

pub(crate) struct AnnealOutcome {
    pub(crate) state: Vec<usize>,
    pub(crate) loss: f64,
}

/// Minimizes `loss` starting from `initial`.
///
/// Terminates after `max_iters` total steps or `max_attempts` consecutive
/// steps without improving on the best loss seen so far.
pub(crate) fn anneal<F>(
    initial: &[usize],
    max_value: usize,
    loss: F,
    max_attempts: usize,
    max_iters: usize,
    rng: &mut SmallRng,
) -> AnnealOutcome
where
    F: Fn(&[usize]) -> f64,
{
    let mut current = initial.to_vec();
    let mut current_loss = loss(&current);

    if current.is_empty() || max_value <= 1 {
        return AnnealOutcome {
            state: current,
            loss: current_loss,
        };
    }

    let mut best = current.clone();
    let mut best_loss = current_loss;
    let mut stale = 0usize;

    for step in 0..max_iters {
        if stale >= max_attempts {
            break;
        }

        let coordinate = rng.gen_range(0..current.len());
        let previous = current[coordinate];
        // Uniform draw over the other max_value - 1 values.
        let offset = rng.gen_range(1..max_value);
        current[coordinate] = (previous + offset) % max_value;

        let candidate_loss = loss(&current);
        let delta = candidate_loss - current_loss;
        let accept = delta <= 0.0 || rng.r#gen::<f64>() < (-delta / temperature(step)).exp();

        if accept {
            current_loss = candidate_loss;
        } else {
            current[coordinate] = previous;
        }

        if current_loss < best_loss {
            best.clone_from(&current);
            best_loss = current_loss;
            stale = 0;
        } else {
            stale += 1;
        }
    }

    AnnealOutcome {
        state: best,
        loss: best_loss,
    }
}
