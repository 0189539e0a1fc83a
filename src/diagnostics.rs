//! Convergence diagnostics and posterior summaries for scalar chains.

/// Lag-`k` autocorrelation of a scalar chain.
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.;
    }

    let mean = mean(series);
    let denominator: f64 = series.iter().map(|x| (x - mean) * (x - mean)).sum();
    if denominator <= 0. {
        return 0.;
    }

    let numerator: f64 = series
        .iter()
        .zip(&series[lag..])
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum();
    numerator / denominator
}

/// Effective sample size, truncating the autocorrelation sum at the first
/// non-positive lag.
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return n as f64;
    }

    let mut rho_sum = 0.;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0. {
            break;
        }
        rho_sum += rho;
    }

    n as f64 / 2f64.mul_add(rho_sum, 1.).max(1.)
}

/// Split-R̂ over several chains of one parameter.
///
/// Every chain is cut to the shortest even length and split in halves.
/// Returns `None` with fewer than four draws per chain or a single chain.
pub fn split_rhat(chains: &[&[f64]]) -> Option<f64> {
    if chains.len() < 2 {
        return None;
    }
    let min_draws = chains.iter().map(|chain| chain.len()).min().unwrap_or(0);
    let used = min_draws - min_draws % 2;
    if used < 4 {
        return None;
    }
    let half = used / 2;
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|chain| [&chain[..half], &chain[half..used]])
        .collect();

    let n = half as f64;
    let means: Vec<f64> = halves.iter().map(|chain| mean(chain)).collect();
    let grand_mean = mean(&means);
    let between = n * sample_variance(&means, grand_mean);
    let within = halves
        .iter()
        .zip(&means)
        .map(|(chain, &m)| sample_variance(chain, m))
        .sum::<f64>()
        / halves.len() as f64;

    if within <= 1e-10 {
        return Some(1.);
    }
    let var_plus = ((n - 1.) / n) * within + between / n;
    Some((var_plus / within).sqrt().max(1.))
}

/// Posterior summary of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub name: &'static str,
    pub mean: f64,
    pub sd: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
    pub ess: f64,
}

impl ParameterSummary {
    pub fn from_draws(name: &'static str, draws: &[f64]) -> Self {
        let mean = mean(draws);
        let mut sorted = draws.to_vec();
        sorted.sort_by(f64::total_cmp);
        ParameterSummary {
            name,
            mean,
            sd: sample_variance(draws, mean).sqrt(),
            q025: percentile(&sorted, 0.025),
            q50: percentile(&sorted, 0.5),
            q975: percentile(&sorted, 0.975),
            ess: effective_sample_size(draws),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.;
    }
    values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / (values.len() - 1) as f64
}

/// Linear interpolation between order statistics.
pub(crate) fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let last = sorted_values.len() - 1;
    let position = probability.clamp(0., 1.) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - lower as f64;
        (1. - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}
