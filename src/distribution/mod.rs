mod mixture;
mod power_law;
mod weibull;

pub use mixture::{
    ln_pmf_mixture, ln_survival_mixture, pmf_mixture, quantile_mixture, sample_mixture,
    survival_mixture, Mixture, MixtureParams,
};
pub use power_law::{
    ln_pmf_power_law, ln_survival_power_law, pmf_power_law, quantile_power_law,
    sample_power_law, survival_power_law, PowerLaw,
};
pub use weibull::DiscreteWeibull;

/// Smallest `x >= lower` with `P(X <= x) >= p`, searched on the log survival
/// function `ln P(X >= x)`.
///
/// `p == 1` has no finite answer and gives infinity. The search saturates at
/// `u64::MAX` when the tail is too heavy to reach `1 - p` in range.
pub(crate) fn discrete_quantile(p: f64, lower: u64, ln_survival: impl Fn(u64) -> f64) -> f64 {
    if !(0. ..=1.).contains(&p) {
        return f64::NAN;
    }
    if p == 1. {
        return f64::INFINITY;
    }
    let target = (-p).ln_1p();
    let reached = |x: u64| ln_survival(x.saturating_add(1)) <= target;

    if reached(lower) {
        return lower as f64;
    }

    // Exponential bracketing, then bisection. `lo` never satisfies the
    // condition, `hi` always does.
    let mut lo = lower;
    let mut step = 1u64;
    let mut hi = loop {
        let candidate = lo.saturating_add(step);
        if reached(candidate) {
            break candidate;
        }
        if candidate == u64::MAX {
            return u64::MAX as f64;
        }
        lo = candidate;
        step = step.saturating_mul(2);
    };

    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if reached(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi as f64
}
