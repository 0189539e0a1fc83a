use rand::Rng;
use rand_distr::Distribution;

use crate::{distribution::discrete_quantile, error::DensityError, math::ln_hurwitz_zeta};

/// Discrete power law on `{u, u + 1, ...}`.
///
/// `P(X = x) = x^(-alpha) / zeta(alpha, u)` with the Hurwitz zeta function as
/// normalising constant. The shape is given through the tail index
/// `xi1 = 1 / (alpha - 1)`, so any `xi1 > 0` is a valid, normalisable law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    threshold: u64,
    xi1: f64,
    alpha: f64,
    ln_norm: f64,
}

impl PowerLaw {
    pub fn new(threshold: u64, xi1: f64) -> Result<Self, DensityError> {
        if threshold == 0 {
            return Err(DensityError::DomainViolation {
                name: "threshold",
                value: 0.,
            });
        }
        let alpha = xi1.recip() + 1.;
        if !(xi1 > 0. && xi1.is_finite() && alpha > 1. && alpha.is_finite()) {
            return Err(DensityError::DomainViolation {
                name: "xi1",
                value: xi1,
            });
        }
        let ln_norm = ln_hurwitz_zeta(alpha, threshold as f64);
        if !ln_norm.is_finite() {
            return Err(DensityError::NumericInstability {
                what: "power-law normalising constant",
            });
        }
        Ok(PowerLaw {
            threshold,
            xi1,
            alpha,
            ln_norm,
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn xi1(&self) -> f64 {
        self.xi1
    }

    /// The classical exponent `1 / xi1 + 1`.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// `ln zeta(alpha, u)`.
    pub fn ln_normalizer(&self) -> f64 {
        self.ln_norm
    }

    pub fn ln_pmf(&self, x: u64) -> f64 {
        if x < self.threshold {
            return f64::NEG_INFINITY;
        }
        -self.alpha * (x as f64).ln() - self.ln_norm
    }

    /// `ln P(X >= x)`, exactly zero at and below the threshold.
    pub fn ln_survival(&self, x: u64) -> f64 {
        if x <= self.threshold {
            return 0.;
        }
        (ln_hurwitz_zeta(self.alpha, x as f64) - self.ln_norm).min(0.)
    }

    pub fn pmf(&self, x: u64) -> f64 {
        self.ln_pmf(x).exp()
    }

    pub fn survival(&self, x: u64) -> f64 {
        self.ln_survival(x).exp()
    }

    pub fn quantile(&self, p: f64) -> f64 {
        discrete_quantile(p, self.threshold, |x| self.ln_survival(x))
    }
}

impl Distribution<u64> for PowerLaw {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        // p < 1, so the quantile is finite.
        self.quantile(rng.random::<f64>()) as u64
    }
}

/// `P(X = x)` for every query point.
pub fn pmf_power_law(xs: &[u64], threshold: u64, xi1: f64) -> Result<Vec<f64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok(xs.iter().map(|&x| dist.pmf(x)).collect())
}

/// `P(X >= x)` for every query point.
pub fn survival_power_law(
    xs: &[u64],
    threshold: u64,
    xi1: f64,
) -> Result<Vec<f64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok(xs.iter().map(|&x| dist.survival(x)).collect())
}

pub fn ln_pmf_power_law(xs: &[u64], threshold: u64, xi1: f64) -> Result<Vec<f64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok(xs.iter().map(|&x| dist.ln_pmf(x)).collect())
}

pub fn ln_survival_power_law(
    xs: &[u64],
    threshold: u64,
    xi1: f64,
) -> Result<Vec<f64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok(xs.iter().map(|&x| dist.ln_survival(x)).collect())
}

pub fn quantile_power_law(
    ps: &[f64],
    threshold: u64,
    xi1: f64,
) -> Result<Vec<f64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok(ps.iter().map(|&p| dist.quantile(p)).collect())
}

pub fn sample_power_law<R: Rng + ?Sized>(
    n: usize,
    threshold: u64,
    xi1: f64,
    rng: &mut R,
) -> Result<Vec<u64>, DensityError> {
    let dist = PowerLaw::new(threshold, xi1)?;
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}
