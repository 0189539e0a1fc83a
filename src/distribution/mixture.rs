use rand::Rng;
use rand_distr::Distribution;

use crate::{
    distribution::{discrete_quantile, DiscreteWeibull, PowerLaw},
    error::{ConfigError, DensityError},
};

/// Parameters of the bulk-plus-tail mixture, in sampling order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureParams {
    /// Tail index of the power law above the threshold.
    pub xi1: f64,
    /// Discrete Weibull shape of the bulk.
    pub shape: f64,
    /// Discrete Weibull scale of the bulk.
    pub scale: f64,
}

impl MixtureParams {
    pub const NAMES: &'static [&'static str] = &["xi1", "shape", "scale"];

    pub fn to_array(self) -> [f64; 3] {
        [self.xi1, self.shape, self.scale]
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, ConfigError> {
        match *values {
            [xi1, shape, scale] => Ok(MixtureParams { xi1, shape, scale }),
            _ => Err(ConfigError::DimensionMismatch {
                expected: 3,
                found: values.len(),
            }),
        }
    }
}

/// Discrete Weibull bulk below the threshold `u`, power-law tail from `u` on.
///
/// The tail receives exactly the mass the bulk leaves at `u`:
///
/// ```text
/// P(X = x)  = pmf_b(x)                  x < u
///           = S_b(u) * pmf_tail(x)      x >= u
/// P(X >= x) = S_b(x)                    x < u
///           = S_b(u) * S_tail(x)        x >= u
/// ```
///
/// so the survival function is continuous at `u` and no mixing weight is
/// needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixture {
    threshold: u64,
    bulk: DiscreteWeibull,
    tail: PowerLaw,
    ln_threshold_mass: f64,
}

impl Mixture {
    pub fn new(threshold: u64, params: MixtureParams) -> Result<Self, DensityError> {
        let tail = PowerLaw::new(threshold, params.xi1)?;
        let bulk = DiscreteWeibull::new(params.shape, params.scale)?;
        Ok(Mixture {
            threshold,
            bulk,
            tail,
            ln_threshold_mass: ln_threshold_mass(&bulk, threshold),
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn bulk(&self) -> &DiscreteWeibull {
        &self.bulk
    }

    pub fn tail(&self) -> &PowerLaw {
        &self.tail
    }

    pub fn params(&self) -> MixtureParams {
        MixtureParams {
            xi1: self.tail.xi1(),
            shape: self.bulk.shape(),
            scale: self.bulk.scale(),
        }
    }

    /// `ln P(X >= u)`: the share of probability carried by the tail.
    pub fn ln_threshold_mass(&self) -> f64 {
        self.ln_threshold_mass
    }

    pub fn threshold_mass(&self) -> f64 {
        self.ln_threshold_mass.exp()
    }

    #[inline]
    fn in_tail(&self, x: u64) -> bool {
        x >= self.threshold
    }

    pub fn ln_pmf(&self, x: u64) -> f64 {
        if self.in_tail(x) {
            self.ln_threshold_mass + self.tail.ln_pmf(x)
        } else {
            self.bulk.ln_pmf(x)
        }
    }

    pub fn ln_survival(&self, x: u64) -> f64 {
        if self.in_tail(x) {
            self.ln_threshold_mass + self.tail.ln_survival(x)
        } else {
            self.bulk.ln_survival(x)
        }
    }

    pub fn pmf(&self, x: u64) -> f64 {
        self.ln_pmf(x).exp()
    }

    pub fn survival(&self, x: u64) -> f64 {
        self.ln_survival(x).exp()
    }

    pub fn quantile(&self, p: f64) -> f64 {
        discrete_quantile(p, 1, |x| self.ln_survival(x))
    }
}

/// The bulk survival at the threshold, shared by both sides of the boundary.
fn ln_threshold_mass(bulk: &DiscreteWeibull, threshold: u64) -> f64 {
    bulk.ln_survival(threshold)
}

impl Distribution<u64> for Mixture {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.quantile(rng.random::<f64>()) as u64
    }
}

pub fn pmf_mixture(
    xs: &[u64],
    threshold: u64,
    params: MixtureParams,
) -> Result<Vec<f64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok(xs.iter().map(|&x| dist.pmf(x)).collect())
}

pub fn survival_mixture(
    xs: &[u64],
    threshold: u64,
    params: MixtureParams,
) -> Result<Vec<f64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok(xs.iter().map(|&x| dist.survival(x)).collect())
}

pub fn ln_pmf_mixture(
    xs: &[u64],
    threshold: u64,
    params: MixtureParams,
) -> Result<Vec<f64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok(xs.iter().map(|&x| dist.ln_pmf(x)).collect())
}

pub fn ln_survival_mixture(
    xs: &[u64],
    threshold: u64,
    params: MixtureParams,
) -> Result<Vec<f64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok(xs.iter().map(|&x| dist.ln_survival(x)).collect())
}

pub fn quantile_mixture(
    ps: &[f64],
    threshold: u64,
    params: MixtureParams,
) -> Result<Vec<f64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok(ps.iter().map(|&p| dist.quantile(p)).collect())
}

pub fn sample_mixture<R: Rng + ?Sized>(
    n: usize,
    threshold: u64,
    params: MixtureParams,
    rng: &mut R,
) -> Result<Vec<u64>, DensityError> {
    let dist = Mixture::new(threshold, params)?;
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}
