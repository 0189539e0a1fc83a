use std::collections::BTreeMap;

use crate::{
    distribution::{Mixture, MixtureParams, PowerLaw},
    error::{ConfigError, DensityError},
    prior::{MixturePrior, PowerLawPrior, Prior},
};

/// Observed positive counts, stored as a frequency table of distinct values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    table: Box<[(u64, u64)]>,
    len: u64,
}

impl Sample {
    /// Build a sample from raw observations. Zeros are rejected: the power
    /// law has no mass there and they have to be removed by the caller.
    pub fn new(values: &[u64]) -> Result<Self, ConfigError> {
        Self::from_counts(values.iter().map(|&x| (x, 1)))
    }

    /// Build a sample from `(value, count)` pairs. Repeated values are
    /// merged and zero counts ignored.
    pub fn from_counts(pairs: impl IntoIterator<Item = (u64, u64)>) -> Result<Self, ConfigError> {
        let mut table = BTreeMap::new();
        for (value, count) in pairs {
            if count == 0 {
                continue;
            }
            if value == 0 {
                return Err(ConfigError::ZeroInSample);
            }
            *table.entry(value).or_insert(0u64) += count;
        }
        if table.is_empty() {
            return Err(ConfigError::EmptySample);
        }
        let len = table.values().sum();
        Ok(Sample {
            table: table.into_iter().collect(),
            len,
        })
    }

    /// Total number of observations.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct values with their counts, in increasing order.
    pub fn counts(&self) -> &[(u64, u64)] {
        &self.table
    }

    pub fn max(&self) -> u64 {
        self.table.last().map_or(0, |&(x, _)| x)
    }

    /// Number of observations at or above `threshold`.
    pub fn count_at_least(&self, threshold: u64) -> u64 {
        self.tail(threshold).iter().map(|&(_, c)| c).sum()
    }

    fn tail(&self, threshold: u64) -> &[(u64, u64)] {
        let start = self.table.partition_point(|&(x, _)| x < threshold);
        &self.table[start..]
    }
}

/// Unnormalised log posterior of one of the supported models.
///
/// This trait is sealed: the sampler is not a general purpose MCMC library
/// and only runs the models of this crate.
pub trait LogDensity: private::Sealed + Sync {
    fn param_names(&self) -> &'static [&'static str];

    fn prior(&self) -> &Prior;

    /// Log-likelihood at `position`; always finite when `Ok`.
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, DensityError>;

    fn dim(&self) -> usize {
        self.param_names().len()
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for super::PowerLawPosterior {}

    impl Sealed for super::MixturePosterior {}
}

fn finite_or_unstable(value: f64) -> Result<f64, DensityError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DensityError::NumericInstability {
            what: "log-likelihood",
        })
    }
}

/// Power-law model of the exceedances of a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawPosterior {
    threshold: u64,
    num_tail: u64,
    sum_ln_tail: f64,
    prior: Prior,
}

impl PowerLawPosterior {
    /// Observations below `threshold` do not enter the likelihood. At least
    /// one observation has to remain.
    pub fn new(sample: &Sample, threshold: u64, prior: PowerLawPrior) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        let tail = sample.tail(threshold);
        if tail.is_empty() {
            return Err(ConfigError::NoTailObservations { threshold });
        }
        Ok(PowerLawPosterior {
            threshold,
            num_tail: tail.iter().map(|&(_, c)| c).sum(),
            sum_ln_tail: tail.iter().map(|&(x, c)| c as f64 * (x as f64).ln()).sum(),
            prior: prior.build()?,
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Number of observations that enter the likelihood.
    pub fn num_observations(&self) -> u64 {
        self.num_tail
    }

    /// `-alpha * sum(ln x) - n * ln zeta(alpha, u)` over the exceedances.
    pub fn try_log_likelihood_at(&self, xi1: f64) -> Result<f64, DensityError> {
        let dist = PowerLaw::new(self.threshold, xi1)?;
        let total = -dist.alpha() * self.sum_ln_tail - self.num_tail as f64 * dist.ln_normalizer();
        finite_or_unstable(total)
    }

    /// Log-likelihood, `-inf` outside the support of `xi1`.
    pub fn log_likelihood_at(&self, xi1: f64) -> f64 {
        self.try_log_likelihood_at(xi1)
            .unwrap_or(f64::NEG_INFINITY)
    }
}

impl LogDensity for PowerLawPosterior {
    fn param_names(&self) -> &'static [&'static str] {
        PowerLawPrior::NAMES
    }

    fn prior(&self) -> &Prior {
        &self.prior
    }

    fn log_likelihood(&self, position: &[f64]) -> Result<f64, DensityError> {
        self.try_log_likelihood_at(position[0])
    }
}

/// Bulk-plus-tail mixture model of the whole sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MixturePosterior {
    threshold: u64,
    sample: Sample,
    prior: Prior,
}

impl MixturePosterior {
    pub fn new(sample: &Sample, threshold: u64, prior: MixturePrior) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(MixturePosterior {
            threshold,
            sample: sample.clone(),
            prior: prior.build()?,
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn try_log_likelihood_at(&self, params: MixtureParams) -> Result<f64, DensityError> {
        let dist = Mixture::new(self.threshold, params)?;
        let total = self
            .sample
            .counts()
            .iter()
            .map(|&(x, count)| count as f64 * dist.ln_pmf(x))
            .sum();
        finite_or_unstable(total)
    }

    /// Log-likelihood, `-inf` outside the support of the parameters.
    pub fn log_likelihood_at(&self, params: MixtureParams) -> f64 {
        self.try_log_likelihood_at(params)
            .unwrap_or(f64::NEG_INFINITY)
    }
}

impl LogDensity for MixturePosterior {
    fn param_names(&self) -> &'static [&'static str] {
        MixtureParams::NAMES
    }

    fn prior(&self) -> &Prior {
        &self.prior
    }

    fn log_likelihood(&self, position: &[f64]) -> Result<f64, DensityError> {
        self.try_log_likelihood_at(MixtureParams::from_slice(position).map_err(|_| {
            DensityError::NumericInstability {
                what: "parameter vector",
            }
        })?)
    }
}
