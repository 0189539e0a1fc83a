use crate::{
    distribution::MixtureParams,
    error::ConfigError,
    likelihood::{MixturePosterior, PowerLawPosterior, Sample},
    prior::{MixturePrior, PowerLawPrior},
    sampler::{sample_chain, SamplerSettings},
    trace::ChainOutput,
};

/// Fit a discrete power law to the observations at or above `threshold`.
pub fn fit_power_law(
    values: &[u64],
    threshold: u64,
    xi1_init: f64,
    prior: PowerLawPrior,
    settings: &SamplerSettings,
) -> Result<ChainOutput, ConfigError> {
    let sample = Sample::new(values)?;
    let posterior = PowerLawPosterior::new(&sample, threshold, prior)?;
    sample_chain(&posterior, &[xi1_init], settings)
}

/// Fit the bulk-plus-tail mixture to all observations.
pub fn fit_mixture(
    values: &[u64],
    threshold: u64,
    init: MixtureParams,
    prior: MixturePrior,
    settings: &SamplerSettings,
) -> Result<ChainOutput, ConfigError> {
    let sample = Sample::new(values)?;
    let posterior = MixturePosterior::new(&sample, threshold, prior)?;
    sample_chain(&posterior, &init.to_array(), settings)
}
