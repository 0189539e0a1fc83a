//! Bayesian fitting of heavy-tailed degree distributions.
//!
//! Two models for positive integer counts are supported: a discrete power
//! law above a threshold `u`, and a mixture of a discrete Weibull bulk below
//! `u` with a power-law tail from `u` on. Both are fitted by random-walk
//! Metropolis-Hastings with proposal scales tuned during burn-in.
//!
//! ```
//! use crandep::{fit_power_law, sample_power_law, PowerLawPrior, SamplerSettings};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let degrees = sample_power_law(300, 1, 1., &mut rng).unwrap();
//!
//! let settings = SamplerSettings {
//!     num_burn: 200,
//!     num_draws: 500,
//!     ..Default::default()
//! };
//! let output = fit_power_law(&degrees, 1, 0.5, PowerLawPrior::default(), &settings).unwrap();
//! assert_eq!(output.trace.len(), 500);
//! let xi1 = output.trace.posterior_mean_params()[0];
//! assert!(xi1 > 0.);
//! ```

pub(crate) mod adapt_strategy;
pub(crate) mod chain;
pub mod diagnostics;
pub(crate) mod distribution;
pub(crate) mod dual_avg;
pub(crate) mod error;
pub(crate) mod fit;
pub(crate) mod likelihood;
pub(crate) mod math;
pub(crate) mod prior;
pub(crate) mod proposal;
pub(crate) mod sampler;
pub(crate) mod trace;

pub use adapt_strategy::{
    AdaptMethod, AdaptStrategy, DualAverageAdaptation, DualAverageSettings, ScaleAdaptation,
    WindowedAdaptOptions, WindowedAdaptation,
};
pub use chain::{Chain, MetropolisChain, Progress};
pub use diagnostics::ParameterSummary;
pub use distribution::{
    ln_pmf_mixture, ln_pmf_power_law, ln_survival_mixture, ln_survival_power_law, pmf_mixture,
    pmf_power_law, quantile_mixture, quantile_power_law, sample_mixture, sample_power_law,
    survival_mixture, survival_power_law, DiscreteWeibull, Mixture, MixtureParams, PowerLaw,
};
pub use dual_avg::{DualAverage, DualAverageOptions};
pub use error::{ConfigError, DensityError};
pub use fit::{fit_mixture, fit_power_law};
pub use likelihood::{LogDensity, MixturePosterior, PowerLawPosterior, Sample};
pub use prior::{Bounds, MixturePrior, PowerLawPrior, Prior};
pub use proposal::{Proposal, RandomWalk};
pub use sampler::{
    sample_chain, sample_chain_with_progress, sample_chains, sample_sequentially, DefaultChain,
    SamplerSettings, UpdateScheme,
};
pub use trace::{ChainOutput, MultiChainTrace, SamplerDiagnostics, Trace, TraceRecord};
