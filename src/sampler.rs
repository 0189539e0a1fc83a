use std::ops::ControlFlow;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::{prelude::*, ThreadPoolBuilder};

use crate::{
    adapt_strategy::{AdaptMethod, ScaleAdaptation},
    chain::{Chain, MetropolisChain, Progress},
    error::ConfigError,
    likelihood::LogDensity,
    proposal::RandomWalk,
    trace::{ChainOutput, MultiChainTrace},
};

/// How parameters are updated within one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateScheme {
    /// One parameter at a time, each with its own accept/reject step.
    #[default]
    Componentwise,
    /// All parameters jointly with a single accept/reject step.
    Block,
}

/// Settings for the Metropolis sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Burn-in iterations. They are discarded and used to tune the proposal scales.
    pub num_burn: u64,
    /// Number of retained draws per chain.
    pub num_draws: u64,
    /// Keep every `thin`-th iteration after burn-in.
    pub thin: u64,
    pub seed: u64,
    /// Number of chains run by [`sample_chains`].
    pub num_chains: usize,
    pub update: UpdateScheme,
    pub adapt: AdaptMethod,
    /// Initial proposal standard deviation, relative to the magnitude of the
    /// starting value.
    pub initial_scale: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            num_burn: 1000,
            num_draws: 2000,
            thin: 1,
            seed: 0,
            num_chains: 4,
            update: UpdateScheme::default(),
            adapt: AdaptMethod::default(),
            initial_scale: 0.1,
        }
    }
}

/// Chain type created by [`SamplerSettings::new_chain`].
pub type DefaultChain<'a, D> = MetropolisChain<'a, D, ScaleAdaptation, RandomWalk, ChaCha8Rng>;

impl SamplerSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.num_draws == 0 {
            return Err(ConfigError::InvalidSettings(
                "the number of draws must be positive".into(),
            ));
        }
        if self.thin == 0 {
            return Err(ConfigError::InvalidSettings(
                "the thinning interval must be positive".into(),
            ));
        }
        if self.num_chains == 0 {
            return Err(ConfigError::InvalidSettings(
                "at least one chain is required".into(),
            ));
        }
        if !(self.initial_scale > 0. && self.initial_scale.is_finite()) {
            return Err(ConfigError::InvalidSettings(format!(
                "initial proposal scale {} must be positive and finite",
                self.initial_scale
            )));
        }
        if self
            .num_draws
            .checked_mul(self.thin)
            .and_then(|n| n.checked_add(self.num_burn))
            .is_none()
        {
            return Err(ConfigError::InvalidSettings(
                "total number of iterations overflows".into(),
            ));
        }
        self.adapt.validate()
    }

    /// Burn-in plus thinned draws.
    pub fn total_iterations(&self) -> u64 {
        self.num_draws
            .saturating_mul(self.thin)
            .saturating_add(self.num_burn)
    }

    /// Create chain number `chain` at `init`. Every chain draws from its own
    /// stream of the seeded generator.
    pub fn new_chain<'a, D: LogDensity + ?Sized>(
        &self,
        density: &'a D,
        chain: u64,
        init: &[f64],
    ) -> Result<DefaultChain<'a, D>, ConfigError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(chain);
        MetropolisChain::new(
            density,
            ScaleAdaptation::new(self.adapt),
            RandomWalk,
            rng,
            self,
            chain,
            init,
        )
    }
}

/// Run a single chain (chain id 0) to completion.
pub fn sample_chain<D: LogDensity + ?Sized>(
    density: &D,
    init: &[f64],
    settings: &SamplerSettings,
) -> Result<ChainOutput, ConfigError> {
    sample_chain_with_progress(density, init, settings, 0, |_| ControlFlow::Continue(()))
}

/// Run one chain, reporting every iteration to `callback`. Returning
/// `ControlFlow::Break` stops the chain and keeps the draws made so far.
pub fn sample_chain_with_progress<D, F>(
    density: &D,
    init: &[f64],
    settings: &SamplerSettings,
    chain: u64,
    callback: F,
) -> Result<ChainOutput, ConfigError>
where
    D: LogDensity + ?Sized,
    F: FnMut(&Progress) -> ControlFlow<()>,
{
    Ok(settings.new_chain(density, chain, init)?.run(callback))
}

/// Iterate over the positions of a chain, burn-in included.
pub fn sample_sequentially<'a, D: LogDensity + ?Sized>(
    density: &'a D,
    settings: &SamplerSettings,
    init: &[f64],
    chain: u64,
) -> Result<impl Iterator<Item = (Box<[f64]>, Progress)> + 'a, ConfigError> {
    let mut sampler = settings.new_chain(density, chain, init)?;
    let total = settings.total_iterations();
    Ok((0..total).map(move |_| sampler.draw()))
}

/// Run `settings.num_chains` independent chains in parallel, all starting at
/// `init`.
pub fn sample_chains<D: LogDensity + ?Sized>(
    density: &D,
    init: &[f64],
    settings: &SamplerSettings,
) -> Result<MultiChainTrace> {
    settings.validate().context("Invalid sampler settings")?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(settings.num_chains)
        .thread_name(|i| format!("crandep-chain-{}", i))
        .build()
        .context("Could not start thread pool")?;

    let chains = pool.install(|| {
        (0..settings.num_chains as u64)
            .into_par_iter()
            .map(|chain| {
                sample_chain_with_progress(density, init, settings, chain, |_| {
                    ControlFlow::Continue(())
                })
                .with_context(|| format!("Could not run chain {}", chain))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let trace = MultiChainTrace::new(chains);
    if let Some(rhat) = trace.max_rhat() {
        if rhat > 1.1 {
            log::warn!("chains have not mixed: max split-R̂ {:.3}", rhat);
        } else {
            log::info!("max split-R̂ over {} chains: {:.3}", settings.num_chains, rhat);
        }
    }
    Ok(trace)
}
