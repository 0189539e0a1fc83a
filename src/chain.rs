use std::ops::ControlFlow;

use rand::Rng;

use crate::{
    adapt_strategy::AdaptStrategy,
    error::{ConfigError, DensityError},
    likelihood::LogDensity,
    proposal::Proposal,
    sampler::{SamplerSettings, UpdateScheme},
    trace::{ChainOutput, SamplerDiagnostics, Trace, TraceRecord},
};

/// State of a chain after one iteration, handed to progress callbacks.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Progress {
    pub iteration: u64,
    pub chain: u64,
    pub tuning: bool,
    pub log_posterior: f64,
    pub scales: Box<[f64]>,
    pub accepted: Box<[bool]>,
}

/// A Markov chain that produces one iteration per `draw`.
pub trait Chain {
    /// Run one iteration and return the new position.
    fn draw(&mut self) -> (Box<[f64]>, Progress);

    /// The dimensionality of the posterior.
    fn dim(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
struct Rejections {
    prior: u64,
    domain: u64,
    numeric: u64,
}

impl Rejections {
    /// Log-likelihood of a candidate, or `None` if it has zero posterior density.
    fn evaluate<D: LogDensity + ?Sized>(&mut self, density: &D, candidate: &[f64]) -> Option<f64> {
        if density.prior().violation(candidate).is_some() {
            self.prior += 1;
            return None;
        }
        match density.log_likelihood(candidate) {
            Ok(value) => Some(value),
            Err(DensityError::DomainViolation { .. }) => {
                self.domain += 1;
                None
            }
            Err(DensityError::NumericInstability { .. }) => {
                self.numeric += 1;
                None
            }
        }
    }
}

/// Random-walk Metropolis chain over the parameters of a [`LogDensity`].
pub struct MetropolisChain<'a, D, A, P, R>
where
    D: LogDensity + ?Sized,
    A: AdaptStrategy,
    P: Proposal,
    R: Rng,
{
    density: &'a D,
    strategy: A,
    proposal: P,
    rng: R,
    settings: SamplerSettings,
    chain: u64,
    position: Box<[f64]>,
    candidate: Box<[f64]>,
    log_likelihood: f64,
    scales: Box<[f64]>,
    accept_prob: Box<[f64]>,
    accepted: Box<[bool]>,
    iteration: u64,
    rejections: Rejections,
    retained_accepts: Box<[u64]>,
    retained_iterations: u64,
    trace: Trace,
}

impl<'a, D, A, P, R> MetropolisChain<'a, D, A, P, R>
where
    D: LogDensity + ?Sized,
    A: AdaptStrategy,
    P: Proposal,
    R: Rng,
{
    /// Set up a chain at `init`. Fails if the settings are invalid or the
    /// starting point has zero posterior density.
    pub fn new(
        density: &'a D,
        mut strategy: A,
        proposal: P,
        rng: R,
        settings: &SamplerSettings,
        chain: u64,
        init: &[f64],
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        density.prior().check_initial(init)?;
        let log_likelihood = density
            .log_likelihood(init)
            .map_err(ConfigError::DegenerateStart)?;

        let dim = density.dim();
        let scales: Box<[f64]> = init
            .iter()
            .map(|x| settings.initial_scale * x.abs().max(1.))
            .collect();
        strategy.init(&scales);

        Ok(MetropolisChain {
            density,
            strategy,
            proposal,
            rng,
            settings: *settings,
            chain,
            position: init.into(),
            candidate: init.into(),
            log_likelihood,
            scales,
            accept_prob: vec![0.; dim].into(),
            accepted: vec![false; dim].into(),
            iteration: 0,
            rejections: Rejections::default(),
            retained_accepts: vec![0; dim].into(),
            retained_iterations: 0,
            trace: Trace::with_capacity(density.param_names(), settings.num_draws.min(1 << 16) as usize),
        })
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    fn log_posterior(&self) -> f64 {
        self.log_likelihood + self.density.prior().log_density(&self.position)
    }

    /// Accept or reject `self.candidate` against the current position.
    fn metropolis_step(&mut self) -> (f64, bool) {
        let Some(proposed) = self.rejections.evaluate(self.density, &self.candidate) else {
            return (0., false);
        };
        let diff = proposed - self.log_likelihood;
        let accept_prob = if diff >= 0. { 1. } else { diff.exp() };
        let accepted = self.rng.random::<f64>() < accept_prob;
        if accepted {
            self.position.copy_from_slice(&self.candidate);
            self.log_likelihood = proposed;
        }
        (accept_prob, accepted)
    }

    fn update_componentwise(&mut self) {
        for idx in 0..self.position.len() {
            self.candidate.copy_from_slice(&self.position);
            self.candidate[idx] =
                self.proposal
                    .propose(idx, self.position[idx], self.scales[idx], &mut self.rng);
            let (prob, accepted) = self.metropolis_step();
            self.accept_prob[idx] = prob;
            self.accepted[idx] = accepted;
        }
    }

    fn update_block(&mut self) {
        for idx in 0..self.position.len() {
            self.candidate[idx] =
                self.proposal
                    .propose(idx, self.position[idx], self.scales[idx], &mut self.rng);
        }
        let (prob, accepted) = self.metropolis_step();
        self.accept_prob.fill(prob);
        self.accepted.fill(accepted);
    }

    fn record(&mut self) {
        self.retained_iterations += 1;
        for (count, &accepted) in self.retained_accepts.iter_mut().zip(self.accepted.iter()) {
            *count += u64::from(accepted);
        }
        let offset = self.iteration - self.settings.num_burn + 1;
        if offset % self.settings.thin == 0 {
            self.trace.push(TraceRecord {
                iteration: self.iteration,
                params: self.position.clone(),
                log_posterior: self.log_posterior(),
                log_likelihood: self.log_likelihood,
                accepted: self.accepted.clone(),
            });
        }
    }

    fn is_finished(&self) -> bool {
        self.iteration >= self.settings.total_iterations()
    }

    /// Run the remaining iterations. The callback sees every iteration and
    /// may stop the chain early, in which case the records retained so far
    /// are returned.
    pub fn run(mut self, mut callback: impl FnMut(&Progress) -> ControlFlow<()>) -> ChainOutput {
        log::info!(
            "chain {}: {} burn-in iterations, {} draws with thinning {}",
            self.chain,
            self.settings.num_burn,
            self.settings.num_draws,
            self.settings.thin
        );
        let mut stopped_early = false;
        while !self.is_finished() {
            let (_, progress) = self.draw();
            if callback(&progress).is_break() {
                log::warn!(
                    "chain {} stopped early after {} iterations",
                    self.chain,
                    self.iteration
                );
                stopped_early = true;
                break;
            }
        }
        self.finish(stopped_early)
    }

    fn finish(self, stopped_early: bool) -> ChainOutput {
        let per_param_acceptance: Box<[f64]> = self
            .retained_accepts
            .iter()
            .map(|&count| match self.retained_iterations {
                0 => 0.,
                n => count as f64 / n as f64,
            })
            .collect();
        let acceptance_rate =
            per_param_acceptance.iter().sum::<f64>() / per_param_acceptance.len().max(1) as f64;

        if self.retained_iterations > 0 && !(0.01..=0.99).contains(&acceptance_rate) {
            log::warn!(
                "chain {} finished with a degenerate acceptance rate of {:.3}",
                self.chain,
                acceptance_rate
            );
        }
        log::info!(
            "chain {} finished: {} draws, acceptance {:.3}, {} proposals outside the prior, {} outside the support, {} numerically unstable",
            self.chain,
            self.trace.len(),
            acceptance_rate,
            self.rejections.prior,
            self.rejections.domain,
            self.rejections.numeric
        );

        ChainOutput {
            chain_id: self.chain,
            trace: self.trace,
            diagnostics: SamplerDiagnostics {
                acceptance_rate,
                per_param_acceptance,
                final_scales: self.scales,
                prior_rejections: self.rejections.prior,
                domain_violations: self.rejections.domain,
                numeric_failures: self.rejections.numeric,
                iterations: self.iteration,
                stopped_early,
            },
        }
    }
}

impl<D, A, P, R> Chain for MetropolisChain<'_, D, A, P, R>
where
    D: LogDensity + ?Sized,
    A: AdaptStrategy,
    P: Proposal,
    R: Rng,
{
    fn draw(&mut self) -> (Box<[f64]>, Progress) {
        match self.settings.update {
            UpdateScheme::Componentwise => self.update_componentwise(),
            UpdateScheme::Block => self.update_block(),
        }

        let tuning = self.iteration < self.settings.num_burn;
        if tuning {
            self.strategy.adapt(
                self.iteration,
                &self.accept_prob,
                &self.accepted,
                &mut self.scales,
            );
            if self.iteration + 1 == self.settings.num_burn {
                self.strategy.finalize(&mut self.scales);
                log::debug!(
                    "chain {}: burn-in finished, proposal scales {:?}",
                    self.chain,
                    self.scales
                );
            }
        } else {
            self.record();
        }

        let progress = Progress {
            iteration: self.iteration,
            chain: self.chain,
            tuning,
            log_posterior: self.log_posterior(),
            scales: self.scales.clone(),
            accepted: self.accepted.clone(),
        };
        self.iteration += 1;
        (self.position.clone(), progress)
    }

    fn dim(&self) -> usize {
        self.position.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapt_strategy::{AdaptMethod, ScaleAdaptation},
        likelihood::{PowerLawPosterior, Sample},
        prior::PowerLawPrior,
        proposal::RandomWalk,
    };
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn posterior() -> PowerLawPosterior {
        let sample = Sample::new(&[1, 1, 1, 2, 2, 3, 5, 8, 13, 40]).unwrap();
        PowerLawPosterior::new(&sample, 1, PowerLawPrior::default()).unwrap()
    }

    fn settings(num_burn: u64, num_draws: u64, thin: u64) -> SamplerSettings {
        SamplerSettings {
            num_burn,
            num_draws,
            thin,
            ..Default::default()
        }
    }

    fn chain<'a>(
        density: &'a PowerLawPosterior,
        settings: &SamplerSettings,
        init: &[f64],
    ) -> Result<MetropolisChain<'a, PowerLawPosterior, ScaleAdaptation, RandomWalk, ChaCha8Rng>, ConfigError>
    {
        MetropolisChain::new(
            density,
            ScaleAdaptation::new(settings.adapt),
            RandomWalk,
            ChaCha8Rng::seed_from_u64(1),
            settings,
            0,
            init,
        )
    }

    #[test]
    fn trace_length_respects_burn_in_and_thinning() {
        let density = posterior();
        let settings = settings(30, 25, 3);
        let output = chain(&density, &settings, &[1.]).unwrap().run(|_| ControlFlow::Continue(()));
        assert_eq!(output.trace.len(), 25);
        assert_eq!(output.diagnostics.iterations, 30 + 25 * 3);
        let iterations = output
            .trace
            .records()
            .iter()
            .map(|r| r.iteration)
            .collect::<Vec<_>>();
        assert_eq!(iterations[0], 32);
        assert!(iterations.windows(2).all(|w| w[1] - w[0] == 3));
        assert!(!output.diagnostics.stopped_early);
    }

    #[test]
    fn callback_can_stop_the_chain() {
        let density = posterior();
        let settings = settings(10, 100, 1);
        let output = chain(&density, &settings, &[1.]).unwrap().run(|progress| {
            if progress.iteration == 19 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(output.diagnostics.stopped_early);
        assert_eq!(output.diagnostics.iterations, 20);
        assert_eq!(output.trace.len(), 10);
    }

    #[test]
    fn progress_reports_tuning_phase() {
        let density = posterior();
        let settings = settings(2, 2, 1);
        let mut chain = chain(&density, &settings, &[1.]).unwrap();
        let tuning = (0..4).map(|_| chain.draw().1.tuning).collect::<Vec<_>>();
        assert_eq!(tuning, vec![true, true, false, false]);
        assert_eq!(chain.dim(), 1);
    }

    #[test]
    fn scales_are_frozen_after_burn_in() {
        let density = posterior();
        let settings = SamplerSettings {
            adapt: AdaptMethod::Windowed(crate::adapt_strategy::WindowedAdaptOptions {
                window: 5,
                ..Default::default()
            }),
            ..settings(50, 100, 1)
        };
        let mut chain = chain(&density, &settings, &[1.]).unwrap();
        for _ in 0..50 {
            chain.draw();
        }
        let frozen = chain.scales().to_vec();
        for _ in 0..100 {
            let (_, progress) = chain.draw();
            assert_eq!(&*progress.scales, frozen.as_slice());
        }
    }

    #[test]
    fn degenerate_start_is_fatal() {
        let density = posterior();
        let settings = settings(10, 10, 1);
        // Inside the prior but outside the natural support.
        assert!(matches!(
            chain(&density, &settings, &[0.]),
            Err(ConfigError::DegenerateStart(DensityError::DomainViolation { .. }))
        ));
        assert!(matches!(
            chain(&density, &settings, &[150.]),
            Err(ConfigError::InitialOutsidePrior { name: "xi1", .. })
        ));
        assert!(matches!(
            chain(&density, &settings, &[1., 1.]),
            Err(ConfigError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn invalid_settings_are_fatal() {
        let density = posterior();
        assert!(matches!(
            chain(&density, &settings(10, 10, 0), &[1.]),
            Err(ConfigError::InvalidSettings(_))
        ));
        assert!(matches!(
            chain(&density, &settings(10, 0, 1), &[1.]),
            Err(ConfigError::InvalidSettings(_))
        ));
    }
}
