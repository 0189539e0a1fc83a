use std::ops::ControlFlow;

use crandep::{
    fit_mixture, fit_power_law, sample_chain, sample_chains, sample_mixture, sample_power_law,
    AdaptMethod, ConfigError, DualAverageSettings, LogDensity, MetropolisChain, MixtureParams,
    MixturePosterior, MixturePrior, PowerLaw, PowerLawPosterior, PowerLawPrior, Proposal, Sample,
    SamplerSettings, ScaleAdaptation, UpdateScheme, WindowedAdaptOptions,
};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn power_law_data(n: usize, threshold: u64, xi1: f64, seed: u64) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    sample_power_law(n, threshold, xi1, &mut rng).unwrap()
}

fn settings(num_burn: u64, num_draws: u64) -> SamplerSettings {
    SamplerSettings {
        num_burn,
        num_draws,
        seed: 7,
        ..Default::default()
    }
}

#[test]
fn recovers_tail_index_of_a_power_law() {
    let data = power_law_data(1000, 1, 1., 2024);
    let output = fit_power_law(&data, 1, 0.5, PowerLawPrior::default(), &settings(1000, 2000)).unwrap();
    assert_eq!(output.trace.len(), 2000);
    let xi1 = output.trace.posterior_mean_params()[0];
    assert!((xi1 - 1.).abs() < 0.15, "posterior mean {xi1}");

    let summary = &output.trace.summary()[0];
    assert!(summary.q025 < summary.q50 && summary.q50 < summary.q975);
    assert!(summary.ess > 50.);
}

#[test]
fn single_observation_at_threshold_has_finite_likelihood() {
    let sample = Sample::new(&[4]).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 4, PowerLawPrior::default()).unwrap();
    for xi1 in [0.2, 1., 5.] {
        let value = posterior.log_likelihood_at(xi1);
        assert!(value.is_finite());
        assert_eq!(value, PowerLaw::new(4, xi1).unwrap().ln_pmf(4));
    }
}

#[test]
fn empty_tail_is_a_configuration_error() {
    let sample = Sample::new(&[1, 2, 2, 3]).unwrap();
    assert_eq!(
        PowerLawPosterior::new(&sample, 10, PowerLawPrior::default()),
        Err(ConfigError::NoTailObservations { threshold: 10 })
    );
    assert_eq!(
        fit_power_law(&[1, 2, 2, 3], 10, 1., PowerLawPrior::default(), &settings(10, 10)),
        Err(ConfigError::NoTailObservations { threshold: 10 })
    );
}

#[test]
fn same_seed_gives_bit_identical_traces() {
    let data = power_law_data(300, 2, 0.7, 1);
    let sample = Sample::new(&data).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 2, PowerLawPrior::default()).unwrap();
    let settings = settings(200, 300);

    let first = sample_chain(&posterior, &[1.], &settings).unwrap();
    let second = sample_chain(&posterior, &[1.], &settings).unwrap();
    assert_eq!(first.trace.len(), second.trace.len());
    for (a, b) in first.trace.records().iter().zip(second.trace.records()) {
        assert_eq!(a.params[0].to_bits(), b.params[0].to_bits());
        assert_eq!(a.log_posterior.to_bits(), b.log_posterior.to_bits());
        assert_eq!(a.accepted, b.accepted);
    }
    assert_eq!(first.diagnostics, second.diagnostics);

    let other_seed = SamplerSettings { seed: 8, ..settings };
    let third = sample_chain(&posterior, &[1.], &other_seed).unwrap();
    assert_ne!(first.trace, third.trace);
}

#[test]
fn adapted_acceptance_rate_is_reasonable() {
    let data = power_law_data(500, 3, 0.6, 99);
    let sample = Sample::new(&data).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 3, PowerLawPrior::default()).unwrap();

    let methods = [
        AdaptMethod::Windowed(WindowedAdaptOptions::default()),
        AdaptMethod::DualAverage(DualAverageSettings::default()),
    ];
    for adapt in methods {
        let settings = SamplerSettings {
            adapt,
            // far too wide for this posterior
            initial_scale: 5.,
            ..settings(2000, 2000)
        };
        let output = sample_chain(&posterior, &[1.], &settings).unwrap();
        let rate = output.diagnostics.acceptance_rate;
        assert!((0.05..=0.8).contains(&rate), "{adapt:?}: acceptance {rate}");
        assert!(output.diagnostics.final_scales[0] < 5.);
    }
}

/// Always proposes the same fixed point.
struct Jump(Vec<f64>);

impl Proposal for Jump {
    fn propose<R: Rng + ?Sized>(&mut self, index: usize, _: f64, _: f64, _: &mut R) -> f64 {
        self.0[index]
    }
}

#[test]
fn proposals_outside_the_prior_are_never_accepted() {
    let sample = Sample::new(&[1, 2, 3, 10]).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 1, PowerLawPrior::default()).unwrap();
    let settings = settings(20, 50);
    let chain = MetropolisChain::new(
        &posterior,
        ScaleAdaptation::new(settings.adapt),
        Jump(vec![-3.]),
        ChaCha8Rng::seed_from_u64(0),
        &settings,
        0,
        &[0.8],
    )
    .unwrap();
    let output = chain.run(|_| ControlFlow::Continue(()));

    assert_eq!(output.trace.len(), 50);
    for record in output.trace.records() {
        assert_eq!(&*record.params, &[0.8]);
        assert_eq!(&*record.accepted, &[false]);
    }
    assert_eq!(output.diagnostics.prior_rejections, 70);
    assert_eq!(output.diagnostics.acceptance_rate, 0.);
}

#[test]
fn unsupported_proposals_are_counted() {
    let sample = Sample::new(&[1, 2, 3, 10]).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 1, PowerLawPrior::default()).unwrap();
    let settings = settings(0, 10);
    // xi1 = 0 is inside the prior bounds but not a valid power law
    let chain = MetropolisChain::new(
        &posterior,
        ScaleAdaptation::new(AdaptMethod::Fixed),
        Jump(vec![0.]),
        ChaCha8Rng::seed_from_u64(0),
        &settings,
        0,
        &[1.],
    )
    .unwrap();
    let output = chain.run(|_| ControlFlow::Continue(()));
    assert_eq!(output.diagnostics.domain_violations, 10);
    assert_eq!(output.diagnostics.prior_rejections, 0);
    assert!(output.trace.records().iter().all(|r| r.params[0] == 1.));

    let sample = Sample::new(&[1, 2, 30]).unwrap();
    let mixture = MixturePosterior::new(&sample, 20, MixturePrior::default()).unwrap();
    let settings = SamplerSettings {
        update: UpdateScheme::Block,
        ..settings
    };
    // a steep bulk with a tiny scale leaves no mass for the tail
    let chain = MetropolisChain::new(
        &mixture,
        ScaleAdaptation::new(AdaptMethod::Fixed),
        Jump(vec![1., 10., 1e-30]),
        ChaCha8Rng::seed_from_u64(0),
        &settings,
        0,
        &[1., 1., 5.],
    )
    .unwrap();
    let output = chain.run(|_| ControlFlow::Continue(()));
    assert_eq!(output.diagnostics.numeric_failures, 10);
    assert_eq!(mixture.dim(), 3);
}

#[test]
fn recovers_mixture_parameters() {
    let truth = MixtureParams {
        xi1: 0.8,
        shape: 0.9,
        scale: 4.,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let data = sample_mixture(2000, 10, truth, &mut rng).unwrap();
    let init = MixtureParams {
        xi1: 0.5,
        shape: 1.,
        scale: 3.,
    };
    let output = fit_mixture(&data, 10, init, MixturePrior::default(), &settings(3000, 3000)).unwrap();
    let mean = MixtureParams::from_slice(&output.trace.posterior_mean_params()).unwrap();
    assert!((mean.xi1 - truth.xi1).abs() < 0.3, "{mean:?}");
    assert!((mean.shape - truth.shape).abs() < 0.3, "{mean:?}");
    assert!((mean.scale - truth.scale).abs() < 1.5, "{mean:?}");
}

#[test]
fn block_updates_share_one_decision() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let truth = MixtureParams {
        xi1: 0.5,
        shape: 1.2,
        scale: 3.,
    };
    let data = sample_mixture(500, 8, truth, &mut rng).unwrap();
    let settings = SamplerSettings {
        update: UpdateScheme::Block,
        ..settings(1500, 1000)
    };
    let output = fit_mixture(&data, 8, truth, MixturePrior::default(), &settings).unwrap();
    for record in output.trace.records() {
        assert!(record.accepted.iter().all(|&a| a == record.accepted[0]));
    }
    let rate = output.diagnostics.acceptance_rate;
    assert!((0.05..=0.8).contains(&rate), "acceptance {rate}");
}

#[test]
fn parallel_chains_agree() {
    let data = power_law_data(800, 1, 1., 77);
    let sample = Sample::new(&data).unwrap();
    let posterior = PowerLawPosterior::new(&sample, 1, PowerLawPrior::default()).unwrap();
    let settings = SamplerSettings {
        num_chains: 4,
        ..settings(1000, 1000)
    };
    let multi = sample_chains(&posterior, &[2.], &settings).unwrap();
    assert_eq!(multi.chains().len(), 4);
    let rhat = multi.max_rhat().unwrap();
    assert!(rhat < 1.1, "split-R̂ {rhat}");
    let summary = multi.summary();
    assert_eq!(summary[0].name, "xi1");
    assert!((summary[0].mean - 1.).abs() < 0.2);

    let batch = multi.chains()[0].trace.to_arrow().unwrap();
    assert_eq!(batch.num_rows(), 1000);
    assert_eq!(batch.num_columns(), 5);
}
