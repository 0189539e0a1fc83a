use itertools::izip;

use crate::{
    dual_avg::{DualAverage, DualAverageOptions, RunningMean},
    error::ConfigError,
};

const LOWER_LIMIT: f64 = 1e-10f64;
const UPPER_LIMIT: f64 = 1e10f64;

/// Tunes the per-parameter proposal scales during burn-in.
///
/// `accept_prob` and `accepted` hold one entry per parameter. With block
/// updates every entry is the outcome of the shared joint proposal.
pub trait AdaptStrategy {
    fn init(&mut self, scales: &[f64]);

    fn adapt(&mut self, iteration: u64, accept_prob: &[f64], accepted: &[bool], scales: &mut [f64]);

    /// Called once after the last burn-in iteration. Scales are frozen afterwards.
    fn finalize(&mut self, scales: &mut [f64]);
}

/// Rescale after every window of iterations whose empirical acceptance rate
/// leaves `[target_low, target_high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowedAdaptOptions {
    pub window: u64,
    pub target_low: f64,
    pub target_high: f64,
    /// Multiplicative step applied to the scale.
    pub factor: f64,
}

impl Default for WindowedAdaptOptions {
    fn default() -> Self {
        Self {
            window: 50,
            target_low: 0.25,
            target_high: 0.5,
            factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualAverageSettings {
    pub target_accept: f64,
    pub params: DualAverageOptions,
}

impl Default for DualAverageSettings {
    fn default() -> Self {
        Self {
            target_accept: 0.44,
            params: DualAverageOptions::default(),
        }
    }
}

/// How proposal scales are tuned during burn-in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdaptMethod {
    Windowed(WindowedAdaptOptions),
    DualAverage(DualAverageSettings),
    /// Keep the initial scales.
    Fixed,
}

impl Default for AdaptMethod {
    fn default() -> Self {
        AdaptMethod::Windowed(WindowedAdaptOptions::default())
    }
}

impl AdaptMethod {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AdaptMethod::Windowed(opts) => {
                if opts.window == 0 {
                    return Err(ConfigError::InvalidSettings(
                        "adaptation window must be positive".into(),
                    ));
                }
                if !(0. < opts.target_low
                    && opts.target_low < opts.target_high
                    && opts.target_high < 1.)
                {
                    return Err(ConfigError::InvalidSettings(format!(
                        "acceptance band [{}, {}] must satisfy 0 < low < high < 1",
                        opts.target_low, opts.target_high
                    )));
                }
                if !(opts.factor > 1. && opts.factor.is_finite()) {
                    return Err(ConfigError::InvalidSettings(format!(
                        "rescaling factor {} must be larger than one",
                        opts.factor
                    )));
                }
            }
            AdaptMethod::DualAverage(settings) => {
                if !(0. < settings.target_accept && settings.target_accept < 1.) {
                    return Err(ConfigError::InvalidSettings(format!(
                        "target acceptance {} must lie in (0, 1)",
                        settings.target_accept
                    )));
                }
                let params = settings.params;
                if !(params.k > 0.5 && params.k <= 1. && params.t0 >= 0. && params.gamma > 0.) {
                    return Err(ConfigError::InvalidSettings(format!(
                        "invalid dual averaging parameters {:?}",
                        params
                    )));
                }
            }
            AdaptMethod::Fixed => {}
        }
        Ok(())
    }
}

fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(LOWER_LIMIT, UPPER_LIMIT)
}

pub struct WindowedAdaptation {
    options: WindowedAdaptOptions,
    acceptance: Vec<RunningMean>,
}

impl WindowedAdaptation {
    pub fn new(options: WindowedAdaptOptions) -> Self {
        Self {
            options,
            acceptance: Vec::new(),
        }
    }
}

impl AdaptStrategy for WindowedAdaptation {
    fn init(&mut self, scales: &[f64]) {
        self.acceptance = vec![RunningMean::new(); scales.len()];
    }

    fn adapt(&mut self, iteration: u64, _accept_prob: &[f64], accepted: &[bool], scales: &mut [f64]) {
        for (idx, (mean, &accepted, scale)) in
            izip!(self.acceptance.iter_mut(), accepted, scales.iter_mut()).enumerate()
        {
            mean.add(if accepted { 1. } else { 0. });
            if mean.count() < self.options.window {
                continue;
            }
            let rate = mean.current();
            mean.reset();

            let old = *scale;
            if rate < self.options.target_low {
                *scale = clamp_scale(old / self.options.factor);
            } else if rate > self.options.target_high {
                *scale = clamp_scale(old * self.options.factor);
            } else {
                continue;
            }
            log::debug!(
                "iteration {}: acceptance {:.3} for parameter {}, scale {:.4e} -> {:.4e}",
                iteration,
                rate,
                idx,
                old,
                *scale
            );
        }
    }

    fn finalize(&mut self, _scales: &mut [f64]) {
        self.acceptance.iter_mut().for_each(RunningMean::reset);
    }
}

pub struct DualAverageAdaptation {
    settings: DualAverageSettings,
    controllers: Vec<DualAverage>,
}

impl DualAverageAdaptation {
    pub fn new(settings: DualAverageSettings) -> Self {
        Self {
            settings,
            controllers: Vec::new(),
        }
    }
}

impl AdaptStrategy for DualAverageAdaptation {
    fn init(&mut self, scales: &[f64]) {
        self.controllers = scales
            .iter()
            .map(|&scale| DualAverage::new(self.settings.params, scale))
            .collect();
    }

    fn adapt(&mut self, _iteration: u64, accept_prob: &[f64], _accepted: &[bool], scales: &mut [f64]) {
        for (controller, &prob, scale) in izip!(self.controllers.iter_mut(), accept_prob, scales.iter_mut()) {
            controller.advance(prob.clamp(0., 1.), self.settings.target_accept);
            *scale = clamp_scale(controller.current_scale());
        }
    }

    fn finalize(&mut self, scales: &mut [f64]) {
        for (controller, scale) in self.controllers.iter().zip(scales.iter_mut()) {
            *scale = clamp_scale(controller.current_scale_adapted());
            log::debug!("final proposal scale {:.4e}", *scale);
        }
    }
}

/// The strategy selected by an [`AdaptMethod`].
pub enum ScaleAdaptation {
    Windowed(WindowedAdaptation),
    DualAverage(DualAverageAdaptation),
    Fixed,
}

impl ScaleAdaptation {
    pub fn new(method: AdaptMethod) -> Self {
        match method {
            AdaptMethod::Windowed(opts) => ScaleAdaptation::Windowed(WindowedAdaptation::new(opts)),
            AdaptMethod::DualAverage(settings) => {
                ScaleAdaptation::DualAverage(DualAverageAdaptation::new(settings))
            }
            AdaptMethod::Fixed => ScaleAdaptation::Fixed,
        }
    }
}

impl AdaptStrategy for ScaleAdaptation {
    fn init(&mut self, scales: &[f64]) {
        match self {
            ScaleAdaptation::Windowed(inner) => inner.init(scales),
            ScaleAdaptation::DualAverage(inner) => inner.init(scales),
            ScaleAdaptation::Fixed => {}
        }
    }

    fn adapt(&mut self, iteration: u64, accept_prob: &[f64], accepted: &[bool], scales: &mut [f64]) {
        match self {
            ScaleAdaptation::Windowed(inner) => inner.adapt(iteration, accept_prob, accepted, scales),
            ScaleAdaptation::DualAverage(inner) => {
                inner.adapt(iteration, accept_prob, accepted, scales)
            }
            ScaleAdaptation::Fixed => {}
        }
    }

    fn finalize(&mut self, scales: &mut [f64]) {
        match self {
            ScaleAdaptation::Windowed(inner) => inner.finalize(scales),
            ScaleAdaptation::DualAverage(inner) => inner.finalize(scales),
            ScaleAdaptation::Fixed => {}
        }
    }
}
