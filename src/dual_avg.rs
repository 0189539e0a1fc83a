/// Settings for the dual averaging scale controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualAverageOptions {
    pub k: f64,
    pub t0: f64,
    pub gamma: f64,
}

impl Default for DualAverageOptions {
    fn default() -> DualAverageOptions {
        DualAverageOptions {
            k: 0.75,
            t0: 10.,
            gamma: 0.05,
        }
    }
}

/// Nesterov dual averaging on the log of a proposal scale.
///
/// `advance` pushes the scale down while the observed acceptance is below
/// the target and up while it is above.
#[derive(Debug, Clone)]
pub struct DualAverage {
    log_scale: f64,
    log_scale_adapted: f64,
    hbar: f64,
    mu: f64,
    count: u64,
    settings: DualAverageOptions,
}

impl DualAverage {
    pub fn new(settings: DualAverageOptions, initial_scale: f64) -> DualAverage {
        DualAverage {
            log_scale: initial_scale.ln(),
            log_scale_adapted: initial_scale.ln(),
            hbar: 0.,
            mu: (10. * initial_scale).ln(),
            count: 1,
            settings,
        }
    }

    pub fn advance(&mut self, accept_stat: f64, target: f64) {
        let w = 1. / (self.count as f64 + self.settings.t0);
        self.hbar = (1. - w) * self.hbar + w * (target - accept_stat);
        self.log_scale = self.mu - self.hbar * (self.count as f64).sqrt() / self.settings.gamma;
        let mk = (self.count as f64).powf(-self.settings.k);
        self.log_scale_adapted = mk * self.log_scale + (1. - mk) * self.log_scale_adapted;
        self.count += 1;
    }

    pub fn current_scale(&self) -> f64 {
        self.log_scale.exp()
    }

    /// The averaged iterate, used once adaptation stops.
    pub fn current_scale_adapted(&self) -> f64 {
        self.log_scale_adapted.exp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunningMean {
    sum: f64,
    count: u64,
}

impl RunningMean {
    pub(crate) fn new() -> RunningMean {
        RunningMean { sum: 0., count: 0 }
    }

    pub(crate) fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn current(&self) -> f64 {
        self.sum / self.count as f64
    }

    pub(crate) fn reset(&mut self) {
        self.sum = 0f64;
        self.count = 0;
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}
