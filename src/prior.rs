use crate::{distribution::MixtureParams, error::ConfigError};

/// Closed interval `[lower, upper]` of a uniform prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Bounds { lower, upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }

    /// Log of the unnormalised uniform density: zero inside, `-inf` outside.
    pub fn log_density(&self, value: f64) -> f64 {
        if self.contains(value) {
            0.
        } else {
            f64::NEG_INFINITY
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper {
            Ok(())
        } else {
            Err(ConfigError::InvalidPriorBounds {
                name,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Independent uniform priors, one per named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Prior {
    names: &'static [&'static str],
    bounds: Box<[Bounds]>,
}

impl Prior {
    pub(crate) fn new(
        names: &'static [&'static str],
        bounds: Vec<Bounds>,
    ) -> Result<Self, ConfigError> {
        if names.len() != bounds.len() {
            return Err(ConfigError::DimensionMismatch {
                expected: names.len(),
                found: bounds.len(),
            });
        }
        for (&name, bound) in names.iter().zip(bounds.iter()) {
            bound.validate(name)?;
        }
        Ok(Prior {
            names,
            bounds: bounds.into(),
        })
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// Index of the first parameter outside its bounds.
    pub fn violation(&self, position: &[f64]) -> Option<usize> {
        position
            .iter()
            .zip(self.bounds.iter())
            .position(|(&value, bound)| !bound.contains(value))
    }

    pub fn log_density(&self, position: &[f64]) -> f64 {
        match self.violation(position) {
            Some(_) => f64::NEG_INFINITY,
            None => 0.,
        }
    }

    /// Check that `position` is a valid starting point for a chain.
    pub(crate) fn check_initial(&self, position: &[f64]) -> Result<(), ConfigError> {
        if position.len() != self.dim() {
            return Err(ConfigError::DimensionMismatch {
                expected: self.dim(),
                found: position.len(),
            });
        }
        match self.violation(position) {
            Some(idx) => Err(ConfigError::InitialOutsidePrior {
                name: self.names[idx],
                value: position[idx],
                lower: self.bounds[idx].lower,
                upper: self.bounds[idx].upper,
            }),
            None => Ok(()),
        }
    }
}

/// Prior bounds of the power-law model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawPrior {
    pub xi1: Bounds,
}

impl Default for PowerLawPrior {
    fn default() -> Self {
        Self {
            xi1: Bounds::new(0., 100.),
        }
    }
}

impl PowerLawPrior {
    pub const NAMES: &'static [&'static str] = &["xi1"];

    pub(crate) fn build(self) -> Result<Prior, ConfigError> {
        Prior::new(Self::NAMES, vec![self.xi1])
    }
}

/// Prior bounds of the mixture model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixturePrior {
    pub xi1: Bounds,
    pub shape: Bounds,
    pub scale: Bounds,
}

impl Default for MixturePrior {
    fn default() -> Self {
        Self {
            xi1: Bounds::new(0., 100.),
            shape: Bounds::new(0., 10.),
            scale: Bounds::new(0., 1000.),
        }
    }
}

impl MixturePrior {
    pub(crate) fn build(self) -> Result<Prior, ConfigError> {
        Prior::new(MixtureParams::NAMES, vec![self.xi1, self.shape, self.scale])
    }
}
