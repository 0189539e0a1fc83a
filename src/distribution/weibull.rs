use crate::{error::DensityError, math::log1mexp};

/// Discrete Weibull distribution on `{1, 2, ...}`.
///
/// `P(X >= x) = exp(-((x - 1) / scale)^shape)`. Used as the bulk below the
/// threshold of the mixture model; `shape < 1` gives a slowly decaying bulk,
/// `shape = 1` a geometric one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteWeibull {
    shape: f64,
    scale: f64,
}

impl DiscreteWeibull {
    pub fn new(shape: f64, scale: f64) -> Result<Self, DensityError> {
        if !(shape > 0. && shape.is_finite()) {
            return Err(DensityError::DomainViolation {
                name: "shape",
                value: shape,
            });
        }
        if !(scale > 0. && scale.is_finite()) {
            return Err(DensityError::DomainViolation {
                name: "scale",
                value: scale,
            });
        }
        Ok(DiscreteWeibull { shape, scale })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `ln P(X >= x)`; the log survival is available in closed form.
    pub fn ln_survival(&self, x: u64) -> f64 {
        if x <= 1 {
            return 0.;
        }
        -((x - 1) as f64 / self.scale).powf(self.shape)
    }

    pub fn ln_pmf(&self, x: u64) -> f64 {
        if x == 0 {
            return f64::NEG_INFINITY;
        }
        let here = self.ln_survival(x);
        if here == f64::NEG_INFINITY {
            return here;
        }
        here + log1mexp(self.ln_survival(x + 1) - here)
    }

    pub fn pmf(&self, x: u64) -> f64 {
        self.ln_pmf(x).exp()
    }

    pub fn survival(&self, x: u64) -> f64 {
        self.ln_survival(x).exp()
    }
}
