use thiserror::Error;

/// Problems evaluating a density at a particular parameter vector.
///
/// These never abort a run: the sampler treats them as a log-posterior of
/// negative infinity and rejects the proposal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DensityError {
    #[error("parameter `{name}` = {value} is outside its natural support")]
    DomainViolation { name: &'static str, value: f64 },
    #[error("non-finite intermediate value while evaluating the {what}")]
    NumericInstability { what: &'static str },
}

/// Fatal misconfiguration, reported before any sampling happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("the threshold must be a positive integer")]
    ZeroThreshold,
    #[error("the sample is empty")]
    EmptySample,
    #[error("the sample contains zeros, which must be removed before fitting")]
    ZeroInSample,
    #[error("no observations at or above the threshold {threshold}")]
    NoTailObservations { threshold: u64 },
    #[error("malformed prior bounds for `{name}`: [{lower}, {upper}]")]
    InvalidPriorBounds {
        name: &'static str,
        lower: f64,
        upper: f64,
    },
    #[error("expected {expected} parameters, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("initial value {value} of `{name}` lies outside its prior bounds [{lower}, {upper}]")]
    InitialOutsidePrior {
        name: &'static str,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("the initial point has zero posterior density")]
    DegenerateStart(#[source] DensityError),
    #[error("invalid sampler settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    InvalidParameters(#[from] DensityError),
}
