use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Generates candidate values for one parameter at a time.
///
/// Proposals must be symmetric: the acceptance step uses the plain
/// Metropolis ratio without a Hastings correction.
pub trait Proposal {
    fn propose<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        current: f64,
        scale: f64,
        rng: &mut R,
    ) -> f64;
}

/// Gaussian random walk `current + scale * N(0, 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalk;

impl Proposal for RandomWalk {
    #[inline]
    fn propose<R: Rng + ?Sized>(
        &mut self,
        _index: usize,
        current: f64,
        scale: f64,
        rng: &mut R,
    ) -> f64 {
        let step: f64 = StandardNormal.sample(rng);
        current + scale * step
    }
}
