//! Noise models that can be attached to an origin to perturb its published values.
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// A pluggable model of output noise. The noise is applied independently to
/// every dimension of a real-valued output when the origin republishes it.
pub trait Noise: std::fmt::Debug + Send {
    /// Returns a noisy rendition of a nominal output value over the interval
    /// ending at `time`.
    fn sample(&mut self, time: f64, nominal: f64) -> f64;

    /// Restore the model to its initial state.
    fn reset(&mut self);

    /// An independent copy of the model.
    fn clone_box(&self) -> Box<dyn Noise>;
}

impl Clone for Box<dyn Noise> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Additive zero-mean Gaussian noise with a fixed standard deviation.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    sigma: f64,
    seed: u64,
    rng: StdRng,
}

impl GaussianNoise {
    /// Create a Gaussian noise model. The seed makes runs reproducible.
    /// A negative standard deviation is clamped to zero.
    pub fn new(sigma: f64, seed: u64) -> Self {
        GaussianNoise {
            sigma: sigma.max(0.0),
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the standard deviation of the noise.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Noise for GaussianNoise {
    fn sample(&mut self, _time: f64, nominal: f64) -> f64 {
        let normal = Normal::new(0.0, self.sigma).expect("sigma is non-negative by construction");
        nominal + normal.sample(&mut self.rng)
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn clone_box(&self) -> Box<dyn Noise> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sigma_is_identity() {
        let mut noise = GaussianNoise::new(0.0, 42);
        assert_eq!(noise.sample(0.0, 1.5), 1.5);
    }

    #[test]
    fn test_reset_reproduces_samples() {
        let mut noise = GaussianNoise::new(0.3, 42);
        let first = noise.sample(0.0, 0.0);
        noise.reset();
        assert_eq!(noise.sample(0.0, 0.0), first);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut noise = GaussianNoise::new(0.3, 42);
        let mut clone = noise.clone_box();
        assert_eq!(noise.sample(0.0, 0.0), clone.sample(0.0, 0.0));
    }
}
