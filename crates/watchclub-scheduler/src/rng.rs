use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Where the shuffle gets its randomness.
///
/// Production reseeds from the clock on every call; tests pin a seed so the
/// resulting permutation can be asserted exactly.
pub trait RngSource: Send + Sync {
    fn rng(&self) -> Box<dyn RngCore + Send>;
}

/// Fresh generator seeded from wall-clock nanoseconds. Not reproducible and
/// not suitable for anything adversarial.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSeeded;

impl RngSource for ClockSeeded {
    fn rng(&self) -> Box<dyn RngCore + Send> {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Box::new(StdRng::seed_from_u64(nanos as u64))
    }
}

/// Every call yields an identical generator.
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u64);

impl RngSource for FixedSeed {
    fn rng(&self) -> Box<dyn RngCore + Send> {
        Box::new(StdRng::seed_from_u64(self.0))
    }
}
