use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::SimError;

/// Default window before a student first shows up
pub const DEFAULT_ARRIVAL_DELAY: DelayRange = DelayRange::new(100, 1500);

/// Default backoff after finding every chair taken
pub const DEFAULT_RETRY_DELAY: DelayRange = DelayRange::new(500, 2000);

/// Default length of one help session
pub const DEFAULT_SERVICE_TIME: DelayRange = DelayRange::new(500, 2000);

/// Inclusive range of milliseconds a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draws a duration uniformly from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let ms = if self.min_ms >= self.max_ms {
            self.min_ms
        } else {
            rng.gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }
}

impl fmt::Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_ms, self.max_ms)
    }
}

/// Parses `"min-max"` or a single fixed value such as `"250"`
impl FromStr for DelayRange {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| SimError::ConfigurationParseFailed(format!("delay range {:?}", s)))
        };

        match s.split_once('-') {
            Some((min, max)) => Ok(Self::new(parse(min)?, parse(max)?)),
            None => {
                let fixed = parse(s)?;
                Ok(Self::new(fixed, fixed))
            }
        }
    }
}

/// Delay windows for every randomized pause in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub arrival: DelayRange,
    pub retry: DelayRange,
    pub service: DelayRange,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            arrival: DEFAULT_ARRIVAL_DELAY,
            retry: DEFAULT_RETRY_DELAY,
            service: DEFAULT_SERVICE_TIME,
        }
    }
}

impl Timing {
    /// Same fixed window for every pause; handy for fast runs
    pub fn uniform(range: DelayRange) -> Self {
        Self {
            arrival: range,
            retry: range,
            service: range,
        }
    }
}

/// Randomized delay source owned by a single actor
pub struct Pacer {
    rng: StdRng,
}

impl Pacer {
    /// Seeds the generator from `seed + actor_id` when a seed is configured so
    /// every actor gets its own reproducible stream.
    pub fn for_actor(seed: Option<u64>, actor_id: u64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(actor_id)),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn draw(&mut self, range: DelayRange) -> Duration {
        range.sample(&mut self.rng)
    }

    /// Sleeps for a duration drawn from `range` and returns it
    pub async fn pause(&mut self, range: DelayRange) -> Duration {
        let delay = self.draw(range);
        sleep(delay).await;
        delay
    }
}
