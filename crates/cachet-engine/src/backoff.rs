//! Retry backoff for background anchoring

use std::time::Duration;

/// Delay schedule between anchor retries
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    Constant {
        secs: u64,
    },
    /// Doubles (or whatever the multiplier says) per attempt, capped so a
    /// long outage cannot push retries out indefinitely
    Exponential {
        initial_secs: u64,
        multiplier: f64,
        max_secs: u64,
    },
}

impl BackoffStrategy {
    /// Default schedule for background anchoring: 2s, 4s, 8s, ... capped at
    /// one minute
    pub fn anchoring() -> Self {
        Self::Exponential {
            initial_secs: 2,
            multiplier: 2.0,
            max_secs: 60,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant { secs } => Duration::from_secs(*secs),
            Self::Exponential {
                initial_secs,
                multiplier,
                max_secs,
            } => {
                let secs = (*initial_secs as f64 * multiplier.powi(attempt as i32)) as u64;
                Duration::from_secs(secs.min(*max_secs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_backoff() {
        let strategy = BackoffStrategy::Constant { secs: 5 };
        assert_eq!(strategy.delay(0), Duration::from_secs(5));
        assert_eq!(strategy.delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let strategy = BackoffStrategy::Exponential {
            initial_secs: 2,
            multiplier: 2.0,
            max_secs: 60,
        };
        assert_eq!(strategy.delay(0), Duration::from_secs(2));
        assert_eq!(strategy.delay(1), Duration::from_secs(4));
        assert_eq!(strategy.delay(2), Duration::from_secs(8));
        assert_eq!(strategy.delay(10), Duration::from_secs(60));
    }
}
