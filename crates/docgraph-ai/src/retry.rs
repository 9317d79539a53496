use docgraph_core::ResilienceSettings;
use std::str::FromStr;
use std::time::Duration;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// base, 2*base, 3*base, ...
    Linear,
    /// base, 2*base, 4*base, ...
    Exponential,
    /// Exponential with a random 0.5x-1.5x multiplier so simultaneous
    /// clients do not retry in lockstep.
    #[default]
    ExponentialJitter,
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(BackoffStrategy::Fixed),
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            "exponential-jitter" | "jittered" => Ok(BackoffStrategy::ExponentialJitter),
            other => Err(format!("unknown backoff strategy: {}", other)),
        }
    }
}

/// Retry budget and backoff schedule for one provider.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    /// Build from configuration. An unparseable strategy name falls
    /// back to jittered exponential rather than failing the run.
    pub fn from_settings(settings: &ResilienceSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            strategy: settings.strategy.parse().unwrap_or_default(),
        }
    }

    /// Delay to sleep before attempt `attempt + 1`, i.e. after the
    /// `attempt`-th failure (1-based). Always capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let n = attempt.max(1);
        let base = self.base_delay.as_millis() as f64;
        let raw = match self.strategy {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Linear => base * n as f64,
            BackoffStrategy::Exponential => base * 2f64.powi(n as i32 - 1),
            BackoffStrategy::ExponentialJitter => {
                let exp = base * 2f64.powi(n as i32 - 1);
                exp * (0.5 + fastrand::f64())
            }
        };
        let capped = raw.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(strategy: BackoffStrategy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            strategy,
        }
    }

    #[test]
    fn fixed_never_grows() {
        let p = policy(BackoffStrategy::Fixed);
        assert_eq!(p.delay_for(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for(5), Duration::from_millis(1000));
    }

    #[test]
    fn linear_and_exponential_schedules() {
        let lin = policy(BackoffStrategy::Linear);
        assert_eq!(lin.delay_for(3), Duration::from_millis(3000));

        let exp = policy(BackoffStrategy::Exponential);
        assert_eq!(exp.delay_for(1), Duration::from_millis(1000));
        assert_eq!(exp.delay_for(2), Duration::from_millis(2000));
        assert_eq!(exp.delay_for(4), Duration::from_millis(8000));
    }

    #[test]
    fn jitter_stays_within_half_to_one_and_a_half() {
        let p = policy(BackoffStrategy::ExponentialJitter);
        for _ in 0..100 {
            let d = p.delay_for(2); // exponential value is 2000ms
            assert!(d >= Duration::from_millis(1000), "too short: {:?}", d);
            assert!(d <= Duration::from_millis(3000), "too long: {:?}", d);
        }
    }

    #[test]
    fn delays_cap_at_max() {
        let mut p = policy(BackoffStrategy::Exponential);
        p.max_delay = Duration::from_millis(4000);
        assert_eq!(p.delay_for(10), Duration::from_millis(4000));
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(
            "exponential-jitter".parse::<BackoffStrategy>().unwrap(),
            BackoffStrategy::ExponentialJitter
        );
        assert_eq!("FIXED".parse::<BackoffStrategy>().unwrap(), BackoffStrategy::Fixed);
        assert!("bogus".parse::<BackoffStrategy>().is_err());
    }
}
