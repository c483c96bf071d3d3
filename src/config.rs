use std::time::Duration;

/// Default tick period: 20 ms.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(20);

const TICK_PERIOD_ENV: &str = "FARMVM_TICK_PERIOD_MS";

/// Tunables for a [`crate::supervisor::Supervisor`] instance.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// How often the tick loop fires. Default 20 ms.
    pub tick_period: Duration,
    /// Sleep interval between live-status observations in `await`. Default
    /// `2 * tick_period`.
    pub await_poll: Duration,
}

impl SupervisorConfig {
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Reads `tick_period` from the `FARMVM_TICK_PERIOD_MS` environment
    /// variable if set and parseable, otherwise falls back to
    /// [`DEFAULT_TICK_PERIOD`]. A malformed override is logged and ignored
    /// rather than treated as fatal.
    pub fn from_env() -> Self {
        let tick_period = match std::env::var(TICK_PERIOD_ENV) {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                Ok(_) => {
                    log::warn!(
                        "{TICK_PERIOD_ENV}={raw:?} must be a positive integer, using default {DEFAULT_TICK_PERIOD:?}"
                    );
                    DEFAULT_TICK_PERIOD
                }
                Err(_) => {
                    log::warn!(
                        "{TICK_PERIOD_ENV}={raw:?} is not a valid integer, using default {DEFAULT_TICK_PERIOD:?}"
                    );
                    DEFAULT_TICK_PERIOD
                }
            },
            Err(_) => DEFAULT_TICK_PERIOD,
        };
        SupervisorConfigBuilder::default()
            .tick_period(tick_period)
            .build()
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SupervisorConfigBuilder {
    tick_period: Option<Duration>,
    await_poll: Option<Duration>,
}

impl SupervisorConfigBuilder {
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = Some(period);
        self
    }

    pub fn await_poll(mut self, period: Duration) -> Self {
        self.await_poll = Some(period);
        self
    }

    pub fn build(self) -> SupervisorConfig {
        let tick_period = self.tick_period.unwrap_or(DEFAULT_TICK_PERIOD);
        let await_poll = self.await_poll.unwrap_or(tick_period * 2);
        SupervisorConfig {
            tick_period,
            await_poll,
        }
    }
}
