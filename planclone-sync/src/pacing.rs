//! Fixed client-side spacing between remote calls.
//!
//! Two pauses exist: a longer one before every detail/attachment token fetch
//! and a shorter one after every task. Both are blocking.

use std::time::Duration;

use planclone_core::PacingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    pub task_interval: Duration,
    pub detail_delay: Duration,
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            task_interval: config.task_interval(),
            detail_delay: config.detail_delay(),
        }
    }
}

/// Something that can wait.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

impl<P: Pause + ?Sized> Pause for &mut P {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration);
    }
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Never waits. Used when no remote writes happen (dry runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Pause for NoPause {
    fn pause(&mut self, _duration: Duration) {}
}

/// Records requested pauses without waiting.
#[derive(Debug, Default, Clone)]
pub struct RecordingPause {
    pub pauses: Vec<Duration>,
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_from_config_converts_millis() {
        let pacing = Pacing::from(&PacingConfig {
            task_interval_ms: 250,
            detail_delay_ms: 1000,
        });
        assert_eq!(pacing.task_interval, Duration::from_millis(250));
        assert_eq!(pacing.detail_delay, Duration::from_secs(1));
    }

    #[test]
    fn borrowed_pause_forwards() {
        fn wait<P: Pause>(mut pause: P) {
            pause.pause(Duration::from_millis(5));
        }
        let mut recorder = RecordingPause::default();
        wait(&mut recorder);
        assert_eq!(recorder.pauses, vec![Duration::from_millis(5)]);
    }

    #[test]
    fn zero_sleep_returns_immediately() {
        ThreadSleep.pause(Duration::ZERO);
        NoPause.pause(Duration::from_secs(3600));
    }
}
