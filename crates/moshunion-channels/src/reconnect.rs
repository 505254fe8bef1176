//! Client-side subscription upkeep: reconnect with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use moshunion_core::{config::ReconnectConfig, TourId};
use rand::Rng;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::ChannelError;

/// Backoff schedule for re-establishing a dropped subscription.
///
/// Delay for attempt `n` (1-based) is `base * 2^(n-1)`, capped at `max`, then
/// spread by ±`jitter` of itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub max: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub jitter: f64,
}

impl ReconnectPolicy {
    pub fn from_config(cfg: &ReconnectConfig) -> Self {
        Self {
            base: Duration::from_millis(cfg.base_ms.max(1)),
            max: Duration::from_millis(cfg.max_ms.max(cfg.base_ms.max(1))),
            max_attempts: (cfg.max_attempts > 0).then_some(cfg.max_attempts),
            jitter: cfg.jitter.clamp(0.0, 1.0),
        }
    }

    /// Un-jittered delay before attempt `attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << exp).min(self.max)
    }

    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = 1.0 + rng.gen_range(-self.jitter..=self.jitter);
        base.mul_f64(factor.max(0.0))
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

/// A remote feed of frames for one tour.
#[async_trait]
pub trait SubscriptionTransport: Send {
    fn name(&self) -> &str;

    /// (Re-)establish the connection and join `tour_id`.
    async fn open(&mut self, tour_id: &TourId) -> Result<(), ChannelError>;

    /// Next text frame. `None` means the peer closed the stream.
    async fn next_message(&mut self) -> Option<Result<String, ChannelError>>;
}

/// Keep `transport` subscribed to `tour_id`, handing every frame to
/// `on_message`, until shutdown is signalled or the policy gives up.
///
/// The attempt counter resets after every successful open.
pub async fn run_subscription<T, F>(
    transport: &mut T,
    tour_id: &TourId,
    policy: &ReconnectPolicy,
    mut on_message: F,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ChannelError>
where
    T: SubscriptionTransport + ?Sized,
    F: FnMut(String) + Send,
{
    let mut attempt: u32 = 0;
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let opened = tokio::select! {
            res = transport.open(tour_id) => res,
            _ = shutdown.changed() => return Ok(()),
        };

        match opened {
            Ok(()) => {
                attempt = 0;
                info!(transport = transport.name(), tour_id = %tour_id, "subscription open");
                loop {
                    let next = tokio::select! {
                        msg = transport.next_message() => msg,
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return Ok(());
                            }
                            continue;
                        }
                    };
                    match next {
                        Some(Ok(text)) => on_message(text),
                        Some(Err(e)) => {
                            warn!(transport = transport.name(), error = %e, "subscription error");
                            break;
                        }
                        None => {
                            warn!(transport = transport.name(), "subscription closed by peer");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(transport = transport.name(), error = %e, attempt = attempt + 1, "subscription open failed");
            }
        }

        attempt += 1;
        if policy.exhausted(attempt) {
            return Err(ChannelError::ConnectionFailed(format!(
                "{} gave up after {} attempts",
                transport.name(),
                attempt - 1
            )));
        }
        let delay = policy.delay_for(attempt, &mut rand::thread_rng());
        info!(transport = transport.name(), attempt, delay_ms = delay.as_millis() as u64, "reconnecting");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn policy(max_attempts: Option<u32>) -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(1),
            max: Duration::from_millis(4),
            max_attempts,
            jitter: 0.0,
        }
    }

    #[test]
    fn delays_grow_then_cap() {
        let p = ReconnectPolicy {
            base: Duration::from_millis(500),
            max: Duration::from_millis(30_000),
            max_attempts: None,
            jitter: 0.0,
        };
        assert_eq!(p.base_delay(1), Duration::from_millis(500));
        assert_eq!(p.base_delay(2), Duration::from_millis(1000));
        assert_eq!(p.base_delay(3), Duration::from_millis(2000));
        assert_eq!(p.base_delay(10), Duration::from_millis(30_000));
        assert_eq!(p.base_delay(1000), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_in_band() {
        let p = ReconnectPolicy {
            jitter: 0.2,
            ..ReconnectPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..8 {
            let base = p.base_delay(attempt).as_secs_f64();
            let d = p.delay_for(attempt, &mut rng).as_secs_f64();
            assert!(d >= base * 0.8 - 1e-9 && d <= base * 1.2 + 1e-9);
        }
    }

    #[test]
    fn zero_max_attempts_means_forever() {
        let p = ReconnectPolicy::from_config(&ReconnectConfig {
            max_attempts: 0,
            ..ReconnectConfig::default()
        });
        assert!(p.max_attempts.is_none());
        assert!(!p.exhausted(u32::MAX));
    }

    /// Scripted transport: each `open` pops one script; a script is the list
    /// of frames served before the stream ends.
    struct Scripted {
        opens: VecDeque<Result<Vec<String>, ChannelError>>,
        current: VecDeque<String>,
        open_calls: u32,
    }

    #[async_trait]
    impl SubscriptionTransport for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn open(&mut self, _tour_id: &TourId) -> Result<(), ChannelError> {
            self.open_calls += 1;
            match self.opens.pop_front() {
                Some(Ok(frames)) => {
                    self.current = frames.into();
                    Ok(())
                }
                Some(Err(e)) => Err(e),
                None => Err(ChannelError::ConnectionFailed("script exhausted".into())),
            }
        }

        async fn next_message(&mut self) -> Option<Result<String, ChannelError>> {
            self.current.pop_front().map(Ok)
        }
    }

    #[tokio::test]
    async fn reconnects_and_resumes_delivery() {
        let mut t = Scripted {
            opens: VecDeque::from(vec![
                Ok(vec!["a".to_string(), "b".to_string()]),
                Err(ChannelError::ConnectionFailed("refused".into())),
                Ok(vec!["c".to_string()]),
            ]),
            current: VecDeque::new(),
            open_calls: 0,
        };
        let (_tx, rx) = watch::channel(false);
        let mut seen = Vec::new();
        let res = run_subscription(
            &mut t,
            &TourId::from("t"),
            &policy(Some(2)),
            |m| seen.push(m),
            rx,
        )
        .await;

        // a, b, then a failed open, then c, then two more failures exhaust it
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(matches!(res, Err(ChannelError::ConnectionFailed(_))));
        assert_eq!(t.open_calls, 5);
    }

    #[tokio::test]
    async fn shutdown_stops_retrying() {
        let mut t = Scripted {
            opens: VecDeque::new(),
            current: VecDeque::new(),
            open_calls: 0,
        };
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let res = run_subscription(&mut t, &TourId::from("t"), &policy(None), |_| {}, rx).await;
        assert!(res.is_ok());
        assert_eq!(t.open_calls, 0);
    }
}
