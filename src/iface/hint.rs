use super::Config;
use crate::time::{Duration, Instant};
use crate::wire::Ipv6Address;

/// A Return-Routability hint: a local signal telling the mobility
/// daemon, through its signaling socket, that route optimization toward
/// `destination` is worth (re)starting on behalf of `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RrHint {
    /// The correspondent the handshake should be run with.
    pub destination: Ipv6Address,
    /// The home address the handshake is for.
    pub source: Ipv6Address,
}

/// Rate limiter for Return-Routability hints.
///
/// Every reverse-tunneled data packet is a candidate trigger, so hints
/// are throttled to [Config::hint_rate_limit] per one-second window.
/// Suppression is advisory: a dropped hint only delays route
/// optimization until the next window.
///
/// [Config::hint_rate_limit]: struct.Config.html#structfield.hint_rate_limit
#[derive(Debug)]
pub struct HintLimiter {
    window_start: Instant,
    sent_in_window: u32,
}

impl HintLimiter {
    const WINDOW: Duration = Duration::from_millis(1_000);

    /// Create a limiter with an expired window.
    pub fn new() -> HintLimiter {
        HintLimiter {
            window_start: Instant::ZERO,
            sent_in_window: 0,
        }
    }

    /// Ask to emit a hint toward `destination` on behalf of `source`.
    /// Returns the hint to put on the signaling channel, or `None` when
    /// the window's budget is spent.
    pub fn notify(
        &mut self,
        config: &Config,
        destination: Ipv6Address,
        source: Ipv6Address,
        timestamp: Instant,
    ) -> Option<RrHint> {
        if timestamp - self.window_start >= Self::WINDOW {
            self.window_start = timestamp;
            self.sent_in_window = 0;
        }

        if self.sent_in_window >= config.hint_rate_limit {
            net_trace!("rr hint: limited toward {}", destination);
            return None;
        }
        self.sent_in_window += 1;
        net_trace!("rr hint: toward {} for {}", destination, source);
        Some(RrHint {
            destination,
            source,
        })
    }
}

impl Default for HintLimiter {
    fn default() -> HintLimiter {
        HintLimiter::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PEER: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 2, 0, 0, 0, 1);
    const HOME: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 1);

    fn config(ceiling: u32) -> Config {
        Config {
            hint_rate_limit: ceiling,
            ..Config::default()
        }
    }

    #[test]
    fn test_second_hint_in_window_suppressed() {
        let mut limiter = HintLimiter::new();
        let config = config(1);

        let hint = limiter.notify(&config, PEER, HOME, Instant::from_millis(0));
        assert_eq!(
            hint,
            Some(RrHint {
                destination: PEER,
                source: HOME,
            })
        );
        assert_eq!(
            limiter.notify(&config, PEER, HOME, Instant::from_millis(500)),
            None
        );
    }

    #[test]
    fn test_window_rollover() {
        let mut limiter = HintLimiter::new();
        let config = config(1);

        assert!(limiter
            .notify(&config, PEER, HOME, Instant::from_millis(0))
            .is_some());
        assert!(limiter
            .notify(&config, PEER, HOME, Instant::from_millis(999))
            .is_none());
        assert!(limiter
            .notify(&config, PEER, HOME, Instant::from_millis(1000))
            .is_some());
    }

    #[test]
    fn test_ceiling() {
        let mut limiter = HintLimiter::new();
        let config = config(3);

        let now = Instant::from_millis(0);
        for _ in 0..3 {
            assert!(limiter.notify(&config, PEER, HOME, now).is_some());
        }
        assert!(limiter.notify(&config, PEER, HOME, now).is_none());
    }

    #[test]
    fn test_zero_ceiling_disables() {
        let mut limiter = HintLimiter::new();
        let config = config(0);

        assert!(limiter
            .notify(&config, PEER, HOME, Instant::from_millis(0))
            .is_none());
    }
}
