//! Software debounce for a mechanical push button.
//!
//! [`Debouncer`] is fed one boolean sample per poll and answers with a
//! [`ButtonEvent`] only when a press has been recognised.  It owns no clock;
//! callers pass the sample time, which keeps it deterministic under test.
//!
//! ```text
//! Startup ──released──▶ Released
//!
//! Released ──pressed──▶ Settling ──pressed for `stable`──▶ Latched (emit)
//!     ▲                    │                                  │
//!     └────released────────┘          refractory elapsed      │
//!     └──────────────────────────────── and released ─────────┘
//! ```
//!
//! A bounce while settling restarts the stability timer.  While latched every
//! sample is ignored until the refractory period has passed, and the button
//! must then be seen released before the next press can start settling, so a
//! held button yields exactly one event.  A button already held when
//! sampling starts is treated the same way: nothing is emitted until it has
//! been seen released.

use std::time::{Duration, Instant};

use super::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No released sample seen yet.
    Startup,
    Released,
    Settling { since: Instant },
    Latched { cooldown_until: Instant },
}

/// Turns noisy level samples into discrete presses.
#[derive(Debug, Clone)]
pub struct Debouncer {
    stable: Duration,
    refractory: Duration,
    phase: Phase,
    emitted: u64,
}

impl Debouncer {
    /// * `stable`     — how long the level must stay pressed.
    /// * `refractory` — cooldown after a press during which edges are ignored.
    pub fn new(stable: Duration, refractory: Duration) -> Self {
        Self {
            stable,
            refractory,
            phase: Phase::Startup,
            emitted: 0,
        }
    }

    /// Number of presses recognised so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Feed one sample taken at `now`.
    pub fn sample(&mut self, pressed: bool, now: Instant) -> Option<ButtonEvent> {
        match self.phase {
            Phase::Startup => {
                if !pressed {
                    self.phase = Phase::Released;
                }
                None
            }
            Phase::Released => {
                if pressed {
                    self.phase = Phase::Settling { since: now };
                    return self.try_emit(now);
                }
                None
            }
            Phase::Settling { .. } => {
                if !pressed {
                    self.phase = Phase::Released;
                    return None;
                }
                self.try_emit(now)
            }
            Phase::Latched { cooldown_until } => {
                if now >= cooldown_until && !pressed {
                    self.phase = Phase::Released;
                }
                None
            }
        }
    }

    fn try_emit(&mut self, now: Instant) -> Option<ButtonEvent> {
        let Phase::Settling { since } = self.phase else {
            return None;
        };
        if now.duration_since(since) < self.stable {
            return None;
        }

        self.phase = Phase::Latched {
            cooldown_until: now + self.refractory,
        };
        self.emitted += 1;
        Some(ButtonEvent::at(self.emitted, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STABLE: Duration = Duration::from_millis(50);
    const REFRACTORY: Duration = Duration::from_millis(500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// A debouncer that has already seen the button released at `t0`.
    fn armed() -> (Debouncer, Instant) {
        let mut d = Debouncer::new(STABLE, REFRACTORY);
        let t0 = Instant::now();
        assert!(d.sample(false, t0).is_none());
        (d, t0)
    }

    /// Feed `(offset_ms, pressed)` samples and collect emitted sequence numbers.
    fn run(debouncer: &mut Debouncer, t0: Instant, samples: &[(u64, bool)]) -> Vec<u64> {
        samples
            .iter()
            .filter_map(|&(offset, pressed)| debouncer.sample(pressed, t0 + ms(offset)))
            .map(|e| e.seq)
            .collect()
    }

    #[test]
    fn clean_press_emits_once_after_stable_interval() {
        let (mut d, t0) = armed();

        assert!(d.sample(true, t0).is_none());
        assert!(d.sample(true, t0 + ms(30)).is_none());
        let ev = d.sample(true, t0 + ms(50)).expect("press after 50 ms");
        assert_eq!(ev.seq, 1);
        assert_eq!(ev.at, t0 + ms(50));
    }

    #[test]
    fn bounce_resets_the_stability_timer() {
        let (mut d, t0) = armed();

        // Pressed 40 ms, bounce, pressed again: the clock restarts at 45.
        let emitted = run(
            &mut d,
            t0,
            &[(0, true), (40, true), (42, false), (45, true), (80, true)],
        );
        assert!(emitted.is_empty());

        assert_eq!(d.sample(true, t0 + ms(95)).map(|e| e.seq), Some(1));
    }

    #[test]
    fn heavy_bouncing_yields_exactly_one_press() {
        let (mut d, t0) = armed();

        let mut samples = Vec::new();
        // 20 ms of chatter on the way down.
        for i in 0..20 {
            samples.push((i, i % 2 == 0));
        }
        // Solid contact, then chatter on release inside the refractory window.
        for i in 20..200 {
            samples.push((i, true));
        }
        for i in 200..230 {
            samples.push((i, i % 3 != 0));
        }
        samples.push((240, false));

        assert_eq!(run(&mut d, t0, &samples), vec![1]);
    }

    #[test]
    fn held_button_emits_once() {
        let (mut d, t0) = armed();

        let samples: Vec<_> = (0..5_000).step_by(10).map(|t| (t, true)).collect();
        assert_eq!(run(&mut d, t0, &samples), vec![1]);
    }

    #[test]
    fn next_press_after_release_and_cooldown() {
        let (mut d, t0) = armed();

        let first = run(&mut d, t0, &[(0, true), (60, true), (100, false)]);
        assert_eq!(first, vec![1]);

        // Released but still inside the refractory window: ignored.
        let ignored = run(&mut d, t0, &[(300, true), (400, true), (450, false)]);
        assert!(ignored.is_empty());

        // Cooldown over, release observed, fresh press.
        let second = run(&mut d, t0, &[(600, false), (700, true), (760, true)]);
        assert_eq!(second, vec![2]);
        assert_eq!(d.emitted(), 2);
    }

    #[test]
    fn short_glitch_never_emits() {
        let (mut d, t0) = armed();

        let emitted = run(&mut d, t0, &[(0, true), (10, true), (20, false), (30, false)]);
        assert!(emitted.is_empty());
    }

    #[test]
    fn zero_stable_interval_emits_on_first_pressed_sample() {
        let mut d = Debouncer::new(Duration::ZERO, REFRACTORY);
        let t0 = Instant::now();
        assert!(d.sample(false, t0).is_none());
        assert!(d.sample(true, t0).is_some());
    }

    #[test]
    fn button_held_at_startup_waits_for_release() {
        let mut d = Debouncer::new(STABLE, REFRACTORY);
        let t0 = Instant::now();

        let held: Vec<_> = (0..1_000).step_by(10).map(|t| (t, true)).collect();
        assert!(run(&mut d, t0, &held).is_empty());

        let emitted = run(&mut d, t0, &[(1_000, false), (1_010, true), (1_060, true)]);
        assert_eq!(emitted, vec![1]);
    }
}
