use std::time::Instant;

/// Media-time clock for a playing source.
///
/// Position accumulated over earlier running windows lives in
/// `position_baseline`; while running it combines with `running_anchor`
/// and `rate` to give the live position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    rate: f64,
    position_baseline: f64,
    running_anchor: Option<Instant>,
    duration: Option<f64>,
}

impl PlaybackClock {
    /// `duration` is `None` for unbounded sources such as a live camera.
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            rate: 1.0,
            position_baseline: 0.0,
            running_anchor: None,
            duration,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    pub fn position_at(&self, now: Instant) -> f64 {
        let live = match self.running_anchor {
            Some(anchor) => {
                let elapsed = now.saturating_duration_since(anchor).as_secs_f64();
                self.position_baseline + elapsed * self.rate
            }
            None => self.position_baseline,
        };
        match self.duration {
            Some(duration) => live.min(duration),
            None => live,
        }
    }

    pub fn position(&self) -> f64 {
        self.position_at(Instant::now())
    }

    pub fn is_ended_at(&self, now: Instant) -> bool {
        self.duration
            .map(|duration| self.position_at(now) >= duration)
            .unwrap_or(false)
    }

    pub fn is_ended(&self) -> bool {
        self.is_ended_at(Instant::now())
    }

    /// Starting an ended clock rewinds it to the beginning.
    pub fn start(&mut self, now: Instant) {
        if self.is_ended_at(now) {
            self.position_baseline = 0.0;
            self.running_anchor = Some(now);
        } else if self.running_anchor.is_none() {
            self.running_anchor = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        self.position_baseline = self.position_at(now);
        self.running_anchor = None;
    }

    /// Takes effect immediately; position so far is kept at the old rate.
    pub fn set_rate(&mut self, rate: f64, now: Instant) {
        if self.running_anchor.is_some() {
            self.position_baseline = self.position_at(now);
            self.running_anchor = Some(now);
        }
        self.rate = rate;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_position_advances_only_while_running() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(None);
        assert_eq!(clock.position_at(t0 + Duration::from_secs(3)), 0.0);

        clock.start(t0);
        assert!((clock.position_at(t0 + Duration::from_millis(1500)) - 1.5).abs() < 1e-9);

        clock.pause(t0 + Duration::from_secs(2));
        assert!((clock.position_at(t0 + Duration::from_secs(10)) - 2.0).abs() < 1e-9);

        clock.start(t0 + Duration::from_secs(10));
        assert!((clock.position_at(t0 + Duration::from_secs(11)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_change_keeps_elapsed_position() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(None);
        clock.start(t0);
        clock.set_rate(2.0, t0 + Duration::from_secs(1));
        let pos = clock.position_at(t0 + Duration::from_secs(2));
        assert!((pos - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_clock_ends_and_restarts() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(Some(1.0));
        clock.start(t0);
        let later = t0 + Duration::from_secs(5);
        assert!(clock.is_ended_at(later));
        assert_eq!(clock.position_at(later), 1.0);

        clock.pause(later);
        clock.start(later);
        assert!(!clock.is_ended_at(later));
        assert_eq!(clock.position_at(later), 0.0);
    }

    #[test]
    fn test_restart_without_pause_rewinds() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(Some(1.0));
        clock.start(t0);
        let later = t0 + Duration::from_secs(3);
        clock.start(later);
        assert!((clock.position_at(later + Duration::from_millis(500)) - 0.5).abs() < 1e-9);
    }
}
