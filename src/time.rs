/// Converts host timestamps into per-tick deltas.
///
/// Deltas are never negative or non-finite: a timer that runs backward, or a corrupt
/// timestamp, yields a zero delta. Large gaps are clamped to `max_delta`.
pub struct FrameClock {
    last: Option<f64>,
    max_delta: f32,
    pub delta: f32,
    elapsed: f64,
}

impl FrameClock {
    pub fn new(max_delta: f32) -> Self {
        Self { last: None, max_delta: max_delta.max(0.0), delta: 0.0, elapsed: 0.0 }
    }

    /// Advances to the host timestamp `now` (seconds) and returns the sanitized delta.
    pub fn advance_to(&mut self, now: f64) -> f32 {
        let delta = match self.last {
            Some(last) if now.is_finite() => (now - last) as f32,
            _ => 0.0,
        };
        if now.is_finite() {
            self.last = Some(now);
        }
        self.accept(delta)
    }

    /// Accepts a raw delta supplied directly by the host.
    pub fn accept(&mut self, raw: f32) -> f32 {
        let delta = sanitize_delta(raw, self.max_delta);
        self.delta = delta;
        self.elapsed += delta as f64;
        delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed as f32
    }
}

pub fn sanitize_delta(raw: f32, max_delta: f32) -> f32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    raw.min(max_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_timestamp_produces_zero_delta() {
        let mut clock = FrameClock::new(0.25);
        assert_eq!(clock.advance_to(12.0), 0.0);
        let dt = clock.advance_to(12.1);
        assert!((dt - 0.1).abs() < 1e-5);
    }

    #[test]
    fn backward_timer_is_zero_delta() {
        let mut clock = FrameClock::new(0.25);
        clock.advance_to(5.0);
        assert_eq!(clock.advance_to(4.0), 0.0);
        let dt = clock.advance_to(4.05);
        assert!((dt - 0.05).abs() < 1e-5, "clock resumes from the latest timestamp");
    }

    #[test]
    fn non_finite_and_oversized_deltas_are_sanitized() {
        let mut clock = FrameClock::new(0.25);
        assert_eq!(clock.accept(f32::NAN), 0.0);
        assert_eq!(clock.accept(f32::INFINITY), 0.0);
        assert_eq!(clock.accept(-0.3), 0.0);
        assert_eq!(clock.accept(3.0), 0.25);
        assert!((clock.elapsed_seconds() - 0.25).abs() < 1e-6);
    }
}
