use std::time::{Duration, Instant};

/// Holds back a changing value until it has been left alone for `delay`.
///
/// The caller feeds every change through [`Debouncer::update`] and polls
/// from its tick loop; [`Debouncer::poll`] yields each settled value once.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
    settled: T,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            settled: initial,
        }
    }

    pub fn update(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Skip the wait, e.g. when the user presses Enter.
    pub fn flush(&mut self) -> Option<T> {
        let (value, _) = self.pending.take()?;
        self.settle(value)
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                let (value, _) = self.pending.take()?;
                self.settle(value)
            }
            _ => None,
        }
    }

    fn settle(&mut self, value: T) -> Option<T> {
        if value == self.settled {
            return None;
        }
        self.settled = value.clone();
        Some(value)
    }

    pub fn settled(&self) -> &T {
        &self.settled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_last_value_settles() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut d = Debouncer::new(String::new(), ms(300));

        d.update("p".into(), start);
        d.update("pi".into(), start + ms(100));
        d.update("pik".into(), start + ms(200));
        assert_eq!(d.poll(start + ms(400)), None);
        assert_eq!(d.poll(start + ms(500)), Some("pik".to_string()));
        assert_eq!(d.poll(start + ms(900)), None);
        assert_eq!(d.settled(), "pik");
    }

    #[test]
    fn unchanged_value_does_not_fire() {
        let start = Instant::now();
        let mut d = Debouncer::new("pika".to_string(), Duration::from_millis(10));
        d.update("pika".into(), start);
        assert_eq!(d.poll(start + Duration::from_millis(20)), None);
        assert!(!d.is_pending());
    }

    #[test]
    fn flush_settles_immediately() {
        let mut d = Debouncer::new(0u32, Duration::from_secs(60));
        d.update(7, Instant::now());
        assert_eq!(d.flush(), Some(7));
        assert_eq!(d.flush(), None);
    }
}
