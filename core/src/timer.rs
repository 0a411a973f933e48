use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

pub const TIMER_HZ: u32 = 60;

/// Delay and sound timers. Shared between the engine, which reads and sets
/// them, and the [`TimerClock`], which counts them down.
#[derive(Debug, Default)]
pub struct Timers {
    delay: AtomicU8,
    sound: AtomicU8,
}

impl Timers {
    pub fn delay(&self) -> u8 {
        self.delay.load(Ordering::Acquire)
    }

    pub fn sound(&self) -> u8 {
        self.sound.load(Ordering::Acquire)
    }

    pub fn set_delay(&self, value: u8) {
        self.delay.store(value, Ordering::Release);
    }

    pub fn set_sound(&self, value: u8) {
        self.sound.store(value, Ordering::Release);
    }

    /// Count both timers down by one, stopping at zero.
    pub fn tick(&self) {
        for timer in [&self.delay, &self.sound] {
            // Err means the timer is already at zero
            let _ = timer.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
        }
    }
}

/// Background thread ticking [`Timers`] at a fixed rate.
pub struct TimerClock {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerClock {
    pub fn start(timers: Arc<Timers>, hz: u32) -> std::io::Result<TimerClock> {
        let period = Duration::from_secs(1) / hz.max(1);
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("timer-clock".into())
                .spawn(move || run_clock(&timers, &stop, period))?
        };

        info!("Timer clock started [rate: {}Hz]", hz);
        Ok(TimerClock {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("timer clock thread panicked");
            }
            info!("Timer clock stopped");
        }
    }
}

impl Drop for TimerClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_clock(timers: &Timers, stop: &AtomicBool, period: Duration) {
    let mut next_tick = Instant::now() + period;

    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if let Some(delay) = next_tick.checked_duration_since(now) {
            thread::sleep(delay);
            continue;
        }

        timers.tick();

        // Fell more than a period behind: skip the missed ticks rather than
        // decrementing several times in a row.
        next_tick += period;
        if next_tick < now {
            next_tick = now + period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_decrements() {
        let timers = Timers::default();
        timers.set_delay(10);
        timers.set_sound(18);

        timers.tick();

        assert_eq!(timers.delay(), 9);
        assert_eq!(timers.sound(), 17);
    }

    #[test]
    fn test_tick_stops_at_zero() {
        let timers = Timers::default();
        timers.set_delay(1);

        timers.tick();
        timers.tick();
        timers.tick();

        assert_eq!(timers.delay(), 0);
        assert_eq!(timers.sound(), 0);
    }

    #[test]
    fn test_timers_independent() {
        let timers = Timers::default();
        timers.set_sound(2);

        timers.tick();

        assert_eq!(timers.delay(), 0);
        assert_eq!(timers.sound(), 1);
    }

    #[test]
    fn test_concurrent_ticks_never_lost_or_underflow() {
        let timers = Arc::new(Timers::default());
        timers.set_delay(200);
        timers.set_sound(50);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let timers = Arc::clone(&timers);
                thread::spawn(move || {
                    for _ in 0..25 {
                        timers.tick();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(timers.delay(), 100);
        assert_eq!(timers.sound(), 0);
    }

    #[test]
    fn test_clock_counts_down() {
        let timers = Arc::new(Timers::default());
        timers.set_delay(3);
        timers.set_sound(255);

        let clock = TimerClock::start(Arc::clone(&timers), TIMER_HZ).unwrap();
        thread::sleep(Duration::from_millis(200));
        clock.stop();

        assert_eq!(timers.delay(), 0);
        assert!(timers.sound() < 255);
    }

    #[test]
    fn test_clock_stops_ticking_after_stop() {
        let timers = Arc::new(Timers::default());
        let clock = TimerClock::start(Arc::clone(&timers), TIMER_HZ).unwrap();
        clock.stop();

        timers.set_delay(100);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(timers.delay(), 100);
    }
}
