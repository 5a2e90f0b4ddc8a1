#![forbid(unsafe_code)]

//! Fixed-interval ticker on a background thread.
//!
//! The ticker only posts messages; all motion work happens on the thread that
//! drains the channel. Deadlines advance by whole intervals from the start
//! instant, so a late wakeup does not shift later ticks. If the consumer falls
//! more than one interval behind, missed deadlines are skipped rather than
//! burst.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use web_time::Instant;

/// Signal observed by the ticker thread.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    /// Create a new stop signal pair (signal, trigger).
    #[must_use]
    pub fn new() -> (Self, StopTrigger) {
        let inner = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: inner.clone(),
        };
        (signal, StopTrigger { inner })
    }

    pub fn is_stopped(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Wait for either the stop signal or a timeout.
    ///
    /// Returns `true` if stopped, `false` if timed out.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock_ref, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut stopped = lock(lock_ref);
        // Loop to absorb spurious wakeups.
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = match cvar.wait_timeout(stopped, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

/// Owner side of a [`StopSignal`].
pub struct StopTrigger {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopTrigger {
    pub fn stop(&self) {
        let (lock_ref, cvar) = &*self.inner;
        *lock(lock_ref) = true;
        cvar.notify_all();
    }
}

fn lock(m: &Mutex<bool>) -> MutexGuard<'_, bool> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Running ticker thread.
pub struct Ticker {
    interval: Duration,
    trigger: StopTrigger,
    thread: Option<thread::JoinHandle<u64>>,
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("interval", &self.interval)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl Ticker {
    /// Start sending `make_msg()` through `sender` every `interval`.
    ///
    /// The thread exits when stopped or when the receiver is dropped.
    pub fn spawn<M: Send + 'static>(
        interval: Duration,
        sender: mpsc::Sender<M>,
        make_msg: impl Fn() -> M + Send + 'static,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let (signal, trigger) = StopSignal::new();
        tracing::debug!(interval_ms = interval.as_millis() as u64, "ticker started");
        let thread = thread::spawn(move || run(interval, &sender, &make_msg, &signal));
        Self {
            interval,
            trigger,
            thread: Some(thread),
        }
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the thread and wait for it. Returns the number of ticks sent.
    pub fn stop(mut self) -> u64 {
        self.trigger.stop();
        let sent = self
            .thread
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0);
        tracing::debug!(ticks = sent, "ticker stopped");
        sent
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.trigger.stop();
    }
}

fn run<M>(
    interval: Duration,
    sender: &mpsc::Sender<M>,
    make_msg: &impl Fn() -> M,
    stop: &StopSignal,
) -> u64 {
    let start = Instant::now();
    let mut sent = 0u64;
    let mut next = start + interval;
    loop {
        let now = Instant::now();
        let wait = next.saturating_duration_since(now);
        if stop.wait_timeout(wait) {
            break;
        }
        if sender.send(make_msg()).is_err() {
            break;
        }
        sent += 1;
        next += interval;
        let now = Instant::now();
        if now > next {
            let behind = now.duration_since(next).as_nanos() / interval.as_nanos().max(1);
            next += interval * (behind as u32 + 1);
        }
    }
    sent
}
