//! Event/timer runtime adapter.
//!
//! The core is written against the [`EventLoop`] capability trait only;
//! [`PollEventLoop`] is the production `poll(2)`-backed implementation,
//! [`SimEventLoop`]/[`SimClock`] drive the test suite deterministically.
//! Timer instants use `embedded_time`'s `Clock`/`Instant<C>` pair, the
//! same generic-clock abstraction a duty-cycle scheduler would use,
//! carried over here to drive the lock timer and the TBC silence timer.

use core::time::Duration;
use std::collections::BinaryHeap;
use std::os::unix::io::RawFd;

use embedded_time::clock::Error as ClockError;
use embedded_time::{Clock, Instant};

use crate::ids::TimerId;

/// Capability interface the core schedules work against:
/// register a fd for read-readiness, register a one-shot timer, cancel
/// a timer. Cancelling an already-fired timer is a no-op.
pub trait EventLoop {
    fn register_fd(&mut self, fd: RawFd);
    fn register_timer(&mut self, id: TimerId, delay: Duration);
    fn cancel_timer(&mut self, id: TimerId);
}

/// What woke the event loop up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Readable(RawFd),
    TimerFired(TimerId),
}

/// Monotonic wall-clock backing [`PollEventLoop`].
#[derive(Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type T = u64;
    const SCALING_FACTOR: embedded_time::rate::Fraction =
        embedded_time::rate::Fraction::new(1, 1_000_000_000);

    fn try_now(&self) -> Result<Instant<Self>, ClockError> {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Ok(Instant::new(nanos as u64))
    }
}

struct PendingTimer {
    deadline_nanos: u64,
    id: TimerId,
}

impl PartialEq for PendingTimer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline_nanos == other.deadline_nanos
    }
}
impl Eq for PendingTimer {}
impl PartialOrd for PendingTimer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingTimer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest deadline.
        other.deadline_nanos.cmp(&self.deadline_nanos)
    }
}

/// `poll(2)`-based [`EventLoop`] for the `dectmon` binary. Cancelled
/// timers are simply left in the heap and filtered out on pop, since a
/// `BinaryHeap` has no efficient arbitrary removal; this matches the
/// "cancel is idempotent, no partial-effect window" guarantee without needing a secondary index.
pub struct PollEventLoop {
    clock: MonotonicClock,
    fds: Vec<RawFd>,
    timers: BinaryHeap<PendingTimer>,
    cancelled: std::collections::HashSet<TimerId>,
}

impl PollEventLoop {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock,
            fds: Vec::new(),
            timers: BinaryHeap::new(),
            cancelled: std::collections::HashSet::new(),
        }
    }

    fn now_nanos(&self) -> u64 {
        self.clock.try_now().map(|i| *i.duration_since_epoch().integer()).unwrap_or(0)
    }

    /// Blocks until a registered fd is readable or the next timer fires,
    /// whichever comes first.
    pub fn poll(&mut self) -> std::io::Result<Wake> {
        loop {
            let timeout_ms = self.timers.peek().map(|t| {
                let now = self.now_nanos();
                (t.deadline_nanos.saturating_sub(now) / 1_000_000) as i32
            });

            let mut pollfds: Vec<libc::pollfd> = self
                .fds
                .iter()
                .map(|&fd| libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                })
                .collect();

            let rc = unsafe {
                libc::poll(
                    pollfds.as_mut_ptr(),
                    pollfds.len() as libc::nfds_t,
                    timeout_ms.unwrap_or(-1),
                )
            };
            if rc < 0 {
                return Err(std::io::Error::last_os_error());
            }
            if rc > 0 {
                if let Some(pfd) = pollfds.iter().find(|p| p.revents & libc::POLLIN != 0) {
                    return Ok(Wake::Readable(pfd.fd));
                }
            }

            if let Some(top) = self.timers.peek() {
                if self.now_nanos() >= top.deadline_nanos {
                    let fired = self.timers.pop().unwrap();
                    if self.cancelled.remove(&fired.id) {
                        continue;
                    }
                    return Ok(Wake::TimerFired(fired.id));
                }
            }
        }
    }
}

impl Default for PollEventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop for PollEventLoop {
    fn register_fd(&mut self, fd: RawFd) {
        self.fds.push(fd);
    }

    fn register_timer(&mut self, id: TimerId, delay: Duration) {
        let deadline_nanos = self.now_nanos() + delay.as_nanos() as u64;
        self.cancelled.remove(&id);
        self.timers.push(PendingTimer { deadline_nanos, id });
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }
}

/// A manually-advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct SimClock {
    now_nanos: std::cell::Cell<u64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_nanos.set(self.now_nanos.get() + by.as_nanos() as u64);
    }
}

impl Clock for SimClock {
    type T = u64;
    const SCALING_FACTOR: embedded_time::rate::Fraction =
        embedded_time::rate::Fraction::new(1, 1_000_000_000);

    fn try_now(&self) -> Result<Instant<Self>, ClockError> {
        Ok(Instant::new(self.now_nanos.get()))
    }
}

/// A fake event loop that records registrations and fires timers only
/// when the test explicitly advances [`SimClock`] past their deadline
/// and calls [`SimEventLoop::fire_due`].
#[derive(Debug, Default)]
pub struct SimEventLoop {
    pub registered_fds: Vec<RawFd>,
    pending: Vec<(TimerId, u64)>,
    cancelled: std::collections::HashSet<TimerId>,
}

impl SimEventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, id: TimerId) -> bool {
        self.pending.iter().any(|(t, _)| *t == id) && !self.cancelled.contains(&id)
    }

    /// Pops and returns every timer whose deadline is `<= now_nanos`,
    /// in deadline order, skipping cancelled ones.
    pub fn fire_due(&mut self, clock: &SimClock) -> Vec<TimerId> {
        let now = clock.try_now().unwrap();
        let now_nanos = *now.duration_since_epoch().integer();
        let mut due = Vec::new();
        self.pending.retain(|&(id, deadline)| {
            if deadline <= now_nanos {
                if !self.cancelled.remove(&id) {
                    due.push(id);
                }
                false
            } else {
                true
            }
        });
        due.sort_by_key(|id| id.index());
        due
    }
}

impl EventLoop for SimEventLoop {
    fn register_fd(&mut self, fd: RawFd) {
        self.registered_fds.push(fd);
    }

    fn register_timer(&mut self, id: TimerId, delay: Duration) {
        // Recorded relative to nanos 0; tests drive `SimClock` directly
        // and pass it to `fire_due`, so the base offset must match.
        self.cancelled.remove(&id);
        self.pending.push((id, delay.as_nanos() as u64));
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_only_after_clock_advances_past_deadline() {
        let clock = SimClock::new();
        let mut ev = SimEventLoop::new();
        ev.register_timer(TimerId(0), Duration::from_secs(15));
        assert!(ev.fire_due(&clock).is_empty());
        clock.advance(Duration::from_secs(14));
        assert!(ev.fire_due(&clock).is_empty());
        clock.advance(Duration::from_secs(2));
        assert_eq!(ev.fire_due(&clock), vec![TimerId(0)]);
    }

    #[test]
    fn cancelling_before_fire_suppresses_it() {
        let clock = SimClock::new();
        let mut ev = SimEventLoop::new();
        ev.register_timer(TimerId(0), Duration::from_secs(1));
        ev.cancel_timer(TimerId(0));
        clock.advance(Duration::from_secs(2));
        assert!(ev.fire_due(&clock).is_empty());
    }

    #[test]
    fn cancelling_an_already_fired_timer_is_a_no_op() {
        let clock = SimClock::new();
        let mut ev = SimEventLoop::new();
        ev.register_timer(TimerId(0), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        assert_eq!(ev.fire_due(&clock), vec![TimerId(0)]);
        ev.cancel_timer(TimerId(0));
        assert!(!ev.is_running(TimerId(0)));
    }
}
