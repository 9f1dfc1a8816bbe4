//! Time-ordered event queue.
//!
//! Events are ordered by `(time, sequence)`. The sequence number is assigned
//! at scheduling time, so events sharing a timestamp execute in the order they
//! were scheduled and every replay of the same inputs produces the same order.

use crate::{DeviceId, SimError, SimTime};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Handle returned by [`EventScheduler::schedule`], used for cancellation.
///
/// The wrapped value is the event's sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventHandle(u64);

impl EventHandle {
    /// The sequence number of the event.
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// A scheduled action together with its ordering key.
#[derive(Debug, Clone)]
pub struct Event<A> {
    /// Virtual time at which the action executes.
    pub time: SimTime,
    /// Insertion handle; breaks ties between equal times.
    pub handle: EventHandle,
    /// Device on whose behalf the event runs, if any.
    pub context: Option<DeviceId>,
    /// The action to execute.
    pub action: A,
}

/// When a call to [`EventScheduler::run`] stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    /// Run until no events remain.
    UntilEmpty,
    /// Run every event scheduled at or before the given time.
    Until(SimTime),
}

/// Counters describing one call to [`EventScheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events executed during the call.
    pub executed: u64,
    /// Virtual time when the call returned.
    pub end_time: SimTime,
    /// Whether events were left in the queue because of the stop time.
    pub stopped_early: bool,
}

/// The discrete-event scheduler.
///
/// The scheduler exclusively owns its queue. Other components only enqueue
/// through [`schedule`](Self::schedule) and remove through
/// [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct EventScheduler<A> {
    now: SimTime,
    next_sequence: u64,
    queue: BTreeMap<(SimTime, u64), (Option<DeviceId>, A)>,
    /// Scheduled time of every pending sequence number.
    pending: HashMap<u64, SimTime>,
    executed: u64,
    cancelled: u64,
}

impl<A> Default for EventScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> EventScheduler<A> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        EventScheduler {
            now: SimTime::ZERO,
            next_sequence: 0,
            queue: BTreeMap::new(),
            pending: HashMap::new(),
            executed: 0,
            cancelled: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `action` at absolute time `time`.
    ///
    /// Fails with [`SimError::CausalityViolation`] if `time` is earlier than
    /// [`now`](Self::now).
    pub fn schedule(
        &mut self,
        time: SimTime,
        action: A,
        context: Option<DeviceId>,
    ) -> crate::Result<EventHandle> {
        if time < self.now {
            return Err(SimError::CausalityViolation {
                scheduled: time,
                now: self.now,
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.insert((time, sequence), (context, action));
        self.pending.insert(sequence, time);
        Ok(EventHandle(sequence))
    }

    /// Schedule `action` after `delay` relative to the current time.
    pub fn schedule_in(
        &mut self,
        delay: SimTime,
        action: A,
        context: Option<DeviceId>,
    ) -> crate::Result<EventHandle> {
        let time = self.now.saturating_add(delay);
        self.schedule(time, action, context)
    }

    /// Remove a pending event so that its action never runs.
    ///
    /// Returns `true` if an event was removed. Cancelling an executed,
    /// already-cancelled or unknown handle is a no-op that returns `false`.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        match self.pending.remove(&handle.0) {
            Some(time) => {
                self.queue.remove(&(time, handle.0));
                self.cancelled += 1;
                true
            }
            None => false,
        }
    }

    /// Whether `handle` refers to an event that has not yet run or been cancelled.
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.pending.contains_key(&handle.0)
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.keys().next().map(|(time, _)| *time)
    }

    /// Total events executed over the scheduler's lifetime.
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// Total events cancelled over the scheduler's lifetime.
    pub fn cancelled_events(&self) -> u64 {
        self.cancelled
    }

    /// Pop the earliest event permitted by `limit` and advance time to it.
    ///
    /// Returns `None` when the queue is empty or the next event lies beyond
    /// the stop time.
    pub fn pop_next(&mut self, limit: RunLimit) -> Option<Event<A>> {
        let (&(time, sequence), _) = self.queue.iter().next()?;
        if let RunLimit::Until(stop) = limit {
            if time > stop {
                return None;
            }
        }
        let (context, action) = self.queue.remove(&(time, sequence))?;
        self.pending.remove(&sequence);
        self.now = time;
        self.executed += 1;
        Some(Event {
            time,
            handle: EventHandle(sequence),
            context,
            action,
        })
    }

    /// Advance the clock to `time` without executing anything.
    ///
    /// Used when a run reaches its stop time with events still pending.
    fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Execute events in order until `limit` is reached or the queue drains.
    ///
    /// Each action runs to completion before the next event is considered.
    /// The handler receives the scheduler so it can schedule follow-up events.
    /// If the handler fails the run stops and the error is returned.
    pub fn run<E, F>(&mut self, limit: RunLimit, mut handler: F) -> Result<RunSummary, E>
    where
        F: FnMut(&mut Self, Event<A>) -> Result<(), E>,
    {
        let mut executed = 0u64;
        while let Some(event) = self.pop_next(limit) {
            trace!(time = %event.time, seq = event.handle.0, "executing event");
            handler(self, event)?;
            executed += 1;
        }
        Ok(self.finish_run(limit, executed))
    }

    /// Close out a run: advance to the stop time if events remain beyond it.
    pub fn finish_run(&mut self, limit: RunLimit, executed: u64) -> RunSummary {
        let stopped_early = match limit {
            RunLimit::Until(stop) if !self.queue.is_empty() => {
                self.advance_to(stop);
                true
            }
            _ => false,
        };
        RunSummary {
            executed,
            end_time: self.now,
            stopped_early,
        }
    }
}
