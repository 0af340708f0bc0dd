//! Tick-driven timers.
//!
//! A [`TimerManager`] advances in 1 ms ticks, driven by the bearer's control
//! executor (or directly by tests, which makes expiry fully deterministic).
//! A [`UniqueTimer`] is a one-shot timer slot: arming it again after expiry
//! reuses the stored duration and callback.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type Callback = Box<dyn FnMut() + Send>;

struct TimerSlot {
    alive: bool,
    deadline: Option<u64>,
    duration_ticks: u64,
    callback: Option<Callback>,
}

#[derive(Default)]
struct TimerPool {
    now: u64,
    slots: Vec<TimerSlot>,
    free: Vec<usize>,
}

/// Shared pool of timers for one bearer.
#[derive(Clone, Default)]
pub struct TimerManager {
    pool: Arc<Mutex<TimerPool>>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_timer(&self) -> UniqueTimer {
        let mut pool = self.pool.lock();
        let slot = TimerSlot {
            alive: true,
            deadline: None,
            duration_ticks: 0,
            callback: None,
        };
        let id = if let Some(id) = pool.free.pop() {
            pool.slots[id] = slot;
            id
        } else {
            pool.slots.push(slot);
            pool.slots.len() - 1
        };
        UniqueTimer {
            id,
            pool: self.pool.clone(),
        }
    }

    /// Advances time by one tick and runs every expired callback.
    ///
    /// Callbacks run outside the pool lock, so they are free to rearm their
    /// own or other timers.
    pub fn tick(&self) {
        let mut due: Vec<(usize, Callback)> = Vec::new();
        {
            let mut pool = self.pool.lock();
            pool.now += 1;
            let now = pool.now;
            for (id, slot) in pool.slots.iter_mut().enumerate() {
                if slot.alive && slot.deadline.is_some_and(|d| d <= now) {
                    slot.deadline = None;
                    if let Some(cb) = slot.callback.take() {
                        due.push((id, cb));
                    }
                }
            }
        }
        for (id, mut cb) in due {
            cb();
            let mut pool = self.pool.lock();
            let slot = &mut pool.slots[id];
            // A new callback installed from within the expiry wins.
            if slot.alive && slot.callback.is_none() {
                slot.callback = Some(cb);
            }
        }
    }

    pub fn tick_many(&self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn now(&self) -> u64 {
        self.pool.lock().now
    }
}

/// Handle to one timer slot. Dropping it releases the slot and cancels any
/// pending expiry.
pub struct UniqueTimer {
    id: usize,
    pool: Arc<Mutex<TimerPool>>,
}

impl UniqueTimer {
    /// Stores the duration and the expiry callback. Does not arm the timer.
    pub fn set(&mut self, duration: Duration, callback: impl FnMut() + Send + 'static) {
        let mut pool = self.pool.lock();
        let slot = &mut pool.slots[self.id];
        slot.duration_ticks = (duration.as_millis() as u64).max(1);
        slot.callback = Some(Box::new(callback));
    }

    /// Arms (or re-arms) the timer with the stored duration.
    pub fn run(&mut self) {
        let mut pool = self.pool.lock();
        let now = pool.now;
        let slot = &mut pool.slots[self.id];
        slot.deadline = Some(now + slot.duration_ticks);
    }

    pub fn stop(&mut self) {
        self.pool.lock().slots[self.id].deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.pool.lock().slots[self.id].deadline.is_some()
    }
}

impl Drop for UniqueTimer {
    fn drop(&mut self) {
        let mut pool = self.pool.lock();
        let slot = &mut pool.slots[self.id];
        slot.alive = false;
        slot.deadline = None;
        slot.callback = None;
        pool.free.push(self.id);
    }
}
