use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::GateError;

/// A fixed window admission gate.
///
/// At most `limit` callers hold a slot at once. A slot is taken on admission and handed back when
/// the returned [`Permit`] is released or dropped. Every `period` a background task zeroes the
/// counter and wakes all waiters whether or not earlier permits are still outstanding, so up to
/// `2 * limit` calls may start across a window boundary.
#[derive(Debug)]
pub struct RateGate {
    shared: Arc<Shared>,
    stop: CancellationToken,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<GateState>,
    notify: Notify,
    limit: u32,
    period: Duration,
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: u32,
    /// Bumped on every window reset. Permits remember the window they were admitted in.
    epoch: u64,
    closed: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Plain integers: a poisoned lock still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a slot if one is free, returning the epoch it was taken in.
    fn try_admit(&self) -> Result<Option<u64>, GateError> {
        let mut state = self.lock();
        if state.closed {
            return Err(GateError::Closed);
        }
        if state.in_flight >= self.limit {
            return Ok(None);
        }
        state.in_flight += 1;
        trace!(in_flight = state.in_flight, limit = self.limit, "slot admitted");
        Ok(Some(state.epoch))
    }

    fn release(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch {
            // The window this slot was taken in has been reset already.
            return;
        }
        assert!(state.in_flight > 0, "rate gate released a slot it never admitted");
        state.in_flight -= 1;
        let has_room = state.in_flight < self.limit;
        trace!(in_flight = state.in_flight, "slot released");
        drop(state);

        if has_room {
            self.notify.notify_one();
        }
    }

    fn reset(&self) {
        let mut state = self.lock();
        let freed = std::mem::take(&mut state.in_flight);
        state.epoch = state.epoch.wrapping_add(1);
        let epoch = state.epoch;
        drop(state);

        self.notify.notify_waiters();
        debug!(freed, epoch, "rate gate window reset");
    }

    fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }
}

impl RateGate {
    /// Create a new [`RateGate`] admitting `limit` callers per `period` and start its reset task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(limit: u32, period: Duration) -> Result<Self, GateError> {
        if limit == 0 {
            return Err(GateError::InvalidConfig("limit must be at least 1"));
        }
        if period.is_zero() {
            return Err(GateError::InvalidConfig("period must be non-zero"));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(GateState::default()),
            notify: Notify::new(),
            limit,
            period,
        });
        let stop = CancellationToken::new();
        let reset_task = tokio::spawn(reset_loop(Arc::clone(&shared), stop.clone()));

        Ok(Self { shared, stop, reset_task: Mutex::new(Some(reset_task)) })
    }

    /// Wait for a free slot and take it.
    ///
    /// Dropping the returned future while it waits abandons the wait without taking a slot.
    pub async fn acquire(&self) -> Result<Permit, GateError> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            // Register before checking, otherwise a release landing in between is missed.
            notified.as_mut().enable();

            if let Some(epoch) = self.shared.try_admit()? {
                return Ok(Permit { shared: Arc::clone(&self.shared), epoch });
            }
            notified.await;
        }
    }

    /// Like [`RateGate::acquire`], giving up with [`GateError::Cancelled`] after `deadline`.
    pub async fn acquire_timeout(&self, deadline: Duration) -> Result<Permit, GateError> {
        time::timeout(deadline, self.acquire()).await.map_err(|_| GateError::Cancelled)?
    }

    /// Like [`RateGate::acquire`], giving up with [`GateError::Cancelled`] once `cancel` fires.
    pub async fn acquire_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Permit, GateError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GateError::Cancelled),
            permit = self.acquire() => permit,
        }
    }

    /// Number of slots taken in the current window.
    pub fn in_flight(&self) -> u32 {
        self.shared.lock().in_flight
    }

    /// Maximum number of slots per window.
    pub fn limit(&self) -> u32 {
        self.shared.limit
    }

    /// Length of a window.
    pub fn period(&self) -> Duration {
        self.shared.period
    }

    /// Whether [`RateGate::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Close the gate and stop the reset task.
    ///
    /// Blocked and future callers of `acquire` fail with [`GateError::Closed`]. Outstanding
    /// permits may still be released.
    pub async fn shutdown(&self) {
        self.shared.close();
        self.stop.cancel();

        let task = self.reset_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(%e, "rate gate reset task did not stop cleanly");
            }
        }
    }
}

impl Drop for RateGate {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn reset_loop(shared: Arc<Shared>, stop: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + shared.period, shared.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = interval.tick() => shared.reset(),
        }
    }
    debug!("rate gate reset task stopped");
}

/// A slot held in a [`RateGate`].
///
/// The slot goes back to the gate when the permit is dropped. A permit taken before a window reset
/// is not subtracted from the new window.
#[derive(Debug)]
#[must_use = "dropping a permit hands its slot back immediately"]
pub struct Permit {
    shared: Arc<Shared>,
    epoch: u64,
}

impl Permit {
    /// Hand the slot back to the gate.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.shared.release(self.epoch);
    }
}
