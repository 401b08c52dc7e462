//! The WSPR task: single consumer of the event mailbox.
//!
//! # Contract
//!
//! "Every notification is handled exactly once, one at a time, in
//! priority order."
//!
//! A failed handler does not stop the task: the error is recorded in the
//! [`FaultState`](crate::fault::FaultState), logged, and the next
//! notification is handled normally.

use rand::RngCore;

use crate::config::SettingsStore;
use crate::event::EventKind;
use crate::hal::{RealTimeClock, StatusLamp, SymbolTimer, Synthesizer};
use crate::mailbox::EventMailbox;
use crate::rt_error;
use crate::scheduler::{Scheduler, SchedulerError};

/// Owns the scheduler and feeds it from the mailbox.
///
/// # Example
///
/// ```ignore
/// static MAILBOX: EventMailbox = EventMailbox::new();
///
/// let mut task = WsprTask::new(&MAILBOX, scheduler);
///
/// loop {
///     task.run_pending();
///     // wait for the next notification...
/// }
/// ```
pub struct WsprTask<'a, Y, C, T, L, S, R> {
    mailbox: &'a EventMailbox,
    scheduler: Scheduler<'a, Y, C, T, L, S, R>,
}

impl<'a, Y, C, T, L, S, R> WsprTask<'a, Y, C, T, L, S, R>
where
    Y: Synthesizer,
    C: RealTimeClock,
    T: SymbolTimer,
    L: StatusLamp,
    S: SettingsStore,
    R: RngCore,
{
    pub fn new(mailbox: &'a EventMailbox, scheduler: Scheduler<'a, Y, C, T, L, S, R>) -> Self {
        Self { mailbox, scheduler }
    }

    /// Handle the highest-priority pending notification.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(kind))` - Notification handled
    /// - `Ok(None)` - Mailbox empty
    /// - `Err(e)` - Handler failed, fault recorded
    pub fn tick(&mut self) -> Result<Option<EventKind>, SchedulerError> {
        let Some(notification) = self.mailbox.take() else {
            return Ok(None);
        };
        let kind = notification.event.kind();

        match self.scheduler.dispatch(notification) {
            Ok(()) => Ok(Some(kind)),
            Err(e) => {
                let shared = self.scheduler.shared();
                shared.fault.set(e.fault_code(), e.device_code() as u32);
                rt_error!(shared.log, self.scheduler.now_us(), "{:?} failed: {}", kind, e);
                Err(e)
            }
        }
    }

    /// Handle everything pending. Returns the number of notifications
    /// taken, including failed ones.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.tick() {
                Ok(None) => return handled,
                Ok(Some(_)) | Err(_) => handled += 1,
            }
        }
    }

    pub fn scheduler(&self) -> &Scheduler<'a, Y, C, T, L, S, R> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<'a, Y, C, T, L, S, R> {
        &mut self.scheduler
    }
}
