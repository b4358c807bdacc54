//! Sweep Task
//!
//! Cancellable repeating background task that drives periodic expiry sweeps.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

enum Control {
    Reset,
    Stop,
}

// == Sweep Task ==
/// Handle to a thread that calls `tick` once per `interval`.
///
/// The thread waits on a control channel with the interval as timeout, so
/// rescheduling after each tick is guaranteed by the loop itself. The task
/// ends when:
/// - the handle is cancelled or dropped
/// - `tick` returns `false` (its owner is gone)
///
/// Cancelling never joins the thread: a tick in progress finishes and the
/// thread exits on its next wait. This keeps cancellation safe to call from
/// inside a tick.
#[derive(Debug)]
pub struct SweepTask {
    control: Sender<Control>,
    handle: JoinHandle<()>,
    interval: Duration,
}

impl SweepTask {
    /// Spawns a background sweep task.
    ///
    /// # Arguments
    /// * `name` - Label used for the thread name and log lines
    /// * `interval` - Time between ticks
    /// * `tick` - Sweep body; return `false` to end the task
    ///
    /// # Example
    /// ```ignore
    /// let task = SweepTask::spawn("TimeCache", Duration::from_secs(1), move || {
    ///     cache.clear_expired();
    ///     true
    /// })?;
    /// // Later:
    /// task.cancel();
    /// ```
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (control, commands) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("{}-sweep", name.to_lowercase()))
            .spawn(move || {
                info!(
                    "Starting {} sweep task with interval of {:?}",
                    name, interval
                );

                loop {
                    match commands.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !tick() {
                                debug!("{} sweep task owner dropped", name);
                                break;
                            }
                        }
                        Ok(Control::Reset) => continue,
                        Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                info!("{} sweep task stopped", name);
            })?;

        Ok(Self {
            control,
            handle,
            interval,
        })
    }

    /// Restarts the countdown to the next tick.
    pub fn reset(&self) {
        // a send error means the thread already exited
        let _ = self.control.send(Control::Reset);
    }

    /// Stops scheduling further ticks.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Stop);
    }
}
