//! Repeating background task, used to clear in-memory state periodically.

use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a repeating task. Dropping it stops the task.
pub struct RepeatingTask {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

/// Run `task` every `interval` on a named background thread.
pub fn schedule_repeating<F>(name: &str, interval: Duration, mut task: F) -> Result<RepeatingTask, String>
where
    F: FnMut() + Send + 'static,
{
    let (stop, ticks) = mpsc::channel::<()>();
    let label = name.to_string();
    let thread = thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            loop {
                match ticks.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("{}: tick", label);
                        task();
                    }
                    // Explicit stop or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .map_err(|e| format!("Failed to start {}: {}", name, e))?;
    Ok(RepeatingTask { stop: Some(stop), thread: Some(thread) })
}

impl RepeatingTask {
    /// Stop the task and wait for its thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
