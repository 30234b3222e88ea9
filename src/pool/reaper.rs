//! Background idle eviction
//!
//! A thread that calls `StatePool::evict_idle` every `reaper_interval` until
//! it is stopped or the pool is dropped.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};

use crate::error::{Result, StoreError};

use super::StatePool;

/// Handle to a running reaper thread; stops it on drop
pub struct Reaper {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        // Dropping the sender disconnects the channel
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("state reaper thread panicked");
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

impl StatePool {
    /// Start evicting idle states in the background
    ///
    /// The thread holds only a weak reference, so it never keeps the pool
    /// alive.
    pub fn spawn_reaper(self: &Arc<Self>) -> Result<Reaper> {
        if self.config().reaper_interval.is_zero() {
            return Err(StoreError::Config(
                "reaper_interval must be non-zero".to_string(),
            ));
        }

        let pool: Weak<StatePool> = Arc::downgrade(self);
        let ticker = channel::tick(self.config().reaper_interval);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("modstore-reaper".to_string())
            .spawn(move || {
                tracing::debug!("state reaper started");
                loop {
                    channel::select! {
                        recv(ticker) -> _ => {
                            let Some(pool) = pool.upgrade() else { break };
                            pool.evict_idle();
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::debug!("state reaper stopped");
            })?;

        Ok(Reaper {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}
