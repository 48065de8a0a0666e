//! Fixed-interval scheduler driving every live session.
//!
//! Runs on a dedicated blocking thread: each pass snapshots the session ids,
//! ticks each session once, and reaps the ones whose inactivity grace period
//! ran out. A session removed mid-pass just stops resolving.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ServerConfig;
use crate::directory::sessions::SessionDirectory;
use crate::game::entity::SessionId;

pub struct Scheduler {
    sessions: Arc<SessionDirectory>,
    shutdown: Arc<AtomicBool>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        sessions: Arc<SessionDirectory>,
        config: &ServerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sessions,
            shutdown,
            interval: Duration::from_millis(config.process_interval_ms),
        }
    }

    /// Tick every session once; returns the ids reaped this pass.
    pub fn pass(&self) -> Vec<SessionId> {
        let mut reaped = Vec::new();
        for id in self.sessions.session_ids() {
            // Clone the handle out so the directory lock is not held while
            // the session runs.
            let Some(handle) = self.sessions.get(id) else {
                continue;
            };
            let mut session = handle.lock();
            session.process();
            if session.is_inactive() {
                drop(session);
                if self.sessions.remove(id).is_ok() {
                    info!(session = id, "inactive session reaped");
                    reaped.push(id);
                }
            }
        }
        reaped
    }

    /// Blocking loop until the shutdown flag is raised.
    pub fn run(&self) {
        info!(interval_ms = self.interval.as_millis() as u64, "scheduler running");
        while !self.shutdown.load(Ordering::Acquire) {
            self.pass();
            std::thread::sleep(self.interval);
        }
        info!("scheduler stopped");
    }
}
