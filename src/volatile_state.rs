use serenity::all::{ConnectionStage, ShardId, ShardManager};
use std::{fmt, sync::Arc, time::Duration};
use sysinfo::System;
use tokio::time::Instant;

/// State which is lost across sessions
pub struct VolatileState {
    pub started: Instant,
    /// Only available once the client is built, which happens after the handler is created.
    pub shard_manager: Option<Arc<ShardManager>>,
    system: System,
}

impl VolatileState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            shard_manager: None,
            system: System::new(),
        }
    }

    /// Resident memory of this process in bytes
    pub fn memory_usage(&mut self) -> Option<u64> {
        let pid = sysinfo::get_current_pid().ok()?;
        self.system.refresh_process(pid);
        self.system.process(pid).map(|process| process.memory())
    }

    pub fn uptime(&self) -> Uptime {
        Uptime(self.started.elapsed())
    }

    /// Heartbeat round trip of the given shard, if one has been measured yet
    pub async fn gateway_latency(&self, shard_id: ShardId) -> Option<Duration> {
        let shard_manager = self.shard_manager.as_ref()?;
        let runners = shard_manager.runners.lock().await;
        runners.get(&shard_id).and_then(|runner| runner.latency)
    }

    /// Last stage the shard reported, or `None` if it has no runner
    pub async fn shard_stage(&self, shard_id: ShardId) -> Option<ConnectionStage> {
        let shard_manager = self.shard_manager.as_ref()?;
        let runners = shard_manager.runners.lock().await;
        runners.get(&shard_id).map(|runner| runner.stage)
    }
}

/// Elapsed time rendered as `1d 2h 3m 4s`
pub struct Uptime(pub Duration);

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let secs = self.0.as_secs();
        write!(
            f,
            "{}d {}h {}m {}s",
            secs / 86_400,
            secs / 3_600 % 24,
            secs / 60 % 60,
            secs % 60
        )
    }
}
