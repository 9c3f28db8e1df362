use std::{future::Future, time::Duration};

use groupchat_core::{ClientChannels, ClientEvent, PollerKind, PollerStatus};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct RunningPoller {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

/// One repeating background refresh task.
///
/// At most one timer task exists per poller. Ticks run one at a time; a tick
/// that overruns its period causes the missed ticks to be skipped rather than
/// queued. Stopping cancels the in-flight tick and waits for the task to exit.
#[derive(Debug)]
pub struct Poller {
    kind: PollerKind,
    channels: ClientChannels,
    running: Mutex<Option<RunningPoller>>,
}

impl Poller {
    pub fn new(kind: PollerKind, channels: ClientChannels) -> Self {
        Self {
            kind,
            channels,
            running: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start ticking every `period`, replacing any running task.
    ///
    /// The first tick fires one full period after the start.
    pub async fn start<F, Fut>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.running.lock().await;
        let was_running = if let Some(previous) = guard.take() {
            previous.stop.cancel();
            let _ = previous.task.await;
            true
        } else {
            false
        };

        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let kind = self.kind;
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_child.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = stop_child.cancelled() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            debug!(?kind, "poller task exited");
        });

        *guard = Some(RunningPoller { stop, task });
        debug!(
            ?kind,
            period_ms = period.as_millis() as u64,
            restarted = was_running,
            "poller started"
        );
        if !was_running {
            self.emit_status(true);
        }
    }

    /// Stop the task and wait for it to exit. Returns `false` when idle.
    pub async fn stop(&self) -> bool {
        let running = {
            let mut guard = self.running.lock().await;
            guard.take()
        };

        let Some(running) = running else {
            return false;
        };

        running.stop.cancel();
        let _ = running.task.await;
        debug!(kind = ?self.kind, "poller stopped");
        self.emit_status(false);
        true
    }

    fn emit_status(&self, running: bool) {
        self.channels.emit(ClientEvent::PollerStatus(PollerStatus {
            poller: self.kind,
            running,
        }));
    }
}
