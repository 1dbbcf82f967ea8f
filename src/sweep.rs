//! Shared scaffolding for periodic background reclamation.
//!
//! Both tables in this crate enforce freshness on every read, so a sweep that
//! runs late (or never) costs memory, not correctness. The sweeper is owned
//! by its component and tied to its lifecycle: dropping it cancels the task,
//! and [`Sweeper::shutdown`] joins it.

use crate::{Error, ErrorContext, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub(crate) struct Sweeper {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn a background task that runs `tick` once per `period`.
    pub(crate) fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let token = CancellationToken::new();
        let guard = token.clone();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; the first sweep waits a full period
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    _ = timer.tick() => tick(),
                }
            }
        });
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel the task and wait for it to finish.
    pub(crate) async fn shutdown(mut self) -> Result<()> {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|e| {
                Error::runtime_with_context(
                    format!("sweeper task failed: {e}"),
                    ErrorContext::new().with_source("sweeper"),
                )
            })?;
        }
        Ok(())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
