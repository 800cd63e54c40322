use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::reconcile::reconcile;
use super::reconcile::seed;
use crate::metrics::RECONCILE_PASSES;
use crate::metrics::WATCHED_CHILDREN;
use crate::metrics::WATCHER_FAILURES;
use crate::ChildSet;
use crate::ChildWatch;
use crate::Coordinator;
use crate::Result;
use crate::WatchError;

/// Callback run after every successful reconciliation pass.
///
/// Runs inline on the watcher task: the next pass waits until it returns.
pub type OnChange = Box<dyn Fn(&ChildSet) + Send + 'static>;

/// Liveness of a watcher, published on its status channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherStatus {
    /// Seeded and waiting for changes; `passes` counts completed passes
    Watching { passes: u64 },
    /// Stopped by its handle
    Cancelled,
    /// Stopped because re-listing the children failed or the callback panicked
    Failed { reason: String },
}

/// Keeps a [`ChildSet`] in sync with the children of one remote path.
pub struct MembershipWatcher<C>
where
    C: Coordinator,
{
    path: String,
    coordinator: Arc<C>,
    children: Arc<ChildSet>,
    on_change: OnChange,
    shutdown: CancellationToken,
    status_tx: watch::Sender<WatcherStatus>,
    passes: u64,
}

impl<C> MembershipWatcher<C>
where
    C: Coordinator,
{
    /// List and seed `children` from `path`, then spawn the watch loop.
    ///
    /// Fails without spawning anything if the initial listing fails.
    pub async fn start<F>(
        coordinator: Arc<C>,
        path: impl Into<String>,
        children: Arc<ChildSet>,
        on_change: F,
    ) -> Result<WatcherHandle>
    where
        F: Fn(&ChildSet) + Send + 'static,
    {
        Self::start_with_token(coordinator, path, children, on_change, CancellationToken::new()).await
    }

    /// Like [`start`](Self::start), cancelled by `shutdown`. Passing a child of
    /// a shared token lets one cancel stop a group of watchers.
    pub async fn start_with_token<F>(
        coordinator: Arc<C>,
        path: impl Into<String>,
        children: Arc<ChildSet>,
        on_change: F,
        shutdown: CancellationToken,
    ) -> Result<WatcherHandle>
    where
        F: Fn(&ChildSet) + Send + 'static,
    {
        let path = path.into();

        let (initial, child_watch) = coordinator.children_watch(&path).await.map_err(|e| {
            error!(path = %path, "watcher setup failed: {:?}", e);
            e
        })?;
        let delta = seed(&children, &initial);
        if !delta.removed.is_empty() {
            debug!(path = %path, removed = ?delta.removed, "dropped stale entries from reused set");
        }
        WATCHED_CHILDREN
            .with_label_values(&[&path])
            .set(children.len() as i64);

        let (status_tx, status_rx) = watch::channel(WatcherStatus::Watching { passes: 0 });
        let watcher = Self {
            path: path.clone(),
            coordinator,
            children: children.clone(),
            on_change: Box::new(on_change),
            shutdown: shutdown.clone(),
            status_tx,
            passes: 0,
        };
        let join = tokio::spawn(watcher.run(child_watch));

        info!("watcher setup on {}", path);
        Ok(WatcherHandle {
            path,
            children,
            shutdown,
            status: status_rx,
            join,
        })
    }

    async fn run(
        mut self,
        mut child_watch: ChildWatch,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!(path = %self.path, passes = self.passes, "watcher cancelled");
                    self.status_tx.send_replace(WatcherStatus::Cancelled);
                    return Ok(());
                }

                event = child_watch.next() => {
                    match event {
                        Some(event) if !event.is_actionable() => {
                            // Session events leave the watch armed
                            trace!(path = %self.path, ?event, "ignoring non-actionable event");
                            continue;
                        }
                        Some(event) => {
                            debug!(path = %self.path, ?event, "child watch fired");
                        }
                        None => {
                            debug!(path = %self.path, "child watch dropped without firing, re-arming");
                        }
                    }
                    child_watch = self.reconcile_pass().await?;
                }
            }
        }
    }

    /// Re-list and re-arm, apply the delta, then run the callback.
    async fn reconcile_pass(&mut self) -> Result<ChildWatch> {
        let (nodes, next_watch) = match self.coordinator.children_watch(&self.path).await {
            Ok(r) => r,
            Err(e) => {
                error!(path = %self.path, "Error in membership watcher: {:?}", e);
                WATCHER_FAILURES.with_label_values(&[&self.path]).inc();
                self.status_tx.send_replace(WatcherStatus::Failed {
                    reason: e.to_string(),
                });
                return Err(WatchError::Reconcile {
                    path: self.path.clone(),
                    source: Box::new(e),
                }
                .into());
            }
        };

        let delta = reconcile(&self.children, &nodes);
        self.passes += 1;
        RECONCILE_PASSES.with_label_values(&[&self.path]).inc();
        WATCHED_CHILDREN
            .with_label_values(&[&self.path])
            .set(self.children.len() as i64);
        debug!(
            path = %self.path,
            pass = self.passes,
            added = ?delta.added,
            removed = ?delta.removed,
            "children reconciled"
        );

        let on_change = &self.on_change;
        let children: &ChildSet = &self.children;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| on_change(children))) {
            let reason = panic_message(&*payload);
            error!(path = %self.path, "membership change callback panicked: {}", reason);
            WATCHER_FAILURES.with_label_values(&[&self.path]).inc();
            self.status_tx.send_replace(WatcherStatus::Failed {
                reason: format!("change callback panicked: {}", reason),
            });
            return Err(WatchError::CallbackPanicked {
                path: self.path.clone(),
                reason,
            }
            .into());
        }
        self.status_tx
            .send_replace(WatcherStatus::Watching { passes: self.passes });

        Ok(next_watch)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Control handle returned by [`MembershipWatcher::start`].
///
/// Dropping the handle does not stop the watcher; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct WatcherHandle {
    path: String,
    children: Arc<ChildSet>,
    shutdown: CancellationToken,
    status: watch::Receiver<WatcherStatus>,
    join: JoinHandle<Result<()>>,
}

impl WatcherHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn children(&self) -> &Arc<ChildSet> {
        &self.children
    }

    /// Request termination. Returns immediately; the loop stops at its next
    /// suspension point. Use [`join`](Self::join) to wait for it.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn status(&self) -> WatcherStatus {
        self.status.borrow().clone()
    }

    /// Status receiver; fires on every completed pass and on termination.
    pub fn subscribe(&self) -> watch::Receiver<WatcherStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to end. `Ok` after cancellation, the reconciliation
    /// error if the watch died.
    pub async fn join(self) -> Result<()> {
        match self.join.await {
            Ok(r) => r,
            Err(e) => Err(WatchError::TaskFailed(e).into()),
        }
    }
}
