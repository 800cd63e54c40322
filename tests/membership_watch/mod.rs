use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use donut::Acl;
use donut::ChildSet;
use donut::ChildWatch;
use donut::Coordinator;
use donut::Error;
use donut::MemoryCoordinator;
use donut::MembershipWatcher;
use donut::RemoteError;
use donut::Result;
use donut::SessionState;
use donut::Version;
use donut::WatchError;
use donut::WatcherStatus;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::common::coordinator_with;
use crate::common::enable_logger;
use crate::common::sorted_names;
use crate::common::wait_for_passes;
use crate::common::wait_for_termination;

/// Delegates to a memory tree but fails every child listing after the
/// first `healthy_listings`.
struct FlakyCoordinator {
    inner: MemoryCoordinator,
    healthy_listings: usize,
    listings: AtomicUsize,
}

#[async_trait]
impl Coordinator for FlakyCoordinator {
    async fn children_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, ChildWatch)> {
        if self.listings.fetch_add(1, Ordering::SeqCst) >= self.healthy_listings {
            return Err(RemoteError::Unavailable("ensemble has no quorum".into()).into());
        }
        self.inner.children_watch(path).await
    }

    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        acl: Vec<Acl>,
    ) -> Result<String> {
        self.inner.create(path, data, acl).await
    }

    async fn delete(
        &self,
        path: &str,
        version: Version,
    ) -> Result<()> {
        self.inner.delete(path, version).await
    }

    async fn get(
        &self,
        path: &str,
    ) -> Result<Vec<u8>> {
        self.inner.get(path).await
    }
}

#[tokio::test]
async fn test_watcher_tracks_workers_joining_and_leaving() {
    enable_logger();
    let zk = coordinator_with(&["/c1", "/c1/workers", "/c1/workers/w1"]).await;
    let members = Arc::new(ChildSet::new());
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let s = snapshots.clone();

    let handle = MembershipWatcher::start(zk.clone(), "/c1/workers", members.clone(), move |set: &ChildSet| {
        s.lock().push(sorted_names(set));
    })
    .await
    .unwrap();
    assert_eq!(sorted_names(&members), vec!["w1"]);
    let mut status = handle.subscribe();

    zk.create("/c1/workers/w2", Vec::new(), Acl::world_all()).await.unwrap();
    wait_for_passes(&mut status, 1).await;
    assert_eq!(sorted_names(&members), vec!["w1", "w2"]);

    zk.delete("/c1/workers/w1", Version::Any).await.unwrap();
    wait_for_passes(&mut status, 2).await;
    assert_eq!(sorted_names(&members), vec!["w2"]);

    handle.cancel();
    handle.join().await.unwrap();

    let snapshots = snapshots.lock();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0], vec!["w1", "w2"]);
    assert_eq!(snapshots[1], vec!["w2"]);
}

#[tokio::test]
async fn test_watcher_survives_session_churn() {
    enable_logger();
    let zk = coordinator_with(&["/c1"]).await;
    let members = Arc::new(ChildSet::new());
    let handle = MembershipWatcher::start(zk.clone(), "/c1", members.clone(), |_: &ChildSet| {})
        .await
        .unwrap();
    let mut status = handle.subscribe();

    zk.broadcast_session_event(SessionState::Connecting);
    zk.broadcast_session_event(SessionState::Expired);
    zk.broadcast_session_event(SessionState::Connected);
    zk.create("/c1/w1", Vec::new(), Acl::world_all()).await.unwrap();
    wait_for_passes(&mut status, 1).await;

    assert_eq!(sorted_names(&members), vec!["w1"]);
    assert_eq!(handle.status(), WatcherStatus::Watching { passes: 1 });

    handle.cancel();
    handle.join().await.unwrap();
}

#[tokio::test]
async fn test_watcher_reports_failed_relisting() {
    enable_logger();
    let inner = MemoryCoordinator::new();
    inner.create("/c1", Vec::new(), Acl::world_all()).await.unwrap();
    let zk = Arc::new(FlakyCoordinator {
        inner,
        healthy_listings: 1,
        listings: AtomicUsize::new(0),
    });
    let members = Arc::new(ChildSet::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();

    let handle = MembershipWatcher::start(zk.clone(), "/c1", members.clone(), move |_: &ChildSet| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .await
    .unwrap();
    let mut status = handle.subscribe();

    zk.create("/c1/w1", Vec::new(), Acl::world_all()).await.unwrap();
    let terminal = wait_for_termination(&mut status).await;

    assert!(matches!(terminal, WatcherStatus::Failed { ref reason } if reason.contains("no quorum")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // The set is left as last seen
    assert!(members.is_empty());
    let r = handle.join().await;
    assert!(matches!(
        r,
        Err(Error::Watch(WatchError::Reconcile { ref path, .. })) if path == "/c1"
    ));
}

#[tokio::test]
async fn test_watcher_start_fails_on_missing_path() {
    let zk = Arc::new(MemoryCoordinator::new());
    let members = Arc::new(ChildSet::new());

    let r = MembershipWatcher::start(zk.clone(), "/nope", members.clone(), |_: &ChildSet| {}).await;

    assert!(matches!(r, Err(ref e) if e.is_no_node()));
    assert_eq!(zk.pending_watches("/nope"), 0);
}

#[tokio::test]
async fn test_shared_token_stops_every_watcher() {
    enable_logger();
    let zk = coordinator_with(&["/a", "/b"]).await;
    let shutdown = CancellationToken::new();

    let mut handles = Vec::new();
    for path in ["/a", "/b"] {
        let handle = MembershipWatcher::start_with_token(
            zk.clone(),
            path,
            Arc::new(ChildSet::new()),
            |_: &ChildSet| {},
            shutdown.child_token(),
        )
        .await
        .unwrap();
        handles.push(handle);
    }

    shutdown.cancel();

    for handle in handles {
        let mut status = handle.subscribe();
        assert_eq!(wait_for_termination(&mut status).await, WatcherStatus::Cancelled);
        handle.join().await.unwrap();
    }
}
