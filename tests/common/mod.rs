use std::sync::Arc;
use std::time::Duration;

use donut::Acl;
use donut::ChildSet;
use donut::Coordinator;
use donut::MemoryCoordinator;
use donut::WatcherStatus;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(3);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// Coordinator with `nodes` created in order.
pub async fn coordinator_with(nodes: &[&str]) -> Arc<MemoryCoordinator> {
    let zk = Arc::new(MemoryCoordinator::new());
    for node in nodes {
        zk.create(node, Vec::new(), Acl::world_all())
            .await
            .expect("node can be created");
    }
    zk
}

pub fn sorted_names(children: &ChildSet) -> Vec<String> {
    let mut keys = children.keys();
    keys.sort();
    keys
}

pub async fn wait_for_passes(
    status: &mut watch::Receiver<WatcherStatus>,
    passes: u64,
) {
    let r = timeout(
        WAIT_TIMEOUT,
        status.wait_for(|s| matches!(s, WatcherStatus::Watching { passes: p } if *p >= passes)),
    )
    .await;
    assert!(matches!(r, Ok(Ok(_))), "watcher did not reach {} passes", passes);
}

pub async fn wait_for_termination(status: &mut watch::Receiver<WatcherStatus>) -> WatcherStatus {
    let r = timeout(
        WAIT_TIMEOUT,
        status.wait_for(|s| !matches!(s, WatcherStatus::Watching { .. })),
    )
    .await;
    match r {
        Ok(Ok(s)) => s.clone(),
        _ => panic!("watcher did not terminate"),
    }
}
