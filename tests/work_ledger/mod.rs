use std::sync::Arc;

use donut::complete_work;
use donut::create_work;
use donut::read_work;
use donut::work_path;
use donut::ChildSet;
use donut::Coordinator;
use donut::LedgerConfig;
use donut::MemoryCoordinator;
use donut::MembershipWatcher;
use donut::Payload;
use donut::PayloadValue;
use donut::Settings;
use donut::WorkLedger;
use serde::Deserialize;
use serde::Serialize;

use crate::common::coordinator_with;
use crate::common::enable_logger;
use crate::common::sorted_names;
use crate::common::wait_for_passes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    shard: u32,
    action: String,
}

fn ledger_config(cluster: &str) -> LedgerConfig {
    let mut settings = Settings::default();
    settings.ledger.cluster_name = cluster.to_string();
    settings.validate().expect("valid settings").ledger
}

#[tokio::test]
async fn test_free_functions_share_layout_with_ledger() {
    let zk = coordinator_with(&["/c1", "/c1/work"]).await;
    let ledger = WorkLedger::new(zk.clone(), ledger_config("c1"));
    let task = Task {
        shard: 7,
        action: "compact".to_string(),
    };

    let path = create_work(zk.as_ref(), "c1", "work", "t1", &task).await.unwrap();

    assert_eq!(path, work_path("c1", "work", "t1"));
    assert_eq!(path, ledger.work_path("t1"));
    let read: Task = ledger.read_work("t1").await.unwrap();
    assert_eq!(read, task);

    ledger.complete_work("t1").await;
    let r: donut::Result<Task> = read_work(zk.as_ref(), "c1", "work", "t1").await;
    assert!(matches!(r, Err(ref e) if e.is_no_node()));
}

#[tokio::test]
async fn test_concurrent_creators_of_one_id_have_single_winner() {
    let zk = coordinator_with(&["/c1", "/c1/work"]).await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let zk = zk.clone();
        tasks.push(tokio::spawn(async move {
            let mut payload = Payload::new();
            payload.insert("writer".to_string(), PayloadValue::from(i as i64));
            create_work(zk.as_ref(), "c1", "work", "shared", &payload).await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_double_completion_is_harmless() {
    let zk = coordinator_with(&["/c1", "/c1/work"]).await;
    let payload = Payload::new();
    create_work(zk.as_ref(), "c1", "work", "t1", &payload).await.unwrap();

    complete_work(zk.as_ref(), "c1", "work", "t1").await;
    complete_work(zk.as_ref(), "c1", "work", "t1").await;

    assert!(!zk.exists("/c1/work/t1"));
}

#[tokio::test]
async fn test_watcher_observes_ledger_queue() {
    enable_logger();
    let zk: Arc<MemoryCoordinator> = Arc::new(MemoryCoordinator::new());
    let dyn_zk: Arc<dyn Coordinator> = zk.clone();
    let ledger = WorkLedger::new(dyn_zk, ledger_config("queue"));
    ledger.ensure_root().await.unwrap();

    let pending = Arc::new(ChildSet::new());
    let handle = MembershipWatcher::start(zk.clone(), ledger.config().work_root(), pending.clone(), |_: &ChildSet| {})
        .await
        .unwrap();
    let mut status = handle.subscribe();

    let id = ledger
        .submit(&Task {
            shard: 1,
            action: "rebuild".to_string(),
        })
        .await
        .unwrap();
    wait_for_passes(&mut status, 1).await;
    assert_eq!(sorted_names(&pending), vec![id.clone()]);

    ledger.complete_work(&id).await;
    wait_for_passes(&mut status, 2).await;
    assert!(pending.is_empty());

    handle.cancel();
    handle.join().await.unwrap();
}
