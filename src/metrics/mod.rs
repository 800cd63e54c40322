use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::error;

lazy_static! {
    pub static ref RECONCILE_PASSES: IntCounterVec = IntCounterVec::new(
        Opts::new("membership_reconcile_passes", "Successful reconciliation passes per watched path"),
        &["path"]
    )
    .expect("metric can not be created");

    pub static ref WATCHER_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("membership_watcher_failures", "Watchers terminated by a failed reconciliation"),
        &["path"]
    )
    .expect("metric can not be created");

    pub static ref WATCHED_CHILDREN: IntGaugeVec = IntGaugeVec::new(
        Opts::new("membership_watched_children", "Children currently mirrored per watched path"),
        &["path"]
    )
    .expect("metric can not be created");

    pub static ref WORK_CREATED: IntCounterVec = IntCounterVec::new(
        Opts::new("work_created", "Work records created"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref WORK_CREATE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("work_create_failures", "Work record creations that failed"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref WORK_COMPLETED: IntCounterVec = IntCounterVec::new(
        Opts::new("work_completed", "Work records deleted on completion"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref WORK_COMPLETE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("work_complete_failures", "Work record deletions that failed"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_custom_metrics(&registry);
        registry
    };
}

fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(RECONCILE_PASSES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCHER_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCHED_CHILDREN.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WORK_CREATED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WORK_CREATE_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WORK_COMPLETED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WORK_COMPLETE_FAILURES.clone()))
        .expect("collector can be registered");
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
