use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::metrics::WORK_COMPLETED;
use crate::metrics::WORK_COMPLETE_FAILURES;
use crate::metrics::WORK_CREATED;
use crate::metrics::WORK_CREATE_FAILURES;
use crate::utils::codec;
use crate::utils::path::join;
use crate::utils::path::validate_segment;
use crate::Acl;
use crate::Coordinator;
use crate::LedgerConfig;
use crate::Result;
use crate::Version;

const WORK_ID_LEN: usize = 16;

/// `/<cluster>/<work_root>/<work_id>`, cleaned. Does not check `work_id`;
/// the record operations do.
pub fn work_path(
    cluster: &str,
    work_root: &str,
    work_id: &str,
) -> String {
    join(&["/", cluster, work_root, work_id])
}

/// Store `payload` as a new work record and return its path.
///
/// Fails with `Error::Conflict` if the record already exists. The parent
/// (`/<cluster>/<work_root>`) must exist. `work_id` must be a single node
/// name, otherwise `RemoteError::BadArguments` is returned.
pub async fn create_work<C, P>(
    coordinator: &C,
    cluster: &str,
    work_root: &str,
    work_id: &str,
    payload: &P,
) -> Result<String>
where
    C: Coordinator + ?Sized,
    P: Serialize + ?Sized,
{
    let base = join(&["/", cluster, work_root]);
    create_at(coordinator, cluster, &base, work_id, payload).await
}

/// Delete a work record regardless of its version.
///
/// Failures are logged and counted, never returned.
pub async fn complete_work<C>(
    coordinator: &C,
    cluster: &str,
    work_root: &str,
    work_id: &str,
) where
    C: Coordinator + ?Sized,
{
    let base = join(&["/", cluster, work_root]);
    complete_at(coordinator, cluster, &base, work_id).await
}

/// Fetch and decode a work record.
pub async fn read_work<C, P>(
    coordinator: &C,
    cluster: &str,
    work_root: &str,
    work_id: &str,
) -> Result<P>
where
    C: Coordinator + ?Sized,
    P: DeserializeOwned,
{
    let base = join(&["/", cluster, work_root]);
    read_at(coordinator, &base, work_id).await
}

async fn create_at<C, P>(
    coordinator: &C,
    cluster: &str,
    base: &str,
    work_id: &str,
    payload: &P,
) -> Result<String>
where
    C: Coordinator + ?Sized,
    P: Serialize + ?Sized,
{
    if let Err(e) = validate_segment(work_id) {
        error!(%base, "Rejected work id: {}", e);
        WORK_CREATE_FAILURES.with_label_values(&[cluster]).inc();
        return Err(e);
    }
    let path = &join(&[base, work_id]);

    let data = match codec::encode(payload) {
        Ok(data) => data,
        Err(e) => {
            error!(%path, "Failed to serialize work payload: {}", e);
            WORK_CREATE_FAILURES.with_label_values(&[cluster]).inc();
            return Err(e);
        }
    };

    match coordinator.create(path, data, Acl::world_all()).await {
        Ok(created) => {
            info!("Created work {}", created);
            WORK_CREATED.with_label_values(&[cluster]).inc();
            Ok(created)
        }
        Err(e) => {
            error!(%path, "Failed to create work: {}", e);
            WORK_CREATE_FAILURES.with_label_values(&[cluster]).inc();
            Err(e)
        }
    }
}

async fn complete_at<C>(
    coordinator: &C,
    cluster: &str,
    base: &str,
    work_id: &str,
) where
    C: Coordinator + ?Sized,
{
    if let Err(e) = validate_segment(work_id) {
        warn!(%base, "Failed to complete work: {}", e);
        WORK_COMPLETE_FAILURES.with_label_values(&[cluster]).inc();
        return;
    }
    let path = &join(&[base, work_id]);

    match coordinator.delete(path, Version::Any).await {
        Ok(()) => {
            info!("Completed work {}", path);
            WORK_COMPLETED.with_label_values(&[cluster]).inc();
        }
        Err(e) => {
            warn!(%path, "Failed to complete work: {}", e);
            WORK_COMPLETE_FAILURES.with_label_values(&[cluster]).inc();
        }
    }
}

async fn read_at<C, P>(
    coordinator: &C,
    base: &str,
    work_id: &str,
) -> Result<P>
where
    C: Coordinator + ?Sized,
    P: DeserializeOwned,
{
    validate_segment(work_id)?;
    let data = coordinator.get(&join(&[base, work_id])).await?;
    codec::decode(&data)
}

/// Work ledger bound to one coordinator and one [`LedgerConfig`].
pub struct WorkLedger<C>
where
    C: Coordinator + ?Sized,
{
    coordinator: Arc<C>,
    config: LedgerConfig,
}

impl<C> WorkLedger<C>
where
    C: Coordinator + ?Sized,
{
    pub fn new(
        coordinator: Arc<C>,
        config: LedgerConfig,
    ) -> Self {
        Self { coordinator, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn work_path(
        &self,
        work_id: &str,
    ) -> String {
        join(&[&self.config.work_root(), work_id])
    }

    /// Create every missing node down to the work root. Nodes that already
    /// exist, including ones created concurrently, are left untouched.
    pub async fn ensure_root(&self) -> Result<()> {
        let work_root = self.config.work_root();
        let mut current = String::new();
        for segment in work_root.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match self.coordinator.create(&current, Vec::new(), Acl::world_all()).await {
                Ok(_) => debug!(path = %current, "created ledger node"),
                Err(e) if e.is_conflict() => {}
                Err(e) => {
                    error!(path = %current, "Failed to prepare work root: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub async fn create_work<P>(
        &self,
        work_id: &str,
        payload: &P,
    ) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        create_at(
            self.coordinator.as_ref(),
            &self.config.cluster_name,
            &self.config.work_root(),
            work_id,
            payload,
        )
        .await
    }

    /// Create a record under a freshly generated id and return that id.
    pub async fn submit<P>(
        &self,
        payload: &P,
    ) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        let work_id = nanoid::nanoid!(WORK_ID_LEN);
        self.create_work(&work_id, payload).await?;
        Ok(work_id)
    }

    pub async fn complete_work(
        &self,
        work_id: &str,
    ) {
        complete_at(
            self.coordinator.as_ref(),
            &self.config.cluster_name,
            &self.config.work_root(),
            work_id,
        )
        .await
    }

    pub async fn read_work<P>(
        &self,
        work_id: &str,
    ) -> Result<P>
    where
        P: DeserializeOwned,
    {
        read_at(self.coordinator.as_ref(), &self.config.work_root(), work_id).await
    }
}
