use serde::Deserialize;
use serde::Serialize;

use crate::utils::path::join;
use crate::Error;
use crate::Result;

/// Namespace of work records: `<root>/<cluster_name>/<work_path>/<work id>`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Tree prefix shared by every cluster
    #[serde(default = "default_root")]
    pub root: String,

    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Path segment(s) under the cluster node holding work records
    #[serde(default = "default_work_path")]
    pub work_path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            cluster_name: default_cluster_name(),
            work_path: default_work_path(),
        }
    }
}

impl LedgerConfig {
    /// # Errors
    /// Returns `Error::InvalidConfig` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if !self.root.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "ledger.root must be absolute, got {:?}",
                self.root
            )));
        }

        if self.cluster_name.is_empty() {
            return Err(Error::InvalidConfig("ledger.cluster_name cannot be empty".into()));
        }
        if self.cluster_name.contains('/') || self.cluster_name == "." || self.cluster_name == ".." {
            return Err(Error::InvalidConfig(format!(
                "ledger.cluster_name must be a single path segment, got {:?}",
                self.cluster_name
            )));
        }

        // The work root must resolve below the cluster node
        let cluster = join(&[&self.root, &self.cluster_name]);
        let work_root = join(&[&cluster, &self.work_path]);
        if work_root == cluster || !work_root.starts_with(&format!("{}/", cluster)) {
            return Err(Error::InvalidConfig(format!(
                "ledger.work_path must name a node below the cluster, got {:?}",
                self.work_path
            )));
        }

        Ok(())
    }

    /// `<root>/<cluster_name>`
    pub fn cluster_path(&self) -> String {
        join(&[&self.root, &self.cluster_name])
    }

    /// `<root>/<cluster_name>/<work_path>`
    pub fn work_root(&self) -> String {
        join(&[&self.root, &self.cluster_name, &self.work_path])
    }
}

fn default_root() -> String {
    "/".to_string()
}
fn default_cluster_name() -> String {
    "default".to_string()
}
fn default_work_path() -> String {
    "work".to_string()
}
