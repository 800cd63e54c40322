use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use super::Acl;
use super::ChildWatch;
use super::Coordinator;
use super::EventKind;
use super::SessionState;
use super::Version;
use super::WatchEvent;
use crate::utils::path::parent_of;
use crate::utils::path::validate_path;
use crate::Error;
use crate::RemoteError;
use crate::Result;

#[derive(Debug, Clone)]
struct ZNode {
    data: Vec<u8>,
    acl: Vec<Acl>,
    version: i32,
}

#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<String, ZNode>,
    /// Armed child watches keyed by the watched path
    child_watches: HashMap<String, Vec<mpsc::UnboundedSender<WatchEvent>>>,
}

impl Tree {
    fn children_of(
        &self,
        path: &str,
    ) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|k| parent_of(k) == Some(path))
            .map(|k| k[k.rfind('/').map(|i| i + 1).unwrap_or(0)..].to_string())
            .collect()
    }

    /// Fire and disarm every child watch on `path`.
    fn fire(
        &mut self,
        path: &str,
        kind: EventKind,
    ) {
        if let Some(senders) = self.child_watches.remove(path) {
            trace!(path, watches = senders.len(), "firing child watches");
            for tx in senders {
                let _ = tx.send(WatchEvent {
                    kind,
                    path: path.to_string(),
                    state: SessionState::Connected,
                });
            }
        }
    }
}

/// In-process coordination tree with ZooKeeper semantics.
///
/// Nodes live under `/`, which always exists. Creating a node requires its
/// parent, deleting one requires it to be childless, and child watches are
/// one-shot.
#[derive(Debug)]
pub struct MemoryCoordinator {
    tree: Mutex<Tree>,
    available: AtomicBool,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.nodes.insert(
            "/".to_string(),
            ZNode {
                data: Vec::new(),
                acl: Acl::world_all(),
                version: 0,
            },
        );
        Self {
            tree: Mutex::new(tree),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (`false`) or regaining (`true`) the connection.
    /// While unavailable every call fails with `ConnectionLoss`.
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Deliver a session event to every armed watch without disarming it.
    pub fn broadcast_session_event(
        &self,
        state: SessionState,
    ) {
        let mut tree = self.tree.lock();
        for senders in tree.child_watches.values_mut() {
            senders.retain(|tx| tx.send(WatchEvent::session(state)).is_ok());
        }
    }

    pub fn exists(
        &self,
        path: &str,
    ) -> bool {
        self.tree.lock().nodes.contains_key(path)
    }

    pub fn node_acl(
        &self,
        path: &str,
    ) -> Option<Vec<Acl>> {
        self.tree.lock().nodes.get(path).map(|n| n.acl.clone())
    }

    pub fn node_version(
        &self,
        path: &str,
    ) -> Option<i32> {
        self.tree.lock().nodes.get(path).map(|n| n.version)
    }

    /// Number of live, armed child watches on `path`.
    pub fn pending_watches(
        &self,
        path: &str,
    ) -> usize {
        self.tree
            .lock()
            .child_watches
            .get(path)
            .map(|v| v.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Overwrite the payload of an existing node, bumping its version.
    pub fn set_data(
        &self,
        path: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        self.check_available()?;
        let mut tree = self.tree.lock();
        let node = tree
            .nodes
            .get_mut(path)
            .ok_or_else(|| RemoteError::NoNode { path: path.into() })?;
        node.data = data;
        node.version += 1;
        Ok(())
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::ConnectionLoss.into())
        }
    }
}

impl Default for MemoryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn children_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, ChildWatch)> {
        self.check_available()?;
        validate_path(path)?;

        let mut tree = self.tree.lock();
        if !tree.nodes.contains_key(path) {
            return Err(RemoteError::NoNode { path: path.into() }.into());
        }
        let children = tree.children_of(path);
        let (tx, watch) = ChildWatch::channel();
        let senders = tree.child_watches.entry(path.to_string()).or_default();
        senders.retain(|s| !s.is_closed());
        senders.push(tx);

        debug!(path, children = children.len(), "children listed, watch armed");
        Ok((children, watch))
    }

    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        acl: Vec<Acl>,
    ) -> Result<String> {
        self.check_available()?;
        validate_path(path)?;
        let parent = parent_of(path)
            .ok_or_else(|| RemoteError::BadArguments("cannot create the root node".into()))?;

        let mut tree = self.tree.lock();
        if tree.nodes.contains_key(path) {
            return Err(Error::Conflict { path: path.into() });
        }
        if !tree.nodes.contains_key(parent) {
            return Err(RemoteError::NoNode { path: parent.into() }.into());
        }
        tree.nodes.insert(
            path.to_string(),
            ZNode {
                data,
                acl,
                version: 0,
            },
        );
        tree.fire(parent, EventKind::NodeChildrenChanged);

        Ok(path.to_string())
    }

    async fn delete(
        &self,
        path: &str,
        version: Version,
    ) -> Result<()> {
        self.check_available()?;
        validate_path(path)?;
        let parent = parent_of(path)
            .ok_or_else(|| RemoteError::BadArguments("cannot delete the root node".into()))?;

        let mut tree = self.tree.lock();
        let current = match tree.nodes.get(path) {
            Some(node) => node.version,
            None => return Err(RemoteError::NoNode { path: path.into() }.into()),
        };
        if let Version::Exact(expected) = version {
            if expected != current {
                return Err(RemoteError::BadVersion {
                    path: path.into(),
                    expected,
                    actual: current,
                }
                .into());
            }
        }
        if !tree.children_of(path).is_empty() {
            return Err(RemoteError::NotEmpty { path: path.into() }.into());
        }

        tree.nodes.remove(path);
        tree.fire(path, EventKind::NodeDeleted);
        tree.fire(parent, EventKind::NodeChildrenChanged);

        Ok(())
    }

    async fn get(
        &self,
        path: &str,
    ) -> Result<Vec<u8>> {
        self.check_available()?;
        validate_path(path)?;

        self.tree
            .lock()
            .nodes
            .get(path)
            .map(|n| n.data.clone())
            .ok_or_else(|| RemoteError::NoNode { path: path.into() }.into())
    }
}
