//! Seam to the external coordination service
//!
//! The layer only needs four remote calls from a ZooKeeper-style ensemble:
//! list children while arming a one-shot child watch, create, delete and get.
//! [`Coordinator`] describes them; [`MemoryCoordinator`] is an in-process
//! tree that honours the same contract.

mod memory;
pub use memory::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Coordinator: Send + Sync + 'static {
    /// List the children of `path` and arm a one-shot notification for the
    /// next change of that child set.
    async fn children_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, ChildWatch)>;

    /// Create a node holding `data`. Fails with `Error::Conflict` if a node
    /// already exists at `path`. Returns the created path.
    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        acl: Vec<Acl>,
    ) -> Result<String>;

    async fn delete(
        &self,
        path: &str,
        version: Version,
    ) -> Result<()>;

    async fn get(
        &self,
        path: &str,
    ) -> Result<Vec<u8>>;
}

/// Expected node version for conditional operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Any,
    Exact(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Connection state change, not tied to a node
    Session,
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Expired,
    AuthFailed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub path: String,
    pub state: SessionState,
}

impl WatchEvent {
    pub fn children_changed(path: impl Into<String>) -> Self {
        Self {
            kind: EventKind::NodeChildrenChanged,
            path: path.into(),
            state: SessionState::Connected,
        }
    }

    pub fn session(state: SessionState) -> Self {
        Self {
            kind: EventKind::Session,
            path: String::new(),
            state,
        }
    }

    /// True when the event reports a real node change on a usable session.
    ///
    /// Session events do not consume the watch they are delivered on.
    pub fn is_actionable(&self) -> bool {
        self.kind != EventKind::Session && self.state == SessionState::Connected
    }
}

/// Receiving end of an armed child watch.
///
/// Yields any number of session events followed by at most one node event.
/// `None` means the service dropped the watch without firing it.
#[derive(Debug)]
pub struct ChildWatch {
    rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl ChildWatch {
    /// Create an armed watch and the sender the service uses to fire it.
    pub fn channel() -> (mpsc::UnboundedSender<WatchEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Perms(u32);

impl Perms {
    pub const READ: Perms = Perms(1);
    pub const WRITE: Perms = Perms(1 << 1);
    pub const CREATE: Perms = Perms(1 << 2);
    pub const DELETE: Perms = Perms(1 << 3);
    pub const ADMIN: Perms = Perms(1 << 4);
    pub const ALL: Perms = Perms(0x1f);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(
        self,
        other: Perms,
    ) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub perms: Perms,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    /// Unrestricted access for everyone (`world:anyone`).
    pub fn world_all() -> Vec<Acl> {
        vec![Acl {
            perms: Perms::ALL,
            scheme: "world".to_string(),
            id: "anyone".to_string(),
        }]
    }
}
