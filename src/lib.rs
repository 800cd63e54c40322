//! # donut
//!
//! Client-side building blocks on top of a ZooKeeper-style coordination
//! service.
//!
//! - [`KeyedContainer`] - lock-guarded `String -> V` map with scoped batch
//!   guards
//! - [`MembershipWatcher`] - mirrors the children of a remote path into a
//!   [`ChildSet`] and notifies on every settled change
//! - [`WorkLedger`] - create, read and complete serialized work records under
//!   a cluster-scoped path
//!
//! The service itself sits behind the [`Coordinator`] trait.
//! [`MemoryCoordinator`] implements it in-process for tests and embedders.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use donut::ChildSet;
//! use donut::MemoryCoordinator;
//! use donut::MembershipWatcher;
//!
//! # async fn demo() -> donut::Result<()> {
//! let zk = Arc::new(MemoryCoordinator::new());
//! let members = Arc::new(ChildSet::new());
//! let handle = MembershipWatcher::start(zk, "/", members.clone(), |set: &ChildSet| {
//!     println!("members: {:?}", set.keys());
//! })
//! .await?;
//! handle.cancel();
//! handle.join().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod container;
mod coordinator;
mod errors;
mod membership;
pub mod metrics;
pub mod utils;
mod work;

pub use config::*;
pub use container::*;
pub use coordinator::*;
pub use errors::*;
pub use membership::*;
pub use utils::codec::Payload;
pub use utils::codec::PayloadValue;
pub use work::*;

//-----------------------------------------------------------
// Test utils
