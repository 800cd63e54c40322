//! Membership tracking
//!
//! A [`MembershipWatcher`] mirrors the child set of one remote path into a
//! [`ChildSet`](crate::ChildSet). It lists the children once to seed the set,
//! then loops: wait for the armed child watch, re-list (which re-arms it),
//! reconcile the set in one exclusive span, and call the caller's callback.
//!
//! A failed re-list ends the loop. The failure is logged, published as
//! [`WatcherStatus::Failed`] and returned from [`WatcherHandle::join`], so a
//! caller can tell "no change happened" from "the watch died".

mod reconcile;
mod watcher;

pub use reconcile::MembershipDelta;
pub use watcher::*;
