//! Concurrent keyed container
//!
//! A lock-guarded `String -> V` map used both as a plain map and, with
//! [`NodeMark`] values, as the mirrored child set of a watched path.

mod keyed_container;
pub use keyed_container::*;


/// Per-child marker used by the membership reconciliation pass.
///
/// Outside of a pass every entry is `Live`; `Stale` only exists while the
/// pass holds the exclusive guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMark {
    Stale,
    Live,
}

/// Container used as a set of child names.
pub type ChildSet = KeyedContainer<NodeMark>;
