use crate::ChildSet;
use crate::NodeMark;

/// Names that entered or left the child set during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Load the initial listing. Entries the listing does not name are dropped,
/// so a set reused from an earlier watcher starts as an exact mirror.
pub(crate) fn seed(
    children: &ChildSet,
    nodes: &[String],
) -> MembershipDelta {
    reconcile(children, nodes)
}

/// Replace the contents of `children` with `nodes` in one exclusive span.
///
/// Every present key is marked stale, every fetched name is marked live
/// (reviving survivors and inserting newcomers), then whatever is still stale
/// is pruned.
pub(crate) fn reconcile(
    children: &ChildSet,
    nodes: &[String],
) -> MembershipDelta {
    let mut delta = MembershipDelta::default();
    let mut m = children.acquire_extended_mut();

    for mark in m.values_mut() {
        *mark = NodeMark::Stale;
    }

    for node in nodes {
        if m.insert(node.clone(), NodeMark::Live).is_none() {
            delta.added.push(node.clone());
        }
    }

    m.retain(|k, mark| {
        if *mark == NodeMark::Stale {
            delta.removed.push(k.clone());
            false
        } else {
            true
        }
    });

    delta
}
