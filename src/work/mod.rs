//! Work ledger primitives
//!
//! A work record is a node at `/<cluster>/<work root>/<work id>` whose data is
//! a JSON payload. Creation never overwrites an existing record; completion
//! deletes the record unconditionally and only reports failure through logs
//! and metrics.

mod ledger;
pub use ledger::*;
