//! Uncommitted user edits and the set of keys awaiting submission

mod pending;
mod store;

pub use pending::PendingSet;
pub use store::{BeamAssignment, BeamSide, ChangeEntry, ChangeStore};
