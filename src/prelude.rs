//! A module exporting the traits needed to plug in a code store and
//! a time source.

pub use crate::clock::{Clock, Reference};
pub use crate::store::CodeStore;
