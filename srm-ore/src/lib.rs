//! Odds and ends shared by every `srm` crate.

pub mod env;
pub mod fmt;
