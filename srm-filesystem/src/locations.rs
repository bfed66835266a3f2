//! Well known directories that `srm` manages.

pub mod quarantine;
