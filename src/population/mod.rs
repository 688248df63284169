//! Population management
//!
//! This module provides the [`Population`] container and the
//! [`IndividualsGroup`] exchange type used by migration.

pub mod group;
pub mod population;

pub mod prelude {
    pub use super::group::*;
    pub use super::population::*;
}
