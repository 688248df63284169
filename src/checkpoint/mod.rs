//! State capture and persistence
//!
//! [`ArchipelagoState`](state::ArchipelagoState) snapshots the numeric
//! state of an archipelago;
//! [`save_state`](recovery::save_state) / [`load_state`](recovery::load_state)
//! move snapshots to and from disk.

pub mod recovery;
pub mod state;

pub mod prelude {
    pub use super::recovery::*;
    pub use super::state::*;
}
