//! Captain map draft
//!
//! The two captains of a full lobby take turns removing maps from the pool.
//! The last map standing is the one the match is played on.

pub mod engine;
pub mod session;

pub use engine::MapDraftEngine;
pub use session::{DraftSession, DraftState, DraftView};
