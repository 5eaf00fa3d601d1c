//! Match records and finalization

pub mod finalizer;

pub use finalizer::{split_teams, MatchFinalizer, MatchPayload, MatchRecord, PendingMatch};
