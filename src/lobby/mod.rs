//! Lobby slots and their state machine
//!
//! A fixed set of numbered slots each hold at most one lobby. The store owns
//! the lobbies and the player index; the coordinator drives joins, leaves,
//! captain drafts and match handoff on top of it.

pub mod coordinator;
pub mod instance;
pub mod store;

// Re-export commonly used types
pub use coordinator::{BanMapOutcome, CoordinatorStats, JoinOutcome, LeaveOutcome, LobbyCoordinator};
pub use instance::{LobbyInstance, LobbyStatus};
pub use store::{AddOutcome, CaptainChange, LobbyStore, RemoveOutcome, SlotGuard, SlotState};
