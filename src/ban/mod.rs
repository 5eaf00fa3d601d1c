//! Player bans
//!
//! Records, categories and the registry that issues and checks them.

pub mod record;
pub mod registry;

pub use record::{BanCategory, BanRecord, BanTerm, NewBan, UnbanScope};
pub use registry::BanRegistry;
