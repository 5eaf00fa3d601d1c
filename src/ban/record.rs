//! Player ban records
//!
//! A record is never deleted. Lifting a ban clears its `active` flag and
//! stamps who lifted it, so the full history stays available.

use crate::types::{BanId, PlayerId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Why a ban was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BanCategory {
    /// Left a full lobby
    AutomaticLeave,
    /// Issued by a moderator, time-limited
    ModeratorIssued,
    /// Issued by an admin with an explicit duration
    AdminTemporary,
    /// Never expires
    Permanent,
}

impl BanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BanCategory::AutomaticLeave => "automatic_leave",
            BanCategory::ModeratorIssued => "moderator_issued",
            BanCategory::AdminTemporary => "admin_temporary",
            BanCategory::Permanent => "permanent",
        }
    }
}

/// How long a ban lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanTerm {
    Permanent,
    Until(DateTime<Utc>),
}

impl BanTerm {
    /// Build a term from an optional duration; absent or non-positive means permanent
    pub fn from_duration(start: DateTime<Utc>, duration: Option<Duration>) -> Self {
        match duration {
            Some(d) if d > Duration::zero() => BanTerm::Until(start + d),
            _ => BanTerm::Permanent,
        }
    }

    /// Whether the term still covers `now`
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        match self {
            BanTerm::Permanent => true,
            BanTerm::Until(expiry) => *expiry > now,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            BanTerm::Permanent => None,
            BanTerm::Until(expiry) => Some(*expiry),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, BanTerm::Permanent)
    }
}

/// Which active bans an unban may lift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnbanScope {
    /// Every active ban
    Any,
    /// Only bans issued by this actor
    IssuedBy(PlayerId),
}

impl UnbanScope {
    pub fn matches(&self, record: &BanRecord) -> bool {
        match self {
            UnbanScope::Any => true,
            UnbanScope::IssuedBy(issuer) => record.issued_by == *issuer,
        }
    }
}

/// A ban about to be persisted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBan {
    pub player_id: PlayerId,
    pub category: BanCategory,
    pub reason: String,
    pub issued_by: PlayerId,
    pub issued_at: DateTime<Utc>,
    pub term: BanTerm,
}

/// A persisted ban record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub id: BanId,
    pub player_id: PlayerId,
    pub category: BanCategory,
    pub reason: String,
    pub issued_by: PlayerId,
    pub issued_at: DateTime<Utc>,
    pub term: BanTerm,
    pub active: bool,
    pub lifted_by: Option<PlayerId>,
    pub lifted_at: Option<DateTime<Utc>>,
}

impl BanRecord {
    /// Materialize a new ban under the given id
    pub fn from_new(id: BanId, ban: NewBan) -> Self {
        Self {
            id,
            player_id: ban.player_id,
            category: ban.category,
            reason: ban.reason,
            issued_by: ban.issued_by,
            issued_at: ban.issued_at,
            term: ban.term,
            active: true,
            lifted_by: None,
            lifted_at: None,
        }
    }

    /// A ban is in effect iff it is active and its term covers `now`
    pub fn is_in_effect_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.term.covers(now)
    }

    /// Active but past its expiry
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.term.covers(now)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.term.expires_at()
    }

    /// Deactivate the record
    pub fn lift(&mut self, lifted_by: Option<PlayerId>, at: DateTime<Utc>) {
        self.active = false;
        self.lifted_by = lifted_by;
        self.lifted_at = Some(at);
    }
}
