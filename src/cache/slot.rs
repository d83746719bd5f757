//! Fixed slot namespace for the cache
//!
//! Every cached value lives in one of a small, closed set of slots. Each slot
//! has its own storage key and TTL, and a marker type that ties the slot to the
//! type of value it holds so reads and writes cannot disagree on shape.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use super::clock::duration_millis;
use crate::data::{AuthData, Plan, UserData};

/// TTL for the aggregate user data slot (5 minutes)
const USER_DATA_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for the plan catalogue slot (10 minutes, plans change rarely)
const PLANS_DATA_TTL: Duration = Duration::from_secs(10 * 60);

/// TTL for the auth slot (2 minutes, session-sensitive)
const AUTH_DATA_TTL: Duration = Duration::from_secs(2 * 60);

/// Identifier for one of the cache slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// Aggregate of auth, plans, tax and dues
    UserData,
    /// Available plan catalogue
    PlansData,
    /// Subscriber auth/session details
    AuthData,
}

impl SlotId {
    /// All slots, in the order `clear_all` visits them
    pub const ALL: [SlotId; 3] = [SlotId::UserData, SlotId::PlansData, SlotId::AuthData];

    /// Key under which the slot's entry is stored
    pub fn key(self) -> &'static str {
        match self {
            SlotId::UserData => "userData",
            SlotId::PlansData => "plansData",
            SlotId::AuthData => "authData",
        }
    }

    /// Maximum age of a fresh entry in this slot
    pub fn ttl(self) -> Duration {
        match self {
            SlotId::UserData => USER_DATA_TTL,
            SlotId::PlansData => PLANS_DATA_TTL,
            SlotId::AuthData => AUTH_DATA_TTL,
        }
    }

    /// TTL in milliseconds, the unit entry timestamps are stored in
    pub fn ttl_millis(self) -> i64 {
        duration_millis(self.ttl())
    }

    /// Parses a slot name, accepting the storage key and common CLI spellings.
    ///
    /// Returns `None` for unknown names.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "userdata" | "user-data" | "user_data" | "user" => Some(SlotId::UserData),
            "plansdata" | "plans-data" | "plans_data" | "plans" => Some(SlotId::PlansData),
            "authdata" | "auth-data" | "auth_data" | "auth" => Some(SlotId::AuthData),
            _ => None,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a slot name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown slot: '{0}'. Valid slots: userData, plansData, authData")]
pub struct UnknownSlot(pub String);

impl FromStr for SlotId {
    type Err = UnknownSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotId::from_name(s).ok_or_else(|| UnknownSlot(s.to_string()))
    }
}

/// A typed cache slot
///
/// Implemented by zero-sized marker types. `Value` is what gets written to and
/// read from the slot identified by `ID`.
pub trait Slot {
    /// Which slot this marker refers to
    const ID: SlotId;

    /// Payload type stored in the slot
    type Value: Serialize + DeserializeOwned + Send + Sync;
}

/// Marker for the aggregate user data slot
#[derive(Debug, Clone, Copy)]
pub struct UserDataSlot;

impl Slot for UserDataSlot {
    const ID: SlotId = SlotId::UserData;
    type Value = UserData;
}

/// Marker for the plan catalogue slot
#[derive(Debug, Clone, Copy)]
pub struct PlansDataSlot;

impl Slot for PlansDataSlot {
    const ID: SlotId = SlotId::PlansData;
    type Value = Vec<Plan>;
}

/// Marker for the auth slot
#[derive(Debug, Clone, Copy)]
pub struct AuthDataSlot;

impl Slot for AuthDataSlot {
    const ID: SlotId = SlotId::AuthData;
    type Value = AuthData;
}
