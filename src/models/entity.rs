//! Entity identity
//!
//! Persisted records are identified by an integer key that only exists once
//! the storage layer has assigned it. `Id` makes that state explicit instead
//! of overloading `0` or `NULL` as "new".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum Id {
    /// Not yet stored; the repository assigns a key on insert
    #[default]
    Unassigned,
    /// Storage key
    Assigned(i64),
}

impl Id {
    /// Storage key, if one has been assigned
    pub fn value(self) -> Option<i64> {
        match self {
            Id::Unassigned => None,
            Id::Assigned(id) => Some(id),
        }
    }

    pub fn is_assigned(self) -> bool {
        matches!(self, Id::Assigned(_))
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Id::Assigned(id)
    }
}

impl From<Option<i64>> for Id {
    fn from(id: Option<i64>) -> Self {
        id.map_or(Id::Unassigned, Id::Assigned)
    }
}

impl From<Id> for Option<i64> {
    fn from(id: Id) -> Self {
        id.value()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Unassigned => write!(f, "unassigned"),
            Id::Assigned(id) => write!(f, "{}", id),
        }
    }
}

/// Capabilities the generic CRUD layer needs from a stored record.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name used in error messages ("post", "sheet", ...)
    const NAME: &'static str;

    fn id(&self) -> Id;

    /// Stamp creation metadata before the first insert.
    fn prepare_create(&mut self, now: DateTime<Utc>);

    /// Stamp modification metadata before an update.
    fn prepare_update(&mut self, now: DateTime<Utc>);
}
