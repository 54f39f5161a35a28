use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a row in the status vocabulary.
///
/// Ids are stable: once a package, collection, listing, grant or audit
/// entry references one it is never renumbered or reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(pub i64);

impl StatusId {
    pub const ACTIVE: StatusId = StatusId(1);
    pub const ADDED: StatusId = StatusId(2);
    pub const APPROVED: StatusId = StatusId(3);
    pub const AWAITING_REVIEW: StatusId = StatusId(8);
    pub const DENIED: StatusId = StatusId(10);
    pub const ORPHANED: StatusId = StatusId(14);
    pub const OWNED: StatusId = StatusId(15);
    pub const RETIRED: StatusId = StatusId(21);

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StatusId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The locale every status is guaranteed to carry a label for.
pub const DEFAULT_LOCALE: &str = "C";

/// Which kind of row a status may be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDomain {
    Package,
    Collection,
    Listing,
    Acl,
}

impl StatusDomain {
    pub const ALL: [StatusDomain; 4] = [
        StatusDomain::Package,
        StatusDomain::Collection,
        StatusDomain::Listing,
        StatusDomain::Acl,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            StatusDomain::Package => "package",
            StatusDomain::Collection => "collection",
            StatusDomain::Listing => "listing",
            StatusDomain::Acl => "acl",
        }
    }

    pub fn parse(s: &str) -> Option<StatusDomain> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

impl fmt::Display for StatusDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A localized label for a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabel {
    pub status: StatusId,
    /// Language the label is actually written in; differs from the requested
    /// one when the lookup fell back to [`DEFAULT_LOCALE`].
    pub language: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
