use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StatusId;
use crate::error::Error;

/// One capability a person or group can hold on a package listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclKind {
    Commit,
    Build,
    WatchBugzilla,
    WatchCommits,
    ApproveAcls,
    Checkout,
}

impl AclKind {
    pub const ALL: [AclKind; 6] = [
        AclKind::Commit,
        AclKind::Build,
        AclKind::WatchBugzilla,
        AclKind::WatchCommits,
        AclKind::ApproveAcls,
        AclKind::Checkout,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AclKind::Commit => "commit",
            AclKind::Build => "build",
            AclKind::WatchBugzilla => "watchbugzilla",
            AclKind::WatchCommits => "watchcommits",
            AclKind::ApproveAcls => "approveacls",
            AclKind::Checkout => "checkout",
        }
    }

    /// Converts an acl name to its kind.
    pub fn parse(s: &str) -> Option<AclKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl FromStr for AclKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidAclKind(s.to_string()))
    }
}

impl fmt::Display for AclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person or group an acl is granted to. Ids are opaque and owned by the
/// account system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Person(i64),
    Group(i64),
}

impl Subject {
    pub const fn id(self) -> i64 {
        match self {
            Subject::Person(id) | Subject::Group(id) => id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Person(id) => write!(f, "person {id}"),
            Subject::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// A single (kind, status) grant inside a grant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrant {
    pub id: i64,
    pub grant_set_id: i64,
    pub kind: AclKind,
    pub status: StatusId,
}

/// Grants of one grant set, at most one per kind.
pub type AclSet = BTreeMap<AclKind, AclGrant>;

/// Associates one subject with one package listing and owns its grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSet {
    pub id: i64,
    pub subject: Subject,
    pub listing_id: i64,
    pub acls: AclSet,
}

impl GrantSet {
    /// Status of `kind` for this subject. A kind that was never granted is
    /// denied.
    #[must_use]
    pub fn effective_status(&self, kind: AclKind) -> StatusId {
        self.acls
            .get(&kind)
            .map_or(StatusId::DENIED, |grant| grant.status)
    }

    /// Kinds whose grant is currently approved.
    #[must_use]
    pub fn approved(&self) -> Vec<AclKind> {
        self.acls
            .values()
            .filter(|g| g.status == StatusId::APPROVED)
            .map(|g| g.kind)
            .collect()
    }
}

/// The full acl graph of one package listing, keyed by subject id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingAcls {
    pub listing_id: i64,
    pub groups: BTreeMap<i64, GrantSet>,
    pub people: BTreeMap<i64, GrantSet>,
}

impl ListingAcls {
    pub fn get(&self, subject: Subject) -> Option<&GrantSet> {
        match subject {
            Subject::Person(id) => self.people.get(&id),
            Subject::Group(id) => self.groups.get(&id),
        }
    }

    /// Groups first, then people, each in id order.
    pub fn grant_sets(&self) -> impl Iterator<Item = &GrantSet> {
        self.groups.values().chain(self.people.values())
    }

    /// Returns (subject, kind, status) triples, ignoring row ids. Two listings
    /// with equal snapshots grant the same things.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Subject, AclKind, StatusId)> {
        self.grant_sets()
            .flat_map(|set| set.acls.values().map(|g| (set.subject, g.kind, g.status)))
            .collect()
    }
}
