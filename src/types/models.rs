use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StatusId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    pub status: StatusId,
    pub should_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub status: StatusId,
    pub owner: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_url_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_url_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub branch_name: String,
    pub dist_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch_name: Option<String>,
}

impl Collection {
    /// Short name used for this collection in listings and log messages.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.branch_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageListing {
    pub id: i64,
    pub package_id: i64,
    pub collection_id: i64,
    pub owner: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_contact: Option<i64>,
    pub status: StatusId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specfile: Option<String>,
    pub status_change: DateTime<Utc>,
}

/// A listing together with the package and collection it joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetail {
    pub listing: PackageListing,
    pub package: Package,
    pub collection: Collection,
}

/// Number of approved listings on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPackageCount {
    pub collection_id: i64,
    pub name: String,
    pub version: String,
    pub status: StatusId,
    pub package_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub summary: String,
    /// Status name, resolved against the vocabulary.
    pub status: String,
    pub description: Option<String>,
    pub review_url: Option<String>,
    pub upstream_url: Option<String>,
    /// Defaults to `true` when unset.
    pub should_open: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub version: String,
    pub status: String,
    pub owner: i64,
    pub publish_url_template: Option<String>,
    pub pending_url_template: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub branch_name: String,
    pub dist_tag: String,
    pub git_branch_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub owner: i64,
    pub status: String,
    pub qa_contact: Option<i64>,
    pub specfile: Option<String>,
}

/// Filter for [`crate::store::Store::search_packages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSearch {
    /// Shell-style glob on the package name; `*` matches everything.
    pub pattern: String,
    /// Only packages listed on this branch.
    pub branch: Option<String>,
    /// Only packages with a listing owned by this person.
    pub owner: Option<i64>,
    /// Only packages with a listing in this status.
    pub listing_status: Option<String>,
}

impl Default for PackageSearch {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            branch: None,
            owner: None,
            listing_status: None,
        }
    }
}

/// Row an audit entry describes. The id is a lookup key only; entries
/// outlive the rows they point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AuditTarget {
    Package(i64),
    Listing(i64),
    GroupAcl(i64),
    PersonAcl(i64),
}

impl AuditTarget {
    pub const fn kind(self) -> &'static str {
        match self {
            AuditTarget::Package(_) => "package",
            AuditTarget::Listing(_) => "listing",
            AuditTarget::GroupAcl(_) => "group_acl",
            AuditTarget::PersonAcl(_) => "person_acl",
        }
    }

    pub const fn id(self) -> i64 {
        match self {
            AuditTarget::Package(id)
            | AuditTarget::Listing(id)
            | AuditTarget::GroupAcl(id)
            | AuditTarget::PersonAcl(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: i64) -> Option<AuditTarget> {
        match kind {
            "package" => Some(AuditTarget::Package(id)),
            "listing" => Some(AuditTarget::Listing(id)),
            "group_acl" => Some(AuditTarget::GroupAcl(id)),
            "person_acl" => Some(AuditTarget::PersonAcl(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub author: String,
    pub status: StatusId,
    pub description: String,
    pub target: AuditTarget,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub target: Option<AuditTarget>,
    pub author: Option<String>,
    /// Most recent entries to return; all when unset.
    pub limit: Option<u32>,
}
