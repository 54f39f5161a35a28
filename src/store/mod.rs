mod acl;
mod audit;
mod resolve;
mod schema;
mod sqlite;

pub use resolve::BranchResolution;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every mutating operation runs in a single transaction: either all of its
/// rows and audit entries are written, or none are.
pub trait Store: Send + Sync {
    /// Creates the schema and seeds the status vocabulary. Idempotent.
    fn initialize(&self) -> Result<()>;

    // Status vocabulary
    fn status_id(&self, name: &str) -> Result<StatusId>;
    fn status_label(&self, id: StatusId, language: &str) -> Result<StatusLabel>;
    fn add_status(
        &self,
        name: &str,
        domains: &[StatusDomain],
        description: Option<&str>,
    ) -> Result<StatusId>;
    fn add_status_translation(
        &self,
        id: StatusId,
        language: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()>;
    fn delete_status(&self, id: StatusId) -> Result<bool>;

    // Package operations
    fn create_package(&self, package: &NewPackage) -> Result<Package>;
    fn get_package(&self, id: i64) -> Result<Option<Package>>;
    fn package_by_name(&self, name: &str) -> Result<Package>;
    fn search_packages(&self, search: &PackageSearch) -> Result<Vec<Package>>;
    fn set_package_status(&self, package_id: i64, status: &str, author: &str) -> Result<Package>;
    fn delete_package(&self, name: &str) -> Result<bool>;

    // Collection operations
    fn create_collection(&self, collection: &NewCollection) -> Result<Collection>;
    fn get_collection(&self, id: i64) -> Result<Option<Collection>>;
    fn list_collections(&self) -> Result<Vec<Collection>>;
    fn resolve_branch(&self, token: &str) -> Result<BranchResolution>;
    fn collection_by_simple_name(&self, token: &str) -> Result<Collection>;
    fn collection_package_counts(&self) -> Result<Vec<CollectionPackageCount>>;
    fn delete_collection(&self, id: i64) -> Result<bool>;

    // Listing operations
    fn create_listing(
        &self,
        package_id: i64,
        collection_id: i64,
        listing: &NewListing,
        author: &str,
    ) -> Result<PackageListing>;
    fn get_listing(&self, id: i64) -> Result<Option<PackageListing>>;
    fn listing_for(&self, package_id: i64, collection_id: i64) -> Result<Option<PackageListing>>;
    fn listing_detail(&self, id: i64) -> Result<ListingDetail>;
    /// Listings of a package keyed by collection simple name.
    fn package_listings(&self, package_id: i64) -> Result<BTreeMap<String, PackageListing>>;
    fn set_listing_status(
        &self,
        listing_id: i64,
        status: &str,
        author: &str,
    ) -> Result<PackageListing>;
    fn set_listing_owner(
        &self,
        listing_id: i64,
        owner: i64,
        author: &str,
    ) -> Result<PackageListing>;

    // Acl operations
    fn grant_set(&self, listing_id: i64, subject: Subject) -> Result<Option<GrantSet>>;
    fn listing_acls(&self, listing_id: i64) -> Result<ListingAcls>;
    /// Acl graphs of every listing of a package, keyed by collection simple name.
    fn package_acls(&self, package_name: &str) -> Result<BTreeMap<String, ListingAcls>>;
    /// Creates or updates one grant. Logs exactly one audit entry when the
    /// grant changed and none when it already had `status`.
    fn set_acl(
        &self,
        listing_id: i64,
        subject: Subject,
        kind: AclKind,
        status: &str,
        author: &str,
    ) -> Result<AclGrant>;
    /// Merges this listing's acls into the listing of the same package on
    /// `target_branch`, creating that listing if needed.
    fn clone_listing(
        &self,
        source_listing_id: i64,
        target_branch: &str,
        author: &str,
    ) -> Result<PackageListing>;

    // Audit log
    fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>>;

    fn close(&self) -> Result<()>;
}
