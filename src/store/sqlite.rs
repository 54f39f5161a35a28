use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, Transaction, TransactionBehavior, params};

use super::Store;
use super::resolve::{self, BranchResolution};
use super::schema::{SCHEMA, SEED_STATUSES};
use super::{acl, audit};
use crate::config::{DatabaseConfig, DefaultGroupGrant};
use crate::error::{Error, Result, classify, map_constraint};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    default_groups: Vec<DefaultGroupGrant>,
    default_locale: String,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::open(db_path, &DatabaseConfig::default())
    }

    pub fn with_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(config.db_path(), config)
    }

    fn open<P: AsRef<Path>>(db_path: P, config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(config.busy_timeout())?;

        Ok(Self::from_connection(conn, config))
    }

    /// Opens a private in-memory database with the default configuration.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self::from_connection(conn, &DatabaseConfig::default()))
    }

    fn from_connection(conn: Connection, config: &DatabaseConfig) -> Self {
        Self {
            conn: Mutex::new(conn),
            default_groups: config.default_groups.clone(),
            default_locale: config.default_locale.clone(),
        }
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }

    /// Runs `f` inside an immediate transaction. The write lock is taken up
    /// front so that concurrent writers serialize instead of failing midway;
    /// any error drops the transaction, which rolls it back.
    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

pub(super) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl ToSql for StatusId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for StatusId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(StatusId)
    }
}

impl ToSql for AclKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AclKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        AclKind::parse(s)
            .ok_or_else(|| FromSqlError::Other(Box::new(Error::InvalidAclKind(s.to_string()))))
    }
}

// Row mapping. Queries alias packages as p, collections as c and
// package_listings as pl.

const PACKAGE_COLUMNS: &str =
    "p.id, p.name, p.summary, p.description, p.review_url, p.upstream_url, p.status_id, p.should_open";

const COLLECTION_COLUMNS: &str = "c.id, c.name, c.version, c.status_id, c.owner, \
     c.publish_url_template, c.pending_url_template, c.summary, c.description, \
     c.branch_name, c.dist_tag, c.git_branch_name";

const LISTING_COLUMNS: &str = "pl.id, pl.package_id, pl.collection_id, pl.owner, pl.qa_contact, \
     pl.status_id, pl.specfile, pl.status_change";

fn package_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        name: row.get(1)?,
        summary: row.get(2)?,
        description: row.get(3)?,
        review_url: row.get(4)?,
        upstream_url: row.get(5)?,
        status: row.get(6)?,
        should_open: row.get(7)?,
    })
}

pub(super) fn collection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        version: row.get(2)?,
        status: row.get(3)?,
        owner: row.get(4)?,
        publish_url_template: row.get(5)?,
        pending_url_template: row.get(6)?,
        summary: row.get(7)?,
        description: row.get(8)?,
        branch_name: row.get(9)?,
        dist_tag: row.get(10)?,
        git_branch_name: row.get(11)?,
    })
}

fn listing_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PackageListing> {
    Ok(PackageListing {
        id: row.get(0)?,
        package_id: row.get(1)?,
        collection_id: row.get(2)?,
        owner: row.get(3)?,
        qa_contact: row.get(4)?,
        status: row.get(5)?,
        specfile: row.get(6)?,
        status_change: parse_datetime(&row.get::<_, String>(7)?),
    })
}

// Status helpers

/// Resolves a status by its `C` name.
pub(super) fn lookup_status(conn: &Connection, name: &str) -> Result<StatusId> {
    conn.query_row(
        "SELECT status_id FROM status_translations WHERE language = ?1 AND name = ?2",
        params![DEFAULT_LOCALE, name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::UnknownStatus(name.to_string()))
}

/// Resolves a status by name and checks it may be assigned to `domain`.
pub(super) fn resolve_status(conn: &Connection, name: &str, domain: StatusDomain) -> Result<StatusId> {
    let id = lookup_status(conn, name)?;
    let applicable: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM status_domains WHERE status_id = ?1 AND domain = ?2)",
        params![id, domain.as_str()],
        |row| row.get(0),
    )?;

    if !applicable {
        return Err(Error::StatusNotApplicable {
            status: name.to_string(),
            domain: domain.to_string(),
        });
    }
    Ok(id)
}

/// `C` name of a status, as written into audit messages.
pub(super) fn status_name(conn: &Connection, id: StatusId) -> Result<String> {
    conn.query_row(
        "SELECT name FROM status_translations WHERE status_id = ?1 AND language = ?2",
        params![id, DEFAULT_LOCALE],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(Error::NotFound)
}

fn translation(conn: &Connection, id: StatusId, language: &str) -> Result<Option<StatusLabel>> {
    conn.query_row(
        "SELECT status_id, language, name, description
         FROM status_translations WHERE status_id = ?1 AND language = ?2",
        params![id, language],
        |row| {
            Ok(StatusLabel {
                status: row.get(0)?,
                language: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(Error::from)
}

fn insert_translation(
    conn: &Connection,
    id: StatusId,
    language: &str,
    name: &str,
    description: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO status_translations (status_id, language, name, description)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, language, name, description],
    )
    .map_err(|e| {
        map_constraint(e, |msg| {
            if msg.contains("status_translations.name") {
                Some(Error::DuplicateStatusName(name.to_string()))
            } else if msg.contains("status_translations") {
                Some(Error::DuplicateTranslation)
            } else if msg.contains("FOREIGN KEY") {
                Some(Error::NotFound)
            } else {
                None
            }
        })
    })?;
    Ok(())
}

// Entity lookups shared with the acl and clone code

pub(super) fn find_package(conn: &Connection, id: i64) -> Result<Option<Package>> {
    conn.query_row(
        &format!("SELECT {PACKAGE_COLUMNS} FROM packages p WHERE p.id = ?1"),
        params![id],
        package_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn find_package_by_name(conn: &Connection, name: &str) -> Result<Option<Package>> {
    conn.query_row(
        &format!("SELECT {PACKAGE_COLUMNS} FROM packages p WHERE p.name = ?1"),
        params![name],
        package_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn find_collection(conn: &Connection, id: i64) -> Result<Option<Collection>> {
    conn.query_row(
        &format!("SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.id = ?1"),
        params![id],
        collection_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn find_collection_by_branch(conn: &Connection, branch: &str) -> Result<Option<Collection>> {
    conn.query_row(
        &format!("SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.branch_name = ?1"),
        params![branch],
        collection_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Collections whose `name-version` rendering is exactly `token`.
pub(super) fn collections_by_rendered_name(conn: &Connection, token: &str) -> Result<Vec<Collection>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections c
         WHERE c.name || '-' || c.version = ?1 ORDER BY c.id"
    ))?;

    let rows = stmt.query_map(params![token], collection_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn find_listing(conn: &Connection, id: i64) -> Result<Option<PackageListing>> {
    conn.query_row(
        &format!("SELECT {LISTING_COLUMNS} FROM package_listings pl WHERE pl.id = ?1"),
        params![id],
        listing_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn find_listing_for(
    conn: &Connection,
    package_id: i64,
    collection_id: i64,
) -> Result<Option<PackageListing>> {
    conn.query_row(
        &format!(
            "SELECT {LISTING_COLUMNS} FROM package_listings pl
             WHERE pl.package_id = ?1 AND pl.collection_id = ?2"
        ),
        params![package_id, collection_id],
        listing_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn load_detail(conn: &Connection, listing_id: i64) -> Result<ListingDetail> {
    let listing = find_listing(conn, listing_id)?.ok_or(Error::NotFound)?;
    let package = find_package(conn, listing.package_id)?.ok_or(Error::NotFound)?;
    let collection = find_collection(conn, listing.collection_id)?.ok_or(Error::NotFound)?;
    Ok(ListingDetail {
        listing,
        package,
        collection,
    })
}

/// Column values of a listing about to be inserted.
pub(super) struct ListingValues<'a> {
    pub owner: i64,
    pub qa_contact: Option<i64>,
    pub specfile: Option<&'a str>,
    pub status: StatusId,
}

/// Inserts a listing for (package, collection), seeds the default group
/// grants and logs the creation.
pub(super) fn insert_listing(
    conn: &Connection,
    package: &Package,
    collection: &Collection,
    values: &ListingValues<'_>,
    author: &str,
    default_groups: &[DefaultGroupGrant],
) -> Result<PackageListing> {
    conn.execute(
        "INSERT INTO package_listings
             (package_id, collection_id, owner, qa_contact, status_id, specfile, status_change)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            package.id,
            collection.id,
            values.owner,
            values.qa_contact,
            values.status,
            values.specfile,
            format_datetime(&Utc::now()),
        ],
    )
    .map_err(|e| {
        map_constraint(e, |msg| {
            msg.contains("package_listings.package_id")
                .then(|| Error::DuplicateListing {
                    package: package.name.clone(),
                    collection: collection.simple_name().to_string(),
                })
        })
    })?;
    let listing_id = conn.last_insert_rowid();

    for group in default_groups {
        let grant_set_id = acl::ensure_grant_set(conn, listing_id, Subject::Group(group.group_id))?;
        for (kind, acl_status) in group.grants() {
            acl::insert_grant(conn, Subject::Group(group.group_id), grant_set_id, kind, acl_status)?;
        }
    }

    audit::append(
        conn,
        author,
        StatusId::ADDED,
        AuditTarget::Listing(listing_id),
        &format!(
            "{author} added a {} to {}",
            collection.simple_name(),
            package.name
        ),
    )?;

    tracing::info!(
        "Created listing {} for {} on {}",
        listing_id,
        package.name,
        collection.simple_name()
    );

    find_listing(conn, listing_id)?.ok_or(Error::NotFound)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;

        self.write(|tx| {
            for (id, name, domains) in SEED_STATUSES {
                tx.execute(
                    "INSERT OR IGNORE INTO status_codes (id) VALUES (?1)",
                    params![id],
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO status_translations (status_id, language, name)
                     VALUES (?1, ?2, ?3)",
                    params![id, DEFAULT_LOCALE, name],
                )?;
                for domain in *domains {
                    tx.execute(
                        "INSERT OR IGNORE INTO status_domains (status_id, domain) VALUES (?1, ?2)",
                        params![id, domain],
                    )?;
                }
            }
            Ok(())
        })
    }

    // Status vocabulary

    fn status_id(&self, name: &str) -> Result<StatusId> {
        lookup_status(&self.conn(), name)
    }

    fn status_label(&self, id: StatusId, language: &str) -> Result<StatusLabel> {
        let conn = self.conn();

        if let Some(label) = translation(&conn, id, language)? {
            return Ok(label);
        }

        for fallback in [self.default_locale.as_str(), DEFAULT_LOCALE] {
            if fallback == language {
                continue;
            }
            if let Some(label) = translation(&conn, id, fallback)? {
                tracing::debug!(
                    "No '{}' label for status {}, using '{}'",
                    language,
                    id,
                    fallback
                );
                return Ok(label);
            }
        }

        Err(Error::NotFound)
    }

    fn add_status(
        &self,
        name: &str,
        domains: &[StatusDomain],
        description: Option<&str>,
    ) -> Result<StatusId> {
        self.write(|tx| {
            tx.execute("INSERT INTO status_codes DEFAULT VALUES", [])?;
            let id = StatusId(tx.last_insert_rowid());

            insert_translation(tx, id, DEFAULT_LOCALE, name, description)?;
            for domain in domains {
                tx.execute(
                    "INSERT OR IGNORE INTO status_domains (status_id, domain) VALUES (?1, ?2)",
                    params![id, domain.as_str()],
                )?;
            }

            tracing::info!("Added status {} '{}'", id, name);
            Ok(id)
        })
    }

    fn add_status_translation(
        &self,
        id: StatusId,
        language: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        self.write(|tx| insert_translation(tx, id, language, name, description))
    }

    fn delete_status(&self, id: StatusId) -> Result<bool> {
        self.write(|tx| {
            let rows = tx
                .execute("DELETE FROM status_codes WHERE id = ?1", params![id])
                .map_err(|e| {
                    map_constraint(e, |msg| {
                        msg.contains("FOREIGN KEY").then_some(Error::StatusInUse(id.get()))
                    })
                })?;
            Ok(rows > 0)
        })
    }

    // Package operations

    fn create_package(&self, package: &NewPackage) -> Result<Package> {
        self.write(|tx| {
            let status = resolve_status(tx, &package.status, StatusDomain::Package)?;

            tx.execute(
                "INSERT INTO packages
                     (name, summary, description, review_url, upstream_url, status_id, should_open)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    package.name,
                    package.summary,
                    package.description,
                    package.review_url,
                    package.upstream_url,
                    status,
                    package.should_open.unwrap_or(true),
                ],
            )
            .map_err(|e| {
                map_constraint(e, |msg| {
                    msg.contains("packages.name")
                        .then(|| Error::DuplicateName(package.name.clone()))
                })
            })?;

            tracing::info!("Created package {}", package.name);
            find_package(tx, tx.last_insert_rowid())?.ok_or(Error::NotFound)
        })
    }

    fn get_package(&self, id: i64) -> Result<Option<Package>> {
        find_package(&self.conn(), id)
    }

    fn package_by_name(&self, name: &str) -> Result<Package> {
        find_package_by_name(&self.conn(), name)?.ok_or(Error::NotFound)
    }

    fn search_packages(&self, search: &PackageSearch) -> Result<Vec<Package>> {
        let pattern = glob::Pattern::new(&search.pattern)
            .map_err(|e| Error::InvalidPattern(format!("{}: {}", search.pattern, e)))?;

        let conn = self.conn();
        let listing_status = search
            .listing_status
            .as_deref()
            .map(|name| resolve_status(&conn, name, StatusDomain::Listing))
            .transpose()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {PACKAGE_COLUMNS} FROM packages p
             LEFT JOIN package_listings pl ON pl.package_id = p.id
             LEFT JOIN collections c ON c.id = pl.collection_id
             WHERE (?1 IS NULL OR c.branch_name = ?1)
               AND (?2 IS NULL OR pl.owner = ?2)
               AND (?3 IS NULL OR pl.status_id = ?3)
             ORDER BY p.name"
        ))?;

        let rows = stmt.query_map(
            params![search.branch, search.owner, listing_status],
            package_from_row,
        )?;

        let mut packages = Vec::new();
        for package in rows {
            let package = package?;
            if pattern.matches(&package.name) {
                packages.push(package);
            }
        }
        Ok(packages)
    }

    fn set_package_status(&self, package_id: i64, status: &str, author: &str) -> Result<Package> {
        self.write(|tx| {
            let package = find_package(tx, package_id)?.ok_or(Error::NotFound)?;
            let new_status = resolve_status(tx, status, StatusDomain::Package)?;
            if package.status == new_status {
                return Ok(package);
            }

            let old_name = status_name(tx, package.status)?;
            tx.execute(
                "UPDATE packages SET status_id = ?1 WHERE id = ?2",
                params![new_status, package_id],
            )
            .map_err(classify)?;

            audit::append(
                tx,
                author,
                new_status,
                AuditTarget::Package(package_id),
                &format!(
                    "{author} changed {} status from {old_name} to {status}",
                    package.name
                ),
            )?;

            find_package(tx, package_id)?.ok_or(Error::NotFound)
        })
    }

    fn delete_package(&self, name: &str) -> Result<bool> {
        self.write(|tx| {
            let Some(package) = find_package_by_name(tx, name)? else {
                return Ok(false);
            };

            let listings: i64 = tx.query_row(
                "SELECT COUNT(*) FROM package_listings WHERE package_id = ?1",
                params![package.id],
                |row| row.get(0),
            )?;
            if listings > 0 {
                return Err(Error::PackageInUse(package.name));
            }

            let rows = tx
                .execute("DELETE FROM packages WHERE id = ?1", params![package.id])
                .map_err(classify)?;
            Ok(rows > 0)
        })
    }

    // Collection operations

    fn create_collection(&self, collection: &NewCollection) -> Result<Collection> {
        self.write(|tx| {
            let status = resolve_status(tx, &collection.status, StatusDomain::Collection)?;

            tx.execute(
                "INSERT INTO collections
                     (name, version, status_id, owner, publish_url_template, pending_url_template,
                      summary, description, branch_name, dist_tag, git_branch_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    collection.name,
                    collection.version,
                    status,
                    collection.owner,
                    collection.publish_url_template,
                    collection.pending_url_template,
                    collection.summary,
                    collection.description,
                    collection.branch_name,
                    collection.dist_tag,
                    collection.git_branch_name,
                ],
            )
            .map_err(|e| {
                map_constraint(e, |msg| {
                    if msg.contains("collections.branch_name") {
                        Some(Error::DuplicateBranch(collection.branch_name.clone()))
                    } else if msg.contains("collections.dist_tag") {
                        Some(Error::DuplicateDistTag(collection.dist_tag.clone()))
                    } else if msg.contains("collections.name") {
                        Some(Error::DuplicateNameVersion {
                            name: collection.name.clone(),
                            version: collection.version.clone(),
                        })
                    } else {
                        None
                    }
                })
            })?;

            tracing::info!(
                "Created collection {} {} ({})",
                collection.name,
                collection.version,
                collection.branch_name
            );
            find_collection(tx, tx.last_insert_rowid())?.ok_or(Error::NotFound)
        })
    }

    fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        find_collection(&self.conn(), id)
    }

    fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections c ORDER BY c.name, c.version"
        ))?;

        let rows = stmt.query_map([], collection_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn resolve_branch(&self, token: &str) -> Result<BranchResolution> {
        resolve::resolve(&self.conn(), token)
    }

    fn collection_by_simple_name(&self, token: &str) -> Result<Collection> {
        match self.resolve_branch(token)? {
            BranchResolution::BranchMatch(c) | BranchResolution::NameVersionMatch(c) => Ok(c),
            BranchResolution::NotFound => Err(Error::NotFound),
            BranchResolution::Ambiguous(_) => Err(Error::AmbiguousToken(token.to_string())),
        }
    }

    fn collection_package_counts(&self) -> Result<Vec<CollectionPackageCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, version, status_id, package_count FROM collection_packages",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CollectionPackageCount {
                collection_id: row.get(0)?,
                name: row.get(1)?,
                version: row.get(2)?,
                status: row.get(3)?,
                package_count: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_collection(&self, id: i64) -> Result<bool> {
        self.write(|tx| {
            let rows = tx
                .execute("DELETE FROM collections WHERE id = ?1", params![id])
                .map_err(classify)?;
            if rows > 0 {
                tracing::info!("Deleted collection {}", id);
            }
            Ok(rows > 0)
        })
    }

    // Listing operations

    fn create_listing(
        &self,
        package_id: i64,
        collection_id: i64,
        listing: &NewListing,
        author: &str,
    ) -> Result<PackageListing> {
        self.write(|tx| {
            let package = find_package(tx, package_id)?.ok_or(Error::NotFound)?;
            let collection = find_collection(tx, collection_id)?.ok_or(Error::NotFound)?;
            let status = resolve_status(tx, &listing.status, StatusDomain::Listing)?;

            let values = ListingValues {
                owner: listing.owner,
                qa_contact: listing.qa_contact,
                specfile: listing.specfile.as_deref(),
                status,
            };
            insert_listing(
                tx,
                &package,
                &collection,
                &values,
                author,
                &self.default_groups,
            )
        })
    }

    fn get_listing(&self, id: i64) -> Result<Option<PackageListing>> {
        find_listing(&self.conn(), id)
    }

    fn listing_for(&self, package_id: i64, collection_id: i64) -> Result<Option<PackageListing>> {
        find_listing_for(&self.conn(), package_id, collection_id)
    }

    fn listing_detail(&self, id: i64) -> Result<ListingDetail> {
        load_detail(&self.conn(), id)
    }

    fn package_listings(&self, package_id: i64) -> Result<BTreeMap<String, PackageListing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS}, c.branch_name FROM package_listings pl
             JOIN collections c ON c.id = pl.collection_id
             WHERE pl.package_id = ?1"
        ))?;

        let rows = stmt.query_map(params![package_id], |row| {
            Ok((row.get::<_, String>(8)?, listing_from_row(row)?))
        })?;

        rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map_err(Error::from)
    }

    fn set_listing_status(
        &self,
        listing_id: i64,
        status: &str,
        author: &str,
    ) -> Result<PackageListing> {
        self.write(|tx| {
            let detail = load_detail(tx, listing_id)?;
            let new_status = resolve_status(tx, status, StatusDomain::Listing)?;
            if detail.listing.status == new_status {
                return Ok(detail.listing);
            }

            let old_name = status_name(tx, detail.listing.status)?;
            tx.execute(
                "UPDATE package_listings SET status_id = ?1, status_change = ?2 WHERE id = ?3",
                params![new_status, format_datetime(&Utc::now()), listing_id],
            )
            .map_err(classify)?;

            audit::append(
                tx,
                author,
                new_status,
                AuditTarget::Listing(listing_id),
                &format!(
                    "{author} changed ({} {}) status from {old_name} to {status}",
                    detail.package.name,
                    detail.collection.simple_name()
                ),
            )?;

            find_listing(tx, listing_id)?.ok_or(Error::NotFound)
        })
    }

    fn set_listing_owner(
        &self,
        listing_id: i64,
        owner: i64,
        author: &str,
    ) -> Result<PackageListing> {
        self.write(|tx| {
            let detail = load_detail(tx, listing_id)?;
            if detail.listing.owner == owner {
                return Ok(detail.listing);
            }

            tx.execute(
                "UPDATE package_listings SET owner = ?1 WHERE id = ?2",
                params![owner, listing_id],
            )
            .map_err(classify)?;

            audit::append(
                tx,
                author,
                StatusId::OWNED,
                AuditTarget::Listing(listing_id),
                &format!(
                    "{author} changed owner of ({} {}) from {} to {owner}",
                    detail.package.name,
                    detail.collection.simple_name(),
                    detail.listing.owner
                ),
            )?;

            find_listing(tx, listing_id)?.ok_or(Error::NotFound)
        })
    }

    // Acl operations

    fn grant_set(&self, listing_id: i64, subject: Subject) -> Result<Option<GrantSet>> {
        acl::find_grant_set(&self.conn(), listing_id, subject)
    }

    fn listing_acls(&self, listing_id: i64) -> Result<ListingAcls> {
        let conn = self.conn();
        find_listing(&conn, listing_id)?.ok_or(Error::NotFound)?;
        acl::listing_acls(&conn, listing_id)
    }

    fn package_acls(&self, package_name: &str) -> Result<BTreeMap<String, ListingAcls>> {
        let package = self.package_by_name(package_name)?;
        let listings = self.package_listings(package.id)?;

        let conn = self.conn();
        listings
            .into_iter()
            .map(|(branch, listing)| Ok((branch, acl::listing_acls(&conn, listing.id)?)))
            .collect()
    }

    fn set_acl(
        &self,
        listing_id: i64,
        subject: Subject,
        kind: AclKind,
        status: &str,
        author: &str,
    ) -> Result<AclGrant> {
        self.write(|tx| {
            let detail = load_detail(tx, listing_id)?;
            let status = resolve_status(tx, status, StatusDomain::Acl)?;
            let (grant, _) = acl::apply_acl(
                tx,
                &detail,
                subject,
                kind,
                status,
                author,
                acl::AuditPolicy::Changes,
            )?;
            Ok(grant)
        })
    }

    fn clone_listing(
        &self,
        source_listing_id: i64,
        target_branch: &str,
        author: &str,
    ) -> Result<PackageListing> {
        self.write(|tx| {
            let source = load_detail(tx, source_listing_id)?;
            acl::clone_listing(tx, &source, target_branch, author, &self.default_groups)
        })
    }

    // Audit log

    fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        audit::query(&self.conn(), query)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
