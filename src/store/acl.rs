//! Grant sets, grant mutation and branch cloning.
//!
//! Every grant change outside listing creation goes through [`apply_acl`],
//! which is also the only place acl audit entries are written.

use rusqlite::{Connection, OptionalExtension, params};

use super::audit;
use super::resolve::{self, BranchResolution};
use super::sqlite::{ListingValues, find_listing_for, insert_listing, status_name};
use crate::config::DefaultGroupGrant;
use crate::error::{Error, Result, map_constraint};
use crate::types::*;

/// Table and column names backing one subject kind.
struct AclTables {
    sets: &'static str,
    acls: &'static str,
    subject_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubjectKind {
    Group,
    Person,
}

impl SubjectKind {
    const fn of(subject: Subject) -> Self {
        match subject {
            Subject::Group(_) => SubjectKind::Group,
            Subject::Person(_) => SubjectKind::Person,
        }
    }

    const fn subject(self, id: i64) -> Subject {
        match self {
            SubjectKind::Group => Subject::Group(id),
            SubjectKind::Person => Subject::Person(id),
        }
    }

    const fn tables(self) -> AclTables {
        match self {
            SubjectKind::Person => AclTables {
                sets: "person_package_listings",
                acls: "person_package_listing_acls",
                subject_column: "user_id",
            },
            SubjectKind::Group => AclTables {
                sets: "group_package_listings",
                acls: "group_package_listing_acls",
                subject_column: "group_id",
            },
        }
    }
}

const fn tables(subject: Subject) -> AclTables {
    SubjectKind::of(subject).tables()
}

const fn audit_target(subject: Subject, grant_id: i64) -> AuditTarget {
    match subject {
        Subject::Person(_) => AuditTarget::PersonAcl(grant_id),
        Subject::Group(_) => AuditTarget::GroupAcl(grant_id),
    }
}

/// When [`apply_acl`] writes an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AuditPolicy {
    /// Only when the grant was created or its status changed.
    Changes,
    /// For every call, including ones that leave the grant as it was.
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AclChange {
    Created,
    Updated { from: StatusId },
    Unchanged,
}

fn load_acls(conn: &Connection, subject: Subject, grant_set_id: i64) -> Result<AclSet> {
    let t = tables(subject);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, grant_set_id, acl, status_id FROM {} WHERE grant_set_id = ?1",
        t.acls
    ))?;

    let rows = stmt.query_map(params![grant_set_id], |row| {
        Ok(AclGrant {
            id: row.get(0)?,
            grant_set_id: row.get(1)?,
            kind: row.get(2)?,
            status: row.get(3)?,
        })
    })?;

    let mut acls = AclSet::new();
    for grant in rows {
        let grant = grant?;
        acls.insert(grant.kind, grant);
    }
    Ok(acls)
}

pub(super) fn find_grant_set(
    conn: &Connection,
    listing_id: i64,
    subject: Subject,
) -> Result<Option<GrantSet>> {
    let t = tables(subject);
    let id: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE {} = ?1 AND listing_id = ?2",
                t.sets, t.subject_column
            ),
            params![subject.id(), listing_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(id) = id else {
        return Ok(None);
    };

    Ok(Some(GrantSet {
        id,
        subject,
        listing_id,
        acls: load_acls(conn, subject, id)?,
    }))
}

/// Returns the id of the subject's grant set on the listing, creating an
/// empty one if needed.
pub(super) fn ensure_grant_set(conn: &Connection, listing_id: i64, subject: Subject) -> Result<i64> {
    let t = tables(subject);
    let existing: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE {} = ?1 AND listing_id = ?2",
                t.sets, t.subject_column
            ),
            params![subject.id(), listing_id],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        &format!(
            "INSERT INTO {} ({}, listing_id) VALUES (?1, ?2)",
            t.sets, t.subject_column
        ),
        params![subject.id(), listing_id],
    )
    .map_err(|e| {
        map_constraint(e, |msg| {
            if msg.contains("UNIQUE") {
                Some(Error::DuplicateGrantSet)
            } else if msg.contains("FOREIGN KEY") {
                Some(Error::NotFound)
            } else {
                None
            }
        })
    })?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a grant without logging it. Only listing creation seeds grants
/// this way; its own audit entry covers them.
pub(super) fn insert_grant(
    conn: &Connection,
    subject: Subject,
    grant_set_id: i64,
    kind: AclKind,
    status: StatusId,
) -> Result<i64> {
    let t = tables(subject);
    conn.execute(
        &format!(
            "INSERT INTO {} (grant_set_id, acl, status_id) VALUES (?1, ?2, ?3)",
            t.acls
        ),
        params![grant_set_id, kind, status],
    )
    .map_err(|e| map_constraint(e, |_| None))?;
    Ok(conn.last_insert_rowid())
}

pub(super) fn listing_acls(conn: &Connection, listing_id: i64) -> Result<ListingAcls> {
    let mut acls = ListingAcls {
        listing_id,
        ..Default::default()
    };

    for kind in [SubjectKind::Group, SubjectKind::Person] {
        let t = kind.tables();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, {col} FROM {} WHERE listing_id = ?1 ORDER BY {col}",
            t.sets,
            col = t.subject_column
        ))?;
        let sets = stmt
            .query_map(params![listing_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (id, subject_id) in sets {
            let subject = kind.subject(subject_id);
            let set = GrantSet {
                id,
                subject,
                listing_id,
                acls: load_acls(conn, subject, id)?,
            };
            match kind {
                SubjectKind::Group => acls.groups.insert(subject_id, set),
                SubjectKind::Person => acls.people.insert(subject_id, set),
            };
        }
    }

    Ok(acls)
}

/// Sets `kind` for `subject` on the listing to `status`, creating the grant
/// set and grant as needed, and logs per `policy`.
pub(super) fn apply_acl(
    conn: &Connection,
    listing: &ListingDetail,
    subject: Subject,
    kind: AclKind,
    status: StatusId,
    author: &str,
    policy: AuditPolicy,
) -> Result<(AclGrant, AclChange)> {
    let t = tables(subject);
    let grant_set_id = ensure_grant_set(conn, listing.listing.id, subject)?;

    let existing: Option<(i64, StatusId)> = conn
        .query_row(
            &format!(
                "SELECT id, status_id FROM {} WHERE grant_set_id = ?1 AND acl = ?2",
                t.acls
            ),
            params![grant_set_id, kind],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (grant_id, change) = match existing {
        None => {
            let id = insert_grant(conn, subject, grant_set_id, kind, status)?;
            (id, AclChange::Created)
        }
        Some((id, current)) if current != status => {
            conn.execute(
                &format!("UPDATE {} SET status_id = ?1 WHERE id = ?2", t.acls),
                params![status, id],
            )
            .map_err(|e| map_constraint(e, |_| None))?;
            (id, AclChange::Updated { from: current })
        }
        Some((id, _)) => (id, AclChange::Unchanged),
    };

    if change != AclChange::Unchanged || policy == AuditPolicy::Always {
        let message = format!(
            "{author} set {kind} for {subject} to {} on ({} {})",
            status_name(conn, status)?,
            listing.package.name,
            listing.collection.simple_name()
        );
        audit::append(conn, author, status, audit_target(subject, grant_id), &message)?;
    }

    let grant = AclGrant {
        id: grant_id,
        grant_set_id,
        kind,
        status,
    };
    Ok((grant, change))
}

/// Merges the source listing's grants into the listing of the same package
/// on `target_branch`.
///
/// The destination keeps grants the source does not have; where both have a
/// grant for the same subject and kind, the source status wins. When the
/// destination listing has to be created first, every replayed grant is
/// logged. Otherwise only actual changes are, so re-running a clone with no
/// upstream changes logs nothing.
pub(super) fn clone_listing(
    conn: &Connection,
    source: &ListingDetail,
    target_branch: &str,
    author: &str,
    default_groups: &[DefaultGroupGrant],
) -> Result<PackageListing> {
    let collection = match resolve::resolve(conn, target_branch)? {
        BranchResolution::BranchMatch(c) | BranchResolution::NameVersionMatch(c) => c,
        BranchResolution::NotFound => return Err(Error::NotFound),
        BranchResolution::Ambiguous(_) => {
            return Err(Error::AmbiguousBranch(target_branch.to_string()));
        }
    };

    let (destination, policy) = match find_listing_for(conn, source.package.id, collection.id)? {
        Some(listing) => (listing, AuditPolicy::Changes),
        None => {
            let values = ListingValues {
                owner: source.listing.owner,
                qa_contact: source.listing.qa_contact,
                specfile: None,
                status: source.listing.status,
            };
            let listing = insert_listing(
                conn,
                &source.package,
                &collection,
                &values,
                author,
                default_groups,
            )?;
            (listing, AuditPolicy::Always)
        }
    };

    let target = ListingDetail {
        listing: destination,
        package: source.package.clone(),
        collection,
    };

    let mut changed = 0usize;
    for set in listing_acls(conn, source.listing.id)?.grant_sets() {
        ensure_grant_set(conn, target.listing.id, set.subject)?;
        for grant in set.acls.values() {
            let (_, change) = apply_acl(
                conn,
                &target,
                set.subject,
                grant.kind,
                grant.status,
                author,
                policy,
            )?;
            if change != AclChange::Unchanged {
                changed += 1;
                tracing::debug!(
                    "Cloned {} for {} to {} on {}",
                    grant.kind,
                    set.subject,
                    target.collection.simple_name(),
                    target.package.name
                );
            }
        }
    }

    tracing::info!(
        "Cloned {} ({}) to {}: {} grants changed",
        source.package.name,
        source.collection.simple_name(),
        target.collection.simple_name(),
        changed
    );

    Ok(target.listing)
}
