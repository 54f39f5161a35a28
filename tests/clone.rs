//! Branch cloning, branch-token resolution and transactional behavior.

mod common;

use std::collections::BTreeMap;
use std::thread;

use common::{AUTHOR, Fixture, approved_listing, fedora};
use pkgdb::config::{DatabaseConfig, DefaultGroupGrant};
use pkgdb::error::Error;
use pkgdb::store::{BranchResolution, SqliteStore, Store};
use pkgdb::types::{AclKind, ApiRepr, AuditQuery, AuditTarget, StatusId, Subject};
use serde_json::json;
use tempfile::TempDir;

const PROVENPACKAGER: Subject = Subject::Group(DefaultGroupGrant::PROVENPACKAGER_ID);

fn log_len(fx: &Fixture) -> usize {
    fx.store.audit_log(&AuditQuery::default()).unwrap().len()
}

#[test]
fn test_clone_to_new_branch() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.guake, &fx.f18);
    assert_eq!(log_len(&fx), 1);

    let devel = fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap();
    assert_eq!(devel.collection_id, fx.devel.id);
    assert_eq!(devel.package_id, fx.guake.id);
    assert_eq!(devel.owner, f18.owner);
    assert_eq!(devel.status, f18.status);

    let source = fx.store.listing_acls(f18.id).unwrap();
    let target = fx.store.listing_acls(devel.id).unwrap();
    assert_eq!(source.snapshot(), target.snapshot());
    assert_eq!(
        target.get(PROVENPACKAGER).unwrap().approved(),
        [AclKind::Commit, AclKind::Checkout]
    );

    let log = fx.store.audit_log(&AuditQuery::default()).unwrap();
    let descriptions: Vec<_> = log[1..].iter().map(|e| e.description.as_str()).collect();
    assert_eq!(
        descriptions,
        [
            "pingou added a devel to Guake",
            "pingou set commit for group 100 to Approved on (Guake devel)",
            "pingou set checkout for group 100 to Approved on (Guake devel)",
        ]
    );
    assert_eq!(log[1].target, AuditTarget::Listing(devel.id));
    assert!(matches!(log[2].target, AuditTarget::GroupAcl(_)));
}

#[test]
fn test_clone_is_idempotent() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.guake, &fx.f18);

    let first = fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap();
    let after_first = fx.store.listing_acls(first.id).unwrap();
    let entries = log_len(&fx);

    let second = fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(fx.store.listing_acls(second.id).unwrap(), after_first);
    assert_eq!(log_len(&fx), entries);
}

#[test]
fn test_clone_merges_into_existing_listing() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.geany, &fx.f18);
    let devel = fx.list(&fx.geany, &fx.devel);

    let toshio = Subject::Person(20);
    let kevin = Subject::Person(30);
    fx.store
        .set_acl(f18.id, PROVENPACKAGER, AclKind::Commit, "Denied", AUTHOR)
        .unwrap();
    fx.store
        .set_acl(f18.id, toshio, AclKind::WatchBugzilla, "Approved", AUTHOR)
        .unwrap();
    fx.store
        .set_acl(devel.id, kevin, AclKind::Build, "Approved", AUTHOR)
        .unwrap();
    fx.store
        .set_acl(devel.id, toshio, AclKind::WatchBugzilla, "Obsolete", AUTHOR)
        .unwrap();
    let before = log_len(&fx);

    let cloned = fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap();
    assert_eq!(cloned.id, devel.id);

    let acls = fx.store.listing_acls(devel.id).unwrap();
    // Source wins on conflicts.
    let group = acls.get(PROVENPACKAGER).unwrap();
    assert_eq!(group.effective_status(AclKind::Commit), StatusId::DENIED);
    assert_eq!(group.effective_status(AclKind::Checkout), StatusId::APPROVED);
    assert_eq!(
        acls.get(toshio).unwrap().effective_status(AclKind::WatchBugzilla),
        StatusId::APPROVED
    );
    // Grants only the destination has are kept.
    assert_eq!(
        acls.get(kevin).unwrap().effective_status(AclKind::Build),
        StatusId::APPROVED
    );

    // Two actual changes: the group's commit and toshio's watchbugzilla.
    let log = fx.store.audit_log(&AuditQuery::default()).unwrap();
    let descriptions: Vec<_> = log[before..].iter().map(|e| e.description.as_str()).collect();
    assert_eq!(
        descriptions,
        [
            "pingou set commit for group 100 to Denied on (geany devel)",
            "pingou set watchbugzilla for person 20 to Approved on (geany devel)",
        ]
    );
}

#[test]
fn test_clone_by_name_version() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.fedocal, &fx.f18);

    let devel = fx.store.clone_listing(f18.id, "Fedora-devel", AUTHOR).unwrap();
    assert_eq!(devel.collection_id, fx.devel.id);
}

#[test]
fn test_clone_unknown_branch() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.fedocal, &fx.f18);
    let before = log_len(&fx);

    let err = fx.store.clone_listing(f18.id, "F17", AUTHOR).unwrap_err();
    assert!(matches!(err, Error::NotFound));
    assert_eq!(log_len(&fx), before);

    let err = fx.store.clone_listing(999, "devel", AUTHOR).unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[test]
fn test_clone_ambiguous_branch() {
    let fx = Fixture::in_memory();
    let mut epel = fedora("5", "Active", "el5", ".el5");
    epel.name = "Fedora-EPEL".to_string();
    fx.store.create_collection(&epel).unwrap();
    fx.store
        .create_collection(&fedora("EPEL-5", "Active", "epel5", ".epel5"))
        .unwrap();
    let f18 = fx.list(&fx.guake, &fx.f18);

    assert!(matches!(
        fx.store.resolve_branch("Fedora-EPEL-5").unwrap(),
        BranchResolution::Ambiguous(ref matches) if matches.len() == 2
    ));
    assert!(matches!(
        fx.store.collection_by_simple_name("Fedora-EPEL-5"),
        Err(Error::AmbiguousToken(_))
    ));

    let err = fx
        .store
        .clone_listing(f18.id, "Fedora-EPEL-5", AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousBranch(ref b) if b == "Fedora-EPEL-5"));

    // Branch names still resolve unambiguously.
    let el5 = fx.store.clone_listing(f18.id, "el5", AUTHOR).unwrap();
    assert_eq!(fx.store.listing_detail(el5.id).unwrap().collection.name, "Fedora-EPEL");
}

#[test]
fn test_clone_copies_empty_grant_sets() {
    let temp = TempDir::new().unwrap();
    let fx = Fixture::on_disk(&temp.path().join("pkgdb.db"));

    // A store whose new listings also get an empty set for group 7.
    let config = DatabaseConfig {
        data_dir: temp.path().to_path_buf(),
        database_file: "pkgdb.db".to_string(),
        default_groups: vec![
            DefaultGroupGrant::provenpackager(),
            DefaultGroupGrant {
                group_id: 7,
                name: "packager".to_string(),
                acls: BTreeMap::new(),
            },
        ],
        ..Default::default()
    };
    let seeding = SqliteStore::with_config(&config).unwrap();
    let f18 = seeding
        .create_listing(fx.guake.id, fx.f18.id, &approved_listing(), AUTHOR)
        .unwrap();
    let devel = fx.list(&fx.guake, &fx.devel);

    let source = fx.store.listing_acls(f18.id).unwrap();
    assert!(source.groups[&7].acls.is_empty());
    assert!(fx.store.grant_set(devel.id, Subject::Group(7)).unwrap().is_none());

    fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap();

    let target = fx.store.listing_acls(devel.id).unwrap();
    let groups: Vec<_> = target.groups.keys().copied().collect();
    assert_eq!(groups, [7, 100]);
    assert!(target.groups[&7].acls.is_empty());
}

#[test]
fn test_failed_clone_rolls_back() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.guake, &fx.f18);
    fx.store
        .set_acl(f18.id, Subject::Person(20), AclKind::Commit, "Approved", AUTHOR)
        .unwrap();
    fx.store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_person_acls BEFORE INSERT ON person_package_listing_acls
             BEGIN SELECT RAISE(ABORT, 'person acls are frozen'); END;",
        )
        .unwrap();
    let before = log_len(&fx);

    // The group grants are copied before the person grant fails.
    let err = fx.store.clone_listing(f18.id, "devel", AUTHOR).unwrap_err();
    assert!(
        matches!(err, Error::ConstraintViolation(ref msg) if msg.contains("person acls are frozen")),
        "unexpected error: {err:?}"
    );

    assert!(fx.store.listing_for(fx.guake.id, fx.devel.id).unwrap().is_none());
    assert_eq!(log_len(&fx), before);
    let group_sets: i64 = fx
        .store
        .connection()
        .query_row("SELECT COUNT(*) FROM group_package_listings", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(group_sets, 1);
}

#[test]
fn test_delete_collection_cascades() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.guake, &fx.f18);
    fx.store
        .set_acl(f18.id, Subject::Person(20), AclKind::Commit, "Approved", AUTHOR)
        .unwrap();
    let entries = log_len(&fx);

    assert!(fx.store.delete_collection(fx.f18.id).unwrap());
    assert!(fx.store.get_listing(f18.id).unwrap().is_none());
    assert!(fx.store.grant_set(f18.id, PROVENPACKAGER).unwrap().is_none());
    assert!(fx.store.package_listings(fx.guake.id).unwrap().is_empty());

    // Packages are not owned by collections, and the history outlives both.
    assert!(fx.store.get_package(fx.guake.id).unwrap().is_some());
    assert_eq!(log_len(&fx), entries);

    let orphan_count: i64 = fx
        .store
        .connection()
        .query_row("SELECT COUNT(*) FROM person_package_listing_acls", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(orphan_count, 0);
}

#[test]
fn test_concurrent_listing_creation() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pkgdb.db");
    let fx = Fixture::on_disk(&db_path);
    let other = SqliteStore::new(&db_path).unwrap();
    let (package_id, collection_id) = (fx.fedocal.id, fx.devel.id);

    let results: Vec<_> = thread::scope(|s| {
        let stores: [&SqliteStore; 2] = [&fx.store, &other];
        let handles: Vec<_> = stores
            .into_iter()
            .map(|store| {
                s.spawn(move || {
                    store.create_listing(package_id, collection_id, &approved_listing(), AUTHOR)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let created = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created, 1);
    assert!(results.iter().any(|r| matches!(r, Err(Error::DuplicateListing { .. }))));

    let listing = fx.store.listing_for(package_id, collection_id).unwrap().unwrap();
    let log = other
        .audit_log(&AuditQuery {
            target: Some(AuditTarget::Listing(listing.id)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(log.len(), 1);
}

#[test]
fn test_collection_package_counts() {
    let fx = Fixture::in_memory();
    fx.list(&fx.guake, &fx.f18);
    fx.list(&fx.geany, &fx.f18);
    let devel = fx.list(&fx.guake, &fx.devel);
    fx.store
        .set_listing_status(devel.id, "Orphaned", AUTHOR)
        .unwrap();

    let counts = fx.store.collection_package_counts().unwrap();
    let by_version: Vec<_> = counts
        .iter()
        .map(|c| (c.version.as_str(), c.package_count))
        .collect();
    assert_eq!(by_version, [("18", 2), ("devel", 0)]);
}

#[test]
fn test_export_listing() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.guake, &fx.f18);
    let detail = fx.store.listing_detail(f18.id).unwrap();

    assert_eq!(
        detail.api_repr(1).unwrap(),
        json!({
            "package": {
                "name": "Guake",
                "summary": "Top down terminal for GNOME",
                "description": null,
                "reviewurl": null,
                "upstreamurl": "http://guake.org",
            },
            "collection": {
                "name": "Fedora",
                "version": "18",
                "publishurltemplate": "http://koji.fedoraproject.org/koji",
                "pendingurltemplate": null,
            },
            "owner": 10,
            "qacontact": null,
            "specfile": null,
        })
    );
    assert!(matches!(detail.api_repr(2), Err(Error::UnsupportedVersion(2))));
}
