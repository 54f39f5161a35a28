//! Listing creation, acl mutation and the audit entries they write.

mod common;

use common::{AUTHOR, Fixture, OWNER, approved_listing};
use pkgdb::config::DefaultGroupGrant;
use pkgdb::error::Error;
use pkgdb::store::Store;
use pkgdb::types::{AclKind, AuditQuery, AuditTarget, StatusId, Subject};

const PROVENPACKAGER: Subject = Subject::Group(DefaultGroupGrant::PROVENPACKAGER_ID);

#[test]
fn test_create_listing_seeds_default_grants() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);

    assert_eq!(listing.owner, OWNER);
    assert_eq!(listing.status, StatusId::APPROVED);

    let acls = fx.store.listing_acls(listing.id).unwrap();
    assert_eq!(acls.groups.len(), 1);
    assert!(acls.people.is_empty());

    let set = acls.get(PROVENPACKAGER).unwrap();
    assert_eq!(set.approved(), [AclKind::Commit, AclKind::Checkout]);
    for kind in [
        AclKind::Build,
        AclKind::WatchBugzilla,
        AclKind::WatchCommits,
        AclKind::ApproveAcls,
    ] {
        assert_eq!(set.effective_status(kind), StatusId::DENIED, "{kind}");
    }
}

#[test]
fn test_create_listing_logs_once() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);

    let log = fx.store.audit_log(&AuditQuery::default()).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].target, AuditTarget::Listing(listing.id));
    assert_eq!(log[0].status, StatusId::ADDED);
    assert_eq!(log[0].author, AUTHOR);
    assert_eq!(log[0].description, "pingou added a F18 to Guake");
}

#[test]
fn test_duplicate_listing() {
    let fx = Fixture::in_memory();
    fx.list(&fx.guake, &fx.f18);

    let err = fx
        .store
        .create_listing(fx.guake.id, fx.f18.id, &approved_listing(), AUTHOR)
        .unwrap_err();
    assert!(
        matches!(err, Error::DuplicateListing { ref package, ref collection }
            if package == "Guake" && collection == "F18"),
        "unexpected error: {err:?}"
    );

    // The failed attempt rolled back entirely.
    assert_eq!(fx.store.audit_log(&AuditQuery::default()).unwrap().len(), 1);
}

#[test]
fn test_create_listing_unknown_collection() {
    let fx = Fixture::in_memory();
    let err = fx
        .store
        .create_listing(fx.guake.id, 999, &approved_listing(), AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[test]
fn test_set_acl_creates_and_logs() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);
    let toshio = Subject::Person(20);

    let grant = fx
        .store
        .set_acl(listing.id, toshio, AclKind::WatchCommits, "Awaiting Review", AUTHOR)
        .unwrap();
    assert_eq!(grant.kind, AclKind::WatchCommits);
    assert_eq!(grant.status, StatusId::AWAITING_REVIEW);

    let set = fx.store.grant_set(listing.id, toshio).unwrap().unwrap();
    assert_eq!(set.id, grant.grant_set_id);
    assert_eq!(set.effective_status(AclKind::WatchCommits), StatusId::AWAITING_REVIEW);

    let log = fx
        .store
        .audit_log(&AuditQuery {
            target: Some(AuditTarget::PersonAcl(grant.id)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].description,
        "pingou set watchcommits for person 20 to Awaiting Review on (Guake F18)"
    );
}

#[test]
fn test_set_acl_update_logs_once() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);

    let grant = fx
        .store
        .set_acl(listing.id, PROVENPACKAGER, AclKind::Commit, "Denied", "toshio")
        .unwrap();
    assert_eq!(grant.status, StatusId::DENIED);

    let log = fx
        .store
        .audit_log(&AuditQuery {
            author: Some("toshio".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].target, AuditTarget::GroupAcl(grant.id));
    assert_eq!(log[0].status, StatusId::DENIED);

    let set = fx.store.grant_set(listing.id, PROVENPACKAGER).unwrap().unwrap();
    assert_eq!(set.approved(), [AclKind::Checkout]);
}

#[test]
fn test_set_acl_same_status_is_silent() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);
    let before = fx.store.audit_log(&AuditQuery::default()).unwrap().len();

    fx.store
        .set_acl(listing.id, PROVENPACKAGER, AclKind::Checkout, "Approved", AUTHOR)
        .unwrap();

    let after = fx.store.audit_log(&AuditQuery::default()).unwrap().len();
    assert_eq!(before, after);
}

#[test]
fn test_set_acl_rejects_non_acl_status() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.guake, &fx.f18);

    let err = fx
        .store
        .set_acl(listing.id, Subject::Person(20), AclKind::Build, "Active", AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::StatusNotApplicable { .. }));

    let err = fx
        .store
        .set_acl(listing.id, Subject::Person(20), AclKind::Build, "Bogus", AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownStatus(_)));

    // Nothing half-written.
    assert!(fx.store.grant_set(listing.id, Subject::Person(20)).unwrap().is_none());
}

#[test]
fn test_invalid_acl_kind() {
    let err = "approve".parse::<AclKind>().unwrap_err();
    assert!(matches!(err, Error::InvalidAclKind(ref s) if s == "approve"));
    assert_eq!("watchbugzilla".parse::<AclKind>().unwrap(), AclKind::WatchBugzilla);
}

#[test]
fn test_set_acl_missing_listing() {
    let fx = Fixture::in_memory();
    let err = fx
        .store
        .set_acl(42, Subject::Person(20), AclKind::Commit, "Approved", AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[test]
fn test_package_acls_by_branch() {
    let fx = Fixture::in_memory();
    let f18 = fx.list(&fx.geany, &fx.f18);
    let devel = fx.list(&fx.geany, &fx.devel);
    fx.store
        .set_acl(devel.id, Subject::Person(30), AclKind::ApproveAcls, "Approved", AUTHOR)
        .unwrap();

    let acls = fx.store.package_acls("geany").unwrap();
    let branches: Vec<_> = acls.keys().map(String::as_str).collect();
    assert_eq!(branches, ["F18", "devel"]);
    assert_eq!(acls["F18"].listing_id, f18.id);
    assert!(acls["F18"].people.is_empty());
    assert_eq!(
        acls["devel"].people[&30].effective_status(AclKind::ApproveAcls),
        StatusId::APPROVED
    );

    assert!(matches!(fx.store.package_acls("emacs"), Err(Error::NotFound)));
}

#[test]
fn test_listing_status_and_owner() {
    let fx = Fixture::in_memory();
    let listing = fx.list(&fx.fedocal, &fx.f18);

    let orphaned = fx
        .store
        .set_listing_status(listing.id, "Orphaned", AUTHOR)
        .unwrap();
    assert_eq!(orphaned.status, StatusId::ORPHANED);
    assert!(orphaned.status_change >= listing.status_change);

    let owned = fx.store.set_listing_owner(listing.id, 30, AUTHOR).unwrap();
    assert_eq!(owned.owner, 30);

    // Unchanged values are not logged.
    fx.store.set_listing_owner(listing.id, 30, AUTHOR).unwrap();

    let log = fx
        .store
        .audit_log(&AuditQuery {
            target: Some(AuditTarget::Listing(listing.id)),
            ..Default::default()
        })
        .unwrap();
    let descriptions: Vec<_> = log.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(
        descriptions,
        [
            "pingou added a F18 to fedocal",
            "pingou changed (fedocal F18) status from Approved to Orphaned",
            "pingou changed owner of (fedocal F18) from 10 to 30",
        ]
    );

    let err = fx
        .store
        .set_listing_status(listing.id, "EOL", AUTHOR)
        .unwrap_err();
    assert!(matches!(err, Error::StatusNotApplicable { .. }));
}
