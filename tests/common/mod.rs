//! Shared fixtures: the Guake, fedocal and geany packages on Fedora 18 and
//! Fedora devel.

#![allow(dead_code)]

use std::path::Path;

use pkgdb::store::{SqliteStore, Store};
use pkgdb::types::{Collection, NewCollection, NewListing, NewPackage, Package, PackageListing};

pub const AUTHOR: &str = "pingou";
pub const OWNER: i64 = 10;

pub struct Fixture {
    pub store: SqliteStore,
    pub guake: Package,
    pub fedocal: Package,
    pub geany: Package,
    pub f18: Collection,
    pub devel: Collection,
}

impl Fixture {
    pub fn in_memory() -> Self {
        Self::with_store(SqliteStore::open_in_memory().expect("open in-memory store"))
    }

    pub fn on_disk(db_path: &Path) -> Self {
        Self::with_store(SqliteStore::new(db_path).expect("open store"))
    }

    fn with_store(store: SqliteStore) -> Self {
        store.initialize().expect("initialize store");

        let guake = store
            .create_package(&package(
                "Guake",
                "Top down terminal for GNOME",
                "http://guake.org",
            ))
            .expect("create Guake");
        let fedocal = store
            .create_package(&package(
                "fedocal",
                "A web-based calendar for Fedora",
                "http://fedorahosted.org/fedocal",
            ))
            .expect("create fedocal");
        let geany = store
            .create_package(&package(
                "geany",
                "A fast and lightweight IDE using GTK2",
                "http://www.geany.org",
            ))
            .expect("create geany");

        let f18 = store
            .create_collection(&fedora("18", "Active", "F18", ".fc18"))
            .expect("create F18");
        let devel = store
            .create_collection(&fedora("devel", "Under Development", "devel", ".fc19"))
            .expect("create devel");

        Self {
            store,
            guake,
            fedocal,
            geany,
            f18,
            devel,
        }
    }

    /// Lists `package` on `collection` as Approved, owned by [`OWNER`].
    pub fn list(&self, package: &Package, collection: &Collection) -> PackageListing {
        self.store
            .create_listing(package.id, collection.id, &approved_listing(), AUTHOR)
            .expect("create listing")
    }
}

pub fn package(name: &str, summary: &str, upstream_url: &str) -> NewPackage {
    NewPackage {
        name: name.to_string(),
        summary: summary.to_string(),
        status: "Approved".to_string(),
        upstream_url: Some(upstream_url.to_string()),
        ..Default::default()
    }
}

pub fn fedora(version: &str, status: &str, branch: &str, dist_tag: &str) -> NewCollection {
    NewCollection {
        name: "Fedora".to_string(),
        version: version.to_string(),
        status: status.to_string(),
        owner: OWNER,
        publish_url_template: Some("http://koji.fedoraproject.org/koji".to_string()),
        summary: Some(format!("Fedora {version}")),
        branch_name: branch.to_string(),
        dist_tag: dist_tag.to_string(),
        git_branch_name: Some(branch.to_string()),
        ..Default::default()
    }
}

pub fn approved_listing() -> NewListing {
    NewListing {
        owner: OWNER,
        status: "Approved".to_string(),
        ..Default::default()
    }
}
