//! # pkgdb
//!
//! Package database backend: packages, release collections, per-branch
//! package listings with their acl grants, and the audit trail of every
//! change made to them. Usable as a library or through the `pkgdb` admin
//! binary.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! pkgdb = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use pkgdb::store::{SqliteStore, Store};
//! use pkgdb::types::{NewListing, NewPackage};
//!
//! let store = SqliteStore::new("./data/pkgdb.db").unwrap();
//! store.initialize().unwrap();
//!
//! let guake = store.package_by_name("guake").unwrap();
//! let f18 = store.collection_by_simple_name("F18").unwrap();
//! let listing = store
//!     .create_listing(guake.id, f18.id, &NewListing { owner: 10, status: "Approved".into(), ..Default::default() }, "pingou")
//!     .unwrap();
//! store.clone_listing(listing.id, "devel", "pingou").unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `pkgdb` admin binary. Disable with `default-features = false`.

pub mod config;
pub mod error;
pub mod store;
pub mod types;
