//! Versioned flat projections of packages, collections and listings, as
//! published in change notifications.

use serde::Serialize;
use serde_json::Value;

use super::{Collection, ListingDetail, Package};
use crate::error::{Error, Result};

pub const LATEST_REPR_VERSION: u32 = 1;

/// Produces the notification projection of a model for a given version.
pub trait ApiRepr {
    fn api_repr(&self, version: u32) -> Result<Value>;
}

#[derive(Serialize)]
struct PackageV1<'a> {
    name: &'a str,
    summary: &'a str,
    description: Option<&'a str>,
    reviewurl: Option<&'a str>,
    upstreamurl: Option<&'a str>,
}

#[derive(Serialize)]
struct CollectionV1<'a> {
    name: &'a str,
    version: &'a str,
    publishurltemplate: Option<&'a str>,
    pendingurltemplate: Option<&'a str>,
}

#[derive(Serialize)]
struct ListingV1<'a> {
    package: PackageV1<'a>,
    collection: CollectionV1<'a>,
    owner: i64,
    qacontact: Option<i64>,
    specfile: Option<&'a str>,
}

impl Package {
    fn repr_v1(&self) -> PackageV1<'_> {
        PackageV1 {
            name: &self.name,
            summary: &self.summary,
            description: self.description.as_deref(),
            reviewurl: self.review_url.as_deref(),
            upstreamurl: self.upstream_url.as_deref(),
        }
    }
}

impl Collection {
    fn repr_v1(&self) -> CollectionV1<'_> {
        CollectionV1 {
            name: &self.name,
            version: &self.version,
            publishurltemplate: self.publish_url_template.as_deref(),
            pendingurltemplate: self.pending_url_template.as_deref(),
        }
    }
}

fn to_value<T: Serialize>(repr: T) -> Result<Value> {
    Ok(serde_json::to_value(repr)?)
}

impl ApiRepr for Package {
    fn api_repr(&self, version: u32) -> Result<Value> {
        match version {
            1 => to_value(self.repr_v1()),
            v => Err(Error::UnsupportedVersion(v)),
        }
    }
}

impl ApiRepr for Collection {
    fn api_repr(&self, version: u32) -> Result<Value> {
        match version {
            1 => to_value(self.repr_v1()),
            v => Err(Error::UnsupportedVersion(v)),
        }
    }
}

impl ApiRepr for ListingDetail {
    fn api_repr(&self, version: u32) -> Result<Value> {
        match version {
            1 => to_value(ListingV1 {
                package: self.package.repr_v1(),
                collection: self.collection.repr_v1(),
                owner: self.listing.owner,
                qacontact: self.listing.qa_contact,
                specfile: self.listing.specfile.as_deref(),
            }),
            v => Err(Error::UnsupportedVersion(v)),
        }
    }
}
