//! Turns a user-supplied branch token into a collection.
//!
//! Tokens are either a branch name (`F18`, `devel`) or a rendered
//! `name-version` pair (`Fedora-18`). Both collection names and versions may
//! contain hyphens, so a rendering is never split; it is compared against
//! every collection's rendering instead.

use rusqlite::Connection;
use serde::Serialize;

use super::sqlite::{collections_by_rendered_name, find_collection_by_branch};
use crate::error::Result;
use crate::types::Collection;

/// Outcome of resolving a branch token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "collections", rename_all = "snake_case")]
pub enum BranchResolution {
    /// The token is a collection's branch name.
    BranchMatch(Collection),
    /// The token is exactly one collection's `name-version` rendering.
    NameVersionMatch(Collection),
    NotFound,
    /// The token renders more than one collection.
    Ambiguous(Vec<Collection>),
}

impl BranchResolution {
    /// The resolved collection, if exactly one matched.
    pub fn collection(&self) -> Option<&Collection> {
        match self {
            BranchResolution::BranchMatch(c) | BranchResolution::NameVersionMatch(c) => Some(c),
            BranchResolution::NotFound | BranchResolution::Ambiguous(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            BranchResolution::BranchMatch(c) | BranchResolution::NameVersionMatch(c) => Some(c),
            BranchResolution::NotFound | BranchResolution::Ambiguous(_) => None,
        }
    }
}

pub(super) fn resolve(conn: &Connection, token: &str) -> Result<BranchResolution> {
    if let Some(collection) = find_collection_by_branch(conn, token)? {
        return Ok(BranchResolution::BranchMatch(collection));
    }

    let mut matches = collections_by_rendered_name(conn, token)?;
    Ok(match matches.len() {
        0 => BranchResolution::NotFound,
        1 => BranchResolution::NameVersionMatch(matches.remove(0)),
        _ => {
            tracing::debug!("Branch token '{}' matches {} collections", token, matches.len());
            BranchResolution::Ambiguous(matches)
        }
    })
}
