use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AclKind, DEFAULT_LOCALE, StatusId};

/// Group grants every newly created package listing starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultGroupGrant {
    pub group_id: i64,
    pub name: String,
    /// `true` seeds the acl as Approved, `false` as Denied.
    #[serde(deserialize_with = "deserialize_acls")]
    pub acls: BTreeMap<AclKind, bool>,
}

fn deserialize_acls<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<AclKind, bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, approved)| {
            AclKind::parse(&name)
                .map(|kind| (kind, approved))
                .ok_or_else(|| serde::de::Error::custom(format!("invalid acl: {name}")))
        })
        .collect()
}

impl DefaultGroupGrant {
    pub const PROVENPACKAGER_ID: i64 = 100;

    #[must_use]
    pub fn provenpackager() -> Self {
        Self {
            group_id: Self::PROVENPACKAGER_ID,
            name: "provenpackager".to_string(),
            acls: BTreeMap::from([(AclKind::Commit, true), (AclKind::Checkout, true)]),
        }
    }

    /// Seeded (kind, status) pairs.
    pub fn grants(&self) -> impl Iterator<Item = (AclKind, StatusId)> + '_ {
        self.acls.iter().map(|(kind, approved)| {
            let status = if *approved {
                StatusId::APPROVED
            } else {
                StatusId::DENIED
            };
            (*kind, status)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout_ms: u64,
    pub default_locale: String,
    pub default_groups: Vec<DefaultGroupGrant>,
}

impl DatabaseConfig {
    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DatabaseConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_file.trim().is_empty() {
            return Err(Error::Config("database_file cannot be empty".to_string()));
        }
        if self.default_locale.trim().is_empty() {
            return Err(Error::Config("default_locale cannot be empty".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            database_file: "pkgdb.db".to_string(),
            busy_timeout_ms: 5000,
            default_locale: DEFAULT_LOCALE.to_string(),
            default_groups: vec![DefaultGroupGrant::provenpackager()],
        }
    }
}
