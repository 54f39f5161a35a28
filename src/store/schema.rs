pub const SCHEMA: &str = r#"
-- Status vocabulary; ids are never reused
CREATE TABLE IF NOT EXISTS status_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT
);

CREATE TABLE IF NOT EXISTS status_translations (
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE CASCADE,
    language TEXT NOT NULL DEFAULT 'C',
    name TEXT NOT NULL,
    description TEXT,
    PRIMARY KEY (status_id, language)
);

-- Which statuses each kind of row may carry
CREATE TABLE IF NOT EXISTS status_domains (
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE CASCADE,
    domain TEXT NOT NULL CHECK (domain IN ('package', 'collection', 'listing', 'acl')),
    PRIMARY KEY (status_id, domain)
);

-- Software being packaged, independent of any release
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    summary TEXT NOT NULL,
    description TEXT,
    review_url TEXT,
    upstream_url TEXT,
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,
    should_open INTEGER NOT NULL DEFAULT 1
);

-- Distribution releases
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,
    owner INTEGER NOT NULL,
    publish_url_template TEXT,
    pending_url_template TEXT,
    summary TEXT,
    description TEXT,
    branch_name TEXT NOT NULL UNIQUE,
    dist_tag TEXT NOT NULL UNIQUE,
    git_branch_name TEXT,

    UNIQUE(name, version)
);

-- A package on a collection; carries the per-release owner and acls
CREATE TABLE IF NOT EXISTS package_listings (
    id INTEGER PRIMARY KEY,
    package_id INTEGER NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    owner INTEGER NOT NULL,
    qa_contact INTEGER,
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,
    specfile TEXT,
    status_change TEXT NOT NULL DEFAULT (datetime('now')),

    UNIQUE(package_id, collection_id)
);

CREATE TABLE IF NOT EXISTS person_package_listings (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    listing_id INTEGER NOT NULL REFERENCES package_listings(id) ON DELETE CASCADE,

    UNIQUE(user_id, listing_id)
);

CREATE TABLE IF NOT EXISTS group_package_listings (
    id INTEGER PRIMARY KEY,
    group_id INTEGER NOT NULL,
    listing_id INTEGER NOT NULL REFERENCES package_listings(id) ON DELETE CASCADE,

    UNIQUE(group_id, listing_id)
);

CREATE TABLE IF NOT EXISTS person_package_listing_acls (
    id INTEGER PRIMARY KEY,
    grant_set_id INTEGER NOT NULL REFERENCES person_package_listings(id) ON DELETE CASCADE,
    acl TEXT NOT NULL CHECK (acl IN ('commit', 'build', 'watchbugzilla', 'watchcommits', 'approveacls', 'checkout')),
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,

    UNIQUE(grant_set_id, acl)
);

CREATE TABLE IF NOT EXISTS group_package_listing_acls (
    id INTEGER PRIMARY KEY,
    grant_set_id INTEGER NOT NULL REFERENCES group_package_listings(id) ON DELETE CASCADE,
    acl TEXT NOT NULL CHECK (acl IN ('commit', 'build', 'watchbugzilla', 'watchcommits', 'approveacls', 'checkout')),
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,

    UNIQUE(grant_set_id, acl)
);

-- Audit log. target_id is a lookup key, not a foreign key: entries outlive
-- the rows they describe.
CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author TEXT NOT NULL,
    status_id INTEGER NOT NULL REFERENCES status_codes(id) ON DELETE RESTRICT,
    description TEXT NOT NULL,
    target_kind TEXT NOT NULL CHECK (target_kind IN ('package', 'listing', 'group_acl', 'person_acl')),
    target_id INTEGER NOT NULL,
    changed_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

-- Approved listings per collection
CREATE VIEW IF NOT EXISTS collection_packages AS
SELECT c.id, c.name, c.version, c.status_id, COUNT(pl.id) AS package_count
FROM collections c
LEFT JOIN package_listings pl ON pl.collection_id = c.id AND pl.status_id = 3
GROUP BY c.id, c.name, c.version, c.status_id
ORDER BY c.name, c.version;

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_status_translations_name ON status_translations(language, name);
CREATE INDEX IF NOT EXISTS idx_listings_package ON package_listings(package_id);
CREATE INDEX IF NOT EXISTS idx_listings_collection ON package_listings(collection_id);
CREATE INDEX IF NOT EXISTS idx_person_listings_listing ON person_package_listings(listing_id);
CREATE INDEX IF NOT EXISTS idx_group_listings_listing ON group_package_listings(listing_id);
CREATE INDEX IF NOT EXISTS idx_audit_log_target ON audit_log(target_kind, target_id);
"#;

/// Status vocabulary every database starts with: (id, C name, domains).
pub const SEED_STATUSES: &[(i64, &str, &[&str])] = &[
    (1, "Active", &["collection"]),
    (2, "Added", &[]),
    (3, "Approved", &["package", "listing", "acl"]),
    (4, "Awaiting Branch", &["listing"]),
    (5, "Awaiting Development", &[]),
    (6, "Awaiting QA", &[]),
    (7, "Awaiting Publish", &[]),
    (8, "Awaiting Review", &["listing", "acl"]),
    (9, "EOL", &["collection"]),
    (10, "Denied", &["package", "listing", "acl"]),
    (11, "Maintenance", &[]),
    (12, "Modified", &[]),
    (13, "Obsolete", &["acl"]),
    (14, "Orphaned", &["package", "listing"]),
    (15, "Owned", &[]),
    (16, "Rejected", &[]),
    (17, "Removed", &["package", "listing"]),
    (18, "Under Development", &["collection"]),
    (19, "Under Review", &["package"]),
    (20, "Deprecated", &["package", "listing"]),
    (21, "Retired", &["package", "listing"]),
];
