//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in a fixed-width ISO 8601 format so that
//! lexical order equals chronological order. Every foreign key is
//! `ON DELETE RESTRICT`: a parent row cannot be removed while children exist.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Source control ------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS repositories (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        name  TEXT NOT NULL,
        url   TEXT NOT NULL,
        scm   TEXT NOT NULL,
        UNIQUE (name, url, scm)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS branches (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT NOT NULL,
        repository_id INTEGER NOT NULL,
        UNIQUE (name, repository_id),
        FOREIGN KEY (repository_id) REFERENCES repositories(id) ON DELETE RESTRICT
    )
    "#,
    // -- Change graph nodes --------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS changes (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        revision    TEXT NOT NULL,
        branch_id   INTEGER NOT NULL,
        summary     TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        author      TEXT NOT NULL,
        timestamp   TEXT NOT NULL,
        parent_id   INTEGER,
        UNIQUE (revision, branch_id),
        FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE RESTRICT,
        FOREIGN KEY (parent_id) REFERENCES changes(id) ON DELETE RESTRICT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_changes_parent ON changes(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_changes_branch ON changes(branch_id)",
    // -- Change graph merge edges ---------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS change_merges (
        source_id INTEGER NOT NULL,
        target_id INTEGER NOT NULL,
        PRIMARY KEY (source_id, target_id),
        CHECK (source_id <> target_id),
        FOREIGN KEY (source_id) REFERENCES changes(id) ON DELETE RESTRICT,
        FOREIGN KEY (target_id) REFERENCES changes(id) ON DELETE RESTRICT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_change_merges_target ON change_merges(target_id)",
    // -- Issue links ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        tracking_code   TEXT NOT NULL,
        tracking_system TEXT NOT NULL,
        change_id       INTEGER,
        UNIQUE (tracking_code, tracking_system),
        FOREIGN KEY (change_id) REFERENCES changes(id) ON DELETE RESTRICT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_issues_change ON issues(change_id)",
    // -- Build catalog --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS build_projects (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS platforms (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS integration_types (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        abbrev      TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    // -- Build ledger ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS builds (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id          INTEGER NOT NULL,
        integration_type_id INTEGER NOT NULL,
        ci_build_id         TEXT NOT NULL,
        platform_id         INTEGER,
        status              TEXT,
        started             TEXT,
        finished            TEXT,
        created             TEXT NOT NULL,
        modified            TEXT NOT NULL,
        last_change_id      INTEGER,
        variant             TEXT NOT NULL DEFAULT '{"kind":"generic"}',
        FOREIGN KEY (project_id) REFERENCES build_projects(id) ON DELETE RESTRICT,
        FOREIGN KEY (integration_type_id) REFERENCES integration_types(id) ON DELETE RESTRICT,
        FOREIGN KEY (platform_id) REFERENCES platforms(id) ON DELETE RESTRICT,
        FOREIGN KEY (last_change_id) REFERENCES changes(id) ON DELETE RESTRICT
    )
    "#,
    // Platform-less builds share the key slot 0 so NULL does not defeat uniqueness.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_builds_key
        ON builds(project_id, integration_type_id, ci_build_id, IFNULL(platform_id, 0))
    "#,
    "CREATE INDEX IF NOT EXISTS idx_builds_good ON builds(project_id, status, started, id)",
    "CREATE INDEX IF NOT EXISTS idx_builds_last_change ON builds(last_change_id)",
    // -- Config table ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Metadata table -------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Default configuration values inserted on first init.
pub const DEFAULT_CONFIG: &[(&str, &str)] = &[("created_by", "harvest")];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair. Migrations are tracked in the
/// `metadata` table under the key `migration:<name>` so they run at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[];
