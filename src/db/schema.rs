//! Database schema and migrations for Aegis.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Credentials
    r#"
CREATE TABLE users (
    id                  TEXT PRIMARY KEY,
    email               TEXT NOT NULL UNIQUE COLLATE NOCASE,
    username            TEXT NOT NULL UNIQUE,
    password_hash       TEXT NOT NULL,           -- Argon2 PHC string
    first_name          TEXT NOT NULL,
    last_name           TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'active', 'inactive', 'suspended')),
    email_verified      INTEGER NOT NULL DEFAULT 0,
    email_verified_at   TEXT,
    last_login_at       TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX idx_users_status ON users(status);
"#,
    // v2: Role graph
    r#"
CREATE TABLE roles (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE permissions (
    id          TEXT PRIMARY KEY,
    resource    TEXT NOT NULL,
    action      TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    UNIQUE (resource, action)
);

CREATE TABLE role_permissions (
    role_id       TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    permission_id TEXT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE user_roles (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id     TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    assigned_at TEXT NOT NULL,
    UNIQUE (user_id, role_id)
);

CREATE INDEX idx_user_roles_user ON user_roles(user_id);
"#,
    // v3: Refresh sessions
    r#"
CREATE TABLE user_sessions (
    id                  TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    refresh_token_hash  TEXT NOT NULL UNIQUE,    -- SHA-256 hex of the opaque token
    user_agent          TEXT,
    ip_address          TEXT,
    is_active           INTEGER NOT NULL DEFAULT 1,
    expires_at          TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX idx_user_sessions_user ON user_sessions(user_id, is_active);
CREATE INDEX idx_user_sessions_expires ON user_sessions(expires_at);
"#,
    // v4: Preferences, login audit and email verification
    r#"
CREATE TABLE user_preferences (
    user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    theme       TEXT NOT NULL DEFAULT 'default',
    scheme      TEXT NOT NULL DEFAULT 'light',
    layout      TEXT NOT NULL DEFAULT 'classic',
    updated_at  TEXT NOT NULL
);

CREATE TABLE login_attempts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier      TEXT NOT NULL COLLATE NOCASE,
    ip_address      TEXT,
    success         INTEGER NOT NULL,
    failure_reason  TEXT,
    attempted_at    TEXT NOT NULL
);

CREATE INDEX idx_login_attempts_identifier ON login_attempts(identifier, attempted_at);

CREATE TABLE email_verifications (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    verified    INTEGER NOT NULL DEFAULT 0,
    verified_at TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_email_verifications_user ON email_verifications(user_id);
"#,
    // v5: Seed roles and permissions
    r#"
INSERT INTO roles (id, name, description, created_at) VALUES
    (lower(hex(randomblob(16))), 'admin', 'Full administrative access', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'manager', 'User oversight and navigation', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'user', 'Standard account', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));

INSERT INTO permissions (id, resource, action, description, created_at) VALUES
    (lower(hex(randomblob(16))), 'profile', 'read', 'View own profile', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'profile', 'update', 'Edit own profile', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'dashboard', 'view', 'Open the dashboard', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'users', 'read', 'List users', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'navigation', 'read', 'Read the navigation tree', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'users', 'update', 'Change user status', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'users', 'unlock', 'Clear login lockouts', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'roles', 'read', 'List roles', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'roles', 'create', 'Create roles', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    (lower(hex(randomblob(16))), 'roles', 'assign', 'Assign and revoke roles', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));

INSERT INTO role_permissions (role_id, permission_id)
SELECT r.id, p.id FROM roles r, permissions p
WHERE r.name IN ('user', 'manager', 'admin')
  AND (p.resource || '.' || p.action) IN ('profile.read', 'profile.update', 'dashboard.view');

INSERT INTO role_permissions (role_id, permission_id)
SELECT r.id, p.id FROM roles r, permissions p
WHERE r.name IN ('manager', 'admin')
  AND (p.resource || '.' || p.action) IN ('users.read', 'navigation.read');

INSERT INTO role_permissions (role_id, permission_id)
SELECT r.id, p.id FROM roles r, permissions p
WHERE r.name = 'admin'
  AND (p.resource || '.' || p.action) IN
      ('users.update', 'users.unlock', 'roles.read', 'roles.create', 'roles.assign');
"#,
];
