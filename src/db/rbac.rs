//! Role graph repository: roles, permissions and their associations.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{new_id, sql_timestamp, DbPool};
use crate::Result;

/// Role entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Role {
    /// Role ID.
    pub id: String,
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Permission row as stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PermissionRow {
    /// Permission ID.
    pub id: String,
    /// Resource half of `resource.action`.
    pub resource: String,
    /// Action half of `resource.action`.
    pub action: String,
    /// Human-readable description.
    pub description: String,
}

/// Repository for roles, permissions and assignments.
pub struct RbacRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RbacRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a role by name.
    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(role)
    }

    /// List all roles ordered by name.
    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(roles)
    }

    /// List the permissions granted to a role.
    pub async fn permissions_for_role(&self, role_id: &str) -> Result<Vec<PermissionRow>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT p.id, p.resource, p.action, p.description
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ?
             ORDER BY p.resource, p.action",
        )
        .bind(role_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Effective permissions of a user: the union over all assigned roles.
    pub async fn permissions_for_user(&self, user_id: &str) -> Result<Vec<PermissionRow>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT DISTINCT p.id, p.resource, p.action, p.description
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             JOIN user_roles ur ON ur.role_id = rp.role_id
             WHERE ur.user_id = ?
             ORDER BY p.resource, p.action",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Names of the roles assigned to a user.
    pub async fn role_names_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ?
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(names)
    }

    /// Create a role row inside a transaction.
    ///
    /// The raw sqlx error is returned so a duplicate name can be detected.
    pub async fn insert_role(
        conn: &mut SqliteConnection,
        name: &str,
        description: &str,
    ) -> std::result::Result<String, sqlx::Error> {
        let id = new_id();
        sqlx::query("INSERT INTO roles (id, name, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(description)
            .bind(sql_timestamp(Utc::now()))
            .execute(conn)
            .await?;
        Ok(id)
    }

    /// Look up a permission, creating it on first reference.
    pub async fn ensure_permission(
        conn: &mut SqliteConnection,
        resource: &str,
        action: &str,
    ) -> Result<String> {
        sqlx::query(
            "INSERT INTO permissions (id, resource, action, description, created_at)
             VALUES (?, ?, ?, '', ?)
             ON CONFLICT (resource, action) DO NOTHING",
        )
        .bind(new_id())
        .bind(resource)
        .bind(action)
        .bind(sql_timestamp(Utc::now()))
        .execute(&mut *conn)
        .await?;

        let id: String =
            sqlx::query_scalar("SELECT id FROM permissions WHERE resource = ? AND action = ?")
                .bind(resource)
                .bind(action)
                .fetch_one(&mut *conn)
                .await?;
        Ok(id)
    }

    /// Grant a permission to a role. Granting twice is a no-op.
    pub async fn grant(
        conn: &mut SqliteConnection,
        role_id: &str,
        permission_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Assign a role to a user. Returns false if it was already assigned.
    pub async fn assign_role(
        conn: &mut SqliteConnection,
        user_id: &str,
        role_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (id, user_id, role_id, assigned_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(new_id())
        .bind(user_id)
        .bind(role_id)
        .bind(sql_timestamp(Utc::now()))
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a role from a user. Returns false if it was not assigned.
    pub async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
