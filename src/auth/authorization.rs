//! Role-based authorization.

use tracing::{debug, info};

use super::error::{AuthError, AuthResult};
use super::permission::{Permission, PermissionSet};
use super::validation::ValidationError;
use crate::db::{unique_violation_column, Database, RbacRepository, Role, UserRepository};

/// A role together with the permissions it grants.
#[derive(Debug, Clone)]
pub struct RoleDetails {
    /// Role row.
    pub role: Role,
    /// Granted permissions.
    pub permissions: PermissionSet,
}

/// Resolves effective permissions and answers `resource.action` checks.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    db: Database,
}

impl AuthorizationEngine {
    /// Create an engine over the role graph in `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Union of the permissions of every role assigned to the user.
    pub async fn effective_permissions(&self, user_id: &str) -> AuthResult<PermissionSet> {
        let rows = RbacRepository::new(self.db.pool())
            .permissions_for_user(user_id)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Permission::new(row.resource, row.action))
            .collect())
    }

    /// Allow or deny `required` for the user.
    pub async fn authorize(&self, user_id: &str, required: &Permission) -> AuthResult<PermissionSet> {
        let permissions = self.effective_permissions(user_id).await?;
        if permissions.contains(required) {
            Ok(permissions)
        } else {
            debug!(user_id = %user_id, permission = %required, "permission denied");
            Err(AuthError::Forbidden(required.to_string()))
        }
    }

    /// Every role with its permissions, ordered by name.
    pub async fn list_roles(&self) -> AuthResult<Vec<RoleDetails>> {
        let repo = RbacRepository::new(self.db.pool());
        let mut roles = Vec::new();
        for role in repo.list_roles().await? {
            let permissions = repo
                .permissions_for_role(&role.id)
                .await?
                .into_iter()
                .map(|row| Permission::new(row.resource, row.action))
                .collect();
            roles.push(RoleDetails { role, permissions });
        }
        Ok(roles)
    }

    /// Create a role granting `permissions`.
    ///
    /// Permissions that do not exist yet are created on the way.
    pub async fn create_role(
        &self,
        name: &str,
        description: &str,
        permissions: &[Permission],
    ) -> AuthResult<RoleDetails> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required("name").into());
        }

        let mut tx = self.db.begin().await?;
        let role_id = RbacRepository::insert_role(&mut tx, name, description.trim())
            .await
            .map_err(|e| match unique_violation_column(&e).as_deref() {
                Some("roles.name") => AuthError::DuplicateRole,
                _ => e.into(),
            })?;
        for permission in permissions {
            let permission_id =
                RbacRepository::ensure_permission(&mut tx, permission.resource(), permission.action())
                    .await?;
            RbacRepository::grant(&mut tx, &role_id, &permission_id).await?;
        }
        tx.commit().await?;

        info!(role = %name, permissions = permissions.len(), "Role created");
        self.role_details(name).await
    }

    /// Assign the named role to a user. Returns false if already assigned.
    pub async fn assign_role(&self, user_id: &str, role_name: &str) -> AuthResult<bool> {
        if UserRepository::new(self.db.pool()).get_by_id(user_id).await?.is_none() {
            return Err(AuthError::NotFound("user"));
        }
        let role = self.find_role(role_name).await?;

        let mut conn = self.db.pool().acquire().await?;
        let assigned = RbacRepository::assign_role(&mut conn, user_id, &role.id).await?;
        info!(user_id = %user_id, role = %role.name, assigned, "Role assigned");
        Ok(assigned)
    }

    /// Remove the named role from a user. Returns false if it was not held.
    pub async fn revoke_role(&self, user_id: &str, role_name: &str) -> AuthResult<bool> {
        let role = self.find_role(role_name).await?;
        let revoked = RbacRepository::new(self.db.pool())
            .revoke_role(user_id, &role.id)
            .await?;
        info!(user_id = %user_id, role = %role.name, revoked, "Role revoked");
        Ok(revoked)
    }

    /// Names of the roles held by a user.
    pub async fn role_names(&self, user_id: &str) -> AuthResult<Vec<String>> {
        Ok(RbacRepository::new(self.db.pool())
            .role_names_for_user(user_id)
            .await?)
    }

    async fn find_role(&self, name: &str) -> AuthResult<Role> {
        RbacRepository::new(self.db.pool())
            .get_role_by_name(name.trim())
            .await?
            .ok_or(AuthError::NotFound("role"))
    }

    async fn role_details(&self, name: &str) -> AuthResult<RoleDetails> {
        let role = self.find_role(name).await?;
        let permissions = RbacRepository::new(self.db.pool())
            .permissions_for_role(&role.id)
            .await?
            .into_iter()
            .map(|row| Permission::new(row.resource, row.action))
            .collect();
        Ok(RoleDetails { role, permissions })
    }
}
