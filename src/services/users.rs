//! User administration: profile roles and permission grants

use crate::{
    error::AppResult,
    models::user::{Permission, Role, UserDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// User with role and permissions
    pub async fn get_details(&self, id: i32) -> AppResult<UserDetails> {
        let user = self.repository.users.get_by_id(id).await?;
        let profile = self.repository.users.profile(id).await?;
        let permissions = self.repository.users.permissions(id).await?;
        Ok(UserDetails {
            user,
            role: profile.map(|p| p.role),
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Set the profile role; `None` removes the profile
    pub async fn set_role(&self, id: i32, role: Option<Role>) -> AppResult<UserDetails> {
        self.repository.users.get_by_id(id).await?;
        self.repository.users.set_profile(id, role).await?;
        tracing::info!(user_id = id, role = ?role, "Profile role updated");
        self.get_details(id).await
    }

    /// Replace the user's permission set
    pub async fn set_permissions(&self, id: i32, permissions: &[Permission]) -> AppResult<UserDetails> {
        self.repository.users.get_by_id(id).await?;
        self.repository.users.set_permissions(id, permissions).await?;
        tracing::info!(user_id = id, ?permissions, "Permissions updated");
        self.get_details(id).await
    }
}
