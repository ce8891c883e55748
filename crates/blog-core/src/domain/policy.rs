//! Authorization rules for posts.

use uuid::Uuid;

use super::Post;
use crate::error::DomainError;

pub const PERMISSION_ALL: &str = "blog.posts.*";
pub const PERMISSION_VIEW: &str = "blog.posts.view";
pub const PERMISSION_CREATE: &str = "blog.posts.create";
pub const PERMISSION_EDIT: &str = "blog.posts.edit";
pub const PERMISSION_UPDATE: &str = "blog.posts.update";
pub const PERMISSION_DELETE: &str = "blog.posts.delete";

/// Roles allowed to purge posts.
pub const PRIVILEGED_ROLES: [&str; 2] = ["Super Admin", "Administrator"];

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(user_id: Uuid, permissions: Vec<String>, roles: Vec<String>) -> Self {
        Self {
            user_id,
            permissions,
            roles,
        }
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.roles.iter().any(|r| roles.contains(&r.as_str()))
    }

    fn can_any(&self, permission: &str) -> bool {
        self.can(PERMISSION_ALL) || self.can(permission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction<'a> {
    ViewAny,
    View(&'a Post),
    Create,
    Update(&'a Post),
    Delete(&'a Post),
    Restore(&'a Post),
    ForceDelete(&'a Post),
}

impl PostAction<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PostAction::ViewAny | PostAction::View(_) => "view",
            PostAction::Create => "create",
            PostAction::Update(_) => "update",
            PostAction::Delete(_) => "delete",
            PostAction::Restore(_) => "restore",
            PostAction::ForceDelete(_) => "force delete",
        }
    }
}

/// Decide whether `actor` may perform `action`.
pub fn allows(actor: &Actor, action: PostAction<'_>) -> bool {
    match action {
        PostAction::ViewAny | PostAction::View(_) => actor.can_any(PERMISSION_VIEW),
        PostAction::Create => actor.can_any(PERMISSION_CREATE),
        PostAction::Update(post) => {
            actor.can_any(PERMISSION_EDIT) || post.is_authored_by(actor.user_id)
        }
        PostAction::Delete(post) => {
            actor.can_any(PERMISSION_DELETE) || post.is_authored_by(actor.user_id)
        }
        PostAction::Restore(_) => actor.can_any(PERMISSION_UPDATE),
        PostAction::ForceDelete(_) => {
            actor.can(PERMISSION_ALL) && actor.has_any_role(&PRIVILEGED_ROLES)
        }
    }
}

/// [`allows`], as a `Result`.
pub fn authorize(actor: &Actor, action: PostAction<'_>) -> Result<(), DomainError> {
    if allows(actor, action) {
        Ok(())
    } else {
        tracing::debug!(user_id = %actor.user_id, action = action.name(), "Policy denied");
        Err(DomainError::Forbidden {
            action: action.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostDraft;

    fn post_by(author: Uuid) -> Post {
        Post::new(author, "p".to_string(), PostDraft::default())
    }

    fn actor(permissions: &[&str], roles: &[&str]) -> Actor {
        Actor::new(
            Uuid::new_v4(),
            permissions.iter().map(|p| p.to_string()).collect(),
            roles.iter().map(|r| r.to_string()).collect(),
        )
    }

    #[test]
    fn test_wildcard_grants_everything_but_force_delete() {
        let admin = actor(&[PERMISSION_ALL], &[]);
        let post = post_by(Uuid::new_v4());
        assert!(allows(&admin, PostAction::ViewAny));
        assert!(allows(&admin, PostAction::Create));
        assert!(allows(&admin, PostAction::Update(&post)));
        assert!(allows(&admin, PostAction::Delete(&post)));
        assert!(allows(&admin, PostAction::Restore(&post)));
        assert!(!allows(&admin, PostAction::ForceDelete(&post)));
    }

    #[test]
    fn test_author_can_update_and_delete_without_permissions() {
        let author = actor(&[], &[]);
        let post = post_by(author.user_id);
        assert!(allows(&author, PostAction::Update(&post)));
        assert!(allows(&author, PostAction::Delete(&post)));
        assert!(!allows(&author, PostAction::Restore(&post)));
        assert!(!allows(&author, PostAction::ForceDelete(&post)));
    }

    #[test]
    fn test_stranger_is_rejected() {
        let stranger = actor(&[PERMISSION_VIEW], &[]);
        let post = post_by(Uuid::new_v4());
        assert!(allows(&stranger, PostAction::View(&post)));
        assert!(matches!(
            authorize(&stranger, PostAction::Update(&post)),
            Err(DomainError::Forbidden { action: "update" })
        ));
        assert!(authorize(&stranger, PostAction::Delete(&post)).is_err());
    }

    #[test]
    fn test_granular_permissions() {
        let editor = actor(&[PERMISSION_EDIT, PERMISSION_DELETE], &[]);
        let post = post_by(Uuid::new_v4());
        assert!(allows(&editor, PostAction::Update(&post)));
        assert!(allows(&editor, PostAction::Delete(&post)));
        assert!(!allows(&editor, PostAction::Restore(&post)));
        assert!(!allows(&editor, PostAction::Create));

        let restorer = actor(&[PERMISSION_UPDATE], &[]);
        assert!(allows(&restorer, PostAction::Restore(&post)));
        assert!(!allows(&restorer, PostAction::Update(&post)));
    }

    #[test]
    fn test_force_delete_needs_wildcard_and_role() {
        let post_owner = actor(&[], &["Administrator"]);
        let post = post_by(post_owner.user_id);
        assert!(!allows(&post_owner, PostAction::ForceDelete(&post)));

        let role_only = actor(&[PERMISSION_DELETE], &["Super Admin"]);
        assert!(!allows(&role_only, PostAction::ForceDelete(&post)));

        let admin = actor(&[PERMISSION_ALL], &["Super Admin"]);
        assert!(allows(&admin, PostAction::ForceDelete(&post)));
    }
}
