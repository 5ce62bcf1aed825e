// services.rs
//! Membership facts supplied by the course-management side of the system.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::{Class, ClassRole, Member, Session},
    store::StoreError,
};

/// Read-only view of classes, sessions and memberships.
///
/// Authorization in this crate is always phrased as a question to this
/// trait, never as a role embedded in the principal.
#[async_trait]
pub trait Roster: Send + Sync {
    async fn session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError>;

    async fn class(&self, class_id: Uuid) -> Result<Option<Class>, StoreError>;

    /// Every role the user holds in the class; empty when not a member.
    async fn roles_in(&self, user_id: Uuid, class_id: Uuid) -> Result<Vec<ClassRole>, StoreError>;

    /// Sessions of the class, oldest first.
    async fn sessions_of(&self, class_id: Uuid) -> Result<Vec<Session>, StoreError>;

    /// Members holding the STUDENT role, ordered by name.
    async fn students_of(&self, class_id: Uuid) -> Result<Vec<Member>, StoreError>;

    async fn is_instructor_of(&self, user_id: Uuid, class_id: Uuid) -> Result<bool, StoreError> {
        let roles = self.roles_in(user_id, class_id).await?;
        Ok(roles.into_iter().any(ClassRole::is_instructor))
    }

    async fn is_student_of(&self, user_id: Uuid, class_id: Uuid) -> Result<bool, StoreError> {
        let roles = self.roles_in(user_id, class_id).await?;
        Ok(roles.contains(&ClassRole::Student))
    }
}
