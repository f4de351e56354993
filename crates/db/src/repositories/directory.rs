//! Read access to the case directory owned by the case-management system.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{cases, sea_orm_active_enums::CaseStatus};

/// Case directory repository.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    db: DatabaseConnection,
}

impl DirectoryRepository {
    /// Creates a new directory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Cases that can still receive payments (not archived), newest first.
    pub async fn list_payable_cases(&self) -> Result<Vec<cases::Model>, DbErr> {
        cases::Entity::find()
            .filter(cases::Column::Status.ne(CaseStatus::Archived))
            .order_by_desc(cases::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}
