//! Payment concept repository for the fee catalog.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::payment_concepts;

/// Longest concept name accepted.
pub const MAX_CONCEPT_NAME_LEN: usize = 100;

/// Error types for payment concept operations.
#[derive(Debug, thiserror::Error)]
pub enum ConceptError {
    /// Concept not found.
    #[error("Payment concept not found: {0}")]
    NotFound(Uuid),

    /// Name is empty or too long.
    #[error("Concept name must be between 1 and {MAX_CONCEPT_NAME_LEN} characters")]
    InvalidName,

    /// Suggested price is negative.
    #[error("Suggested price cannot be negative")]
    NegativePrice,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a payment concept.
#[derive(Debug, Clone)]
pub struct CreateConceptInput {
    /// Display name.
    pub name: String,
    /// Suggested price; defaults to zero.
    pub suggested_price: Option<Decimal>,
    /// Active flag; defaults to true.
    pub is_active: Option<bool>,
}

/// Input for updating a payment concept.
#[derive(Debug, Clone, Default)]
pub struct UpdateConceptInput {
    /// New name.
    pub name: Option<String>,
    /// New suggested price.
    pub suggested_price: Option<Decimal>,
    /// New active flag.
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<String, ConceptError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_CONCEPT_NAME_LEN {
        return Err(ConceptError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, ConceptError> {
    if price < Decimal::ZERO {
        return Err(ConceptError::NegativePrice);
    }
    Ok(price.round_dp(2))
}

/// Payment concept repository.
#[derive(Debug, Clone)]
pub struct ConceptRepository {
    db: DatabaseConnection,
}

impl ConceptRepository {
    /// Creates a new concept repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists concepts, active first then by name.
    ///
    /// Inactive concepts are included only when `include_inactive` is set.
    pub async fn list(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<payment_concepts::Model>, ConceptError> {
        let mut query = payment_concepts::Entity::find();
        if !include_inactive {
            query = query.filter(payment_concepts::Column::IsActive.eq(true));
        }

        Ok(query
            .order_by_desc(payment_concepts::Column::IsActive)
            .order_by_asc(payment_concepts::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Finds a concept by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<payment_concepts::Model, ConceptError> {
        payment_concepts::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ConceptError::NotFound(id))
    }

    /// Creates a concept.
    pub async fn create(
        &self,
        input: CreateConceptInput,
    ) -> Result<payment_concepts::Model, ConceptError> {
        let name = validate_name(&input.name)?;
        let price = validate_price(input.suggested_price.unwrap_or(Decimal::ZERO))?;
        let now = Utc::now().into();

        let model = payment_concepts::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            suggested_price: Set(price),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(concept_id = %model.id, name = %model.name, "Payment concept created");
        Ok(model)
    }

    /// Updates a concept. Absent fields are left unchanged.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateConceptInput,
    ) -> Result<payment_concepts::Model, ConceptError> {
        let existing = self.find_by_id(id).await?;
        let mut active: payment_concepts::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(validate_name(&name)?);
        }
        if let Some(price) = input.suggested_price {
            active.suggested_price = Set(validate_price(price)?);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let model = active.update(&self.db).await?;
        tracing::info!(concept_id = %model.id, "Payment concept updated");
        Ok(model)
    }

    /// Deactivates a concept. Payments keep their reference.
    pub async fn deactivate(&self, id: Uuid) -> Result<payment_concepts::Model, ConceptError> {
        let model = self
            .update(
                id,
                UpdateConceptInput {
                    is_active: Some(false),
                    ..UpdateConceptInput::default()
                },
            )
            .await?;
        tracing::info!(concept_id = %id, "Payment concept deactivated");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Consulta  ").unwrap(), "Consulta");
        assert!(matches!(validate_name("   "), Err(ConceptError::InvalidName)));
        assert!(matches!(
            validate_name(&"x".repeat(MAX_CONCEPT_NAME_LEN + 1)),
            Err(ConceptError::InvalidName)
        ));
        assert!(validate_name(&"ñ".repeat(MAX_CONCEPT_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_price() {
        assert_eq!(validate_price(dec!(0)).unwrap(), dec!(0));
        assert_eq!(validate_price(dec!(150.505)).unwrap(), dec!(150.50));
        assert!(matches!(
            validate_price(dec!(-1)),
            Err(ConceptError::NegativePrice)
        ));
    }
}
