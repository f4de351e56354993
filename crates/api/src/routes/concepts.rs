//! Payment concept (fee catalog) routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use casebill_db::entities::payment_concepts;
use casebill_db::repositories::{ConceptRepository, CreateConceptInput, UpdateConceptInput};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};

/// Creates the concept routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment-concepts", get(list_concepts).post(create_concept))
        .route(
            "/payment-concepts/{concept_id}",
            get(get_concept)
                .patch(update_concept)
                .delete(deactivate_concept),
        )
}

/// Query parameters for listing concepts.
#[derive(Debug, Default, Deserialize)]
pub struct ListConceptsQuery {
    /// Include deactivated concepts.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for creating a concept.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConceptRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Suggested price.
    pub suggested_price: Option<Decimal>,
    /// Active flag.
    pub is_active: Option<bool>,
}

/// Request body for updating a concept.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConceptRequest {
    /// New name.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// New suggested price.
    pub suggested_price: Option<Decimal>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Concept as returned by the API.
#[derive(Debug, Serialize)]
pub struct ConceptResponse {
    /// Concept ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Suggested price.
    pub suggested_price: Decimal,
    /// Active flag.
    pub is_active: bool,
}

impl From<payment_concepts::Model> for ConceptResponse {
    fn from(model: payment_concepts::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            suggested_price: model.suggested_price,
            is_active: model.is_active,
        }
    }
}

fn require_staff(auth: &AuthUser) -> ApiResult<()> {
    if auth.is_staff() {
        Ok(())
    } else {
        Err(ApiError::staff_only())
    }
}

/// GET `/payment-concepts` - List concepts, active first then by name.
async fn list_concepts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListConceptsQuery>,
) -> ApiResult<Json<Vec<ConceptResponse>>> {
    let repo = ConceptRepository::new((*state.db).clone());
    let concepts = repo.list(query.include_inactive).await?;
    Ok(Json(concepts.into_iter().map(ConceptResponse::from).collect()))
}

/// POST `/payment-concepts` - Create a concept (staff only).
async fn create_concept(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateConceptRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth)?;
    payload.validate()?;

    let repo = ConceptRepository::new((*state.db).clone());
    let concept = repo
        .create(CreateConceptInput {
            name: payload.name,
            suggested_price: payload.suggested_price,
            is_active: payload.is_active,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ConceptResponse::from(concept))))
}

/// GET `/payment-concepts/{concept_id}` - Get a concept.
async fn get_concept(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(concept_id): Path<Uuid>,
) -> ApiResult<Json<ConceptResponse>> {
    let repo = ConceptRepository::new((*state.db).clone());
    Ok(Json(repo.find_by_id(concept_id).await?.into()))
}

/// PATCH `/payment-concepts/{concept_id}` - Update a concept (staff only).
async fn update_concept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(concept_id): Path<Uuid>,
    Json(payload): Json<UpdateConceptRequest>,
) -> ApiResult<Json<ConceptResponse>> {
    require_staff(&auth)?;
    payload.validate()?;

    let repo = ConceptRepository::new((*state.db).clone());
    let concept = repo
        .update(
            concept_id,
            UpdateConceptInput {
                name: payload.name,
                suggested_price: payload.suggested_price,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(concept.into()))
}

/// DELETE `/payment-concepts/{concept_id}` - Deactivate a concept (staff only).
async fn deactivate_concept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(concept_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff(&auth)?;

    let repo = ConceptRepository::new((*state.db).clone());
    repo.deactivate(concept_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
