//! Payment repository for listing, editing and deleting payments.
//!
//! Creation goes through the payment resolver; this repository covers the
//! remaining reads and writes.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
    sea_query::Query,
};
use uuid::Uuid;

use casebill_core::billing::{BillingError, Invoice, Payment, PaymentMethod, PaymentStatus};
use casebill_shared::types::{PageRequest, PageResponse};

use super::ledger::{invoice_from_model, payment_from_model};
use super::search::{like_pattern, lower_like};
use crate::entities::{cases, invoices, payment_concepts, payments, sea_orm_active_enums, users};

/// A payment with the names its screens display.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    /// The payment.
    pub payment: Payment,
    /// Its invoice, when issued.
    pub invoice: Option<Invoice>,
    /// Concept name, when the payment references one.
    pub concept_name: Option<String>,
    /// Username of the billed user.
    pub billed_username: String,
    /// Title of the case paid for.
    pub case_title: String,
}

/// Filter options for listing payments.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Filter by status.
    pub status: Option<PaymentStatus>,
    /// Filter by method.
    pub method: Option<PaymentMethod>,
    /// Paid on or after this day (UTC).
    pub from: Option<NaiveDate>,
    /// Paid on or before this day (UTC).
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on the billed username or the case title.
    pub q: Option<String>,
}

impl PaymentFilter {
    fn apply(&self, mut query: Select<payments::Entity>) -> Select<payments::Entity> {
        if let Some(status) = self.status {
            query = query.filter(
                payments::Column::Status.eq(sea_orm_active_enums::PaymentStatus::from(status)),
            );
        }

        if let Some(method) = self.method {
            query = query.filter(
                payments::Column::Method.eq(sea_orm_active_enums::PaymentMethod::from(method)),
            );
        }

        if let Some(from) = self.from {
            let start = from.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(payments::Column::PaidAt.gte(start));
        }

        if let Some(next_day) = self.to.and_then(|to| to.checked_add_days(Days::new(1))) {
            let end = next_day.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(payments::Column::PaidAt.lt(end));
        }

        if let Some(pattern) = like_pattern(self.q.as_deref()) {
            let users_matching = Query::select()
                .column(users::Column::Id)
                .from(users::Entity)
                .and_where(lower_like(users::Column::Username, &pattern))
                .to_owned();
            let cases_matching = Query::select()
                .column(cases::Column::Id)
                .from(cases::Entity)
                .and_where(lower_like(cases::Column::Title, &pattern))
                .to_owned();
            query = query.filter(
                Condition::any()
                    .add(payments::Column::BilledUserId.in_subquery(users_matching))
                    .add(payments::Column::CaseId.in_subquery(cases_matching)),
            );
        }

        query
    }
}

/// Input for updating a payment. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentInput {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New method.
    pub method: Option<PaymentMethod>,
    /// New concept; `Some(None)` clears it.
    pub concept_id: Option<Option<Uuid>>,
    /// New processor reference; `Some(None)` clears it.
    pub external_transaction_id: Option<Option<String>>,
    /// New status, validated against the state machine. `Completed` is
    /// rejected here; completion goes through `PaymentResolver::complete_payment`.
    pub status: Option<PaymentStatus>,
}

impl UpdatePaymentInput {
    fn touches_fields(&self) -> bool {
        self.amount.is_some()
            || self.method.is_some()
            || self.concept_id.is_some()
            || self.external_transaction_id.is_some()
    }
}

fn repo_err(err: DbErr) -> BillingError {
    BillingError::repository(err.to_string())
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists payments matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &PaymentFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<PaymentDetails>, BillingError> {
        let page = page.normalized();

        let total = filter
            .apply(payments::Entity::find())
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        let rows = filter
            .apply(payments::Entity::find())
            .order_by_desc(payments::Column::PaidAt)
            .order_by_desc(payments::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        let details = self.with_details(rows).await.map_err(repo_err)?;
        Ok(PageResponse::new(details, page.page, page.per_page, total))
    }

    /// Lists every payment newest first, for the history screen.
    pub async fn history(&self) -> Result<Vec<PaymentDetails>, BillingError> {
        let rows = payments::Entity::find()
            .order_by_desc(payments::Column::PaidAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        self.with_details(rows).await.map_err(repo_err)
    }

    /// Gets one payment with its details.
    pub async fn get(&self, id: Uuid) -> Result<PaymentDetails, BillingError> {
        let row = payments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?
            .ok_or(BillingError::PaymentNotFound(id))?;

        self.with_details(vec![row])
            .await
            .map_err(repo_err)?
            .pop()
            .ok_or(BillingError::PaymentNotFound(id))
    }

    /// Updates a payment.
    ///
    /// Fields may only change while the payment is pending; status changes
    /// must follow the payment state machine and may not complete the payment.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePaymentInput,
    ) -> Result<PaymentDetails, BillingError> {
        if input.status == Some(PaymentStatus::Completed) {
            return Err(BillingError::CompletionRequiresInvoice(id));
        }

        let txn = self.db.begin().await.map_err(repo_err)?;

        let existing = payments::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?
            .ok_or(BillingError::PaymentNotFound(id))?;
        let current: PaymentStatus = existing.status.into();

        if input.touches_fields() && !current.is_editable() {
            return Err(BillingError::PaymentNotEditable(id));
        }

        if let Some(amount) = input.amount
            && amount <= Decimal::ZERO
        {
            return Err(BillingError::InvalidAmount);
        }

        if let Some(Some(concept_id)) = input.concept_id {
            let found = payment_concepts::Entity::find_by_id(concept_id)
                .count(&txn)
                .await
                .map_err(repo_err)?;
            if found == 0 {
                return Err(BillingError::ConceptNotFound(concept_id));
            }
        }

        let mut active: payments::ActiveModel = existing.into();
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(method) = input.method {
            active.method = Set(method.into());
        }
        if let Some(concept_id) = input.concept_id {
            active.concept_id = Set(concept_id);
        }
        if let Some(external) = input.external_transaction_id {
            active.external_transaction_id = Set(external);
        }
        if let Some(next) = input.status {
            active.status = Set(current.transition_to(next)?.into());
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await.map_err(repo_err)?;
        txn.commit().await.map_err(repo_err)?;

        tracing::info!(payment_id = %id, status = ?updated.status, "Payment updated");
        self.get(id).await
    }

    /// Deletes a payment that has no invoice.
    pub async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        payments::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?
            .ok_or(BillingError::PaymentNotFound(id))?;

        let invoiced = invoices::Entity::find()
            .filter(invoices::Column::PaymentId.eq(id))
            .count(&txn)
            .await
            .map_err(repo_err)?;
        if invoiced > 0 {
            return Err(BillingError::PaymentHasInvoice(id));
        }

        payments::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(repo_err)?;
        txn.commit().await.map_err(repo_err)?;

        tracing::info!(payment_id = %id, "Payment deleted");
        Ok(())
    }

    /// Attaches invoice, concept, user and case data with one query per table.
    async fn with_details(
        &self,
        rows: Vec<payments::Model>,
    ) -> Result<Vec<PaymentDetails>, DbErr> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let payment_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
        let concept_ids: Vec<Uuid> = rows.iter().filter_map(|p| p.concept_id).collect();
        let user_ids: Vec<Uuid> = rows.iter().map(|p| p.billed_user_id).collect();
        let case_ids: Vec<Uuid> = rows.iter().map(|p| p.case_id).collect();

        let mut invoices_by_payment: HashMap<Uuid, invoices::Model> = invoices::Entity::find()
            .filter(invoices::Column::PaymentId.is_in(payment_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|i| (i.payment_id, i))
            .collect();

        let concept_names: HashMap<Uuid, String> = if concept_ids.is_empty() {
            HashMap::new()
        } else {
            payment_concepts::Entity::find()
                .filter(payment_concepts::Column::Id.is_in(concept_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };

        let usernames: HashMap<Uuid, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let case_titles: HashMap<Uuid, String> = cases::Entity::find()
            .filter(cases::Column::Id.is_in(case_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.title))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| PaymentDetails {
                invoice: invoices_by_payment.remove(&row.id).map(invoice_from_model),
                concept_name: row.concept_id.and_then(|id| concept_names.get(&id).cloned()),
                billed_username: usernames
                    .get(&row.billed_user_id)
                    .cloned()
                    .unwrap_or_default(),
                case_title: case_titles.get(&row.case_id).cloned().unwrap_or_default(),
                payment: payment_from_model(row),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_status_only_update_does_not_touch_fields() {
        let input = UpdatePaymentInput {
            status: Some(PaymentStatus::Failed),
            ..UpdatePaymentInput::default()
        };
        assert!(!input.touches_fields());
    }

    fn sql(filter: &PaymentFilter) -> String {
        filter
            .apply(payments::Entity::find())
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[tokio::test]
    async fn test_update_refuses_to_complete_without_invoice() {
        let repo = PaymentRepository::new(DatabaseConnection::Disconnected);
        let id = Uuid::new_v4();

        let result = repo
            .update(
                id,
                UpdatePaymentInput {
                    status: Some(PaymentStatus::Completed),
                    ..UpdatePaymentInput::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(BillingError::CompletionRequiresInvoice(rejected)) if rejected == id
        ));
    }

    #[test]
    fn test_empty_filter_adds_no_conditions() {
        assert!(!sql(&PaymentFilter::default()).contains("WHERE"));
    }

    #[test]
    fn test_filter_by_status_method_and_days() {
        let query = sql(&PaymentFilter {
            status: Some(PaymentStatus::Failed),
            method: Some(PaymentMethod::Qr),
            from: NaiveDate::from_ymd_opt(2026, 3, 1),
            to: NaiveDate::from_ymd_opt(2026, 3, 31),
            q: None,
        });

        assert!(query.contains("'failed'"));
        assert!(query.contains("'qr'"));
        assert!(query.contains(r#""paid_at" >= '2026-03-01 00:00:00"#));
        assert!(query.contains(r#""paid_at" < '2026-04-01 00:00:00"#));
    }

    #[test]
    fn test_search_matches_username_or_case_title() {
        let query = sql(&PaymentFilter {
            q: Some("Quispe".to_string()),
            ..PaymentFilter::default()
        });

        assert!(query.contains(r#"LOWER("username") LIKE '%quispe%'"#));
        assert!(query.contains(r#"LOWER("title") LIKE '%quispe%'"#));
        assert!(query.contains(" OR "));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = sql(&PaymentFilter {
            q: Some("  ".to_string()),
            ..PaymentFilter::default()
        });
        assert!(!query.contains("LIKE"));
    }

    #[test]
    fn test_clearing_concept_touches_fields() {
        let input = UpdatePaymentInput {
            concept_id: Some(None),
            ..UpdatePaymentInput::default()
        };
        assert!(input.touches_fields());
    }
}
