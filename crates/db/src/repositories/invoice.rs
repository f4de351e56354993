//! Invoice repository (read-only).

use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

use casebill_core::billing::Invoice;
use casebill_shared::types::{PageRequest, PageResponse};

use super::ledger::invoice_from_model;
use super::search::{like_pattern, lower_like};
use crate::entities::invoices;

/// Invoice repository.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists invoices newest first.
    ///
    /// `q` matches the invoice number, tax id or legal name, ignoring case.
    pub async fn list(
        &self,
        q: Option<&str>,
        page: &PageRequest,
    ) -> Result<PageResponse<Invoice>, DbErr> {
        let page = page.normalized();
        let total = search(q).count(&self.db).await?;

        let rows = search(q)
            .order_by_desc(invoices::Column::IssuedAt)
            .order_by_desc(invoices::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(
            rows.into_iter().map(invoice_from_model).collect(),
            page.page,
            page.per_page,
            total,
        ))
    }

    /// Finds an invoice by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DbErr> {
        Ok(invoices::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(invoice_from_model))
    }

    /// Finds the invoice issued for a payment.
    pub async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Invoice>, DbErr> {
        Ok(invoices::Entity::find()
            .filter(invoices::Column::PaymentId.eq(payment_id))
            .one(&self.db)
            .await?
            .map(invoice_from_model))
    }
}

fn search(q: Option<&str>) -> Select<invoices::Entity> {
    let query = invoices::Entity::find();
    match like_pattern(q) {
        Some(pattern) => query.filter(
            Condition::any()
                .add(lower_like(invoices::Column::InvoiceNumber, &pattern))
                .add(lower_like(invoices::Column::TaxId, &pattern))
                .add(lower_like(invoices::Column::LegalName, &pattern)),
        ),
        None => query,
    }
}
