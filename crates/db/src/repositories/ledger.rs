//! Ledger repository: the persistence side of the payment resolver.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, sea_query::Query,
};
use uuid::Uuid;

use casebill_core::billing::{
    self, BillingError, BillingRepository, CaseGraph, ClientRecord, Invoice, InvoiceIssue,
    NewInvoice, NewPayment, PartyRecord, Payment, PersonRecord, ResolvedPayment,
};

use crate::entities::sea_orm_active_enums::PaymentStatus;
use crate::entities::{case_parties, cases, clients, invoices, payment_concepts, payments, persons};

const INVOICE_PAYMENT_CONSTRAINT: &str = "uq_invoices_payment_id";
const INVOICE_NUMBER_CONSTRAINT: &str = "uq_invoices_invoice_number";

/// Implements [`BillingRepository`] on PostgreSQL.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// IDs of completed payments that still lack an invoice, oldest first.
    ///
    /// Feed them to `PaymentResolver::ensure_invoice` to invoice rows that
    /// were marked completed outside the resolver, such as legacy imports.
    pub async fn completed_without_invoice(&self) -> Result<Vec<Uuid>, DbErr> {
        let invoiced = Query::select()
            .column(invoices::Column::PaymentId)
            .from(invoices::Entity)
            .to_owned();

        payments::Entity::find()
            .select_only()
            .column(payments::Column::Id)
            .filter(payments::Column::Status.eq(PaymentStatus::Completed))
            .filter(payments::Column::Id.not_in_subquery(invoiced))
            .order_by_asc(payments::Column::PaidAt)
            .into_tuple()
            .all(&self.db)
            .await
    }

    async fn existing_invoice(&self, payment_id: Uuid) -> Result<Option<Invoice>, DbErr> {
        Ok(invoices::Entity::find()
            .filter(invoices::Column::PaymentId.eq(payment_id))
            .one(&self.db)
            .await?
            .map(invoice_from_model))
    }
}

fn repo_err(err: DbErr) -> BillingError {
    BillingError::repository(err.to_string())
}

/// Converts a payment row into the core type.
pub(crate) fn payment_from_model(model: payments::Model) -> Payment {
    Payment {
        id: model.id,
        case_id: model.case_id,
        billed_user_id: model.billed_user_id,
        concept_id: model.concept_id,
        amount: model.amount,
        method: model.method.into(),
        status: model.status.into(),
        paid_at: model.paid_at.with_timezone(&Utc),
        external_transaction_id: model.external_transaction_id,
    }
}

/// Converts an invoice row into the core type.
pub(crate) fn invoice_from_model(model: invoices::Model) -> Invoice {
    Invoice {
        id: model.id,
        payment_id: model.payment_id,
        invoice_number: model.invoice_number,
        tax_id: model.tax_id,
        legal_name: model.legal_name,
        issued_at: model.issued_at.with_timezone(&Utc),
        control_code: model.control_code,
        pdf_path: model.pdf_path,
    }
}

/// Which invoice unique constraint an insert violated, if any.
#[derive(Debug, PartialEq, Eq)]
enum InvoiceConflict {
    Payment,
    Number,
}

fn classify_invoice_conflict(err: &DbErr) -> Option<InvoiceConflict> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains(INVOICE_PAYMENT_CONSTRAINT) => {
            Some(InvoiceConflict::Payment)
        }
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains(INVOICE_NUMBER_CONSTRAINT) => {
            Some(InvoiceConflict::Number)
        }
        _ => None,
    }
}

/// Maps a failed invoice insert to `InvoiceNumberTaken` when the number collided.
fn number_taken_or(err: DbErr, number: String) -> BillingError {
    match classify_invoice_conflict(&err) {
        Some(InvoiceConflict::Number) => BillingError::InvoiceNumberTaken(number),
        _ => repo_err(err),
    }
}

fn invoice_row(invoice: NewInvoice) -> invoices::ActiveModel {
    invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        payment_id: Set(invoice.payment_id),
        invoice_number: Set(invoice.invoice_number.into_string()),
        tax_id: Set(invoice.tax_id),
        legal_name: Set(invoice.legal_name),
        issued_at: Set(Utc::now().into()),
        control_code: Set(None),
        pdf_path: Set(None),
    }
}

impl BillingRepository for LedgerRepository {
    async fn load_case_graph(&self, case_id: Uuid) -> Result<Option<CaseGraph>, BillingError> {
        let Some(case) = cases::Entity::find_by_id(case_id)
            .one(&self.db)
            .await
            .map_err(repo_err)?
        else {
            return Ok(None);
        };

        // Stable party order: creation time, then id.
        let parties = case_parties::Entity::find()
            .filter(case_parties::Column::CaseId.eq(case.id))
            .order_by_asc(case_parties::Column::CreatedAt)
            .order_by_asc(case_parties::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        let client_ids: Vec<Uuid> = parties.iter().filter_map(|p| p.client_id).collect();
        let client_rows = if client_ids.is_empty() {
            Vec::new()
        } else {
            clients::Entity::find()
                .filter(clients::Column::Id.is_in(client_ids))
                .all(&self.db)
                .await
                .map_err(repo_err)?
        };

        let person_ids: Vec<Uuid> = client_rows.iter().map(|c| c.person_id).collect();
        let people: HashMap<Uuid, PersonRecord> = if person_ids.is_empty() {
            HashMap::new()
        } else {
            persons::Entity::find()
                .filter(persons::Column::Id.is_in(person_ids))
                .all(&self.db)
                .await
                .map_err(repo_err)?
                .into_iter()
                .map(|p| {
                    (
                        p.id,
                        PersonRecord {
                            id: p.id,
                            first_names: p.first_names,
                            paternal_surname: p.paternal_surname,
                            tax_id: p.tax_id,
                            user_id: p.user_id,
                        },
                    )
                })
                .collect()
        };

        let clients_by_id: HashMap<Uuid, ClientRecord> = client_rows
            .into_iter()
            .map(|c| {
                (
                    c.id,
                    ClientRecord {
                        id: c.id,
                        person: people.get(&c.person_id).cloned(),
                    },
                )
            })
            .collect();

        let parties = parties
            .into_iter()
            .map(|p| PartyRecord {
                id: p.id,
                role: p.role.into(),
                client: p.client_id.and_then(|id| clients_by_id.get(&id).cloned()),
            })
            .collect();

        Ok(Some(CaseGraph {
            case_id: case.id,
            parties,
        }))
    }

    async fn concept_exists(&self, concept_id: Uuid) -> Result<bool, BillingError> {
        let count = payment_concepts::Entity::find_by_id(concept_id)
            .count(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(count > 0)
    }

    async fn insert_completed_payment(
        &self,
        payment: NewPayment,
        invoice: NewInvoice,
    ) -> Result<ResolvedPayment, BillingError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        let now = Utc::now().into();
        let payment = payments::ActiveModel {
            id: Set(payment.id),
            case_id: Set(payment.case_id),
            billed_user_id: Set(payment.billed_user_id),
            concept_id: Set(payment.concept_id),
            amount: Set(payment.amount),
            method: Set(payment.method.into()),
            status: Set(PaymentStatus::Completed),
            paid_at: Set(now),
            external_transaction_id: Set(payment.external_transaction_id),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(repo_err)?;

        let number = invoice.invoice_number.to_string();
        match invoice_row(invoice).insert(&txn).await {
            Ok(invoice) => {
                txn.commit().await.map_err(repo_err)?;
                Ok(ResolvedPayment {
                    payment: payment_from_model(payment),
                    invoice: invoice_from_model(invoice),
                })
            }
            Err(err) => {
                txn.rollback().await.map_err(repo_err)?;
                Err(number_taken_or(err, number))
            }
        }
    }

    async fn complete_pending_payment(
        &self,
        invoice: NewInvoice,
    ) -> Result<ResolvedPayment, BillingError> {
        let payment_id = invoice.payment_id;
        let txn = self.db.begin().await.map_err(repo_err)?;

        let locked = payments::Entity::find_by_id(payment_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?
            .ok_or(BillingError::PaymentNotFound(payment_id))?;
        let current: billing::PaymentStatus = locked.status.into();
        current.transition_to(billing::PaymentStatus::Completed)?;

        let mut active: payments::ActiveModel = locked.into();
        active.status = Set(PaymentStatus::Completed);
        active.updated_at = Set(Utc::now().into());
        let payment = active.update(&txn).await.map_err(repo_err)?;

        let number = invoice.invoice_number.to_string();
        match invoice_row(invoice).insert(&txn).await {
            Ok(invoice) => {
                txn.commit().await.map_err(repo_err)?;
                Ok(ResolvedPayment {
                    payment: payment_from_model(payment),
                    invoice: invoice_from_model(invoice),
                })
            }
            Err(err) => {
                txn.rollback().await.map_err(repo_err)?;
                Err(number_taken_or(err, number))
            }
        }
    }

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, BillingError> {
        Ok(payments::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await
            .map_err(repo_err)?
            .map(payment_from_model))
    }

    async fn issue_invoice_if_absent(
        &self,
        invoice: NewInvoice,
    ) -> Result<InvoiceIssue, BillingError> {
        let payment_id = invoice.payment_id;
        let txn = self.db.begin().await.map_err(repo_err)?;

        // Serializes concurrent issuers for the same payment.
        let locked = payments::Entity::find_by_id(payment_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?;
        if locked.is_none() {
            txn.rollback().await.map_err(repo_err)?;
            return Err(BillingError::PaymentNotFound(payment_id));
        }

        if let Some(existing) = invoices::Entity::find()
            .filter(invoices::Column::PaymentId.eq(payment_id))
            .one(&txn)
            .await
            .map_err(repo_err)?
        {
            txn.commit().await.map_err(repo_err)?;
            return Ok(InvoiceIssue::AlreadyExists(invoice_from_model(existing)));
        }

        let number = invoice.invoice_number.to_string();
        let inserted = invoice_row(invoice).insert(&txn).await;

        match inserted {
            Ok(model) => {
                txn.commit().await.map_err(repo_err)?;
                Ok(InvoiceIssue::Created(invoice_from_model(model)))
            }
            Err(err) => {
                txn.rollback().await.map_err(repo_err)?;
                if classify_invoice_conflict(&err) == Some(InvoiceConflict::Payment) {
                    return self
                        .existing_invoice(payment_id)
                        .await
                        .map_err(repo_err)?
                        .map(InvoiceIssue::AlreadyExists)
                        .ok_or_else(|| repo_err(err));
                }
                Err(number_taken_or(err, number))
            }
        }
    }
}
