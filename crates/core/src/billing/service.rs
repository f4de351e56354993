//! Payment resolver: records a payment and issues its invoice.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::error::BillingError;
use super::identity::resolve_billing_identity;
use super::invoice_number::{InvoiceNumberGenerator, RandomInvoiceNumbers};
use super::types::{
    BillingIdentity, CaseGraph, InvoiceIssue, NewInvoice, NewPayment, Payment, PaymentRequest,
    PaymentStatus, ResolvedPayment,
};

/// Attempts made to find a free invoice number before giving up.
pub const MAX_INVOICE_NUMBER_ATTEMPTS: u32 = 5;

/// Repository trait for billing persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// Every write that produces an invoice must return
/// `BillingError::InvoiceNumberTaken` when the candidate number is already
/// used, and must leave nothing behind in that case.
pub trait BillingRepository: Send + Sync {
    /// Load the case with its parties, clients and persons.
    fn load_case_graph(
        &self,
        case_id: Uuid,
    ) -> impl Future<Output = Result<Option<CaseGraph>, BillingError>> + Send;

    /// Check if a payment concept exists.
    fn concept_exists(
        &self,
        concept_id: Uuid,
    ) -> impl Future<Output = Result<bool, BillingError>> + Send;

    /// Write a completed payment and its invoice in one transaction.
    fn insert_completed_payment(
        &self,
        payment: NewPayment,
        invoice: NewInvoice,
    ) -> impl Future<Output = Result<ResolvedPayment, BillingError>> + Send;

    /// Move a pending payment to completed and write its invoice in one transaction.
    ///
    /// Must fail with `BillingError::InvalidStatusTransition` unless the
    /// payment is still pending when its row is locked.
    fn complete_pending_payment(
        &self,
        invoice: NewInvoice,
    ) -> impl Future<Output = Result<ResolvedPayment, BillingError>> + Send;

    /// Find payment by ID.
    fn find_payment(
        &self,
        payment_id: Uuid,
    ) -> impl Future<Output = Result<Option<Payment>, BillingError>> + Send;

    /// Atomically write the invoice unless the payment already has one.
    ///
    /// Must return `InvoiceIssue::AlreadyExists` when the payment was
    /// invoiced first, including by a concurrent caller.
    fn issue_invoice_if_absent(
        &self,
        invoice: NewInvoice,
    ) -> impl Future<Output = Result<InvoiceIssue, BillingError>> + Send;
}

/// Records payments and guarantees each completed payment has exactly one invoice.
pub struct PaymentResolver<R: BillingRepository, G: InvoiceNumberGenerator = RandomInvoiceNumbers> {
    repo: Arc<R>,
    numbers: G,
}

impl<R: BillingRepository> PaymentResolver<R> {
    /// Create a resolver with random invoice numbers.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            numbers: RandomInvoiceNumbers,
        }
    }
}

impl<R: BillingRepository, G: InvoiceNumberGenerator> PaymentResolver<R, G> {
    /// Create a resolver with a custom invoice number source.
    #[must_use]
    pub fn with_generator(repo: Arc<R>, numbers: G) -> Self {
        Self { repo, numbers }
    }

    /// Record a payment for a case and issue its invoice.
    ///
    /// The billing identity is derived from the case's claimant. The payment
    /// is stored as completed and its invoice is written in the same
    /// transaction, so a failure leaves neither row behind.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Amount is not positive
    /// - Case or concept does not exist
    /// - No free invoice number is found
    /// - Database operation fails
    pub async fn record_payment(
        &self,
        request: PaymentRequest,
        submitter: Uuid,
    ) -> Result<ResolvedPayment, BillingError> {
        if request.amount <= rust_decimal::Decimal::ZERO {
            return Err(BillingError::InvalidAmount);
        }

        let graph = self
            .repo
            .load_case_graph(request.case_id)
            .await?
            .ok_or(BillingError::CaseNotFound(request.case_id))?;

        if let Some(concept_id) = request.concept_id
            && !self.repo.concept_exists(concept_id).await?
        {
            return Err(BillingError::ConceptNotFound(concept_id));
        }

        let identity = Self::identity_for(&graph, submitter);
        let payment = NewPayment {
            id: Uuid::new_v4(),
            case_id: request.case_id,
            billed_user_id: identity.billed_user_id,
            concept_id: request.concept_id,
            amount: request.amount,
            method: request.method,
            external_transaction_id: request.external_transaction_id,
        };

        let resolved = self
            .with_free_number(payment.id, &identity, |invoice| {
                self.repo.insert_completed_payment(payment.clone(), invoice)
            })
            .await?;

        info!(
            payment_id = %resolved.payment.id,
            case_id = %resolved.payment.case_id,
            amount = %resolved.payment.amount,
            method = resolved.payment.method.as_str(),
            invoice_number = %resolved.invoice.invoice_number,
            "Payment recorded"
        );

        Ok(resolved)
    }

    /// Complete a pending payment and issue its invoice.
    ///
    /// The invoice is billed to the payment's own user, with the tax identity
    /// taken from the case's claimant.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment does not exist, is not pending, no
    /// free invoice number is found, or the database operation fails.
    pub async fn complete_payment(&self, payment_id: Uuid) -> Result<ResolvedPayment, BillingError> {
        let payment = self
            .repo
            .find_payment(payment_id)
            .await?
            .ok_or(BillingError::PaymentNotFound(payment_id))?;
        payment.status.transition_to(PaymentStatus::Completed)?;

        let graph = self
            .repo
            .load_case_graph(payment.case_id)
            .await?
            .ok_or(BillingError::CaseNotFound(payment.case_id))?;

        let identity = Self::identity_for(&graph, payment.billed_user_id);
        let resolved = self
            .with_free_number(payment_id, &identity, |invoice| {
                self.repo.complete_pending_payment(invoice)
            })
            .await?;

        info!(
            %payment_id,
            invoice_number = %resolved.invoice.invoice_number,
            "Payment completed"
        );

        Ok(resolved)
    }

    /// Issue the invoice for an existing completed payment if it has none.
    ///
    /// Safe to call repeatedly and concurrently; at most one invoice is ever
    /// written per payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment does not exist, is not completed, or
    /// the database operation fails.
    pub async fn ensure_invoice(&self, payment_id: Uuid) -> Result<InvoiceIssue, BillingError> {
        let payment = self
            .repo
            .find_payment(payment_id)
            .await?
            .ok_or(BillingError::PaymentNotFound(payment_id))?;

        if payment.status != PaymentStatus::Completed {
            return Err(BillingError::PaymentNotCompleted(payment_id));
        }

        let graph = self
            .repo
            .load_case_graph(payment.case_id)
            .await?
            .ok_or(BillingError::CaseNotFound(payment.case_id))?;

        let identity = Self::identity_for(&graph, payment.billed_user_id);
        let issue = self
            .with_free_number(payment.id, &identity, |invoice| {
                self.repo.issue_invoice_if_absent(invoice)
            })
            .await?;

        if let InvoiceIssue::Created(invoice) = &issue {
            info!(
                %payment_id,
                invoice_number = %invoice.invoice_number,
                "Invoice issued"
            );
        }
        Ok(issue)
    }

    fn identity_for(graph: &CaseGraph, submitter: Uuid) -> BillingIdentity {
        let identity = resolve_billing_identity(graph, submitter);
        if identity.is_anonymous() {
            warn!(
                case_id = %graph.case_id,
                "No claimant person reachable from case, invoicing anonymously"
            );
        }
        identity
    }

    /// Runs `write` with fresh invoice numbers until one is free.
    async fn with_free_number<T, F, Fut>(
        &self,
        payment_id: Uuid,
        identity: &BillingIdentity,
        mut write: F,
    ) -> Result<T, BillingError>
    where
        F: FnMut(NewInvoice) -> Fut,
        Fut: Future<Output = Result<T, BillingError>>,
    {
        for attempt in 1..=MAX_INVOICE_NUMBER_ATTEMPTS {
            let candidate = NewInvoice {
                payment_id,
                invoice_number: self.numbers.generate(),
                tax_id: identity.tax_id.clone(),
                legal_name: identity.legal_name.clone(),
            };

            match write(candidate).await {
                Err(BillingError::InvoiceNumberTaken(number)) => {
                    warn!(%payment_id, attempt, %number, "Invoice number collision, retrying");
                }
                result => return result,
            }
        }

        Err(BillingError::InvoiceNumberExhausted(
            MAX_INVOICE_NUMBER_ATTEMPTS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::invoice_number::InvoiceNumber;
    use crate::billing::types::{
        ClientRecord, Invoice, PartyRecord, PartyRole, PaymentMethod, PersonRecord,
    };
    use crate::billing::{ANONYMOUS_LEGAL_NAME, ANONYMOUS_TAX_ID};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBillingRepository {
        cases: Mutex<HashMap<Uuid, CaseGraph>>,
        concepts: Mutex<HashSet<Uuid>>,
        payments: Mutex<HashMap<Uuid, Payment>>,
        invoices: Mutex<Vec<Invoice>>,
    }

    impl MockBillingRepository {
        fn add_case(&self, parties: Vec<PartyRecord>) -> Uuid {
            let case_id = Uuid::new_v4();
            self.cases
                .lock()
                .unwrap()
                .insert(case_id, CaseGraph { case_id, parties });
            case_id
        }

        fn add_concept(&self) -> Uuid {
            let id = Uuid::new_v4();
            self.concepts.lock().unwrap().insert(id);
            id
        }

        fn add_payment(&self, case_id: Uuid, status: PaymentStatus) -> Uuid {
            let id = Uuid::new_v4();
            self.payments.lock().unwrap().insert(
                id,
                Payment {
                    id,
                    case_id,
                    billed_user_id: Uuid::new_v4(),
                    concept_id: None,
                    amount: dec!(150.00),
                    method: PaymentMethod::Cash,
                    status,
                    paid_at: Utc::now(),
                    external_transaction_id: None,
                },
            );
            id
        }

        fn seed_invoice_number(&self, number: &str) {
            self.invoices.lock().unwrap().push(Invoice {
                id: Uuid::new_v4(),
                payment_id: Uuid::new_v4(),
                invoice_number: number.to_string(),
                tax_id: ANONYMOUS_TAX_ID.to_string(),
                legal_name: ANONYMOUS_LEGAL_NAME.to_string(),
                issued_at: Utc::now(),
                control_code: None,
                pdf_path: None,
            });
        }

        fn store_invoice(
            invoices: &mut Vec<Invoice>,
            invoice: NewInvoice,
        ) -> Result<Invoice, BillingError> {
            if invoices
                .iter()
                .any(|i| i.invoice_number == invoice.invoice_number.as_str())
            {
                return Err(BillingError::InvoiceNumberTaken(
                    invoice.invoice_number.into_string(),
                ));
            }
            let stored = Invoice {
                id: Uuid::new_v4(),
                payment_id: invoice.payment_id,
                invoice_number: invoice.invoice_number.into_string(),
                tax_id: invoice.tax_id,
                legal_name: invoice.legal_name,
                issued_at: Utc::now(),
                control_code: None,
                pdf_path: None,
            };
            invoices.push(stored.clone());
            Ok(stored)
        }

        fn status_of(&self, payment_id: Uuid) -> PaymentStatus {
            self.payments.lock().unwrap()[&payment_id].status
        }

        fn invoices_for(&self, payment_id: Uuid) -> usize {
            self.invoices
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.payment_id == payment_id)
                .count()
        }
    }

    impl BillingRepository for MockBillingRepository {
        async fn load_case_graph(&self, case_id: Uuid) -> Result<Option<CaseGraph>, BillingError> {
            Ok(self.cases.lock().unwrap().get(&case_id).cloned())
        }

        async fn concept_exists(&self, concept_id: Uuid) -> Result<bool, BillingError> {
            Ok(self.concepts.lock().unwrap().contains(&concept_id))
        }

        async fn insert_completed_payment(
            &self,
            payment: NewPayment,
            invoice: NewInvoice,
        ) -> Result<ResolvedPayment, BillingError> {
            let mut payments = self.payments.lock().unwrap();
            let mut invoices = self.invoices.lock().unwrap();
            let invoice = Self::store_invoice(&mut invoices, invoice)?;
            let stored = Payment {
                id: payment.id,
                case_id: payment.case_id,
                billed_user_id: payment.billed_user_id,
                concept_id: payment.concept_id,
                amount: payment.amount,
                method: payment.method,
                status: PaymentStatus::Completed,
                paid_at: Utc::now(),
                external_transaction_id: payment.external_transaction_id,
            };
            payments.insert(stored.id, stored.clone());
            Ok(ResolvedPayment {
                payment: stored,
                invoice,
            })
        }

        async fn complete_pending_payment(
            &self,
            invoice: NewInvoice,
        ) -> Result<ResolvedPayment, BillingError> {
            let mut payments = self.payments.lock().unwrap();
            let mut invoices = self.invoices.lock().unwrap();
            let payment_id = invoice.payment_id;
            let payment = payments
                .get_mut(&payment_id)
                .ok_or(BillingError::PaymentNotFound(payment_id))?;
            let next = payment.status.transition_to(PaymentStatus::Completed)?;
            let invoice = Self::store_invoice(&mut invoices, invoice)?;
            payment.status = next;
            Ok(ResolvedPayment {
                payment: payment.clone(),
                invoice,
            })
        }

        async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, BillingError> {
            Ok(self.payments.lock().unwrap().get(&payment_id).cloned())
        }

        async fn issue_invoice_if_absent(
            &self,
            invoice: NewInvoice,
        ) -> Result<InvoiceIssue, BillingError> {
            let mut invoices = self.invoices.lock().unwrap();
            if let Some(existing) = invoices.iter().find(|i| i.payment_id == invoice.payment_id) {
                return Ok(InvoiceIssue::AlreadyExists(existing.clone()));
            }
            Self::store_invoice(&mut invoices, invoice).map(InvoiceIssue::Created)
        }
    }

    struct ScriptedNumbers(Mutex<VecDeque<&'static str>>);

    impl ScriptedNumbers {
        fn new(numbers: &[&'static str]) -> Self {
            Self(Mutex::new(numbers.iter().copied().collect()))
        }
    }

    impl InvoiceNumberGenerator for ScriptedNumbers {
        fn generate(&self) -> InvoiceNumber {
            let next = self.0.lock().unwrap().pop_front().unwrap_or("F-ZZZZZZZZ");
            InvoiceNumber::parse(next).unwrap()
        }
    }

    fn claimant(user_id: Option<Uuid>) -> PartyRecord {
        PartyRecord {
            id: Uuid::new_v4(),
            role: PartyRole::Claimant,
            client: Some(ClientRecord {
                id: Uuid::new_v4(),
                person: Some(PersonRecord {
                    id: Uuid::new_v4(),
                    first_names: "Ana".to_string(),
                    paternal_surname: "Flores".to_string(),
                    tax_id: "7788990".to_string(),
                    user_id,
                }),
            }),
        }
    }

    fn request(case_id: Uuid, amount: rust_decimal::Decimal) -> PaymentRequest {
        PaymentRequest {
            case_id,
            concept_id: None,
            amount,
            method: PaymentMethod::Cash,
            external_transaction_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_payment_bills_claimant_account() {
        let repo = Arc::new(MockBillingRepository::default());
        let account = Uuid::new_v4();
        let case_id = repo.add_case(vec![claimant(Some(account))]);
        let resolver = PaymentResolver::new(repo.clone());

        let resolved = resolver
            .record_payment(request(case_id, dec!(350.00)), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(resolved.payment.status, PaymentStatus::Completed);
        assert_eq!(resolved.payment.billed_user_id, account);
        assert_eq!(resolved.invoice.tax_id, "7788990");
        assert_eq!(resolved.invoice.legal_name, "Ana Flores");
        assert_eq!(resolved.invoice.payment_id, resolved.payment.id);
        assert!(InvoiceNumber::parse(&resolved.invoice.invoice_number).is_some());
        assert_eq!(repo.invoices_for(resolved.payment.id), 1);
    }

    #[tokio::test]
    async fn test_record_payment_claimant_without_account_bills_submitter() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![claimant(None)]);
        let submitter = Uuid::new_v4();
        let resolver = PaymentResolver::new(repo);

        let resolved = resolver
            .record_payment(request(case_id, dec!(10)), submitter)
            .await
            .unwrap();

        assert_eq!(resolved.payment.billed_user_id, submitter);
        assert_eq!(resolved.invoice.tax_id, "7788990");
    }

    #[tokio::test]
    async fn test_record_payment_without_claimant_is_anonymous() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![]);
        let submitter = Uuid::new_v4();
        let resolver = PaymentResolver::new(repo);

        let resolved = resolver
            .record_payment(request(case_id, dec!(10)), submitter)
            .await
            .unwrap();

        assert_eq!(resolved.payment.billed_user_id, submitter);
        assert_eq!(resolved.invoice.tax_id, ANONYMOUS_TAX_ID);
        assert_eq!(resolved.invoice.legal_name, ANONYMOUS_LEGAL_NAME);
    }

    #[tokio::test]
    async fn test_record_payment_rejects_non_positive_amount() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![]);
        let resolver = PaymentResolver::new(repo.clone());

        for amount in [dec!(0), dec!(-5.00)] {
            let result = resolver
                .record_payment(request(case_id, amount), Uuid::new_v4())
                .await;
            assert!(matches!(result, Err(BillingError::InvalidAmount)));
        }
        assert!(repo.payments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_payment_case_not_found() {
        let repo = Arc::new(MockBillingRepository::default());
        let resolver = PaymentResolver::new(repo.clone());
        let missing = Uuid::new_v4();

        let result = resolver
            .record_payment(request(missing, dec!(10)), Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(BillingError::CaseNotFound(id)) if id == missing));
        assert!(repo.payments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_payment_checks_concept() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![]);
        let concept_id = repo.add_concept();
        let resolver = PaymentResolver::new(repo);

        let mut with_unknown = request(case_id, dec!(10));
        with_unknown.concept_id = Some(Uuid::new_v4());
        assert!(matches!(
            resolver.record_payment(with_unknown, Uuid::new_v4()).await,
            Err(BillingError::ConceptNotFound(_))
        ));

        let mut with_known = request(case_id, dec!(10));
        with_known.concept_id = Some(concept_id);
        let resolved = resolver
            .record_payment(with_known, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(resolved.payment.concept_id, Some(concept_id));
    }

    #[tokio::test]
    async fn test_ensure_invoice_is_idempotent() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![claimant(None)]);
        let payment_id = repo.add_payment(case_id, PaymentStatus::Completed);
        let resolver = PaymentResolver::new(repo.clone());

        let first = resolver.ensure_invoice(payment_id).await.unwrap();
        let second = resolver.ensure_invoice(payment_id).await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.into_invoice(), second.into_invoice());
        assert_eq!(repo.invoices_for(payment_id), 1);
    }

    #[tokio::test]
    async fn test_ensure_invoice_requires_completed_payment() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![]);
        let pending = repo.add_payment(case_id, PaymentStatus::Pending);
        let failed = repo.add_payment(case_id, PaymentStatus::Failed);
        let resolver = PaymentResolver::new(repo.clone());

        for id in [pending, failed] {
            assert!(matches!(
                resolver.ensure_invoice(id).await,
                Err(BillingError::PaymentNotCompleted(_))
            ));
            assert_eq!(repo.invoices_for(id), 0);
        }
        assert!(matches!(
            resolver.ensure_invoice(Uuid::new_v4()).await,
            Err(BillingError::PaymentNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_invoice_writes_once() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![claimant(None)]);
        let payment_id = repo.add_payment(case_id, PaymentStatus::Completed);
        let resolver = Arc::new(PaymentResolver::new(repo.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.ensure_invoice(payment_id).await })
            })
            .collect();

        let mut created = 0;
        let mut numbers = HashSet::new();
        for handle in handles {
            let issue = handle.await.unwrap().unwrap();
            if issue.was_created() {
                created += 1;
            }
            numbers.insert(issue.into_invoice().invoice_number);
        }

        assert_eq!(created, 1);
        assert_eq!(numbers.len(), 1);
        assert_eq!(repo.invoices_for(payment_id), 1);
    }

    #[tokio::test]
    async fn test_invoice_number_collision_is_retried() {
        let repo = Arc::new(MockBillingRepository::default());
        repo.seed_invoice_number("F-AAAAAAAA");
        let case_id = repo.add_case(vec![]);
        let resolver = PaymentResolver::with_generator(
            repo,
            ScriptedNumbers::new(&["F-AAAAAAAA", "F-BBBBBBBB"]),
        );

        let resolved = resolver
            .record_payment(request(case_id, dec!(20)), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(resolved.invoice.invoice_number, "F-BBBBBBBB");
    }

    #[tokio::test]
    async fn test_invoice_number_exhaustion() {
        let repo = Arc::new(MockBillingRepository::default());
        repo.seed_invoice_number("F-AAAAAAAA");
        let case_id = repo.add_case(vec![]);
        let payment_id = repo.add_payment(case_id, PaymentStatus::Completed);
        let resolver = PaymentResolver::with_generator(
            repo.clone(),
            ScriptedNumbers::new(&["F-AAAAAAAA"; 6]),
        );

        let result = resolver.ensure_invoice(payment_id).await;

        assert!(matches!(
            result,
            Err(BillingError::InvoiceNumberExhausted(MAX_INVOICE_NUMBER_ATTEMPTS))
        ));
        assert_eq!(repo.invoices_for(payment_id), 0);
    }

    #[tokio::test]
    async fn test_record_payment_exhaustion_persists_nothing() {
        let repo = Arc::new(MockBillingRepository::default());
        repo.seed_invoice_number("F-AAAAAAAA");
        let case_id = repo.add_case(vec![claimant(None)]);
        let resolver = PaymentResolver::with_generator(
            repo.clone(),
            ScriptedNumbers::new(&["F-AAAAAAAA"; 6]),
        );

        let result = resolver
            .record_payment(request(case_id, dec!(90.00)), Uuid::new_v4())
            .await;

        assert!(matches!(
            result,
            Err(BillingError::InvoiceNumberExhausted(MAX_INVOICE_NUMBER_ATTEMPTS))
        ));
        assert!(repo.payments.lock().unwrap().is_empty());
        assert_eq!(repo.invoices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_payment_issues_invoice() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![claimant(None)]);
        let payment_id = repo.add_payment(case_id, PaymentStatus::Pending);
        let resolver = PaymentResolver::new(repo.clone());

        let resolved = resolver.complete_payment(payment_id).await.unwrap();

        assert_eq!(resolved.payment.status, PaymentStatus::Completed);
        assert_eq!(resolved.invoice.payment_id, payment_id);
        assert_eq!(resolved.invoice.tax_id, "7788990");
        assert_eq!(repo.status_of(payment_id), PaymentStatus::Completed);
        assert_eq!(repo.invoices_for(payment_id), 1);

        assert!(matches!(
            resolver.complete_payment(payment_id).await,
            Err(BillingError::InvalidStatusTransition {
                from: PaymentStatus::Completed,
                to: PaymentStatus::Completed
            })
        ));
        assert_eq!(repo.invoices_for(payment_id), 1);
    }

    #[tokio::test]
    async fn test_complete_payment_rejects_failed_and_missing() {
        let repo = Arc::new(MockBillingRepository::default());
        let case_id = repo.add_case(vec![]);
        let failed = repo.add_payment(case_id, PaymentStatus::Failed);
        let resolver = PaymentResolver::new(repo.clone());

        assert!(matches!(
            resolver.complete_payment(failed).await,
            Err(BillingError::InvalidStatusTransition { .. })
        ));
        assert_eq!(repo.invoices_for(failed), 0);
        assert!(matches!(
            resolver.complete_payment(Uuid::new_v4()).await,
            Err(BillingError::PaymentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_payment_exhaustion_leaves_payment_pending() {
        let repo = Arc::new(MockBillingRepository::default());
        repo.seed_invoice_number("F-AAAAAAAA");
        let case_id = repo.add_case(vec![]);
        let payment_id = repo.add_payment(case_id, PaymentStatus::Pending);
        let resolver = PaymentResolver::with_generator(
            repo.clone(),
            ScriptedNumbers::new(&["F-AAAAAAAA"; 6]),
        );

        assert!(matches!(
            resolver.complete_payment(payment_id).await,
            Err(BillingError::InvoiceNumberExhausted(_))
        ));
        assert_eq!(repo.status_of(payment_id), PaymentStatus::Pending);
        assert_eq!(repo.invoices_for(payment_id), 0);
    }
}
