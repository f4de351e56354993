//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod concept;
pub mod directory;
pub mod invoice;
pub mod ledger;
pub mod payment;
mod search;

pub use concept::{ConceptError, ConceptRepository, CreateConceptInput, UpdateConceptInput};
pub use directory::DirectoryRepository;
pub use invoice::InvoiceRepository;
pub use ledger::LedgerRepository;
pub use payment::{PaymentDetails, PaymentFilter, PaymentRepository, UpdatePaymentInput};
