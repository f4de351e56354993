//! Casebill Core - billing logic for case payments.
//!
//! This crate contains the finance domain of the case-management system:
//! - Payment resolution and invoice issuance
//! - Payment-intent gateway client
//! - Invoice PDF rendering
//!
//! Persistence is abstracted behind repository traits implemented by
//! `casebill-db`.

pub mod billing;
pub mod gateway;
pub mod pdf;
