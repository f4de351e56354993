//! `SeaORM` entity definitions.

pub mod case_parties;
pub mod cases;
pub mod clients;
pub mod invoices;
pub mod payment_concepts;
pub mod payments;
pub mod persons;
pub mod sea_orm_active_enums;
pub mod users;
