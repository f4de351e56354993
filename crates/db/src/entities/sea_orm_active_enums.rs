//! `SeaORM` active enums mapped to PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "case_status")]
pub enum CaseStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "party_role")]
pub enum PartyRole {
    #[sea_orm(string_value = "claimant")]
    Claimant,
    #[sea_orm(string_value = "defendant")]
    Defendant,
    #[sea_orm(string_value = "third_party")]
    ThirdParty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "qr")]
    Qr,
    #[sea_orm(string_value = "card")]
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl From<PartyRole> for casebill_core::billing::PartyRole {
    fn from(role: PartyRole) -> Self {
        match role {
            PartyRole::Claimant => Self::Claimant,
            PartyRole::Defendant => Self::Defendant,
            PartyRole::ThirdParty => Self::ThirdParty,
        }
    }
}

impl From<PaymentMethod> for casebill_core::billing::PaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::Qr => Self::Qr,
            PaymentMethod::Card => Self::Card,
        }
    }
}

impl From<casebill_core::billing::PaymentMethod> for PaymentMethod {
    fn from(method: casebill_core::billing::PaymentMethod) -> Self {
        use casebill_core::billing::PaymentMethod as Core;
        match method {
            Core::Cash => Self::Cash,
            Core::Qr => Self::Qr,
            Core::Card => Self::Card,
        }
    }
}

impl From<PaymentStatus> for casebill_core::billing::PaymentStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Completed => Self::Completed,
            PaymentStatus::Failed => Self::Failed,
        }
    }
}

impl From<casebill_core::billing::PaymentStatus> for PaymentStatus {
    fn from(status: casebill_core::billing::PaymentStatus) -> Self {
        use casebill_core::billing::PaymentStatus as Core;
        match status {
            Core::Pending => Self::Pending,
            Core::Completed => Self::Completed,
            Core::Failed => Self::Failed,
        }
    }
}
