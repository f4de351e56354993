//! Database seeder for Casebill development and testing.
//!
//! Seeds a staff account, the fee catalog and a demo case whose claimant has
//! a client account, then issues invoices for any completed payment that is
//! still missing one.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::{Uuid, uuid};

use casebill_core::billing::PaymentResolver;
use casebill_db::LedgerRepository;
use casebill_db::entities::{
    case_parties, cases, clients, payment_concepts, persons,
    sea_orm_active_enums::{CaseStatus, PartyRole},
    users,
};
use casebill_shared::{AppConfig, JwtConfig, JwtService};

const STAFF_USER_ID: Uuid = uuid!("00000000-0000-0000-0000-000000000001");
const CLIENT_USER_ID: Uuid = uuid!("00000000-0000-0000-0000-000000000002");
const DEMO_CASE_ID: Uuid = uuid!("00000000-0000-0000-0000-000000000010");

const CONCEPTS: [(&str, Decimal); 4] = [
    ("Consulta inicial", dec!(150.00)),
    ("Elaboración de demanda", dec!(1200.00)),
    ("Audiencia", dec!(500.00)),
    ("Gastos de notaría", dec!(80.00)),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = casebill_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    println!("Seeding users...");
    seed_user(&db, STAFF_USER_ID, "secretaria", "Secretaría del Estudio", true).await?;
    seed_user(&db, CLIENT_USER_ID, "lcondori", "Lucía Condori Mamani", false).await?;

    println!("Seeding payment concepts...");
    seed_concepts(&db).await?;

    println!("Seeding demo case...");
    seed_demo_case(&db).await?;

    println!("Issuing missing invoices...");
    backfill_invoices(&db).await?;

    let jwt = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expiry_secs: 60 * 60 * 24,
    });
    let token = jwt.generate_access_token(STAFF_USER_ID, "secretaria", true)?;
    println!("Seeding complete!");
    println!("Staff token (24h), send as Bearer or set as the casebill_session cookie:");
    println!("{token}");

    Ok(())
}

async fn seed_user(
    db: &DatabaseConnection,
    id: Uuid,
    username: &str,
    full_name: &str,
    is_staff: bool,
) -> anyhow::Result<()> {
    if users::Entity::find_by_id(id).one(db).await?.is_some() {
        println!("  User {username} already exists, skipping...");
        return Ok(());
    }

    users::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        email: Set(format!("{username}@casebill.dev")),
        full_name: Set(full_name.to_string()),
        is_staff: Set(is_staff),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    println!("  Created user: {username}");
    Ok(())
}

async fn seed_concepts(db: &DatabaseConnection) -> anyhow::Result<()> {
    if payment_concepts::Entity::find().one(db).await?.is_some() {
        println!("  Concepts already exist, skipping...");
        return Ok(());
    }

    for (name, price) in CONCEPTS {
        let now = Utc::now();
        payment_concepts::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            suggested_price: Set(price),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        println!("  Created concept: {name} ({price})");
    }

    Ok(())
}

/// One open case: the claimant is the seeded client account, the defendant
/// has no account.
async fn seed_demo_case(db: &DatabaseConnection) -> anyhow::Result<()> {
    if cases::Entity::find_by_id(DEMO_CASE_ID).one(db).await?.is_some() {
        println!("  Demo case already exists, skipping...");
        return Ok(());
    }

    let now = Utc::now();
    cases::ActiveModel {
        id: Set(DEMO_CASE_ID),
        title: Set("Condori c/ Inmobiliaria Sur - cobro de deuda".to_string()),
        status: Set(CaseStatus::Open),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    add_party(db, PartyRole::Claimant, ("Lucía", "Condori", "5566778"), Some(CLIENT_USER_ID))
        .await?;
    add_party(db, PartyRole::Defendant, ("Ramiro", "Vargas", "3344556"), None).await?;

    println!("  Created demo case: {DEMO_CASE_ID}");
    Ok(())
}

async fn add_party(
    db: &DatabaseConnection,
    role: PartyRole,
    (first_names, surname, tax_id): (&str, &str, &str),
    user_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let person = persons::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_names: Set(first_names.to_string()),
        paternal_surname: Set(surname.to_string()),
        maternal_surname: Set(None),
        tax_id: Set(tax_id.to_string()),
        user_id: Set(user_id),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    let client = clients::ActiveModel {
        id: Set(Uuid::new_v4()),
        person_id: Set(person.id),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    case_parties::ActiveModel {
        id: Set(Uuid::new_v4()),
        case_id: Set(DEMO_CASE_ID),
        client_id: Set(Some(client.id)),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(())
}

async fn backfill_invoices(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = Arc::new(LedgerRepository::new(db.clone()));
    let pending = repo.completed_without_invoice().await?;
    if pending.is_empty() {
        println!("  Every completed payment has an invoice");
        return Ok(());
    }

    let resolver = PaymentResolver::new(Arc::clone(&repo));
    for payment_id in pending {
        let issued = resolver.ensure_invoice(payment_id).await?;
        let invoice = issued.into_invoice();
        println!("  Issued {} for payment {payment_id}", invoice.invoice_number);
    }

    Ok(())
}
