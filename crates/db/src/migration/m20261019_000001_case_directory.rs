//! Case directory migration.
//!
//! Creates the minimal user, person, client, case and case-party tables the
//! finance module reads to resolve billing identity.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: PEOPLE
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(PERSONS_SQL).await?;
        db.execute_unprepared(CLIENTS_SQL).await?;

        // ============================================================
        // PART 3: CASES
        // ============================================================
        db.execute_unprepared(CASES_SQL).await?;
        db.execute_unprepared(CASE_PARTIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS case_parties CASCADE;
DROP TABLE IF EXISTS cases CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TABLE IF EXISTS persons CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TYPE IF EXISTS party_role;
DROP TYPE IF EXISTS case_status;
",
        )
        .await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE EXTENSION IF NOT EXISTS pgcrypto;

CREATE TYPE case_status AS ENUM ('open', 'closed', 'archived');

CREATE TYPE party_role AS ENUM ('claimant', 'defendant', 'third_party');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(150) NOT NULL UNIQUE,
    email VARCHAR(254) NOT NULL DEFAULT '',
    full_name VARCHAR(150) NOT NULL DEFAULT '',
    is_staff BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PERSONS_SQL: &str = r"
CREATE TABLE persons (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    first_names VARCHAR(100) NOT NULL,
    paternal_surname VARCHAR(100) NOT NULL,
    maternal_surname VARCHAR(100),
    tax_id VARCHAR(20) NOT NULL,
    user_id UUID UNIQUE REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const CLIENTS_SQL: &str = r"
CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    person_id UUID NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_clients_person ON clients(person_id);
";

const CASES_SQL: &str = r"
CREATE TABLE cases (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title VARCHAR(200) NOT NULL,
    status case_status NOT NULL DEFAULT 'open',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_cases_status ON cases(status);
";

const CASE_PARTIES_SQL: &str = r"
CREATE TABLE case_parties (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    case_id UUID NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
    role party_role NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Claimant lookup: first party by creation order
CREATE INDEX idx_case_parties_case_role ON case_parties(case_id, role, created_at, id);
";
