//! Finance migration.
//!
//! Creates payment concepts, payments and invoices, plus the trigger that
//! keeps payment status transitions one-way.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(PAYMENT_CONCEPTS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS payment_concepts CASCADE;
DROP FUNCTION IF EXISTS enforce_payment_status_transition();
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS payment_method;
",
        )
        .await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE payment_method AS ENUM ('cash', 'qr', 'card');

CREATE TYPE payment_status AS ENUM ('pending', 'completed', 'failed');
";

const PAYMENT_CONCEPTS_SQL: &str = r"
CREATE TABLE payment_concepts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    suggested_price NUMERIC(10, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_concept_price_non_negative CHECK (suggested_price >= 0)
);

CREATE INDEX idx_payment_concepts_active_name ON payment_concepts(is_active DESC, name);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    case_id UUID NOT NULL REFERENCES cases(id) ON DELETE RESTRICT,
    billed_user_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    concept_id UUID REFERENCES payment_concepts(id) ON DELETE SET NULL,
    amount NUMERIC(10, 2) NOT NULL,
    method payment_method NOT NULL DEFAULT 'cash',
    status payment_status NOT NULL DEFAULT 'pending',
    paid_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    external_transaction_id VARCHAR(255),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_payments_paid_at ON payments(paid_at DESC, id);
CREATE INDEX idx_payments_case ON payments(case_id);
CREATE INDEX idx_payments_billed_user ON payments(billed_user_id, paid_at DESC);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id UUID NOT NULL REFERENCES payments(id) ON DELETE RESTRICT,
    invoice_number VARCHAR(50) NOT NULL,
    tax_id VARCHAR(20) NOT NULL,
    legal_name VARCHAR(150) NOT NULL,
    issued_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    control_code VARCHAR(100),
    pdf_path VARCHAR(255),
    CONSTRAINT uq_invoices_payment_id UNIQUE (payment_id),
    CONSTRAINT uq_invoices_invoice_number UNIQUE (invoice_number)
);

CREATE INDEX idx_invoices_issued_at ON invoices(issued_at DESC, id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: enforce_payment_status_transition
-- Completed and failed are terminal; paid_at never changes.
-- ============================================================
CREATE OR REPLACE FUNCTION enforce_payment_status_transition()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'Cannot change payment status from % to %', OLD.status, NEW.status;
    END IF;

    IF NEW.paid_at <> OLD.paid_at THEN
        RAISE EXCEPTION 'Payment timestamp is immutable';
    END IF;

    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_payment_status_transition
BEFORE UPDATE ON payments
FOR EACH ROW
EXECUTE FUNCTION enforce_payment_status_transition();
";
