//! Custody ledger schema initialization
//!
//! Executed once at startup. Every statement is idempotent so restarting
//! against an existing database is safe.

use anyhow::Result;
use sqlx::PgPool;

/// Initialize the custody ledger schema
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing custody ledger schema...");

    for (name, ddl) in STATEMENTS {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("Custody ledger schema initialized successfully");
    Ok(())
}

const STATEMENTS: &[(&str, &str)] = &[
    ("production_batches", CREATE_PRODUCTION_BATCHES),
    ("inventory_units", CREATE_INVENTORY_UNITS),
    ("idx_units_allocation", CREATE_IDX_UNITS_ALLOCATION),
    ("transfer_batches", CREATE_TRANSFER_BATCHES),
    ("administration_records", CREATE_ADMINISTRATION_RECORDS),
    ("ledger_events", CREATE_LEDGER_EVENTS),
    ("idx_events_cursor", CREATE_IDX_EVENTS_CURSOR),
    ("idx_events_transfer", CREATE_IDX_EVENTS_TRANSFER),
    ("idx_events_production", CREATE_IDX_EVENTS_PRODUCTION),
    ("idx_events_administration", CREATE_IDX_EVENTS_ADMINISTRATION),
    ("idx_events_from_owner", CREATE_IDX_EVENTS_FROM_OWNER),
    ("idx_events_to_owner", CREATE_IDX_EVENTS_TO_OWNER),
    ("batch_sequences", CREATE_BATCH_SEQUENCES),
];

const CREATE_PRODUCTION_BATCHES: &str = r#"
CREATE TABLE IF NOT EXISTS production_batches (
    batch_id        BIGSERIAL PRIMARY KEY,
    batch_number    TEXT        NOT NULL,
    manufacturer_id BIGINT      NOT NULL,
    product_id      BIGINT      NOT NULL,
    quantity        INTEGER     NOT NULL,
    manufactured_on DATE        NOT NULL,
    expires_on      DATE        NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (manufacturer_id, batch_number)
)
"#;

const CREATE_INVENTORY_UNITS: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_units (
    unit_id    BIGSERIAL PRIMARY KEY,
    unit_code  TEXT        NOT NULL UNIQUE,
    batch_id   BIGINT      NOT NULL REFERENCES production_batches(batch_id),
    product_id BIGINT      NOT NULL,
    owner_type SMALLINT    NOT NULL,
    owner_id   BIGINT      NOT NULL,
    status     SMALLINT    NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

// Covers the allocator's candidate scan: equality on (owner, product, status)
// then FIFO order (created_at, unit_id).
const CREATE_IDX_UNITS_ALLOCATION: &str = r#"
CREATE INDEX IF NOT EXISTS idx_units_allocation
    ON inventory_units (owner_id, product_id, status, created_at, unit_id)
"#;

const CREATE_TRANSFER_BATCHES: &str = r#"
CREATE TABLE IF NOT EXISTS transfer_batches (
    transfer_id     UUID PRIMARY KEY,
    source_org      BIGINT      NOT NULL,
    dest_owner_type SMALLINT    NOT NULL,
    dest_owner_id   BIGINT      NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    reversed        BOOLEAN     NOT NULL DEFAULT FALSE,
    reversed_at     TIMESTAMPTZ,
    reversal_reason TEXT
)
"#;

const CREATE_ADMINISTRATION_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS administration_records (
    administration_id UUID PRIMARY KEY,
    hospital_org      BIGINT      NOT NULL,
    patient_id        BIGINT      NOT NULL,
    administered_on   DATE        NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
    reversed          BOOLEAN     NOT NULL DEFAULT FALSE,
    reversed_at       TIMESTAMPTZ,
    reversal_reason   TEXT
)
"#;

const CREATE_LEDGER_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_events (
    event_id            BIGSERIAL PRIMARY KEY,
    unit_id             BIGINT      NOT NULL REFERENCES inventory_units(unit_id),
    action              SMALLINT    NOT NULL,
    from_owner_type     SMALLINT,
    from_owner_id       BIGINT,
    to_owner_type       SMALLINT,
    to_owner_id         BIGINT,
    transfer_id         UUID,
    production_batch_id BIGINT,
    administration_id   UUID,
    reversal            BOOLEAN     NOT NULL DEFAULT FALSE,
    reversal_reason     TEXT,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

// Keyset pagination scans this index backwards; no OFFSET anywhere.
const CREATE_IDX_EVENTS_CURSOR: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_cursor
    ON ledger_events (created_at DESC, event_id DESC)
"#;

const CREATE_IDX_EVENTS_TRANSFER: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_transfer
    ON ledger_events (transfer_id) WHERE transfer_id IS NOT NULL
"#;

const CREATE_IDX_EVENTS_PRODUCTION: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_production
    ON ledger_events (production_batch_id) WHERE production_batch_id IS NOT NULL
"#;

const CREATE_IDX_EVENTS_ADMINISTRATION: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_administration
    ON ledger_events (administration_id) WHERE administration_id IS NOT NULL
"#;

const CREATE_IDX_EVENTS_FROM_OWNER: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_from_owner
    ON ledger_events (from_owner_id, created_at DESC, event_id DESC)
"#;

const CREATE_IDX_EVENTS_TO_OWNER: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_to_owner
    ON ledger_events (to_owner_id, created_at DESC, event_id DESC)
"#;

const CREATE_BATCH_SEQUENCES: &str = r#"
CREATE TABLE IF NOT EXISTS batch_sequences (
    manufacturer_id BIGINT PRIMARY KEY,
    last_seq        BIGINT NOT NULL
)
"#;
