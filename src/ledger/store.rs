//! Ledger store: all SQL for custody state
//!
//! The store owns the four entity tables. Mutating operations take a
//! `&mut PgConnection` and are only ever called from inside one of the
//! transition engine's transactions; one business operation maps to one
//! transaction. Read operations accept any executor.
//!
//! Two structural guarantees live here:
//! - `inventory_units.owner_*` is only written together with a matching
//!   ledger event append (enforced by the engine call sites, asserted by
//!   the integration tests).
//! - `ledger_events` rows are inserted, never updated or deleted.

use chrono::NaiveDate;
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::core_types::{BatchId, OrgId, ProductId, UnitId};

use super::error::LedgerError;
use super::models::{
    ActionKind, AdministrationRecord, InventoryUnit, LedgerEvent, NewLedgerEvent, OwnerKind,
    OwnerRef, ProductionBatch, TransferBatch, UnitStatus,
};

const UNIT_COLUMNS: &str =
    "unit_id, unit_code, batch_id, product_id, owner_type, owner_id, status, created_at";

const EVENT_COLUMNS: &str = "event_id, unit_id, action, from_owner_type, from_owner_id, \
     to_owner_type, to_owner_id, transfer_id, production_batch_id, administration_id, \
     reversal, reversal_reason, created_at";

/// Custody state persistence operations
pub struct LedgerStore;

impl LedgerStore {
    /// Get one unit by ID
    pub async fn get_unit(pool: &PgPool, unit_id: UnitId) -> Result<Option<InventoryUnit>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units WHERE unit_id = $1"
        ))
        .bind(unit_id)
        .fetch_optional(pool)
        .await?;

        row.map(|r| unit_from_row(&r)).transpose()
    }

    /// Get one unit by its human-readable code
    pub async fn get_unit_by_code(
        pool: &PgPool,
        unit_code: &str,
    ) -> Result<Option<InventoryUnit>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units WHERE unit_code = $1"
        ))
        .bind(unit_code)
        .fetch_optional(pool)
        .await?;

        row.map(|r| unit_from_row(&r)).transpose()
    }

    /// List units held by an owner for one product, optionally restricted
    /// to a production batch, in FIFO order.
    pub async fn list_units_by_owner_and_product(
        pool: &PgPool,
        owner: OwnerRef,
        product_id: ProductId,
        lot_id: Option<BatchId>,
        status: Option<UnitStatus>,
    ) -> Result<Vec<InventoryUnit>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units
             WHERE owner_type = $1 AND owner_id = $2 AND product_id = $3
               AND ($4::bigint IS NULL OR batch_id = $4)
               AND ($5::smallint IS NULL OR status = $5)
             ORDER BY created_at ASC, unit_id ASC"
        ))
        .bind(owner.kind.id())
        .bind(owner.id)
        .bind(product_id)
        .bind(lot_id)
        .bind(status.map(|s| s.id()))
        .fetch_all(pool)
        .await?;

        rows.iter().map(unit_from_row).collect()
    }

    /// Reassign owner (and optionally status) for a set of units.
    ///
    /// One batch UPDATE; the caller appends the matching ledger events in
    /// the same transaction. Returns the number of rows changed so the
    /// engine can assert it equals the allocation size.
    pub async fn apply_ownership_change(
        conn: &mut PgConnection,
        unit_ids: &[UnitId],
        new_owner: OwnerRef,
        new_status: Option<UnitStatus>,
    ) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            "UPDATE inventory_units
             SET owner_type = $1, owner_id = $2, status = COALESCE($3::smallint, status)
             WHERE unit_id = ANY($4)",
        )
        .bind(new_owner.kind.id())
        .bind(new_owner.id)
        .bind(new_status.map(|s| s.id()))
        .bind(unit_ids)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark units with a new status without touching ownership (disposal).
    pub async fn apply_status_change(
        conn: &mut PgConnection,
        unit_ids: &[UnitId],
        new_status: UnitStatus,
    ) -> Result<u64, LedgerError> {
        let result = sqlx::query("UPDATE inventory_units SET status = $1 WHERE unit_id = ANY($2)")
            .bind(new_status.id())
            .bind(unit_ids)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Append ledger events. Insert-only; there is no update path.
    pub async fn append_events(
        conn: &mut PgConnection,
        events: &[NewLedgerEvent],
    ) -> Result<(), LedgerError> {
        for event in events {
            sqlx::query(
                "INSERT INTO ledger_events
                    (unit_id, action, from_owner_type, from_owner_id,
                     to_owner_type, to_owner_id, transfer_id, production_batch_id,
                     administration_id, reversal, reversal_reason)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(event.unit_id)
            .bind(event.action.id())
            .bind(event.from_owner.map(|o| o.kind.id()))
            .bind(event.from_owner.map(|o| o.id))
            .bind(event.to_owner.map(|o| o.kind.id()))
            .bind(event.to_owner.map(|o| o.id))
            .bind(event.transfer_id)
            .bind(event.production_batch_id)
            .bind(event.administration_id)
            .bind(event.reversal)
            .bind(event.reversal_reason.as_deref())
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Insert a production batch row
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_production_batch(
        conn: &mut PgConnection,
        batch_number: &str,
        manufacturer_id: OrgId,
        product_id: ProductId,
        quantity: i32,
        manufactured_on: NaiveDate,
        expires_on: NaiveDate,
    ) -> Result<BatchId, LedgerError> {
        let batch_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO production_batches
                (batch_number, manufacturer_id, product_id, quantity, manufactured_on, expires_on)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING batch_id",
        )
        .bind(batch_number)
        .bind(manufacturer_id)
        .bind(product_id)
        .bind(quantity)
        .bind(manufactured_on)
        .bind(expires_on)
        .fetch_one(conn)
        .await?;

        Ok(batch_id)
    }

    /// Bulk-create the units of a production batch, owned by the
    /// manufacturer, in one statement. Returns ids in code order.
    pub async fn insert_units(
        conn: &mut PgConnection,
        unit_codes: &[String],
        batch_id: BatchId,
        product_id: ProductId,
        owner: OwnerRef,
    ) -> Result<Vec<UnitId>, LedgerError> {
        let unit_ids = sqlx::query_scalar::<_, i64>(
            "INSERT INTO inventory_units (unit_code, batch_id, product_id, owner_type, owner_id, status)
             SELECT code, $2, $3, $4, $5, $6 FROM UNNEST($1::text[]) AS code
             RETURNING unit_id",
        )
        .bind(unit_codes)
        .bind(batch_id)
        .bind(product_id)
        .bind(owner.kind.id())
        .bind(owner.id)
        .bind(UnitStatus::Active.id())
        .fetch_all(conn)
        .await?;

        Ok(unit_ids)
    }

    /// Insert a transfer batch row
    pub async fn insert_transfer_batch(
        conn: &mut PgConnection,
        transfer_id: Uuid,
        source_org: OrgId,
        destination: OwnerRef,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO transfer_batches (transfer_id, source_org, dest_owner_type, dest_owner_id)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(transfer_id)
        .bind(source_org)
        .bind(destination.kind.id())
        .bind(destination.id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Insert an administration record row
    pub async fn insert_administration_record(
        conn: &mut PgConnection,
        administration_id: Uuid,
        hospital_org: OrgId,
        patient_id: i64,
        administered_on: NaiveDate,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO administration_records
                (administration_id, hospital_org, patient_id, administered_on)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(administration_id)
        .bind(hospital_org)
        .bind(patient_id)
        .bind(administered_on)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Get a transfer batch by ID
    pub async fn get_transfer<'e>(
        executor: impl sqlx::PgExecutor<'e>,
        transfer_id: Uuid,
    ) -> Result<Option<TransferBatch>, LedgerError> {
        let row = sqlx::query(
            "SELECT transfer_id, source_org, dest_owner_type, dest_owner_id,
                    created_at, reversed, reversed_at, reversal_reason
             FROM transfer_batches WHERE transfer_id = $1",
        )
        .bind(transfer_id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| transfer_from_row(&r)).transpose()
    }

    /// Get a transfer batch by ID, holding its row lock until the
    /// transaction ends. Used to serialize receipt confirmations.
    pub async fn lock_transfer(
        conn: &mut PgConnection,
        transfer_id: Uuid,
    ) -> Result<Option<TransferBatch>, LedgerError> {
        let row = sqlx::query(
            "SELECT transfer_id, source_org, dest_owner_type, dest_owner_id,
                    created_at, reversed, reversed_at, reversal_reason
             FROM transfer_batches WHERE transfer_id = $1
             FOR UPDATE",
        )
        .bind(transfer_id)
        .fetch_optional(conn)
        .await?;

        row.map(|r| transfer_from_row(&r)).transpose()
    }

    /// Load units by code, locking each row until the transaction ends.
    /// Missing codes are simply absent from the result; the caller decides
    /// whether that is an error.
    pub async fn lock_units_by_codes(
        conn: &mut PgConnection,
        unit_codes: &[String],
    ) -> Result<Vec<InventoryUnit>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units
             WHERE unit_code = ANY($1)
             ORDER BY created_at ASC, unit_id ASC
             FOR UPDATE",
        ))
        .bind(unit_codes)
        .fetch_all(conn)
        .await?;

        rows.iter().map(unit_from_row).collect()
    }

    /// Get an administration record by ID
    pub async fn get_administration<'e>(
        executor: impl sqlx::PgExecutor<'e>,
        administration_id: Uuid,
    ) -> Result<Option<AdministrationRecord>, LedgerError> {
        let row = sqlx::query(
            "SELECT administration_id, hospital_org, patient_id, administered_on,
                    created_at, reversed, reversed_at, reversal_reason
             FROM administration_records WHERE administration_id = $1",
        )
        .bind(administration_id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|r| AdministrationRecord {
            administration_id: r.get("administration_id"),
            hospital_org: r.get("hospital_org"),
            patient_id: r.get("patient_id"),
            administered_on: r.get("administered_on"),
            created_at: r.get("created_at"),
            reversed: r.get("reversed"),
            reversed_at: r.get("reversed_at"),
            reversal_reason: r.get("reversal_reason"),
        }))
    }

    /// Events of one action kind referencing a transfer batch
    pub async fn events_for_transfer<'e>(
        executor: impl sqlx::PgExecutor<'e>,
        transfer_id: Uuid,
        action: ActionKind,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM ledger_events
             WHERE transfer_id = $1 AND action = $2
             ORDER BY event_id ASC"
        ))
        .bind(transfer_id)
        .bind(action.id())
        .fetch_all(executor)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Events of one action kind referencing an administration record
    pub async fn events_for_administration<'e>(
        executor: impl sqlx::PgExecutor<'e>,
        administration_id: Uuid,
        action: ActionKind,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM ledger_events
             WHERE administration_id = $1 AND action = $2
             ORDER BY event_id ASC"
        ))
        .bind(administration_id)
        .bind(action.id())
        .fetch_all(executor)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Full event history of one unit, in append order
    pub async fn events_for_unit(
        pool: &PgPool,
        unit_id: UnitId,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM ledger_events
             WHERE unit_id = $1 ORDER BY event_id ASC"
        ))
        .bind(unit_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Load a production batch by (manufacturer, batch_number)
    pub async fn get_production_batch_by_number(
        pool: &PgPool,
        manufacturer_id: OrgId,
        batch_number: &str,
    ) -> Result<Option<ProductionBatch>, LedgerError> {
        let batch: Option<ProductionBatch> = sqlx::query_as(
            "SELECT batch_id, batch_number, manufacturer_id, product_id, quantity,
                    manufactured_on, expires_on, created_at
             FROM production_batches
             WHERE manufacturer_id = $1 AND batch_number = $2",
        )
        .bind(manufacturer_id)
        .bind(batch_number)
        .fetch_optional(pool)
        .await?;

        Ok(batch)
    }
}

/// Convert database row to InventoryUnit
fn unit_from_row(row: &PgRow) -> Result<InventoryUnit, LedgerError> {
    let owner_type: i16 = row.get("owner_type");
    let owner_kind = OwnerKind::from_id(owner_type)
        .ok_or_else(|| LedgerError::Corrupt(format!("Invalid owner_type: {}", owner_type)))?;

    let status_id: i16 = row.get("status");
    let status = UnitStatus::from_id(status_id)
        .ok_or_else(|| LedgerError::Corrupt(format!("Invalid unit status: {}", status_id)))?;

    Ok(InventoryUnit {
        unit_id: row.get("unit_id"),
        unit_code: row.get("unit_code"),
        batch_id: row.get("batch_id"),
        product_id: row.get("product_id"),
        owner: OwnerRef {
            kind: owner_kind,
            id: row.get("owner_id"),
        },
        status,
        created_at: row.get("created_at"),
    })
}

fn transfer_from_row(row: &PgRow) -> Result<TransferBatch, LedgerError> {
    let dest_type: i16 = row.get("dest_owner_type");
    let dest_kind = OwnerKind::from_id(dest_type)
        .ok_or_else(|| LedgerError::Corrupt(format!("Invalid dest_owner_type: {}", dest_type)))?;

    Ok(TransferBatch {
        transfer_id: row.get("transfer_id"),
        source_org: row.get("source_org"),
        destination: OwnerRef {
            kind: dest_kind,
            id: row.get("dest_owner_id"),
        },
        created_at: row.get("created_at"),
        reversed: row.get("reversed"),
        reversed_at: row.get("reversed_at"),
        reversal_reason: row.get("reversal_reason"),
    })
}

/// Convert database row to LedgerEvent
pub(crate) fn event_from_row(row: &PgRow) -> Result<LedgerEvent, LedgerError> {
    let action_id: i16 = row.get("action");
    let action = ActionKind::from_id(action_id)
        .ok_or_else(|| LedgerError::Corrupt(format!("Invalid action: {}", action_id)))?;

    Ok(LedgerEvent {
        event_id: row.get("event_id"),
        unit_id: row.get("unit_id"),
        action,
        from_owner: OwnerRef::from_columns(row.get("from_owner_type"), row.get("from_owner_id")),
        to_owner: OwnerRef::from_columns(row.get("to_owner_type"), row.get("to_owner_id")),
        transfer_id: row.get("transfer_id"),
        production_batch_id: row.get("production_batch_id"),
        administration_id: row.get("administration_id"),
        reversal: row.get("reversal"),
        reversal_reason: row.get("reversal_reason"),
        created_at: row.get("created_at"),
    })
}
