//! Unit allocator
//!
//! Selects concrete inventory units to satisfy a requested quantity.
//! Policy: oldest units first (`created_at ASC`), ties broken by
//! `unit_id ASC` so equal timestamps still allocate deterministically.
//! When no production batch is pinned, the ordering naturally exhausts the
//! oldest batch before touching the next.
//!
//! Concurrency contract: candidate rows are claimed with
//! `FOR UPDATE SKIP LOCKED` inside the caller's transaction. A row locked
//! by another in-flight allocation is excluded rather than waited on, so
//! two allocations against the same pool never select the same unit and
//! never deadlock each other. A shortfall fails the whole call; the
//! caller's rollback releases every claimed row.

use sqlx::postgres::PgConnection;
use thiserror::Error;

use crate::core_types::{BatchId, ProductId};
use crate::ledger::models::{InventoryUnit, OwnerRef, UnitStatus};

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

/// FIFO unit selection with non-blocking row claims
pub struct UnitAllocator;

impl UnitAllocator {
    /// Claim exactly `quantity` active units owned by `owner` for
    /// `product_id`, oldest first, or fail without claiming anything the
    /// caller gets to keep (rollback releases the locks).
    pub async fn allocate(
        conn: &mut PgConnection,
        owner: OwnerRef,
        product_id: ProductId,
        lot_id: Option<BatchId>,
        quantity: u32,
    ) -> Result<Vec<InventoryUnit>, AllocationError> {
        let rows = sqlx::query(
            "SELECT unit_id, unit_code, batch_id, product_id, owner_type, owner_id,
                    status, created_at
             FROM inventory_units
             WHERE owner_type = $1 AND owner_id = $2 AND product_id = $3
               AND status = $4
               AND ($5::bigint IS NULL OR batch_id = $5)
             ORDER BY created_at ASC, unit_id ASC
             LIMIT $6
             FOR UPDATE SKIP LOCKED",
        )
        .bind(owner.kind.id())
        .bind(owner.id)
        .bind(product_id)
        .bind(UnitStatus::Active.id())
        .bind(lot_id)
        .bind(i64::from(quantity))
        .fetch_all(&mut *conn)
        .await?;

        if rows.len() < quantity as usize {
            return Err(AllocationError::InsufficientInventory {
                requested: quantity,
                available: rows.len() as u32,
            });
        }

        rows.iter().map(unit_row).collect()
    }
}

fn unit_row(row: &sqlx::postgres::PgRow) -> Result<InventoryUnit, AllocationError> {
    use sqlx::Row;

    use crate::ledger::models::OwnerKind;

    let owner_type: i16 = row.get("owner_type");
    let status_id: i16 = row.get("status");

    let kind = OwnerKind::from_id(owner_type)
        .ok_or_else(|| AllocationError::Corrupt(format!("Invalid owner_type: {}", owner_type)))?;
    let status = UnitStatus::from_id(status_id)
        .ok_or_else(|| AllocationError::Corrupt(format!("Invalid unit status: {}", status_id)))?;

    Ok(InventoryUnit {
        unit_id: row.get("unit_id"),
        unit_code: row.get("unit_code"),
        batch_id: row.get("batch_id"),
        product_id: row.get("product_id"),
        owner: OwnerRef {
            kind,
            id: row.get("owner_id"),
        },
        status,
        created_at: row.get("created_at"),
    })
}
