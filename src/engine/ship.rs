//! Ship: move allocated units to a destination organization
//!
//! Allocation, the transfer batch row, the ownership flip and the SHIPPED
//! events all commit together. A shortfall on any line aborts the whole
//! shipment; no units move.

use uuid::Uuid;

use crate::allocator::UnitAllocator;
use crate::ledger::{ActionKind, InventoryUnit, LedgerStore, NewLedgerEvent, OwnerRef};
use crate::validation::{self, Quantity};

use super::error::TransitionError;
use super::types::{ShipmentOutcome, ShipmentRequest};
use super::TransitionEngine;

impl TransitionEngine {
    pub async fn ship(&self, req: ShipmentRequest) -> Result<ShipmentOutcome, TransitionError> {
        let source_org = validation::require_id("source_org", req.source_org)?;
        let destination_org = validation::require_id("destination_org", req.destination_org)?;
        if source_org == destination_org {
            return Err(TransitionError::InvalidDestination(
                "source and destination are the same organization".to_string(),
            ));
        }
        if req.lines.is_empty() {
            return Err(validation::ValidationError::NoLineItems.into());
        }
        let mut quantities = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            validation::require_id("product_id", line.product_id)?;
            quantities.push(Quantity::new(line.quantity)?);
        }

        let source = OwnerRef::org(source_org);
        let destination = OwnerRef::org(destination_org);

        let mut tx = self.db().pool().begin().await?;

        // One allocator call per line, all inside this transaction, so
        // the claimed rows stay claimed until commit or rollback.
        let mut allocated: Vec<InventoryUnit> = Vec::new();
        for (line, quantity) in req.lines.iter().zip(quantities) {
            let units = UnitAllocator::allocate(
                &mut *tx,
                source,
                line.product_id,
                line.lot_id,
                quantity.get(),
            )
            .await?;
            allocated.extend(units);
        }

        let transfer_id = Uuid::new_v4();
        LedgerStore::insert_transfer_batch(&mut *tx, transfer_id, source_org, destination).await?;

        let unit_ids: Vec<i64> = allocated.iter().map(|u| u.unit_id).collect();
        let changed =
            LedgerStore::apply_ownership_change(&mut *tx, &unit_ids, destination, None).await?;
        debug_assert_eq!(changed as usize, unit_ids.len());

        let events: Vec<NewLedgerEvent> = allocated
            .iter()
            .map(|unit| NewLedgerEvent {
                unit_id: unit.unit_id,
                action: ActionKind::Shipped,
                from_owner: Some(source),
                to_owner: Some(destination),
                transfer_id: Some(transfer_id),
                production_batch_id: None,
                administration_id: None,
                reversal: false,
                reversal_reason: None,
            })
            .collect();

        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(
            %transfer_id,
            source_org,
            destination_org,
            unit_count = allocated.len(),
            "Shipment created"
        );

        Ok(ShipmentOutcome {
            transfer_id,
            unit_codes: allocated.into_iter().map(|u| u.unit_code).collect(),
        })
    }
}
