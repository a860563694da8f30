//! Receive: destination-side confirmation of a shipment
//!
//! Ownership already transferred at ship time; this appends one RECEIVED
//! event per shipped unit, copying the transfer reference, so the
//! destination's view of the ledger is symmetric. The transfer row is
//! locked for the duration of the transaction so two concurrent
//! confirmations cannot both append.

use uuid::Uuid;

use crate::ledger::{ActionKind, LedgerStore, NewLedgerEvent};

use super::error::TransitionError;
use super::TransitionEngine;

impl TransitionEngine {
    pub async fn confirm_receipt(&self, transfer_id: Uuid) -> Result<u32, TransitionError> {
        let mut tx = self.db().pool().begin().await?;

        let transfer = LedgerStore::lock_transfer(&mut *tx, transfer_id)
            .await?
            .ok_or_else(|| TransitionError::NotFound {
                entity: "transfer batch",
                id: transfer_id.to_string(),
            })?;

        let received =
            LedgerStore::events_for_transfer(&mut *tx, transfer_id, ActionKind::Received).await?;
        if !received.is_empty() {
            return Err(TransitionError::AlreadyReceived);
        }

        let shipped =
            LedgerStore::events_for_transfer(&mut *tx, transfer_id, ActionKind::Shipped).await?;

        let events: Vec<NewLedgerEvent> = shipped
            .iter()
            .map(|event| NewLedgerEvent {
                unit_id: event.unit_id,
                action: ActionKind::Received,
                from_owner: event.from_owner,
                to_owner: event.to_owner,
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
            destination = %transfer.destination,
            unit_count = events.len(),
            "Shipment receipt confirmed"
        );

        Ok(events.len() as u32)
    }
}
