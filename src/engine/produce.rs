//! Produce: register a production batch and create its units
//!
//! The batch row, its N units and the N PRODUCED events commit together;
//! a partial batch is never visible.

use crate::ledger::{ActionKind, LedgerStore, NewLedgerEvent, OwnerRef};
use crate::sequence::{format_batch_number, format_unit_code};
use crate::validation::{self, Quantity};

use super::error::{TransitionError, is_unique_violation};
use super::types::{ProduceOutcome, ProduceRequest};
use super::TransitionEngine;

impl TransitionEngine {
    pub async fn produce(&self, req: ProduceRequest) -> Result<ProduceOutcome, TransitionError> {
        let manufacturer_id = validation::require_id("manufacturer_id", req.manufacturer_id)?;
        validation::require_id("product_id", req.product_id)?;
        let quantity = Quantity::new(req.quantity)?;
        if req.expires_on <= req.manufactured_on {
            return Err(validation::ValidationError::ExpiryBeforeManufacture.into());
        }

        let seq = self.sequencer().next(manufacturer_id).await?;
        let batch_number = format_batch_number(manufacturer_id, seq);
        let owner = OwnerRef::org(manufacturer_id);

        let mut tx = self.db().pool().begin().await?;

        let batch_id = LedgerStore::insert_production_batch(
            &mut *tx,
            &batch_number,
            manufacturer_id,
            req.product_id,
            quantity.get() as i32,
            req.manufactured_on,
            req.expires_on,
        )
        .await
        .map_err(|e| match e {
            crate::ledger::LedgerError::Database(db) if is_unique_violation(&db) => {
                TransitionError::DuplicateBatch {
                    batch_number: batch_number.clone(),
                }
            }
            other => other.into(),
        })?;

        let unit_codes: Vec<String> = (1..=quantity.get())
            .map(|ordinal| format_unit_code(&batch_number, ordinal))
            .collect();

        let unit_ids =
            LedgerStore::insert_units(&mut *tx, &unit_codes, batch_id, req.product_id, owner)
                .await?;

        let events: Vec<NewLedgerEvent> = unit_ids
            .iter()
            .map(|&unit_id| NewLedgerEvent {
                unit_id,
                action: ActionKind::Produced,
                from_owner: None,
                to_owner: Some(owner),
                transfer_id: None,
                production_batch_id: Some(batch_id),
                administration_id: None,
                reversal: false,
                reversal_reason: None,
            })
            .collect();

        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(
            batch_number = %batch_number,
            manufacturer_id,
            unit_count = quantity.get(),
            "Production batch registered"
        );

        Ok(ProduceOutcome {
            batch_id,
            batch_number,
            unit_count: quantity.get(),
        })
    }
}
