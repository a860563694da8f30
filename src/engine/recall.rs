//! Recall: reverse a shipment or administration inside the window
//!
//! The guard's claim, the ownership restore and the RECALLED events commit
//! together. Each unit goes back to the owner recorded in the `from_owner`
//! of the original per-unit event; RECALLED events reference the original
//! transfer/administration id so history grouping resolves both directions
//! of the transaction to the same key.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::core_types::UnitId;
use crate::ledger::{
    ActionKind, LedgerError, LedgerEvent, LedgerStore, NewLedgerEvent, OwnerRef, UnitStatus,
};
use crate::validation;

use super::error::TransitionError;
use super::recall_guard::window_permits;
use super::TransitionEngine;

impl TransitionEngine {
    /// Reverse a shipment: every unit of the transfer goes back to its
    /// pre-shipment owner.
    pub async fn recall_shipment(
        &self,
        transfer_id: Uuid,
        reason: &str,
    ) -> Result<(), TransitionError> {
        let reason = validation::require_text("reason", reason, 256)?;

        // Request-time screen; the guard re-checks inside the reversal
        // transaction.
        let transfer = LedgerStore::get_transfer(self.db().pool(), transfer_id)
            .await?
            .ok_or_else(|| TransitionError::NotFound {
                entity: "transfer batch",
                id: transfer_id.to_string(),
            })?;
        if transfer.reversed {
            return Err(TransitionError::AlreadyRecalled);
        }
        if !window_permits(transfer.created_at, Utc::now(), self.recall_guard().window()) {
            return Err(TransitionError::RecallWindowExpired);
        }

        let mut tx = self.db().pool().begin().await?;

        self.recall_guard()
            .admit_transfer(&mut *tx, transfer_id, &reason)
            .await?;

        let shipped =
            LedgerStore::events_for_transfer(&mut *tx, transfer_id, ActionKind::Shipped).await?;

        restore_prior_owners(&mut tx, &shipped, None).await?;

        let events = reversal_events(&shipped, &reason)?;
        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(%transfer_id, unit_count = shipped.len(), "Shipment recalled");
        Ok(())
    }

    /// Reverse an administration: units return to the hospital and become
    /// ACTIVE again.
    pub async fn recall_administration(
        &self,
        administration_id: Uuid,
        reason: &str,
    ) -> Result<(), TransitionError> {
        let reason = validation::require_text("reason", reason, 256)?;

        let record = LedgerStore::get_administration(self.db().pool(), administration_id)
            .await?
            .ok_or_else(|| TransitionError::NotFound {
                entity: "administration record",
                id: administration_id.to_string(),
            })?;
        if record.reversed {
            return Err(TransitionError::AlreadyRecalled);
        }
        if !window_permits(record.created_at, Utc::now(), self.recall_guard().window()) {
            return Err(TransitionError::RecallWindowExpired);
        }

        let mut tx = self.db().pool().begin().await?;

        self.recall_guard()
            .admit_administration(&mut *tx, administration_id, &reason)
            .await?;

        let administered = LedgerStore::events_for_administration(
            &mut *tx,
            administration_id,
            ActionKind::Administered,
        )
        .await?;

        restore_prior_owners(&mut tx, &administered, Some(UnitStatus::Active)).await?;

        let events = reversal_events(&administered, &reason)?;
        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(%administration_id, unit_count = administered.len(), "Administration recalled");
        Ok(())
    }
}

/// Put every unit back under the owner its original event recorded as
/// `from_owner`. Units are grouped per prior owner so the restore is one
/// UPDATE per distinct owner (in practice: one).
async fn restore_prior_owners(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    originals: &[LedgerEvent],
    restore_status: Option<UnitStatus>,
) -> Result<(), TransitionError> {
    let mut groups: HashMap<OwnerRef, Vec<UnitId>> = HashMap::new();
    for event in originals {
        let prior = event.from_owner.ok_or_else(|| {
            LedgerError::Corrupt(format!(
                "event {} has no from_owner to restore",
                event.event_id
            ))
        })?;
        groups.entry(prior).or_default().push(event.unit_id);
    }

    for (owner, unit_ids) in groups {
        LedgerStore::apply_ownership_change(&mut *tx, &unit_ids, owner, restore_status).await?;
    }

    Ok(())
}

/// One RECALLED event per original event, flagged as a reversal and
/// pointing at the original batch reference.
fn reversal_events(
    originals: &[LedgerEvent],
    reason: &str,
) -> Result<Vec<NewLedgerEvent>, TransitionError> {
    originals
        .iter()
        .map(|event| {
            let prior = event.from_owner.ok_or_else(|| {
                LedgerError::Corrupt(format!(
                    "event {} has no from_owner to restore",
                    event.event_id
                ))
            })?;
            Ok(NewLedgerEvent {
                unit_id: event.unit_id,
                action: ActionKind::Recalled,
                from_owner: event.to_owner,
                to_owner: Some(prior),
                transfer_id: event.transfer_id,
                production_batch_id: None,
                administration_id: event.administration_id,
                reversal: true,
                reversal_reason: Some(reason.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn shipped_event(event_id: i64, unit_id: i64, transfer_id: Uuid) -> LedgerEvent {
        LedgerEvent {
            event_id,
            unit_id,
            action: ActionKind::Shipped,
            from_owner: Some(OwnerRef::org(1)),
            to_owner: Some(OwnerRef::org(2)),
            transfer_id: Some(transfer_id),
            production_batch_id: None,
            administration_id: None,
            reversal: false,
            reversal_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reversal_events_swap_owners_and_keep_reference() {
        let transfer_id = Uuid::new_v4();
        let originals = vec![
            shipped_event(10, 100, transfer_id),
            shipped_event(11, 101, transfer_id),
        ];

        let events = reversal_events(&originals, "wrong destination").unwrap();
        assert_eq!(events.len(), 2);
        for (event, original) in events.iter().zip(&originals) {
            assert_eq!(event.action, ActionKind::Recalled);
            assert_eq!(event.unit_id, original.unit_id);
            assert_eq!(event.from_owner, Some(OwnerRef::org(2)));
            assert_eq!(event.to_owner, Some(OwnerRef::org(1)));
            assert_eq!(event.transfer_id, Some(transfer_id));
            assert!(event.reversal);
            assert_eq!(event.reversal_reason.as_deref(), Some("wrong destination"));
        }
    }

    #[test]
    fn reversal_events_reject_missing_prior_owner() {
        let mut event = shipped_event(10, 100, Uuid::new_v4());
        event.from_owner = None;
        assert!(reversal_events(&[event], "reason").is_err());
    }
}
