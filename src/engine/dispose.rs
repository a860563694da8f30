//! Dispose: write off units without changing ownership
//!
//! Units are never deleted; disposal is a terminal status plus a DISPOSED
//! event with no batch reference.

use crate::ledger::{ActionKind, LedgerStore, NewLedgerEvent, OwnerRef, UnitStatus};
use crate::validation;

use super::error::TransitionError;
use super::types::{DisposeOutcome, DisposeRequest};
use super::TransitionEngine;

impl TransitionEngine {
    pub async fn dispose(&self, req: DisposeRequest) -> Result<DisposeOutcome, TransitionError> {
        let owner_org = validation::require_id("owner_org", req.owner_org)?;
        if req.unit_codes.is_empty() {
            return Err(validation::ValidationError::NoLineItems.into());
        }
        let owner = OwnerRef::org(owner_org);

        let mut tx = self.db().pool().begin().await?;

        let units = LedgerStore::lock_units_by_codes(&mut *tx, &req.unit_codes).await?;

        if units.len() < req.unit_codes.len() {
            let found: std::collections::HashSet<&str> =
                units.iter().map(|u| u.unit_code.as_str()).collect();
            let missing = req
                .unit_codes
                .iter()
                .find(|code| !found.contains(code.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(TransitionError::NotFound {
                entity: "inventory unit",
                id: missing,
            });
        }

        for unit in &units {
            if unit.owner != owner {
                return Err(TransitionError::NotFound {
                    entity: "inventory unit",
                    id: unit.unit_code.clone(),
                });
            }
            if unit.status != UnitStatus::Active {
                return Err(TransitionError::InvalidUnitState {
                    unit_code: unit.unit_code.clone(),
                    status: unit.status.as_str(),
                });
            }
        }

        let unit_ids: Vec<i64> = units.iter().map(|u| u.unit_id).collect();
        LedgerStore::apply_status_change(&mut *tx, &unit_ids, UnitStatus::Disposed).await?;

        let events: Vec<NewLedgerEvent> = units
            .iter()
            .map(|unit| NewLedgerEvent::unreferenced(unit.unit_id, ActionKind::Disposed, owner))
            .collect();

        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(owner_org, unit_count = units.len(), "Units disposed");

        Ok(DisposeOutcome {
            disposed: units.len() as u32,
        })
    }
}
