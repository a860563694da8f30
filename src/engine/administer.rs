//! Administer: allocate units and hand custody to a patient
//!
//! Same shape as ship, but the destination owner is a patient and the
//! units leave inventory as CONSUMED.

use chrono::Utc;
use uuid::Uuid;

use crate::allocator::UnitAllocator;
use crate::ledger::{
    ActionKind, InventoryUnit, LedgerStore, NewLedgerEvent, OwnerRef, UnitStatus,
};
use crate::validation::{self, Quantity};

use super::error::TransitionError;
use super::types::{AdministerOutcome, AdministerRequest};
use super::TransitionEngine;

impl TransitionEngine {
    pub async fn administer(
        &self,
        req: AdministerRequest,
    ) -> Result<AdministerOutcome, TransitionError> {
        let hospital_org = validation::require_id("hospital_org", req.hospital_org)?;
        let patient_id = validation::require_id("patient_id", req.patient_id)?;
        if req.lines.is_empty() {
            return Err(validation::ValidationError::NoLineItems.into());
        }
        let mut quantities = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            validation::require_id("product_id", line.product_id)?;
            quantities.push(Quantity::new(line.quantity)?);
        }
        let administered_on = req
            .administered_on
            .unwrap_or_else(|| Utc::now().date_naive());

        let hospital = OwnerRef::org(hospital_org);
        let patient = OwnerRef::patient(patient_id);

        let mut tx = self.db().pool().begin().await?;

        let mut allocated: Vec<InventoryUnit> = Vec::new();
        for (line, quantity) in req.lines.iter().zip(quantities) {
            let units = UnitAllocator::allocate(
                &mut *tx,
                hospital,
                line.product_id,
                line.lot_id,
                quantity.get(),
            )
            .await?;
            allocated.extend(units);
        }

        let administration_id = Uuid::new_v4();
        LedgerStore::insert_administration_record(
            &mut *tx,
            administration_id,
            hospital_org,
            patient_id,
            administered_on,
        )
        .await?;

        let unit_ids: Vec<i64> = allocated.iter().map(|u| u.unit_id).collect();
        let changed = LedgerStore::apply_ownership_change(
            &mut *tx,
            &unit_ids,
            patient,
            Some(UnitStatus::Consumed),
        )
        .await?;
        debug_assert_eq!(changed as usize, unit_ids.len());

        let events: Vec<NewLedgerEvent> = allocated
            .iter()
            .map(|unit| NewLedgerEvent {
                unit_id: unit.unit_id,
                action: ActionKind::Administered,
                from_owner: Some(hospital),
                to_owner: Some(patient),
                transfer_id: None,
                production_batch_id: None,
                administration_id: Some(administration_id),
                reversal: false,
                reversal_reason: None,
            })
            .collect();

        LedgerStore::append_events(&mut *tx, &events).await?;

        tx.commit().await?;

        tracing::info!(
            %administration_id,
            hospital_org,
            patient_id,
            unit_count = allocated.len(),
            "Administration recorded"
        );

        Ok(AdministerOutcome {
            administration_id,
            unit_codes: allocated.into_iter().map(|u| u.unit_code).collect(),
        })
    }
}
