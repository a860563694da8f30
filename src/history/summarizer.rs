//! Page fetch and grouping
//!
//! The page query is keyset-paginated: cost is proportional to page size,
//! not to how deep the caller has scrolled, and the result set does not
//! drift when new events are appended between fetches. Grouping and the
//! per-group product detail are computed from the fetched page in one
//! pass, with no second query.

use std::collections::HashMap;

use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::core_types::ProductId;
use crate::ledger::models::{ActionKind, LedgerEvent, OwnerRef};

use super::types::{
    Cursor, GroupKey, HistoryPage, HistoryQuery, ProductDetail, SummaryRow, MAX_PAGE_SIZE,
};
use super::HistoryError;

/// One ledger event joined with the unit columns the summary needs
#[derive(Debug, Clone)]
pub struct PagedEvent {
    pub event: LedgerEvent,
    pub product_id: ProductId,
    pub unit_code: String,
}

/// Pure read path over the ledger
pub struct HistorySummarizer;

impl HistorySummarizer {
    /// Fetch one page of events and collapse it into grouped summary rows.
    pub async fn history(
        pool: &PgPool,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, HistoryError> {
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

        let (events, has_more) = Self::fetch_page(pool, query, page_size).await?;

        let next_cursor = events.last().map(|paged| {
            Cursor {
                created_at: paged.event.created_at,
                event_id: paged.event.event_id,
            }
            .encode()
        });

        Ok(HistoryPage {
            groups: group_events(&events),
            next_cursor,
            has_more,
        })
    }

    /// Keyset page fetch: events strictly after the cursor position in
    /// `(created_at DESC, event_id DESC)` order. Fetches one extra row to
    /// learn whether a further page exists.
    async fn fetch_page(
        pool: &PgPool,
        query: &HistoryQuery,
        page_size: u32,
    ) -> Result<(Vec<PagedEvent>, bool), HistoryError> {
        let actions: Option<Vec<i16>> = query
            .actions
            .as_ref()
            .map(|kinds| kinds.iter().map(|k| k.id()).collect());

        let rows = sqlx::query(
            "SELECT e.event_id, e.unit_id, e.action,
                    e.from_owner_type, e.from_owner_id, e.to_owner_type, e.to_owner_id,
                    e.transfer_id, e.production_batch_id, e.administration_id,
                    e.reversal, e.reversal_reason, e.created_at,
                    u.product_id, u.unit_code
             FROM ledger_events e
             JOIN inventory_units u ON u.unit_id = e.unit_id
             WHERE ((e.from_owner_type = $1 AND e.from_owner_id = $2)
                 OR (e.to_owner_type = $1 AND e.to_owner_id = $2))
               AND ($3::smallint[] IS NULL OR e.action = ANY($3))
               AND ($4::timestamptz IS NULL OR e.created_at >= $4)
               AND ($5::timestamptz IS NULL OR e.created_at <= $5)
               AND ($6::timestamptz IS NULL OR (e.created_at, e.event_id) < ($6, $7))
             ORDER BY e.created_at DESC, e.event_id DESC
             LIMIT $8",
        )
        .bind(query.owner.kind.id())
        .bind(query.owner.id)
        .bind(actions)
        .bind(query.from)
        .bind(query.to)
        .bind(query.cursor.map(|c| c.created_at))
        .bind(query.cursor.map(|c| c.event_id))
        .bind(i64::from(page_size) + 1)
        .fetch_all(pool)
        .await?;

        let mut events = rows
            .iter()
            .map(paged_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let has_more = events.len() > page_size as usize;
        events.truncate(page_size as usize);

        Ok((events, has_more))
    }
}

/// Collapse per-unit events into one row per derived group key, preserving
/// page order (groups appear in order of their newest event).
pub fn group_events(events: &[PagedEvent]) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for paged in events {
        let event = &paged.event;
        let key = GroupKey::derive(event);

        let position = *index.entry(key).or_insert_with(|| {
            rows.push(SummaryRow {
                group_key: key.to_string(),
                action: event.action,
                transfer_id: event.transfer_id,
                production_batch_id: event.production_batch_id,
                administration_id: event.administration_id,
                from_owner: event.from_owner,
                to_owner: event.to_owner,
                reversal: event.reversal,
                occurred_at: event.created_at,
                total_quantity: 0,
                products: Vec::new(),
            });
            rows.len() - 1
        });

        let row = &mut rows[position];
        row.total_quantity += 1;
        match row
            .products
            .iter_mut()
            .find(|p| p.product_id == paged.product_id)
        {
            Some(detail) => {
                detail.quantity += 1;
                detail.unit_codes.push(paged.unit_code.clone());
            }
            None => row.products.push(ProductDetail {
                product_id: paged.product_id,
                quantity: 1,
                unit_codes: vec![paged.unit_code.clone()],
            }),
        }
    }

    rows
}

fn paged_event_from_row(row: &sqlx::postgres::PgRow) -> Result<PagedEvent, HistoryError> {
    let action_id: i16 = row.get("action");
    let action = ActionKind::from_id(action_id)
        .ok_or_else(|| HistoryError::Corrupt(format!("Invalid action: {}", action_id)))?;

    Ok(PagedEvent {
        event: LedgerEvent {
            event_id: row.get("event_id"),
            unit_id: row.get("unit_id"),
            action,
            from_owner: OwnerRef::from_columns(
                row.get("from_owner_type"),
                row.get("from_owner_id"),
            ),
            to_owner: OwnerRef::from_columns(row.get("to_owner_type"), row.get("to_owner_id")),
            transfer_id: row.get("transfer_id"),
            production_batch_id: row.get("production_batch_id"),
            administration_id: row.get("administration_id"),
            reversal: row.get("reversal"),
            reversal_reason: row.get("reversal_reason"),
            created_at: row.get("created_at"),
        },
        product_id: row.get("product_id"),
        unit_code: row.get("unit_code"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn paged(
        event_id: i64,
        action: ActionKind,
        transfer_id: Option<Uuid>,
        product_id: i64,
        unit_code: &str,
        at: chrono::DateTime<Utc>,
    ) -> PagedEvent {
        PagedEvent {
            event: LedgerEvent {
                event_id,
                unit_id: event_id,
                action,
                from_owner: Some(OwnerRef::org(1)),
                to_owner: Some(OwnerRef::org(2)),
                transfer_id,
                production_batch_id: None,
                administration_id: None,
                reversal: action == ActionKind::Recalled,
                reversal_reason: None,
                created_at: at,
            },
            product_id,
            unit_code: unit_code.to_string(),
        }
    }

    #[test]
    fn one_shipment_two_products_collapses_to_one_group() {
        let transfer = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let events = vec![
            paged(5, ActionKind::Shipped, Some(transfer), 100, "MD-A-00005", at),
            paged(4, ActionKind::Shipped, Some(transfer), 100, "MD-A-00004", at),
            paged(3, ActionKind::Shipped, Some(transfer), 100, "MD-A-00003", at),
            paged(2, ActionKind::Shipped, Some(transfer), 200, "MD-B-00002", at),
            paged(1, ActionKind::Shipped, Some(transfer), 200, "MD-B-00001", at),
        ];

        let groups = group_events(&events);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.total_quantity, 5);
        assert_eq!(group.transfer_id, Some(transfer));
        assert_eq!(group.products.len(), 2);

        let a = group.products.iter().find(|p| p.product_id == 100).unwrap();
        let b = group.products.iter().find(|p| p.product_id == 200).unwrap();
        assert_eq!(a.quantity, 3);
        assert_eq!(b.quantity, 2);
        assert_eq!(a.unit_codes.len(), 3);
        assert_eq!(b.unit_codes.len(), 2);
    }

    #[test]
    fn shipment_and_recall_of_same_transfer_stay_separate() {
        let transfer = Uuid::new_v4();
        let shipped_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let recalled_at = shipped_at + Duration::hours(2);

        let events = vec![
            paged(4, ActionKind::Recalled, Some(transfer), 100, "MD-A-00001", recalled_at),
            paged(3, ActionKind::Recalled, Some(transfer), 100, "MD-A-00002", recalled_at),
            paged(2, ActionKind::Shipped, Some(transfer), 100, "MD-A-00001", shipped_at),
            paged(1, ActionKind::Shipped, Some(transfer), 100, "MD-A-00002", shipped_at),
        ];

        let groups = group_events(&events);
        assert_eq!(groups.len(), 2);
        // newest-first: the recall group leads
        assert_eq!(groups[0].action, ActionKind::Recalled);
        assert!(groups[0].reversal);
        assert_eq!(groups[1].action, ActionKind::Shipped);
        // both resolve to the same transfer reference
        assert_eq!(groups[0].transfer_id, groups[1].transfer_id);
    }

    #[test]
    fn groups_preserve_newest_first_page_order() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let newer = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let events = vec![
            paged(10, ActionKind::Shipped, Some(t2), 100, "MD-X-00010", newer),
            paged(2, ActionKind::Shipped, Some(t1), 100, "MD-X-00002", older),
            paged(1, ActionKind::Shipped, Some(t1), 100, "MD-X-00001", older),
        ];

        let groups = group_events(&events);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].transfer_id, Some(t2));
        assert_eq!(groups[1].transfer_id, Some(t1));
        assert_eq!(groups[1].total_quantity, 2);
    }

    #[test]
    fn empty_page_groups_to_nothing() {
        assert!(group_events(&[]).is_empty());
    }
}
