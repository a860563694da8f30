//! History query, cursor and summary types

use std::fmt;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core_types::{BatchId, EventId, ProductId};
use crate::ledger::models::{ActionKind, LedgerEvent, OwnerRef};

use super::HistoryError;

/// Hard cap on page size; requests above it are clamped, not rejected.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Stable pagination position: the sort key of the last returned event.
///
/// A value, not a row count: concurrent appends shift no pages and
/// re-reading the same cursor never skips or duplicates events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub event_id: EventId,
}

impl Cursor {
    /// Opaque wire form: `<rfc3339-micros>|<event_id>`
    pub fn encode(&self) -> String {
        format!(
            "{}|{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.event_id
        )
    }

    pub fn decode(s: &str) -> Result<Self, HistoryError> {
        let (ts, id) = s
            .split_once('|')
            .ok_or_else(|| HistoryError::InvalidCursor(s.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| HistoryError::InvalidCursor(s.to_string()))?
            .with_timezone(&Utc);
        let event_id = id
            .parse::<EventId>()
            .map_err(|_| HistoryError::InvalidCursor(s.to_string()))?;
        Ok(Self {
            created_at,
            event_id,
        })
    }
}

/// History page request
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Owner whose ledger participation (as prior or new owner) is shown
    pub owner: OwnerRef,
    /// Restrict to these action kinds; `None` means all
    pub actions: Option<Vec<ActionKind>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page_size: u32,
    pub cursor: Option<Cursor>,
}

/// Batch reference part of a group key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRef {
    Transfer(Uuid),
    Production(BatchId),
    Administration(Uuid),
    /// Disposal events carry no batch reference; same-minute events with
    /// the same owners are bucketed together. This is a heuristic, not an
    /// identity: distinct bulk disposals in one minute merge, and one
    /// disposal straddling a minute boundary splits.
    Bucket {
        minute: DateTime<Utc>,
        from_owner: Option<OwnerRef>,
        to_owner: Option<OwnerRef>,
    },
}

/// Derived identity that collapses per-unit events into one summary row.
///
/// The action kind is part of the key: a shipment and its later recall
/// share a transfer reference but are distinct transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub action: ActionKind,
    pub group_ref: GroupRef,
}

impl GroupKey {
    /// Reference priority: transfer, then production batch, then
    /// administration record, then the minute bucket fallback.
    pub fn derive(event: &LedgerEvent) -> Self {
        let group_ref = if let Some(transfer_id) = event.transfer_id {
            GroupRef::Transfer(transfer_id)
        } else if let Some(batch_id) = event.production_batch_id {
            GroupRef::Production(batch_id)
        } else if let Some(administration_id) = event.administration_id {
            GroupRef::Administration(administration_id)
        } else {
            GroupRef::Bucket {
                minute: truncate_to_minute(event.created_at),
                from_owner: event.from_owner,
                to_owner: event.to_owner,
            }
        };

        Self {
            action: event.action,
            group_ref,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group_ref {
            GroupRef::Transfer(id) => write!(f, "{}:transfer:{}", self.action, id),
            GroupRef::Production(id) => write!(f, "{}:production:{}", self.action, id),
            GroupRef::Administration(id) => write!(f, "{}:administration:{}", self.action, id),
            GroupRef::Bucket {
                minute,
                from_owner,
                to_owner,
            } => {
                let fmt_owner = |o: &Option<OwnerRef>| {
                    o.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string())
                };
                write!(
                    f,
                    "{}:bucket:{}:{}:{}",
                    self.action,
                    minute.to_rfc3339_opts(SecondsFormat::Secs, true),
                    fmt_owner(from_owner),
                    fmt_owner(to_owner)
                )
            }
        }
    }
}

pub(crate) fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Per-product aggregate inside one group
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_codes: Vec<String>,
}

/// One grouped transaction
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SummaryRow {
    pub group_key: String,
    pub action: ActionKind,
    pub transfer_id: Option<Uuid>,
    pub production_batch_id: Option<BatchId>,
    pub administration_id: Option<Uuid>,
    pub from_owner: Option<OwnerRef>,
    pub to_owner: Option<OwnerRef>,
    pub reversal: bool,
    /// Newest event timestamp in the group
    pub occurred_at: DateTime<Utc>,
    pub total_quantity: u32,
    pub products: Vec<ProductDetail>,
}

/// One page of grouped history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryPage {
    pub groups: Vec<SummaryRow>,
    /// Pass back to continue; `None` on an empty page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_at(ts: DateTime<Utc>) -> LedgerEvent {
        LedgerEvent {
            event_id: 1,
            unit_id: 1,
            action: ActionKind::Disposed,
            from_owner: Some(OwnerRef::org(1)),
            to_owner: Some(OwnerRef::org(1)),
            transfer_id: None,
            production_batch_id: None,
            administration_id: None,
            reversal: false,
            reversal_reason: None,
            created_at: ts,
        }
    }

    #[test]
    fn cursor_round_trip() {
        let cursor = Cursor {
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 45).unwrap()
                + chrono::Duration::microseconds(123456),
            event_id: 9812,
        };
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn cursor_decode_rejects_garbage() {
        assert!(Cursor::decode("not-a-cursor").is_err());
        assert!(Cursor::decode("2026-03-01T00:00:00Z|not-a-number").is_err());
        assert!(Cursor::decode("not-a-date|12").is_err());
    }

    #[test]
    fn group_key_prefers_transfer_reference() {
        let mut event = event_at(Utc::now());
        let transfer = Uuid::new_v4();
        let administration = Uuid::new_v4();
        event.transfer_id = Some(transfer);
        event.production_batch_id = Some(55);
        event.administration_id = Some(administration);

        assert_eq!(
            GroupKey::derive(&event).group_ref,
            GroupRef::Transfer(transfer)
        );

        event.transfer_id = None;
        assert_eq!(GroupKey::derive(&event).group_ref, GroupRef::Production(55));

        event.production_batch_id = None;
        assert_eq!(
            GroupKey::derive(&event).group_ref,
            GroupRef::Administration(administration)
        );
    }

    #[test]
    fn same_reference_different_action_is_a_different_group() {
        let transfer = Uuid::new_v4();
        let mut shipped = event_at(Utc::now());
        shipped.action = ActionKind::Shipped;
        shipped.transfer_id = Some(transfer);
        let mut recalled = shipped.clone();
        recalled.action = ActionKind::Recalled;

        assert_ne!(GroupKey::derive(&shipped), GroupKey::derive(&recalled));
    }

    #[test]
    fn disposal_fallback_buckets_by_minute() {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 10).unwrap();
        let same_minute = base + chrono::Duration::seconds(40);
        let next_minute = base + chrono::Duration::seconds(55);

        assert_eq!(
            GroupKey::derive(&event_at(base)),
            GroupKey::derive(&event_at(same_minute))
        );
        // 12:30:10 + 55s = 12:31:05 -> different bucket
        assert_ne!(
            GroupKey::derive(&event_at(base)),
            GroupKey::derive(&event_at(next_minute))
        );
    }

    #[test]
    fn disposal_fallback_separates_owners() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 10).unwrap();
        let mine = event_at(ts);
        let mut theirs = event_at(ts);
        theirs.from_owner = Some(OwnerRef::org(2));
        theirs.to_owner = Some(OwnerRef::org(2));

        assert_ne!(GroupKey::derive(&mine), GroupKey::derive(&theirs));
    }
}
