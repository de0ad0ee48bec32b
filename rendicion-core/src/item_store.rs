//! ItemStore: the expense lines of one in-progress report.
//!
//! Items are kept in insertion order. A receipt group is every item sharing
//! `receipt_id`; an item without one is its own group keyed by its id.
//! Items are never edited in place: a correction is remove-group then re-add.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{CoreError, Result};

/// One line of spend evidence within a report draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub receipt_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

impl ExpenseItem {
    /// Key of the receipt group this item belongs to.
    pub fn group_key(&self) -> &str {
        self.receipt_id.as_deref().unwrap_or(&self.id)
    }

    /// Non-empty receipt number of an item that came from a scanned receipt.
    fn scanned_receipt_number(&self) -> Option<&str> {
        self.receipt_id.as_ref()?;
        self.receipt_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// A read-only view of one receipt group.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptGroup<'a> {
    pub key: &'a str,
    pub items: Vec<&'a ExpenseItem>,
}

impl ReceiptGroup<'_> {
    /// True if the group came from a scanned receipt.
    pub fn is_scanned(&self) -> bool {
        self.items.first().is_some_and(|i| i.receipt_id.is_some())
    }

    pub fn vendor(&self) -> Option<&str> {
        self.items.first().and_then(|i| i.vendor.as_deref())
    }

    pub fn receipt_number(&self) -> Option<&str> {
        self.items.first().and_then(|i| i.receipt_number.as_deref())
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(|i| i.amount).sum()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStore {
    items: Vec<ExpenseItem>,
    // sequence for manual item ids; persisted so a resumed draft never reuses one
    #[serde(default)]
    next_manual: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ExpenseItem] {
        &self.items
    }

    /// Append one ungrouped item typed in by the user.
    pub fn add_manual_item(
        &mut self,
        description: &str,
        amount: Decimal,
        receipt_number: Option<&str>,
    ) -> Result<ExpenseItem> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CoreError::validation("description must not be empty"));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount must be greater than 0"));
        }

        self.next_manual += 1;
        let mut id = format!("manual-{}", self.next_manual);
        while self.contains_id(&id) {
            self.next_manual += 1;
            id = format!("manual-{}", self.next_manual);
        }

        let item = ExpenseItem {
            id,
            description: description.to_string(),
            amount,
            receipt_image: None,
            receipt_id: None,
            vendor: None,
            receipt_number: receipt_number
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        };
        debug!(id = %item.id, amount = %item.amount, "manual item added");
        self.items.push(item.clone());
        Ok(item)
    }

    /// Append a batch of scanned items. The batch is checked as a whole first,
    /// so on error the store is left exactly as it was.
    pub fn add_scanned_items(&mut self, items: Vec<ExpenseItem>) -> Result<()> {
        let mut seen: HashSet<&str> = self.items.iter().map(|i| i.id.as_str()).collect();
        // receipt number -> the receipt group that owns it
        let mut owners: HashMap<&str, &str> = self
            .items
            .iter()
            .filter_map(|i| Some((i.scanned_receipt_number()?, i.group_key())))
            .collect();

        for item in &items {
            if item.id.trim().is_empty() {
                return Err(CoreError::validation("scanned item has an empty id"));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CoreError::validation(format!(
                    "duplicate item id in batch: {}",
                    item.id
                )));
            }
            if item.amount <= Decimal::ZERO {
                return Err(CoreError::validation(format!(
                    "scanned item {} has a non-positive amount",
                    item.id
                )));
            }
            if let Some(number) = item.scanned_receipt_number() {
                let owner = *owners.entry(number).or_insert(item.group_key());
                if owner != item.group_key() {
                    return Err(CoreError::validation(format!(
                        "receipt {number} is already recorded"
                    )));
                }
            }
        }

        debug!(count = items.len(), "scanned items added");
        self.items.extend(items);
        Ok(())
    }

    /// Remove every item of the group `key`. Returns how many were removed.
    pub fn remove_group(&mut self, key: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|i| i.group_key() != key);
        let removed = before - self.items.len();
        if removed > 0 {
            debug!(key, removed, "receipt group removed");
        }
        removed
    }

    /// Groups in first-seen key order; items keep insertion order within a group.
    pub fn grouped_view(&self) -> Vec<ReceiptGroup<'_>> {
        let mut groups: Vec<ReceiptGroup<'_>> = Vec::new();
        for item in &self.items {
            let key = item.group_key();
            match groups.iter_mut().find(|g| g.key == key) {
                Some(g) => g.items.push(item),
                None => groups.push(ReceiptGroup {
                    key,
                    items: vec![item],
                }),
            }
        }
        groups
    }

    /// Non-empty receipt numbers already in the draft.
    pub fn known_receipt_numbers(&self) -> HashSet<String> {
        self.items
            .iter()
            .filter_map(|i| i.receipt_number.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect()
    }

    /// Distinct receipt image references, first-seen order.
    pub fn receipt_images(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter_map(|i| i.receipt_image.as_deref())
            .filter(|img| seen.insert(*img))
            .map(String::from)
            .collect()
    }

    fn contains_id(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scanned(id: &str, receipt: &str, amount: Decimal) -> ExpenseItem {
        ExpenseItem {
            id: id.to_string(),
            description: format!("LINE {id}"),
            amount,
            receipt_image: Some(format!("img-{receipt}")),
            receipt_id: Some(receipt.to_string()),
            vendor: Some("Bodega".to_string()),
            receipt_number: Some(format!("001-{receipt}")),
        }
    }

    #[test]
    fn test_manual_add_rejects_empty_description() {
        let mut store = ItemStore::new();
        let err = store.add_manual_item("", dec!(10), None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_manual_add_rejects_non_positive_amount() {
        let mut store = ItemStore::new();
        assert!(store.add_manual_item("Pan", dec!(0), None).is_err());
        assert!(store.add_manual_item("Pan", dec!(-1.50), None).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_manual_items_are_singleton_groups() {
        let mut store = ItemStore::new();
        let a = store.add_manual_item("Pan", dec!(5), Some("  ")).unwrap();
        let b = store.add_manual_item("Leche", dec!(7.5), Some("B-9")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.receipt_number, None);
        assert_eq!(store.grouped_view().len(), 2);
        assert_eq!(
            store.known_receipt_numbers(),
            HashSet::from(["B-9".to_string()])
        );
    }

    #[test]
    fn test_grouped_view_keeps_first_seen_order() {
        let mut store = ItemStore::new();
        store
            .add_scanned_items(vec![
                scanned("r1-0", "r1", dec!(1)),
                scanned("r2-0", "r2", dec!(2)),
            ])
            .unwrap();
        store.add_manual_item("Pan", dec!(3), None).unwrap();
        store
            .add_scanned_items(vec![scanned("r1-1", "r1", dec!(4))])
            .unwrap();

        let groups = store.grouped_view();
        let keys: Vec<&str> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["r1", "r2", "manual-1"]);
        let r1: Vec<&str> = groups[0].items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(r1, vec!["r1-0", "r1-1"]);
        assert_eq!(groups[0].total(), dec!(5));
        assert!(groups[0].is_scanned());
        assert!(!groups[2].is_scanned());
    }

    #[test]
    fn test_scanned_batch_is_all_or_nothing() {
        let mut store = ItemStore::new();
        store
            .add_scanned_items(vec![scanned("r1-0", "r1", dec!(1))])
            .unwrap();
        let before = store.clone();

        let err = store.add_scanned_items(vec![
            scanned("r2-0", "r2", dec!(2)),
            scanned("r1-0", "r1", dec!(3)),
        ]);
        assert!(err.is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_receipt_number_belongs_to_one_scan() {
        let mut store = ItemStore::new();
        store
            .add_scanned_items(vec![scanned("a-0", "a", dec!(10))])
            .unwrap();

        let mut again = scanned("b-0", "b", dec!(10));
        again.receipt_number = Some("001-a".to_string());
        let before = store.clone();
        assert!(matches!(
            store.add_scanned_items(vec![scanned("c-0", "c", dec!(1)), again]),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(store, before);

        // two receipts in one batch cannot share a number either
        let mut twin = scanned("e-0", "e", dec!(2));
        twin.receipt_number = Some("001-d".to_string());
        assert!(store
            .add_scanned_items(vec![scanned("d-0", "d", dec!(1)), twin])
            .is_err());

        let groups = store.grouped_view();
        assert_eq!(
            groups.iter().filter(|g| g.receipt_number() == Some("001-a")).count(),
            1
        );
    }

    #[test]
    fn test_scanned_items_need_positive_amount() {
        let mut store = ItemStore::new();
        assert!(store
            .add_scanned_items(vec![scanned("r1-0", "r1", dec!(0))])
            .is_err());
        assert!(store
            .add_scanned_items(vec![scanned("r1-0", "r1", dec!(-3))])
            .is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_group_removes_whole_receipt() {
        let mut store = ItemStore::new();
        store
            .add_scanned_items(vec![
                scanned("r1-0", "r1", dec!(1)),
                scanned("r1-1", "r1", dec!(2)),
                scanned("r2-0", "r2", dec!(3)),
            ])
            .unwrap();

        assert_eq!(store.remove_group("r1"), 2);
        assert!(store.grouped_view().iter().all(|g| g.key != "r1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_missing_group_is_noop() {
        let mut store = ItemStore::new();
        store.add_manual_item("Pan", dec!(3), None).unwrap();
        let before = store.clone();
        assert_eq!(store.remove_group("nope"), 0);
        assert_eq!(store, before);
    }

    #[test]
    fn test_receipt_images_are_distinct() {
        let mut store = ItemStore::new();
        store
            .add_scanned_items(vec![
                scanned("r1-0", "r1", dec!(1)),
                scanned("r1-1", "r1", dec!(2)),
                scanned("r2-0", "r2", dec!(3)),
            ])
            .unwrap();
        store.add_manual_item("Pan", dec!(3), None).unwrap();
        assert_eq!(store.receipt_images(), vec!["img-r1", "img-r2"]);
    }

    #[test]
    fn test_manual_ids_survive_snapshot_roundtrip() {
        let mut store = ItemStore::new();
        store.add_manual_item("Pan", dec!(3), None).unwrap();
        let json = serde_json::to_string(&store).unwrap();
        let mut restored: ItemStore = serde_json::from_str(&json).unwrap();
        let next = restored.add_manual_item("Leche", dec!(4), None).unwrap();
        assert_eq!(next.id, "manual-2");
    }
}
