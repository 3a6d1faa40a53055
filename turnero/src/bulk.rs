//! Per-item reporting for bulk operations.
//!
//! Bulk operations never stop at the first failing item; every requested
//! item gets its own outcome.

use serde::Serialize;

/// Outcome of one item in a bulk request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport<K, O> {
    pub id: K,
    #[serde(flatten)]
    pub outcome: O,
}

/// Ordered list of item outcomes, in request order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport<K, O> {
    pub items: Vec<ItemReport<K, O>>,
}

impl<K, O> BulkReport<K, O> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, id: K, outcome: O) {
        self.items.push(ItemReport { id, outcome });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count items whose outcome matches the predicate
    pub fn count(&self, predicate: impl Fn(&O) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(&item.outcome)).count()
    }

    /// Outcome recorded for an id, if it was part of the request
    pub fn outcome_of(&self, id: &K) -> Option<&O>
    where
        K: PartialEq,
    {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| &item.outcome)
    }
}

impl<K, O> Default for BulkReport<K, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    #[serde(tag = "resultado", rename_all = "snake_case")]
    enum Outcome {
        Hecho,
        Rechazado { motivo: String },
    }

    #[test]
    fn test_report_keeps_request_order() {
        let mut report = BulkReport::new();
        report.push(3, Outcome::Hecho);
        report.push(1, Outcome::Rechazado { motivo: "x".into() });
        report.push(2, Outcome::Hecho);

        let ids: Vec<_> = report.items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(report.count(|o| *o == Outcome::Hecho), 2);
        assert_eq!(
            report.outcome_of(&1),
            Some(&Outcome::Rechazado { motivo: "x".into() })
        );
    }

    #[test]
    fn test_report_serializes_flat_items() {
        let mut report = BulkReport::new();
        report.push(7, Outcome::Rechazado { motivo: "ocupado".into() });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["id"], 7);
        assert_eq!(json["items"][0]["resultado"], "rechazado");
        assert_eq!(json["items"][0]["motivo"], "ocupado");
    }
}
