//! Sequential auto-linking: while enabled for a block, every newly drawn
//! shape is assigned the head of an ordered queue of still-unlinked units,
//! so an operator can walk a floor plan and draw unit after unit without
//! touching the link picker.

use std::cmp::Ordering;

use crate::io::Unit;
use crate::store::PlanStore;

/// Auto-link configuration. The queue itself is never stored: it is derived
/// on demand from (units, store), so it shrinks naturally as links land and
/// survives deletes/unlinks without bookkeeping.
#[derive(Default, Clone, Debug)]
pub struct AutoLink {
    group: Option<String>,
}

impl AutoLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable auto-linking for one block. Switching blocks never retroacts
    /// on links already made.
    pub fn enable(&mut self, block: &str) {
        self.group = Some(block.to_string());
    }

    pub fn disable(&mut self) {
        self.group = None;
    }

    pub fn enabled(&self) -> bool {
        self.group.is_some()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The ordered queue of units still waiting for a shape: unlinked units
    /// of the active block, floors ascending (no floor sorts first), then
    /// unit code in natural numeric order.
    pub fn queue<'a>(&self, units: &'a [Unit], store: &PlanStore) -> Vec<&'a Unit> {
        let Some(group) = self.group.as_deref() else {
            return Vec::new();
        };
        let mut queue: Vec<&Unit> = units
            .iter()
            .filter(|unit| unit.block == group && !store.is_unit_linked(&unit.id))
            .collect();
        queue.sort_by(|a, b| unit_order(a, b));
        queue
    }

    /// The unit the next drawn shape will be linked to, if any.
    pub fn peek_next<'a>(&self, units: &'a [Unit], store: &PlanStore) -> Option<&'a Unit> {
        self.queue(units, store).first().copied()
    }
}

/// Queue ordering: floor ascending with missing floors as the minimum, ties
/// broken by natural code order.
pub fn unit_order(a: &Unit, b: &Unit) -> Ordering {
    let floor_key = |unit: &Unit| match unit.floor {
        None => (0, 0),
        Some(f) => (1, f),
    };
    floor_key(a)
        .cmp(&floor_key(b))
        .then_with(|| natural_cmp(&a.code, &b.code))
}

/// Natural string comparison: digit runs compare as numbers, everything else
/// case-insensitively, so "A2" < "A10" and "b1" == "B1" as a sort key.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();
    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_number(&mut ca);
                    let nb = take_number(&mut cb);
                    match na.cmp(&nb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                let (lx, ly) = (
                    x.to_lowercase().next().unwrap_or(x),
                    y.to_lowercase().next().unwrap_or(y),
                );
                match lx.cmp(&ly) {
                    Ordering::Equal => {
                        ca.next();
                        cb.next();
                    }
                    other => return other,
                }
            }
        }
    }
}

/// Consume a run of ASCII digits as a number. Leading zeros collapse, so
/// "007" and "7" compare equal.
fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        value = value
            .saturating_mul(10)
            .saturating_add((c as u8 - b'0') as u64);
        chars.next();
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::unit;
    use crate::item::{DrawnItem, Point};

    #[test]
    fn natural_order_compares_digit_runs_numerically() {
        assert_eq!(natural_cmp("A2", "A10"), Ordering::Less);
        assert_eq!(natural_cmp("A10", "A2"), Ordering::Greater);
        assert_eq!(natural_cmp("007", "7"), Ordering::Equal);
        assert_eq!(natural_cmp("b1", "B1"), Ordering::Equal);
        assert_eq!(natural_cmp("T1-101", "T1-99"), Ordering::Greater);
    }

    #[test]
    fn missing_floor_sorts_as_minimum() {
        // Floors [2, null, 1], codes ["B", "A", "C"]: expect null, 1, 2.
        let units = vec![
            unit("u1", "B", "T1", Some(2)),
            unit("u2", "A", "T1", None),
            unit("u3", "C", "T1", Some(1)),
        ];
        let mut autolink = AutoLink::new();
        autolink.enable("T1");
        let store = PlanStore::new();
        let queue = autolink.queue(&units, &store);
        let ids: Vec<&str> = queue.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u3", "u1"]);
    }

    #[test]
    fn queue_shrinks_as_units_are_linked() {
        let units = vec![
            unit("u1", "101", "T1", Some(1)),
            unit("u2", "102", "T1", Some(1)),
        ];
        let mut autolink = AutoLink::new();
        autolink.enable("T1");

        let mut store = PlanStore::new();
        assert_eq!(
            autolink.peek_next(&units, &store).map(|u| u.id.as_str()),
            Some("u1")
        );

        let shape = store.add(DrawnItem::marker(Point::new(1.0, 1.0), 10.0));
        store.link(shape, "u1");
        assert_eq!(
            autolink.peek_next(&units, &store).map(|u| u.id.as_str()),
            Some("u2")
        );

        let shape2 = store.add(DrawnItem::marker(Point::new(2.0, 2.0), 10.0));
        store.link(shape2, "u2");
        assert_eq!(autolink.peek_next(&units, &store), None);
    }

    #[test]
    fn queue_is_scoped_to_the_active_block() {
        let units = vec![
            unit("u1", "101", "T1", Some(1)),
            unit("u2", "101", "T2", Some(1)),
        ];
        let mut autolink = AutoLink::new();
        autolink.enable("T2");
        let store = PlanStore::new();
        let queue = autolink.queue(&units, &store);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "u2");
    }

    #[test]
    fn disabled_autolink_has_empty_queue() {
        let units = vec![unit("u1", "101", "T1", Some(1))];
        let autolink = AutoLink::new();
        assert!(autolink.queue(&units, &PlanStore::new()).is_empty());
        assert!(!autolink.enabled());
    }
}
