//! Filters that a b-tree walk carries to prune pages and admit cells.

use super::RowId;
use crate::sql_value::SqlValue;

/// Ascending set of target row ids for a filtered table walk.
///
/// Table b-trees store cells in row-id order, so one forward cursor over
/// the targets is enough: targets the traversal has passed can never match
/// and are discarded as the cursor advances.
#[derive(Debug, Clone)]
pub struct RowIdFilter {
    targets: Vec<RowId>,
    pos: usize,
}

impl RowIdFilter {
    pub fn new(mut targets: Vec<RowId>) -> RowIdFilter {
        targets.sort_unstable();
        targets.dedup();
        RowIdFilter { targets, pos: 0 }
    }

    fn next_target(&self) -> Option<RowId> {
        self.targets.get(self.pos).copied()
    }

    /// True once every target has been matched or passed; the walk can stop.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.targets.len()
    }

    /// Whether a subtree whose row ids are all `<= max_row_id` could still
    /// contain a remaining target.
    pub fn subtree_can_match(&self, max_row_id: RowId) -> bool {
        match self.next_target() {
            Some(t) => t <= max_row_id,
            None => false,
        }
    }

    /// Decides one leaf cell, advancing past targets the traversal has
    /// overtaken.
    pub fn admit(&mut self, row_id: RowId) -> bool {
        while let Some(t) = self.next_target() {
            if t < row_id {
                self.pos += 1;
            } else if t == row_id {
                self.pos += 1;
                return true;
            } else {
                return false;
            }
        }
        false
    }
}

/// Equality filter for index walks: admits cells whose first key column
/// equals the literal.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    key: SqlValue,
}

impl KeyFilter {
    pub fn new(key: SqlValue) -> KeyFilter {
        KeyFilter { key }
    }

    pub fn matches(&self, first_key_column: &SqlValue) -> bool {
        self.key.loosely_equals(first_key_column)
    }
}

#[test]
fn test_row_id_filter_admit() {
    let mut f = RowIdFilter::new(vec![7, 3, 3, 12]);
    assert!(!f.admit(1));
    assert!(f.admit(3));
    assert!(!f.admit(4));
    assert!(f.admit(7));
    assert!(!f.is_exhausted());
    assert!(f.admit(12));
    assert!(f.is_exhausted());
    assert!(!f.admit(13));
}

#[test]
fn test_row_id_filter_discards_passed_targets() {
    // Target 5 does not exist in the tree; reaching row 6 discards it.
    let mut f = RowIdFilter::new(vec![5, 9]);
    assert!(!f.admit(6));
    assert!(!f.is_exhausted());
    assert!(f.admit(9));
    assert!(f.is_exhausted());
}

#[test]
fn test_row_id_filter_subtree_pruning() {
    let f = RowIdFilter::new(vec![100, 200]);
    assert!(!f.subtree_can_match(99));
    assert!(f.subtree_can_match(100));
    assert!(f.subtree_can_match(150));
    let empty = RowIdFilter::new(vec![]);
    assert!(!empty.subtree_can_match(1000));
}

#[test]
fn test_key_filter() {
    let f = KeyFilter::new(SqlValue::Text("Yellow".to_string()));
    assert!(f.matches(&SqlValue::Text("yellow".to_string())));
    assert!(!f.matches(&SqlValue::Text("green".to_string())));
    assert!(!f.matches(&SqlValue::Null));

    let n = KeyFilter::new(SqlValue::Int(42));
    assert!(n.matches(&SqlValue::Int(42)));
    assert!(!n.matches(&SqlValue::Int(41)));
}
