use crate::item::Item;
use serde::Serialize;
use std::collections::BTreeMap;

/// Quantities closer to zero than this are treated as zero when deciding
/// whether a ledger is in surplus or deficit.
pub const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by stack arithmetic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error("cannot combine stacks of different items: '{left}' and '{right}'")]
    ItemMismatch { left: String, right: String },
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// A signed quantity of one item. Negative quantities represent consumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stack {
    pub item: Item,
    pub quantity: f64,
}

impl Stack {
    pub fn new(item: Item, quantity: f64) -> Self {
        Self { item, quantity }
    }

    fn check_same_item(&self, other: &Stack) -> Result<(), StackError> {
        if self.item == other.item {
            Ok(())
        } else {
            Err(StackError::ItemMismatch {
                left: self.item.id().to_string(),
                right: other.item.id().to_string(),
            })
        }
    }

    pub fn add(&self, other: &Stack) -> Result<Stack, StackError> {
        self.check_same_item(other)?;
        Ok(Stack::new(self.item.clone(), self.quantity + other.quantity))
    }

    pub fn sub(&self, other: &Stack) -> Result<Stack, StackError> {
        self.check_same_item(other)?;
        Ok(Stack::new(self.item.clone(), self.quantity - other.quantity))
    }

    pub fn mul(&self, factor: f64) -> Stack {
        Stack::new(self.item.clone(), self.quantity * factor)
    }

    pub fn div(&self, divisor: f64) -> Stack {
        Stack::new(self.item.clone(), self.quantity / divisor)
    }

    pub fn pow(&self, exponent: f64) -> Stack {
        Stack::new(self.item.clone(), self.quantity.powf(exponent))
    }

    pub fn neg(&self) -> Stack {
        Stack::new(self.item.clone(), -self.quantity)
    }
}

/// Merge stacks that reference the same item, keeping first-seen order.
pub fn merge_stacks(stacks: Vec<Stack>) -> Vec<Stack> {
    let mut merged: Vec<Stack> = Vec::with_capacity(stacks.len());
    for stack in stacks {
        if let Some(existing) = merged.iter_mut().find(|s| s.item == stack.item) {
            existing.quantity += stack.quantity;
        } else {
            merged.push(stack);
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// StackSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Ledger {
    item: Item,
    entries: Vec<Stack>,
}

/// A per-item ledger of signed stack entries.
///
/// Entries are kept individually rather than folded into a running total so
/// that production (positive entries) and consumption (negative entries) can
/// be reported separately even when they net out. Ledgers are keyed by item
/// id; adding a stack for a different item that happens to share an id is a
/// [`StackError::ItemMismatch`].
#[derive(Debug, Clone, Default)]
pub struct StackSet {
    ledgers: BTreeMap<String, Ledger>,
}

impl StackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signed entry for the stack's item.
    pub fn add(&mut self, stack: Stack) -> Result<(), StackError> {
        match self.ledgers.get_mut(stack.item.id()) {
            Some(ledger) => {
                if ledger.item != stack.item {
                    return Err(StackError::ItemMismatch {
                        left: ledger.item.id().to_string(),
                        right: stack.item.id().to_string(),
                    });
                }
                ledger.entries.push(stack);
            }
            None => {
                self.ledgers.insert(
                    stack.item.id().to_string(),
                    Ledger {
                        item: stack.item.clone(),
                        entries: vec![stack],
                    },
                );
            }
        }
        Ok(())
    }

    /// Record the negation of `stack`.
    pub fn sub(&mut self, stack: Stack) -> Result<(), StackError> {
        self.add(stack.neg())
    }

    /// Add every entry of `other` to this set.
    pub fn extend(&mut self, other: &StackSet) -> Result<(), StackError> {
        for ledger in other.ledgers.values() {
            for entry in &ledger.entries {
                self.add(entry.clone())?;
            }
        }
        Ok(())
    }

    /// Net total of all entries for an item. Unknown items total zero.
    pub fn total(&self, item_id: &str) -> f64 {
        self.entries(item_id).iter().map(|s| s.quantity).sum()
    }

    /// Sum of the positive entries for an item (what was produced).
    pub fn total_positive(&self, item_id: &str) -> f64 {
        self.entries(item_id)
            .iter()
            .map(|s| s.quantity)
            .filter(|q| *q > 0.0)
            .sum()
    }

    /// Sum of the negative entries for an item (what was consumed). Never positive.
    pub fn total_negative(&self, item_id: &str) -> f64 {
        self.entries(item_id)
            .iter()
            .map(|s| s.quantity)
            .filter(|q| *q < 0.0)
            .sum()
    }

    /// Net total as a stack, if the item has a ledger.
    pub fn total_stack(&self, item_id: &str) -> Option<Stack> {
        self.ledgers
            .get(item_id)
            .map(|l| Stack::new(l.item.clone(), self.total(item_id)))
    }

    /// The raw entries recorded for an item, in insertion order.
    pub fn entries(&self, item_id: &str) -> &[Stack] {
        self.ledgers
            .get(item_id)
            .map(|l| l.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Signed relative imbalance per item:
    /// `(positive + negative) / (positive - negative)`.
    ///
    /// `+1` means only produced, `-1` only consumed, `0` balanced. Items
    /// without any non-zero entry report `0`.
    pub fn margins(&self) -> BTreeMap<String, f64> {
        self.ledgers
            .keys()
            .map(|id| {
                let pos = self.total_positive(id);
                let neg = self.total_negative(id);
                let spread = pos - neg;
                let margin = if spread == 0.0 { 0.0 } else { (pos + neg) / spread };
                (id.clone(), margin)
            })
            .collect()
    }

    /// [`margins`](Self::margins) squared, for ranking by magnitude only.
    pub fn margins_squared(&self) -> BTreeMap<String, f64> {
        self.margins()
            .into_iter()
            .map(|(id, m)| (id, m * m))
            .collect()
    }

    /// The item furthest from balance by squared margin. Ties resolve to the
    /// smallest item id.
    pub fn most_imbalanced(&self) -> Option<(String, f64)> {
        let mut best: Option<(String, f64)> = None;
        for (id, m) in self.margins_squared() {
            match &best {
                Some((_, b)) if *b >= m => {}
                _ => best = Some((id, m)),
            }
        }
        best
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.ledgers.contains_key(item_id)
    }

    /// Items with at least one entry, ordered by id.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.ledgers.values().map(|l| &l.item)
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_arithmetic() {
        let iron = Item::named("iron");
        let a = Stack::new(iron.clone(), 3.0);
        let b = Stack::new(iron.clone(), 1.5);
        assert_eq!(a.add(&b).unwrap().quantity, 4.5);
        assert_eq!(a.sub(&b).unwrap().quantity, 1.5);
        assert_eq!(a.mul(2.0).quantity, 6.0);
        assert_eq!(a.div(2.0).quantity, 1.5);
        assert_eq!(a.pow(2.0).quantity, 9.0);
        assert_eq!(a.neg().quantity, -3.0);
        assert_eq!(a.mul(2.0).item, iron);
    }

    #[test]
    fn add_rejects_different_items() {
        let a = Stack::new(Item::named("iron"), 1.0);
        let b = Stack::new(Item::named("copper"), 1.0);
        assert_eq!(
            a.add(&b),
            Err(StackError::ItemMismatch {
                left: "iron".to_string(),
                right: "copper".to_string(),
            })
        );
        assert!(a.sub(&b).is_err());
    }

    #[test]
    fn add_rejects_same_id_different_identity() {
        let a = Stack::new(Item::named("iron"), 1.0);
        let b = Stack::new(Item::named("iron"), 1.0);
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn merge_stacks_combines_duplicates() {
        let iron = Item::named("iron");
        let coal = Item::named("coal");
        let merged = merge_stacks(vec![
            Stack::new(iron.clone(), 1.0),
            Stack::new(coal.clone(), 2.0),
            Stack::new(iron.clone(), 3.0),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], Stack::new(iron, 4.0));
        assert_eq!(merged[1], Stack::new(coal, 2.0));
    }

    #[test]
    fn totals_separate_signs() {
        let gear = Item::named("gear");
        let mut set = StackSet::new();
        set.add(Stack::new(gear.clone(), 5.0)).unwrap();
        set.sub(Stack::new(gear.clone(), 2.0)).unwrap();
        set.add(Stack::new(gear.clone(), -1.0)).unwrap();

        assert_eq!(set.total("gear"), 2.0);
        assert_eq!(set.total_positive("gear"), 5.0);
        assert_eq!(set.total_negative("gear"), -3.0);
        assert_eq!(set.entries("gear").len(), 3);
        assert_eq!(
            set.total("gear"),
            set.total_positive("gear") + set.total_negative("gear")
        );
    }

    #[test]
    fn unknown_item_totals_zero() {
        let set = StackSet::new();
        assert_eq!(set.total("nothing"), 0.0);
        assert_eq!(set.total_positive("nothing"), 0.0);
        assert!(set.total_stack("nothing").is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn ledger_rejects_foreign_item_with_same_id() {
        let mut set = StackSet::new();
        set.add(Stack::new(Item::named("ore"), 1.0)).unwrap();
        let err = set.add(Stack::new(Item::named("ore"), 1.0)).unwrap_err();
        assert!(matches!(err, StackError::ItemMismatch { .. }));
        assert_eq!(set.entries("ore").len(), 1);
    }

    #[test]
    fn margins_rank_imbalance() {
        let a = Item::named("a");
        let b = Item::named("b");
        let c = Item::named("c");
        let mut set = StackSet::new();
        // a: balanced
        set.add(Stack::new(a.clone(), 2.0)).unwrap();
        set.sub(Stack::new(a.clone(), 2.0)).unwrap();
        // b: produced 3, consumed 1 -> (3 - 1) / (3 + 1) = 0.5
        set.add(Stack::new(b.clone(), 3.0)).unwrap();
        set.sub(Stack::new(b.clone(), 1.0)).unwrap();
        // c: only consumed -> -1
        set.sub(Stack::new(c.clone(), 4.0)).unwrap();

        let margins = set.margins();
        assert_eq!(margins["a"], 0.0);
        assert_eq!(margins["b"], 0.5);
        assert_eq!(margins["c"], -1.0);

        let squared = set.margins_squared();
        assert_eq!(squared["c"], 1.0);
        assert_eq!(squared["b"], 0.25);

        assert_eq!(set.most_imbalanced(), Some(("c".to_string(), 1.0)));
    }

    #[test]
    fn extend_copies_entries() {
        let a = Item::named("a");
        let mut left = StackSet::new();
        left.add(Stack::new(a.clone(), 1.0)).unwrap();
        let mut right = StackSet::new();
        right.sub(Stack::new(a.clone(), 3.0)).unwrap();

        left.extend(&right).unwrap();
        assert_eq!(left.total("a"), -2.0);
        assert_eq!(left.entries("a").len(), 2);
        assert_eq!(left.items().count(), 1);
    }
}
