//! Folded rule IR.
//!
//! `Expr` is what the compiler produces after name resolution, macro
//! expansion and constant folding. It is hashable so structurally identical
//! rules share one compiled closure (see `RuleCache`).

use super::ast::{BoolOp, CmpOp};
use crate::TimeOfDay;
use crate::catalog::ItemId;
use crate::settings::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Domain helpers evaluated against `State`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    HasBottle,
    HasHearts(u32),
    HasMedallions(u32),
    HasStones(u32),
    HasDungeonRewards(u32),
    HasOcarinaButtons(u32),
    HasAllItemGoals,
    Won,
}

/// Runtime side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Age,
    Literal(Value),
    ItemCount(ItemId),
    HeartCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(bool),
    Item(ItemId),
    ItemCount(ItemId, u32),
    HasAny(Vec<ItemId>),
    HasAll(Vec<ItemId>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare(CmpOp, Operand, Operand),
    Call(Builtin),
    /// Satisfied by the evaluation's `tod`, by `escape`, or by the search
    /// reaching the spot's region at one of `tod`.
    TimeOfDay { tod: TimeOfDay, escape: Option<Box<Expr>> },
}

pub(crate) const TRUE: Expr = Expr::Const(true);
pub(crate) const FALSE: Expr = Expr::Const(false);

impl Expr {
    pub fn is_const(&self, value: bool) -> bool {
        matches!(self, Expr::Const(b) if *b == value)
    }

    /// `not`, with double negation and constants folded.
    pub(crate) fn negate(self) -> Expr {
        match self {
            Expr::Const(b) => Expr::Const(!b),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    /// Fold a boolean group: flatten same-kind children, merge item presence
    /// tests into one sorted `HasAll` / `HasAny`, drop neutral constants and
    /// short-circuit on the absorbing one.
    pub(crate) fn group(op: BoolOp, operands: Vec<Expr>) -> Expr {
        let absorbing = op == BoolOp::Or;
        let mut items = BTreeSet::new();
        let mut rest = Vec::new();
        let mut work: Vec<Expr> = operands;
        work.reverse();

        while let Some(expr) = work.pop() {
            match (op, expr) {
                (_, Expr::Const(b)) if b == absorbing => return Expr::Const(b),
                (_, Expr::Const(_)) => {}
                (_, Expr::Item(id)) => {
                    items.insert(id);
                }
                (BoolOp::And, Expr::HasAll(ids)) | (BoolOp::Or, Expr::HasAny(ids)) => items.extend(ids),
                (BoolOp::And, Expr::And(children)) | (BoolOp::Or, Expr::Or(children)) => {
                    work.extend(children.into_iter().rev());
                }
                (_, other) => {
                    if !rest.contains(&other) {
                        rest.push(other);
                    }
                }
            }
        }

        let mut operands = Vec::with_capacity(rest.len() + 1);
        match items.len() {
            0 => {}
            1 => operands.extend(items.into_iter().map(Expr::Item)),
            _ if absorbing => operands.push(Expr::HasAny(items.into_iter().collect())),
            _ => operands.push(Expr::HasAll(items.into_iter().collect())),
        }
        operands.extend(rest);

        match operands.len() {
            0 => Expr::Const(!absorbing),
            1 => operands.pop().unwrap_or(Expr::Const(!absorbing)),
            _ if absorbing => Expr::Or(operands),
            _ => Expr::And(operands),
        }
    }

    pub(crate) fn has_all(ids: impl IntoIterator<Item = ItemId>) -> Expr {
        Expr::group(BoolOp::And, ids.into_iter().map(Expr::Item).collect())
    }

    pub(crate) fn has_any(ids: impl IntoIterator<Item = ItemId>) -> Expr {
        Expr::group(BoolOp::Or, ids.into_iter().map(Expr::Item).collect())
    }

    /// `has(item, count)`.
    pub(crate) fn has(id: ItemId, count: i64) -> Expr {
        match count {
            n if n <= 0 => TRUE,
            1 => Expr::Item(id),
            n => Expr::ItemCount(id, u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}

// --- Comparison semantics -----------------------------------------------------

/// Borrowed view of an operand's value during evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar<'a> {
    Missing,
    Int(i64),
    Str(&'a str),
    Value(&'a Value),
}

impl<'a> Scalar<'a> {
    pub(crate) fn of(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => Scalar::Int(i64::from(*b)),
            Value::Int(n) => Scalar::Int(*n),
            Value::Str(s) => Scalar::Str(s),
            other => Scalar::Value(other),
        }
    }

    fn order(self, other: Scalar<'_>) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(&b)),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn same(self, other: Scalar<'_>) -> bool {
        match (self, other) {
            (Scalar::Missing, Scalar::Missing) => true,
            (Scalar::Value(a), Scalar::Value(b)) => a == b,
            (a, b) => a.order(b) == Some(Ordering::Equal),
        }
    }

    /// `self in container`; `None` when the container cannot hold values.
    fn within(self, container: Scalar<'_>) -> Option<bool> {
        match container {
            Scalar::Str(haystack) => match self {
                Scalar::Str(needle) => Some(haystack.contains(needle)),
                _ => None,
            },
            Scalar::Value(Value::List(items)) => Some(items.iter().any(|item| self.same(Scalar::of(item)))),
            Scalar::Value(Value::Map(map)) => match self {
                Scalar::Str(key) => Some(map.contains_key(key)),
                _ => Some(false),
            },
            _ => None,
        }
    }
}

/// Apply `op`. `None` means the operand types do not support it.
pub(crate) fn compare(op: CmpOp, left: Scalar<'_>, right: Scalar<'_>) -> Option<bool> {
    let ordered = |test: fn(Ordering) -> bool| left.order(right).map(test);
    match op {
        CmpOp::Eq => Some(left.same(right)),
        CmpOp::NotEq => Some(!left.same(right)),
        CmpOp::Lt => ordered(Ordering::is_lt),
        CmpOp::LtE => ordered(Ordering::is_le),
        CmpOp::Gt => ordered(Ordering::is_gt),
        CmpOp::GtE => ordered(Ordering::is_ge),
        CmpOp::In => left.within(right),
        CmpOp::NotIn => left.within(right).map(|found| !found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> Expr {
        Expr::Item(ItemId(n))
    }

    #[test]
    fn and_merges_items_and_drops_true() {
        let folded = Expr::group(BoolOp::And, vec![item(3), TRUE, item(1), item(3)]);
        assert_eq!(folded, Expr::HasAll(vec![ItemId(1), ItemId(3)]));
    }

    #[test]
    fn absorbing_constant_short_circuits() {
        assert_eq!(Expr::group(BoolOp::And, vec![item(1), FALSE, Expr::Call(Builtin::Won)]), FALSE);
        assert_eq!(Expr::group(BoolOp::Or, vec![item(1), TRUE]), TRUE);
    }

    #[test]
    fn empty_groups_become_their_identity() {
        assert_eq!(Expr::group(BoolOp::And, vec![TRUE, TRUE]), TRUE);
        assert_eq!(Expr::group(BoolOp::Or, vec![FALSE]), FALSE);
        assert_eq!(Expr::group(BoolOp::Or, vec![]), FALSE);
    }

    #[test]
    fn nested_groups_flatten() {
        let inner = Expr::Or(vec![Expr::HasAny(vec![ItemId(2), ItemId(4)]), Expr::Call(Builtin::HasBottle)]);
        let folded = Expr::group(BoolOp::Or, vec![item(1), inner]);
        assert_eq!(
            folded,
            Expr::Or(vec![Expr::HasAny(vec![ItemId(1), ItemId(2), ItemId(4)]), Expr::Call(Builtin::HasBottle)])
        );
        assert_eq!(Expr::group(BoolOp::And, vec![Expr::Call(Builtin::Won)]), Expr::Call(Builtin::Won));
    }

    #[test]
    fn negation_folds() {
        assert_eq!(TRUE.negate(), FALSE);
        assert_eq!(item(1).negate().negate(), item(1));
    }

    #[test]
    fn has_with_counts() {
        assert_eq!(Expr::has(ItemId(7), 0), TRUE);
        assert_eq!(Expr::has(ItemId(7), 1), item(7));
        assert_eq!(Expr::has(ItemId(7), 3), Expr::ItemCount(ItemId(7), 3));
    }

    #[test]
    fn comparisons() {
        let list = Value::from(vec!["forest", "fire"]);
        assert_eq!(compare(CmpOp::In, Scalar::Str("fire"), Scalar::of(&list)), Some(true));
        assert_eq!(compare(CmpOp::NotIn, Scalar::Str("water"), Scalar::of(&list)), Some(true));
        assert_eq!(compare(CmpOp::Lt, Scalar::Int(2), Scalar::Int(3)), Some(true));
        assert_eq!(compare(CmpOp::Lt, Scalar::Int(2), Scalar::Str("x")), None);
        assert_eq!(compare(CmpOp::Eq, Scalar::Missing, Scalar::Str("adult")), Some(false));
        assert_eq!(compare(CmpOp::Eq, Scalar::of(&Value::Bool(true)), Scalar::Int(1)), Some(true));
    }
}
