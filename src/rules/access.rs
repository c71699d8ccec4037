//! Executable access rules.
//!
//! Folded `Expr` trees are compiled once into boxed closures, the same way
//! productions are stored as `Box<dyn Fn ..>` elsewhere in the crate:
//!
//! ```text
//! Expr ──lower()──> Predicate = Box<dyn Fn(&mut EvalCtx) -> bool + Send + Sync>
//!   │
//!   └── RuleCache: Expr -> Arc<CompiledRule>   (one closure per distinct IR)
//! ```
//!
//! ## Invariants
//!
//! - A given folded IR is compiled at most once per `RuleCache`; repeated
//!   requests return a pointer-equal `AccessRule`.
//! - Predicates read only the `EvalCtx`; the only side effect they can have is
//!   the time-of-day bookkeeping done by the `Reach` implementation.

use super::ast::CmpOp;
use super::expr::{Builtin, Expr, Operand, Scalar, compare};
use crate::settings::Value;
use crate::state::State;
use crate::{Age, RegionId, TimeOfDay};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Time-of-day oracle consulted by `TimeOfDay` checks.
pub trait Reach {
    /// Can `region` be reached as `age` (either age when `None`) at one of
    /// the times in `tod`?
    fn can_reach(&mut self, region: RegionId, age: Option<Age>, tod: TimeOfDay) -> bool;
}

/// A `Reach` that never reaches anything; for evaluating rules outside a search.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReach;

impl Reach for NoReach {
    fn can_reach(&mut self, _region: RegionId, _age: Option<Age>, _tod: TimeOfDay) -> bool {
        false
    }
}

/// Inputs of one rule evaluation.
pub struct EvalCtx<'a> {
    pub state: &'a State,
    /// Parent region of the entrance / location being checked.
    pub region: Option<RegionId>,
    pub age: Option<Age>,
    pub tod: TimeOfDay,
    pub reach: &'a mut dyn Reach,
}

pub(crate) type Predicate = Box<dyn Fn(&mut EvalCtx<'_>) -> bool + Send + Sync>;

struct CompiledRule {
    expr: Expr,
    predicate: Predicate,
}

/// A compiled, shareable access rule.
#[derive(Clone)]
pub struct AccessRule(Arc<CompiledRule>);

static ALWAYS: Lazy<AccessRule> = Lazy::new(|| AccessRule::compile(Expr::Const(true)));

impl AccessRule {
    pub(crate) fn compile(expr: Expr) -> Self {
        let predicate = lower(&expr);
        AccessRule(Arc::new(CompiledRule { expr, predicate }))
    }

    /// The shared always-true rule used for spots without rule text.
    pub fn always() -> Self {
        ALWAYS.clone()
    }

    pub fn expr(&self) -> &Expr {
        &self.0.expr
    }

    pub fn is_always(&self) -> bool {
        self.0.expr.is_const(true)
    }

    pub fn is_never(&self) -> bool {
        self.0.expr.is_const(false)
    }

    pub fn ptr_eq(&self, other: &AccessRule) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn eval(&self, cx: &mut EvalCtx<'_>) -> bool {
        (self.0.predicate)(cx)
    }

    /// Evaluate with no spot, no age and no time of day.
    pub fn check(&self, state: &State) -> bool {
        self.check_as(state, None, TimeOfDay::NONE)
    }

    pub fn check_as(&self, state: &State, age: Option<Age>, tod: TimeOfDay) -> bool {
        let mut reach = NoReach;
        self.eval(&mut EvalCtx { state, region: None, age, tod, reach: &mut reach })
    }
}

impl fmt::Debug for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessRule").field(&self.0.expr).finish()
    }
}

/// Folded IR -> compiled rule.
#[derive(Default)]
pub struct RuleCache {
    rules: HashMap<Expr, AccessRule>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&mut self, expr: Expr) -> AccessRule {
        if let Some(rule) = self.rules.get(&expr) {
            return rule.clone();
        }
        let rule = AccessRule::compile(expr.clone());
        self.rules.insert(expr, rule.clone());
        rule
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCache").field("rules", &self.rules.len()).finish()
    }
}

// --- Closure compilation -----------------------------------------------------

fn pred<F>(f: F) -> Predicate
where
    F: Fn(&mut EvalCtx<'_>) -> bool + Send + Sync + 'static,
{
    Box::new(f)
}

fn lower(expr: &Expr) -> Predicate {
    match expr {
        &Expr::Const(b) => pred(move |_| b),
        &Expr::Item(id) => pred(move |cx| cx.state.has(id, 1)),
        &Expr::ItemCount(id, n) => pred(move |cx| cx.state.has(id, n)),
        Expr::HasAny(ids) => {
            let ids = ids.clone();
            pred(move |cx| cx.state.has_any_of(&ids))
        }
        Expr::HasAll(ids) => {
            let ids = ids.clone();
            pred(move |cx| cx.state.has_all_of(&ids))
        }
        Expr::And(children) => {
            let children: Vec<Predicate> = children.iter().map(lower).collect();
            pred(move |cx| children.iter().all(|child| child(cx)))
        }
        Expr::Or(children) => {
            let children: Vec<Predicate> = children.iter().map(lower).collect();
            pred(move |cx| children.iter().any(|child| child(cx)))
        }
        Expr::Not(inner) => {
            let inner = lower(inner);
            pred(move |cx| !inner(cx))
        }
        Expr::Compare(op, left, right) => lower_compare(*op, left.clone(), right.clone()),
        &Expr::Call(builtin) => lower_builtin(builtin),
        Expr::TimeOfDay { tod, escape } => {
            let bits = *tod;
            let escape = escape.as_deref().map(lower);
            pred(move |cx| {
                if !cx.tod.is_empty() {
                    return cx.tod.intersects(bits);
                }
                if escape.as_ref().is_some_and(|escape| escape(cx)) {
                    return true;
                }
                match cx.region {
                    Some(region) => cx.reach.can_reach(region, cx.age, bits),
                    None => false,
                }
            })
        }
    }
}

fn lower_builtin(builtin: Builtin) -> Predicate {
    match builtin {
        Builtin::HasBottle => pred(|cx| cx.state.has_bottle()),
        Builtin::HasHearts(n) => pred(move |cx| cx.state.has_hearts(n)),
        Builtin::HasMedallions(n) => pred(move |cx| cx.state.has_medallions(n)),
        Builtin::HasStones(n) => pred(move |cx| cx.state.has_stones(n)),
        Builtin::HasDungeonRewards(n) => pred(move |cx| cx.state.has_dungeon_rewards(n)),
        Builtin::HasOcarinaButtons(n) => pred(move |cx| cx.state.has_ocarina_buttons(n)),
        Builtin::HasAllItemGoals => pred(|cx| cx.state.has_all_item_goals()),
        Builtin::Won => pred(|cx| cx.state.won()),
    }
}

fn scalar<'v>(operand: &'v Operand, cx: &EvalCtx<'_>) -> Scalar<'v> {
    match operand {
        Operand::Age => cx.age.map_or(Scalar::Missing, |age| Scalar::Str(age.as_str())),
        Operand::Literal(value) => Scalar::of(value),
        &Operand::ItemCount(id) => Scalar::Int(i64::from(cx.state.item_count(id))),
        Operand::HeartCount => Scalar::Int(i64::from(cx.state.heart_count())),
    }
}

fn lower_compare(op: CmpOp, left: Operand, right: Operand) -> Predicate {
    // Literal-vs-age is the overwhelmingly common shape (`age == 'adult'`).
    if let (Operand::Age, Operand::Literal(Value::Str(expected))) = (&left, &right) {
        let expected = expected.clone();
        return match op {
            CmpOp::Eq => pred(move |cx| cx.age.is_some_and(|age| age.as_str() == expected)),
            CmpOp::NotEq => pred(move |cx| !cx.age.is_some_and(|age| age.as_str() == expected)),
            _ => pred(move |cx| {
                compare(op, scalar(&left, cx), scalar(&right, cx)).unwrap_or(false)
            }),
        };
    }
    pred(move |cx| compare(op, scalar(&left, cx), scalar(&right, cx)).unwrap_or(false))
}
