//! Lowering from `Ast` to folded `Expr`.
//!
//! ```text
//! Ast ── lower_bool ──┬─ intrinsics     at_day / at_night / at_dampe_time, at(), here()
//!                     ├─ builtins       has(), has_all_of(), can_live_dmg(), ...
//!                     ├─ helper macros  parsed template + argument substitution
//!                     ├─ catalog items  implicit has(item)
//!                     ├─ settings / world attributes  folded to literals
//!                     └─ capitalized names            new event items
//!                            │
//!                            v
//!                     Expr::group / negate / literal compare  (constant folding)
//!                            │
//!                            v
//!                     RuleCache::get_or_compile  ->  AccessRule
//! ```
//!
//! Every operand of a boolean group is lowered before the group is folded, so
//! a branch that folds away still registers the events and subrules it names.

use super::access::{AccessRule, RuleCache};
use super::ast::{Ast, BinOp, BoolOp, CmpOp};
use super::error::CompileError;
use super::expr::{Builtin, Expr, Operand, Scalar, TRUE, compare};
use super::helpers::{Helper, HelperRegistry};
use super::parser::parse_rule;
use crate::TimeOfDay;
use crate::catalog::{Catalog, ItemId};
use crate::settings::Value;
use crate::world::WorldProfile;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Nesting limit for helper expansion; deeper means a helper calls itself.
const MAX_EXPANSION_DEPTH: usize = 64;

/// Names that only exist while a rule runs.
const RUNTIME_VARS: [&str; 3] = ["age", "spot", "tod"];

/// The spot a rule belongs to: used by `here()`, `GS Token` night rules and
/// error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub name: String,
    /// Name of the parent region.
    pub region: String,
    /// Location type (`GS Token`, `Event`, ...); `None` for entrances.
    pub kind: Option<String>,
}

impl Anchor {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self { name: name.into(), region: region.into(), kind: None }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// A subrule waiting for its event location.
#[derive(Debug, Clone)]
pub(crate) struct DelayedSubrule {
    pub region: String,
    pub ast: Ast,
    pub event: String,
    pub id: ItemId,
}

/// Per-world compiler bookkeeping that outlives a single compiler borrow.
#[derive(Debug, Clone, Default)]
pub struct RuleLedger {
    replaced: HashMap<String, HashMap<Ast, ItemId>>,
    delayed: Vec<DelayedSubrule>,
    events: BTreeSet<String>,
}

impl RuleLedger {
    /// Event items this world's rules declared (including subrule events).
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    /// Subrules still waiting for phase 2.
    pub fn pending(&self) -> usize {
        self.delayed.len()
    }

    pub(crate) fn take_delayed(&mut self) -> Vec<DelayedSubrule> {
        std::mem::take(&mut self.delayed)
    }

    pub(crate) fn note_event(&mut self, name: &str) {
        self.events.insert(name.to_string());
    }
}

pub struct RuleCompiler<'c> {
    catalog: &'c mut Catalog,
    profile: &'c WorldProfile,
    helpers: &'c HelperRegistry,
    cache: &'c mut RuleCache,
    ledger: &'c mut RuleLedger,
    anchor: Option<Anchor>,
    depth: usize,
}

impl<'c> RuleCompiler<'c> {
    pub fn new(
        catalog: &'c mut Catalog,
        profile: &'c WorldProfile,
        helpers: &'c HelperRegistry,
        cache: &'c mut RuleCache,
        ledger: &'c mut RuleLedger,
    ) -> Self {
        Self { catalog, profile, helpers, cache, ledger, anchor: None, depth: 0 }
    }

    /// Compile rule text. Empty text (or only a comment) means always.
    pub fn compile(&mut self, text: &str, anchor: Option<&Anchor>) -> Result<AccessRule> {
        if text.split('#').next().is_none_or(|rule| rule.trim().is_empty()) {
            return Ok(self.cache.get_or_compile(TRUE));
        }
        let ast = parse_rule(text)?;
        self.compile_ast(&ast, anchor)
    }

    pub fn compile_ast(&mut self, ast: &Ast, anchor: Option<&Anchor>) -> Result<AccessRule> {
        let expr = self.lower(ast, anchor)?;
        Ok(self.cache.get_or_compile(expr))
    }

    /// Lower without compiling; the folded IR is what the cache is keyed by.
    pub fn lower(&mut self, ast: &Ast, anchor: Option<&Anchor>) -> Result<Expr> {
        self.anchor = anchor.cloned();
        self.depth = 0;
        self.lower_bool(ast)
    }

    // --- Errors -------------------------------------------------------------

    fn spot(&self) -> String {
        self.anchor.as_ref().map_or_else(|| "<no spot>".to_string(), |anchor| anchor.name.clone())
    }

    fn unknown_name(&self, name: &str, ast: &Ast) -> CompileError {
        CompileError::UnknownName { spot: self.spot(), name: name.to_string(), ast: ast.to_string() }
    }

    fn invalid_argument(&self, name: &str, reason: &str, ast: &Ast) -> CompileError {
        CompileError::InvalidArgument {
            spot: self.spot(),
            name: name.to_string(),
            reason: reason.to_string(),
            ast: ast.to_string(),
        }
    }

    fn unsupported(&self, message: String, ast: &Ast) -> CompileError {
        CompileError::Unsupported { spot: self.spot(), message, ast: ast.to_string() }
    }

    fn count_tuple(&self, reason: &str, ast: &Ast) -> CompileError {
        CompileError::CountTuple { spot: self.spot(), reason: reason.to_string(), ast: ast.to_string() }
    }

    fn arity(&self, name: &str, args: &[Ast], expected: usize, ast: &Ast) -> Result<()> {
        if args.len() == expected {
            return Ok(());
        }
        Err(CompileError::Arity {
            spot: self.spot(),
            name: name.to_string(),
            expected,
            found: args.len(),
            ast: ast.to_string(),
        })
    }

    // --- Resolution helpers -------------------------------------------------

    /// Setting, then world attribute.
    fn constant(&self, name: &str) -> Option<&'c Value> {
        let profile = self.profile;
        profile.settings.get(name).or_else(|| profile.attributes.get(name))
    }

    fn is_event_name(name: &str) -> bool {
        regex!(r"^[A-Z]\w+").is_match(name)
    }

    fn declare_event(&mut self, display: &str) -> ItemId {
        let id = self.catalog.declare_event(display);
        if !self.ledger.events.contains(display) {
            let event = display;
            debug!(event, spot = %self.spot(), "declared event item");
            self.ledger.note_event(display);
        }
        id
    }

    /// An identifier in item position.
    fn item_ref(&mut self, name: &str, ast: &Ast) -> Result<ItemId> {
        if let Some(id) = self.catalog.lookup(name) {
            return Ok(id);
        }
        if Self::is_event_name(name) {
            return Ok(self.declare_event(&name.replace('_', " ")));
        }
        Err(self.unknown_name(name, ast))
    }

    /// A string in item position: known item, else an event of that name.
    fn item_or_event(&mut self, name: &str) -> ItemId {
        match self.catalog.lookup(name) {
            Some(id) => id,
            None => self.declare_event(name),
        }
    }

    fn item_arg(&mut self, func: &str, arg: &Ast, ast: &Ast) -> Result<ItemId> {
        match arg {
            Ast::Name(name) => self.item_ref(name, ast),
            Ast::Str(name) => Ok(self.item_or_event(name)),
            _ => Err(self.invalid_argument(func, "expected an item name", ast)),
        }
    }

    fn int_arg(&mut self, func: &str, arg: &Ast, ast: &Ast) -> Result<i64> {
        self.literal(arg)?.as_ref().and_then(Value::as_int).ok_or_else(|| self.invalid_argument(func, "expected an integer", ast))
    }

    /// A name argument given as `'Suns Song'` or `Suns_Song`.
    fn name_arg(&self, func: &str, arg: &Ast, ast: &Ast) -> Result<String> {
        match arg {
            Ast::Str(s) => Ok(s.clone()),
            Ast::Name(name) => Ok(name.replace('_', " ")),
            _ => Err(self.invalid_argument(func, "expected a name", ast)),
        }
    }

    fn expand(&mut self, helper: &Helper, args: &[Ast], ast: &Ast) -> Result<Expr> {
        self.arity(&helper.name, args, helper.params.len(), ast)?;
        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(CompileError::RecursionLimit { spot: self.spot(), limit: MAX_EXPANSION_DEPTH, ast: ast.to_string() });
        }
        let body = helper.instantiate(args);
        self.depth += 1;
        let lowered = self.lower_bool(&body);
        self.depth -= 1;
        lowered
    }

    // --- Boolean position ---------------------------------------------------

    fn lower_bool(&mut self, ast: &Ast) -> Result<Expr> {
        match ast {
            Ast::Bool(b) => Ok(Expr::Const(*b)),
            Ast::Int(n) => Ok(Expr::Const(*n != 0)),
            Ast::Str(name) => Ok(Expr::Item(self.item_or_event(name))),
            Ast::Name(name) => self.lower_name(name, ast),
            Ast::Tuple(items) => self.lower_count(items, ast),
            Ast::Call { func, args } => self.lower_call(func, args, ast),
            Ast::BoolOp { op, values } => {
                let operands = values.iter().map(|value| self.lower_bool(value)).collect::<Result<Vec<_>>>()?;
                Ok(Expr::group(*op, operands))
            }
            Ast::Not(inner) => Ok(self.lower_bool(inner)?.negate()),
            Ast::Compare { left, rest } => self.lower_compare(left, rest, ast),
            Ast::Decimal(_) | Ast::Subscript { .. } | Ast::BinOp { .. } | Ast::Neg(_) => match self.literal(ast)? {
                Some(value) => Ok(Expr::Const(value.truthy())),
                None => Err(self.unsupported("expected a condition".into(), ast)),
            },
        }
    }

    fn lower_name(&mut self, name: &str, ast: &Ast) -> Result<Expr> {
        match name {
            "at_day" | "at_night" | "at_dampe_time" => return self.time_of_day(name),
            _ if RUNTIME_VARS.contains(&name) => {
                return Err(self.unsupported(format!("`{name}` is not a condition"), ast));
            }
            _ => {}
        }
        if let Some(expr) = self.lower_builtin(name, &[], ast)? {
            return Ok(expr);
        }
        let helpers = self.helpers;
        if let Some(helper) = helpers.get(name) {
            return self.expand(helper, &[], ast);
        }
        if let Some(id) = self.catalog.lookup(name) {
            return Ok(Expr::Item(id));
        }
        if let Some(value) = self.constant(name) {
            return Ok(Expr::Const(value.truthy()));
        }
        if Self::is_event_name(name) {
            return Ok(Expr::Item(self.declare_event(&name.replace('_', " "))));
        }
        Err(self.unknown_name(name, ast))
    }

    /// `(item, count)`.
    fn lower_count(&mut self, items: &[Ast], ast: &Ast) -> Result<Expr> {
        let [item, count] = items else {
            return Err(self.count_tuple("expected exactly two values", ast));
        };
        let id = match item {
            Ast::Name(name) => self.item_ref(name, ast)?,
            Ast::Str(name) => self.item_or_event(name),
            _ => return Err(self.count_tuple("first value must be an item", ast)),
        };
        let count = match count {
            Ast::Int(n) => *n,
            Ast::Name(name) => self
                .constant(name)
                .and_then(Value::as_int)
                .ok_or_else(|| self.count_tuple("second value must be an integer setting", ast))?,
            _ => return Err(self.count_tuple("second value must be a number", ast)),
        };
        Ok(Expr::has(id, count))
    }

    fn lower_call(&mut self, func: &str, args: &[Ast], ast: &Ast) -> Result<Expr> {
        match func {
            "at_day" | "at_night" | "at_dampe_time" => {
                self.arity(func, args, 0, ast)?;
                return self.time_of_day(func);
            }
            "at" => {
                self.arity(func, args, 2, ast)?;
                let Ast::Str(region) = &args[0] else {
                    return Err(self.invalid_argument(func, "first argument must be a region name", ast));
                };
                return self.subrule(region, &args[1]);
            }
            "here" => {
                self.arity(func, args, 1, ast)?;
                let Some(region) = self.anchor.as_ref().map(|anchor| anchor.region.clone()) else {
                    return Err(self.invalid_argument(func, "no spot to anchor to", ast));
                };
                return self.subrule(&region, &args[0]);
            }
            _ => {}
        }
        if let Some(expr) = self.lower_builtin(func, args, ast)? {
            return Ok(expr);
        }
        let helpers = self.helpers;
        if let Some(helper) = helpers.get(func) {
            return self.expand(helper, args, ast);
        }
        Err(CompileError::UnknownFunction { spot: self.spot(), name: func.to_string(), ast: ast.to_string() })
    }

    /// State-side helpers. `Ok(None)` when `name` is not one.
    fn lower_builtin(&mut self, name: &str, args: &[Ast], ast: &Ast) -> Result<Option<Expr>> {
        let expr = match name {
            "has" => match args {
                [item] => Expr::Item(self.item_arg(name, item, ast)?),
                [item, count] => {
                    let id = self.item_arg(name, item, ast)?;
                    Expr::has(id, self.int_arg(name, count, ast)?)
                }
                _ => return self.arity(name, args, 2, ast).map(|()| None),
            },
            "has_any_of" | "has_all_of" => {
                let items = match args {
                    [Ast::Tuple(items)] => items.as_slice(),
                    _ => args,
                };
                if items.is_empty() {
                    return Err(self.invalid_argument(name, "expected at least one item", ast));
                }
                let ids = items.iter().map(|item| self.item_arg(name, item, ast)).collect::<Result<Vec<_>>>()?;
                if name == "has_any_of" { Expr::has_any(ids) } else { Expr::has_all(ids) }
            }
            "has_bottle" => {
                self.arity(name, args, 0, ast)?;
                Expr::Call(Builtin::HasBottle)
            }
            "has_hearts" | "has_medallions" | "has_stones" | "has_dungeon_rewards" | "has_ocarina_buttons" => {
                self.arity(name, args, 1, ast)?;
                let count = self.int_arg(name, &args[0], ast)?;
                if count <= 0 {
                    TRUE
                } else {
                    let n = u32::try_from(count).unwrap_or(u32::MAX);
                    Expr::Call(match name {
                        "has_hearts" => Builtin::HasHearts(n),
                        "has_medallions" => Builtin::HasMedallions(n),
                        "has_stones" => Builtin::HasStones(n),
                        "has_dungeon_rewards" => Builtin::HasDungeonRewards(n),
                        _ => Builtin::HasOcarinaButtons(n),
                    })
                }
            }
            "has_all_notes_for_song" => {
                self.arity(name, args, 1, ast)?;
                let song = self.name_arg(name, &args[0], ast)?;
                self.song_buttons(&song)
            }
            "has_all_item_goals" => {
                self.arity(name, args, 0, ast)?;
                Expr::Call(Builtin::HasAllItemGoals)
            }
            "won" => {
                self.arity(name, args, 0, ast)?;
                Expr::Call(Builtin::Won)
            }
            "can_live_dmg" => {
                self.arity(name, args, 1, ast)?;
                let quarters = match &args[0] {
                    Ast::Decimal(d) => d.parse::<f64>().map(|hearts| hearts * 4.0).ok(),
                    other => self.literal(other)?.as_ref().and_then(Value::as_int).map(|hearts| hearts as f64 * 4.0),
                }
                .ok_or_else(|| self.invalid_argument(name, "expected a number of hearts", ast))?;
                let multiplier = self.profile.settings.str("damage_multiplier").unwrap_or("normal");
                Expr::Const(if quarters >= 3.0 {
                    multiplier != "ohko" && multiplier != "quadruple"
                } else {
                    multiplier != "ohko"
                })
            }
            "had_night_start" => {
                self.arity(name, args, 0, ast)?;
                let start = self.profile.settings.str("starting_tod").unwrap_or("default");
                Expr::Const(matches!(start, "sunset" | "evening" | "midnight" | "witching-hour"))
            }
            "region_has_shortcuts" => {
                self.arity(name, args, 1, ast)?;
                let region = self.name_arg(name, &args[0], ast)?;
                Expr::Const(self.profile.shortcut_regions.contains(&region))
            }
            "guarantee_hint" => {
                self.arity(name, args, 0, ast)?;
                let helpers = self.helpers;
                match helpers.get(name) {
                    Some(helper) => self.expand(helper, &[], ast)?,
                    None => return Err(self.unknown_name(name, ast)),
                }
            }
            "item_count" | "heart_count" => {
                let operand = self.lower_operand(ast, ast)?;
                Expr::Compare(CmpOp::Gt, operand, Operand::Literal(Value::Int(0)))
            }
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    /// Buttons needed to play `song`; a song without known notes needs none.
    fn song_buttons(&mut self, song: &str) -> Expr {
        if song == "Scarecrow Song" {
            return Expr::Call(Builtin::HasOcarinaButtons(2));
        }
        let Some(notes) = self.profile.song_notes.get(song) else {
            return TRUE;
        };
        Expr::has_all(notes.chars().filter_map(|note| self.catalog.ocarina_button(note)))
    }

    // --- Time of day --------------------------------------------------------

    fn time_of_day(&mut self, which: &str) -> Result<Expr> {
        let gs_token = self.anchor.as_ref().and_then(|anchor| anchor.kind.as_deref()) == Some("GS Token");
        if which == "at_night" && gs_token && self.profile.settings.flag("logic_no_night_tokens_without_suns_song") {
            let ast = Ast::Call { func: "can_play".into(), args: vec![Ast::Name("Suns_Song".into())] };
            return self.lower_bool(&ast);
        }
        if !self.profile.ensure_tod_access {
            return Ok(TRUE);
        }
        let (tod, escape) = match which {
            "at_day" => (TimeOfDay::DAY, Some(self.suns_song_escape()?)),
            "at_night" => (TimeOfDay::DAMPE, Some(self.suns_song_escape()?)),
            _ => (TimeOfDay::DAMPE, None),
        };
        Ok(match escape {
            Some(escape) if escape.is_const(true) => TRUE,
            Some(escape) if escape.is_const(false) => Expr::TimeOfDay { tod, escape: None },
            escape => Expr::TimeOfDay { tod, escape: escape.map(Box::new) },
        })
    }

    /// Playing the Sun's Song skips to the wanted time.
    fn suns_song_escape(&mut self) -> Result<Expr> {
        let anchor = Ast::Name("Suns_Song".into());
        let ocarina = self.item_ref("Ocarina", &anchor)?;
        let song = self.item_ref("Suns_Song", &anchor)?;
        let notes = self.song_buttons("Suns Song");
        Ok(Expr::group(BoolOp::And, vec![Expr::has_all([ocarina, song]), notes]))
    }

    // --- Subrules -----------------------------------------------------------

    /// Replace `expr` evaluated in `region` by an event item located there.
    fn subrule(&mut self, region: &str, body: &Ast) -> Result<Expr> {
        // A quoted body is rule text, unless it is just an item or event name.
        let body = match body {
            Ast::Str(text) => match parse_rule(text) {
                Ok(Ast::Name(_)) | Err(_) => Ast::Str(text.clone()),
                Ok(parsed) => parsed,
            },
            other => other.clone(),
        };
        let table = self.ledger.replaced.entry(region.to_string()).or_default();
        if let Some(&id) = table.get(&body) {
            return Ok(Expr::Item(id));
        }
        let event = format!("{region} Subrule {}", table.len() + 1);
        let id = self.catalog.declare_event(&event);
        table.insert(body.clone(), id);
        self.ledger.note_event(&event);
        self.ledger.delayed.push(DelayedSubrule { region: region.to_string(), ast: body, event, id });
        Ok(Expr::Item(id))
    }

    // --- Comparisons and literals -------------------------------------------

    fn lower_compare(&mut self, left: &Ast, rest: &[(CmpOp, Ast)], ast: &Ast) -> Result<Expr> {
        if let (Ast::Name(l), [(op @ (CmpOp::Eq | CmpOp::NotEq), Ast::Name(r))]) = (left, rest) {
            let plain = |name: &str| !RUNTIME_VARS.contains(&name) && self.constant(name).is_none();
            if plain(l) && plain(r) {
                return Ok(Expr::Const((l == r) == (*op == CmpOp::Eq)));
            }
        }

        let mut terms = Vec::with_capacity(rest.len());
        let mut lhs = self.lower_operand(left, ast)?;
        for (op, right) in rest {
            let rhs = self.lower_operand(right, ast)?;
            terms.push(self.fold_compare(*op, lhs, rhs.clone(), ast)?);
            lhs = rhs;
        }
        Ok(Expr::group(BoolOp::And, terms))
    }

    fn fold_compare(&self, op: CmpOp, left: Operand, right: Operand, ast: &Ast) -> Result<Expr> {
        if let (Operand::Literal(a), Operand::Literal(b)) = (&left, &right) {
            return compare(op, Scalar::of(a), Scalar::of(b))
                .map(Expr::Const)
                .ok_or_else(|| self.unsupported(format!("cannot evaluate `{a} {} {b}`", op.symbol()), ast));
        }
        Ok(Expr::Compare(op, left, right))
    }

    fn lower_operand(&mut self, operand: &Ast, ast: &Ast) -> Result<Operand> {
        match operand {
            Ast::Name(name) if name == "age" => Ok(Operand::Age),
            Ast::Name(name) if self.constant(name).is_none() => match self.catalog.lookup(name) {
                Some(id) => Ok(Operand::Literal(Value::Str(self.catalog.entry(id).name.clone()))),
                None => Err(self.unknown_name(name, ast)),
            },
            Ast::Call { func, args } if func == "item_count" => {
                self.arity(func, args, 1, ast)?;
                Ok(Operand::ItemCount(self.item_arg(func, &args[0], ast)?))
            }
            Ast::Call { func, args } if func == "heart_count" => {
                self.arity(func, args, 0, ast)?;
                Ok(Operand::HeartCount)
            }
            other => match self.literal(other)? {
                Some(value) => Ok(Operand::Literal(value)),
                None => Err(self.unsupported("comparison operands must be literals, `age` or counts".into(), ast)),
            },
        }
    }

    /// Compile-time value of `ast`, if it is made of literals and constants.
    fn literal(&mut self, ast: &Ast) -> Result<Option<Value>> {
        Ok(match ast {
            Ast::Int(n) => Some(Value::Int(*n)),
            Ast::Bool(b) => Some(Value::Bool(*b)),
            Ast::Str(s) => Some(Value::Str(s.clone())),
            Ast::Name(name) => self.constant(name).cloned(),
            Ast::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.literal(item)? {
                        Some(value) => values.push(value),
                        None => return Ok(None),
                    }
                }
                Some(Value::List(values))
            }
            Ast::Subscript { value, key } => {
                let container = self.constant(value).ok_or_else(|| self.unknown_name(value, ast))?;
                let key = match key.as_ref() {
                    Ast::Name(name) if self.constant(name).is_none() => Value::Str(name.replace('_', " ")),
                    other => self.literal(other)?.ok_or_else(|| self.unsupported("non-literal subscript".into(), ast))?,
                };
                let found = match (container, &key) {
                    (Value::Map(map), Value::Str(k)) => map.get(k).cloned(),
                    (Value::List(items), Value::Int(i)) => usize::try_from(*i).ok().and_then(|i| items.get(i)).cloned(),
                    _ => None,
                };
                Some(found.ok_or_else(|| self.unsupported(format!("`{value}` has no entry {key}"), ast))?)
            }
            Ast::Neg(inner) => match self.literal(inner)? {
                Some(value) => {
                    let n = value.as_int().ok_or_else(|| self.unsupported("cannot negate a non-number".into(), ast))?;
                    Some(Value::Int(n.checked_neg().ok_or_else(|| self.unsupported("overflow".into(), ast))?))
                }
                None => return Err(self.unsupported("arithmetic on a non-literal operand".into(), ast)),
            },
            Ast::BinOp { op, left, right } => {
                let (Some(l), Some(r)) = (self.literal(left)?, self.literal(right)?) else {
                    return Err(self.unsupported("arithmetic on a non-literal operand".into(), ast));
                };
                let (Some(a), Some(b)) = (l.as_int(), r.as_int()) else {
                    return Err(self.unsupported(format!("cannot evaluate `{l} {} {r}`", op.symbol()), ast));
                };
                let value = arithmetic(*op, a, b).ok_or_else(|| self.unsupported("invalid arithmetic".into(), ast))?;
                Some(Value::Int(value))
            }
            _ => None,
        })
    }
}

/// Integer arithmetic with floor division semantics; `None` on overflow or
/// division by zero.
fn arithmetic(op: BinOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::FloorDiv => {
            let q = a.checked_div(b)?;
            Some(if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q })
        }
        BinOp::Mod => {
            let r = a.checked_rem(b)?;
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
    }
}
