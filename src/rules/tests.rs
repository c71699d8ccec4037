use super::*;
use crate::catalog::{Catalog, ItemClass, ItemDef, ItemId};
use crate::settings::{Settings, Value};
use crate::state::{State, StateContext};
use crate::world::WorldProfile;
use crate::{Age, TimeOfDay, WorldId};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Fixture {
    catalog: Catalog,
    profile: WorldProfile,
    helpers: HelperRegistry,
    cache: RuleCache,
    ledger: RuleLedger,
}

impl Fixture {
    fn new() -> Self {
        let mut catalog = Catalog::new();
        for name in ["Kokiri Sword", "Sticks", "Bow", "Hookshot", "Ocarina", "Suns Song", "Y", "Piece of Heart"] {
            catalog.declare(ItemDef::advancement(name));
        }
        catalog.declare(ItemDef::advancement("Bottle").class(ItemClass::BOTTLE));
        for (name, note) in [("Ocarina A Button", 'A'), ("Ocarina C down Button", 'v'), ("Ocarina C right Button", '>')] {
            catalog.declare(ItemDef::advancement(name).ocarina_button(note));
        }
        let helpers = HelperRegistry::from_pairs([
            ("is_adult", "age == 'adult'"),
            ("can_use(item)", "has(item) and is_adult"),
            ("can_play(song)", "has(Ocarina) and has(song)"),
            ("guarantee_hint", "Bow"),
            ("ouroboros", "Bow and ouroboros"),
        ])
        .unwrap();
        let settings = Settings::new()
            .with("open_forest", "closed_deku")
            .with("bridge_tokens", 3)
            .with("shuffle_scrubs", false)
            .with("bridge", "medallions")
            .with("damage_multiplier", "normal");
        let mut mq = BTreeMap::new();
        mq.insert("Deku Tree".to_string(), Value::Bool(true));
        mq.insert("Water Temple".to_string(), Value::Bool(false));
        let attributes = Settings::new().with("dungeon_mq", Value::Map(mq));
        let profile = WorldProfile::new(settings).with_attributes(attributes).with_shortcut_region("Deku Tree Lobby");
        Self { catalog, profile, helpers, cache: RuleCache::new(), ledger: RuleLedger::default() }
    }

    fn compiler(&mut self) -> RuleCompiler<'_> {
        RuleCompiler::new(&mut self.catalog, &self.profile, &self.helpers, &mut self.cache, &mut self.ledger)
    }

    fn compile(&mut self, text: &str) -> Result<AccessRule, CompileError> {
        self.compiler().compile(text, None)
    }

    fn lower(&mut self, text: &str) -> Result<Expr, CompileError> {
        self.lower_at(text, None)
    }

    fn lower_at(&mut self, text: &str, anchor: Option<&Anchor>) -> Result<Expr, CompileError> {
        let ast = parse_rule(text)?;
        self.compiler().lower(&ast, anchor)
    }

    fn id(&self, name: &str) -> ItemId {
        self.catalog.lookup(name).unwrap()
    }

    fn state(&self, items: &[&str]) -> State {
        let context = StateContext::new(WorldId(0), self.catalog.groups());
        let mut state = State::new(Arc::new(context), self.catalog.len());
        for name in items {
            state.collect(self.catalog.entry(self.id(name)));
        }
        state
    }
}

// --- Compilation and caching --------------------------------------------------

#[test]
fn either_item_unlocks_the_rule() {
    let mut fx = Fixture::new();
    let rule = fx.compile("Kokiri_Sword or Sticks").unwrap();
    assert!(!rule.check(&fx.state(&[])));
    assert!(rule.check(&fx.state(&["Kokiri Sword"])));
    assert_eq!(rule.expr(), &Expr::HasAny(vec![fx.id("Kokiri Sword"), fx.id("Sticks")]));
}

#[test]
fn identical_text_shares_one_rule() {
    let mut fx = Fixture::new();
    let a = fx.compile("Bow and Hookshot").unwrap();
    let b = fx.compile("Bow and Hookshot").unwrap();
    let c = fx.compile("Hookshot and (Bow)").unwrap();
    assert!(a.ptr_eq(&b));
    assert!(a.ptr_eq(&c));
    assert_eq!(fx.cache.len(), 1);
}

#[test]
fn empty_rule_text_means_always() {
    let mut fx = Fixture::new();
    assert!(fx.compile("").unwrap().is_always());
    assert!(fx.compile("   # just a note").unwrap().is_always());
}

// --- Folding ------------------------------------------------------------------

#[test]
fn boolean_groups_fold() {
    let mut fx = Fixture::new();
    let (bow, hookshot) = (fx.id("Bow"), fx.id("Hookshot"));
    assert_eq!(fx.lower("Bow and (Hookshot and Bow)").unwrap(), Expr::HasAll(vec![bow, hookshot]));
    assert_eq!(fx.lower("Bow and False").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("Bow or True").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("not not Bow").unwrap(), Expr::Item(bow));
    assert_eq!(fx.lower("Bow and shuffle_scrubs").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("Bow or shuffle_scrubs").unwrap(), Expr::Item(bow));
}

#[test]
fn setting_comparisons_fold_to_constants() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("open_forest == 'closed_deku'").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("open_forest != 'closed_deku'").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("bridge in ('open', 'vanilla')").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("bridge not in ('open', 'vanilla')").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("bridge_tokens >= 2 and bridge_tokens < 100").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("0 < bridge_tokens <= 2").unwrap(), Expr::Const(false));
    assert!(matches!(fx.lower("bridge_tokens < 'x'"), Err(CompileError::Unsupported { .. })));
}

#[test]
fn attribute_subscripts() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("dungeon_mq['Deku Tree']").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("dungeon_mq[Water_Temple] or Bow").unwrap(), Expr::Item(fx.id("Bow")));
    assert!(matches!(fx.lower("dungeon_mq['Fire Temple']"), Err(CompileError::Unsupported { .. })));
}

#[test]
fn literal_arithmetic_uses_floor_semantics() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("7 // 2 == 3").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("-7 // 2 == -4").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("-7 % 3 == 2").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("bridge_tokens * 2 - 1 == 5").unwrap(), Expr::Const(true));
    assert!(matches!(fx.lower("Bow + 1 == 2"), Err(CompileError::Unsupported { .. })));
    assert!(matches!(fx.lower("1 // 0 == 0"), Err(CompileError::Unsupported { .. })));
}

#[test]
fn bare_name_equality_compares_names() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("Forest == Forest").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("Forest == Fire").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("Forest != Fire").unwrap(), Expr::Const(true));
    assert!(fx.ledger.events().next().is_none());
}

// --- Name resolution ----------------------------------------------------------

#[test]
fn capitalized_unknown_names_declare_events() {
    let mut fx = Fixture::new();
    let before = fx.catalog.len();
    let expr = fx.lower("Time_Travel and Bow").unwrap();
    let event = fx.catalog.lookup("Time Travel").unwrap();
    assert_eq!(fx.catalog.len(), before + 1);
    assert!(fx.catalog.entry(event).event);
    assert_eq!(expr, Expr::HasAll(vec![fx.id("Bow"), event]));
    assert_eq!(fx.ledger.events().collect::<Vec<_>>(), vec!["Time Travel"]);
}

#[test]
fn string_literals_are_item_checks() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("'Bow'").unwrap(), Expr::Item(fx.id("Bow")));
    let expr = fx.lower("'Drain Well'").unwrap();
    assert_eq!(expr, Expr::Item(fx.id("Drain Well")));
}

#[test]
fn dead_branches_still_declare_their_events() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("False and Water_Drained").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("Bow or True or at('Lake', Hookshot)").unwrap(), Expr::Const(true));
    assert!(fx.catalog.lookup("Water Drained").is_some());
    assert_eq!(fx.ledger.pending(), 1);
}

#[test]
fn unresolvable_names_are_errors() {
    let mut fx = Fixture::new();
    match fx.compile("Bow and lowercase_thing") {
        Err(CompileError::UnknownName { name, spot, ast }) => {
            assert_eq!(name, "lowercase_thing");
            assert_eq!(spot, "<no spot>");
            assert_eq!(ast, "lowercase_thing");
        }
        other => panic!("expected unknown name, got {other:?}"),
    }
    assert!(matches!(fx.compile("frobnicate(Bow)"), Err(CompileError::UnknownFunction { .. })));
    assert!(matches!(fx.compile("age"), Err(CompileError::Unsupported { .. })));
}

#[test]
fn errors_name_the_spot() {
    let mut fx = Fixture::new();
    let anchor = Anchor::new("KF Midos Top Left Chest", "KF Midos House");
    let ast = parse_rule("has(Bow, 'many')").unwrap();
    match fx.compiler().compile_ast(&ast, Some(&anchor)) {
        Err(CompileError::InvalidArgument { spot, name, .. }) => {
            assert_eq!(spot, "KF Midos Top Left Chest");
            assert_eq!(name, "has");
        }
        other => panic!("expected invalid argument, got {other:?}"),
    }
}

// --- Count tuples -------------------------------------------------------------

#[test]
fn count_tuples() {
    let mut fx = Fixture::new();
    let bow = fx.id("Bow");
    assert_eq!(fx.lower("(Bow, 2)").unwrap(), Expr::ItemCount(bow, 2));
    assert_eq!(fx.lower("(Bow, bridge_tokens)").unwrap(), Expr::ItemCount(bow, 3));
    assert_eq!(fx.lower("('Bow', 1)").unwrap(), Expr::Item(bow));
    assert_eq!(fx.lower("(Bow, 0)").unwrap(), Expr::Const(true));
    assert!(matches!(fx.lower("(Bow, 'x')"), Err(CompileError::CountTuple { .. })));
    assert!(matches!(fx.lower("(1, 2)"), Err(CompileError::CountTuple { .. })));
    assert!(matches!(fx.lower("(Bow, 1, 2)"), Err(CompileError::CountTuple { .. })));
    assert!(matches!(fx.lower("(Bow, open_forest)"), Err(CompileError::CountTuple { .. })));
}

// --- Helpers and builtins -----------------------------------------------------

#[test]
fn helpers_expand_with_arguments() {
    let mut fx = Fixture::new();
    let rule = fx.compile("can_use(Hookshot)").unwrap();
    let state = fx.state(&["Hookshot"]);
    assert!(rule.check_as(&state, Some(Age::Adult), TimeOfDay::NONE));
    assert!(!rule.check_as(&state, Some(Age::Child), TimeOfDay::NONE));
    assert!(!rule.check_as(&fx.state(&[]), Some(Age::Adult), TimeOfDay::NONE));
}

#[test]
fn helper_arity_and_recursion_are_checked() {
    let mut fx = Fixture::new();
    match fx.lower("can_use(Bow, Hookshot)") {
        Err(CompileError::Arity { name, expected, found, .. }) => {
            assert_eq!((name.as_str(), expected, found), ("can_use", 1, 2));
        }
        other => panic!("expected arity error, got {other:?}"),
    }
    assert!(matches!(fx.lower("ouroboros"), Err(CompileError::RecursionLimit { .. })));
}

#[test]
fn builtins_lower_to_state_calls() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("has_bottle()").unwrap(), Expr::Call(Builtin::HasBottle));
    assert_eq!(fx.lower("has_bottle").unwrap(), Expr::Call(Builtin::HasBottle));
    assert_eq!(fx.lower("has_medallions(bridge_tokens)").unwrap(), Expr::Call(Builtin::HasMedallions(3)));
    assert_eq!(fx.lower("has_stones(0)").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("won()").unwrap(), Expr::Call(Builtin::Won));
    assert_eq!(fx.lower("guarantee_hint()").unwrap(), Expr::Item(fx.id("Bow")));
    assert_eq!(
        fx.lower("has_all_of((Bow, Hookshot))").unwrap(),
        Expr::HasAll(vec![fx.id("Bow"), fx.id("Hookshot")])
    );
    assert_eq!(fx.lower("has_any_of(Bow, 'Sticks')").unwrap(), Expr::HasAny(vec![fx.id("Sticks"), fx.id("Bow")]));
    assert_eq!(fx.lower("has(Bow, 2)").unwrap(), Expr::ItemCount(fx.id("Bow"), 2));
    assert!(matches!(fx.lower("has_hearts()"), Err(CompileError::Arity { .. })));
}

#[test]
fn folded_builtins_read_the_world_profile() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("can_live_dmg(0.5)").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("had_night_start()").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("region_has_shortcuts('Deku Tree Lobby')").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("region_has_shortcuts('Water Temple Lobby')").unwrap(), Expr::Const(false));

    fx.profile.settings.set("damage_multiplier", "quadruple");
    fx.profile.settings.set("starting_tod", "witching-hour");
    assert_eq!(fx.lower("can_live_dmg(0.5)").unwrap(), Expr::Const(true));
    assert_eq!(fx.lower("can_live_dmg(1)").unwrap(), Expr::Const(false));
    assert_eq!(fx.lower("had_night_start()").unwrap(), Expr::Const(true));

    fx.profile.settings.set("damage_multiplier", "ohko");
    assert_eq!(fx.lower("can_live_dmg(0.5)").unwrap(), Expr::Const(false));
}

#[test]
fn song_notes_become_button_requirements() {
    let mut fx = Fixture::new();
    fx.profile = fx.profile.clone().with_song("Suns Song", ">v>v");
    let expr = fx.lower("has_all_notes_for_song(Suns_Song)").unwrap();
    assert_eq!(expr, Expr::HasAll(vec![fx.id("Ocarina C down Button"), fx.id("Ocarina C right Button")]));
    assert_eq!(fx.lower("has_all_notes_for_song('Scarecrow Song')").unwrap(), Expr::Call(Builtin::HasOcarinaButtons(2)));
    assert_eq!(fx.lower("has_all_notes_for_song('Unknown Song')").unwrap(), Expr::Const(true));
}

#[test]
fn count_operands_compare_at_runtime() {
    let mut fx = Fixture::new();
    let rule = fx.compile("item_count(Bow) >= 2").unwrap();
    assert!(!rule.check(&fx.state(&["Bow"])));
    assert!(rule.check(&fx.state(&["Bow", "Bow"])));

    let hearts = fx.compile("heart_count() > 3").unwrap();
    let pieces = ["Piece of Heart"; 4];
    assert!(!hearts.check(&fx.state(&[])));
    assert!(hearts.check(&fx.state(&pieces)));

    let name = fx.lower("Bow == 'Bow'").unwrap();
    assert_eq!(name, Expr::Const(true));
}

// --- Time of day --------------------------------------------------------------

#[test]
fn time_of_day_folds_away_without_tod_access() {
    let mut fx = Fixture::new();
    assert_eq!(fx.lower("at_night and Bow").unwrap(), Expr::Item(fx.id("Bow")));
    assert_eq!(fx.lower("at_dampe_time()").unwrap(), Expr::Const(true));
}

#[test]
fn time_of_day_checks_with_tod_access() {
    let mut fx = Fixture::new();
    fx.profile.ensure_tod_access = true;
    let escape = Expr::HasAll(vec![fx.id("Ocarina"), fx.id("Suns Song")]);
    assert_eq!(
        fx.lower("at_day").unwrap(),
        Expr::TimeOfDay { tod: TimeOfDay::DAY, escape: Some(Box::new(escape.clone())) }
    );
    assert_eq!(
        fx.lower("at_night()").unwrap(),
        Expr::TimeOfDay { tod: TimeOfDay::DAMPE, escape: Some(Box::new(escape)) }
    );
    assert_eq!(fx.lower("at_dampe_time").unwrap(), Expr::TimeOfDay { tod: TimeOfDay::DAMPE, escape: None });

    let rule = fx.compile("at_night").unwrap();
    let state = fx.state(&[]);
    assert!(rule.check_as(&state, None, TimeOfDay::NIGHT));
    assert!(!rule.check_as(&state, None, TimeOfDay::DAY));
    assert!(rule.check_as(&fx.state(&["Ocarina", "Suns Song"]), None, TimeOfDay::NONE));
}

#[test]
fn night_tokens_can_require_the_suns_song() {
    let mut fx = Fixture::new();
    fx.profile.settings.set("logic_no_night_tokens_without_suns_song", true);
    let token = Anchor::new("GS Lake Hylia Tree", "Lake Hylia").with_kind("GS Token");
    let chest = Anchor::new("Lake Chest", "Lake Hylia").with_kind("Chest");
    let escape = Expr::HasAll(vec![fx.id("Ocarina"), fx.id("Suns Song")]);
    assert_eq!(fx.lower_at("at_night", Some(&token)).unwrap(), escape);
    assert_eq!(fx.lower_at("at_night", Some(&chest)).unwrap(), Expr::Const(true));
}

// --- Subrules -----------------------------------------------------------------

#[test]
fn subrules_are_deduplicated_per_region() {
    let mut fx = Fixture::new();
    let anchor = Anchor::new("A Chest", "A");
    let first = fx.lower_at("at(\"B\", \"has(Y)\")", Some(&anchor)).unwrap();
    let second = fx.lower_at("Bow and at('B', 'has(Y)')", Some(&anchor)).unwrap();
    let event = fx.catalog.lookup("B Subrule 1").unwrap();
    assert_eq!(first, Expr::Item(event));
    assert_eq!(second, Expr::HasAll(vec![fx.id("Bow"), event]));
    assert_eq!(fx.ledger.pending(), 1);
    assert!(fx.catalog.lookup("B Subrule 2").is_none());

    fx.lower_at("at('B', has(Bow))", Some(&anchor)).unwrap();
    assert!(fx.catalog.lookup("B Subrule 2").is_some());
    assert_eq!(fx.ledger.pending(), 2);
}

#[test]
fn here_anchors_to_the_parent_region() {
    let mut fx = Fixture::new();
    let anchor = Anchor::new("Lake Chest", "Lake Hylia");
    let expr = fx.lower_at("here(Hookshot)", Some(&anchor)).unwrap();
    assert_eq!(expr, Expr::Item(fx.id("Lake Hylia Subrule 1")));
    assert!(matches!(fx.lower("here(Hookshot)"), Err(CompileError::InvalidArgument { .. })));
    assert!(matches!(fx.lower("at(Lake, Hookshot)"), Err(CompileError::InvalidArgument { .. })));

    let delayed = fx.ledger.take_delayed();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].region, "Lake Hylia");
    assert_eq!(delayed[0].ast, Ast::Name("Hookshot".into()));
    assert_eq!(fx.ledger.pending(), 0);
}

#[test]
fn quoted_subrule_bodies_can_name_items_and_events() {
    let mut fx = Fixture::new();
    let anchor = Anchor::new("A Chest", "A");
    assert_eq!(fx.lower_at("at(\"B\", \"Drain Well\")", Some(&anchor)).unwrap(), Expr::Item(fx.id("B Subrule 1")));
    assert_eq!(fx.lower_at("at('B', 'Drain Well')", Some(&anchor)).unwrap(), Expr::Item(fx.id("B Subrule 1")));
    assert_eq!(fx.lower_at("here('Hookshot')", Some(&anchor)).unwrap(), Expr::Item(fx.id("A Subrule 1")));

    let delayed = fx.ledger.take_delayed();
    assert_eq!(delayed.len(), 2);
    assert_eq!(delayed[0].ast, Ast::Str("Drain Well".into()));
    assert_eq!(delayed[1].ast, Ast::Str("Hookshot".into()));

    let target = Anchor::new(&delayed[0].event, "B").with_kind("Event");
    let body = fx.compiler().lower(&delayed[0].ast, Some(&target)).unwrap();
    assert_eq!(body, Expr::Item(fx.id("Drain Well")));
    assert!(fx.catalog.entry(fx.id("Drain Well")).event);
    let body = fx.compiler().lower(&delayed[1].ast, Some(&target)).unwrap();
    assert_eq!(body, Expr::Item(fx.id("Hookshot")));
}

#[test]
fn item_group_builtins_need_items() {
    let mut fx = Fixture::new();
    for text in ["has_any_of()", "has_all_of()", "has_any_of(())", "Bow and has_all_of()"] {
        match fx.compile(text) {
            Err(CompileError::InvalidArgument { name, reason, .. }) => {
                assert!(name == "has_any_of" || name == "has_all_of");
                assert_eq!(reason, "expected at least one item");
            }
            other => panic!("{text}: expected invalid argument, got {other:?}"),
        }
    }
    assert_eq!(fx.lower("has_any_of(Bow)").unwrap(), Expr::Item(fx.id("Bow")));
}

// --- Properties ---------------------------------------------------------------

const RULE_ITEMS: [&str; 4] = ["Bow", "Hookshot", "Sticks", "Kokiri_Sword"];

/// Rule text built from item checks, count tuples, `has` and constants joined
/// by `and` / `or`; no negation.
fn positive_rule() -> impl Strategy<Value = String> {
    let item = || prop::sample::select(RULE_ITEMS.to_vec());
    let leaf = prop_oneof![
        item().prop_map(str::to_string),
        item().prop_map(|name| format!("has({name})")),
        (item(), 1..4u32).prop_map(|(name, count)| format!("({name}, {count})")),
        (item(), 1..4u32).prop_map(|(name, count)| format!("has({name}, {count})")),
        Just("True".to_string()),
        Just("False".to_string()),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(|terms| format!("({})", terms.join(" and "))),
            prop::collection::vec(inner, 2..4).prop_map(|terms| format!("({})", terms.join(" or "))),
        ]
    })
}

proptest! {
    #[test]
    fn more_items_never_close_a_rule(
        text in positive_rule(),
        held in prop::collection::vec(prop::sample::select(RULE_ITEMS.to_vec()), 0..8),
        extra in prop::sample::select(RULE_ITEMS.to_vec()),
    ) {
        let mut fx = Fixture::new();
        let rule = fx.compile(&text).unwrap();
        prop_assert!(rule.ptr_eq(&fx.compile(&text).unwrap()));

        let mut state = fx.state(&[]);
        for name in &held {
            state.collect(fx.catalog.entry(fx.id(name)));
        }
        let before = rule.check(&state);
        state.collect(fx.catalog.entry(fx.id(extra)));
        prop_assert!(!before || rule.check(&state), "`{}` closed after collecting {}", text, extra);
    }
}
