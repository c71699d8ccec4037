//! Item catalog: display names to dense solver ids.
//!
//! Every item and event a rule can mention gets an [`ItemId`] the first time
//! it is referenced. Ids index the per-world counter vectors in
//! [`State`](crate::State), so they stay stable for the whole generation run.

use std::collections::HashMap;

handle!(
    /// Dense solver id of an item or event.
    ItemId
);

bitflags::bitflags! {
    /// Group membership used by the domain helpers on `State`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemClass: u8 {
        const BOTTLE         = 1 << 0;
        const MEDALLION      = 1 << 1;
        const STONE          = 1 << 2;
        const OCARINA_BUTTON = 1 << 3;
    }
}

/// Escape a display name into its identifier form (`Suns Song` -> `Suns_Song`).
pub fn escape_name(name: &str) -> String {
    regex!(r"['()\[\]-]").replace_all(&name.replace(' ', "_"), "").into_owned()
}

/// Item declaration handed to [`Catalog::declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDef {
    pub name: String,
    pub advancement: bool,
    pub junk: bool,
    /// Collecting this item counts as `n` copies of another item.
    pub alias: Option<(String, u32)>,
    pub class: ItemClass,
    pub ocarina_note: Option<char>,
}

impl ItemDef {
    /// An advancement item.
    pub fn advancement(name: impl Into<String>) -> Self {
        Self { name: name.into(), advancement: true, junk: false, alias: None, class: ItemClass::empty(), ocarina_note: None }
    }

    /// A junk item (never tracked by the solver).
    pub fn junk(name: impl Into<String>) -> Self {
        Self { junk: true, advancement: false, ..Self::advancement(name) }
    }

    pub fn alias(mut self, target: impl Into<String>, multiplier: u32) -> Self {
        self.alias = Some((target.into(), multiplier));
        self
    }

    pub fn class(mut self, class: ItemClass) -> Self {
        self.class |= class;
        self
    }

    /// Mark as the ocarina button playing `note` (one of `A < ^ v >`).
    pub fn ocarina_button(mut self, note: char) -> Self {
        self.class |= ItemClass::OCARINA_BUTTON;
        self.ocarina_note = Some(note);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub id: ItemId,
    pub name: String,
    pub escaped: String,
    pub advancement: bool,
    pub junk: bool,
    pub event: bool,
    pub alias: Option<(ItemId, u32)>,
    pub class: ItemClass,
    pub ocarina_note: Option<char>,
    /// Dungeon of a `Small Key Ring (<Dungeon>)`.
    pub keyring_dungeon: Option<String>,
}

/// Ids of the item groups and well-known items the state helpers need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemGroups {
    pub bottles: Vec<ItemId>,
    pub medallions: Vec<ItemId>,
    pub stones: Vec<ItemId>,
    pub ocarina_buttons: Vec<ItemId>,
    pub rutos_letter: Option<ItemId>,
    pub piece_of_heart: Option<ItemId>,
    pub triforce: Option<ItemId>,
    pub triforce_piece: Option<ItemId>,
}

impl ItemGroups {
    /// Medallions and stones together.
    pub fn dungeon_rewards(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.medallions.iter().chain(&self.stones).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<ItemEntry>,
    by_name: HashMap<String, ItemId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item, or refresh the classification of an already known
    /// name. Returns the (stable) id.
    pub fn declare(&mut self, def: ItemDef) -> ItemId {
        let alias = def.alias.as_ref().map(|(target, n)| {
            let target = self.lookup(target).unwrap_or_else(|| self.declare(ItemDef::advancement(target.as_str())));
            (target, *n)
        });
        let id = self.intern(&def.name);
        let entry = &mut self.entries[id.index()];
        entry.advancement = def.advancement;
        entry.junk = def.junk;
        entry.event = false;
        entry.alias = alias;
        entry.class = def.class;
        entry.ocarina_note = def.ocarina_note;
        id
    }

    /// Register an event item. Existing names keep their classification.
    pub fn declare_event(&mut self, name: &str) -> ItemId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let id = self.intern(name);
        self.entries[id.index()].event = true;
        id
    }

    /// Look up by display (`Suns Song`) or escaped (`Suns_Song`) name.
    pub fn lookup(&self, name: &str) -> Option<ItemId> {
        self.by_name.get(name).or_else(|| self.by_name.get(&escape_name(name))).copied()
    }

    pub fn entry(&self, id: ItemId) -> &ItemEntry {
        &self.entries[id.index()]
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemEntry> {
        self.entries.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemEntry> {
        self.entries.iter()
    }

    pub fn groups(&self) -> ItemGroups {
        let of = |class: ItemClass| self.entries.iter().filter(|e| e.class.contains(class)).map(|e| e.id).collect();
        ItemGroups {
            bottles: of(ItemClass::BOTTLE),
            medallions: of(ItemClass::MEDALLION),
            stones: of(ItemClass::STONE),
            ocarina_buttons: of(ItemClass::OCARINA_BUTTON),
            rutos_letter: self.lookup("Rutos Letter"),
            piece_of_heart: self.lookup("Piece of Heart"),
            triforce: self.lookup("Triforce"),
            triforce_piece: self.lookup("Triforce Piece"),
        }
    }

    /// Button item that plays `note`, if ocarina buttons are items at all.
    pub fn ocarina_button(&self, note: char) -> Option<ItemId> {
        self.entries.iter().find(|e| e.ocarina_note == Some(note)).map(|e| e.id)
    }

    /// `Boss Key (<Dungeon>)`, if declared.
    pub fn boss_key(&self, dungeon: &str) -> Option<ItemId> {
        self.lookup(&format!("Boss Key ({dungeon})"))
    }

    fn intern(&mut self, name: &str) -> ItemId {
        let escaped = escape_name(name);
        if let Some(&id) = self.by_name.get(&escaped) {
            return id;
        }
        let id = ItemId::from_index(self.entries.len());
        let keyring_dungeon =
            regex!(r"^Small Key Ring \((.+)\)$").captures(name).map(|caps| caps[1].to_string());
        self.entries.push(ItemEntry {
            id,
            name: name.to_string(),
            escaped: escaped.clone(),
            advancement: true,
            junk: false,
            event: false,
            alias: None,
            class: ItemClass::empty(),
            ocarina_note: None,
            keyring_dungeon,
        });
        self.by_name.insert(escaped, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_drops_punctuation_and_replaces_spaces() {
        assert_eq!(escape_name("Suns Song"), "Suns_Song");
        assert_eq!(escape_name("Rutos Letter"), "Rutos_Letter");
        assert_eq!(escape_name("Small Key Ring (Forest Temple)"), "Small_Key_Ring_Forest_Temple");
        assert_eq!(escape_name("Kokiri's Emerald"), "Kokiris_Emerald");
        assert_eq!(escape_name("Deku Stick [Drop]-X"), "Deku_Stick_DropX");
    }

    #[test]
    fn declare_is_idempotent_and_lookup_accepts_both_spellings() {
        let mut catalog = Catalog::new();
        let a = catalog.declare(ItemDef::advancement("Hover Boots"));
        let b = catalog.declare(ItemDef::advancement("Hover Boots"));
        assert_eq!(a, b);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("Hover Boots"), Some(a));
        assert_eq!(catalog.lookup("Hover_Boots"), Some(a));
        assert_eq!(catalog.lookup("Iron Boots"), None);
    }

    #[test]
    fn alias_target_is_declared_implicitly() {
        let mut catalog = Catalog::new();
        let bundle = catalog.declare(ItemDef::advancement("Bombchus (20)").alias("Bombchus", 20));
        let target = catalog.lookup("Bombchus").unwrap();
        assert_eq!(catalog.entry(bundle).alias, Some((target, 20)));
        assert!(catalog.entry(target).advancement);
    }

    #[test]
    fn events_do_not_override_real_items() {
        let mut catalog = Catalog::new();
        let id = catalog.declare(ItemDef::junk("Recovery Heart"));
        assert_eq!(catalog.declare_event("Recovery_Heart"), id);
        assert!(!catalog.entry(id).event);

        let event = catalog.declare_event("Forest Temple Clear");
        assert!(catalog.entry(event).event);
        assert!(catalog.entry(event).advancement);
    }

    #[test]
    fn groups_and_key_rings_are_recognized() {
        let mut catalog = Catalog::new();
        let bottle = catalog.declare(ItemDef::advancement("Bottle").class(ItemClass::BOTTLE));
        let light = catalog.declare(ItemDef::advancement("Light Medallion").class(ItemClass::MEDALLION));
        let a = catalog.declare(ItemDef::advancement("Ocarina A Button").ocarina_button('A'));
        let ring = catalog.declare(ItemDef::advancement("Small Key Ring (Forest Temple)"));
        let bk = catalog.declare(ItemDef::advancement("Boss Key (Forest Temple)"));

        let groups = catalog.groups();
        assert_eq!(groups.bottles, vec![bottle]);
        assert_eq!(groups.medallions, vec![light]);
        assert_eq!(groups.ocarina_buttons, vec![a]);
        assert_eq!(catalog.ocarina_button('A'), Some(a));
        assert_eq!(catalog.ocarina_button('>'), None);
        assert_eq!(catalog.entry(ring).keyring_dungeon.as_deref(), Some("Forest Temple"));
        assert_eq!(catalog.boss_key("Forest Temple"), Some(bk));
    }
}
