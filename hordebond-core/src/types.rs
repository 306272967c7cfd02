//! Domain types for the hordebond link record.
//!
//! Everything that crosses the host-document boundary is serde-serializable;
//! bond records travel as loosely typed JSON inside the horde's own document,
//! so all persisted structs tolerate missing fields on read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label stamped on every rule this module owns. Lets later reads
/// distinguish bond-owned rules from unrelated modifiers the host merged in.
pub const BOND_SOURCE: &str = "hordebond";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a host entity (summoner or horde).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a connected user session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Stat enumeration
// ---------------------------------------------------------------------------

/// The enumerated skill list mirrored between summoner and horde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Acrobatics,
    Arcana,
    Athletics,
    Crafting,
    Deception,
    Diplomacy,
    Intimidation,
    Medicine,
    Nature,
    Occultism,
    Performance,
    Religion,
    Society,
    Stealth,
    Survival,
    Thievery,
}

impl Skill {
    /// Every skill, in display order.
    pub const ALL: [Skill; 16] = [
        Skill::Acrobatics,
        Skill::Arcana,
        Skill::Athletics,
        Skill::Crafting,
        Skill::Deception,
        Skill::Diplomacy,
        Skill::Intimidation,
        Skill::Medicine,
        Skill::Nature,
        Skill::Occultism,
        Skill::Performance,
        Skill::Religion,
        Skill::Society,
        Skill::Stealth,
        Skill::Survival,
        Skill::Thievery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Acrobatics => "acrobatics",
            Skill::Arcana => "arcana",
            Skill::Athletics => "athletics",
            Skill::Crafting => "crafting",
            Skill::Deception => "deception",
            Skill::Diplomacy => "diplomacy",
            Skill::Intimidation => "intimidation",
            Skill::Medicine => "medicine",
            Skill::Nature => "nature",
            Skill::Occultism => "occultism",
            Skill::Performance => "performance",
            Skill::Religion => "religion",
            Skill::Society => "society",
            Skill::Stealth => "stealth",
            Skill::Survival => "survival",
            Skill::Thievery => "thievery",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector for one mirrored stat. Every persisted rule is tagged with one.
///
/// `MaxHp` carries the max-HP offset only; current and temporary HP are
/// mirrored as direct value copies, never as rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatSelector {
    Ac,
    Fortitude,
    Reflex,
    Will,
    Skill(Skill),
    MaxHp,
}

impl StatSelector {
    /// The three saving throws, in display order.
    pub const SAVES: [StatSelector; 3] = [
        StatSelector::Fortitude,
        StatSelector::Reflex,
        StatSelector::Will,
    ];

    /// Fallback used when the host has no value for a stat. Arithmetic never
    /// sees a missing value.
    pub fn baseline(&self) -> i32 {
        match self {
            StatSelector::Ac => 10,
            _ => 0,
        }
    }
}

impl fmt::Display for StatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatSelector::Ac => f.write_str("ac"),
            StatSelector::Fortitude => f.write_str("fortitude"),
            StatSelector::Reflex => f.write_str("reflex"),
            StatSelector::Will => f.write_str("will"),
            StatSelector::Skill(skill) => write!(f, "skill:{skill}"),
            StatSelector::MaxHp => f.write_str("max_hp"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync options
// ---------------------------------------------------------------------------

/// Independent per-category toggles for one link.
///
/// `saves` bundles fortitude/reflex/will; `skills` bundles the full
/// enumerated skill list. An all-false set is representable — syncing under
/// it writes an empty rule list, clearing any previous bond rules. Rejecting
/// that combination is the host dialog's concern, not this crate's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub ac: bool,
    pub saves: bool,
    pub skills: bool,
    pub hp: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            ac: true,
            saves: true,
            skills: true,
            hp: true,
        }
    }
}

impl SyncOptions {
    pub fn any_enabled(&self) -> bool {
        self.ac || self.saves || self.skills || self.hp
    }

    /// Every selector covered by the enabled categories, in stable order.
    /// Disabled categories contribute nothing, which is what retroactively
    /// clears their offsets on the next rule-list rebuild.
    pub fn selectors(&self) -> Vec<StatSelector> {
        let mut out = Vec::new();
        if self.ac {
            out.push(StatSelector::Ac);
        }
        if self.saves {
            out.extend(StatSelector::SAVES);
        }
        if self.skills {
            out.extend(Skill::ALL.iter().map(|s| StatSelector::Skill(*s)));
        }
        if self.hp {
            out.push(StatSelector::MaxHp);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Bond record
// ---------------------------------------------------------------------------

/// One persisted modifier entry inside a bond record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRule {
    pub selector: StatSelector,
    pub value: i32,
    /// Owner label; always [`BOND_SOURCE`] for rules this module writes.
    pub source: String,
}

impl BondRule {
    pub fn owned(selector: StatSelector, value: i32) -> Self {
        Self {
            selector,
            value,
            source: BOND_SOURCE.to_owned(),
        }
    }
}

/// The link from one horde entity to its summoner, stored inside the horde's
/// own document. At most one per horde; its lifecycle is the horde's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRecord {
    pub summoner_id: EntityId,
    #[serde(default)]
    pub options: SyncOptions,
    #[serde(default)]
    pub rules: Vec<BondRule>,
    /// Informational wall-clock marker; advances when a sync writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
}

impl BondRecord {
    /// The offset currently applied for `selector` by bond-owned rules.
    /// Zero when no rule targets the selector.
    pub fn applied_offset(&self, selector: StatSelector) -> i32 {
        self.rules
            .iter()
            .filter(|r| r.selector == selector && r.source == BOND_SOURCE)
            .map(|r| r.value)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Computed modifiers
// ---------------------------------------------------------------------------

/// The per-sync computed offsets, one entry per enabled selector.
///
/// Derived on every pass and flattened into the bond's rule list; never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifierSet {
    entries: Vec<(StatSelector, i32)>,
}

impl ModifierSet {
    pub fn push(&mut self, selector: StatSelector, offset: i32) {
        self.entries.push((selector, offset));
    }

    pub fn get(&self, selector: StatSelector) -> Option<i32> {
        self.entries
            .iter()
            .find(|(sel, _)| *sel == selector)
            .map(|(_, offset)| *offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatSelector, i32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Hit points
// ---------------------------------------------------------------------------

/// A hit-point snapshot. `max` is the fully derived maximum (bond rules
/// included); `value` and `temp` are the raw current figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HpState {
    pub value: i32,
    pub temp: i32,
    pub max: i32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
