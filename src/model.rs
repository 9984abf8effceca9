use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) const METER_MAX: u8 = 100;
pub(crate) const DEFAULT_PET_NAME: &str = "MirandaPet";
pub(crate) const NAME_MAX: usize = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Start,
    Main,
    Shop,
    Inventory,
    UseAmount,
    Notes,
    NoteEdit,
    Snake,
    ConfirmReset,
    Help,
}

/// The portrait shown for the pet, most urgent need first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Portrait {
    Happy,
    Hungry,
    Sleepy,
    Sad,
    Deceased,
}

/// Resources and derived values, all within `0..=METER_MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PetState {
    pub(crate) hunger: u8,
    pub(crate) sleep: u8,
    pub(crate) entertainment: u8,
    pub(crate) happiness: u8,
    pub(crate) health: u8,
    pub(crate) alive: bool,
}

impl Default for PetState {
    fn default() -> Self {
        Self {
            hunger: 50,
            sleep: 70,
            entertainment: 50,
            happiness: 60,
            health: 100,
            alive: true,
        }
    }
}

impl PetState {
    pub(crate) fn derive_happiness(&mut self) {
        let sum = u32::from(self.sleep) + u32::from(self.entertainment);
        self.happiness = clamp_meter(round_div(sum, 2));
    }

    /// Re-derives happiness, then health from it.
    pub(crate) fn derive(&mut self) {
        self.derive_happiness();
        let sum =
            u32::from(self.hunger) + u32::from(self.sleep) + u32::from(self.happiness);
        self.health = clamp_meter(round_div(sum, 3));
    }

    pub(crate) fn portrait(&self) -> Portrait {
        const LOW: u8 = 20;
        if !self.alive {
            Portrait::Deceased
        } else if self.hunger <= LOW {
            Portrait::Hungry
        } else if self.sleep <= LOW {
            Portrait::Sleepy
        } else if self.entertainment <= LOW {
            Portrait::Sad
        } else {
            Portrait::Happy
        }
    }
}

/// Half-up integer rounding of `n / d`.
fn round_div(n: u32, d: u32) -> u32 {
    (2 * n + d) / (2 * d)
}

fn clamp_meter(v: u32) -> u8 {
    v.min(u32::from(METER_MAX)) as u8
}

pub(crate) fn raise(value: u8, amount: u32) -> u8 {
    clamp_meter(u32::from(value).saturating_add(amount))
}

pub(crate) fn lower(value: u8, amount: u8) -> u8 {
    value.saturating_sub(amount)
}

/* -----------------------------
   Shop catalog
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    RestoreHunger(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CatalogItem {
    pub(crate) id: &'static str,
    pub(crate) icon: &'static str,
    pub(crate) name: &'static str,
    pub(crate) price: u32,
    pub(crate) effect: Effect,
}

pub(crate) const APPLE: CatalogItem = CatalogItem {
    id: "apple",
    icon: "🍎",
    name: "Apple",
    price: 5,
    effect: Effect::RestoreHunger(20),
};

pub(crate) const CATALOG: &[CatalogItem] = &[APPLE];

pub(crate) fn catalog_item(id: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|it| it.id == id)
}

/* -----------------------------
   Inventory
------------------------------ */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InventoryEntry {
    pub(crate) icon: String,
    pub(crate) name: String,
    pub(crate) count: u32,
}

/// Held items keyed by catalog id. Entries never hold a zero count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Inventory {
    entries: BTreeMap<String, InventoryEntry>,
}

impl Inventory {
    pub(crate) fn from_json(s: &str) -> Option<Self> {
        let mut inv: Inventory = serde_json::from_str(s).ok()?;
        inv.entries.retain(|_, e| e.count > 0);
        Some(inv)
    }

    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub(crate) fn count(&self, id: &str) -> u32 {
        self.entries.get(id).map_or(0, |e| e.count)
    }

    pub(crate) fn get(&self, id: &str) -> Option<&InventoryEntry> {
        self.entries.get(id)
    }

    pub(crate) fn add(&mut self, item: &CatalogItem, qty: u32) {
        if qty == 0 {
            return;
        }
        let entry = self
            .entries
            .entry(item.id.to_string())
            .or_insert_with(|| InventoryEntry {
                icon: item.icon.to_string(),
                name: item.name.to_string(),
                count: 0,
            });
        entry.count = entry.count.saturating_add(qty);
    }

    /// Removes `qty` units; refuses (and changes nothing) when fewer are held.
    pub(crate) fn take(&mut self, id: &str, qty: u32) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if qty == 0 || entry.count < qty {
            return false;
        }
        entry.count -= qty;
        if entry.count == 0 {
            self.entries.remove(id);
        }
        true
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &InventoryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/* -----------------------------
   Notes
------------------------------ */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Note {
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
}

/* -----------------------------
   Rules
------------------------------ */

/// Fixed game rules. Cadences are in seconds of session time.
#[derive(Clone, Debug)]
pub(crate) struct Rules {
    pub(crate) hunger_every_secs: u64,
    pub(crate) sleep_every_secs: u64,
    pub(crate) entertainment_every_secs: u64,
    pub(crate) happiness_every_secs: u64,
    pub(crate) allowance_every_secs: u64,
    pub(crate) decay_step: u8,
    pub(crate) play_boost: u8,
    pub(crate) nap_boost: u8,
    pub(crate) snake_boost: u8,
    pub(crate) starting_coins: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            hunger_every_secs: 40,
            sleep_every_secs: 60,
            entertainment_every_secs: 90,
            happiness_every_secs: 50,
            allowance_every_secs: 30,
            decay_step: 5,
            play_boost: 15,
            nap_boost: 20,
            snake_boost: 8,
            starting_coins: 15,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RNGState {
    pub(crate) seed: u64,
    pub(crate) event_counter: u64,
}

impl RNGState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed,
            event_counter: 0,
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // counter-based SplitMix64
        let mut z = self
            .seed
            .wrapping_add(self.event_counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.event_counter = self.event_counter.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform in `0..n`; `n` must be non-zero.
    pub(crate) fn below(&mut self, n: u32) -> u32 {
        ((self.next_u64() >> 32) * u64::from(n) >> 32) as u32
    }
}
