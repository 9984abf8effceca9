use crate::model::{lower, raise, Inventory, Note, PetState, Rules, DEFAULT_PET_NAME, NAME_MAX};
use crate::scheduler::{Scheduler, TaskKind};
use crate::sim::Refusal;
use crate::storage::{KeyValueStore, KEY_CURRENCY, KEY_INVENTORY, KEY_NOTES, KEY_PET_NAME};
use std::time::Duration;

/// What the presentation layer must react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Signal {
    Refresh,
    Notice(String),
}

/// One run of the simulation: the pet, its economy and the tasks that decay it.
pub(crate) struct Session<S: KeyValueStore> {
    pub(crate) pet: PetState,
    pub(crate) currency: u32,
    pub(crate) inventory: Inventory,
    pub(crate) notes: Vec<Note>,
    pub(crate) name: String,
    pub(crate) rules: Rules,
    pub(crate) scheduler: Scheduler,
    store: S,
    signals: Vec<Signal>,
}

impl<S: KeyValueStore> Session<S> {
    /// Reads the persisted economy, notes and name; anything unreadable is
    /// treated as absent. The scheduler stays idle until [`Session::begin`].
    pub(crate) fn load(store: S, rules: Rules) -> Self {
        let currency = match store.get(KEY_CURRENCY) {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                log::warn!("ignoring malformed currency {raw:?}");
                rules.starting_coins
            }),
            None => rules.starting_coins,
        };
        let inventory = match store.get(KEY_INVENTORY) {
            Some(raw) => Inventory::from_json(&raw).unwrap_or_else(|| {
                log::warn!("ignoring malformed inventory");
                Inventory::default()
            }),
            None => Inventory::default(),
        };
        let notes = match store.get(KEY_NOTES) {
            Some(raw) => serde_json::from_str::<Vec<Note>>(&raw).unwrap_or_else(|e| {
                log::warn!("ignoring malformed notes: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let name = store
            .get(KEY_PET_NAME)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_PET_NAME.to_string());

        Self {
            pet: PetState::default(),
            currency,
            inventory,
            notes,
            name,
            rules,
            scheduler: Scheduler::default(),
            store,
            signals: Vec::new(),
        }
    }

    /// Names the pet and starts the decay clock.
    pub(crate) fn begin(&mut self, chosen_name: &str) {
        let trimmed: String = chosen_name.trim().chars().take(NAME_MAX).collect();
        self.name = if trimmed.is_empty() {
            DEFAULT_PET_NAME.to_string()
        } else {
            trimmed
        };
        let name = self.name.clone();
        self.write(KEY_PET_NAME, &name);
        self.scheduler.start(&self.rules);
        log::info!("session started for {}", self.name);
        self.emit(Signal::Refresh);
    }

    pub(crate) fn controls_enabled(&self) -> bool {
        self.pet.alive
    }

    /// Moves session time forward and runs every tick that became due.
    pub(crate) fn advance(&mut self, dt: Duration) {
        self.scheduler.advance(dt);
        while let Some(kind) = self.scheduler.next_due() {
            self.run_task(kind);
        }
    }

    pub(crate) fn run_task(&mut self, kind: TaskKind) {
        if !self.pet.alive {
            return;
        }
        log::debug!("tick {kind:?} at {:?}", self.scheduler.elapsed());
        let step = self.rules.decay_step;
        match kind {
            TaskKind::HungerDecay => {
                self.pet.hunger = lower(self.pet.hunger, step);
                self.recompute();
            }
            TaskKind::SleepDecay => {
                self.pet.sleep = lower(self.pet.sleep, step);
                self.recompute();
            }
            TaskKind::EntertainmentDecay => {
                self.pet.entertainment = lower(self.pet.entertainment, step);
                self.recompute();
            }
            TaskKind::HappinessRefresh => {
                self.pet.derive_happiness();
                self.recompute();
            }
            TaskKind::Allowance => {
                self.currency = self.currency.saturating_add(1);
                self.persist_economy();
                self.emit(Signal::Refresh);
            }
        }
    }

    /// The single place happiness and health are derived and death is checked.
    pub(crate) fn recompute(&mut self) {
        self.pet.derive();
        if self.pet.health == 0 && self.pet.alive {
            self.die();
        }
        self.emit(Signal::Refresh);
        self.persist_economy();
    }

    fn die(&mut self) {
        self.pet.alive = false;
        let cancelled = self.scheduler.cancel_all();
        log::info!("{} died after {:?} ({cancelled} tasks cancelled)", self.name, self.scheduler.elapsed());
        let msg = format!("💀 {} has passed away... reset to try again.", self.name);
        self.notify(msg);
    }

    /// Each snake point pays out without cascading into health; the next
    /// tick or action picks the entertainment change up.
    pub(crate) fn reward_snake_point(&mut self) {
        if !self.pet.alive {
            return;
        }
        self.currency = self.currency.saturating_add(1);
        self.pet.entertainment = raise(self.pet.entertainment, u32::from(self.rules.snake_boost));
        self.persist_economy();
        self.emit(Signal::Refresh);
    }

    pub(crate) fn add_note(&mut self, title: &str, body: &str) -> Result<(), Refusal> {
        let title = title.trim();
        if title.is_empty() {
            self.notify(Refusal::MissingTitle.to_string());
            return Err(Refusal::MissingTitle);
        }
        self.notes.push(Note {
            title: title.to_string(),
            body: body.trim().to_string(),
            created_at: Some(chrono::Utc::now()),
        });
        match serde_json::to_string(&self.notes) {
            Ok(json) => self.write(KEY_NOTES, &json),
            Err(e) => log::warn!("could not encode notes: {e}"),
        }
        self.notify("📝 Reminder saved");
        self.emit(Signal::Refresh);
        Ok(())
    }

    pub(crate) fn show_note(&mut self, index: usize) {
        let Some(note) = self.notes.get(index) else {
            return;
        };
        let body = if note.body.is_empty() {
            "(empty)"
        } else {
            note.body.as_str()
        };
        let msg = format!("📌 {}: {}", note.title, body);
        self.notify(msg);
    }

    pub(crate) fn persist_economy(&mut self) {
        let currency = self.currency.to_string();
        let inventory = self.inventory.to_json();
        self.write(KEY_CURRENCY, &currency);
        self.write(KEY_INVENTORY, &inventory);
    }

    pub(crate) fn stored_name(&self) -> Option<String> {
        self.store.get(KEY_PET_NAME)
    }

    pub(crate) fn forget_name(&mut self) {
        if let Err(e) = self.store.remove(KEY_PET_NAME) {
            log::warn!("could not clear pet name: {e:#}");
        }
        self.name = DEFAULT_PET_NAME.to_string();
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("could not persist {key}: {e:#}");
        }
    }

    pub(crate) fn notify(&mut self, msg: impl Into<String>) {
        self.emit(Signal::Notice(msg.into()));
    }

    pub(crate) fn emit(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    pub(crate) fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }
}
