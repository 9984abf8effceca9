use crate::model::{catalog_item, raise, Effect, PetState, CATALOG};
use crate::session::{Session, Signal};
use crate::storage::KeyValueStore;
use thiserror::Error;

/// A refused action. The message is what the player is told.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum Refusal {
    #[error("the pet is no longer with us")]
    Deceased,
    #[error("No apples left. Buy some in the shop 🛒")]
    NothingToEat,
    #[error("Not enough coins 🪙")]
    InsufficientFunds { price: u32, balance: u32 },
    #[error("You don't have enough units.")]
    InsufficientUnits { requested: u32, held: u32 },
    #[error("Pick at least one unit.")]
    InvalidQuantity,
    #[error("The shop doesn't sell {0}.")]
    UnknownItem(String),
    #[error("Enter a title")]
    MissingTitle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    Feed,
    Play,
    Sleep,
    Buy(&'static str),
    UseItem { item: String, qty: u32 },
    Reset { keep_identity: bool },
}

impl<S: KeyValueStore> Session<S> {
    pub(crate) fn apply(&mut self, action: PlayerAction) -> Result<(), Refusal> {
        match action {
            PlayerAction::Feed => self.feed(),
            PlayerAction::Play => self.play(),
            PlayerAction::Sleep => self.nap(),
            PlayerAction::Buy(id) => self.buy(id),
            PlayerAction::UseItem { item, qty } => self.use_item(&item, qty),
            PlayerAction::Reset { keep_identity } => {
                self.reset(keep_identity);
                Ok(())
            }
        }
    }

    /// Eats one unit of the first held item that restores hunger.
    pub(crate) fn feed(&mut self) -> Result<(), Refusal> {
        self.ensure_alive()?;
        let food = CATALOG
            .iter()
            .filter(|it| matches!(it.effect, Effect::RestoreHunger(_)))
            .find(|it| self.inventory.count(it.id) > 0);
        match food {
            Some(item) => self.use_item(item.id, 1),
            None => self.refuse(Refusal::NothingToEat),
        }
    }

    pub(crate) fn play(&mut self) -> Result<(), Refusal> {
        self.ensure_alive()?;
        self.pet.entertainment =
            raise(self.pet.entertainment, u32::from(self.rules.play_boost));
        self.notify(format!("🎲 You played with {}. +Entertainment", self.name));
        self.recompute();
        Ok(())
    }

    pub(crate) fn nap(&mut self) -> Result<(), Refusal> {
        self.ensure_alive()?;
        self.pet.sleep = raise(self.pet.sleep, u32::from(self.rules.nap_boost));
        self.notify(format!("💤 {} took a nap.", self.name));
        self.recompute();
        Ok(())
    }

    pub(crate) fn buy(&mut self, id: &str) -> Result<(), Refusal> {
        self.ensure_alive()?;
        let Some(item) = catalog_item(id) else {
            return self.refuse(Refusal::UnknownItem(id.to_string()));
        };
        if self.currency < item.price {
            return self.refuse(Refusal::InsufficientFunds {
                price: item.price,
                balance: self.currency,
            });
        }
        self.currency -= item.price;
        self.inventory.add(item, 1);
        log::debug!("bought {} for {}, {} coins left", item.id, item.price, self.currency);
        self.notify(format!("{} You bought one {}", item.icon, item.name.to_lowercase()));
        self.persist_economy();
        self.emit(Signal::Refresh);
        Ok(())
    }

    pub(crate) fn use_item(&mut self, id: &str, qty: u32) -> Result<(), Refusal> {
        self.ensure_alive()?;
        if qty == 0 {
            return self.refuse(Refusal::InvalidQuantity);
        }
        let held = self.inventory.count(id);
        if held < qty {
            return self.refuse(Refusal::InsufficientUnits {
                requested: qty,
                held,
            });
        }
        match catalog_item(id).map(|it| (it, it.effect)) {
            Some((item, Effect::RestoreHunger(per_unit))) => {
                let gain = u32::from(per_unit).saturating_mul(qty);
                self.pet.hunger = raise(self.pet.hunger, gain);
                self.notify(format!(
                    "{} You used {qty} {}(s). +{gain} hunger",
                    item.icon,
                    item.name.to_lowercase()
                ));
            }
            None => log::warn!("using {id}, which has no known effect"),
        }
        self.inventory.take(id, qty);
        self.persist_economy();
        self.recompute();
        Ok(())
    }

    /// Brings the pet back to a fresh start. The economy is kept.
    pub(crate) fn reset(&mut self, keep_identity: bool) {
        if !keep_identity {
            self.forget_name();
        }
        self.pet = PetState::default();
        self.scheduler.start(&self.rules);
        log::info!("session reset (keep name: {keep_identity})");
        self.emit(Signal::Refresh);
    }

    fn ensure_alive(&self) -> Result<(), Refusal> {
        if self.pet.alive {
            Ok(())
        } else {
            Err(Refusal::Deceased)
        }
    }

    fn refuse(&mut self, why: Refusal) -> Result<(), Refusal> {
        self.notify(why.to_string());
        Err(why)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_PET_NAME, APPLE};
    use crate::session::tests::started;
    use crate::storage::{KEY_INVENTORY, KEY_PET_NAME};
    use std::time::Duration;

    fn last_notice<S: KeyValueStore>(s: &mut Session<S>) -> Option<String> {
        s.drain_signals().into_iter().rev().find_map(|sig| match sig {
            Signal::Notice(m) => Some(m),
            Signal::Refresh => None,
        })
    }

    #[test]
    fn buy_without_funds_changes_nothing() {
        let mut s = started();
        s.currency = 3;
        let err = s.apply(PlayerAction::Buy("apple")).unwrap_err();
        assert_eq!(err, Refusal::InsufficientFunds { price: 5, balance: 3 });
        assert_eq!(s.currency, 3);
        assert!(s.inventory.is_empty());
        assert_eq!(last_notice(&mut s).as_deref(), Some("Not enough coins 🪙"));
    }

    #[test]
    fn buy_creates_the_entry_without_recompute() {
        let mut s = started();
        s.apply(PlayerAction::Buy("apple")).unwrap();
        assert_eq!(s.currency, 10);
        assert_eq!(s.inventory.count("apple"), 1);
        assert_eq!(s.pet.health, 100);
        assert!(s.store().get(KEY_INVENTORY).unwrap().contains(r#""count":1"#));

        s.apply(PlayerAction::Buy("apple")).unwrap();
        assert_eq!(s.inventory.count("apple"), 2);
        assert_eq!(s.currency, 5);
    }

    #[test]
    fn buying_an_unknown_item_is_refused() {
        let mut s = started();
        assert_eq!(s.buy("pear"), Err(Refusal::UnknownItem("pear".into())));
        assert_eq!(s.currency, 15);
    }

    #[test]
    fn using_more_than_held_changes_nothing() {
        let mut s = started();
        s.inventory.add(&APPLE, 1);
        let err = s
            .apply(PlayerAction::UseItem { item: "apple".into(), qty: 2 })
            .unwrap_err();
        assert_eq!(err, Refusal::InsufficientUnits { requested: 2, held: 1 });
        assert_eq!(s.inventory.count("apple"), 1);
        assert_eq!(s.pet.hunger, 50);
        assert_eq!(last_notice(&mut s).as_deref(), Some("You don't have enough units."));
    }

    #[test]
    fn using_zero_units_is_refused() {
        let mut s = started();
        s.inventory.add(&APPLE, 1);
        assert_eq!(s.use_item("apple", 0), Err(Refusal::InvalidQuantity));
        assert_eq!(s.inventory.count("apple"), 1);
    }

    #[test]
    fn use_item_scales_by_quantity_and_clamps() {
        let mut s = started();
        s.inventory.add(&APPLE, 5);
        s.use_item("apple", 2).unwrap();
        assert_eq!(s.pet.hunger, 90);
        assert_eq!(s.inventory.count("apple"), 3);
        s.use_item("apple", 3).unwrap();
        assert_eq!(s.pet.hunger, 100);
        assert!(s.inventory.get("apple").is_none());
        // (70 + 50) / 2 = 60, (100 + 70 + 60) / 3 = 76.67
        assert_eq!((s.pet.happiness, s.pet.health), (60, 77));
    }

    #[test]
    fn feed_eats_one_apple() {
        let mut s = started();
        s.inventory.add(&APPLE, 1);
        s.apply(PlayerAction::Feed).unwrap();
        assert_eq!(s.pet.hunger, 70);
        assert_eq!(s.inventory.count("apple"), 0);
        assert!(s.inventory.is_empty());
        assert_eq!(s.store().get(KEY_INVENTORY).as_deref(), Some("{}"));
    }

    #[test]
    fn feed_without_food_tells_the_player() {
        let mut s = started();
        assert_eq!(s.feed(), Err(Refusal::NothingToEat));
        assert_eq!(s.pet.hunger, 50);
        assert_eq!(
            last_notice(&mut s).as_deref(),
            Some("No apples left. Buy some in the shop 🛒")
        );
    }

    #[test]
    fn play_and_sleep_raise_and_recompute() {
        let mut s = started();
        s.apply(PlayerAction::Play).unwrap();
        assert_eq!(s.pet.entertainment, 65);
        // (70 + 65) / 2 = 67.5
        assert_eq!(s.pet.happiness, 68);
        assert_eq!(last_notice(&mut s).as_deref(), Some("🎲 You played with Biscuit. +Entertainment"));

        s.pet.sleep = 90;
        s.apply(PlayerAction::Sleep).unwrap();
        assert_eq!(s.pet.sleep, 100);
        assert_eq!(s.pet.happiness, 83);
    }

    #[test]
    fn a_dead_pet_accepts_no_actions() {
        let mut s = started();
        s.inventory.add(&APPLE, 2);
        s.pet.alive = false;
        let before = s.pet;
        for action in [
            PlayerAction::Feed,
            PlayerAction::Play,
            PlayerAction::Sleep,
            PlayerAction::Buy("apple"),
            PlayerAction::UseItem { item: "apple".into(), qty: 1 },
        ] {
            assert_eq!(s.apply(action), Err(Refusal::Deceased));
        }
        assert_eq!(s.pet, before);
        assert_eq!(s.currency, 15);
        assert_eq!(s.inventory.count("apple"), 2);
        assert_eq!(last_notice(&mut s), None);
    }

    #[test]
    fn reset_after_death_keeps_the_economy() {
        let mut s = started();
        s.apply(PlayerAction::Buy("apple")).unwrap();
        s.pet.hunger = 0;
        s.pet.sleep = 0;
        s.pet.entertainment = 0;
        s.recompute();
        assert!(!s.pet.alive);

        s.apply(PlayerAction::Reset { keep_identity: true }).unwrap();
        assert_eq!(s.pet, PetState::default());
        assert!(s.controls_enabled());
        assert_eq!(s.currency, 10);
        assert_eq!(s.inventory.count("apple"), 1);
        assert_eq!(s.name, "Biscuit");
        assert!(s.scheduler.is_running());
        assert_eq!(s.scheduler.elapsed(), Duration::ZERO);
    }

    #[test]
    fn reset_can_forget_the_name() {
        let mut s = started();
        s.reset(false);
        assert_eq!(s.name, DEFAULT_PET_NAME);
        assert_eq!(s.store().get(KEY_PET_NAME), None);
    }

    #[test]
    fn reset_while_alive_restarts_the_clock_once() {
        let mut s = started();
        s.advance(Duration::from_secs(35));
        s.reset(true);
        s.advance(Duration::from_secs(30));
        // one allowance from before the reset, one after
        assert_eq!(s.currency, 17);
        assert_eq!(s.pet.hunger, 50);
    }
}
