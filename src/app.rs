use crate::config::{load_settings, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_command, Command};
use crate::model::{Rules, Scene, NAME_MAX};
use crate::render::{draw_alerts, draw_main, draw_overlay, Terminal};
use crate::session::{Session, Signal};
use crate::sim::PlayerAction;
use crate::snake::{Snake, Step};
use crate::storage::{FileStore, KeyValueStore};
use std::time::{Duration, Instant};

const ALERT_TTL: Duration = Duration::from_secs(4);
const NOTE_TITLE_MAX: usize = 40;
const NOTE_BODY_MAX: usize = 120;

pub(crate) struct Alert {
    pub(crate) text: String,
    pub(crate) expires_at: Instant,
}

/// Presentation-only state: which scene is up and what is being typed.
pub(crate) struct UiState {
    pub(crate) scene: Scene,
    pub(crate) name_edit: String,
    pub(crate) inv_cursor: usize,
    pub(crate) use_item: Option<String>,
    pub(crate) use_qty: u32,
    pub(crate) note_cursor: usize,
    pub(crate) title_edit: String,
    pub(crate) body_edit: String,
    pub(crate) editing_body: bool,
}

impl UiState {
    fn new(name_edit: String) -> Self {
        Self {
            scene: Scene::Start,
            name_edit,
            inv_cursor: 0,
            use_item: None,
            use_qty: 1,
            note_cursor: 0,
            title_edit: String::new(),
            body_edit: String::new(),
            editing_body: false,
        }
    }
}

pub(crate) struct App<S: KeyValueStore> {
    settings: Settings,
    session: Session<S>,
    ui: UiState,
    snake: Snake,
    alerts: Vec<Alert>,
    should_quit: bool,
    dirty: bool,
}

impl<S: KeyValueStore> App<S> {
    fn new(settings: Settings, session: Session<S>) -> Self {
        let name_edit = session.stored_name().unwrap_or_default();
        let snake = Snake::new(settings.seed);
        Self {
            settings,
            session,
            ui: UiState::new(name_edit),
            snake,
            alerts: Vec::new(),
            should_quit: false,
            dirty: true,
        }
    }

    fn handle(&mut self, cmd: Command) {
        self.dirty = true;
        match cmd {
            Command::Quit => self.should_quit = true,
            Command::Act(action) => {
                let needs_controls = !matches!(action, PlayerAction::Reset { .. });
                if needs_controls && !self.session.controls_enabled() {
                    return;
                }
                if let Err(why) = self.session.apply(action) {
                    log::debug!("action refused: {why:?}");
                }
            }
            Command::Open(scene) => self.open(scene),
            Command::Back => self.back(),
            Command::MoveCursor(delta) => {
                let (cursor, len) = match self.ui.scene {
                    Scene::Inventory => (&mut self.ui.inv_cursor, self.session.inventory.len()),
                    Scene::Notes => (&mut self.ui.note_cursor, self.session.notes.len()),
                    _ => return,
                };
                *cursor = step_cursor(*cursor, delta, len);
            }
            Command::AdjustQty(delta) => {
                let held = self
                    .ui
                    .use_item
                    .as_deref()
                    .map_or(0, |id| self.session.inventory.count(id));
                let next = i64::from(self.ui.use_qty) + i64::from(delta);
                self.ui.use_qty = next.clamp(1, i64::from(held.max(1))) as u32;
            }
            Command::Confirm => self.confirm(),
            Command::TextChar(ch) => {
                let (field, max) = match self.ui.scene {
                    Scene::Start => (&mut self.ui.name_edit, NAME_MAX),
                    Scene::NoteEdit if self.ui.editing_body => {
                        (&mut self.ui.body_edit, NOTE_BODY_MAX)
                    }
                    Scene::NoteEdit => (&mut self.ui.title_edit, NOTE_TITLE_MAX),
                    _ => return,
                };
                if field.chars().count() < max {
                    field.push(ch);
                }
            }
            Command::TextBackspace => match self.ui.scene {
                Scene::Start => {
                    self.ui.name_edit.pop();
                }
                Scene::NoteEdit if self.ui.editing_body => {
                    self.ui.body_edit.pop();
                }
                Scene::NoteEdit => {
                    self.ui.title_edit.pop();
                }
                _ => {}
            },
            Command::SwitchField => self.ui.editing_body = !self.ui.editing_body,
            Command::ResetAnswer { keep_identity } => {
                self.snake.reset();
                let _ = self.session.apply(PlayerAction::Reset { keep_identity });
                self.ui.scene = Scene::Main;
            }
            Command::SnakeTurn(dir) => self.snake.turn(dir),
            Command::SnakeStart => {
                if self.session.controls_enabled() {
                    self.snake.start();
                }
            }
            Command::SnakeStop => self.snake.stop(),
        }
    }

    fn open(&mut self, scene: Scene) {
        match scene {
            Scene::Shop | Scene::Snake if !self.session.controls_enabled() => return,
            Scene::Snake => self.snake.reset(),
            Scene::Inventory => {
                self.ui.inv_cursor = self
                    .ui
                    .inv_cursor
                    .min(self.session.inventory.len().saturating_sub(1));
            }
            Scene::NoteEdit => {
                self.ui.title_edit.clear();
                self.ui.body_edit.clear();
                self.ui.editing_body = false;
            }
            _ => {}
        }
        self.ui.scene = scene;
    }

    fn back(&mut self) {
        self.ui.scene = match self.ui.scene {
            Scene::Snake => {
                self.snake.reset();
                Scene::Main
            }
            Scene::UseAmount => Scene::Inventory,
            Scene::NoteEdit => Scene::Notes,
            Scene::Start => Scene::Start,
            _ => Scene::Main,
        };
    }

    fn confirm(&mut self) {
        match self.ui.scene {
            Scene::Start => {
                let name = self.ui.name_edit.clone();
                self.session.begin(&name);
                self.ui.scene = Scene::Main;
            }
            Scene::Inventory => {
                let picked = self
                    .session
                    .inventory
                    .iter()
                    .nth(self.ui.inv_cursor)
                    .map(|(id, _)| id.to_string());
                if let Some(id) = picked {
                    self.ui.use_item = Some(id);
                    self.ui.use_qty = 1;
                    self.ui.scene = Scene::UseAmount;
                }
            }
            Scene::UseAmount => {
                if let Some(item) = self.ui.use_item.take() {
                    let qty = self.ui.use_qty;
                    let _ = self.session.apply(PlayerAction::UseItem { item, qty });
                }
                self.open(Scene::Inventory);
            }
            Scene::Notes => self.session.show_note(self.ui.note_cursor),
            Scene::NoteEdit => {
                let (title, body) = (self.ui.title_edit.clone(), self.ui.body_edit.clone());
                if self.session.add_note(&title, &body).is_ok() {
                    self.ui.note_cursor = self.session.notes.len() - 1;
                    self.ui.scene = Scene::Notes;
                }
            }
            _ => {}
        }
    }

    /// One frame of simulation: decay ticks, then snake steps.
    fn update(&mut self, dt: Duration, snake_steps: u32) {
        self.session.advance(dt);

        if self.ui.scene == Scene::Snake {
            for _ in 0..snake_steps {
                match self.snake.step() {
                    Step::Idle => break,
                    Step::Moved => {}
                    Step::Ate => self.session.reward_snake_point(),
                    Step::Crashed { score } => {
                        self.session
                            .notify(format!("💥 The snake crashed. Score: {score}"));
                        break;
                    }
                }
                self.dirty = true;
            }
        }

        // death closes the screens whose controls it disables
        if !self.session.controls_enabled()
            && matches!(self.ui.scene, Scene::Snake | Scene::Shop)
        {
            self.snake.reset();
            self.ui.scene = Scene::Main;
        }

        let now = Instant::now();
        for signal in self.session.drain_signals() {
            self.dirty = true;
            if let Signal::Notice(text) = signal {
                log::debug!("notice: {text}");
                self.alerts.push(Alert {
                    text,
                    expires_at: now + ALERT_TTL,
                });
            }
        }
        let before = self.alerts.len();
        self.alerts.retain(|a| a.expires_at > now);
        if self.alerts.len() != before {
            self.dirty = true;
        }
    }

    fn render_frame(&mut self, term: &mut Terminal) -> anyhow::Result<()> {
        term.cur.clear(crossterm::style::Color::Black);
        if self.ui.scene != Scene::Start {
            draw_main(&mut term.cur, &self.session, &self.settings);
        }
        draw_overlay(&mut term.cur, &self.session, &self.ui, &self.snake, &self.settings);
        draw_alerts(&mut term.cur, &self.alerts, &self.settings);
        term.present()?;
        self.dirty = false;
        Ok(())
    }

    fn run_loop(&mut self, term: &mut Terminal) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let snake_dt = Duration::from_millis(self.settings.snake_step_ms.max(20));

        let mut last_frame = Instant::now();
        let mut snake_accum = Duration::ZERO;

        while !self.should_quit {
            if term.resize_if_needed()? {
                self.dirty = true;
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(cmd) = map_event_to_command(self.ui.scene, ev) {
                    self.handle(cmd);
                }
                if self.should_quit {
                    break;
                }
            }

            let now = Instant::now();
            let real_dt = now.saturating_duration_since(last_frame);
            last_frame = now;

            let mut snake_steps = 0;
            if self.snake.is_running() {
                snake_accum = snake_accum.saturating_add(real_dt);
                while snake_accum >= snake_dt {
                    snake_accum -= snake_dt;
                    snake_steps += 1;
                }
            } else {
                snake_accum = Duration::ZERO;
            }

            self.update(real_dt, snake_steps);

            if self.dirty {
                self.render_frame(term)?;
            }

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }
}

fn step_cursor(cursor: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    (cursor as i64 + i64::from(delta)).rem_euclid(len) as usize
}

pub(crate) fn run(paths: Paths) -> anyhow::Result<()> {
    let settings = load_settings(&paths.settings_path);
    let store = FileStore::open(paths.store_path.clone());
    let session = Session::load(store, Rules::default());
    log::info!(
        "loaded {} coins, {} item kinds, {} notes",
        session.currency,
        session.inventory.len(),
        session.notes.len()
    );

    let mut app = App::new(settings, session);
    let mut term = Terminal::begin()?;
    let result = app.run_loop(&mut term);
    term.end()?;
    result?;

    save_settings_atomic(&paths.settings_path, &app.settings)?;
    log::info!("bye");
    Ok(())
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::APPLE;
    use crate::storage::MemoryStore;

    fn app() -> App<MemoryStore> {
        let session = Session::load(MemoryStore::default(), Rules::default());
        App::new(Settings::default(), session)
    }

    fn started_app() -> App<MemoryStore> {
        let mut a = app();
        for ch in "Biscuit".chars() {
            a.handle(Command::TextChar(ch));
        }
        a.handle(Command::Confirm);
        a
    }

    #[test]
    fn start_screen_names_the_pet_and_starts_decay() {
        let a = started_app();
        assert_eq!(a.ui.scene, Scene::Main);
        assert_eq!(a.session.name, "Biscuit");
        assert!(a.session.scheduler.is_running());
    }

    #[test]
    fn nothing_decays_before_the_start_screen_is_confirmed() {
        let mut a = app();
        a.update(Duration::from_secs(600), 0);
        assert_eq!(a.session.pet.hunger, 50);
        assert_eq!(a.session.currency, 15);
    }

    #[test]
    fn notices_become_alerts() {
        let mut a = started_app();
        a.handle(Command::Act(PlayerAction::Feed));
        a.update(Duration::ZERO, 0);
        assert_eq!(a.alerts.len(), 1);
        assert!(a.alerts[0].text.starts_with("No apples left"));
    }

    #[test]
    fn inventory_use_flow_applies_the_chosen_amount() {
        let mut a = started_app();
        a.session.inventory.add(&APPLE, 3);
        a.handle(Command::Open(Scene::Inventory));
        a.handle(Command::Confirm);
        assert_eq!(a.ui.scene, Scene::UseAmount);
        a.handle(Command::AdjustQty(1));
        a.handle(Command::AdjustQty(5));
        assert_eq!(a.ui.use_qty, 3);
        a.handle(Command::AdjustQty(-1));
        a.handle(Command::Confirm);
        assert_eq!(a.ui.scene, Scene::Inventory);
        assert_eq!(a.session.inventory.count("apple"), 1);
        assert_eq!(a.session.pet.hunger, 90);
    }

    #[test]
    fn dead_pet_keeps_shop_and_snake_closed() {
        let mut a = started_app();
        a.session.pet.alive = false;
        a.handle(Command::Open(Scene::Shop));
        assert_eq!(a.ui.scene, Scene::Main);
        a.handle(Command::Open(Scene::Snake));
        assert_eq!(a.ui.scene, Scene::Main);

        a.handle(Command::Open(Scene::ConfirmReset));
        a.handle(Command::ResetAnswer { keep_identity: true });
        assert!(a.session.controls_enabled());
        assert_eq!(a.ui.scene, Scene::Main);
    }

    #[test]
    fn snake_points_pay_the_pet() {
        let mut a = started_app();
        a.handle(Command::Open(Scene::Snake));
        a.snake.apple = (10, 9);
        a.handle(Command::SnakeStart);
        a.update(Duration::ZERO, 1);
        assert_eq!(a.snake.score, 1);
        assert_eq!(a.session.currency, 16);
        assert_eq!(a.session.pet.entertainment, 58);
    }

    #[test]
    fn writing_a_note_returns_to_the_list() {
        let mut a = started_app();
        a.handle(Command::Open(Scene::Notes));
        a.handle(Command::Open(Scene::NoteEdit));
        a.handle(Command::Confirm);
        assert_eq!(a.ui.scene, Scene::NoteEdit);
        for ch in "vet".chars() {
            a.handle(Command::TextChar(ch));
        }
        a.handle(Command::SwitchField);
        a.handle(Command::TextChar('x'));
        a.handle(Command::Confirm);
        assert_eq!(a.ui.scene, Scene::Notes);
        assert_eq!(a.session.notes[0].title, "vet");
        assert_eq!(a.session.notes[0].body, "x");
    }

    #[test]
    fn cursor_wraps() {
        assert_eq!(step_cursor(0, -1, 3), 2);
        assert_eq!(step_cursor(2, 1, 3), 0);
        assert_eq!(step_cursor(5, 1, 0), 0);
    }
}
