use crate::model::Scene;
use crate::sim::PlayerAction;
use crate::snake::Dir;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Act(PlayerAction),
    Open(Scene),
    Back,
    Quit,
    MoveCursor(i32),
    AdjustQty(i32),
    Confirm,
    TextChar(char),
    TextBackspace,
    SwitchField,
    ResetAnswer { keep_identity: bool },
    SnakeTurn(Dir),
    SnakeStart,
    SnakeStop,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // tiny poll timeout keeps the frame loop responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

fn text_key(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Enter => Some(Command::Confirm),
        KeyCode::Esc => Some(Command::Back),
        KeyCode::Backspace => Some(Command::TextBackspace),
        KeyCode::Tab => Some(Command::SwitchField),
        KeyCode::Char(ch) if !ch.is_control() => Some(Command::TextChar(ch)),
        _ => None,
    }
}

pub(crate) fn map_event_to_command(scene: Scene, ev: InputEvent) -> Option<Command> {
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(Command::Quit);
    }

    // scenes that take typed text get every printable key
    match scene {
        Scene::Start => {
            return match text_key(ev.key) {
                Some(Command::SwitchField) => None,
                other => other.filter(|c| *c != Command::Back),
            }
        }
        Scene::NoteEdit => return text_key(ev.key),
        _ => {}
    }

    let key = match ev.key {
        KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
        other => other,
    };

    match scene {
        Scene::Main => match key {
            KeyCode::Char('f') => Some(Command::Act(PlayerAction::Feed)),
            KeyCode::Char('p') => Some(Command::Act(PlayerAction::Play)),
            KeyCode::Char('s') => Some(Command::Act(PlayerAction::Sleep)),
            KeyCode::Char('b') => Some(Command::Open(Scene::Shop)),
            KeyCode::Char('i') => Some(Command::Open(Scene::Inventory)),
            KeyCode::Char('n') => Some(Command::Open(Scene::Notes)),
            KeyCode::Char('g') => Some(Command::Open(Scene::Snake)),
            KeyCode::Char('r') => Some(Command::Open(Scene::ConfirmReset)),
            KeyCode::Char('h') => Some(Command::Open(Scene::Help)),
            KeyCode::Char('q') => Some(Command::Quit),
            _ => None,
        },
        Scene::Shop => match key {
            KeyCode::Char('1') | KeyCode::Char('a') | KeyCode::Enter => {
                Some(Command::Act(PlayerAction::Buy("apple")))
            }
            KeyCode::Esc | KeyCode::Char('b') => Some(Command::Back),
            _ => None,
        },
        Scene::Inventory | Scene::Notes => match key {
            KeyCode::Up => Some(Command::MoveCursor(-1)),
            KeyCode::Down => Some(Command::MoveCursor(1)),
            KeyCode::Enter => Some(Command::Confirm),
            KeyCode::Char('a') if scene == Scene::Notes => Some(Command::Open(Scene::NoteEdit)),
            KeyCode::Esc | KeyCode::Char('i') if scene == Scene::Inventory => Some(Command::Back),
            KeyCode::Esc | KeyCode::Char('n') if scene == Scene::Notes => Some(Command::Back),
            _ => None,
        },
        Scene::UseAmount => match key {
            KeyCode::Up | KeyCode::Right | KeyCode::Char('+') => Some(Command::AdjustQty(1)),
            KeyCode::Down | KeyCode::Left | KeyCode::Char('-') => Some(Command::AdjustQty(-1)),
            KeyCode::Enter => Some(Command::Confirm),
            KeyCode::Esc => Some(Command::Back),
            _ => None,
        },
        Scene::Snake => match key {
            KeyCode::Up => Some(Command::SnakeTurn(Dir::Up)),
            KeyCode::Down => Some(Command::SnakeTurn(Dir::Down)),
            KeyCode::Left => Some(Command::SnakeTurn(Dir::Left)),
            KeyCode::Right => Some(Command::SnakeTurn(Dir::Right)),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Command::SnakeStart),
            KeyCode::Char('x') => Some(Command::SnakeStop),
            KeyCode::Esc | KeyCode::Char('g') => Some(Command::Back),
            _ => None,
        },
        Scene::ConfirmReset => match key {
            KeyCode::Char('y') => Some(Command::ResetAnswer { keep_identity: true }),
            KeyCode::Char('n') => Some(Command::ResetAnswer { keep_identity: false }),
            KeyCode::Esc => Some(Command::Back),
            _ => None,
        },
        Scene::Help => match key {
            KeyCode::Esc | KeyCode::Char('h') => Some(Command::Back),
            KeyCode::Char('q') => Some(Command::Quit),
            _ => None,
        },
        Scene::Start | Scene::NoteEdit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent {
            key: code,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn main_scene_maps_actions_case_insensitively() {
        assert_eq!(
            map_event_to_command(Scene::Main, key(KeyCode::Char('F'))),
            Some(Command::Act(PlayerAction::Feed))
        );
        assert_eq!(
            map_event_to_command(Scene::Main, key(KeyCode::Char('g'))),
            Some(Command::Open(Scene::Snake))
        );
        assert_eq!(map_event_to_command(Scene::Main, key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn text_scenes_take_letters_literally() {
        assert_eq!(
            map_event_to_command(Scene::Start, key(KeyCode::Char('q'))),
            Some(Command::TextChar('q'))
        );
        assert_eq!(
            map_event_to_command(Scene::NoteEdit, key(KeyCode::Tab)),
            Some(Command::SwitchField)
        );
        assert_eq!(map_event_to_command(Scene::Start, key(KeyCode::Esc)), None);
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        let ev = InputEvent {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        assert_eq!(map_event_to_command(Scene::NoteEdit, ev), Some(Command::Quit));
    }

    #[test]
    fn reset_prompt_answers() {
        assert_eq!(
            map_event_to_command(Scene::ConfirmReset, key(KeyCode::Char('Y'))),
            Some(Command::ResetAnswer { keep_identity: true })
        );
        assert_eq!(
            map_event_to_command(Scene::ConfirmReset, key(KeyCode::Char('n'))),
            Some(Command::ResetAnswer { keep_identity: false })
        );
    }

    #[test]
    fn notes_and_inventory_close_with_their_own_key() {
        assert_eq!(
            map_event_to_command(Scene::Notes, key(KeyCode::Char('n'))),
            Some(Command::Back)
        );
        assert_eq!(map_event_to_command(Scene::Inventory, key(KeyCode::Char('n'))), None);
        assert_eq!(
            map_event_to_command(Scene::Notes, key(KeyCode::Char('a'))),
            Some(Command::Open(Scene::NoteEdit))
        );
    }
}
