use crate::app::{Alert, UiState};
use crate::config::Settings;
use crate::model::{Portrait, Scene, CATALOG};
use crate::session::Session;
use crate::snake::{Snake, GRID};
use crate::storage::KeyValueStore;
use crossterm::{
    cursor,
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Placeholder for the right half of a double-width glyph.
const WIDE_TAIL: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell {
            bg,
            ..Cell::default()
        });
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] || c.ch == WIDE_TAIL {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Text helpers
------------------------------ */

fn is_wide(ch: char) -> bool {
    matches!(ch as u32, 0x1F300..=0x1FAFF)
}

pub(crate) fn text_width(s: &str) -> u16 {
    s.chars().map(|c| if is_wide(c) { 2 } else { 1 }).sum()
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    let mut xx = x;
    for ch in s.chars() {
        let wide = is_wide(ch);
        let need = if wide { 2 } else { 1 };
        if xx.saturating_add(need) > buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
        if wide {
            buf.set(xx + 1, y, Cell { ch: WIDE_TAIL, fg, bg });
        }
        xx += need;
    }
}

fn bar(value: u8, width: usize) -> String {
    let fill = (usize::from(value.min(100)) * width + 50) / 100;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

fn tint(settings: &Settings, c: Color) -> Color {
    if settings.enable_color {
        c
    } else {
        Color::White
    }
}

fn meter_color(v: u8) -> Color {
    match v {
        0..=20 => Color::Red,
        21..=50 => Color::Yellow,
        _ => Color::Green,
    }
}

/// Framed box centred on screen. Returns the top-left corner of its body.
pub(crate) fn draw_box(buf: &mut CellBuffer, w: u16, h: u16, title: &str) -> (u16, u16) {
    let bw = w.min(buf.w.saturating_sub(2)).max(4);
    let bh = h.min(buf.h.saturating_sub(2)).max(3);
    let x0 = buf.w.saturating_sub(bw) / 2;
    let y0 = buf.h.saturating_sub(bh) / 2;
    let (fg, bg) = (Color::White, Color::Black);

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let top_or_bottom = y == y0 || y == y0 + bh - 1;
            let side = x == x0 || x == x0 + bw - 1;
            let ch = match (top_or_bottom, side) {
                (true, true) => match (x == x0, y == y0) {
                    (true, true) => '┌',
                    (false, true) => '┐',
                    (true, false) => '└',
                    (false, false) => '┘',
                },
                (true, false) => '─',
                (false, true) => '│',
                (false, false) => ' ',
            };
            buf.set(x, y, Cell { ch, fg, bg });
        }
    }
    draw_text(buf, x0 + 2, y0, &format!(" {title} "), Color::Yellow, bg);
    (x0 + 2, y0 + 1)
}

fn draw_lines(buf: &mut CellBuffer, x: u16, y: u16, body: &str) {
    for (i, line) in body.lines().enumerate() {
        draw_text(buf, x, y + i as u16, line, Color::White, Color::Black);
    }
}

/* -----------------------------
   Main screen
------------------------------ */

fn portrait_art(p: Portrait) -> [&'static str; 6] {
    match p {
        Portrait::Happy => [
            "   /\\_/\\   ",
            "  ( ^.^ )  ",
            "   > ω <   ",
            "  /     \\  ",
            " (  \\_/  ) ",
            "  '-----'  ",
        ],
        Portrait::Hungry => [
            "   /\\_/\\   ",
            "  ( o.o )  ",
            "   >  O <  ",
            "  /     \\  ",
            " (  grr  ) ",
            "  '-----'  ",
        ],
        Portrait::Sleepy => [
            "   /\\_/\\ z ",
            "  ( -.- )Z ",
            "   >   <   ",
            "  /     \\  ",
            " (       ) ",
            "  '-----'  ",
        ],
        Portrait::Sad => [
            "   /\\_/\\   ",
            "  ( ;.; )  ",
            "   > ^ <   ",
            "  /     \\  ",
            " (       ) ",
            "  '-----'  ",
        ],
        Portrait::Deceased => [
            "   /\\_/\\   ",
            "  ( x.x )  ",
            "   >   <   ",
            "  /     \\  ",
            " (  RIP  ) ",
            "  '-----'  ",
        ],
    }
}

pub(crate) fn draw_main<S: KeyValueStore>(
    buf: &mut CellBuffer,
    session: &Session<S>,
    settings: &Settings,
) {
    let bg = Color::Black;
    let fg = Color::White;

    let title = format!("MirandaPet  |  {}  |  🪙 {}", session.name, session.currency);
    draw_text(buf, 1, 0, &title, fg, bg);

    let p = session.pet;
    let meters = [
        ("Hunger ", p.hunger),
        ("Sleep  ", p.sleep),
        ("Fun    ", p.entertainment),
        ("Happy  ", p.happiness),
        ("Health ", p.health),
    ];
    for (i, (name, val)) in meters.iter().enumerate() {
        let y = 2 + i as u16;
        draw_text(buf, 1, y, name, fg, bg);
        draw_text(buf, 9, y, &bar(*val, 16), tint(settings, meter_color(*val)), bg);
        draw_text(buf, 28, y, &format!("{val:>3}"), fg, bg);
    }

    let portrait = p.portrait();
    let art_fg = match portrait {
        Portrait::Deceased => Color::DarkGrey,
        Portrait::Happy => Color::Cyan,
        _ => Color::Magenta,
    };
    let art_x = if buf.w > 50 { 36 } else { 1 };
    let art_y = if buf.w > 50 { 2 } else { 8 };
    for (i, line) in portrait_art(portrait).iter().enumerate() {
        draw_text(buf, art_x, art_y + i as u16, line, tint(settings, art_fg), bg);
    }

    // action keys go grey once the pet has died
    let live = if session.controls_enabled() {
        fg
    } else {
        tint(settings, Color::DarkGrey)
    };
    let keys: [(&str, Color); 10] = [
        ("f feed", live),
        ("p play", live),
        ("s sleep", live),
        ("b shop", live),
        ("g snake", live),
        ("i items", fg),
        ("n notes", fg),
        ("r reset", fg),
        ("h help", fg),
        ("q quit", fg),
    ];
    let y = buf.h.saturating_sub(1);
    let mut x = 1u16;
    for (label, color) in keys {
        draw_text(buf, x, y, label, color, bg);
        x = x.saturating_add(text_width(label) + 2);
    }
}

pub(crate) fn draw_alerts(buf: &mut CellBuffer, alerts: &[Alert], settings: &Settings) {
    let bottom = buf.h.saturating_sub(2);
    for (i, alert) in alerts.iter().rev().take(5).enumerate() {
        let y = bottom.saturating_sub(i as u16);
        if y < 8 {
            break;
        }
        let w = text_width(&alert.text);
        let x = buf.w.saturating_sub(w + 2);
        draw_text(buf, x, y, &alert.text, tint(settings, Color::Yellow), Color::Black);
    }
}

/* -----------------------------
   Overlays
------------------------------ */

pub(crate) fn draw_overlay<S: KeyValueStore>(
    buf: &mut CellBuffer,
    session: &Session<S>,
    ui: &UiState,
    snake: &Snake,
    settings: &Settings,
) {
    let hi = tint(settings, Color::Yellow);
    match ui.scene {
        Scene::Main => {}
        Scene::Start => {
            let (x, y) = draw_box(buf, 44, 8, "Welcome to MirandaPet");
            let mut preview = ui.name_edit.clone();
            preview.push('_');
            draw_lines(
                buf,
                x,
                y + 1,
                &format!("Name your pet:\n\n  {preview}\n\nEnter to start"),
            );
        }
        Scene::Shop => {
            let (x, y) = draw_box(buf, 40, 6 + CATALOG.len() as u16, "Shop");
            draw_text(buf, x, y + 1, &format!("Coins: 🪙 {}", session.currency), Color::White, Color::Black);
            for (i, item) in CATALOG.iter().enumerate() {
                let line = format!("{} {} {}  ...  {} coins", i + 1, item.icon, item.name, item.price);
                draw_text(buf, x, y + 3 + i as u16, &line, Color::White, Color::Black);
            }
            draw_text(buf, x, y + 4 + CATALOG.len() as u16, "1 buy | esc close", hi, Color::Black);
        }
        Scene::Inventory => {
            let rows = session.inventory.len().max(1) as u16;
            let (x, y) = draw_box(buf, 40, rows + 5, "Inventory");
            if session.inventory.is_empty() {
                draw_text(buf, x, y + 1, "You have no items.", Color::White, Color::Black);
            }
            for (i, (_, entry)) in session.inventory.iter().enumerate() {
                let selected = i == ui.inv_cursor;
                let line = format!(
                    "{} {} {} x{}",
                    if selected { ">" } else { " " },
                    entry.icon,
                    entry.name,
                    entry.count
                );
                let color = if selected { hi } else { Color::White };
                draw_text(buf, x, y + 1 + i as u16, &line, color, Color::Black);
            }
            draw_text(buf, x, y + rows + 2, "enter use | esc close", hi, Color::Black);
        }
        Scene::UseAmount => {
            let (x, y) = draw_box(buf, 40, 7, "Use item");
            if let Some(entry) = ui.use_item.as_deref().and_then(|id| session.inventory.get(id)) {
                let line = format!("{} {}  (you have {})", entry.icon, entry.name, entry.count);
                draw_text(buf, x, y + 1, &line, Color::White, Color::Black);
            }
            draw_text(buf, x, y + 3, &format!("Amount: < {} >", ui.use_qty), hi, Color::Black);
            draw_text(buf, x, y + 4, "←→ amount | enter use | esc cancel", Color::White, Color::Black);
        }
        Scene::Notes => {
            let rows = session.notes.len().clamp(1, 12) as u16;
            let (x, y) = draw_box(buf, 50, rows + 5, "Reminders");
            if session.notes.is_empty() {
                draw_text(buf, x, y + 1, "No reminders yet.", Color::White, Color::Black);
            }
            let first = ui.note_cursor.saturating_sub(11);
            for (i, note) in session.notes.iter().enumerate().skip(first).take(12) {
                let selected = i == ui.note_cursor;
                let stamp = note
                    .created_at
                    .map(|t| t.format("%Y-%m-%d ").to_string())
                    .unwrap_or_default();
                let line = format!("{} {stamp}{}", if selected { ">" } else { " " }, note.title);
                let color = if selected { hi } else { Color::White };
                draw_text(buf, x, y + 1 + (i - first) as u16, &line, color, Color::Black);
            }
            draw_text(buf, x, y + rows + 2, "enter show | a add | esc close", hi, Color::Black);
        }
        Scene::NoteEdit => {
            let (x, y) = draw_box(buf, 56, 9, "New reminder");
            let (mut title, mut body) = (ui.title_edit.clone(), ui.body_edit.clone());
            if ui.editing_body {
                body.push('_');
            } else {
                title.push('_');
            }
            draw_text(buf, x, y + 1, &format!("Title: {title}"), Color::White, Color::Black);
            draw_text(buf, x, y + 3, &format!("Body:  {body}"), Color::White, Color::Black);
            draw_text(buf, x, y + 5, "tab switch field | enter save | esc cancel", hi, Color::Black);
        }
        Scene::Snake => draw_snake(buf, snake, settings),
        Scene::ConfirmReset => {
            let (x, y) = draw_box(buf, 46, 6, "Reset");
            draw_lines(
                buf,
                x,
                y + 1,
                &format!("Keep the name \"{}\"?\n\ny keep | n forget | esc cancel", session.name),
            );
        }
        Scene::Help => {
            let (x, y) = draw_box(buf, 60, 16, "How to play");
            draw_lines(
                buf,
                x,
                y + 1,
                "Keep your pet fed, rested and entertained.\n\
                 Hunger, sleep and fun drop on their own over time.\n\
                 Health follows them; at zero your pet dies.\n\n\
                 f Feed: eats one apple (+20 hunger).\n\
                 p Play: +15 fun.   s Sleep: +20 sleep.\n\
                 b Shop: apples cost 5 coins.\n\
                 i Items: use several apples at once.\n\
                 g Snake: every apple eaten pays 1 coin and +8 fun.\n\
                 n Notes: keep reminders.   r Reset: start over.\n\n\
                 You earn a coin every 30 seconds.\n\
                 Esc or h closes this help.",
            );
        }
    }
}

fn draw_snake(buf: &mut CellBuffer, snake: &Snake, settings: &Settings) {
    let side = GRID as u16;
    let (x, y) = draw_box(buf, side * 2 + 4, side + 4, &format!("Snake  score {}", snake.score));
    let ox = x;
    let oy = y + 1;
    let bg = Color::Black;

    let (ax, ay) = snake.apple;
    draw_text(buf, ox + ax as u16 * 2, oy + ay as u16, "()", tint(settings, Color::Red), bg);
    for (i, &(sx, sy)) in snake.body.iter().enumerate() {
        let glyph = if i == 0 { "@@" } else { "██" };
        draw_text(buf, ox + sx as u16 * 2, oy + sy as u16, glyph, tint(settings, Color::Green), bg);
    }

    let hint = if snake.is_running() {
        "arrows steer | x pause | esc close"
    } else {
        "space start | esc close"
    };
    draw_text(buf, ox, oy + side, hint, Color::White, bg);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &CellBuffer, y: u16) -> String {
        (0..buf.w)
            .filter_map(|x| buf.get(x, y))
            .map(|c| c.ch)
            .filter(|&c| c != WIDE_TAIL)
            .collect()
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0, 4), "[    ]");
        assert_eq!(bar(50, 4), "[██  ]");
        assert_eq!(bar(100, 4), "[████]");
    }

    #[test]
    fn wide_glyphs_take_two_cells() {
        let mut buf = CellBuffer::new(10, 1);
        draw_text(&mut buf, 0, 0, "🪙 5", Color::White, Color::Black);
        assert_eq!(buf.get(1, 0).map(|c| c.ch), Some(WIDE_TAIL));
        assert_eq!(buf.get(3, 0).map(|c| c.ch), Some('5'));
        assert_eq!(text_width("🪙 5"), 4);
    }

    #[test]
    fn text_is_clipped_at_the_edge() {
        let mut buf = CellBuffer::new(3, 1);
        draw_text(&mut buf, 1, 0, "abc", Color::White, Color::Black);
        assert_eq!(row(&buf, 0), " ab");
    }

    #[test]
    fn box_has_corners_and_title() {
        let mut buf = CellBuffer::new(20, 5);
        let (x, y) = draw_box(&mut buf, 10, 3, "Hi");
        assert_eq!((x, y), (7, 2));
        assert_eq!(buf.get(5, 1).map(|c| c.ch), Some('┌'));
        assert_eq!(buf.get(14, 3).map(|c| c.ch), Some('┘'));
        assert!(row(&buf, 1).contains(" Hi "));
    }
}
