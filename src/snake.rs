use crate::model::RNGState;
use std::collections::VecDeque;

pub(crate) const GRID: i32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Idle,
    Moved,
    Ate,
    Crashed { score: u32 },
}

/// Wraparound snake on a `GRID`×`GRID` board. Head is the front of `body`.
pub(crate) struct Snake {
    pub(crate) body: VecDeque<(i32, i32)>,
    pub(crate) apple: (i32, i32),
    pub(crate) score: u32,
    dir: Option<Dir>,
    running: bool,
    rng: RNGState,
}

impl Snake {
    pub(crate) fn new(seed: u64) -> Self {
        let mut rng = RNGState::new(seed);
        let apple = spawn_apple(&mut rng);
        Self {
            body: VecDeque::from([(9, 9)]),
            apple,
            score: 0,
            dir: None,
            running: false,
            rng,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.dir = Some(Dir::Right);
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
    }

    /// Back to the opening position with a fresh apple; the RNG keeps going.
    pub(crate) fn reset(&mut self) {
        self.stop();
        self.body = VecDeque::from([(9, 9)]);
        self.dir = None;
        self.score = 0;
        self.apple = spawn_apple(&mut self.rng);
    }

    pub(crate) fn turn(&mut self, to: Dir) {
        if self.dir.map_or(true, |d| d != to.opposite()) {
            self.dir = Some(to);
        }
    }

    pub(crate) fn step(&mut self) -> Step {
        let Some(dir) = self.dir.filter(|_| self.running) else {
            return Step::Idle;
        };
        let (hx, hy) = self.body[0];
        let (dx, dy) = dir.delta();
        let head = ((hx + dx).rem_euclid(GRID), (hy + dy).rem_euclid(GRID));

        if self.body.contains(&head) {
            self.running = false;
            return Step::Crashed { score: self.score };
        }
        self.body.push_front(head);
        if head == self.apple {
            self.score += 1;
            self.apple = spawn_apple(&mut self.rng);
            Step::Ate
        } else {
            self.body.pop_back();
            Step::Moved
        }
    }
}

fn spawn_apple(rng: &mut RNGState) -> (i32, i32) {
    let n = GRID as u32;
    (rng.below(n) as i32, rng.below(n) as i32)
}
