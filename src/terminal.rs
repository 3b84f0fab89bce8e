//! Terminal state behind the window: scrollback, the input line and the lock.
//!
//! Nothing here draws. `main.rs` feeds key and text events in and renders
//! [`Terminal::lines`] and [`Terminal::input_display`] each frame.

use std::collections::VecDeque;

use egui::Key;

use crate::dispatcher::Reply;

/// Scrollback kept in memory; the history log on disk is unbounded.
pub const MAX_LINES: usize = 2000;

const CURSOR: char = '█';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Echo,
    Error,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub text: String,
    pub kind: LineKind,
}

/// What pressing Enter produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entered {
    /// A line for the session. May be blank.
    Command(String),
    /// A password attempt; when rejected the terminal stays locked.
    Password { accepted: bool },
}

#[derive(Debug, Default)]
pub struct Terminal {
    lines: VecDeque<TerminalLine>,
    input: String,
    /// Byte offset into `input`, always on a char boundary.
    cursor: usize,
    recall: Vec<String>,
    /// Index into `recall` while walking it with Up/Down.
    recall_index: Option<usize>,
    /// Expected password while the terminal is still locked.
    password: Option<String>,
}

impl Terminal {
    pub fn new(password: Option<String>) -> Self {
        let mut terminal = Self {
            password,
            ..Self::default()
        };
        if terminal.is_locked() {
            terminal.add_line("Enter password:");
        }
        terminal
    }

    pub fn is_locked(&self) -> bool {
        self.password.is_some()
    }

    pub fn lines(&self) -> impl Iterator<Item = &TerminalLine> {
        self.lines.iter()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn add_line(&mut self, text: &str) {
        let kind = if text.starts_with("> ") {
            LineKind::Echo
        } else if text.starts_with("Error") {
            LineKind::Error
        } else {
            LineKind::Output
        };
        self.lines.push_back(TerminalLine {
            text: text.to_string(),
            kind,
        });

        while self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
    }

    /// Print a session reply; multi-line blocks are split into lines.
    pub fn show_reply(&mut self, reply: &Reply) {
        if reply.clear_screen {
            self.lines.clear();
        }
        for block in &reply.lines {
            for line in block.lines() {
                self.add_line(line);
            }
        }
    }

    /// Typed text. Control characters are dropped.
    pub fn insert_text(&mut self, text: &str) {
        for ch in text.chars().filter(|c| !c.is_control()) {
            self.input.insert(self.cursor, ch);
            self.cursor += ch.len_utf8();
        }
    }

    /// Pasted text; only its first line is taken.
    pub fn paste(&mut self, text: &str) {
        self.insert_text(text.lines().next().unwrap_or_default());
    }

    pub fn handle_key(&mut self, key: Key) -> Option<Entered> {
        match key {
            Key::Enter => return Some(self.enter()),
            Key::Backspace => {
                if let Some(prev) = self.prev_boundary() {
                    self.input.remove(prev);
                    self.cursor = prev;
                }
            }
            Key::Delete => {
                if self.cursor < self.input.len() {
                    self.input.remove(self.cursor);
                }
            }
            Key::ArrowLeft => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
            }
            Key::ArrowRight => {
                if let Some(next) = self.next_boundary() {
                    self.cursor = next;
                }
            }
            Key::ArrowUp => self.recall_older(),
            Key::ArrowDown => self.recall_newer(),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.input.len(),
            _ => {}
        }
        None
    }

    fn enter(&mut self) -> Entered {
        let input = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.recall_index = None;

        if let Some(expected) = &self.password {
            let accepted = input == *expected;
            if accepted {
                self.password = None;
                self.lines.clear();
            }
            return Entered::Password { accepted };
        }

        let trimmed = input.trim();
        if !trimmed.is_empty() && self.recall.last().map(String::as_str) != Some(trimmed) {
            self.recall.push(trimmed.to_string());
        }
        Entered::Command(input)
    }

    fn recall_older(&mut self) {
        // Nothing is recalled while the password is being typed
        if self.is_locked() || self.recall.is_empty() {
            return;
        }
        let index = match self.recall_index {
            None => self.recall.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.set_recalled(Some(index));
    }

    fn recall_newer(&mut self) {
        let Some(i) = self.recall_index else {
            return;
        };
        if i + 1 < self.recall.len() {
            self.set_recalled(Some(i + 1));
        } else {
            self.set_recalled(None);
        }
    }

    fn set_recalled(&mut self, index: Option<usize>) {
        self.recall_index = index;
        self.input = index.map(|i| self.recall[i].clone()).unwrap_or_default();
        self.cursor = self.input.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.input[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// The input line as drawn: masked while locked, with the block cursor when visible.
    pub fn input_display(&self, show_cursor: bool) -> String {
        let mut display = if self.is_locked() {
            "*".repeat(self.input.chars().count())
        } else {
            self.input.clone()
        };

        if show_cursor {
            let at = if self.is_locked() {
                self.input[..self.cursor].chars().count()
            } else {
                self.cursor
            };
            display.insert(at, CURSOR);
        }
        display
    }
}
