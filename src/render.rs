//! Plain-text rendering for the line-oriented shell.
//!
//! The shell appends to stdout instead of redrawing, so the printer tracks how
//! much of the transcript it has already written and emits only the delta.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, Role, Turn};

pub const DEFAULT_WIDTH: usize = 72;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    turn: usize,
    /// Bytes of `turn` already written; `None` before its header.
    offset: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptPrinter {
    cursor: Cursor,
    width: usize,
}

impl TranscriptPrinter {
    pub fn new(width: usize) -> Self {
        Self {
            cursor: Cursor::default(),
            width: width.max(20),
        }
    }

    /// Text to append so stdout reflects `transcript`.
    pub fn render(&mut self, transcript: &[Turn]) -> String {
        let mut out = String::new();

        if self.cursor.turn > transcript.len()
            || (self.cursor.turn == transcript.len() && self.cursor.offset.is_some())
        {
            out.push_str(if transcript.is_empty() {
                "\n[transcript cleared]\n"
            } else {
                "\n[last exchange withdrawn]\n"
            });
            self.cursor = Cursor {
                turn: transcript.len(),
                offset: None,
            };
            return out;
        }

        while let Some(turn) = transcript.get(self.cursor.turn) {
            let offset = match self.cursor.offset {
                Some(offset) => offset,
                None => {
                    out.push_str(&self.header(turn));
                    0
                }
            };

            let content = turn.content.get(offset..).unwrap_or_default();
            out.push_str(content);

            let is_last = self.cursor.turn + 1 == transcript.len();
            if is_last {
                self.cursor.offset = Some(turn.content.len());
                break;
            }

            out.push('\n');
            self.cursor = Cursor {
                turn: self.cursor.turn + 1,
                offset: None,
            };
        }

        out
    }

    fn header(&self, turn: &Turn) -> String {
        match (turn.role, turn.section.as_deref()) {
            (Role::User, _) => "\nyou> ".to_string(),
            (Role::Assistant, Some(section)) => format!("\n{}\n", banner(section, self.width)),
            (Role::Assistant, None) => "\nfindiff> ".to_string(),
        }
    }
}

/// `label` centred in a rule of `width` display columns.
pub fn banner(label: &str, width: usize) -> String {
    let label = fit_width(label, width.saturating_sub(4));
    let used = label.width() + 2;
    let fill = width.saturating_sub(used);
    let left = fill / 2;
    let right = fill - left;
    format!("{} {label} {}", "─".repeat(left), "─".repeat(right))
}

/// Truncate to at most `max` display columns, marking the cut with `…`.
pub fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let width = ch.width().unwrap_or(0);
        if used + width + 1 > max {
            break;
        }
        out.push(ch);
        used += width;
    }
    out.push('…');
    out
}

/// One-line status: stock, selection with processing progress, and quota.
pub fn status_line(app: &App, width: usize) -> String {
    fit_width(&app.status_summary(), width)
}
