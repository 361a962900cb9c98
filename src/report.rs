// 📋 Report Model - Console output for every diagnostic
// Checks append status lines into sections; main prints the rendered text.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Banner width used by most diagnostics
pub const DEFAULT_WIDTH: usize = 60;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pass, // Check succeeded
    Fail, // Check failed or could not run
    Warn, // Check ran but the result needs attention
    Info, // Plain information
}

impl Status {
    pub fn icon(&self) -> &'static str {
        match self {
            Status::Pass => "✅",
            Status::Fail => "❌",
            Status::Warn => "⚠️ ",
            Status::Info => "ℹ️ ",
        }
    }
}

// ============================================================================
// LINES & SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Line {
    /// A status line: icon + text
    Status { status: Status, text: String },
    /// Indented free text under the previous status line
    Detail(String),
    Blank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: Option<String>,
    pub lines: Vec<Line>,
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub width: usize,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Self::with_width(title, DEFAULT_WIDTH)
    }

    pub fn with_width(title: &str, width: usize) -> Self {
        Report {
            title: title.to_string(),
            width,
            // Untitled leading section for lines emitted before the first banner
            sections: vec![Section {
                title: None,
                lines: Vec::new(),
            }],
        }
    }

    /// Open a new banner section; subsequent lines land in it
    pub fn section(&mut self, title: &str) -> &mut Self {
        self.sections.push(Section {
            title: Some(title.to_string()),
            lines: Vec::new(),
        });
        self
    }

    fn push(&mut self, line: Line) -> &mut Self {
        if let Some(section) = self.sections.last_mut() {
            section.lines.push(line);
        }
        self
    }

    pub fn status(&mut self, status: Status, text: impl Into<String>) -> &mut Self {
        self.push(Line::Status {
            status,
            text: text.into(),
        })
    }

    pub fn pass(&mut self, text: impl Into<String>) -> &mut Self {
        self.status(Status::Pass, text)
    }

    pub fn fail(&mut self, text: impl Into<String>) -> &mut Self {
        self.status(Status::Fail, text)
    }

    pub fn warn(&mut self, text: impl Into<String>) -> &mut Self {
        self.status(Status::Warn, text)
    }

    pub fn info(&mut self, text: impl Into<String>) -> &mut Self {
        self.status(Status::Info, text)
    }

    pub fn detail(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Line::Detail(text.into()))
    }

    pub fn blank(&mut self) -> &mut Self {
        self.push(Line::Blank)
    }

    /// Append another report's sections (used by `all`)
    pub fn extend(&mut self, other: Report) {
        self.section(&other.title);
        for section in other.sections {
            if section.title.is_some() || !section.lines.is_empty() {
                self.sections.push(section);
            }
        }
    }

    /// Iterate over every status line
    pub fn statuses(&self) -> impl Iterator<Item = (Status, &str)> {
        self.sections.iter().flat_map(|s| {
            s.lines.iter().filter_map(|l| match l {
                Line::Status { status, text } => Some((*status, text.as_str())),
                _ => None,
            })
        })
    }

    /// (passed, failed, warnings)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.statuses()
            .fold((0, 0, 0), |(p, f, w), (status, _)| match status {
                Status::Pass => (p + 1, f, w),
                Status::Fail => (p, f + 1, w),
                Status::Warn => (p, f, w + 1),
                Status::Info => (p, f, w),
            })
    }

    pub fn has_failures(&self) -> bool {
        self.statuses().any(|(s, _)| s == Status::Fail)
    }

    /// True when any status line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.statuses().any(|(_, text)| text.contains(needle))
    }

    pub fn summary(&self) -> String {
        let (passed, failed, warnings) = self.counts();
        format!(
            "{} passed, {} failed, {} warnings",
            passed, failed, warnings
        )
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(self.width);
        let mut out = String::new();

        writeln!(out, "🔍 {}", self.title).ok();
        writeln!(out, "{}", rule).ok();

        for section in &self.sections {
            if let Some(title) = &section.title {
                writeln!(out).ok();
                writeln!(out, "{}", rule).ok();
                writeln!(out, "🔍 {}", title).ok();
                writeln!(out, "{}", rule).ok();
            }
            for line in &section.lines {
                match line {
                    Line::Status { status, text } => {
                        writeln!(out, "{} {}", status.icon(), text).ok();
                    }
                    Line::Detail(text) => {
                        writeln!(out, "   {}", text).ok();
                    }
                    Line::Blank => {
                        writeln!(out).ok();
                    }
                }
            }
        }

        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Cut `text` to at most `max` characters, appending `...` when cut
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Render an optional value the way the report shows missing data
pub fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

// ============================================================================
// TESTS
// ============================================================================
