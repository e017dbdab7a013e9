//! Palette for messages and migration states.

use cairn_migration::MigrationStatus;
use owo_colors::{OwoColorize, Style};

/// Visual role of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Muted,
    Header,
    Code,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Success => Style::new().green().bold(),
            Self::Error => Style::new().red().bold(),
            Self::Warning => Style::new().yellow(),
            Self::Muted => Style::new().dimmed(),
            Self::Header => Style::new().bold(),
            Self::Code => Style::new().blue(),
        }
    }

    /// Tone used to show a migration in a given state.
    pub fn for_status(status: &MigrationStatus) -> Self {
        match status {
            MigrationStatus::Applied => Self::Success,
            MigrationStatus::Pending => Self::Warning,
            MigrationStatus::Skipped | MigrationStatus::SkipPending => Self::Muted,
            MigrationStatus::Error(_) => Self::Error,
        }
    }
}

/// Applies a [`Tone`] to anything printable, honoring `--no-color`.
pub trait SemanticStyle {
    fn tone(&self, tone: Tone) -> String;

    fn success(&self) -> String {
        self.tone(Tone::Success)
    }

    fn error(&self) -> String {
        self.tone(Tone::Error)
    }

    fn warning(&self) -> String {
        self.tone(Tone::Warning)
    }

    fn muted(&self) -> String {
        self.tone(Tone::Muted)
    }

    fn header(&self) -> String {
        self.tone(Tone::Header)
    }

    fn code(&self) -> String {
        self.tone(Tone::Code)
    }
}

impl<T: std::fmt::Display + ?Sized> SemanticStyle for T {
    fn tone(&self, tone: Tone) -> String {
        if super::no_color() {
            self.to_string()
        } else {
            self.style(tone.style()).to_string()
        }
    }
}
