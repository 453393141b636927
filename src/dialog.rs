//! Interactive terminal front end.
//!
//! The [`Dialog`] trait is everything the pipeline needs from the user:
//! the search filters, a place to show notices, and the next question for
//! the assistant. [`TerminalDialog`] implements it with `dialoguer` prompts.

use crate::api::Exchange;
use crate::models::{ImageSize, SearchFilters};
use chrono::NaiveDate;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::error::Error;
use tracing::{error, info, warn};

const DEFAULT_PHRASE: &str = "coffee";
const EXIT_WORD: &str = "exit";

/// Severity of a message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Heading shown above the message.
    pub fn heading(&self) -> &'static str {
        match self.level {
            NoticeLevel::Info => "Information",
            NoticeLevel::Warning => "A Warning Raised",
            NoticeLevel::Error => "An Error Occurred",
        }
    }

    /// Record the notice in the log at its own level.
    pub fn log(&self) {
        match self.level {
            NoticeLevel::Info => info!(notice = %self.message, "Info notice"),
            NoticeLevel::Warning => warn!(notice = %self.message, "Warning notice"),
            NoticeLevel::Error => error!(notice = %self.message, "Error notice"),
        }
    }
}

/// User-facing side of a run.
pub trait Dialog {
    /// Block until the user has submitted search filters.
    fn collect_filters(&mut self) -> Result<SearchFilters, Box<dyn Error>>;

    /// Show a notice.
    fn notify(&mut self, notice: &Notice);

    /// Show the transcript so far and ask for the next question.
    /// `None` means the user wants to leave.
    fn next_question(&mut self, transcript: &[Exchange]) -> Result<Option<String>, Box<dyn Error>>;
}

/// Render the whole conversation, oldest exchange first.
pub fn render_transcript(transcript: &[Exchange]) -> String {
    transcript
        .iter()
        .map(|e| format!("YOU:\n{}\n\nA.I.:\n{}\n", e.question, e.reply))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interpret a raw answer to the question prompt.
fn parse_question(raw: &str) -> Option<String> {
    let question = raw.trim();
    if question.is_empty() || question.eq_ignore_ascii_case(EXIT_WORD) {
        None
    } else {
        Some(question.to_string())
    }
}

/// `dialoguer` prompts on the controlling terminal.
pub struct TerminalDialog {
    theme: ColorfulTheme,
    default_start: NaiveDate,
    default_end: NaiveDate,
}

impl Default for TerminalDialog {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            default_start: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or_default(),
            default_end: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap_or_default(),
        }
    }
}

impl Dialog for TerminalDialog {
    fn collect_filters(&mut self) -> Result<SearchFilters, Box<dyn Error>> {
        println!("\nSelect Your Filters\n");
        let phrase: String = Input::with_theme(&self.theme)
            .with_prompt("Search Phrase")
            .default(DEFAULT_PHRASE.to_string())
            .validate_with(|input: &String| -> Result<(), &'static str> {
                if input.trim().is_empty() {
                    Err("the search phrase must not be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;
        let start_date: NaiveDate = Input::with_theme(&self.theme)
            .with_prompt("Start Date (YYYY-MM-DD)")
            .default(self.default_start)
            .interact_text()?;
        let end_date: NaiveDate = Input::with_theme(&self.theme)
            .with_prompt("End Date (YYYY-MM-DD)")
            .default(self.default_end)
            .interact_text()?;
        let default_width = ImageSize::ALL
            .iter()
            .position(|s| *s == ImageSize::default())
            .unwrap_or_default();
        let width = Select::with_theme(&self.theme)
            .with_prompt("Image Width")
            .items(&ImageSize::ALL)
            .default(default_width)
            .interact()?;

        let filters = SearchFilters::new(phrase, start_date, end_date, ImageSize::ALL[width])?;
        info!(
            phrase = %filters.phrase(),
            start = %filters.start_date(),
            end = %filters.end_date(),
            width = %filters.image_size(),
            "Filters submitted"
        );
        Ok(filters)
    }

    fn notify(&mut self, notice: &Notice) {
        println!("\n== {} ==\n{}\n", notice.heading(), notice.message);
    }

    fn next_question(&mut self, transcript: &[Exchange]) -> Result<Option<String>, Box<dyn Error>> {
        println!("\n== Talk with the AI About The Found News ==\n");
        if !transcript.is_empty() {
            println!("{}", render_transcript(transcript));
        }
        let raw: String = Input::with_theme(&self.theme)
            .with_prompt("Ask Something (empty or 'exit' to leave)")
            .allow_empty(true)
            .interact_text()?;
        let question = parse_question(&raw);
        if question.is_none() {
            info!("'Exit' selected. Exiting...");
        }
        Ok(question)
    }
}
