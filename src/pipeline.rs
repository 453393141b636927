//! Run orchestration: filters, search, report, conversation.
//!
//! A run moves through these stages:
//!
//! ```text
//! CollectingFilters -> Fetching -> ReportWritten -> Interactive -> Terminal
//!                         |   \
//!                         |    -> WarningReported -> ReportWritten (empty set)
//!                          -> ErrorReported (run ends, no report)
//! ```
//!
//! Hard failures are turned into a single error notice here; nothing below
//! this layer talks to the user.

use crate::api::{Advisor, AskAsync};
use crate::dialog::{Dialog, Notice};
use crate::fetcher::{ArticleFetcher, FetchOutcome};
use crate::models::Article;
use crate::outputs::ReportWriter;
use tracing::{info, instrument};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectingFilters,
    Fetching,
    ErrorReported,
    WarningReported,
    ReportWritten,
    Interactive,
    Terminal,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        rows_written: usize,
        exchanges: usize,
    },
    Failed {
        reason: String,
    },
}

/// Sequences one run against its collaborators.
pub struct Pipeline<'a, D, R, A> {
    fetcher: &'a ArticleFetcher,
    dialog: D,
    report: R,
    assistant: Option<&'a A>,
    system_prompt: String,
    stages: Vec<Stage>,
}

impl<'a, D, R, A> Pipeline<'a, D, R, A>
where
    D: Dialog,
    R: ReportWriter,
    A: AskAsync<Response = String>,
{
    /// `assistant` is `None` when no chat backend is configured; the run
    /// then ends after the report.
    pub fn new(
        fetcher: &'a ArticleFetcher,
        dialog: D,
        report: R,
        assistant: Option<&'a A>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            dialog,
            report,
            assistant,
            system_prompt: system_prompt.into(),
            stages: Vec::new(),
        }
    }

    /// Stages visited so far, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[cfg(test)]
    pub fn dialog(&self) -> &D {
        &self.dialog
    }

    #[cfg(test)]
    pub fn report(&self) -> &R {
        &self.report
    }

    #[instrument(level = "info", skip_all)]
    pub async fn run(&mut self) -> RunOutcome {
        self.enter(Stage::CollectingFilters);
        let filters = match self.dialog.collect_filters() {
            Ok(filters) => filters,
            Err(e) => return self.fail(format!("Could not read the search filters: {e}")),
        };

        self.enter(Stage::Fetching);
        let articles = match self.fetcher.fetch_all(&filters).await {
            Ok(FetchOutcome::Found(result)) => {
                info!(total = result.total_size, "Search complete");
                result.articles
            }
            Ok(FetchOutcome::NoResults) => {
                self.enter(Stage::WarningReported);
                self.notify(Notice::warning("The search returned 0 results"));
                Vec::new()
            }
            Err(e) if e.is_provider_rejection() => return self.fail(e.to_string()),
            Err(e) => {
                return self.fail(format!(
                    "An error occurred! Please consider this information: {e}"
                ));
            }
        };

        let rows_written = match self.report.write_report(&filters, &articles).await {
            Ok(rows) => rows,
            Err(e) => return self.fail(format!("Could not save the report: {e}")),
        };
        self.enter(Stage::ReportWritten);
        self.notify(Notice::info(format!(
            "All done! {rows_written} news were found and saved."
        )));

        let exchanges = self.converse(&articles).await;
        self.enter(Stage::Terminal);
        RunOutcome::Completed {
            rows_written,
            exchanges,
        }
    }

    /// Question-and-answer loop; returns the number of answered questions.
    async fn converse(&mut self, articles: &[Article]) -> usize {
        let Some(backend) = self.assistant else {
            self.notify(Notice::warning(
                "No AI assistant API key configured; skipping the conversation",
            ));
            return 0;
        };

        self.enter(Stage::Interactive);
        info!("Starting the A.I. assistant");
        let mut advisor = Advisor::new(backend, &self.system_prompt, articles);
        loop {
            let question = match self.dialog.next_question(advisor.history()) {
                Ok(Some(question)) => question,
                Ok(None) => break,
                Err(e) => {
                    self.notify(Notice::error(format!("Could not read the question: {e}")));
                    break;
                }
            };
            if let Err(e) = advisor.ask(&question).await {
                self.notify(Notice::error(format!("The assistant could not answer: {e}")));
            }
        }
        advisor.history().len()
    }

    fn enter(&mut self, stage: Stage) {
        info!(?stage, "Pipeline stage");
        self.stages.push(stage);
    }

    fn notify(&mut self, notice: Notice) {
        notice.log();
        self.dialog.notify(&notice);
    }

    fn fail(&mut self, reason: String) -> RunOutcome {
        self.enter(Stage::ErrorReported);
        self.notify(Notice::error(reason.clone()));
        RunOutcome::Failed { reason }
    }
}
