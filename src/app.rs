//! Orchestration: wait for analysis, gate on the issue count, optionally
//! render the report, and map the outcome to an exit code.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use crate::analysis::{AnalysisPoller, PollError};
use crate::config::Config;
use crate::http::{Client, ClientError, RetryPolicy, Transport};
use crate::issues::{FetchError, IssueFetcher, UNLIMITED};
use crate::log::Logger;
use crate::report::RenderError;
use crate::report::html::HtmlReport;

/// Exit code when unresolved issues exist or anything failed.
pub const EXIT_FAILURE: i32 = 1;

/// Component-tagged failures crossing the orchestration boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("checker failed in the HTTP client")]
    Client(#[from] ClientError),

    #[error("checker failed while waiting for analysis")]
    Poll(#[from] PollError),

    #[error("checker failed while fetching issues")]
    Fetch(#[from] FetchError),

    #[error("checker failed while writing the report")]
    Render(#[from] RenderError),

    #[error("checker failed to write the report file")]
    Io(#[from] io::Error),
}

/// Runs the configured check and returns the process exit code.
///
/// Check mode stops after the server answers and analysis completes. Full
/// mode additionally counts unresolved issues and, when requested and
/// nonzero, writes the HTML report.
pub fn run(config: &Config, transport: &dyn Transport, logger: &dyn Logger) -> Result<i32, AppError> {
    let policy = RetryPolicy::new(
        config.attempts,
        Duration::from_millis(config.sleep_milliseconds),
    )?;
    let client = Client::new(policy, transport, logger);

    AnalysisPoller::new(&client, logger).await_completion(&config.url)?;

    if config.check {
        return Ok(0);
    }

    let fetcher = IssueFetcher::new(&client, logger);
    let issue_count = fetcher.count_unresolved(&config.url)?;

    if issue_count > 0 && config.report {
        let (issues, components) = fetcher.fetch_issues(&config.url, UNLIMITED)?;

        let file = File::create(&config.report_path)?;
        let mut out = BufWriter::new(file);
        HtmlReport::new(&issues, &components, &config.projects, config.encoding, logger)
            .write(&mut out)?;
        out.flush()?;
    }

    if issue_count > 0 {
        return Ok(EXIT_FAILURE);
    }
    Ok(0)
}
