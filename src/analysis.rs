//! Waiting for background analysis to finish.
//!
//! SonarQube queues analysis as background tasks; the activity-status
//! endpoint reports how many are failing, pending, and in progress. The
//! poller samples it until the queue drains, each sample being a full
//! retried HTTP exchange of its own.

use serde::Deserialize;

use crate::http::{Client, ClientError, DEFAULT_EXPECTED_STATUS};
use crate::log::{BLOCK_END, Logger};

/// One sample of the server's background-task queue.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityStatus {
    failing: u64,
    pending: u64,
    in_progress: u64,
}

/// Errors while waiting for analysis to complete.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The server reports failed background activities; polling longer
    /// cannot help.
    #[error("found {count} failed activities, resolve failures and restart SonarQube")]
    FailedActivities { count: u64 },

    #[error("waiting for analysis failed after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },

    #[error("waiting for analysis failed")]
    Client(#[from] ClientError),

    #[error("waiting for analysis failed: invalid activity status")]
    Parse(#[from] serde_json::Error),
}

/// Polls the activity-status endpoint until the queue drains.
pub struct AnalysisPoller<'a> {
    client: &'a Client<'a>,
    logger: &'a dyn Logger,
}

impl<'a> AnalysisPoller<'a> {
    pub fn new(client: &'a Client<'a>, logger: &'a dyn Logger) -> Self {
        Self { client, logger }
    }

    /// Waits until the server reports no pending or in-progress analysis.
    ///
    /// Fails immediately when any background activity failed; otherwise
    /// polls up to the client's attempt budget, sleeping between rounds.
    pub fn await_completion(&self, base_url: &str) -> Result<(), PollError> {
        let attempts = self.client.policy().attempts();
        let sleep = self.client.policy().sleep();
        self.logger.info("Waiting for analysis");

        let url = format!("{base_url}/api/ce/activity_status");

        for attempt in 1..=attempts {
            self.logger
                .info(&format!("Waiting for analysis: attempt {attempt}/{attempts}"));

            let mut body = String::new();
            let mut capture = |text: &str| {
                body = text.to_string();
                Ok(())
            };
            self.client
                .execute(&url, DEFAULT_EXPECTED_STATUS, true, Some(&mut capture))?;

            let status: ActivityStatus = serde_json::from_str(&body)?;

            if status.failing != 0 {
                return Err(PollError::FailedActivities {
                    count: status.failing,
                });
            }

            if status.pending + status.in_progress == 0 {
                self.logger
                    .info(&format!("Waiting done after {attempt} attempt(s)"));
                self.logger.info(BLOCK_END);
                return Ok(());
            }

            self.logger.info(&format!(
                "Pending activities: {}, in progress activities: {}",
                status.pending, status.in_progress
            ));
            self.logger.info(BLOCK_END);

            if attempt < attempts && !sleep.is_zero() {
                std::thread::sleep(sleep);
            }
        }

        self.logger
            .err(&format!("Waiting for analysis: failed after {attempts} attempt(s)"));
        self.logger.err(BLOCK_END);
        Err(PollError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::http::RetryPolicy;
    use crate::http::testing::FakeTransport;
    use crate::log::testing::BufferLogger;

    fn client<'a>(
        attempts: u32,
        transport: &'a FakeTransport,
        logger: &'a BufferLogger,
    ) -> Client<'a> {
        let policy = RetryPolicy::new(attempts, Duration::ZERO).unwrap();
        Client::new(policy, transport, logger)
    }

    const IDLE: &str = r#"{"failing":0,"pending":0,"inProgress":0}"#;
    const BUSY: &str = r#"{"failing":0,"pending":1,"inProgress":0}"#;

    #[test]
    fn completes_when_queue_is_empty() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(200, IDLE)]);
        let logger = BufferLogger::new();
        let client = client(3, &transport, &logger);

        AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap();

        assert_eq!(
            transport.requests(),
            vec![("http://sonar/api/ce/activity_status".to_string(), true)]
        );
        assert!(logger.infos().iter().any(|l| l == "Waiting done after 1 attempt(s)"));
    }

    #[test]
    fn polls_until_queue_drains() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(200, BUSY),
            FakeTransport::ok(200, BUSY),
            FakeTransport::ok(200, IDLE),
        ]);
        let logger = BufferLogger::new();
        let client = client(5, &transport, &logger);

        AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap();

        assert_eq!(transport.request_count(), 3);
        assert!(
            logger
                .infos()
                .iter()
                .any(|l| l == "Pending activities: 1, in progress activities: 0")
        );
        assert!(logger.infos().iter().any(|l| l == "Waiting done after 3 attempt(s)"));
    }

    #[test]
    fn failing_activities_stop_polling_immediately() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(
            200,
            r#"{"failing":2,"pending":1,"inProgress":3}"#,
        )]);
        let logger = BufferLogger::new();
        let client = client(5, &transport, &logger);

        let err = AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap_err();

        // Fatal on the first sample: no further polling attempts.
        assert_eq!(transport.request_count(), 1);
        assert!(matches!(err, PollError::FailedActivities { count: 2 }));
        let message = err.to_string();
        assert!(message.contains('2'), "{message}");
        assert!(message.contains("failed activities"), "{message}");
    }

    #[test]
    fn exhausts_when_queue_never_drains() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(200, BUSY)]);
        let logger = BufferLogger::new();
        let client = client(2, &transport, &logger);

        let err = AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap_err();

        assert_eq!(transport.request_count(), 2);
        assert!(matches!(err, PollError::Exhausted { attempts: 2 }));
        assert!(err.to_string().contains("after 2 attempt(s)"));
        assert!(
            logger
                .errs()
                .iter()
                .any(|l| l == "Waiting for analysis: failed after 2 attempt(s)")
        );
    }

    #[test]
    fn unparseable_status_fails() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(200, "not json")]);
        let logger = BufferLogger::new();
        let client = client(1, &transport, &logger);

        let err = AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap_err();

        assert!(matches!(err, PollError::Parse(_)));
    }

    #[test]
    fn missing_count_field_fails() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(200, r#"{"failing":0}"#)]);
        let logger = BufferLogger::new();
        let client = client(1, &transport, &logger);

        let err = AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap_err();

        assert!(matches!(err, PollError::Parse(_)));
    }

    #[test]
    fn wraps_client_exhaustion() {
        let transport = FakeTransport::new(vec![Err("connection refused".to_string())]);
        let logger = BufferLogger::new();
        let client = client(2, &transport, &logger);

        let err = AnalysisPoller::new(&client, &logger)
            .await_completion("http://sonar")
            .unwrap_err();

        // The inner HTTP retry loop spent the whole budget before the
        // failure reached the poller.
        assert_eq!(transport.request_count(), 2);
        assert!(matches!(err, PollError::Client(_)));
    }
}
