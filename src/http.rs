//! Retrying HTTP client.
//!
//! Every exchange with the server goes through one loop: issue a GET, check
//! the status code against the expected one, hand the body to an optional
//! handler, and retry with a fixed sleep until the attempt budget runs out.
//! The transport is a trait so tests can script responses instead of
//! standing up a server.

use std::io::Read;
use std::thread;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};

use crate::log::{BLOCK_END, Logger};

/// Status code probes and fetches expect unless stated otherwise.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// How often and how patiently to retry a request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    sleep: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `attempts` must be at least 1; a zero sleep means
    /// retries follow each other immediately.
    pub fn new(attempts: u32, sleep: Duration) -> Result<Self, ClientError> {
        if attempts == 0 {
            return Err(ClientError::ZeroAttempts);
        }
        Ok(Self { attempts, sleep })
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn sleep(&self) -> Duration {
        self.sleep
    }
}

/// A received HTTP response. Any status code counts as a response;
/// transport errors are reserved for failing to produce one at all.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Failure to reach the server: bad URL, unresolvable host, dropped
/// connection, unreadable body.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Blocking HTTP GET capability.
pub trait Transport {
    /// Fetches `url`, attaching the basic-auth header when `with_auth` is
    /// set.
    fn get(&self, url: &str, with_auth: bool) -> Result<Response, TransportError>;
}

/// `ureq`-backed transport. The basic-auth credential pair is fixed at
/// construction and attached only to requests that ask for it.
pub struct UreqTransport {
    agent: ureq::Agent,
    auth_header: String,
}

impl UreqTransport {
    /// Creates a transport using `credentials` (`user:password`) for
    /// authenticated requests.
    pub fn new(credentials: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        let auth_header = format!("Basic {}", general_purpose::STANDARD.encode(credentials));
        Self { agent, auth_header }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, with_auth: bool) -> Result<Response, TransportError> {
        let mut request = self.agent.get(url);
        if with_auth {
            request = request.set("Authorization", &self.auth_header);
        }

        let response = match request.call() {
            Ok(response) => response,
            // A served error status is still a response; only failing to
            // reach the server is a transport error.
            Err(ureq::Error::Status(_, response)) => response,
            Err(error) => return Err(TransportError::new(error.to_string())),
        };

        let status = response.status();
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| TransportError::new(format!("failed to read response body: {e}")))?;

        Ok(Response { status, body })
    }
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Handler(String),
}

/// Errors from the retrying client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("attempts count cannot be zero")]
    ZeroAttempts,

    #[error("no correct response after {attempts} attempt(s){}", status_suffix(.last_status))]
    Exhausted {
        attempts: u32,
        /// Status code of the last response received, if any was.
        last_status: Option<u16>,
        #[source]
        source: Option<AttemptError>,
    },
}

fn status_suffix(last_status: &Option<u16>) -> String {
    match last_status {
        Some(code) => format!(" (last response code was {code})"),
        None => String::new(),
    }
}

/// Response-body handler invoked on a status match. A returned error marks
/// the attempt as failed and the loop keeps retrying.
pub type Handler<'h> = &'h mut dyn FnMut(&str) -> Result<(), String>;

/// GET with bounded retries.
pub struct Client<'a> {
    policy: RetryPolicy,
    transport: &'a dyn Transport,
    logger: &'a dyn Logger,
}

impl<'a> Client<'a> {
    pub fn new(policy: RetryPolicy, transport: &'a dyn Transport, logger: &'a dyn Logger) -> Self {
        Self {
            policy,
            transport,
            logger,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches `url` until an attempt both answers `expected_status` and has
    /// the handler (when given) accept the body, or until the attempt budget
    /// is spent.
    ///
    /// `None` for `on_success` is probe-only mode: the status code alone
    /// decides. Transport and handler failures are captured per attempt; the
    /// last one becomes the cause of the final error.
    pub fn execute(
        &self,
        url: &str,
        expected_status: u16,
        with_auth: bool,
        mut on_success: Option<Handler<'_>>,
    ) -> Result<(), ClientError> {
        let attempts = self.policy.attempts;
        self.logger
            .info(&format!("Waiting correct response from '{url}'"));

        let mut last_error: Option<AttemptError> = None;
        let mut last_status: Option<u16> = None;

        for attempt in 1..=attempts {
            self.logger.info(&format!("Attempt {attempt}/{attempts}"));

            let succeeded = match self.transport.get(url, with_auth) {
                Ok(response) => {
                    last_status = Some(response.status);
                    if response.status == expected_status {
                        match run_handler(&mut on_success, &response.body) {
                            Ok(()) => true,
                            Err(message) => {
                                last_error = Some(AttemptError::Handler(message));
                                false
                            }
                        }
                    } else {
                        false
                    }
                }
                Err(error) => {
                    last_error = Some(AttemptError::Transport(error));
                    false
                }
            };

            if succeeded {
                self.logger
                    .info(&format!("Succeeded after {attempt} attempt(s)"));
                self.logger.info(BLOCK_END);
                return Ok(());
            }

            if attempt < attempts && !self.policy.sleep.is_zero() {
                thread::sleep(self.policy.sleep);
            }
        }

        self.logger.err(&format!("Failed after {attempts} attempt(s)"));
        self.logger.err(BLOCK_END);
        Err(ClientError::Exhausted {
            attempts,
            last_status,
            source: last_error,
        })
    }
}

fn run_handler(handler: &mut Option<Handler<'_>>, body: &str) -> Result<(), String> {
    match handler {
        Some(handler) => handler(body),
        None => Ok(()),
    }
}
