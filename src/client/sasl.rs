//! The SASL authentication handshake.
//!
//! A session is driven by the router: [`start`](struct.SaslSession.html#method.start) once the
//! server acknowledges the `sasl` capability, then one of the `on_*` methods for each
//! `AUTHENTICATE +`, `903` or `904` that arrives. Unrelated events may arrive in between.
//!
//! Failures are retried a bounded number of times. `EXTERNAL` is retried once, then the session
//! falls back to `PLAIN`, which is also retried once before the handshake is aborted. At most
//! four mechanism lines are ever sent.
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::time::Instant;

use crate::client::data::SaslConfig;
use crate::client::transport::Transport;
use crate::error::{Error, Result};
use crate::proto::{CapSubCommand, Command};

/// The longest `AUTHENTICATE` payload a single line may carry.
const CHUNK_SIZE: usize = 400;

/// A SASL mechanism.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaslMechanism {
    /// `PLAIN`: account name and password.
    Plain,
    /// `EXTERNAL`: the TLS client certificate.
    External,
    /// Anything else. Never negotiated.
    Other(String),
}

impl SaslMechanism {
    /// Parses a configured mechanism name, ignoring case.
    pub fn from_name(name: &str) -> SaslMechanism {
        if name.eq_ignore_ascii_case("plain") {
            SaslMechanism::Plain
        } else if name.eq_ignore_ascii_case("external") {
            SaslMechanism::External
        } else {
            SaslMechanism::Other(name.to_ascii_uppercase())
        }
    }

    /// The name as sent on the wire.
    pub fn name(&self) -> &str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::External => "EXTERNAL",
            SaslMechanism::Other(name) => name,
        }
    }
}

impl fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a session is in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaslState {
    /// Nothing sent yet.
    Idle,
    /// A mechanism or payload was sent and the server has not answered.
    AwaitingContinuation,
    /// The server accepted the credentials.
    Succeeded,
    /// The handshake was aborted.
    Failed,
}

/// One authentication attempt.
#[derive(Clone, Debug)]
pub struct SaslSession {
    username: String,
    password: String,
    mechanism: SaslMechanism,
    retries: u32,
    state: SaslState,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl SaslSession {
    /// Creates a session from the SASL section of the configuration.
    pub fn new(config: &SaslConfig) -> SaslSession {
        SaslSession {
            username: config.username().to_owned(),
            password: config.password().to_owned(),
            mechanism: SaslMechanism::from_name(&config.mechanism()),
            retries: 0,
            state: SaslState::Idle,
            timeout: config.timeout(),
            deadline: None,
        }
    }

    /// Gets the mechanism currently in use.
    pub fn mechanism(&self) -> &SaslMechanism {
        &self.mechanism
    }

    /// Gets the number of failures counted so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Gets the handshake state.
    pub fn state(&self) -> SaslState {
        self.state
    }

    /// Gets the instant the pending server reply is due by.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the session has finished, either way.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SaslState::Succeeded | SaslState::Failed)
    }

    fn send_mechanism_line<T: Transport + ?Sized>(&mut self, transport: &T, data: String) -> Result<()> {
        transport.send(Command::AUTHENTICATE(data))?;
        self.state = SaslState::AwaitingContinuation;
        self.deadline = Some(Instant::now() + self.timeout);
        Ok(())
    }

    fn abort<T: Transport + ?Sized>(&mut self, transport: &T, reason: &str) -> Result<()> {
        self.state = SaslState::Failed;
        self.deadline = None;
        transport.send(Command::AUTHENTICATE("*".to_owned()))?;
        Err(Error::Authentication(reason.to_owned()))
    }

    /// Begins the handshake with the mechanisms the server offers.
    ///
    /// Fails with `Error::Configuration`, without sending anything, if the configured mechanism
    /// is not offered or is offered but not implemented.
    pub fn start<T, S>(&mut self, offered: &[S], transport: &T) -> Result<()>
    where
        T: Transport + ?Sized,
        S: AsRef<str>,
    {
        let name = self.mechanism.name().to_owned();
        if !offered.iter().any(|m| m.as_ref().eq_ignore_ascii_case(&name)) {
            return Err(Error::Configuration(format!(
                "SASL mechanism {} not supported by server",
                name
            )));
        }
        if let SaslMechanism::Other(_) = self.mechanism {
            return Err(Error::Configuration(format!(
                "SASL mechanism {} not implemented",
                name
            )));
        }
        debug!("starting SASL {} as {}", name, self.username);
        self.send_mechanism_line(transport, name)
    }

    /// Answers the server's `AUTHENTICATE +`.
    pub fn on_continuation<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        if self.state != SaslState::AwaitingContinuation {
            debug!("ignoring SASL continuation in state {:?}", self.state);
            return Ok(());
        }
        match self.mechanism {
            SaslMechanism::Plain => {
                let payload = plain_payload(&self.username, &self.password);
                let chunks = chunk_payload(&payload);
                let last = chunks.len() - 1;
                for (i, chunk) in chunks.into_iter().enumerate() {
                    if i == last {
                        self.send_mechanism_line(transport, chunk)?;
                    } else {
                        transport.send(Command::AUTHENTICATE(chunk))?;
                    }
                }
                Ok(())
            }
            SaslMechanism::External => self.send_mechanism_line(transport, "+".to_owned()),
            SaslMechanism::Other(ref name) => {
                let reason = format!("SASL mechanism {} not implemented", name);
                self.abort(transport, &reason)
            }
        }
    }

    /// Handles `904 SASLFAILED`.
    pub fn on_failure<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        self.retries += 1;
        warn!("SASL {} failed (attempt {})", self.mechanism, self.retries);
        match self.mechanism {
            SaslMechanism::External if self.retries >= 2 => {
                self.retries = 1;
                self.mechanism = SaslMechanism::Plain;
                info!("falling back to SASL PLAIN");
                self.send_mechanism_line(transport, "PLAIN".to_owned())
            }
            SaslMechanism::External => self.send_mechanism_line(transport, "EXTERNAL".to_owned()),
            SaslMechanism::Plain if self.retries >= 2 => {
                self.abort(transport, "SASL authentication failed")
            }
            SaslMechanism::Plain => self.send_mechanism_line(transport, "PLAIN".to_owned()),
            SaslMechanism::Other(_) => self.abort(transport, "SASL authentication failed"),
        }
    }

    /// Handles `903 SASLSUCCESS`.
    pub fn on_success<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        info!("SASL {} authentication succeeded", self.mechanism);
        self.state = SaslState::Succeeded;
        self.deadline = None;
        transport.send(Command::CAP(CapSubCommand::END, None))
    }

    /// Aborts the handshake if the server has not answered in time.
    pub fn check_deadline<T: Transport + ?Sized>(&mut self, now: Instant, transport: &T) -> Result<()> {
        match self.deadline {
            Some(deadline) if self.state == SaslState::AwaitingContinuation && now >= deadline => {
                error!("SASL {} timed out waiting for the server", self.mechanism);
                self.abort(transport, "SASL authentication timed out")
            }
            _ => Ok(()),
        }
    }
}

/// `base64(authzid \0 authcid \0 password)`, with the account name as both identities.
fn plain_payload(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}\0{}\0{}", username, username, password))
}

/// Splits a payload into `AUTHENTICATE` arguments. A payload that fills its last chunk exactly
/// is terminated by `+`.
fn chunk_payload(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return vec!["+".to_owned()];
    }
    let mut chunks: Vec<String> = payload
        .as_bytes()
        .chunks(CHUNK_SIZE)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    if payload.len() % CHUNK_SIZE == 0 {
        chunks.push("+".to_owned());
    }
    chunks
}

#[cfg(test)]
mod test {
    use super::{chunk_payload, plain_payload, SaslMechanism, SaslSession, SaslState};
    use crate::client::data::SaslConfig;
    use crate::client::transport::{LogView, Logged};
    use crate::client::mock::MockTransport;
    use crate::error::Error;
    use std::time::Duration;
    use tokio::time::Instant;

    fn session(mechanism: &str) -> SaslSession {
        SaslSession::new(&SaslConfig {
            username: Some("athena".into()),
            password: Some("hunter2".into()),
            mechanism: Some(mechanism.into()),
            timeout_secs: Some(10),
        })
    }

    fn transport() -> (Logged<MockTransport>, LogView) {
        let logged = Logged::wrap(MockTransport::new());
        let view = logged.view();
        (logged, view)
    }

    #[test]
    fn external_falls_back_to_plain() {
        let (t, view) = transport();
        let mut sasl = session("external");
        sasl.start(&["EXTERNAL", "PLAIN"], &t).unwrap();
        sasl.on_failure(&t).unwrap();
        sasl.on_failure(&t).unwrap();
        assert_eq!(
            view.sent(),
            vec!["AUTHENTICATE EXTERNAL", "AUTHENTICATE EXTERNAL", "AUTHENTICATE PLAIN"]
        );
        assert_eq!(sasl.mechanism(), &SaslMechanism::Plain);
        assert_eq!(sasl.retries(), 1);
        assert_eq!(sasl.state(), SaslState::AwaitingContinuation);
    }

    #[test]
    fn plain_gives_up() {
        let (t, view) = transport();
        let mut sasl = session("PLAIN");
        sasl.start(&["PLAIN"], &t).unwrap();
        sasl.on_failure(&t).unwrap();
        match sasl.on_failure(&t) {
            Err(Error::Authentication(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            view.sent(),
            vec!["AUTHENTICATE PLAIN", "AUTHENTICATE PLAIN", "AUTHENTICATE *"]
        );
        assert_eq!(sasl.state(), SaslState::Failed);
    }

    #[test]
    fn bounded_attempts() {
        let (t, view) = transport();
        let mut sasl = session("external");
        sasl.start(&["EXTERNAL", "PLAIN"], &t).unwrap();
        assert!(sasl.on_failure(&t).is_ok());
        assert!(sasl.on_failure(&t).is_ok());
        assert!(sasl.on_failure(&t).is_err());
        let mechanism_lines = view.sent().iter().filter(|l| *l != "AUTHENTICATE *").count();
        assert_eq!(mechanism_lines, 3);
        assert!(mechanism_lines <= 4);
    }

    #[test]
    fn mechanism_not_offered() {
        let (t, view) = transport();
        let mut sasl = session("external");
        match sasl.start(&["PLAIN"], &t) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("not supported by server")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(view.sent().is_empty());
        assert_eq!(sasl.state(), SaslState::Idle);
    }

    #[test]
    fn mechanism_not_implemented() {
        let (t, view) = transport();
        let mut sasl = session("scram-sha-256");
        match sasl.start(&["PLAIN", "SCRAM-SHA-256"], &t) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("not implemented")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(view.sent().is_empty());
    }

    #[test]
    fn continuation_payloads() {
        let (t, view) = transport();
        let mut sasl = session("plain");
        sasl.start(&["plain"], &t).unwrap();
        sasl.on_continuation(&t).unwrap();
        assert_eq!(
            view.sent()[1],
            format!("AUTHENTICATE {}", plain_payload("athena", "hunter2"))
        );
        assert_eq!(plain_payload("athena", "hunter2"), "YXRoZW5hAGF0aGVuYQBodW50ZXIy");

        let (t, view) = transport();
        let mut sasl = session("external");
        sasl.start(&["EXTERNAL"], &t).unwrap();
        sasl.on_continuation(&t).unwrap();
        sasl.on_success(&t).unwrap();
        assert_eq!(
            view.sent(),
            vec!["AUTHENTICATE EXTERNAL", "AUTHENTICATE +", "CAP END"]
        );
        assert!(sasl.is_terminal());
        assert_eq!(sasl.deadline(), None);
    }

    #[test]
    fn long_payloads_are_chunked() {
        assert_eq!(chunk_payload(""), vec!["+"]);
        let exact = "a".repeat(400);
        assert_eq!(chunk_payload(&exact), vec![exact.clone(), "+".to_owned()]);
        let long = "b".repeat(450);
        let chunks = chunk_payload(&long);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 400);
        assert_eq!(chunks[1].len(), 50);
    }

    #[tokio::test]
    async fn deadline_aborts() {
        tokio::time::pause();
        let (t, view) = transport();
        let mut sasl = session("external");
        sasl.start(&["EXTERNAL"], &t).unwrap();
        let deadline = sasl.deadline().unwrap();
        assert_eq!(deadline - Instant::now(), Duration::from_secs(10));

        assert!(sasl.check_deadline(Instant::now(), &t).is_ok());
        tokio::time::advance(Duration::from_secs(11)).await;
        match sasl.check_deadline(Instant::now(), &t) {
            Err(Error::Authentication(msg)) => assert!(msg.contains("timed out")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(view.sent(), vec!["AUTHENTICATE EXTERNAL", "AUTHENTICATE *"]);
        assert_eq!(sasl.state(), SaslState::Failed);
    }
}
