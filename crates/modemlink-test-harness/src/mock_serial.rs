//! Mock transport for deterministic testing of the command engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/reply pairs. This lets you test AT command generation, response
//! terminator detection, and PDU handling without real hardware.
//!
//! # Example
//!
//! ```
//! use modemlink_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the engine sends this command, return this reply.
//! mock.expect("AT+CSCA?\r", "\r\n+CSCA: \"+31628870634\",145\r\n\r\nOK\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use modemlink_core::{Error, Result, Transport};

/// A pre-loaded request/reply pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact text we expect to be sent.
    request: String,
    /// The text to return after the matching request, or `None` for a modem
    /// that stays silent until the caller's deadline.
    reply: Option<String>,
}

/// A mock [`Transport`] for testing the command engine without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// text is recorded and matched against the next expectation. The
/// corresponding reply is then returned by subsequent `receive()` calls,
/// split into chunks of at most [`chunk_limit`](Self::set_chunk_limit) bytes
/// to exercise fragmentary arrival.
///
/// If no expectation matches or the queue is exhausted, an error is returned.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/reply pairs.
    expectations: VecDeque<Expectation>,
    /// The reply pending for the next `receive()` calls.
    pending_reply: Option<Vec<u8>>,
    /// Cursor into the pending reply.
    reply_cursor: usize,
    /// Largest number of bytes one `receive()` call will return.
    chunk_limit: usize,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all text sent through this transport.
    sent_log: Vec<String>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending_reply: None,
            reply_cursor: 0,
            chunk_limit: usize::MAX,
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected request/reply pair.
    ///
    /// When `send()` is called with text matching `request`, subsequent
    /// `receive()` calls return `reply`.
    pub fn expect(&mut self, request: &str, reply: &str) {
        self.expectations.push_back(Expectation {
            request: request.to_owned(),
            reply: Some(reply.to_owned()),
        });
    }

    /// Add an expected request the modem never answers.
    ///
    /// `receive()` calls after the matching `send()` wait out their full
    /// timeout and return [`Error::Timeout`], like a wedged modem.
    pub fn expect_silence(&mut self, request: &str) {
        self.expectations.push_back(Expectation {
            request: request.to_owned(),
            reply: None,
        });
    }

    /// Cap the number of bytes a single `receive()` call returns, so replies
    /// arrive in fragments the way a serial port delivers them.
    pub fn set_chunk_limit(&mut self, limit: usize) {
        self.chunk_limit = limit.max(1);
    }

    /// Return all text that has been sent through this transport.
    ///
    /// Each element is the text from one `send()` call.
    pub fn sent_data(&self) -> &[String] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let text = String::from_utf8_lossy(data).into_owned();
        self.sent_log.push(text.clone());

        // Match against the next expectation.
        if let Some(expectation) = self.expectations.pop_front() {
            if text != expectation.request {
                return Err(Error::Transport(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    expectation.request, text
                )));
            }
            self.pending_reply = expectation.reply.map(String::into_bytes);
            self.reply_cursor = 0;
            Ok(())
        } else {
            Err(Error::Transport(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if let Some(ref reply) = self.pending_reply {
            let remaining = &reply[self.reply_cursor..];
            if !remaining.is_empty() {
                let n = remaining.len().min(buf.len()).min(self.chunk_limit);
                buf[..n].copy_from_slice(&remaining[..n]);
                self.reply_cursor += n;
                if self.reply_cursor >= reply.len() {
                    self.pending_reply = None;
                    self.reply_cursor = 0;
                }
                return Ok(n);
            }
        }

        // Nothing to deliver: behave like a quiet serial port and wait out
        // the timeout so deadline handling sees real elapsed time.
        tokio::time::sleep(timeout).await;
        Err(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending_reply = None;
        self.reply_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
