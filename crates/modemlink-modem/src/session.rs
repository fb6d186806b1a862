//! Background session task: single owner of the transport.
//!
//! AT modems are strictly half-duplex at the command level: one command in
//! flight at a time, each answered by a terminated response. The session task
//! enforces that by owning the transport exclusively. Commands arrive over an
//! `mpsc` channel and are executed one at a time; the caller gets its
//! response back on a `oneshot`. The channel is what serializes concurrent
//! callers, so no separate lock or token is needed.
//!
//! Between commands the task drains anything the modem pushes on its own
//! (URCs like `+CMTI` or `RING`). Those are logged and dropped; nothing in
//! this crate acts on unsolicited traffic.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use modemlink_at::{protocol, response, AtResponse, ScanOutcome};
use modemlink_core::{Error, ModemEvent, Result, Transport};

/// A request sent from the modem handle to the session task.
pub(crate) enum SessionRequest {
    /// An AT command to be forwarded to the transport.
    Execute {
        /// Full wire form of the command, terminator included.
        payload: Vec<u8>,
        /// Success marker that completes the response, usually
        /// [`protocol::OK_TERMINATOR`], or [`protocol::PROMPT`] while
        /// waiting for the `> ` payload prompt.
        success_marker: String,
        /// Wall-clock budget for the whole exchange, measured from now.
        timeout: Duration,
        response_tx: oneshot::Sender<Result<AtResponse>>,
    },
    /// Close the transport and exit the session task.
    Shutdown { ack: oneshot::Sender<()> },
}

/// Handle to the background session task.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    pub cmd_tx: mpsc::Sender<SessionRequest>,
    /// Kept so the task can be aborted when the modem is dropped.
    #[allow(dead_code)]
    pub task_handle: JoinHandle<()>,
}

/// Spawn the background session task.
///
/// The task owns the transport exclusively. Commands are sent via the
/// returned `SessionHandle.cmd_tx` channel.
pub(crate) fn spawn(
    transport: Box<dyn Transport>,
    event_tx: broadcast::Sender<ModemEvent>,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionRequest>(16);

    let task_handle = tokio::spawn(session_loop(transport, event_tx, cmd_rx));

    SessionHandle {
        cmd_tx,
        task_handle,
    }
}

/// The main loop of the background session task.
///
/// Uses `tokio::select! { biased; }` to prioritize command handling over
/// idle draining of unsolicited traffic.
async fn session_loop(
    mut transport: Box<dyn Transport>,
    event_tx: broadcast::Sender<ModemEvent>,
    mut cmd_rx: mpsc::Receiver<SessionRequest>,
) {
    loop {
        tokio::select! {
            biased;

            // Priority: handle outgoing commands.
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionRequest::Execute { payload, success_marker, timeout, response_tx }) => {
                        let result = correlate(
                            &mut *transport,
                            &payload,
                            &success_marker,
                            timeout,
                            &event_tx,
                        )
                        .await;
                        let _ = response_tx.send(result);
                    }
                    Some(SessionRequest::Shutdown { ack }) => {
                        if let Err(e) = transport.close().await {
                            debug!(error = %e, "error closing transport on shutdown");
                        }
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        // All senders dropped -- the Modem was dropped.
                        debug!("session command channel closed, exiting session loop");
                        if let Err(e) = transport.close().await {
                            debug!(error = %e, "error closing transport on drop");
                        }
                        break;
                    }
                }
            }

            // Idle: drain unsolicited traffic from the modem.
            _ = async {
                let mut buf = [0u8; 256];
                match transport.receive(&mut buf, Duration::from_millis(100)).await {
                    Ok(n) if n > 0 => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        debug!(text = %text.escape_debug().to_string(), "dropping unsolicited data");
                    }
                    _ => {
                        // Timeout or error -- just loop back.
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            } => {}
        }
    }
}

/// Execute one command on the transport: send it, then accumulate chunks
/// until the success marker or an error marker appears, or the wall-clock
/// deadline passes.
///
/// The deadline is fixed when the command starts; slow trickling data does
/// not extend it. Each arriving chunk re-scans the whole accumulated buffer,
/// so markers split across chunk boundaries are still found.
async fn correlate(
    transport: &mut dyn Transport,
    payload: &[u8],
    success_marker: &str,
    timeout: Duration,
    event_tx: &broadcast::Sender<ModemEvent>,
) -> Result<AtResponse> {
    transport.send(payload).await?;
    let _ = event_tx.send(ModemEvent::CommandSent {
        text: String::from_utf8_lossy(payload).into_owned(),
    });

    let deadline = Instant::now() + timeout;
    let mut accumulated = String::new();
    let mut buf = [0u8; 256];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(
                partial = %accumulated.escape_debug().to_string(),
                "command deadline passed"
            );
            return Err(Error::Timeout);
        }

        match transport.receive(&mut buf, remaining).await {
            Ok(0) => return Err(Error::ConnectionLost),
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                // Trace every chunk as it arrives, so partial traffic is
                // visible even when the command later times out.
                let _ = event_tx.send(ModemEvent::DataReceived {
                    text: chunk.clone(),
                });
                accumulated.push_str(&chunk);
                match protocol::scan(&accumulated, success_marker, protocol::ERROR_MARKER) {
                    ScanOutcome::Complete => {
                        return Ok(response::parse(&accumulated, success_marker));
                    }
                    ScanOutcome::Failed => {
                        return Err(Error::Device(protocol::classify_error(&accumulated)));
                    }
                    ScanOutcome::Pending => {}
                }
            }
            // The transport's own read timed out; the deadline check at the
            // top of the loop decides whether to keep waiting.
            Err(Error::Timeout) => {}
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modemlink_test_harness::MockTransport;

    async fn run_one(
        mock: MockTransport,
        payload: &str,
        success_marker: &str,
        timeout: Duration,
    ) -> Result<AtResponse> {
        let (event_tx, _event_rx) = broadcast::channel(16);
        let handle = spawn(Box::new(mock), event_tx);

        let (tx, rx) = oneshot::channel();
        handle
            .cmd_tx
            .send(SessionRequest::Execute {
                payload: payload.as_bytes().to_vec(),
                success_marker: success_marker.to_owned(),
                timeout,
                response_tx: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn completes_on_ok_terminator() {
        let mut mock = MockTransport::new();
        mock.expect("AT+CGMM\r", "\r\nEC25\r\n\r\nOK\r\n");

        let response = run_one(mock, "AT+CGMM\r", protocol::OK_TERMINATOR, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.ok);
        assert_eq!(response.first_text(), Some("EC25"));
    }

    #[tokio::test]
    async fn assembles_fragmented_response() {
        let mut mock = MockTransport::new();
        mock.set_chunk_limit(3);
        mock.expect("AT+CSQ\r", "\r\n+CSQ: 21,99\r\n\r\nOK\r\n");

        let response = run_one(mock, "AT+CSQ\r", protocol::OK_TERMINATOR, Duration::from_secs(1))
            .await
            .unwrap();
        let item = &response.items[0];
        assert_eq!(item.command_echo.as_deref(), Some("+CSQ"));
        assert_eq!(item.args, ["21", "99"]);
    }

    #[tokio::test]
    async fn device_error_is_classified() {
        let mut mock = MockTransport::new();
        mock.expect("AT+CMGR=99\r", "\r\n+CMS ERROR: 321\r\n");

        let err = run_one(mock, "AT+CMGR=99\r", protocol::OK_TERMINATOR, Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            Error::Device(device) => {
                assert_eq!(device.code, "321");
                assert_eq!(device.category, modemlink_core::DeviceErrorCategory::Cms);
            }
            other => panic!("expected Device error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_modem_times_out_at_the_deadline() {
        let mut mock = MockTransport::new();
        mock.expect_silence("AT\r");

        let started = std::time::Instant::now();
        let err = run_one(mock, "AT\r", protocol::OK_TERMINATOR, Duration::from_millis(80))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn trickling_data_does_not_extend_the_deadline() {
        // Reply never contains a terminator; the chunked delivery keeps
        // producing data, but the deadline still cuts the command off.
        let mut mock = MockTransport::new();
        mock.set_chunk_limit(1);
        mock.expect("AT\r", "never terminated ");

        let err = run_one(mock, "AT\r", protocol::OK_TERMINATOR, Duration::from_millis(80))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    async fn run_one_with_events(
        mock: MockTransport,
        payload: &str,
        timeout: Duration,
    ) -> (Result<AtResponse>, Vec<String>) {
        let (event_tx, mut event_rx) = broadcast::channel(16);
        let handle = spawn(Box::new(mock), event_tx);

        let (tx, rx) = oneshot::channel();
        handle
            .cmd_tx
            .send(SessionRequest::Execute {
                payload: payload.as_bytes().to_vec(),
                success_marker: protocol::OK_TERMINATOR.to_owned(),
                timeout,
                response_tx: tx,
            })
            .await
            .unwrap();
        let result = rx.await.unwrap();

        let mut chunks = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            if let ModemEvent::DataReceived { text } = event {
                chunks.push(text);
            }
        }
        (result, chunks)
    }

    #[tokio::test]
    async fn each_received_chunk_is_traced() {
        let mut mock = MockTransport::new();
        mock.set_chunk_limit(4);
        mock.expect("AT\r", "\r\nOK\r\n");

        let (result, chunks) =
            run_one_with_events(mock, "AT\r", Duration::from_secs(1)).await;
        assert!(result.unwrap().ok);
        assert_eq!(chunks, ["\r\nOK", "\r\n"]);
    }

    #[tokio::test]
    async fn partial_data_is_traced_before_a_timeout() {
        // Reply never terminates; the chunk must still show up as an event.
        let mut mock = MockTransport::new();
        mock.expect("AT\r", "trickle");

        let (result, chunks) =
            run_one_with_events(mock, "AT\r", Duration::from_millis(50)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
        assert_eq!(chunks, ["trickle"]);
    }

    #[tokio::test]
    async fn prompt_marker_completes_without_ok() {
        let mut mock = MockTransport::new();
        mock.expect("AT+CMGS=18\r", "\r\n> ");

        let response = run_one(mock, "AT+CMGS=18\r", protocol::PROMPT, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.ok);
    }

    #[tokio::test]
    async fn shutdown_closes_the_transport() {
        let mock = MockTransport::new();
        let (event_tx, _event_rx) = broadcast::channel(16);
        let handle = spawn(Box::new(mock), event_tx);

        let (ack_tx, ack_rx) = oneshot::channel();
        handle
            .cmd_tx
            .send(SessionRequest::Shutdown { ack: ack_tx })
            .await
            .unwrap();
        ack_rx.await.unwrap();
    }
}
