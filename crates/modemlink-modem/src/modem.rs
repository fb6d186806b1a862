//! The [`Modem`] handle: public operations on a connected modem.

use std::time::Duration;

use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, info, warn};

use modemlink_at::{commands, protocol, AtResponse, MessageStatus};
use modemlink_core::{ConnectionState, Error, ModemEvent, Result, StateMachine};
use modemlink_pdu::{encode_submit, EncodeOptions, EncodedSegment, Encoding, PduError};

use crate::boot;
use crate::reassembly::{assemble, MessageSegment, TextMessage};
use crate::session::{SessionHandle, SessionRequest};

/// Handle to a modem session.
///
/// Construct one through [`ModemBuilder`](crate::ModemBuilder). All methods
/// take `&self`; commands are serialized by the background session task, so
/// the handle can be shared across tasks behind an `Arc`.
#[derive(Debug)]
pub struct Modem {
    session: SessionHandle,
    event_tx: broadcast::Sender<ModemEvent>,
    state: Mutex<StateMachine>,
    identity: Mutex<Identity>,
    command_timeout: Duration,
    send_timeout: Duration,
    storage: String,
}

#[derive(Debug, Default)]
struct Identity {
    model: Option<String>,
    serial_number: Option<String>,
}

impl Modem {
    pub(crate) fn new(
        session: SessionHandle,
        event_tx: broadcast::Sender<ModemEvent>,
        command_timeout: Duration,
        send_timeout: Duration,
        storage: String,
    ) -> Self {
        Modem {
            session,
            event_tx,
            state: Mutex::new(StateMachine::new()),
            identity: Mutex::new(Identity::default()),
            command_timeout,
            send_timeout,
            storage,
        }
    }

    // -----------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------

    /// Run the boot sequence and bring the session to `Connected`.
    ///
    /// Steps run strictly in order and the first failure aborts the whole
    /// sequence with [`Error::Boot`] naming the step. After a successful
    /// sequence the model and serial number are read; those queries are
    /// best-effort and a failure there only logs a warning.
    pub(crate) async fn connect(&self) -> Result<()> {
        for (step, command) in boot::sequence(&self.storage) {
            debug!(%step, command = %command.escape_debug().to_string(), "boot step");
            if let Err(source) = self
                .execute(command.into_bytes(), protocol::OK_TERMINATOR, self.command_timeout)
                .await
            {
                self.transition(ConnectionState::Disconnected).await;
                return Err(Error::Boot {
                    step,
                    source: Box::new(source),
                });
            }
        }

        self.transition(ConnectionState::Connected).await;
        self.read_identity().await;
        info!("modem session established");
        Ok(())
    }

    /// Re-run the boot sequence on the existing session, without reopening
    /// the transport.
    ///
    /// Useful after a modem-side reset (`AT+CFUN=1,1` and friends) has
    /// dropped the configuration back to defaults while the serial port
    /// stayed up. Fails with [`Error::NotConnected`] once the session has
    /// been disconnected.
    pub async fn reboot(&self) -> Result<()> {
        if self.state().await == ConnectionState::Disconnected {
            return Err(Error::NotConnected);
        }
        self.connect().await
    }

    /// Close the transport and end the session. Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        self.transition(ConnectionState::Disconnected).await;

        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .session
            .cmd_tx
            .send(SessionRequest::Shutdown { ack: ack_tx })
            .await
            .is_ok()
        {
            // Session already gone counts as disconnected.
            let _ = ack_rx.await;
        }
        Ok(())
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.current()
    }

    /// Subscribe to session events: state changes and command traffic.
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.event_tx.subscribe()
    }

    /// Model reported by `AT+CGMM` during connect, if the query succeeded.
    pub async fn model(&self) -> Option<String> {
        self.identity.lock().await.model.clone()
    }

    /// Serial number (IMEI) reported by `AT+CGSN` during connect.
    pub async fn serial_number(&self) -> Option<String> {
        self.identity.lock().await.serial_number.clone()
    }

    // -----------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------

    /// List stored messages with the given status filter, reassembling
    /// concatenated segments into whole messages.
    ///
    /// A stored entry whose PDU fails to decode is skipped with a warning;
    /// one corrupt slot does not hide the rest of the inbox.
    pub async fn list_messages(&self, status: MessageStatus) -> Result<Vec<TextMessage>> {
        self.ensure_connected().await?;
        let response = self
            .run(commands::list_messages(status), self.command_timeout)
            .await?;

        let mut segments = Vec::new();
        for item in &response.items {
            if item.command_echo.as_deref() != Some("+CMGL") {
                debug!(echo = ?item.command_echo, "ignoring non-listing item in +CMGL response");
                continue;
            }
            let index = item.arg_u32(0);
            let Some(hex) = item.data.as_deref() else {
                warn!(?index, "stored message listing without a PDU line");
                continue;
            };
            match modemlink_pdu::decode(hex) {
                Ok(message) => segments.push(MessageSegment { index, message }),
                Err(e) => warn!(?index, error = %e, "skipping undecodable stored message"),
            }
        }
        Ok(assemble(segments))
    }

    /// Delete the stored message at the given index.
    pub async fn delete_message(&self, index: u32) -> Result<()> {
        self.ensure_connected().await?;
        self.run(commands::delete_message(index), self.command_timeout)
            .await?;
        Ok(())
    }

    /// Delete every stored segment of an assembled message.
    pub async fn delete(&self, message: &TextMessage) -> Result<()> {
        for segment in &message.segments {
            if let Some(index) = segment.index {
                self.delete_message(index).await?;
            }
        }
        Ok(())
    }

    /// Send a text message, splitting into concatenated segments as needed.
    ///
    /// Returns the modem's acknowledgement for each transmitted segment
    /// (the `+CMGS` response carrying the assigned message reference).
    ///
    /// Text is encoded in the GSM 7-bit alphabet when it fits, widening to
    /// UCS-2 automatically otherwise. Use
    /// [`send_message_with`](Self::send_message_with) to pin the encoding.
    pub async fn send_message(&self, destination: &str, text: &str) -> Result<Vec<AtResponse>> {
        self.send_message_with(destination, text, &EncodeOptions::default())
            .await
    }

    /// Send a text message with explicit encode options.
    ///
    /// When `options.encoding` is set, that alphabet is used strictly; a
    /// text it cannot represent fails rather than widening.
    pub async fn send_message_with(
        &self,
        destination: &str,
        text: &str,
        options: &EncodeOptions,
    ) -> Result<Vec<AtResponse>> {
        self.ensure_connected().await?;

        let segments = match encode_submit(destination, text, options) {
            Ok(segments) => segments,
            Err(PduError::Unrepresentable(c)) if options.encoding.is_none() => {
                debug!(character = %c, "text not representable in GSM 7-bit, widening to UCS-2");
                let widened = EncodeOptions {
                    encoding: Some(Encoding::Ucs2),
                };
                encode_submit(destination, text, &widened)?
            }
            Err(e) => return Err(e.into()),
        };

        let total = segments.len();
        let mut confirmations = Vec::with_capacity(total);
        for (i, segment) in segments.iter().enumerate() {
            match self.send_segment(segment).await {
                Ok(confirmation) => confirmations.push(confirmation),
                Err(source) => {
                    return Err(Error::SendFailed {
                        segment: i,
                        sent: i,
                        source: Box::new(source),
                    });
                }
            }
            debug!(segment = i + 1, total, "message segment accepted");
        }
        Ok(confirmations)
    }

    /// One `AT+CMGS` exchange: command, wait for the `> ` prompt, then the
    /// hex PDU terminated with Ctrl-Z. The payload stage uses the longer
    /// send timeout because the modem forwards to the network before
    /// answering.
    async fn send_segment(&self, segment: &EncodedSegment) -> Result<AtResponse> {
        self.execute_checked(
            commands::send_message(segment.tpdu_len).into_bytes(),
            protocol::PROMPT,
            self.command_timeout,
        )
        .await?;
        self.execute_checked(
            commands::message_payload(&segment.hex).into_bytes(),
            protocol::OK_TERMINATOR,
            self.send_timeout,
        )
        .await
    }

    /// Execute an arbitrary AT command and return the structured response.
    ///
    /// A trailing `\r` is added if missing. Meant for queries this crate has
    /// no dedicated method for (signal quality, operator, etc.).
    pub async fn command(&self, text: &str) -> Result<AtResponse> {
        self.ensure_connected().await?;
        self.run(commands::raw(text), self.command_timeout).await
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn read_identity(&self) {
        let mut identity = self.identity.lock().await;
        match self.run(commands::request_model(), self.command_timeout).await {
            Ok(response) => identity.model = response.first_text().map(str::to_owned),
            Err(e) => warn!(error = %e, "model query failed"),
        }
        match self
            .run(commands::request_serial_number(), self.command_timeout)
            .await
        {
            Ok(response) => identity.serial_number = response.first_text().map(str::to_owned),
            Err(e) => warn!(error = %e, "serial number query failed"),
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        match self.state().await {
            ConnectionState::Connected => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    async fn transition(&self, next: ConnectionState) {
        let mut state = self.state.lock().await;
        if state.apply(next) {
            let _ = self.event_tx.send(ModemEvent::StateChanged(next));
        }
    }

    /// Run one OK-terminated command, dropping the session if the transport
    /// is gone.
    async fn run(&self, command: String, timeout: Duration) -> Result<AtResponse> {
        self.execute_checked(command.into_bytes(), protocol::OK_TERMINATOR, timeout)
            .await
    }

    /// [`execute`](Self::execute) plus the fatal-error check: a dead
    /// transport forces the session to `Disconnected` no matter which
    /// operation tripped over it.
    async fn execute_checked(
        &self,
        payload: Vec<u8>,
        success_marker: &str,
        timeout: Duration,
    ) -> Result<AtResponse> {
        let result = self.execute(payload, success_marker, timeout).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, "fatal transport error, dropping session");
                self.transition(ConnectionState::Disconnected).await;
            }
        }
        result
    }

    /// Hand one command to the session task and wait for its reply.
    ///
    /// A torn-down session task (channel closed or reply dropped) reports as
    /// [`Error::Timeout`]: from the caller's point of view the command was
    /// issued and no terminated response ever came back.
    async fn execute(
        &self,
        payload: Vec<u8>,
        success_marker: &str,
        timeout: Duration,
    ) -> Result<AtResponse> {
        let (response_tx, response_rx) = oneshot::channel();
        self.session
            .cmd_tx
            .send(SessionRequest::Execute {
                payload,
                success_marker: success_marker.to_owned(),
                timeout,
                response_tx,
            })
            .await
            .map_err(|_| Error::Timeout)?;

        match response_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModemBuilder;
    use modemlink_core::DeviceErrorCategory;
    use modemlink_pdu::MessageKind;
    use modemlink_test_harness::MockTransport;

    const BOOT: [(&str, &str); 7] = [
        ("AT\r", "\r\nOK\r\n"),
        ("AT+CMGF=0\r", "\r\nOK\r\n"),
        ("AT+CMEE=1\r", "\r\nOK\r\n"),
        ("ATE0\r", "\r\nOK\r\n"),
        ("AT+CPMS=\"SM\",\"SM\",\"SM\"\r", "\r\n+CPMS: 4,30,4,30,4,30\r\n\r\nOK\r\n"),
        ("AT+CGMM\r", "\r\nEC25\r\n\r\nOK\r\n"),
        ("AT+CGSN\r", "\r\n867962041234567\r\n\r\nOK\r\n"),
    ];

    fn booted_mock() -> MockTransport {
        let mut mock = MockTransport::new();
        for (request, reply) in BOOT {
            mock.expect(request, reply);
        }
        mock
    }

    async fn connect(mock: MockTransport) -> Modem {
        ModemBuilder::new()
            .connect_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_runs_the_boot_sequence_and_reads_identity() {
        let modem = connect(booted_mock()).await;
        assert_eq!(modem.state().await, ConnectionState::Connected);
        assert_eq!(modem.model().await.as_deref(), Some("EC25"));
        assert_eq!(modem.serial_number().await.as_deref(), Some("867962041234567"));
    }

    #[tokio::test]
    async fn boot_aborts_on_first_failing_step() {
        let mut mock = MockTransport::new();
        mock.expect("AT\r", "\r\nOK\r\n");
        mock.expect("AT+CMGF=0\r", "\r\nOK\r\n");
        mock.expect("AT+CMEE=1\r", "\r\nERROR\r\n");
        // No expectation for ATE0: it must never be sent.

        let err = ModemBuilder::new()
            .connect_with_transport(Box::new(mock))
            .await
            .unwrap_err();
        match err {
            Error::Boot { step, source } => {
                assert_eq!(step, modemlink_core::BootStep::ErrorReporting);
                assert!(matches!(*source, Error::Device(_)));
            }
            other => panic!("expected Boot error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_failure_fails_connect() {
        let mut mock = MockTransport::new();
        mock.expect("AT\r", "\r\nERROR\r\n");

        let err = ModemBuilder::new()
            .connect_with_transport(Box::new(mock))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Boot {
                step: modemlink_core::BootStep::Probe,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn identity_query_failure_is_not_fatal() {
        let mut mock = MockTransport::new();
        for (request, reply) in &BOOT[..5] {
            mock.expect(request, reply);
        }
        mock.expect("AT+CGMM\r", "\r\nERROR\r\n");
        mock.expect("AT+CGSN\r", "\r\n867962041234567\r\n\r\nOK\r\n");

        let modem = connect(mock).await;
        assert_eq!(modem.state().await, ConnectionState::Connected);
        assert_eq!(modem.model().await, None);
        assert_eq!(modem.serial_number().await.as_deref(), Some("867962041234567"));
    }

    #[tokio::test]
    async fn list_messages_reassembles_multipart_inbox() {
        let mut mock = booted_mock();
        // Three stored PDUs: the second half of a two-part message, a
        // standalone message, then the first half. Listing order is storage
        // order, not sequence order.
        mock.expect(
            "AT+CMGL=4\r",
            concat!(
                "\r\n+CMGL: 1,1,,30\r\n00440B911346610089F60000021020304050000C050003070202EE6F399B0C\r\n",
                "+CMGL: 2,1,,37\r\n0791448720003023240B917238880900F10000993092516195800AE8329BFD4697D9EC37\r\n",
                "+CMGL: 3,1,,31\r\n00440B911346610089F60000021020304050000D050003070201D06536FB0D02\r\n",
                "\r\nOK\r\n"
            ),
        );

        let modem = connect(mock).await;
        let messages = modem.list_messages(MessageStatus::All).await.unwrap();
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].text, "hellohello");
        assert_eq!(messages[0].sender, "+27838890001");
        assert_eq!(messages[0].segments[0].index, Some(2));

        assert_eq!(messages[1].text, "hello world");
        assert_eq!(messages[1].kind, MessageKind::Deliver);
        let indices: Vec<Option<u32>> =
            messages[1].segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, [Some(3), Some(1)]);
    }

    #[tokio::test]
    async fn list_messages_skips_undecodable_entries() {
        let mut mock = booted_mock();
        mock.expect(
            "AT+CMGL=4\r",
            concat!(
                "\r\n+CMGL: 1,1,,5\r\nNOTHEX\r\n",
                "+CMGL: 2,1,,37\r\n0791448720003023240B917238880900F10000993092516195800AE8329BFD4697D9EC37\r\n",
                "\r\nOK\r\n"
            ),
        );

        let modem = connect(mock).await;
        let messages = modem.list_messages(MessageStatus::All).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hellohello");
    }

    #[tokio::test]
    async fn send_message_runs_prompt_then_payload() {
        let mut mock = booted_mock();
        mock.expect("AT+CMGS=18\r", "\r\n> ");
        mock.expect(
            "0001000B911326880736F4000005E8329BFD06\u{1a}",
            "\r\n+CMGS: 1\r\n\r\nOK\r\n",
        );

        let modem = connect(mock).await;
        let confirmations = modem.send_message("+31628870634", "hello").await.unwrap();
        assert_eq!(confirmations.len(), 1);
        assert_eq!(confirmations[0].items[0].command_echo.as_deref(), Some("+CMGS"));
        assert_eq!(confirmations[0].items[0].arg_u32(0), Some(1));
    }

    #[tokio::test]
    async fn reboot_reruns_the_boot_sequence() {
        let mut mock = booted_mock();
        for (request, reply) in BOOT {
            mock.expect(request, reply);
        }

        let modem = connect(mock).await;
        modem.reboot().await.unwrap();
        assert_eq!(modem.state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn reboot_after_disconnect_is_rejected() {
        let modem = connect(booted_mock()).await;
        modem.disconnect().await.unwrap();
        assert!(matches!(modem.reboot().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn send_rejection_reports_the_failing_segment() {
        let mut mock = booted_mock();
        mock.expect("AT+CMGS=18\r", "\r\n+CMS ERROR: 500\r\n");

        let modem = connect(mock).await;
        let err = modem.send_message("+31628870634", "hello").await.unwrap_err();
        match err {
            Error::SendFailed { segment, sent, source } => {
                assert_eq!(segment, 0);
                assert_eq!(sent, 0);
                match *source {
                    Error::Device(device) => {
                        assert_eq!(device.category, DeviceErrorCategory::Cms);
                        assert_eq!(device.code, "500");
                    }
                    other => panic!("expected Device error, got {other:?}"),
                }
            }
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_during_send_drops_the_session() {
        // No expectation for AT+CMGS: the transport itself fails mid-send.
        let modem = connect(booted_mock()).await;

        let err = modem.send_message("+31628870634", "hello").await.unwrap_err();
        match err {
            Error::SendFailed { source, .. } => assert!(source.is_fatal()),
            other => panic!("expected SendFailed, got {other:?}"),
        }
        assert_eq!(modem.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn wide_text_widens_to_ucs2_by_default() {
        let mut mock = booted_mock();
        // UCS-2, 4 characters: DCS 08, UDL 8 octets.
        mock.expect("AT+CMGS=21\r", "\r\n> ");
        mock.expect(
            "0001000B911326880736F400080865E5672C8A9E0021\u{1a}",
            "\r\n+CMGS: 2\r\n\r\nOK\r\n",
        );

        let modem = connect(mock).await;
        modem.send_message("+31628870634", "日本語!").await.unwrap();
    }

    #[tokio::test]
    async fn explicit_encoding_is_strict() {
        let modem = connect(booted_mock()).await;
        let options = EncodeOptions {
            encoding: Some(Encoding::Gsm7),
        };
        let err = modem
            .send_message_with("+31628870634", "日本語", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[tokio::test]
    async fn operations_require_a_connected_session() {
        let modem = connect(booted_mock()).await;
        modem.disconnect().await.unwrap();
        assert_eq!(modem.state().await, ConnectionState::Disconnected);

        let err = modem.send_message("+31628870634", "hi").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let modem = connect(booted_mock()).await;
        modem.disconnect().await.unwrap();
        modem.disconnect().await.unwrap();
        assert_eq!(modem.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn state_change_events_are_broadcast() {
        let mut mock = booted_mock();
        mock.expect("AT+CMGD=2\r", "\r\nOK\r\n");

        let modem = connect(mock).await;
        let mut events = modem.subscribe();
        modem.delete_message(2).await.unwrap();
        modem.disconnect().await.unwrap();

        let mut saw_disconnect = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, ModemEvent::StateChanged(ConnectionState::Disconnected)) {
                saw_disconnect = true;
            }
        }
        assert!(saw_disconnect);
    }
}
