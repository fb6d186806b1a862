//! Terminal markers and response boundary detection.
//!
//! A modem response is a run of unframed text; it is complete when it ends
//! with the success marker (`\r\nOK\r\n` by convention, or the `> ` input
//! prompt while the modem is waiting for a message payload) or when an
//! `ERROR` result appears anywhere in it.
//!
//! [`scan`] is intended to run once per received chunk over the whole
//! accumulated buffer, not once per byte. The priority of its checks is
//! fixed and deliberate: "ends with success" is tested before "contains
//! error", so an error-like substring inside echoed command text cannot
//! defeat a legitimate trailing success marker.

use modemlink_core::error::{DeviceError, DeviceErrorCategory};

/// Final result marker of a successful response.
pub const OK_TERMINATOR: &str = "\r\nOK\r\n";

/// Substring marking a failed response (`ERROR`, `+CMS ERROR: n`,
/// `+CME ERROR: n` all contain it).
pub const ERROR_MARKER: &str = "ERROR";

/// Input prompt the modem emits when it expects a follow-up payload
/// (e.g. the PDU hex after `AT+CMGS`). Used as the success marker of the
/// first half of a message send.
pub const PROMPT: &str = "> ";

/// Byte terminating a message payload after the input prompt (Ctrl-Z).
pub const PAYLOAD_TERMINATOR: char = '\u{1a}';

/// Outcome of scanning an accumulated response buffer for a terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No terminal marker yet. More data is needed.
    Pending,
    /// The buffer ends with the success marker: the response is complete.
    Complete,
    /// The buffer contains the error marker: the response failed.
    Failed,
}

/// Scan the accumulated response text for a terminal marker.
///
/// Checks, in fixed priority:
/// 1. `buffer` ends with `success_marker` -> [`ScanOutcome::Complete`]
/// 2. `buffer` contains `error_marker` -> [`ScanOutcome::Failed`]
/// 3. otherwise -> [`ScanOutcome::Pending`]
///
/// # Example
///
/// ```
/// use modemlink_at::protocol::{scan, ScanOutcome, ERROR_MARKER, OK_TERMINATOR};
///
/// let buf = "\r\n+CSQ: 22,0\r\n\r\nOK\r\n";
/// assert_eq!(scan(buf, OK_TERMINATOR, ERROR_MARKER), ScanOutcome::Complete);
/// ```
pub fn scan(buffer: &str, success_marker: &str, error_marker: &str) -> ScanOutcome {
    if buffer.ends_with(success_marker) {
        ScanOutcome::Complete
    } else if buffer.contains(error_marker) {
        ScanOutcome::Failed
    } else {
        ScanOutcome::Pending
    }
}

/// Extract a structured [`DeviceError`] from a failed response.
///
/// Recognises `+CMS ERROR: <code>` and `+CME ERROR: <code>`; anything else
/// containing the bare error marker becomes an uncategorised error with the
/// marker itself as the code.
pub fn classify_error(raw: &str) -> DeviceError {
    for (needle, category) in [
        ("+CMS ERROR:", DeviceErrorCategory::Cms),
        ("+CME ERROR:", DeviceErrorCategory::Cme),
    ] {
        if let Some(pos) = raw.find(needle) {
            let rest = &raw[pos + needle.len()..];
            let code = rest
                .trim_start()
                .split(|c: char| c == '\r' || c == '\n')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            return DeviceError {
                category,
                code,
                raw: raw.to_string(),
            };
        }
    }
    DeviceError {
        category: DeviceErrorCategory::Unknown,
        code: ERROR_MARKER.to_string(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // scan
    // ---------------------------------------------------------------

    #[test]
    fn scan_pending_without_marker() {
        assert_eq!(
            scan("\r\n+CSQ: 22,0", OK_TERMINATOR, ERROR_MARKER),
            ScanOutcome::Pending
        );
    }

    #[test]
    fn scan_complete_on_trailing_ok() {
        assert_eq!(
            scan("\r\n+CSQ: 22,0\r\n\r\nOK\r\n", OK_TERMINATOR, ERROR_MARKER),
            ScanOutcome::Complete
        );
    }

    #[test]
    fn scan_complete_on_bare_ok() {
        assert_eq!(
            scan("\r\nOK\r\n", OK_TERMINATOR, ERROR_MARKER),
            ScanOutcome::Complete
        );
    }

    #[test]
    fn scan_failed_on_error() {
        assert_eq!(
            scan("\r\n+CMS ERROR: 321\r\n", OK_TERMINATOR, ERROR_MARKER),
            ScanOutcome::Failed
        );
    }

    #[test]
    fn scan_success_wins_over_embedded_error_text() {
        // An error-like substring in echoed command text must not defeat a
        // legitimate trailing success marker.
        let buf = "AT+CUSD=1,\"ERROR\"\r\r\nOK\r\n";
        assert_eq!(scan(buf, OK_TERMINATOR, ERROR_MARKER), ScanOutcome::Complete);
    }

    #[test]
    fn scan_error_without_trailing_ok_fails() {
        let buf = "AT+CMGD=99\r\r\nERROR\r\n";
        assert_eq!(scan(buf, OK_TERMINATOR, ERROR_MARKER), ScanOutcome::Failed);
    }

    #[test]
    fn scan_prompt_as_success_marker() {
        assert_eq!(scan("\r\n> ", PROMPT, ERROR_MARKER), ScanOutcome::Complete);
        assert_eq!(scan("\r\n", PROMPT, ERROR_MARKER), ScanOutcome::Pending);
    }

    #[test]
    fn scan_ok_must_be_trailing() {
        // OK in the middle of the buffer is not terminal.
        assert_eq!(
            scan("\r\nOK\r\npartial", OK_TERMINATOR, ERROR_MARKER),
            ScanOutcome::Pending
        );
    }

    // ---------------------------------------------------------------
    // classify_error
    // ---------------------------------------------------------------

    #[test]
    fn classify_cms_error() {
        let e = classify_error("\r\n+CMS ERROR: 321\r\n");
        assert_eq!(e.category, DeviceErrorCategory::Cms);
        assert_eq!(e.code, "321");
    }

    #[test]
    fn classify_cme_error() {
        let e = classify_error("\r\n+CME ERROR: 10\r\n");
        assert_eq!(e.category, DeviceErrorCategory::Cme);
        assert_eq!(e.code, "10");
    }

    #[test]
    fn classify_verbose_cms_error() {
        let e = classify_error("\r\n+CMS ERROR: invalid memory index\r\n");
        assert_eq!(e.category, DeviceErrorCategory::Cms);
        assert_eq!(e.code, "invalid memory index");
    }

    #[test]
    fn classify_bare_error() {
        let e = classify_error("AT+BOGUS\r\r\nERROR\r\n");
        assert_eq!(e.category, DeviceErrorCategory::Unknown);
        assert_eq!(e.code, "ERROR");
    }

    #[test]
    fn classify_keeps_raw_text() {
        let raw = "\r\n+CMS ERROR: 500\r\n";
        assert_eq!(classify_error(raw).raw, raw);
    }
}
