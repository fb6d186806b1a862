//! Structuring of a terminated response into typed items.
//!
//! Once a terminal boundary has been found (see [`protocol`](crate::protocol)),
//! the accumulated text is split into logical items. The modem prefixes each
//! structured or unsolicited line with a sentinel character (`+CMGL: ...`,
//! `^SMGO: ...`), so item boundaries are "line break followed by a sentinel".
//!
//! Each item is then split into a header line and a payload: the header
//! carries the command echo and a comma-delimited argument list after `": "`,
//! and everything after the header's line break is the data payload (for
//! `+CMGL` that payload is the PDU hex).

/// Characters the modem uses to prefix structured response lines.
const SENTINELS: [char; 2] = ['+', '^'];

/// One logical line-group inside a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseItem {
    /// The echoed command or response prefix (e.g. `"+CMGL"`), if any.
    pub command_echo: Option<String>,
    /// Comma-delimited arguments from the header line, in order. Tokens are
    /// trimmed and stripped of surrounding quotes; empty positional tokens
    /// are kept so indexes stay stable.
    pub args: Vec<String>,
    /// The payload following the header line (e.g. PDU hex), if any.
    pub data: Option<String>,
    /// The raw text this item was parsed from.
    pub raw: String,
}

impl ResponseItem {
    /// Parse argument `index` as an integer, if present and numeric.
    pub fn arg_u32(&self, index: usize) -> Option<u32> {
        self.args.get(index)?.parse().ok()
    }
}

/// A complete, terminated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtResponse {
    /// `true`: this response ended with the success marker. A failed
    /// response never reaches [`parse`]; it is reported as a
    /// [`DeviceError`](modemlink_core::DeviceError) instead.
    pub ok: bool,
    /// The items in the order they appeared on the wire.
    pub items: Vec<ResponseItem>,
    /// The full raw response text, success marker included.
    pub raw: String,
}

impl AtResponse {
    /// The first item's payload, falling back to its echo line.
    ///
    /// Identity queries (`AT+CGMM`, `AT+CGSN`) answer with a bare text line
    /// that parses as an echo-only item when command echo is disabled, or as
    /// an echo with data when it is still enabled. This accessor covers both.
    pub fn first_text(&self) -> Option<&str> {
        let item = self.items.first()?;
        item.data.as_deref().or(item.command_echo.as_deref())
    }
}

/// Structure a successfully terminated response.
///
/// Strips the trailing `success_marker`, splits the remainder into items at
/// every line break followed by a sentinel character, and parses each item.
/// Substrings that are empty after trimming are dropped silently, so an
/// immediate success marker yields zero items.
///
/// # Example
///
/// ```
/// use modemlink_at::response::parse;
/// use modemlink_at::protocol::OK_TERMINATOR;
///
/// let resp = parse("\r\n+CSCA: 5\r\nhello\r\n\r\nOK\r\n", OK_TERMINATOR);
/// assert!(resp.ok);
/// assert_eq!(resp.items.len(), 1);
/// assert_eq!(resp.items[0].command_echo.as_deref(), Some("+CSCA"));
/// assert_eq!(resp.items[0].args, vec!["5"]);
/// assert_eq!(resp.items[0].data.as_deref(), Some("hello"));
/// ```
pub fn parse(raw: &str, success_marker: &str) -> AtResponse {
    let body = raw.strip_suffix(success_marker).unwrap_or(raw);

    let items = split_items(body)
        .into_iter()
        .filter_map(parse_item)
        .collect();

    AtResponse {
        ok: true,
        items,
        raw: raw.to_string(),
    }
}

/// Split response body text at every line break followed by a sentinel.
fn split_items(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut boundaries = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            if let Some(next) = body[i + 1..].chars().next() {
                if SENTINELS.contains(&next) {
                    boundaries.push(i + 1);
                }
            }
        }
    }

    let mut parts = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for b in boundaries {
        parts.push(&body[start..b]);
        start = b;
    }
    parts.push(&body[start..]);
    parts
}

/// Parse one item substring. Returns `None` for pure-whitespace input.
fn parse_item(raw: &str) -> Option<ResponseItem> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Header line vs payload.
    let (header, payload) = match trimmed.find('\n') {
        Some(pos) => (trimmed[..pos].trim_end_matches('\r'), trimmed[pos + 1..].trim()),
        None => (trimmed, ""),
    };

    // Echo vs argument list within the header.
    let (echo, args) = match header.split_once(": ") {
        Some((echo, arg_str)) => {
            let args = arg_str
                .split(',')
                .map(|t| t.trim().trim_matches('"').to_string())
                .collect();
            (echo.trim(), args)
        }
        None => (header.trim(), Vec::new()),
    };

    Some(ResponseItem {
        command_echo: (!echo.is_empty()).then(|| echo.to_string()),
        args,
        data: (!payload.is_empty()).then(|| payload.to_string()),
        raw: raw.to_string(),
    })
}
