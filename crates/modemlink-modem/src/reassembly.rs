//! Reassembly of concatenated SMS segments into whole messages.
//!
//! Modems hand segments back in storage order, which for a multi-part
//! message received over a congested network can be any order at all. This
//! module groups stored segments by their concatenation reference and
//! stitches the text back together in sequence order.

use std::collections::HashMap;

use modemlink_pdu::{DecodedMessage, MessageKind, PduTimestamp};

/// One stored TPDU, decoded, together with its storage index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSegment {
    /// Storage index as reported by `+CMGL`, used for deletion. `None` when
    /// the listing line did not carry a parseable index.
    pub index: Option<u32>,
    pub message: DecodedMessage,
}

/// A whole message: either a standalone TPDU or the concatenation of all
/// stored segments sharing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    /// Peer address, from the first segment in sequence order.
    pub sender: String,
    /// Service centre timestamp of the first segment in sequence order.
    pub timestamp: Option<PduTimestamp>,
    /// Full text, segments concatenated in sequence order.
    pub text: String,
    pub kind: MessageKind,
    /// The segments this message was assembled from, in sequence order.
    /// A standalone message has exactly one.
    pub segments: Vec<MessageSegment>,
}

/// Groups segments into whole messages.
///
/// Standalone messages (no concatenation header) are emitted immediately, in
/// arrival order. Segments with a header are grouped by reference; each
/// group is emitted after all input is consumed, groups ordered by the first
/// appearance of their reference, segments within a group sorted by sequence
/// number. Missing segments are not waited for: an incomplete group is
/// emitted with the text of the segments that are present.
pub fn assemble(segments: Vec<MessageSegment>) -> Vec<TextMessage> {
    let mut out = Vec::new();
    let mut groups: HashMap<u16, Vec<MessageSegment>> = HashMap::new();
    let mut group_order: Vec<u16> = Vec::new();

    for segment in segments {
        match segment.message.segment {
            None => out.push(standalone(segment)),
            Some(info) => {
                let group = groups.entry(info.reference).or_insert_with(|| {
                    group_order.push(info.reference);
                    Vec::new()
                });
                group.push(segment);
            }
        }
    }

    for reference in group_order {
        let Some(mut group) = groups.remove(&reference) else {
            continue;
        };
        // Stable, so duplicate sequence numbers keep arrival order.
        group.sort_by_key(|s| s.message.segment.map(|info| info.sequence));

        let text = group
            .iter()
            .map(|s| s.message.text.as_str())
            .collect::<String>();
        let first = &group[0].message;
        out.push(TextMessage {
            sender: first.sender.clone(),
            timestamp: first.timestamp,
            text,
            kind: first.kind,
            segments: group,
        });
    }
    out
}

fn standalone(segment: MessageSegment) -> TextMessage {
    TextMessage {
        sender: segment.message.sender.clone(),
        timestamp: segment.message.timestamp,
        text: segment.message.text.clone(),
        kind: segment.message.kind,
        segments: vec![segment],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modemlink_pdu::SegmentInfo;

    fn deliver(text: &str, segment: Option<SegmentInfo>) -> DecodedMessage {
        DecodedMessage {
            sender: "+31641600986".to_owned(),
            timestamp: None,
            text: text.to_owned(),
            kind: MessageKind::Deliver,
            segment,
        }
    }

    fn part(index: u32, text: &str, reference: u16, sequence: u8, total: u8) -> MessageSegment {
        MessageSegment {
            index: Some(index),
            message: deliver(
                text,
                Some(SegmentInfo {
                    reference,
                    sequence,
                    total,
                }),
            ),
        }
    }

    fn single(index: u32, text: &str) -> MessageSegment {
        MessageSegment {
            index: Some(index),
            message: deliver(text, None),
        }
    }

    #[test]
    fn standalone_messages_keep_arrival_order() {
        let messages = assemble(vec![single(1, "first"), single(2, "second")]);
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn segments_are_joined_in_sequence_order() {
        let messages = assemble(vec![
            part(2, "world", 7, 2, 2),
            part(1, "hello ", 7, 1, 2),
        ]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello world");
        assert_eq!(messages[0].segments.len(), 2);
        assert_eq!(messages[0].segments[0].index, Some(1));
    }

    #[test]
    fn assembly_is_invariant_under_arrival_permutation() {
        let parts = [
            part(1, "one ", 9, 1, 3),
            part(2, "two ", 9, 2, 3),
            part(3, "three", 9, 3, 3),
        ];
        // All 6 orderings of three segments.
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let input: Vec<MessageSegment> = order.iter().map(|&i| parts[i].clone()).collect();
            let messages = assemble(input);
            assert_eq!(messages.len(), 1, "order {order:?}");
            assert_eq!(messages[0].text, "one two three", "order {order:?}");
        }
    }

    #[test]
    fn distinct_references_stay_separate() {
        let messages = assemble(vec![
            part(1, "a1 ", 1, 1, 2),
            part(2, "b1 ", 2, 1, 2),
            part(3, "a2", 1, 2, 2),
            part(4, "b2", 2, 2, 2),
        ]);
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["a1 a2", "b1 b2"]);
    }

    #[test]
    fn standalone_messages_come_before_grouped_ones() {
        let messages = assemble(vec![
            part(1, "tail", 3, 2, 2),
            single(2, "alone"),
            part(3, "head ", 3, 1, 2),
        ]);
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["alone", "head tail"]);
    }

    #[test]
    fn incomplete_group_is_emitted_with_present_segments() {
        let messages = assemble(vec![part(1, "only the middle", 5, 2, 3)]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "only the middle");
        assert_eq!(messages[0].segments.len(), 1);
    }

    #[test]
    fn metadata_comes_from_first_segment_in_sequence_order() {
        let mut late = part(9, "B", 4, 2, 2);
        late.message.sender = "+10000000000".to_owned();
        let early = part(8, "A", 4, 1, 2);
        let messages = assemble(vec![late, early]);
        assert_eq!(messages[0].sender, "+31641600986");
    }
}
