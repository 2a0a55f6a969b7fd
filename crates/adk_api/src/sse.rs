use crate::events::EventRecord;

/// Incremental parser for SSE text streams.
///
/// Event blocks are separated by a blank line. Chunk boundaries carry no
/// meaning: bytes are buffered until a full block is available, and the
/// residual buffer can be flushed explicitly once the stream ends because
/// the gateway does not guarantee a terminating blank line.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete event blocks.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<EventRecord> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);
            decode_frame(&frame, &mut events);
        }

        events
    }

    /// Decode whatever is still buffered after the stream has closed.
    pub fn finish(&mut self) -> Vec<EventRecord> {
        let frame = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();

        if !frame.trim().is_empty() {
            decode_frame(&frame, &mut events);
        }

        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn decode_frame(frame: &str, events: &mut Vec<EventRecord>) {
    for payload in data_payloads(frame) {
        match serde_json::from_str::<EventRecord>(payload) {
            Ok(event) => events.push(event),
            // Malformed lines never abort the stream.
            Err(error) => tracing::debug!(%error, "dropping undecodable event line"),
        }
    }
}

/// Each `data:` line is decoded independently; other lines are framing noise.
fn data_payloads(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
}

#[cfg(test)]
mod tests {
    use super::SseStreamParser;

    fn deltas(events: &[crate::events::EventRecord]) -> Vec<String> {
        events
            .iter()
            .flat_map(|event| event.text_deltas().map(str::to_string))
            .collect()
    }

    #[test]
    fn block_split_across_chunks_yields_one_delta() {
        let mut parser = SseStreamParser::default();

        let first = parser.feed(b"data: {\"content\":{\"pa");
        assert!(first.is_empty());

        let second = parser.feed(b"rts\":[{\"text\":\"hi\"}]}}\n\n");
        assert_eq!(deltas(&second), vec!["hi"]);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn malformed_line_is_dropped_and_well_formed_line_survives() {
        let mut parser = SseStreamParser::default();
        let events = parser.feed(
            b"data: {not json\ndata: {\"content\":{\"parts\":[{\"text\":\"ok\"}]}}\n\n",
        );

        assert_eq!(deltas(&events), vec!["ok"]);
    }

    #[test]
    fn data_lines_in_one_block_decode_independently() {
        let mut parser = SseStreamParser::default();
        let events = parser.feed(
            b"data: {\"content\":{\"parts\":[{\"text\":\"a\"}]}}\ndata: {\"content\":{\"parts\":[{\"text\":\"b\"}]}}\n\n",
        );

        assert_eq!(deltas(&events), vec!["a", "b"]);
    }

    #[test]
    fn residual_without_trailing_blank_line_is_flushed_on_finish() {
        let mut parser = SseStreamParser::default();

        let streamed = parser.feed(b"data: {\"content\":{\"parts\":[{\"text\":\"tail\"}]}}");
        assert!(streamed.is_empty());

        let flushed = parser.finish();
        assert_eq!(deltas(&flushed), vec!["tail"]);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut parser = SseStreamParser::default();
        let events = parser.feed(
            b": keep-alive\nevent: message\ndata: {\"content\":{\"parts\":[{\"text\":\"x\"}]}}\n\n",
        );

        assert_eq!(deltas(&events), vec!["x"]);
    }

    #[test]
    fn finish_on_blank_buffer_yields_nothing() {
        let mut parser = SseStreamParser::default();
        let _ = parser.feed(b"data: {\"content\":{\"parts\":[{\"text\":\"x\"}]}}\n\n");
        assert!(parser.finish().is_empty());
    }
}
