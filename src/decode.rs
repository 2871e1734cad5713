//! Incremental UTF-8 decoding for streamed response bodies.
//!
//! The chat endpoint streams raw text bytes with no framing, so a multi-byte
//! character can be split across two chunks. Decoding each chunk on its own
//! would turn the split character into replacement garbage; the decoder keeps
//! the incomplete suffix and completes it with the next chunk.

/// Stateful chunk-by-chunk UTF-8 decoder.
///
/// Invalid sequences decode to U+FFFD rather than failing the stream. The
/// carry buffer holds at most 3 bytes (the longest incomplete prefix of a
/// 4-byte character).
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode everything decodable from the carried bytes plus `chunk`,
    /// buffering a trailing incomplete character for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        // invalid sequence: substitute and keep going
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // incomplete trailing character: hold it for the next chunk
                        None => {
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush the carry at end of stream. A dangling incomplete character
    /// becomes U+FFFD instead of disappearing.
    pub fn finish(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        if carry.is_empty() {
            String::new()
        } else {
            String::from_utf8_lossy(&carry).into_owned()
        }
    }
}
