use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Only the subset of the format that chat completion endpoints use is
/// supported: `data` fields (joined by `\n` when repeated), comment
/// lines, and LF or CRLF line endings. Other fields are skipped.
pub struct Sse {
    buf: String,
    pending: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::Chunks)?
            else {
                // A trailing event without the blank line is incomplete.
                return Ok(None);
            };

            // A chunk boundary may split a multi-byte character.
            self.pending.extend_from_slice(&bytes);
            match str::from_utf8(&self.pending) {
                Ok(s) => {
                    self.buf.push_str(s);
                    self.pending.clear();
                }
                Err(err) if err.error_len().is_none() => {
                    let valid = err.valid_up_to();
                    let s = str::from_utf8(&self.pending[..valid])
                        .map_err(|_| Error::InvalidPayload)?;
                    self.buf.push_str(s);
                    self.pending.drain(..valid);
                }
                Err(_) => return Err(Error::InvalidPayload),
            }
            if self.buf.contains('\r') {
                self.buf = self.buf.replace("\r\n", "\n");
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some(end) = self.buf.find("\n\n") else {
                return Ok(None);
            };
            let block = self.buf[..end].to_owned();
            self.buf.drain(..end + 2);

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match field {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            // Blocks made of comments only carry no event.
            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}
