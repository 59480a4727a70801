use crate::StreamError;

/// Incremental `text/event-stream` framer.
///
/// Bytes are fed as they arrive; each completed event yields its data field
/// (multiple `data:` lines joined with `\n`). Lines may end in `\n`, `\r\n` or
/// `\r`, and chunk boundaries may fall anywhere, including inside a line
/// terminator or a UTF-8 sequence. Comments and fields other than `data` are
/// ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: String,
    has_data: bool,
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, StreamError> {
        let mut chunk = chunk;
        if self.after_cr {
            // `\r` ended the previous chunk; a leading `\n` completes the same terminator.
            if chunk.first() == Some(&b'\n') {
                chunk = &chunk[1..];
            }
            self.after_cr = false;
        }
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        let mut start = 0;
        let mut index = 0;
        while index < self.buffer.len() {
            let byte = self.buffer[index];
            if byte != b'\n' && byte != b'\r' {
                index += 1;
                continue;
            }
            let line = std::str::from_utf8(&self.buffer[start..index])
                .map_err(|err| StreamError::DecodeFailure(format!("invalid utf-8: {err}")))?
                .to_string();
            if byte == b'\r' {
                match self.buffer.get(index + 1) {
                    Some(b'\n') => index += 1,
                    Some(_) => {}
                    None => self.after_cr = true,
                }
            }
            index += 1;
            start = index;
            if let Some(message) = self.process_line(&line) {
                messages.push(message);
            }
        }
        self.buffer.drain(..start);
        Ok(messages)
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        let had_data = std::mem::take(&mut self.has_data);
        let data = std::mem::take(&mut self.data);
        (had_data && !data.is_empty()).then_some(data)
    }
}
