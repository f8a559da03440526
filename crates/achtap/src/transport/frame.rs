//! Message framing: `[type u8][len i32 LE][len bytes]`.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Largest payload the peer may declare (224 KiB).
pub const MAX_PAYLOAD_LEN: i32 = 229_376;

/// Reserved message types.
pub mod message {
    /// Full achievement list.
    pub const ACHIEVEMENT_ALL_DATA: u8 = 1;
    /// Graceful completion; carries no payload.
    pub const FINISHED: u8 = 0xFF;
}

fn stream_error(context: &str, e: io::Error) -> Error {
    Error::StreamCorrupted(format!("{context}: {e}"))
}

/// Read the next message type; `None` at end of stream.
pub fn read_message_type<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(stream_error("reading message type", e)),
        }
    }
}

/// Read and bounds-check a payload length prefix.
pub fn read_payload_len<R: Read + ?Sized>(reader: &mut R) -> Result<usize> {
    let mut prefix = [0u8; 4];
    reader
        .read_exact(&mut prefix)
        .map_err(|e| stream_error("reading payload length", e))?;
    let len = i32::from_le_bytes(prefix);
    if !(0..=MAX_PAYLOAD_LEN).contains(&len) {
        return Err(Error::StreamCorrupted(format!(
            "declared payload length {len} outside [0, {MAX_PAYLOAD_LEN}]"
        )));
    }
    Ok(len as usize)
}

/// Length-prefixed payload of the message currently being dispatched.
pub struct PayloadReader<'a> {
    inner: &'a mut dyn Read,
    consumed: bool,
}

impl<'a> PayloadReader<'a> {
    pub fn new(inner: &'a mut dyn Read) -> Self {
        Self {
            inner,
            consumed: false,
        }
    }

    /// Read the whole payload. Only one payload follows each message type.
    pub fn read_payload(&mut self) -> Result<Vec<u8>> {
        if self.consumed {
            return Err(Error::StreamCorrupted(
                "payload read twice for one message".to_string(),
            ));
        }
        let len = read_payload_len(&mut *self.inner)?;
        let mut payload = vec![0u8; len];
        self.inner
            .read_exact(&mut payload)
            .map_err(|e| stream_error("reading payload", e))?;
        self.consumed = true;
        Ok(payload)
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Skip the payload if nobody read it, keeping the stream in frame.
    pub fn discard(&mut self) -> Result<()> {
        if self.consumed {
            return Ok(());
        }
        let len = read_payload_len(&mut *self.inner)? as u64;
        let skipped = io::copy(&mut (&mut *self.inner).take(len), &mut io::sink())
            .map_err(|e| stream_error("skipping payload", e))?;
        if skipped != len {
            return Err(Error::StreamCorrupted(format!(
                "payload truncated: expected {len} bytes, got {skipped}"
            )));
        }
        self.consumed = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::message;

    /// Build a raw byte stream from framed messages.
    #[derive(Default)]
    pub struct StreamBuilder {
        bytes: Vec<u8>,
    }

    impl StreamBuilder {
        pub fn message(mut self, kind: u8, payload: &[u8]) -> Self {
            self.bytes.push(kind);
            self.bytes
                .extend_from_slice(&(payload.len() as i32).to_le_bytes());
            self.bytes.extend_from_slice(payload);
            self
        }

        pub fn raw(mut self, bytes: &[u8]) -> Self {
            self.bytes.extend_from_slice(bytes);
            self
        }

        pub fn finished(mut self) -> Self {
            self.bytes.push(message::FINISHED);
            self
        }

        pub fn build(self) -> Vec<u8> {
            self.bytes
        }
    }
}
