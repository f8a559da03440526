use std::io::Read;

use tracing::{debug, warn};

use super::completion::{CompletionSignal, SessionPhase};
use super::frame::{PayloadReader, message, read_message_type};
use super::registry::HandlerRegistry;
use crate::error::Result;

/// Receive loop over one connected channel.
pub struct Session<R: Read> {
    reader: R,
    registry: HandlerRegistry,
}

impl<R: Read> Session<R> {
    pub fn new(reader: R, registry: HandlerRegistry) -> Self {
        Self { reader, registry }
    }

    /// Read messages until the finish sentinel or end of stream.
    ///
    /// The sentinel moves `signal` to `Finished` before `on_finish` runs;
    /// `on_finish` is skipped when the exit watcher got there first. Errors
    /// move the signal to `Failed` and are returned.
    pub fn run<F: FnOnce()>(mut self, signal: &CompletionSignal, on_finish: F) -> Result<SessionPhase> {
        match self.receive() {
            Ok(true) => {
                if signal.finish() {
                    debug!("Finish message received");
                    on_finish();
                } else {
                    debug!("Finish message received after session ended as {}", signal.phase());
                }
            }
            Ok(false) => {
                if signal.disconnected() {
                    warn!("Channel closed without a finish message");
                }
            }
            Err(e) => {
                signal.fail();
                return Err(e);
            }
        }
        Ok(signal.phase())
    }

    /// Returns `true` on the sentinel, `false` at end of stream.
    fn receive(&mut self) -> Result<bool> {
        loop {
            let message_type = match read_message_type(&mut self.reader)? {
                None => return Ok(false),
                Some(message::FINISHED) => return Ok(true),
                Some(message_type) => message_type,
            };
            let mut payload = PayloadReader::new(&mut self.reader);
            if !self.registry.dispatch(message_type, &mut payload)? {
                debug!("Skipping message type {}", message_type);
            }
            payload.discard()?;
        }
    }
}
