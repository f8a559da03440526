use std::collections::HashMap;

use tracing::trace;

use super::frame::PayloadReader;
use crate::error::Result;

/// What to do with a handler after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    /// Unregister; later messages of the same type are skipped.
    Remove,
}

pub type Handler = Box<dyn FnMut(&mut PayloadReader<'_>) -> Result<Disposition> + Send>;

/// Message type -> handler table.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<u8, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `message_type`, replacing any previous one.
    pub fn register<F>(&mut self, message_type: u8, handler: F)
    where
        F: FnMut(&mut PayloadReader<'_>) -> Result<Disposition> + Send + 'static,
    {
        self.handlers.insert(message_type, Box::new(handler));
    }

    pub fn is_registered(&self, message_type: u8) -> bool {
        self.handlers.contains_key(&message_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `message_type`. Returns `false` when none is
    /// registered; the payload is then left for the caller to discard.
    pub fn dispatch(&mut self, message_type: u8, payload: &mut PayloadReader<'_>) -> Result<bool> {
        let Some(handler) = self.handlers.get_mut(&message_type) else {
            trace!("No handler for message type {}", message_type);
            return Ok(false);
        };
        if handler(payload)? == Disposition::Remove {
            self.handlers.remove(&message_type);
            trace!("Handler for message type {} removed", message_type);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn framed(payload: &[u8]) -> Cursor<Vec<u8>> {
        let mut bytes = (payload.len() as i32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        Cursor::new(bytes)
    }

    #[test]
    fn test_dispatch_unregistered() {
        let mut registry = HandlerRegistry::new();
        let mut cursor = framed(b"xyz");
        let mut reader = PayloadReader::new(&mut cursor);
        assert!(!registry.dispatch(7, &mut reader).unwrap());
        assert!(!reader.is_consumed());
    }

    #[test]
    fn test_one_shot_handler_is_removed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        {
            let seen = Arc::clone(&seen);
            registry.register(1, move |payload| {
                seen.lock().unwrap().push(payload.read_payload()?);
                Ok(Disposition::Remove)
            });
        }
        assert!(registry.is_registered(1));

        let mut cursor = framed(b"abc");
        assert!(registry.dispatch(1, &mut PayloadReader::new(&mut cursor)).unwrap());
        assert!(!registry.is_registered(1));
        assert!(registry.is_empty());

        let mut cursor = framed(b"def");
        assert!(!registry.dispatch(1, &mut PayloadReader::new(&mut cursor)).unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_kept_handler_runs_again() {
        let mut calls = 0usize;
        let counter = Arc::new(Mutex::new(0usize));
        let mut registry = HandlerRegistry::new();
        {
            let counter = Arc::clone(&counter);
            registry.register(2, move |payload| {
                payload.discard()?;
                *counter.lock().unwrap() += 1;
                Ok(Disposition::Keep)
            });
        }
        for _ in 0..3 {
            let mut cursor = framed(b"");
            registry.dispatch(2, &mut PayloadReader::new(&mut cursor)).unwrap();
            calls += 1;
        }
        assert_eq!(*counter.lock().unwrap(), calls);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut registry = HandlerRegistry::new();
        registry.register(1, |payload| {
            payload.read_payload()?;
            Ok(Disposition::Keep)
        });
        let mut cursor = Cursor::new((-5i32).to_le_bytes().to_vec());
        assert!(registry.dispatch(1, &mut PayloadReader::new(&mut cursor)).is_err());
    }
}
