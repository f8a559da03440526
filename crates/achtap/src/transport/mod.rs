//! Message transport between the injected module and the collector.
//!
//! The module connects to a single-client duplex channel and writes framed
//! messages: one type byte, then (except for the finish sentinel) a
//! little-endian `i32` length and that many payload bytes. A
//! [`HandlerRegistry`] routes payloads by type; unhandled payloads are skipped
//! so the stream stays in frame.
//!
//! The receive loop and the process exit watcher race to end the session.
//! [`CompletionSignal`] decides the winner under one lock.

mod completion;
mod frame;
mod pipe;
mod registry;
mod session;

pub use completion::{CompletionSignal, SessionPhase};
pub use frame::{MAX_PAYLOAD_LEN, PayloadReader, message, read_message_type, read_payload_len};
pub use pipe::{DEFAULT_PIPE_NAME, PipeServer};
pub use registry::{Disposition, Handler, HandlerRegistry};
pub use session::Session;
