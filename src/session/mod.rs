//! The session: owned state for one host connection and the reentrant
//! machinery built on top of it (dispatch, evaluation, marshaling).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::protocol::channel::{Channel, ChannelError, SharedWriter};
use crate::protocol::codec::ArrayCodec;
use crate::protocol::handles::HandleTable;
use crate::runtime::env::Env;
use crate::runtime::value::Value;

mod builtins;
mod dispatch;
mod eval;
pub mod interrupt;
mod marshal;
mod ops;

pub use dispatch::LoopExit;
pub use marshal::{EncodeFn, EncodePredicate};

/// Failure of evaluating or executing guest code.
///
/// Only `Channel` is fatal; everything else is caught at the command
/// boundary and turned into an error frame or a null return.
#[derive(Debug)]
pub enum EvalError {
    /// Ordinary guest-level failure, reported to the host as text.
    Message(String),
    /// The user interrupt flag fired during evaluation.
    Interrupted,
    /// A quit command arrived while a nested call was in flight.
    Quit,
    /// The stream died; unwinds the whole serve loop.
    Channel(ChannelError),
}

impl EvalError {
    pub fn msg(text: impl Into<String>) -> Self {
        EvalError::Message(text.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Message(text) => f.write_str(text),
            EvalError::Interrupted => f.write_str("interrupted"),
            EvalError::Quit => f.write_str("quit"),
            EvalError::Channel(err) => write!(f, "{}", err),
        }
    }
}

impl From<String> for EvalError {
    fn from(text: String) -> Self {
        EvalError::Message(text)
    }
}

/// All state for one host connection.
///
/// The handle table, return-mode counter, and evaluation environment
/// live here so every mutation goes through session methods; the only
/// process-wide state left is the signal-fed interrupt flag.
pub struct Session {
    pub(crate) channel: Channel,
    pub(crate) handles: HandleTable,
    /// While positive, the marshaler allocates handles for everything.
    pub(crate) return_mode: i32,
    pub(crate) env: Env,
    pub(crate) config: Config,
    pub(crate) codec: Box<dyn ArrayCodec>,
    pub(crate) registry: Vec<(EncodePredicate, EncodeFn)>,
    interrupt: Arc<AtomicBool>,
}

impl Session {
    pub fn new(
        reader: Box<dyn std::io::BufRead>,
        writer: SharedWriter,
        config: Config,
        codec: Box<dyn ArrayCodec>,
    ) -> Self {
        let mut session = Self {
            channel: Channel::new(reader, writer),
            handles: HandleTable::new(),
            return_mode: 0,
            env: Env::new(),
            config,
            codec,
            registry: marshal::default_registry(),
            interrupt: interrupt::shared_flag(),
        };
        builtins::install(&mut session);
        session
    }

    /// Substitute a private interrupt flag (tests use this to avoid
    /// sharing the signal-fed process flag).
    pub fn set_interrupt_flag(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = flag;
    }

    /// Consume a pending interrupt. The dispatch loop completes an
    /// interrupted command as a null return, not an error.
    pub(crate) fn check_interrupt(&self) -> Result<(), EvalError> {
        if self.interrupt.swap(false, Ordering::SeqCst) {
            Err(EvalError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Shared outbound writer, for proxy construction.
    pub(crate) fn writer(&self) -> SharedWriter {
        self.channel.writer()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn return_mode(&self) -> i32 {
        self.return_mode
    }

    /// Zero the return-mode counter for the duration of `f`, restoring
    /// the saved value on every path. Callback returns must use default
    /// encoding rules even when the outer context demanded handles.
    pub(crate) fn with_default_return_mode<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = std::mem::replace(&mut self.return_mode, 0);
        let result = f(self);
        self.return_mode = saved;
        result
    }

    /// Encode, substituting literal error text if the encoder itself
    /// fails; callers have already committed the response-type byte.
    pub fn encode_value(&mut self, value: &Value) -> String {
        self.encode(value)
            .unwrap_or_else(|e| format!("Marshal error: {}", e))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handles", &self.handles.len())
            .field("return_mode", &self.return_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod eval_test;
#[cfg(test)]
pub(crate) mod test_support;
