//! Wire-level building blocks: length-prefixed framing, the handle
//! table, and the bulk-array codec interface.

pub mod channel;
pub mod codec;
pub mod handles;

pub use channel::{Channel, ChannelError, SharedWriter};
pub use codec::{ArrayCodec, JsonArrayCodec};
pub use handles::{Handle, HandleTable};

#[cfg(test)]
mod handles_test;
