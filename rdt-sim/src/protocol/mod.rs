//! The alternating-bit protocol: packet format and the two entities.

pub mod context;
mod packet;
mod receiver;
mod sender;

pub use context::{ApplicationSink, EntityContext, RecordingSink};
pub use packet::{
    checksum, nack_value, Message, Packet, Payload, EMPTY_PAYLOAD, NACK_OFFSET, PAYLOAD_LEN,
};
pub use receiver::{Receiver, ReceiverCounters};
pub use sender::{Sender, SenderCounters, SenderState};
