//! Data units exchanged between the layers of the simulation.
//!
//! - A [`Message`] travels from the application layer down to entity A.
//! - A [`Packet`] travels between the entities through the emulated channel.
//!
//! Both are plain values. The channel stores its own copy of every packet it
//! accepts, so an entity can keep mutating its buffers after sending.
//!
//! # Checksum
//!
//! The checksum is a simple additive sum of the sequence number, the
//! acknowledgement number and every payload byte. It is compared as an
//! ordinary integer; arithmetic wraps instead of panicking on overflow.
//!
//! # NACK encoding
//!
//! The receiver has no dedicated NACK flag. It signals "resend" by setting
//! `ack_num` to the expected value minus [`NACK_OFFSET`]; see [`nack_value`].

use std::fmt;

/// Size in bytes of a message and of a packet payload.
pub const PAYLOAD_LEN: usize = 20;

/// Offset subtracted from the expected value to encode a NACK in `ack_num`.
pub const NACK_OFFSET: i32 = 2;

/// Fixed-size application data.
pub type Payload = [u8; PAYLOAD_LEN];

/// Payload carried by control packets (ACK and NACK).
pub const EMPTY_PAYLOAD: Payload = [0; PAYLOAD_LEN];

/// The `ack_num` value that encodes a NACK relative to `expected`.
pub const fn nack_value(expected: i32) -> i32 {
    expected.wrapping_sub(NACK_OFFSET)
}

/// Additive checksum over the header fields and the payload.
pub fn checksum(seq_num: i32, ack_num: i32, payload: &Payload) -> i32 {
    payload
        .iter()
        .fold(seq_num.wrapping_add(ack_num), |sum, &byte| {
            sum.wrapping_add(i32::from(byte))
        })
}

/// A unit of application data handed from the application layer to entity A.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// The raw payload.
    pub data: Payload,
}

impl Message {
    /// Wrap raw application data.
    pub const fn new(data: Payload) -> Self {
        Self { data }
    }

    /// Synthesize the `index`-th message of a run.
    ///
    /// Message `n` is twenty copies of the lowercase letter `'a' + n % 26`.
    pub fn synthesize(index: u64) -> Self {
        // index % 26 < 26, the cast cannot truncate
        let letter = b'a' + (index % 26) as u8;
        Self::new([letter; PAYLOAD_LEN])
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("data", &PayloadDisplay(&self.data))
            .finish()
    }
}

/// A transport-layer packet.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Sequence number (alternates between 0 and 1 for data packets).
    pub seq_num: i32,
    /// Acknowledgement number, or a NACK encoded with [`nack_value`].
    pub ack_num: i32,
    /// Additive checksum stored by the sender.
    pub checksum: i32,
    /// Payload bytes.
    pub payload: Payload,
}

impl Packet {
    /// Build a packet with a freshly computed checksum.
    pub fn new(seq_num: i32, ack_num: i32, payload: Payload) -> Self {
        Self {
            seq_num,
            ack_num,
            checksum: checksum(seq_num, ack_num, &payload),
            payload,
        }
    }

    /// Build a control packet (ACK or NACK) with an all-zero payload.
    pub fn control(seq_num: i32, ack_num: i32) -> Self {
        Self::new(seq_num, ack_num, EMPTY_PAYLOAD)
    }

    /// Recompute the checksum from the current header fields and payload.
    pub fn compute_checksum(&self) -> i32 {
        checksum(self.seq_num, self.ack_num, &self.payload)
    }

    /// Whether the stored checksum matches the packet contents.
    pub fn is_intact(&self) -> bool {
        self.compute_checksum() == self.checksum
    }

    /// Whether this packet is a NACK for a data packet carrying `seq_num`.
    pub fn is_nack_for(&self, seq_num: i32) -> bool {
        self.ack_num == nack_value(seq_num)
    }

    /// Whether this packet acknowledges a data packet carrying `seq_num`.
    pub fn is_ack_for(&self, seq_num: i32) -> bool {
        self.ack_num == seq_num
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("seq", &self.seq_num)
            .field("ack", &self.ack_num)
            .field("checksum", &self.checksum)
            .field("payload", &PayloadDisplay(&self.payload))
            .finish()
    }
}

/// Renders printable payload bytes as text and everything else as `.`.
struct PayloadDisplay<'a>(&'a Payload);

impl fmt::Debug for PayloadDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .0
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() {
                    char::from(b)
                } else {
                    '.'
                }
            })
            .collect();
        write!(f, "\"{text}\"")
    }
}
