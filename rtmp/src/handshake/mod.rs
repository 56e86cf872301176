//! The original (simple) RTMP handshake, as described by the official RTMP
//! specification.
//!
//! Both peers send a version byte plus a 1536 byte hello, then echo each
//! other's hello back.  In the simple form nothing is cryptographically
//! validated: the ack packet only has to arrive in full.  Note that this
//! format does *not* satisfy clients that insist on the digest (HMAC)
//! handshake.
//!
//! The state machine consumes exactly 1 + 1536 + 1536 inbound bytes before
//! it reports success; anything buffered past that point is handed back so
//! the chunk layer can pick up mid-stream.

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use std::io::{Cursor, Write};
use std::mem;

const RANDOM_DATA_SIZE: usize = 1528;
const PACKET_SIZE: usize = 8 + RANDOM_DATA_SIZE;
const RTMP_VERSION: u8 = 3;

#[derive(Eq, PartialEq, Debug, Clone)]
enum Stage {
    WaitingForC0,
    WaitingForC1,
    WaitingForC2,
    Complete,
}

/// What a call to [`Handshake::process_bytes`] produced.
#[derive(PartialEq, Debug)]
pub enum HandshakeOutcome {
    /// The handshake needs more inbound bytes.  Any response bytes must
    /// still be sent to the peer before waiting.
    InProgress { response_bytes: Vec<u8> },

    /// The handshake consumed its full 1 + 1536 + 1536 inbound bytes.
    /// `remaining_bytes` is whatever arrived beyond that and belongs to the
    /// chunk stream.
    Completed {
        /// The peer's start time, taken from the first four bytes of its hello
        peer_epoch: u32,
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
    },
}

/// State machine for one endpoint's side of the handshake.
pub struct Handshake {
    current_stage: Stage,
    peer_epoch: u32,
    buffer: Vec<u8>,
}

impl Handshake {
    /// Creates a new handshake along with the bytes that must be sent to the
    /// peer immediately: the version byte and our own hello packet (start
    /// time of zero, four zero bytes, 1528 bytes of random filler).
    pub fn new() -> Result<(Handshake, Vec<u8>), HandshakeError> {
        let mut outbound = Cursor::new(Vec::with_capacity(1 + PACKET_SIZE));
        outbound.write_u8(RTMP_VERSION)?;
        outbound.write_u32::<BigEndian>(0)?; // our epoch is always zero
        outbound.write_u32::<BigEndian>(0)?;
        outbound.write_all(&create_random_data())?;

        let handshake = Handshake {
            current_stage: Stage::WaitingForC0,
            peer_epoch: 0,
            buffer: Vec::new(),
        };

        Ok((handshake, outbound.into_inner()))
    }

    /// Feeds inbound bytes to the handshake.  Bytes may arrive in any
    /// fragmentation, down to one at a time; the handshake buffers partial
    /// packets internally, so the same bytes must not be passed in twice.
    pub fn process_bytes(&mut self, data: &[u8]) -> Result<HandshakeOutcome, HandshakeError> {
        self.buffer.extend_from_slice(data);

        let mut response_bytes = Vec::new();
        loop {
            match self.current_stage {
                Stage::WaitingForC0 => {
                    if self.buffer.is_empty() {
                        break;
                    }

                    if self.buffer.remove(0) != RTMP_VERSION {
                        return Err(HandshakeError::BadVersionId);
                    }

                    self.current_stage = Stage::WaitingForC1;
                }

                Stage::WaitingForC1 => {
                    if self.buffer.len() < PACKET_SIZE {
                        break;
                    }

                    let packet: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();
                    let mut cursor = Cursor::new(&packet[..]);
                    self.peer_epoch = cursor.read_u32::<BigEndian>()?;

                    // The ack packet is the peer's hello echoed verbatim;
                    // some clients check their payload comes back intact
                    response_bytes.extend(packet);
                    self.current_stage = Stage::WaitingForC2;
                }

                Stage::WaitingForC2 => {
                    if self.buffer.len() < PACKET_SIZE {
                        break;
                    }

                    // The simple handshake does not validate the peer's ack,
                    // receiving all 1536 bytes of it is enough
                    self.buffer.drain(..PACKET_SIZE);
                    self.current_stage = Stage::Complete;

                    return Ok(HandshakeOutcome::Completed {
                        peer_epoch: self.peer_epoch,
                        response_bytes,
                        remaining_bytes: mem::take(&mut self.buffer),
                    });
                }

                Stage::Complete => return Err(HandshakeError::HandshakeAlreadyCompleted),
            }
        }

        Ok(HandshakeOutcome::InProgress { response_bytes })
    }
}

fn create_random_data() -> [u8; RANDOM_DATA_SIZE] {
    let mut random_data = [0_u8; RANDOM_DATA_SIZE];
    rand::thread_rng().fill(&mut random_data[..]);
    random_data
}
