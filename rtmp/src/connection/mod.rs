//! The thin driver that composes the handshake, the chunk codecs, and the
//! server session into one byte-in/byte-out unit.
//!
//! A transport owns one [`ServerConnection`] per accepted socket, calls
//! [`ServerConnection::feed_inbound`] with whatever bytes arrive, writes out
//! whatever [`ServerConnection::drain_outbound`] returns, and reacts to the
//! returned events.  The connection never touches sockets, timers, or
//! threads itself.

mod errors;

pub use self::errors::ConnectionError;

use crate::chunk_io::{ChunkDeserializer, ChunkSerializer};
use crate::handshake::{Handshake, HandshakeOutcome};
use crate::messages::RtmpMessage;
use crate::sessions::{
    ServerSession, ServerSessionConfig, ServerSessionEvent, ServerSessionOutput,
};
use log::warn;
use std::mem;

enum ConnectionStage {
    Handshaking(Handshake),
    Active,
    Closed,
}

/// The server side of a single RTMP connection, minus the socket.
///
/// On construction the handshake's opening bytes are already queued for
/// sending, so a transport can write before it reads.  Inbound bytes are
/// processed strictly in arrival order; outbound bytes must be sent exactly
/// as drained, since both the handshake and chunk header compression depend
/// on nothing being dropped or reordered.
///
/// Acknowledgements owed for a batch of inbound bytes are queued before any
/// responses triggered by the messages inside that batch.
pub struct ServerConnection {
    stage: ConnectionStage,
    peer_epoch: Option<u32>,
    deserializer: ChunkDeserializer,
    serializer: ChunkSerializer,
    session: ServerSession,
    outbound: Vec<u8>,
}

impl ServerConnection {
    /// Creates a connection for a freshly accepted transport.  The returned
    /// connection already has the handshake's version byte and hello packet
    /// queued on its outbound buffer.
    pub fn new(config: ServerSessionConfig) -> Result<ServerConnection, ConnectionError> {
        let (handshake, initial_bytes) = Handshake::new()?;

        Ok(ServerConnection {
            stage: ConnectionStage::Handshaking(handshake),
            peer_epoch: None,
            deserializer: ChunkDeserializer::new(),
            serializer: ChunkSerializer::new(),
            session: ServerSession::new(config),
            outbound: initial_bytes,
        })
    }

    /// Feeds bytes read from the transport into the connection, returning
    /// the events the application should react to.  Responses end up on the
    /// outbound buffer.
    ///
    /// A protocol violation (failed handshake, undecodable chunk stream)
    /// closes the connection: the error returned here is the terminal
    /// notification, and every later call fails with `SessionClosed`.
    pub fn feed_inbound(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<ServerSessionEvent>, ConnectionError> {
        match self.run_inbound(bytes) {
            Ok(events) => Ok(events),
            Err(error) => {
                self.stage = ConnectionStage::Closed;
                Err(error)
            }
        }
    }

    /// Takes all bytes currently queued for the peer.  Callers must send
    /// them in order and in full.
    pub fn drain_outbound(&mut self) -> Vec<u8> {
        mem::take(&mut self.outbound)
    }

    /// Accepts a pending request previously surfaced by a
    /// `ConnectionRequested` event; the resulting responses are queued on
    /// the outbound buffer.
    pub fn accept_request(&mut self, request_id: u32) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::SessionClosed);
        }

        let outputs = self.session.accept_request(request_id)?;
        let mut events = Vec::new();
        for output in outputs {
            self.process_session_output(output, &mut events)?;
        }

        Ok(())
    }

    /// Rejects a pending request; the `_error` response is queued on the
    /// outbound buffer.
    pub fn reject_request(&mut self, request_id: u32, reason: &str) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::SessionClosed);
        }

        let outputs = self.session.reject_request(request_id, reason)?;
        let mut events = Vec::new();
        for output in outputs {
            self.process_session_output(output, &mut events)?;
        }

        Ok(())
    }

    /// True once a fatal error has closed the connection.
    pub fn is_closed(&self) -> bool {
        matches!(self.stage, ConnectionStage::Closed)
    }

    /// The peer's start timestamp, known once the handshake completes.
    pub fn peer_epoch(&self) -> Option<u32> {
        self.peer_epoch
    }

    fn run_inbound(&mut self, bytes: &[u8]) -> Result<Vec<ServerSessionEvent>, ConnectionError> {
        let handshake_outcome = match &mut self.stage {
            ConnectionStage::Closed => return Err(ConnectionError::SessionClosed),
            ConnectionStage::Active => None,
            ConnectionStage::Handshaking(handshake) => Some(handshake.process_bytes(bytes)?),
        };

        match handshake_outcome {
            None => self.process_message_bytes(bytes),

            Some(HandshakeOutcome::InProgress { response_bytes }) => {
                self.outbound.extend(response_bytes);
                Ok(Vec::new())
            }

            Some(HandshakeOutcome::Completed {
                peer_epoch,
                response_bytes,
                remaining_bytes,
            }) => {
                self.outbound.extend(response_bytes);
                self.peer_epoch = Some(peer_epoch);
                self.stage = ConnectionStage::Active;
                self.process_message_bytes(&remaining_bytes)
            }
        }
    }

    fn process_message_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<ServerSessionEvent>, ConnectionError> {
        let mut events = Vec::new();

        // Acknowledgements owed for this batch go out ahead of anything the
        // batch's messages trigger
        for output in self.session.notify_bytes_received(bytes.len() as u64) {
            self.process_session_output(output, &mut events)?;
        }

        let mut leftover = bytes;
        loop {
            let payload = match self.deserializer.get_next_message(leftover)? {
                None => break,
                Some(payload) => payload,
            };
            leftover = &[];

            let message = match payload.to_rtmp_message() {
                Ok(message) => message,
                Err(error) => {
                    // A bad payload only poisons itself.  The chunk layer
                    // already re-established message boundaries, so the
                    // stream stays decodable.
                    warn!(
                        "Dropping undecodable message of type {}: {}",
                        payload.type_id, error
                    );
                    continue;
                }
            };

            // Semantic anomalies are scoped to the one message; only
            // handshake and chunk stream errors tear the session down
            let outputs = match self.session.handle_message(message, payload.message_stream_id) {
                Ok(outputs) => outputs,
                Err(error) => {
                    warn!("Dropping message the session could not process: {}", error);
                    continue;
                }
            };

            for output in outputs {
                self.process_session_output(output, &mut events)?;
            }
        }

        Ok(events)
    }

    fn process_session_output(
        &mut self,
        output: ServerSessionOutput,
        events: &mut Vec<ServerSessionEvent>,
    ) -> Result<(), ConnectionError> {
        match output {
            ServerSessionOutput::Response(outbound) => {
                // Changing the outbound chunk size goes through the
                // serializer's own path so the message is written at the old
                // size and everything after it at the new one
                if let RtmpMessage::SetChunkSize { size } = outbound.message {
                    let packet = self
                        .serializer
                        .set_max_chunk_size(size, outbound.timestamp)?;
                    self.outbound.extend(packet.bytes);
                } else {
                    let payload = outbound
                        .message
                        .into_message_payload(outbound.timestamp, outbound.stream_id)?;
                    let packet = self.serializer.serialize(&payload, false, false)?;
                    self.outbound.extend(packet.bytes);
                }
            }

            ServerSessionOutput::Event(event) => {
                // The deframer has to pick up the peer's new chunk size
                // before the next message is parsed; the partially
                // reassembled message (if any) keeps its in-flight chunk
                if let ServerSessionEvent::PeerChunkSizeChanged { new_chunk_size } = event {
                    self.deserializer.set_max_chunk_size(new_chunk_size as usize)?;
                }

                events.push(event);
            }
        }

        Ok(())
    }
}
