use super::events::ServerSessionEvent;
use crate::messages::RtmpMessage;
use crate::time::RtmpTimestamp;

/// A message the session wants delivered to the peer, stamped with the
/// message stream id and session timestamp it should be sent under.
#[derive(Debug, PartialEq, Clone)]
pub struct OutboundMessage {
    pub message: RtmpMessage,
    pub stream_id: u32,
    pub timestamp: RtmpTimestamp,
}

/// A single item in the ordered output of a session operation.
///
/// Outputs must be consumed in order: responses are only correct relative
/// to each other and to the events raised by the same call (the responses
/// a call produces always precede its events).
#[derive(Debug, PartialEq, Clone)]
pub enum ServerSessionOutput {
    /// A message that must be serialized and sent to the peer
    Response(OutboundMessage),

    /// An event for the consuming application to perform custom logic on
    Event(ServerSessionEvent),
}
