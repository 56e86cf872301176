/// An event that a server session raises for the consuming application.
#[derive(Debug, PartialEq, Clone)]
pub enum ServerSessionEvent {
    /// The peer is changing the maximum size of the RTMP chunks it will be
    /// sending.  The inbound chunk deserializer must be told before the next
    /// message is parsed; the connection driver does this automatically.
    PeerChunkSizeChanged { new_chunk_size: u32 },

    /// The peer is requesting a connection to the specified RTMP application
    /// name.  The session holds the request until the application calls
    /// `accept_request` or `reject_request` with this request id.
    ConnectionRequested { request_id: u32, app_name: String },

    /// The peer acknowledged receiving the specified number of bytes from us
    AcknowledgementReceived { bytes_received: u32 },
}
