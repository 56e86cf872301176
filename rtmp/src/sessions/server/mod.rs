mod config;
mod errors;
mod events;
mod pending_requests;
mod result;


use self::pending_requests::PendingRequest;
use crate::messages::{PeerBandwidthLimitType, RtmpMessage, UserControlEventType};
use crate::time::RtmpTimestamp;
use log::debug;
use riptide_amf::AmfValue;
use std::collections::HashMap;
use std::time::SystemTime;

pub use self::config::ServerSessionConfig;
pub use self::errors::ServerSessionError;
pub use self::events::ServerSessionEvent;
pub use self::result::{OutboundMessage, ServerSessionOutput};

#[derive(Eq, PartialEq, Debug, Clone)]
enum SessionStage {
    /// The session is up but no connect request has been accepted yet
    Started,

    /// A connect request was accepted and the peer is bound to an app name
    Connected,
}

/// The message-level state machine for the server side of one RTMP
/// connection.
///
/// A `ServerSession` consumes decoded [`RtmpMessage`]s and application
/// decisions, and produces an ordered list of outputs: messages that must
/// be sent to the peer (in order) and events the application can react to.
/// It owns no chunk or transport state, which is what makes it independently
/// testable; pair it with the chunk codecs or use
/// [`crate::connection::ServerConnection`] which wires everything up.
///
/// Incoming requests that need an application decision (currently only
/// `connect`) are parked in a pending request table and surfaced as events
/// carrying a request id.  The application answers with `accept_request` or
/// `reject_request`; either one removes the pending entry, so a second
/// decision on the same id fails.
pub struct ServerSession {
    start_time: SystemTime,
    config: ServerSessionConfig,
    current_stage: SessionStage,
    connected_app_name: Option<String>,
    pending_requests: HashMap<u32, PendingRequest>,
    last_request_id: u32,
    peer_window_ack_size: Option<u32>,
    peer_bytes_received: u64,
    last_acknowledgement_sent_at: u64,
}

impl ServerSession {
    pub fn new(config: ServerSessionConfig) -> ServerSession {
        ServerSession {
            start_time: SystemTime::now(),
            config,
            current_stage: SessionStage::Started,
            connected_app_name: None,
            pending_requests: HashMap::new(),
            last_request_id: 0,
            peer_window_ack_size: None,
            peer_bytes_received: 0,
            last_acknowledgement_sent_at: 0,
        }
    }

    /// The app name of the accepted connection, once there is one.
    pub fn connected_app_name(&self) -> Option<&str> {
        self.connected_app_name.as_deref()
    }

    /// Records that more bytes arrived from the peer.
    ///
    /// Once the peer has told us its window acknowledgement size, every full
    /// window of received bytes produces one `Acknowledgement` response, so
    /// a total of B received bytes yields B / window acknowledgements no
    /// matter how the calls are split; a single call spanning several
    /// windows emits one per window crossed.  Each acknowledgement reports
    /// the window boundary it fired for, and the first fires when exactly
    /// one window has accumulated.  Callers must emit these before any
    /// responses triggered by the messages inside the same batch of bytes.
    pub fn notify_bytes_received(&mut self, bytes_received: u64) -> Vec<ServerSessionOutput> {
        self.peer_bytes_received = self.peer_bytes_received.wrapping_add(bytes_received);

        let window = match self.peer_window_ack_size {
            Some(window) if window > 0 => window as u64,
            _ => return Vec::new(),
        };

        let mut outputs = Vec::new();
        while self.peer_bytes_received - self.last_acknowledgement_sent_at >= window {
            self.last_acknowledgement_sent_at += window;

            let message = RtmpMessage::Acknowledgement {
                // The wire field is 32 bits; the counter wraps along with it
                sequence_number: self.last_acknowledgement_sent_at as u32,
            };

            outputs.push(ServerSessionOutput::Response(self.outbound(message, 0)));
        }

        outputs
    }

    /// Reacts to one decoded message from the peer.
    ///
    /// Traffic the session does not understand, and commands that are not
    /// valid in the current stage, are logged and ignored rather than
    /// treated as errors; only a connect request without an app name is a
    /// hard failure.
    pub fn handle_message(
        &mut self,
        message: RtmpMessage,
        stream_id: u32,
    ) -> Result<Vec<ServerSessionOutput>, ServerSessionError> {
        match message {
            RtmpMessage::SetChunkSize { size } => {
                Ok(vec![ServerSessionOutput::Event(
                    ServerSessionEvent::PeerChunkSizeChanged {
                        new_chunk_size: size,
                    },
                )])
            }

            RtmpMessage::WindowAcknowledgement { size } => {
                self.peer_window_ack_size = Some(size);
                Ok(Vec::new())
            }

            RtmpMessage::Acknowledgement { sequence_number } => {
                Ok(vec![ServerSessionOutput::Event(
                    ServerSessionEvent::AcknowledgementReceived {
                        bytes_received: sequence_number,
                    },
                )])
            }

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments: _,
            }
            | RtmpMessage::Amf3Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments: _,
            } => self.handle_command(command_name, transaction_id, command_object, stream_id),

            RtmpMessage::Amf0Data { .. } | RtmpMessage::Amf3Data { .. } => {
                debug!("Ignoring data message on stream {}", stream_id);
                Ok(Vec::new())
            }

            RtmpMessage::AudioData { .. } | RtmpMessage::VideoData { .. } => {
                debug!("Ignoring media message on stream {}", stream_id);
                Ok(Vec::new())
            }

            RtmpMessage::Abort { .. }
            | RtmpMessage::SetPeerBandwidth { .. }
            | RtmpMessage::UserControl { .. } => {
                debug!("Ignoring control message on stream {}", stream_id);
                Ok(Vec::new())
            }

            RtmpMessage::Unknown { type_id, .. } => {
                debug!(
                    "Ignoring message with unknown type id {} on stream {}",
                    type_id, stream_id
                );
                Ok(Vec::new())
            }
        }
    }

    /// Accepts a pending request, removing it from the pending table.
    pub fn accept_request(
        &mut self,
        request_id: u32,
    ) -> Result<Vec<ServerSessionOutput>, ServerSessionError> {
        let request = self
            .pending_requests
            .remove(&request_id)
            .ok_or(ServerSessionError::InvalidRequestId(request_id))?;

        match request {
            PendingRequest::ConnectionRequest {
                app_name,
                transaction_id,
            } => Ok(self.accept_connection_request(app_name, transaction_id)),
        }
    }

    /// Rejects a pending request, removing it from the pending table.  The
    /// reason becomes the description in the `_error` response; the session
    /// stage does not change.
    pub fn reject_request(
        &mut self,
        request_id: u32,
        reason: &str,
    ) -> Result<Vec<ServerSessionOutput>, ServerSessionError> {
        let request = self
            .pending_requests
            .remove(&request_id)
            .ok_or(ServerSessionError::InvalidRequestId(request_id))?;

        match request {
            PendingRequest::ConnectionRequest { transaction_id, .. } => {
                let status =
                    create_status_object("error", "NetConnection.Connect.Rejected", reason);

                let message = RtmpMessage::Amf0Command {
                    command_name: "_error".to_string(),
                    transaction_id,
                    command_object: AmfValue::Null,
                    additional_arguments: vec![AmfValue::Object(status)],
                };

                Ok(vec![ServerSessionOutput::Response(self.outbound(message, 0))])
            }
        }
    }

    fn handle_command(
        &mut self,
        command_name: String,
        transaction_id: f64,
        command_object: AmfValue,
        stream_id: u32,
    ) -> Result<Vec<ServerSessionOutput>, ServerSessionError> {
        match (command_name.as_str(), &self.current_stage) {
            ("connect", SessionStage::Started) => {
                self.handle_command_connect(transaction_id, command_object)
            }

            _ => {
                debug!(
                    "Ignoring '{}' command received on stream {} in the {:?} stage",
                    command_name, stream_id, self.current_stage
                );
                Ok(Vec::new())
            }
        }
    }

    fn handle_command_connect(
        &mut self,
        transaction_id: f64,
        command_object: AmfValue,
    ) -> Result<Vec<ServerSessionOutput>, ServerSessionError> {
        let app_name = match command_object.property("app") {
            Some(AmfValue::Utf8String(app)) if !app.is_empty() => app.clone(),
            _ => return Err(ServerSessionError::NoAppNameForConnectionRequest),
        };

        let request_id = self.last_request_id + 1;
        self.last_request_id = request_id;
        self.pending_requests.insert(
            request_id,
            PendingRequest::ConnectionRequest {
                app_name: app_name.clone(),
                transaction_id,
            },
        );

        // The peer gets its transmission parameters right away; the connect
        // response itself waits for the application's decision
        let outputs = vec![
            ServerSessionOutput::Response(self.outbound(
                RtmpMessage::SetPeerBandwidth {
                    size: self.config.peer_bandwidth,
                    limit_type: PeerBandwidthLimitType::Hard,
                },
                0,
            )),
            ServerSessionOutput::Response(self.outbound(
                RtmpMessage::WindowAcknowledgement {
                    size: self.config.window_ack_size,
                },
                0,
            )),
            ServerSessionOutput::Response(self.outbound(
                RtmpMessage::SetChunkSize {
                    size: self.config.chunk_size,
                },
                0,
            )),
            ServerSessionOutput::Response(self.outbound(
                RtmpMessage::UserControl {
                    event_type: UserControlEventType::StreamBegin,
                    stream_id: Some(0),
                    buffer_length: None,
                    timestamp: None,
                },
                0,
            )),
            ServerSessionOutput::Event(ServerSessionEvent::ConnectionRequested {
                request_id,
                app_name,
            }),
        ];

        Ok(outputs)
    }

    fn accept_connection_request(
        &mut self,
        app_name: String,
        transaction_id: f64,
    ) -> Vec<ServerSessionOutput> {
        self.current_stage = SessionStage::Connected;
        self.connected_app_name = Some(app_name);

        let command_object = AmfValue::Object(vec![
            (
                "fmsVer".to_string(),
                AmfValue::Utf8String(self.config.fms_version.clone()),
            ),
            ("capabilities".to_string(), AmfValue::Number(31.0)),
        ]);

        let mut status = create_status_object(
            "status",
            "NetConnection.Connect.Success",
            "Connection succeeded",
        );
        status.push(("objectEncoding".to_string(), AmfValue::Number(0.0)));

        let message = RtmpMessage::Amf0Command {
            command_name: "_result".to_string(),
            transaction_id,
            command_object,
            additional_arguments: vec![AmfValue::Object(status)],
        };

        vec![ServerSessionOutput::Response(self.outbound(message, 0))]
    }

    fn outbound(&self, message: RtmpMessage, stream_id: u32) -> OutboundMessage {
        OutboundMessage {
            message,
            stream_id,
            timestamp: self.current_epoch(),
        }
    }

    fn current_epoch(&self) -> RtmpTimestamp {
        match self.start_time.elapsed() {
            // Casting to u32 wraps the value, which is what RTMP timestamps
            // want for streams older than 49 days
            Ok(duration) => RtmpTimestamp::new(duration.as_millis() as u32),
            Err(_) => RtmpTimestamp::new(0),
        }
    }
}

fn create_status_object(level: &str, code: &str, description: &str) -> Vec<(String, AmfValue)> {
    vec![
        (
            "level".to_string(),
            AmfValue::Utf8String(level.to_string()),
        ),
        ("code".to_string(), AmfValue::Utf8String(code.to_string())),
        (
            "description".to_string(),
            AmfValue::Utf8String(description.to_string()),
        ),
    ]
}
