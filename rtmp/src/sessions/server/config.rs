/// The configuration options that govern how an RTMP server session should
/// operate.  Every field is required; there are no safe universal defaults
/// for window sizes or bandwidth figures.
#[derive(Clone)]
pub struct ServerSessionConfig {
    /// Advertised in the `fmsVer` property of the connect response
    pub fms_version: String,

    /// The outbound chunk size announced after a connect request
    pub chunk_size: u32,

    /// The value sent in the SetPeerBandwidth message after a connect request
    pub peer_bandwidth: u32,

    /// The window acknowledgement size announced after a connect request
    pub window_ack_size: u32,
}
