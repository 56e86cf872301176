use thiserror::Error;

/// An enumeration representing the errors a server session can encounter.
#[derive(Debug, Error)]
pub enum ServerSessionError {
    /// The request id given to `accept_request` or `reject_request` did not
    /// match any pending request.  Requests disappear once decided, so this
    /// also fires on a second decision for the same id.
    #[error("Request id {0} could not be matched to a pending request")]
    InvalidRequestId(u32),

    /// A connection request was made without a usable RTMP app name
    #[error("The connection request did not have a non-empty RTMP app name")]
    NoAppNameForConnectionRequest,
}
