/// A decision the application still owes the session.  Pending requests are
/// the only place these live; accepting or rejecting one removes it.
#[derive(Debug)]
pub enum PendingRequest {
    ConnectionRequest {
        app_name: String,
        transaction_id: f64,
    },
}
