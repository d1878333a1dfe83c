//! The BYE handler: a device tearing down a stream it was playing.

use std::sync::Arc;

use tracing::info;

use gb28181_sip_core::{Request, Response, StatusCode};
use gb28181_transaction_core::Transaction;

use crate::coordinator::SessionCoordinator;

/// Finds the stream this BYE's Call-ID belongs to and tears it down.
/// Always responds 200 OK, even if no matching stream is found: an
/// unmatched BYE is most likely for a stream this process already reaped.
pub async fn handle_bye(coordinator: &Arc<SessionCoordinator>, request: Request, _transaction: Arc<Transaction>) -> Response {
    if let Some(call_id) = request.call_id() {
        if let Some(stream) = coordinator.table().all().into_iter().find(|s| s.call_id == call_id) {
            info!(key = %stream.key, "BYE received, tearing down stream");
            coordinator.terminate(&stream.key).await;
        }
    }
    Response::for_request(&request, StatusCode::OK, "OK")
}
