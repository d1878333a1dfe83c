//! The REGISTER handler: digest challenge/response and device upsert.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use gb28181_sip_core::{Request, Response, StatusCode};
use gb28181_transaction_core::Transaction;

use crate::context::RegistrarContext;
use crate::device::Device;
use crate::digest::{self, parse_digest_params};
use crate::webhook::WebhookEvent;

const DEFAULT_EXPIRES: u32 = 3600;

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

pub async fn handle_register(ctx: &Arc<RegistrarContext>, request: Request, _transaction: Arc<Transaction>) -> Response {
    let Some(source) = request.source else {
        return Response::for_request(&request, StatusCode::SERVER_INTERNAL_ERROR, "Server Internal Error");
    };

    if ctx.blacklist.is_blacklisted(source) {
        warn!(%source, "rejecting REGISTER from blacklisted source");
        return Response::for_request(&request, StatusCode::FORBIDDEN, "Forbidden");
    }

    if ctx.auth_enabled() {
        match authenticate(ctx, &request) {
            Ok(()) => ctx.blacklist.record_success(source),
            Err(challenge) => {
                if challenge.is_failure {
                    ctx.blacklist.record_failure(source);
                }
                return challenge.response;
            }
        }
    }

    let device_id = request
        .from_uri()
        .and_then(|uri| uri.user)
        .unwrap_or_else(|| request.uri.user.clone().unwrap_or_default());

    let expires = request.header("Expires").and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(DEFAULT_EXPIRES);

    if expires == 0 {
        ctx.registry.deregister(&device_id);
        info!(%device_id, "device deregistered (Expires: 0)");
        let mut resp = Response::for_request(&request, StatusCode::OK, "OK");
        resp.set_header("Expires", "0");
        return resp;
    }

    let device = Device {
        device_id: device_id.clone(),
        source,
        registration_uri: request.uri.to_string(),
        active_at: now_unix(),
        channel_count: 0,
    };
    ctx.registry.upsert(device);

    ctx.webhook.notify(WebhookEvent {
        event: "devices.active".to_string(),
        device_id: Some(device_id.clone()),
        channel_id: None,
        status: "OK".to_string(),
        at: now_unix(),
    });

    info!(%device_id, %source, "device registered");

    let mut resp = Response::for_request(&request, StatusCode::OK, "OK");
    resp.set_header("Expires", expires.to_string());
    if let Some(contact) = request.header("Contact") {
        resp.set_header("Contact", contact.to_string());
    }
    resp
}

struct AuthFailure {
    response: Response,
    is_failure: bool,
}

/// Returns `Ok(())` on a verified digest response, or an `Err` carrying
/// the response to send (a 401 challenge, with `is_failure` distinguishing
/// "never tried" from "tried and got it wrong" for blacklist purposes).
fn authenticate(ctx: &Arc<RegistrarContext>, request: &Request) -> Result<(), AuthFailure> {
    let Some(auth_header) = request.header("Authorization") else {
        let nonce = ctx.nonces.issue();
        let mut resp = Response::for_request(request, StatusCode::UNAUTHORIZED, "Unauthorized");
        resp.set_header("WWW-Authenticate", format!(r#"Digest realm="{}", nonce="{}""#, ctx.realm, nonce));
        return Err(AuthFailure { response: resp, is_failure: false });
    };

    let params = parse_digest_params(auth_header);
    let challenge = |ctx: &Arc<RegistrarContext>, request: &Request| {
        let nonce = ctx.nonces.issue();
        let mut resp = Response::for_request(request, StatusCode::UNAUTHORIZED, "Unauthorized");
        resp.set_header("WWW-Authenticate", format!(r#"Digest realm="{}", nonce="{}""#, ctx.realm, nonce));
        resp
    };

    let (Some(user), Some(nonce), Some(uri), Some(claimed)) = (
        params.get("username"),
        params.get("nonce"),
        params.get("uri"),
        params.get("response"),
    ) else {
        return Err(AuthFailure { response: challenge(ctx, request), is_failure: true });
    };

    if ctx.nonces.consume(nonce).is_err() {
        return Err(AuthFailure { response: challenge(ctx, request), is_failure: true });
    }

    if digest::verify(user, &ctx.realm, &ctx.secret, "REGISTER", uri, nonce, claimed) {
        Ok(())
    } else {
        Err(AuthFailure { response: challenge(ctx, request), is_failure: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceRegistry;
    use crate::repository::NullRepository;
    use crate::webhook::WebhookClient;
    use gb28181_sip_core::{Header, Method};
    use std::collections::HashMap;

    fn make_context(secret: &str) -> Arc<RegistrarContext> {
        let registry = DeviceRegistry::new(Arc::new(NullRepository));
        RegistrarContext::new(registry, WebhookClient::new(HashMap::new()), "3402000000".to_string(), secret.to_string())
    }

    fn make_request() -> Request {
        let mut req = Request::new(Method::Register, "sip:34020000002000000001@3402000000".parse().unwrap());
        req.headers.push(Header::new("Via", "SIP/2.0/UDP 1.2.3.4:5060;branch=z9hG4bK-1"));
        req.headers.push(Header::new("From", "<sip:34020000001320000001@3402000000>;tag=1"));
        req.headers.push(Header::new("To", "<sip:34020000001320000001@3402000000>"));
        req.headers.push(Header::new("Call-ID", "abc123"));
        req.headers.push(Header::new("CSeq", "1 REGISTER"));
        req.headers.push(Header::new("Max-Forwards", "70"));
        req.headers.push(Header::new("Expires", "3600"));
        req.source = Some("10.0.0.5:5060".parse().unwrap());
        req
    }

    #[test]
    fn register_without_auth_challenges_when_secret_configured() {
        let ctx = make_context("secretpass");
        let req = make_request();
        let result = authenticate(&ctx, &req);
        assert!(result.is_err());
        let failure = result.err().unwrap();
        assert_eq!(failure.response.status, StatusCode::UNAUTHORIZED);
        assert!(!failure.is_failure);
    }

    #[test]
    fn register_with_valid_digest_succeeds() {
        let ctx = make_context("secretpass");
        let mut req = make_request();
        let nonce = ctx.nonces.issue();
        let h1 = digest::ha1("34020000001320000001", "3402000000", "secretpass");
        let h2 = digest::ha2("REGISTER", "sip:34020000002000000001@3402000000");
        let resp = digest::response(&h1, &nonce, &h2);
        req.headers.push(Header::new(
            "Authorization",
            format!(
                r#"Digest username="34020000001320000001", realm="3402000000", nonce="{}", uri="sip:34020000002000000001@3402000000", response="{}""#,
                nonce, resp
            ),
        ));
        assert!(authenticate(&ctx, &req).is_ok());
    }
}
