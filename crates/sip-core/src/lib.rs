//! # gb28181-sip-core
//!
//! SIP message codec for the GB28181 signaling stack: typed request/response
//! values, the header/URI/Via grammars GB28181 actually exercises, and a
//! small GB28181-shaped SDP builder.
//!
//! This crate intentionally does not attempt full RFC 3261 coverage: no
//! TCP/TLS framing concerns, no proxy-only headers like Record-Route
//! forwarding semantics.

pub mod error;
pub mod parser;
pub mod sdp;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse, serialize};
pub use types::{Header, HeaderName, Message, Method, Param, Params, Request, Response, StatusCode, Uri, ViaHop};

/// Re-export of the commonly used types, so call sites can
/// `use gb28181_sip_core::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::parser::{parse, serialize};
    pub use crate::sdp::{answer_rtp_port, MediaOffer, PlayMode};
    pub use crate::types::{
        message::CSeq, Header, HeaderName, Message, Method, Param, Params, Request, Response, StatusCode, Uri,
        ViaHop,
    };
}
