//! Typed SIP message components.
//!
//! GB28181 only exercises a narrow slice of RFC 3261, so this module does not
//! attempt to model every header in the register; it models the ones the
//! device/channel state machine actually reads or writes, plus a generic
//! [`Header`] carrier for everything else so unknown headers round-trip.

pub mod method;
pub mod status;
pub mod uri;
pub mod param;
pub mod via;
pub mod header;
pub mod message;

pub use method::Method;
pub use status::StatusCode;
pub use uri::Uri;
pub use param::{Param, Params};
pub use via::ViaHop;
pub use header::{Header, HeaderName};
pub use message::{Message, Request, Response};
