use std::fmt;

use serde::{Deserialize, Serialize};

/// A header name, normalized to its long form.
///
/// GB28181 traffic (mirroring most embedded SIP stacks) uses the RFC 3261
/// compact forms freely: `f`/`t`/`m`/`i`/`v`/`l`/`c`/`s`. The codec expands
/// them on parse and never re-compacts them on output, so everything
/// downstream of parsing only ever sees long names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderName(pub String);

impl HeaderName {
    pub fn new(name: impl Into<String>) -> Self {
        HeaderName(expand_compact_form(&name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HeaderName {
    fn from(s: &str) -> Self {
        HeaderName::new(s)
    }
}

fn expand_compact_form(name: &str) -> String {
    if name.len() == 1 {
        match name.to_ascii_lowercase().as_str() {
            "f" => return "From".to_string(),
            "t" => return "To".to_string(),
            "m" => return "Contact".to_string(),
            "i" => return "Call-ID".to_string(),
            "v" => return "Via".to_string(),
            "l" => return "Content-Length".to_string(),
            "c" => return "Content-Type".to_string(),
            "s" => return "Subject".to_string(),
            _ => {}
        }
    }
    canonicalize_case(name)
}

/// Renders a hyphen-delimited header token in Title-Case (`Call-ID` is the
/// one RFC exception, handled specially since the naive algorithm would
/// produce `Call-Id`).
fn canonicalize_case(name: &str) -> String {
    if name.eq_ignore_ascii_case("Call-ID") {
        return "Call-ID".to_string();
    }
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// A single header line: a name plus its raw (unparsed) value.
///
/// Multi-valued headers (repeated `Via`, `Route`, ...) are represented by
/// multiple `Header` entries in the message's header list, preserving the
/// order they arrived in, per the input-order-preservation decision in
/// DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            name: HeaderName::new(name.into()),
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_compact_forms() {
        assert_eq!(HeaderName::new("f").as_str(), "From");
        assert_eq!(HeaderName::new("i").as_str(), "Call-ID");
        assert_eq!(HeaderName::new("v").as_str(), "Via");
    }

    #[test]
    fn canonicalizes_case_of_long_forms() {
        assert_eq!(HeaderName::new("CALL-ID").as_str(), "Call-ID");
        assert_eq!(HeaderName::new("max-forwards").as_str(), "Max-Forwards");
    }
}
