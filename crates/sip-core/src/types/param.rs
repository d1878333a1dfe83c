use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `;name[=value]` parameter, value optional (flag-style params
/// like `;rport` or `;lr` carry no value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Param {
            name: name.into(),
            value,
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Param::new(name, None)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) if needs_quoting(v) => write!(f, "{}=\"{}\"", self.name, v),
            Some(v) => write!(f, "{}={}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

fn needs_quoting(v: &str) -> bool {
    v.is_empty() || v.chars().any(|c| c.is_whitespace() || c == ';' || c == ',')
}

/// An ordered multimap of header/URI parameters.
///
/// RFC 3261 parameter lists are order-sensitive (the first `branch` wins,
/// the codec must not silently dedupe) so this is a `Vec`, not a `HashMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(pub Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Params(Vec::new())
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.value.as_deref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        if let Some(p) = self.0.iter_mut().find(|p| p.name.eq_ignore_ascii_case(&name)) {
            p.value = value;
        } else {
            self.0.push(Param::new(name, value));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `;a=b;c=d` tail. Quoted values keep their contents without
    /// the surrounding quotes; everything else splits on `=`.
    pub fn parse(s: &str) -> Params {
        let mut params = Params::new();
        for segment in split_params(s) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim();
                    let value = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
                    params.push(Param::new(name.trim(), Some(value.to_string())));
                }
                None => params.push(Param::flag(segment)),
            }
        }
        params
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.0 {
            write!(f, ";{}", p)?;
        }
        Ok(())
    }
}

/// Splits on `;` but respects double-quoted spans so a `;`-containing
/// quoted value isn't cut in half.
fn split_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start <= s.len() {
        parts.push(&s[start..]);
    }
    parts
}
