//! Request-target assembly for the LMS query-string convention.
//!
//! Every option, including array and nested-object parameters, travels in
//! the query string using bracketed keys (`assignment[name]`,
//! `assignment_override[student_ids][]`). The credential is always the last
//! pair. Keys are emitted verbatim; values are percent-encoded unless the
//! connection asks for the raw form, which only escapes what a URI cannot
//! carry.

use serde::{Deserialize, Serialize};

/// How option values are written into the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueEncoding {
    /// Percent-encode everything outside the RFC 3986 unreserved set.
    #[default]
    Percent,
    /// Keep reserved characters (`&`, `=`, `:`, `/`, brackets) as given and
    /// escape only bytes a URI cannot carry: space, controls, non-ASCII and
    /// the unsafe delimiters such as quotes, angle and curly brackets, `|`.
    /// A `%` that already starts a valid escape is kept.
    Raw,
}

/// Ordered builder for `base?k1=v1&k2=v2&...&access_token=<token>`.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: String,
    encoding: ValueEncoding,
    pairs: Vec<(String, String)>,
}

impl QueryBuilder {
    pub fn new(base: impl Into<String>, encoding: ValueEncoding) -> Self {
        Self {
            base: base.into(),
            encoding,
            pairs: Vec::new(),
        }
    }

    /// Append one `key=value` pair.
    pub fn option(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Append `key=value` only when `value` is present.
    pub fn option_if<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.option(key, value),
            None => self,
        }
    }

    /// Append one `key=value` pair per element, in iteration order.
    pub fn repeated<I>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for value in values {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Render the target with the credential appended last.
    pub fn build(&self, access_token: &str) -> String {
        let mut target = String::with_capacity(self.base.len() + 64);
        target.push_str(&self.base);
        target.push('?');
        for (key, value) in &self.pairs {
            target.push_str(key);
            target.push('=');
            match self.encoding {
                ValueEncoding::Percent => encode_into(&mut target, value),
                ValueEncoding::Raw => requote_into(&mut target, value),
            }
            target.push('&');
        }
        target.push_str("access_token=");
        target.push_str(access_token);
        target
    }
}

/// Render a boolean the way the LMS option parser expects it.
pub fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn push_escaped(out: &mut String, byte: u8) {
    out.push('%');
    out.push(char::from(HEX[usize::from(byte >> 4)]));
    out.push(char::from(HEX[usize::from(byte & 0x0F)]));
}

fn encode_into(out: &mut String, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            }
            _ => push_escaped(out, byte),
        }
    }
}

fn requote_into(out: &mut String, value: &str) {
    let bytes = value.as_bytes();
    for (index, &byte) in bytes.iter().enumerate() {
        match byte {
            b'%' if is_escape(&bytes[index + 1..]) => out.push('%'),
            b'!' | b'#'..=b'$' | b'&'..=b';' | b'=' | b'?'..=b'[' | b']' | b'_' | b'a'..=b'z' | b'~' => {
                out.push(char::from(byte));
            }
            _ => push_escaped(out, byte),
        }
    }
}

fn is_escape(rest: &[u8]) -> bool {
    matches!(rest, [high, low, ..] if high.is_ascii_hexdigit() && low.is_ascii_hexdigit())
}
