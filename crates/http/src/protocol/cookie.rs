//! Cookie handling in both directions.
//!
//! Incoming `Cookie` headers are split into a frozen [`MultiMap`]; outgoing cookies are
//! kept as [`SetCookie`] values on the response and encoded as `Set-Cookie` lines when
//! the response is serialized.

use std::time::{Duration, SystemTime};

use crate::protocol::MultiMap;

/// Parses a `Cookie` header value such as `a=1; b=2`.
///
/// Pairs are separated by `;` or `,`, keys and values are trimmed, pieces without a key
/// are skipped and repeated keys keep every value.
pub fn parse_cookie_header(value: &str) -> MultiMap {
    let pairs = value.split([';', ',']).filter_map(|piece| {
        let (key, value) = piece.split_once('=').unwrap_or((piece, ""));
        let key = key.trim();
        if key.is_empty() { None } else { Some((key, value.trim())) }
    });

    MultiMap::frozen_from_pairs(pairs)
}

/// When an outgoing cookie stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieExpiry {
    /// Session cookie
    Session,
    /// Absolute point in time, sent as `expires=<RFC 1123 date>`
    At(SystemTime),
    /// Relative lifetime, sent as `max-age=<seconds>`
    MaxAge(Duration),
}

/// A cookie the response asks the client to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    expiry: CookieExpiry,
}

impl SetCookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V, expiry: CookieExpiry) -> Self {
        Self { name: name.into(), value: value.into(), expiry }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expiry(&self) -> &CookieExpiry {
        &self.expiry
    }

    /// The `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        match &self.expiry {
            CookieExpiry::Session => format!("{}={}", self.name, self.value),
            CookieExpiry::At(at) => format!("{}={};expires={}", self.name, self.value, httpdate::fmt_http_date(*at)),
            CookieExpiry::MaxAge(age) => format!("{}={};max-age={}", self.name, self.value, age.as_secs()),
        }
    }
}
