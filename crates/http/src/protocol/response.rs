//! The response under construction.
//!
//! Nothing written here reaches the network until the whole handler and middleware
//! pipeline has finished, so status, headers and body can be changed freely until then.

use std::time::{Duration, SystemTime};

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use serde::Serialize;

use crate::protocol::cookie::{CookieExpiry, SetCookie};
use crate::protocol::{CaselessMultiMap, Halt};

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: CaselessMultiMap,
    cookies: Vec<SetCookie>,
    chunks: Vec<Bytes>,
}

impl Response {
    /// A `200 OK` response with `Content-Type: text/html` and an empty body.
    pub fn new() -> Self {
        let mut headers = CaselessMultiMap::new();
        // a fresh map is never frozen
        let _ = headers.set(http::header::CONTENT_TYPE.as_str(), mime::TEXT_HTML.as_ref());
        Self { status: StatusCode::OK, headers, cookies: Vec::new(), chunks: Vec::new() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &CaselessMultiMap {
        &self.headers
    }

    /// Replaces any value of header `name`.
    pub fn set_header<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let _ = self.headers.replace(name, value);
    }

    /// Adds a value to header `name`, keeping the existing ones.
    pub fn append_header<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let _ = self.headers.set(name, value);
    }

    pub fn remove_header(&mut self, name: &str) {
        let _ = self.headers.remove(name);
    }

    pub fn cookies(&self) -> &[SetCookie] {
        &self.cookies
    }

    /// Sets a session cookie, replacing a previous cookie of the same name.
    pub fn set_cookie<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.push_cookie(SetCookie::new(name, value, CookieExpiry::Session));
    }

    /// Sets a cookie expiring at an absolute point in time.
    pub fn set_cookie_expires<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V, at: SystemTime) {
        self.push_cookie(SetCookie::new(name, value, CookieExpiry::At(at)));
    }

    /// Sets a cookie living for `max_age` from now.
    pub fn set_cookie_max_age<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V, max_age: Duration) {
        self.push_cookie(SetCookie::new(name, value, CookieExpiry::MaxAge(max_age)));
    }

    fn push_cookie(&mut self, cookie: SetCookie) {
        self.cookies.retain(|c| c.name() != cookie.name());
        self.cookies.push(cookie);
    }

    /// Appends UTF-8 text to the body.
    pub fn write<S: AsRef<str>>(&mut self, text: S) {
        self.write_bytes(Bytes::copy_from_slice(text.as_ref().as_bytes()));
    }

    /// Appends raw bytes to the body.
    pub fn write_bytes<B: Into<Bytes>>(&mut self, bytes: B) {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.chunks.push(bytes);
        }
    }

    /// Serializes `value` as the body content and marks the response as JSON.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Halt> {
        let json = serde_json::to_vec(value).map_err(Halt::internal)?;
        self.set_header(http::header::CONTENT_TYPE.as_str(), mime::APPLICATION_JSON.as_ref());
        self.write_bytes(json);
        Ok(())
    }

    /// Points the client at `location` with `302 Found`, or `301 Moved Permanently`.
    ///
    /// The returned [`Halt`] ends the handler: `return Err(res.redirect("/", false));`
    pub fn redirect<S: Into<String>>(&mut self, location: S, permanent: bool) -> Halt {
        let status = if permanent { StatusCode::MOVED_PERMANENTLY } else { StatusCode::FOUND };
        self.set_header(http::header::LOCATION.as_str(), location);
        self.status = status;
        Halt::Redirect(status)
    }

    /// Discards the body written so far.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    pub fn body_len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// The whole body as one buffer.
    pub fn body(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let mut buf = BytesMut::with_capacity(self.body_len());
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
