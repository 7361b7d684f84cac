//! The request entity and the event driven parser that fills it.
//!
//! A [`RequestParser`] is fed strictly ordered events by the connection:
//!
//! 1. [`on_message_begin`](RequestParser::on_message_begin) with the verb and version
//! 2. [`on_url`](RequestParser::on_url) with the raw request target
//! 3. [`on_header`](RequestParser::on_header) once per header line, duplicates included
//! 4. [`on_headers_complete`](RequestParser::on_headers_complete)
//! 5. [`on_body`](RequestParser::on_body) zero or more times
//! 6. [`on_message_complete`](RequestParser::on_message_complete)
//!
//! Completed portions are never re-parsed, so the request can be fed as the bytes
//! arrive from the socket.

use bytes::{Bytes, BytesMut};
use http::{Extensions, Method, Uri, Version};
use percent_encoding::percent_decode_str;
use tracing::trace;

use crate::protocol::cookie::parse_cookie_header;
use crate::protocol::form::{Form, parse_body, parse_urlencoded};
use crate::protocol::{CaselessMultiMap, MultiMap, ParseError, StatusError};

/// Progress of a [`RequestParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Processing,
    /// The client sent `Expect: 100-continue` and waits for the interim response.
    ExpectContinue,
    Finished,
}

/// Path parameters captured by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathArgs {
    inner: Vec<(String, String)>,
}

impl PathArgs {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn required(&self, name: &str) -> Result<&str, StatusError> {
        self.get(name).ok_or_else(|| StatusError::bad_request(format!("Must provide parameter '{name}'.")))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// A parsed HTTP request.
///
/// Headers, query and cookies are frozen once parsed. Middleware can attach its own
/// state through [`Request::extensions_mut`].
#[derive(Debug)]
pub struct Request {
    method: Method,
    version: Version,
    path: Option<String>,
    query_string: String,
    query: MultiMap,
    headers: CaselessMultiMap,
    cookies: MultiMap,
    args: PathArgs,
    raw_body: Bytes,
    form: Option<Form>,
    extensions: Extensions,
}

impl Request {
    /// An empty `GET` request without a path, as the parser starts out.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            version: Version::HTTP_11,
            path: None,
            query_string: String::new(),
            query: MultiMap::frozen(),
            headers: CaselessMultiMap::frozen(),
            cookies: MultiMap::frozen(),
            args: PathArgs::empty(),
            raw_body: Bytes::new(),
            form: None,
            extensions: Extensions::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The percent-decoded path, without the query string.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or_default()
    }

    /// The raw query string, empty if the target had none.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn query(&self) -> &MultiMap {
        &self.query
    }

    pub fn headers(&self) -> &CaselessMultiMap {
        &self.headers
    }

    pub fn cookies(&self) -> &MultiMap {
        &self.cookies
    }

    pub fn args(&self) -> &PathArgs {
        &self.args
    }

    pub fn set_args(&mut self, args: PathArgs) {
        self.args = args;
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// The structured body, `None` when the content type is not a form type.
    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    /// The structured body of a handler that can't work without one.
    pub fn required_form(&self) -> Result<&Form, StatusError> {
        self.form.as_ref().ok_or_else(|| StatusError::bad_request("Must provide a form body."))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Whether the client allows the connection to carry another request.
    ///
    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 defaults to close.
    pub fn is_keep_alive(&self) -> bool {
        let connection = self.headers.get_all("connection").unwrap_or_default();
        let has_token = |token: &str| {
            connection.iter().flat_map(|v| v.split(',')).any(|t| t.trim().eq_ignore_ascii_case(token))
        };

        match self.version {
            Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental parser producing a [`Request`].
#[derive(Debug)]
pub struct RequestParser {
    request: Request,
    header_list: Vec<(String, String)>,
    body: BytesMut,
    state: ParserState,
}

impl RequestParser {
    pub fn new() -> Self {
        Self { request: Request::new(), header_list: Vec::new(), body: BytesMut::new(), state: ParserState::Processing }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ParserState::Finished
    }

    /// Whether a request line has been seen yet.
    pub fn has_path(&self) -> bool {
        self.request.path.is_some()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn on_message_begin(&mut self, method: Method, version: Version) {
        self.request.method = method;
        self.request.version = version;
    }

    /// Splits the request target into the decoded path and the query.
    pub fn on_url(&mut self, target: &str) -> Result<(), ParseError> {
        let uri = target.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

        let path = percent_decode_str(uri.path()).decode_utf8().map_err(|_| ParseError::InvalidUri)?;
        let query_string = uri.query().unwrap_or_default();

        self.request.query = parse_urlencoded(query_string).map_err(|_| ParseError::InvalidUri)?;
        self.request.query_string = query_string.to_string();
        self.request.path = Some(path.into_owned());
        Ok(())
    }

    /// Collects one header line; `Expect: 100-continue` is only honored for HTTP/1.1.
    pub fn on_header(&mut self, name: &str, value: &str) {
        let expects_continue = name.eq_ignore_ascii_case("expect") && value.trim().eq_ignore_ascii_case("100-continue");
        if expects_continue && self.request.version == Version::HTTP_11 {
            self.state = ParserState::ExpectContinue;
        }
        self.header_list.push((name.to_string(), value.to_string()));
    }

    /// Freezes the collected headers and parses the cookies out of them.
    pub fn on_headers_complete(&mut self) {
        let headers = CaselessMultiMap::frozen_from_pairs(std::mem::take(&mut self.header_list));

        if let Some(values) = headers.get_all("cookie") {
            self.request.cookies = parse_cookie_header(&values.join(";"));
        }
        self.request.headers = headers;
    }

    /// Marks the interim `100 Continue` response as sent.
    pub fn continue_sent(&mut self) {
        if self.state == ParserState::ExpectContinue {
            self.state = ParserState::Processing;
        }
    }

    pub fn on_body(&mut self, chunk: &[u8]) {
        trace!(len = chunk.len(), "received body chunk");
        self.body.extend_from_slice(chunk);
    }

    /// Finishes the request and parses the body according to its content type.
    ///
    /// The request is finished even when the body turns out to be malformed.
    pub fn on_message_complete(&mut self) -> Result<(), ParseError> {
        self.state = ParserState::Finished;

        let body = std::mem::take(&mut self.body).freeze();
        let form = parse_body(self.request.content_type(), &body);
        self.request.raw_body = body;
        self.request.form = form?;
        Ok(())
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ContainerError;

    fn parse(method: Method, target: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<Request, ParseError> {
        let mut parser = RequestParser::new();
        parser.on_message_begin(method, Version::HTTP_11);
        parser.on_url(target)?;
        for (name, value) in headers {
            parser.on_header(name, value);
        }
        parser.on_headers_complete();
        parser.on_body(body);
        parser.on_message_complete()?;
        Ok(parser.into_request())
    }

    #[test]
    fn urlencoded_request() {
        let request = parse(
            Method::POST,
            "/hello/test?foo=baz",
            &[("Content-Type", "application/x-www-form-urlencoded")],
            b"one=two",
        )
        .unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/hello/test");
        assert_eq!(request.query_string(), "foo=baz");
        assert_eq!(request.query().get("foo"), Some("baz"));

        let form = request.form().unwrap();
        assert_eq!(form.required("one").unwrap(), "two");
        assert_eq!(form.get("one").as_deref(), Some("two"));
        assert_eq!(form.get("two"), None);
        assert_eq!(form.required("three").unwrap_err().status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_query_is_empty_map() {
        let request = parse(Method::GET, "/hello", &[], b"").unwrap();
        assert_eq!(request.query_string(), "");
        assert!(request.query().is_empty());
        assert!(request.form().is_none());
    }

    #[test]
    fn path_is_percent_decoded() {
        let request = parse(Method::GET, "/hello/big%20world?q=a%26b", &[], b"").unwrap();
        assert_eq!(request.path(), "/hello/big world");
        assert_eq!(request.query_string(), "q=a%26b");
        assert_eq!(request.query().get("q"), Some("a&b"));
    }

    #[test]
    fn absolute_form_target() {
        let request = parse(Method::GET, "http://example.com/a/b?x=1", &[], b"").unwrap();
        assert_eq!(request.path(), "/a/b");
        assert_eq!(request.query().get("x"), Some("1"));
    }

    #[test]
    fn cookie_header() {
        let request = parse(Method::GET, "/hello", &[("Cookie", "token=bizbaz; theme=dark")], b"").unwrap();
        assert_eq!(request.cookies().get("token"), Some("bizbaz"));
        assert_eq!(request.cookies().get("theme"), Some("dark"));
    }

    #[test]
    fn raw_body_without_form_type() {
        let request = parse(Method::POST, "/hello", &[], b"stream").unwrap();
        assert_eq!(&request.raw_body()[..], b"stream");
        assert!(request.form().is_none());
    }

    #[test]
    fn json_request() {
        let request = parse(Method::POST, "/hello", &[("Content-Type", "application/json")], br#"{"my":"name"}"#).unwrap();
        assert_eq!(request.form().unwrap().as_json().unwrap(), &serde_json::json!({"my": "name"}));
    }

    #[test]
    fn headers_are_frozen_and_caseless() {
        let mut request =
            parse(Method::GET, "/", &[("X-Token", "1"), ("x-token", "2"), ("Host", "localhost")], b"").unwrap();

        assert_eq!(request.headers().get("x-TOKEN"), Some("1"));
        assert_eq!(request.headers().get_all("X-Token").unwrap(), ["1", "2"]);
        assert_eq!(request.headers().get("host"), Some("localhost"));

        // the accessors only hand out shared references, but clones stay frozen too
        let mut headers = request.headers().clone();
        assert_eq!(headers.set("X-Token", "3"), Err(ContainerError::Immutable));

        request.extensions_mut().insert(42_u32);
        assert_eq!(request.extensions().get::<u32>(), Some(&42));
    }

    #[test]
    fn expect_continue_state() {
        let mut parser = RequestParser::new();
        parser.on_message_begin(Method::POST, Version::HTTP_11);
        parser.on_url("/upload").unwrap();
        assert!(parser.has_path());
        parser.on_header("Content-Length", "3");
        assert_eq!(parser.state(), ParserState::Processing);
        parser.on_header("EXPECT", "100-Continue");
        assert_eq!(parser.state(), ParserState::ExpectContinue);
        parser.on_headers_complete();

        parser.continue_sent();
        assert_eq!(parser.state(), ParserState::Processing);

        parser.on_body(b"a");
        parser.on_body(b"bc");
        parser.on_message_complete().unwrap();
        assert!(parser.is_finished());
        assert_eq!(&parser.request().raw_body()[..], b"abc");
    }

    #[test]
    fn expect_ignored_for_http_10() {
        let mut parser = RequestParser::new();
        parser.on_message_begin(Method::POST, Version::HTTP_10);
        parser.on_url("/upload").unwrap();
        parser.on_header("Expect", "100-continue");
        parser.on_headers_complete();

        assert_eq!(parser.state(), ParserState::Processing);
        assert_eq!(parser.request().headers().get("expect"), Some("100-continue"));
    }

    #[test]
    fn malformed_body_still_finishes() {
        let mut parser = RequestParser::new();
        parser.on_message_begin(Method::PUT, Version::HTTP_11);
        parser.on_url("/upload").unwrap();
        parser.on_header("Content-Type", "multipart/form-data");
        parser.on_headers_complete();
        parser.on_body(b"--x\r\n");

        assert!(parser.on_message_complete().is_err());
        assert!(parser.is_finished());
    }

    #[test]
    fn keep_alive_rules() {
        let mut parser = RequestParser::new();
        parser.on_message_begin(Method::GET, Version::HTTP_10);
        parser.on_url("/").unwrap();
        parser.on_headers_complete();
        assert!(!parser.request().is_keep_alive());

        let mut parser = RequestParser::new();
        parser.on_message_begin(Method::GET, Version::HTTP_10);
        parser.on_url("/").unwrap();
        parser.on_header("Connection", "Keep-Alive");
        parser.on_headers_complete();
        assert!(parser.request().is_keep_alive());

        let request = parse(Method::GET, "/", &[("Connection", "close")], b"").unwrap();
        assert!(!request.is_keep_alive());

        let request = parse(Method::GET, "/", &[], b"").unwrap();
        assert!(request.is_keep_alive());
    }
}
