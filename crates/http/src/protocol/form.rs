//! Structured request bodies.
//!
//! Once a request is complete its raw body is interpreted according to `Content-Type`:
//!
//! - `application/json` becomes a [`serde_json::Value`]
//! - `application/x-www-form-urlencoded` becomes a frozen [`MultiMap`]
//! - `multipart/form-data` becomes a [`MultipartForm`] of text fields and file uploads
//!
//! Any other content type leaves the body raw.

use bytes::Bytes;
use memchr::memmem;
use mime::Mime;

use crate::protocol::{CaselessMultiMap, MultiMap, ParseError, StatusError};

/// A parsed request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Json(serde_json::Value),
    UrlEncoded(MultiMap),
    Multipart(MultipartForm),
}

impl Form {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Form::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_urlencoded(&self) -> Option<&MultiMap> {
        match self {
            Form::UrlEncoded(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&MultipartForm> {
        match self {
            Form::Multipart(form) => Some(form),
            _ => None,
        }
    }

    /// The first text value of field `name`, whatever the body encoding.
    ///
    /// JSON bodies answer for top level string, number and boolean members.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Form::Json(value) => match value.get(name)? {
                serde_json::Value::String(s) => Some(s.clone()),
                v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => Some(v.to_string()),
                _ => None,
            },
            Form::UrlEncoded(map) => map.get(name).map(str::to_string),
            Form::Multipart(form) => form.text(name).map(str::to_string),
        }
    }

    /// Like [`Form::get`], but a missing field is a `400 Bad Request`.
    pub fn required(&self, name: &str) -> Result<String, StatusError> {
        self.get(name).ok_or_else(|| StatusError::bad_request(format!("Must provide parameter '{name}'.")))
    }
}

/// One value of a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    Text(String),
    File(FileUpload),
}

/// An uploaded file of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

impl FileUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Fields of a `multipart/form-data` body, in body order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<(String, FormField)>,
}

impl MultipartForm {
    /// The first value of field `name`.
    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_all(&self, name: &str) -> Vec<&FormField> {
        self.fields.iter().filter(|(k, _)| k == name).map(|(_, v)| v).collect()
    }

    pub fn required(&self, name: &str) -> Result<&FormField, StatusError> {
        self.get(name).ok_or_else(|| StatusError::bad_request(format!("Must provide parameter '{name}'.")))
    }

    /// The first value of field `name` if it is a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FormField::Text(s) => Some(s),
            FormField::File(_) => None,
        }
    }

    /// The first value of field `name` if it is a file upload.
    pub fn file(&self, name: &str) -> Option<&FileUpload> {
        match self.get(name)? {
            FormField::File(f) => Some(f),
            FormField::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Interprets a complete body according to its `Content-Type` header value.
///
/// Returns `Ok(None)` when the content type is missing or not one of the form types.
pub fn parse_body(content_type: Option<&str>, body: &Bytes) -> Result<Option<Form>, ParseError> {
    let Some(content_type) = content_type else {
        return Ok(None);
    };

    let Ok(mime) = content_type.trim().parse::<Mime>() else {
        // a content type we can't even parse is treated like an unknown one
        return Ok(None);
    };

    match (mime.type_(), mime.subtype()) {
        (mime::APPLICATION, mime::JSON) => {
            let text = std::str::from_utf8(body).map_err(|e| ParseError::malformed_form(&mime, e))?;
            let value = serde_json::from_str(text).map_err(|e| ParseError::malformed_form(&mime, e))?;
            Ok(Some(Form::Json(value)))
        }
        (mime::APPLICATION, mime::WWW_FORM_URLENCODED) => {
            let text = std::str::from_utf8(body).map_err(|e| ParseError::malformed_form(&mime, e))?;
            Ok(Some(Form::UrlEncoded(parse_urlencoded(text).map_err(|e| ParseError::malformed_form(&mime, e))?)))
        }
        (mime::MULTIPART, mime::FORM_DATA) => {
            let boundary = mime
                .get_param(mime::BOUNDARY)
                .map(|b| b.as_str().trim_matches('"').to_string())
                .filter(|b| !b.is_empty())
                .ok_or_else(|| ParseError::malformed_form(&mime, "missing boundary"))?;
            let form = parse_multipart(body, &boundary).map_err(|reason| ParseError::malformed_form(&mime, reason))?;
            Ok(Some(Form::Multipart(form)))
        }
        _ => Ok(None),
    }
}

/// Parses `a=1&b=2&a=3` into a frozen multi-map, percent and `+` decoded.
pub fn parse_urlencoded(text: &str) -> Result<MultiMap, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text)?;
    Ok(MultiMap::frozen_from_pairs(pairs))
}

// refer: https://www.rfc-editor.org/rfc/rfc7578
fn parse_multipart(body: &Bytes, boundary: &str) -> Result<MultipartForm, &'static str> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    // every delimiter after the first one is preceded by CRLF
    let inner_delimiter = [&b"\r\n"[..], delimiter].concat();

    let start = memmem::find(body, delimiter).ok_or("boundary not found")?;
    let mut pos = start + delimiter.len();
    let mut fields = Vec::new();

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            // close delimiter, the epilogue is ignored
            return Ok(MultipartForm { fields });
        }
        let rest = rest.strip_prefix(b"\r\n").ok_or("delimiter must be followed by CRLF")?;
        pos = body.len() - rest.len();

        let header_end = memmem::find(rest, b"\r\n\r\n").ok_or("unterminated part headers")?;
        let headers = parse_part_headers(&rest[..header_end])?;
        let content_start = pos + header_end + 4;

        let content_len = memmem::find(&body[content_start..], &inner_delimiter).ok_or("missing close delimiter")?;
        let content = body.slice(content_start..content_start + content_len);
        pos = content_start + content_len + inner_delimiter.len();

        let disposition = headers.get("content-disposition").ok_or("part without content-disposition")?;
        let (name, filename) = parse_disposition(disposition)?;

        let field = match filename {
            Some(filename) => FormField::File(FileUpload {
                filename,
                content_type: headers.get("content-type").map(str::to_string),
                data: content,
            }),
            None => FormField::Text(String::from_utf8(content.to_vec()).map_err(|_| "text field is not utf-8")?),
        };
        fields.push((name, field));
    }
}

fn parse_part_headers(raw: &[u8]) -> Result<CaselessMultiMap, &'static str> {
    let raw = std::str::from_utf8(raw).map_err(|_| "part headers are not utf-8")?;
    let mut headers = CaselessMultiMap::new();
    for line in raw.split("\r\n").filter(|line| !line.is_empty()) {
        let (name, value) = line.split_once(':').ok_or("invalid part header line")?;
        headers.set(name.trim(), value.trim()).map_err(|_| "invalid part header line")?;
    }
    Ok(headers)
}

/// Extracts `name` and `filename` from `form-data; name="field"; filename="a.txt"`.
fn parse_disposition(value: &str) -> Result<(String, Option<String>), &'static str> {
    let mut params = value.split(';').map(str::trim);
    let kind = params.next().unwrap_or_default();
    if !kind.eq_ignore_ascii_case("form-data") {
        return Err("content-disposition is not form-data");
    }

    let mut name = None;
    let mut filename = None;
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "filename" => filename = Some(value),
            _ => {}
        }
    }

    Ok((name.ok_or("part without name")?, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(s: &str) -> Bytes {
        Bytes::from(s.replace('\n', "\r\n"))
    }

    #[test]
    fn unknown_content_type_is_not_a_form() {
        let body = Bytes::from_static(b"stream");
        assert_eq!(parse_body(None, &body).unwrap(), None);
        assert_eq!(parse_body(Some("text/plain"), &body).unwrap(), None);
        assert_eq!(parse_body(Some("not a mime"), &body).unwrap(), None);
    }

    #[test]
    fn json_body() {
        let body = Bytes::from_static(br#"{"my":"name","age":3}"#);
        let form = parse_body(Some("application/json"), &body).unwrap().unwrap();
        assert_eq!(form.as_json().unwrap(), &serde_json::json!({"my": "name", "age": 3}));
        assert_eq!(form.get("my").as_deref(), Some("name"));
        assert_eq!(form.get("age").as_deref(), Some("3"));

        let with_charset = parse_body(Some("application/json; charset=utf-8"), &body).unwrap();
        assert_eq!(with_charset, Some(form));
    }

    #[test]
    fn malformed_json_fails() {
        let body = Bytes::from_static(b"{\"my\":");
        let err = parse_body(Some("application/json"), &body).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn urlencoded_body() {
        let body = Bytes::from_static(b"name=mouse&tag=a&tag=b+c&empty=");
        let form = parse_body(Some("application/x-www-form-urlencoded"), &body).unwrap().unwrap();
        let map = form.as_urlencoded().unwrap();
        assert_eq!(map.get("name"), Some("mouse"));
        assert_eq!(map.get_all("tag").unwrap(), ["a", "b c"]);
        assert_eq!(map.get("empty"), Some(""));
        assert!(map.is_frozen());
        assert_eq!(form.required("name").unwrap(), "mouse");
        assert!(form.required("three").is_err());
    }

    #[test]
    fn multipart_body() {
        let body = crlf(indoc! {r#"
            --XyZ
            Content-Disposition: form-data; name="title"

            hello world
            --XyZ
            Content-Disposition: form-data; name="upload"; filename="a.txt"
            Content-Type: text/plain

            line one
            line two
            --XyZ--
        "#});

        let form = parse_body(Some("multipart/form-data; boundary=XyZ"), &body).unwrap().unwrap();
        let form = form.as_multipart().unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form.text("title"), Some("hello world"));

        let file = form.file("upload").unwrap();
        assert_eq!(file.filename(), "a.txt");
        assert_eq!(file.content_type(), Some("text/plain"));
        assert_eq!(&file.data()[..], b"line one\r\nline two");
    }

    #[test]
    fn multipart_with_quoted_boundary_and_preamble() {
        let body = crlf("preamble\n--ab-12\nContent-Disposition: form-data; name=\"x\"\n\n1\n--ab-12--\n");
        let form = parse_body(Some("multipart/form-data; boundary=\"ab-12\""), &body).unwrap().unwrap();
        assert_eq!(form.get("x").as_deref(), Some("1"));
    }

    #[test]
    fn multipart_without_boundary_fails() {
        let body = crlf("--XyZ\nContent-Disposition: form-data; name=\"x\"\n\n1\n--XyZ--\n");
        let err = parse_body(Some("multipart/form-data"), &body).unwrap_err();
        assert!(matches!(err, ParseError::MalformedForm { .. }));
    }

    #[test]
    fn multipart_unterminated_fails() {
        let body = crlf("--XyZ\nContent-Disposition: form-data; name=\"x\"\n\n1\n");
        assert!(parse_body(Some("multipart/form-data; boundary=XyZ"), &body).is_err());
    }
}
