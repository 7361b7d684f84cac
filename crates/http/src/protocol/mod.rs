//! Protocol types shared by the codec, the connection and the handlers.
//!
//! - **Containers** ([`multi_map`]): [`MultiMap`] and [`CaselessMultiMap`], ordered
//!   multi-value maps that can be frozen once parsed
//! - **Request** ([`request`]): the [`Request`] entity and the event driven
//!   [`RequestParser`] state machine that fills it
//! - **Forms** ([`form`]): json, urlencoded and multipart body parsing
//! - **Cookies** ([`cookie`]): `Cookie` header parsing and `Set-Cookie` encoding
//! - **Response** ([`response`]): the [`Response`] builder handlers write into
//! - **Messages** ([`message`]): what the request decoder yields
//! - **Errors** ([`error`]): [`HttpError`], [`ParseError`], [`SendError`],
//!   [`StatusError`] and the handler short-circuit [`Halt`]

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod head;
pub use head::RequestHead;

pub mod multi_map;
pub use multi_map::CaselessMultiMap;
pub use multi_map::MultiMap;

pub mod cookie;
pub use cookie::SetCookie;

pub mod form;
pub use form::FileUpload;
pub use form::Form;
pub use form::FormField;
pub use form::MultipartForm;

mod request;
pub use request::ParserState;
pub use request::PathArgs;
pub use request::Request;
pub use request::RequestParser;

mod response;
pub use response::Response;

mod error;
pub use error::ContainerError;
pub use error::Halt;
pub use error::HandlerResult;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StatusError;
