//! The seam between a connection and the application.
//!
//! A connection parses a [`Request`], hands it to a [`Handler`] together with a fresh
//! [`Response`], and serializes whatever the handler left in the response. An `Err`
//! from the handler is logged and answered with `500 Internal Server Error`.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{Request, Response};

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<(), Self::Error>;
}

/// Adapts a function returning a boxed future into a [`Handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Err>> + Send,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Error = Err;

    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<(), Self::Error> {
        (self.f)(req, res).await
    }
}

/// Wraps `f` as a [`Handler`].
///
/// The future may not borrow the request or response; copy what it needs out of them
/// before the first `.await`, or implement [`Handler`] directly.
pub fn make_handler<F, Fut, Err>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> Fut,
    Fut: Future<Output = Result<(), Err>>,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    HandlerFn { f }
}
