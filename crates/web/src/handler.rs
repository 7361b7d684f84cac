//! Request handlers and the per-route verb capability set.

use std::sync::Arc;

use albatross_http::protocol::{HandlerResult, Request, Response};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Method;

/// Answers one verb of one route.
///
/// The request is fully parsed and read-only here; everything the handler wants to
/// send goes into `res`. Returning [`Halt`](albatross_http::protocol::Halt) stops the
/// handler early: a redirect is sent as is, a status error becomes a plain text error
/// response.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &Request, res: &mut Response) -> HandlerResult;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn invoke(&self, req: &Request, res: &mut Response) -> HandlerResult {
        self.as_ref().invoke(req, res).await
    }
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: &Request, res: &mut Response) -> HandlerResult {
        self.as_ref().invoke(req, res).await
    }
}

/// A [`RequestHandler`] backed by a closure.
pub struct FnHandler<F> {
    f: F,
}

/// Turns a closure returning a boxed future into a [`RequestHandler`].
///
/// ```
/// use albatross_web::handler_fn;
/// use futures::FutureExt;
///
/// let hello = handler_fn(|_req, res| {
///     async move {
///         res.write("Hello World");
///         Ok(())
///     }
///     .boxed()
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a Request, &'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a Request, &'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn invoke(&self, req: &Request, res: &mut Response) -> HandlerResult {
        (self.f)(req, res).await
    }
}

/// The verbs a route answers, each with its own handler.
///
/// A verb without a handler is answered with `405 Method Not Allowed` by the server.
#[derive(Default)]
pub struct MethodRouter {
    handlers: Vec<(Method, Box<dyn RequestHandler>)>,
}

macro_rules! method_handler {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Answers `", stringify!($method), "` with `handler`.")]
        pub fn $name<H: RequestHandler + 'static>(self, handler: H) -> Self {
            self.on(Method::$method, handler)
        }
    };
}

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method` with `handler`, replacing a handler registered for it earlier.
    pub fn on<H: RequestHandler + 'static>(mut self, method: Method, handler: H) -> Self {
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, Box::new(handler)));
        self
    }

    method_handler!(get, GET);
    method_handler!(post, POST);
    method_handler!(put, PUT);
    method_handler!(delete, DELETE);
    method_handler!(options, OPTIONS);
    method_handler!(patch, PATCH);

    pub fn handler_for(&self, method: &Method) -> Option<&dyn RequestHandler> {
        self.handlers.iter().find(|(m, _)| m == method).map(|(_, h)| h.as_ref())
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.handler_for(method).is_some()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.iter().map(|(m, _)| m)
    }
}

impl std::fmt::Debug for MethodRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.methods()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Text(&'static str);

    #[async_trait]
    impl RequestHandler for Text {
        async fn invoke(&self, _req: &Request, res: &mut Response) -> HandlerResult {
            res.write(self.0);
            Ok(())
        }
    }

    #[tokio::test]
    async fn picks_handler_by_verb() {
        let methods = MethodRouter::new().get(Text("get")).post(Text("post"));
        assert!(methods.allows(&Method::GET));
        assert!(methods.allows(&Method::POST));
        assert!(!methods.allows(&Method::PUT));

        let req = Request::new();
        let mut res = Response::new();
        methods.handler_for(&Method::POST).unwrap().invoke(&req, &mut res).await.unwrap();
        assert_eq!(&res.body()[..], b"post");
    }

    #[tokio::test]
    async fn later_registration_replaces() {
        let methods = MethodRouter::new().get(Text("first")).get(Text("second"));
        assert_eq!(methods.methods().count(), 1);

        let mut res = Response::new();
        methods.handler_for(&Method::GET).unwrap().invoke(&Request::new(), &mut res).await.unwrap();
        assert_eq!(&res.body()[..], b"second");
    }

    #[tokio::test]
    async fn closures_and_shared_handlers() {
        let shared = Arc::new(Text("shared"));
        let methods = MethodRouter::new()
            .put(Arc::clone(&shared))
            .delete(shared)
            .options(handler_fn(|req, res| {
                async move {
                    res.write(req.method().as_str());
                    Ok(())
                }
                .boxed()
            }));

        let mut res = Response::new();
        methods.handler_for(&Method::DELETE).unwrap().invoke(&Request::new(), &mut res).await.unwrap();
        assert_eq!(&res.body()[..], b"shared");

        let mut res = Response::new();
        methods.handler_for(&Method::OPTIONS).unwrap().invoke(&Request::new(), &mut res).await.unwrap();
        assert_eq!(&res.body()[..], b"GET");
    }
}
