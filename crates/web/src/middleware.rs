//! Middleware hooks around route dispatch.
//!
//! Every request passes the `process_request` hooks in registration order before its
//! handler runs, and the `process_response` hooks in the same order afterwards. When a
//! `process_request` hook fails, the middlewares after it are skipped entirely, while
//! every middleware already entered (the failing one included) still gets its
//! `process_response` hook once the error has been turned into a response.

use albatross_http::protocol::{HandlerResult, Request, Response};
use async_trait::async_trait;
use tracing::error;

use crate::handler::MethodRouter;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Runs before dispatch. `handler` is the matched route's verb set, if any.
    async fn process_request(&self, _req: &mut Request, _res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
        Ok(())
    }

    /// Runs after dispatch, also when dispatch produced an error response.
    async fn process_response(&self, _req: &Request, _res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
        Ok(())
    }
}

/// The ordered middleware list of a server.
#[derive(Default)]
pub struct Middlewares {
    inner: Vec<Box<dyn Middleware>>,
}

impl Middlewares {
    pub fn builder() -> MiddlewaresBuilder {
        MiddlewaresBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Runs the pre-dispatch hooks and reports how many middlewares were entered.
    pub async fn process_request(&self, req: &mut Request, res: &mut Response, handler: Option<&MethodRouter>) -> (usize, HandlerResult) {
        for (index, middleware) in self.inner.iter().enumerate() {
            if let Err(halt) = middleware.process_request(req, res, handler).await {
                return (index + 1, Err(halt));
            }
        }
        (self.inner.len(), Ok(()))
    }

    /// Runs the post-dispatch hooks of the first `entered` middlewares.
    ///
    /// A failing hook does not stop the others; the first failure is returned.
    pub async fn process_response(&self, entered: usize, req: &Request, res: &mut Response, handler: Option<&MethodRouter>) -> HandlerResult {
        let mut result = Ok(());
        for middleware in self.inner.iter().take(entered) {
            if let Err(halt) = middleware.process_response(req, res, handler).await {
                error!(cause = %halt, path = %req.path(), "middleware failed to process response");
                if result.is_ok() {
                    result = Err(halt);
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for Middlewares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middlewares").field("len", &self.inner.len()).finish()
    }
}

#[derive(Default)]
pub struct MiddlewaresBuilder {
    inner: Vec<Box<dyn Middleware>>,
}

impl MiddlewaresBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn add_last<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.inner.push(Box::new(middleware));
        self
    }

    pub fn add_first<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.inner.insert(0, Box::new(middleware));
        self
    }

    pub fn build(self) -> Middlewares {
        Middlewares { inner: self.inner }
    }
}

impl std::fmt::Debug for MiddlewaresBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewaresBuilder").field("len", &self.inner.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use albatross_http::protocol::StatusError;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_request: bool,
        fail_response: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self { name, log: Arc::clone(log), fail_request: false, fail_response: false }
        }
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn process_request(&self, _req: &mut Request, _res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
            self.log.lock().unwrap().push(format!("{}:request", self.name));
            if self.fail_request {
                return Err(StatusError::bad_request("stop").into());
            }
            Ok(())
        }

        async fn process_response(&self, _req: &Request, _res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
            self.log.lock().unwrap().push(format!("{}:response", self.name));
            if self.fail_response {
                return Err(StatusError::bad_request("late").into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares = Middlewares::builder().add_last(Recorder::new("b", &log)).add_first(Recorder::new("a", &log)).build();

        let mut req = Request::new();
        let mut res = Response::new();
        let (entered, result) = middlewares.process_request(&mut req, &mut res, None).await;
        assert_eq!(entered, 2);
        assert!(result.is_ok());
        middlewares.process_response(entered, &req, &mut res, None).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["a:request", "b:request", "a:response", "b:response"]);
    }

    #[tokio::test]
    async fn failing_request_hook_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut failing = Recorder::new("b", &log);
        failing.fail_request = true;
        let middlewares = Middlewares::builder()
            .add_last(Recorder::new("a", &log))
            .add_last(failing)
            .add_last(Recorder::new("c", &log))
            .build();

        let mut req = Request::new();
        let mut res = Response::new();
        let (entered, result) = middlewares.process_request(&mut req, &mut res, None).await;
        assert_eq!(entered, 2);
        assert!(result.is_err());
        middlewares.process_response(entered, &req, &mut res, None).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["a:request", "b:request", "a:response", "b:response"]);
    }

    #[tokio::test]
    async fn failing_response_hook_does_not_skip_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut failing = Recorder::new("a", &log);
        failing.fail_response = true;
        let middlewares = Middlewares::builder().add_last(failing).add_last(Recorder::new("b", &log)).build();

        let req = Request::new();
        let mut res = Response::new();
        assert!(middlewares.process_response(2, &req, &mut res, None).await.is_err());
        assert_eq!(*log.lock().unwrap(), ["a:response", "b:response"]);
    }
}
