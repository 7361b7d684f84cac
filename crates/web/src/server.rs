//! Server bootstrap and the dispatch pipeline.
//!
//! A request goes through these steps:
//!
//! 1. route lookup, storing the path arguments on the request
//! 2. `process_request` of every middleware, in registration order
//! 3. dispatch to the handler registered for the request's verb
//! 4. the error boundary: a [`Halt`] from steps 2 or 3 becomes the response
//! 5. `process_response` of every middleware entered in step 2
//!
//! The route table and middleware list are fixed once [`ServerBuilder::build`] returns;
//! connections share the [`Server`] through an [`Arc`].

use std::sync::Arc;

use albatross_http::connection::HttpConnection;
use albatross_http::handler::Handler;
use albatross_http::protocol::{Halt, HandlerResult, HttpError, PathArgs, Request, Response, StatusError};
use async_trait::async_trait;
use http::{Method, StatusCode, header};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::ServerConfig;
use crate::handler::MethodRouter;
use crate::middleware::{Middleware, Middlewares, MiddlewaresBuilder};
use crate::router::Router;

/// Verbs listed in the `Allow` header of a spoofed `OPTIONS` response.
const SPOOFED_ALLOW: &str = "GET,POST,DELETE,PUT";

pub struct ServerBuilder {
    config: ServerConfig,
    router: Option<Router>,
    middlewares: MiddlewaresBuilder,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), router: None, middlewares: Middlewares::builder() }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Appends `middleware` after the ones added so far.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares = self.middlewares.add_last(middleware);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        if self.config.max_read_chunk == 0 {
            return Err(ServerBuildError::InvalidReadChunk);
        }
        Ok(Server { config: self.config, router, middlewares: self.middlewares.build() })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).field("router", &self.router).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("max_read_chunk must be greater than zero")]
    InvalidReadChunk,
}

#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    router: Router,
    middlewares: Middlewares,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Installs the log subscriber, binds the configured address and serves forever.
    pub async fn start(self) {
        let level = self.config.max_level().unwrap_or(Level::INFO);
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "log subscriber already installed");
        }
        if self.config.max_level().is_none() {
            warn!(log_level = %self.config.log_level, "unknown log level, using info");
        }

        let address = self.config.address();
        info!(%address, "start listening");
        let tcp_listener = match TcpListener::bind(&address).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, %address, "bind server error");
                return;
            }
        };

        Arc::new(self).serve(tcp_listener).await;
    }

    /// Accepts connections from `tcp_listener` and serves each on its own task.
    pub async fn serve(self: Arc<Self>, tcp_listener: TcpListener) {
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&self);
            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                match server.serve_connection(reader, writer).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(cause = %e, %remote_addr, "service has error, connection shutdown"),
                }
            });
        }
    }

    /// Runs the request cycles of one connection against this server.
    pub async fn serve_connection<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), HttpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let max_read_chunk = self.config.max_read_chunk;
        HttpConnection::with_read_chunk(reader, writer, max_read_chunk).process(self).await
    }

    async fn dispatch(&self, req: &Request, res: &mut Response, methods: Option<&MethodRouter>) -> HandlerResult {
        let Some(methods) = methods else {
            return Err(StatusError::not_found().into());
        };

        match methods.handler_for(req.method()) {
            Some(handler) => handler.invoke(req, res).await,
            None if req.method() == Method::OPTIONS && self.config.spoof_options => {
                res.set_header(header::ALLOW.as_str(), SPOOFED_ALLOW);
                Ok(())
            }
            None => Err(StatusError::method_not_allowed().into()),
        }
    }

    /// Turns a [`Halt`] into the response, leaving a redirect untouched.
    fn handle_error(req: &Request, res: &mut Response, halt: Halt) {
        let (status, message) = match halt {
            Halt::Redirect(status) => {
                debug!(path = %req.path(), status = status.as_u16(), "redirect");
                return;
            }
            Halt::Status(e) => {
                warn!(method = %req.method(), path = %req.path(), status = e.status().as_u16(), message = %e.message(), "request failed");
                (e.status(), e.message().to_string())
            }
            Halt::Internal(e) => {
                error!(method = %req.method(), path = %req.path(), cause = ?e, "uncaught error while handling request");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, status.to_string())
            }
        };

        res.clear();
        res.set_status(status);
        res.set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        res.write(message);
    }
}

#[async_trait]
impl Handler for Server {
    type Error = Halt;

    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<(), Self::Error> {
        let (methods, args) = match self.router.get_handler(req.path()) {
            Some(route) => {
                let (methods, args) = route.into_parts();
                (Some(methods), args)
            }
            None => (None, PathArgs::empty()),
        };
        req.set_args(args);

        let (entered, result) = self.middlewares.process_request(req, res, methods).await;
        let result = match result {
            Ok(()) => self.dispatch(req, res, methods).await,
            Err(halt) => Err(halt),
        };

        if let Err(halt) = result {
            Self::handle_error(req, res, halt);
        }

        // a failure here is answered with 500 by the connection
        self.middlewares.process_response(entered, req, res, methods).await
    }
}
