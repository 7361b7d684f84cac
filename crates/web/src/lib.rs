//! Routing, middleware and dispatch on top of `albatross-http`.
//!
//! A [`Server`] owns an ordered [`Router`] of path patterns, each bound to a
//! [`MethodRouter`] holding one [`RequestHandler`] per verb, plus a chain of
//! [`Middleware`]s wrapped around every dispatch.
//!
//! # Example
//!
//! ```no_run
//! use albatross_web::router::{Router, get};
//! use albatross_web::{HandlerResult, Request, Response, Server, handler_fn};
//! use futures::FutureExt;
//!
//! async fn hello(req: &Request, res: &mut Response) -> HandlerResult {
//!     let name = req.args().get("name").unwrap_or("World");
//!     res.write(format!("Hello {name}"));
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .route("/hello", get(handler_fn(|req, res| hello(req, res).boxed())))
//!         .route("/hello/{name}", get(handler_fn(|req, res| hello(req, res).boxed())))
//!         .build()
//!         .expect("valid routes");
//!
//!     Server::builder().router(router).build().expect("router is set").start().await;
//! }
//! ```

mod config;
mod handler;
mod middleware;
mod server;

pub mod router;

pub use config::ServerConfig;
pub use handler::FnHandler;
pub use handler::MethodRouter;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use middleware::Middleware;
pub use middleware::Middlewares;
pub use middleware::MiddlewaresBuilder;
pub use router::RouteError;
pub use router::RouteMatch;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;

pub use albatross_http::protocol::{Form, Halt, HandlerResult, PathArgs, Request, Response, StatusError};
