//! curl -v http://127.0.0.1:8000/hello/albatross
//! curl -v -d "name=mouse" http://127.0.0.1:8000/hello

use std::time::Instant;

use albatross_web::router::{Router, get};
use albatross_web::{HandlerResult, Middleware, MethodRouter, Request, Response, Server, ServerConfig, handler_fn};
use async_trait::async_trait;
use futures::FutureExt;
use tracing::info;

async fn hello(req: &Request, res: &mut Response) -> HandlerResult {
    let name = req.args().get("name").unwrap_or("World");
    res.write(format!("Hello {name}"));
    Ok(())
}

async fn motd(req: &Request, res: &mut Response) -> HandlerResult {
    let name = req.args().required("name")?;
    res.write(format!("Message of the day for {name}: keep flying"));
    Ok(())
}

async fn echo(req: &Request, res: &mut Response) -> HandlerResult {
    let name = req.required_form()?.required("name")?;
    res.set_cookie("last-name", name.as_str());
    res.write_json(&serde_json::json!({ "name": name }))
}

async fn home(_req: &Request, res: &mut Response) -> HandlerResult {
    Err(res.redirect("/hello", false))
}

#[derive(Debug)]
struct Timing;

#[async_trait]
impl Middleware for Timing {
    async fn process_request(&self, req: &mut Request, _res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
        req.extensions_mut().insert(Instant::now());
        Ok(())
    }

    async fn process_response(&self, req: &Request, res: &mut Response, _handler: Option<&MethodRouter>) -> HandlerResult {
        if let Some(started) = req.extensions().get::<Instant>() {
            info!(method = %req.method(), path = %req.path(), status = res.status().as_u16(), elapsed = ?started.elapsed(), "served");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let router = Router::builder()
        .route("/", get(handler_fn(|req, res| home(req, res).boxed())))
        .route(
            "/hello",
            get(handler_fn(|req, res| hello(req, res).boxed())).post(handler_fn(|req, res| echo(req, res).boxed())),
        )
        .route("/hello/{name}", get(handler_fn(|req, res| hello(req, res).boxed())))
        .route("/hello/{name}/motd", get(handler_fn(|req, res| motd(req, res).boxed())))
        .build()
        .unwrap();

    let config = ServerConfig { host: "127.0.0.1".to_string(), ..ServerConfig::default() };

    Server::builder().config(config).router(router).middleware(Timing).build().unwrap().start().await;
}
