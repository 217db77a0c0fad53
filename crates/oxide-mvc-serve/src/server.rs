//! HTTP/1 transport: converts hyper requests into dispatcher requests and back.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use oxide_mvc::{Dispatcher, Request, Response};
use tokio::net::TcpListener;

/// Reads a hyper request, body included, into a [`Request`].
pub async fn to_request<B>(req: HyperRequest<B>) -> Request
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let mut request = Request::new(parts.method.as_str(), parts.uri.path());

    if let Some(query) = parts.uri.query() {
        request.query = Request::parse_query_string(query);
    }

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request.headers.insert(name.as_str(), value);
        }
    }

    match body.collect().await {
        Ok(collected) => request.body = collected.to_bytes().to_vec(),
        Err(err) => tracing::warn!(error = %err, "failed to read request body"),
    }
    request
}

/// Converts a dispatcher [`Response`] into a hyper response.
pub fn to_hyper(response: Response) -> HyperResponse<Full<Bytes>> {
    let mut out = HyperResponse::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in response.headers.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => tracing::warn!(header = name, "dropping invalid response header"),
        }
    }
    out
}

pub async fn handle_request<B>(
    req: HyperRequest<B>,
    dispatcher: Arc<Dispatcher>,
) -> Result<HyperResponse<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let request = to_request(req).await;
    Ok(to_hyper(dispatcher.handle(request)))
}

/// Accepts connections until the listener fails.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let dispatcher = Arc::clone(&dispatcher);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, Arc::clone(&dispatcher)));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::warn!(%peer, error = %err, "error serving connection");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use oxide_docstore::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::app;

    fn catalogue() -> Arc<Dispatcher> {
        let widgets = app::widgets(Arc::new(MemoryStore::new()));
        Arc::new(app::dispatcher(&widgets, "test", None).unwrap())
    }

    #[tokio::test]
    async fn test_to_request_copies_everything() {
        let req = HyperRequest::builder()
            .method("POST")
            .uri("/widgets?page=2&sort=name")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(b"name=gear")))
            .unwrap();

        let request = to_request(req).await;
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/widgets");
        assert_eq!(request.get_query("page"), Some("2"));
        assert_eq!(
            request.get_header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body, b"name=gear");
    }

    #[test]
    fn test_to_hyper_keeps_status_and_headers() {
        let res = to_hyper(Response::redirect("/widgets"));
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()["location"], "/widgets");

        let res = to_hyper(Response::ok().header("Bad\nName", "x"));
        assert!(res.headers().is_empty());
    }

    #[tokio::test]
    async fn test_handle_request_negotiates_json() {
        let req = HyperRequest::builder()
            .uri("/widgets")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let res = handle_request(req, catalogue()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": []}));
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, catalogue()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /nowhere HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 404 Not Found"));
        assert!(raw.ends_with("<h1>Not Found: /nowhere</h1>"));
        server.abort();
    }
}
