//! Backend invocation seam.
//!
//! The controller treats the backend call as an opaque capability: an
//! async function from (route, request) to a response. [`HttpInvoker`]
//! is the default implementation; tests substitute their own.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::error::BoxError;
use crate::routing::Route;

/// Opaque capability performing the actual backend call.
///
/// An `Err` return means the call itself failed (connect error, protocol
/// error); any HTTP response, including 5xx, is an `Ok`. Dropping the
/// returned future cancels the call best-effort.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        route: &Route,
        request: Request<Bytes>,
    ) -> Result<Response<Body>, BoxError>;
}

/// Default invoker forwarding requests over HTTP.
pub struct HttpInvoker {
    client: Client<HttpConnector, Body>,
}

impl HttpInvoker {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }
}

impl Default for HttpInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(
        &self,
        route: &Route,
        request: Request<Bytes>,
    ) -> Result<Response<Body>, BoxError> {
        let (parts, body) = request.into_parts();

        // Rewrite scheme and authority to the route target; prepend the
        // target's endpoint prefix to the request path.
        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::try_from(route.target.scheme.as_str())?);
        let authority = route.target.authority();
        uri_parts.authority = Some(Authority::try_from(authority.as_str())?);
        if !route.target.endpoint.is_empty() {
            let path_and_query = match parts.uri.path_and_query() {
                Some(pq) => format!("{}{}", route.target.endpoint, pq),
                None => route.target.endpoint.clone(),
            };
            uri_parts.path_and_query = Some(PathAndQuery::try_from(path_and_query.as_str())?);
        }
        let uri = Uri::from_parts(uri_parts)?;

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .version(parts.version);
        if let Some(headers) = builder.headers_mut() {
            for (k, v) in parts.headers.iter() {
                headers.insert(k.clone(), v.clone());
            }
        }
        let request = builder.body(Body::from(body))?;

        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
