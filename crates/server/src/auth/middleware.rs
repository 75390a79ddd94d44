use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use brigade_auth::{AuthChain, AuthOutcome};
use brigade_core::AuthRequest;
use tower::{Layer, Service};
use tracing::debug;

use super::RequestContext;
use super::kitchen::extract_kitchen;
use crate::error::ServerError;

const PUBLIC_PATHS: [&str; 3] = ["/health", "/version", "/.well-known/agent.json"];
const PUBLIC_PREFIXES: [&str; 2] = ["/a2a", "/mcp"];

/// Paths served without running the chain.
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Tower layer that runs the credential chain ahead of every handler.
#[derive(Clone)]
pub struct AuthLayer {
    chain: Arc<AuthChain>,
    require_auth: bool,
    realm: Arc<str>,
}

impl AuthLayer {
    pub fn new(chain: Arc<AuthChain>, require_auth: bool, realm: impl Into<Arc<str>>) -> Self {
        Self {
            chain,
            require_auth,
            realm: realm.into(),
        }
    }

    /// The chain this layer runs.
    pub fn chain(&self) -> &Arc<AuthChain> {
        &self.chain
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

/// Tower service that authenticates requests and attaches a
/// [`RequestContext`].
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    layer: AuthLayer,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let kitchen = extract_kitchen(req.headers(), req.uri().query());

            if is_public_path(req.uri().path()) {
                req.extensions_mut().insert(RequestContext {
                    identity: None,
                    kitchen,
                });
                return inner.call(req).await;
            }

            let auth_request = auth_request_from(&req);
            let identity = match layer.chain.authenticate(&auth_request).await {
                AuthOutcome::Matched(identity) => Some(identity),
                AuthOutcome::Skip => None,
                AuthOutcome::Rejected(err) => {
                    debug!(code = err.code(), error = %err, "credential rejected");
                    return Ok(
                        ServerError::authentication_failed(err.to_string(), &*layer.realm)
                            .into_response(),
                    );
                }
            };

            let Some(identity) = identity else {
                if layer.require_auth {
                    debug!(path = %req.uri().path(), "anonymous request refused");
                    return Ok(ServerError::authentication_required(&*layer.realm).into_response());
                }
                req.extensions_mut().insert(RequestContext {
                    identity: None,
                    kitchen,
                });
                return inner.call(req).await;
            };

            debug!(
                provider = %identity.provider,
                subject = %identity.subject,
                role = %identity.role,
                "request authenticated"
            );
            let kitchen = identity
                .tenant_scope
                .clone()
                .filter(|scope| !scope.is_empty())
                .unwrap_or(kitchen);
            req.extensions_mut().insert(identity.clone());
            req.extensions_mut().insert(RequestContext {
                identity: Some(identity),
                kitchen,
            });
            inner.call(req).await
        })
    }
}

fn auth_request_from(req: &Request<Body>) -> AuthRequest {
    let mut auth_request = req
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name, v)))
        .fold(AuthRequest::new(), |acc, (name, value)| {
            acc.with_header(name.as_str(), value)
        });
    if let Some(query) = req.uri().query() {
        auth_request = auth_request.with_query(query);
    }
    auth_request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_are_exact_or_prefixed() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/version"));
        assert!(is_public_path("/.well-known/agent.json"));
        assert!(is_public_path("/a2a"));
        assert!(is_public_path("/a2a/tasks/send"));
        assert!(is_public_path("/mcp/sse"));

        assert!(!is_public_path("/health/deep"));
        assert!(!is_public_path("/v1/whoami"));
        assert!(!is_public_path("/"));
    }

    #[test]
    fn request_view_keeps_headers_and_query() {
        let req = Request::builder()
            .uri("/v1/whoami?api_key=abc")
            .header("X-API-Key", "from-header")
            .header("Authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();
        let view = auth_request_from(&req);
        assert_eq!(view.header("x-api-key"), Some("from-header"));
        assert_eq!(view.header("authorization"), Some("Bearer tok"));
        assert_eq!(view.query_param("api_key"), Some("abc"));
    }
}
