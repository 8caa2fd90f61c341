use axum::http::{
    header::{HOST, LOCATION},
    HeaderValue, Request, Response, StatusCode,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

pub const CANONICAL_HOST: &str = "graceperiod.live";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Permanently redirects requests for `www.<canonical host>` to the bare domain,
/// keeping the protocol, path and query.
#[derive(Debug, Clone)]
pub struct CanonicalHostLayer {
    canonical_host: &'static str,
}

impl CanonicalHostLayer {
    pub fn new(canonical_host: &'static str) -> Self {
        Self { canonical_host }
    }
}

impl<S> Layer<S> for CanonicalHostLayer {
    type Service = CanonicalHost<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CanonicalHost {
            inner,
            canonical_host: self.canonical_host,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CanonicalHost<S> {
    inner: S,
    canonical_host: &'static str,
}

impl<S> CanonicalHost<S> {
    fn moved_permanently<ResBody>(location: HeaderValue) -> Response<ResBody>
    where
        ResBody: Default,
    {
        let mut res = Response::default();
        *res.status_mut() = StatusCode::MOVED_PERMANENTLY;
        res.headers_mut().insert(LOCATION, location);
        res
    }
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for CanonicalHost<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if let Some(location) = redirect_location(&req, self.canonical_host) {
            tracing::info!(?location, "Redirecting to canonical host");
            return Box::pin(async move { Ok(Self::moved_permanently(location)) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

fn redirect_location<B>(req: &Request<B>, canonical_host: &str) -> Option<HeaderValue> {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| req.uri().host())?;

    if !host.eq_ignore_ascii_case(&format!("www.{canonical_host}")) {
        return None;
    }

    // No TLS is terminated here, so anything not forwarded as https is plain http.
    let protocol = req
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| proto.eq_ignore_ascii_case("https"))
        .map_or("http", |_| "https");

    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());

    match HeaderValue::from_str(&format!("{protocol}://{canonical_host}{path_and_query}")) {
        Ok(location) => Some(location),
        Err(e) => {
            tracing::warn!("Failed to build canonical redirect location: {e:?}");
            None
        }
    }
}
