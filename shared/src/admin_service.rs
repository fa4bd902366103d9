use crate::http::make_boxed_error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Serves `/health` and `/ready` on the admin listener.
///
/// Readiness flips to true once the main listener reports it is serving.
pub struct AdminService<E> {
    ready: Arc<AtomicBool>,
    _error: PhantomData<fn() -> E>,
}

impl<E> AdminService<E> {
    pub fn new(ready: Arc<AtomicBool>) -> Self {
        Self {
            ready,
            _error: PhantomData,
        }
    }
}

fn route<E>(method: &Method, path: &str, is_ready: bool) -> Response<BoxBody<Bytes, E>> {
    let ok_body = || Full::new(Bytes::from("ok\n")).map_err(|e| match e {}).boxed();

    if method != Method::GET {
        return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    match path {
        "/health" => Response::new(ok_body()),
        "/ready" => match is_ready {
            true => Response::new(ok_body()),
            false => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
        },
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}

impl<E> Service<Request<Incoming>> for AdminService<E>
where
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = route(req.method(), req.uri().path(), self.ready.load(Ordering::Relaxed));
        Box::pin(async move { Ok(response) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_health_is_always_ok() {
        let response = route::<Infallible>(&Method::GET, "/health", false);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_ready_follows_flag() {
        let response = route::<Infallible>(&Method::GET, "/ready", false);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = route::<Infallible>(&Method::GET, "/ready", true);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_path_and_method() {
        let response = route::<Infallible>(&Method::GET, "/metrics", true);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = route::<Infallible>(&Method::POST, "/health", true);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
