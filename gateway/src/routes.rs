use hyper::{Method, Request};
use std::collections::HashMap;

#[derive(Debug)]
enum PathSegment {
    Static(String),
    Param(String),
}

#[derive(Debug)]
struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Parses a path pattern such as "/api/{object_type}".
    /// Segments wrapped in braces capture the request segment under that name.
    fn parse(path_str: &str) -> Self {
        let normalized_path = path_str.trim().trim_matches('/');

        let segments = if normalized_path.is_empty() {
            vec![]
        } else {
            normalized_path
                .split('/')
                .map(|s| {
                    if let Some(stripped) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                        PathSegment::Param(stripped.to_string())
                    } else {
                        PathSegment::Static(s.to_string())
                    }
                })
                .collect()
        };

        Path { segments }
    }

    /// Returns the captured params if `request_path` matches this pattern.
    fn matches<'a>(&self, request_path: &'a str) -> Option<HashMap<String, &'a str>> {
        let normalized_path = request_path.trim().trim_matches('/');

        let request_segments: Vec<&'a str> = if normalized_path.is_empty() {
            vec![]
        } else {
            normalized_path.split('/').collect()
        };

        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (seg, req_segment) in self.segments.iter().zip(request_segments) {
            match seg {
                PathSegment::Static(s) if s != req_segment => return None,
                PathSegment::Static(_) => {}
                PathSegment::Param(name) => {
                    params.insert(name.clone(), req_segment);
                }
            }
        }

        Some(params)
    }
}

#[derive(Debug, PartialEq)]
pub struct RouteMatch<'a, A> {
    pub params: HashMap<String, &'a str>,
    pub action: &'a A,
}

#[derive(Debug)]
pub struct Route<A> {
    method: Method,
    path: Path,
    action: A,
}

impl<A> Route<A> {
    pub fn new(method: Method, path: &str, action: A) -> Self {
        Self {
            method,
            path: Path::parse(path),
            action,
        }
    }

    /// Trailing slash normalization is applied to incoming requests.
    pub fn matches<'a>(&'a self, method: &Method, path: &'a str) -> Option<RouteMatch<'a, A>> {
        if &self.method != method {
            return None;
        }

        let params = self.path.matches(path)?;
        Some(RouteMatch {
            params,
            action: &self.action,
        })
    }
}

/// Ordered route table. The first matching route wins, so more specific
/// routes must be registered before parameterized ones.
pub struct RouteTable<A> {
    routes: Vec<Route<A>>,
}

impl<A> RouteTable<A> {
    pub fn new(routes: Vec<Route<A>>) -> Self {
        Self { routes }
    }

    pub fn resolve<'a, B>(&'a self, request: &'a Request<B>) -> Option<RouteMatch<'a, A>> {
        let method = request.method();
        let path = request.uri().path();

        self.routes
            .iter()
            .find_map(|route| route.matches(method, path))
    }

    /// True if some route matches the path under a different method.
    pub fn path_exists(&self, path: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.path.matches(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path() {
        let route = Route::new(Method::POST, "/api/reset/", "reset");
        assert!(route.matches(&Method::POST, "/api/reset").is_some(), "exact path");
        assert!(
            route.matches(&Method::POST, "/api/reset/").is_some(),
            "with trailing slash normalization"
        );
        assert!(
            route.matches(&Method::POST, "/api/reset/2").is_none(),
            "extra segment doesn't match"
        );
        assert!(
            route.matches(&Method::POST, "/api/").is_none(),
            "missing segment doesn't match"
        );
        assert!(
            route.matches(&Method::GET, "/api/reset").is_none(),
            "method must match"
        );
    }

    #[test]
    fn test_dynamic_path() {
        let route = Route::new(Method::DELETE, "/api/{object_type}", "delete");

        let route_match = route.matches(&Method::DELETE, "/api/soloons").unwrap();
        assert_eq!(route_match.params.get("object_type").copied(), Some("soloons"));
        assert_eq!(route_match.action, &"delete");
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::new(vec![
            Route::new(Method::POST, "/api/reset", "reset"),
            Route::new(Method::POST, "/api/{object_type}", "create"),
        ]);

        let request = Request::post("/api/reset").body(()).unwrap();
        assert_eq!(table.resolve(&request).unwrap().action, &"reset");

        let request = Request::post("/api/comeths").body(()).unwrap();
        assert_eq!(table.resolve(&request).unwrap().action, &"create");

        let request = Request::get("/api/comeths").body(()).unwrap();
        assert!(table.resolve(&request).is_none());
        assert!(table.path_exists("/api/comeths"));
        assert!(!table.path_exists("/other"));
    }

    #[test]
    fn test_path_parsing() {
        let path = Path::parse("");
        assert_eq!(path.segments.len(), 0);

        let path = Path::parse("/api/bulk");
        assert_eq!(path.segments.len(), 2);

        let path = Path::parse("/api/{object_type}");
        assert!(matches!(path.segments[1], PathSegment::Param(ref name) if name == "object_type"));
    }
}
