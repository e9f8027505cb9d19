//! Per-request observation context.
//!
//! # Data Flow
//! ```text
//! request accepted
//!     → ServerRequestObservationContext::from_request (method, path, query, route)
//!     → inner service runs
//!     → set_response_status / set_error
//!     → conventions read the completed context
//!     → context dropped
//! ```

use std::any;
use std::borrow::Cow;
use std::fmt;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;

use crate::http::request::RequestIdExt;

/// A failure captured while handling a request.
///
/// Handlers attach one to their response with [`ObservedError::attach`]; the
/// observation middleware removes it before the response leaves the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedError {
    type_name: Cow<'static, str>,
    message: String,
}

impl ObservedError {
    /// Capture an error, recording the fully-qualified name of its type.
    ///
    /// The name comes from the static type `E`, not the value: passing a
    /// `Box<MyError>` or another wrapper records the wrapper's name. Deref to
    /// the concrete error first (`ObservedError::new(&*boxed)`). For type-erased
    /// errors such as `Box<dyn Error>` the concrete name is unrecoverable; use
    /// [`ObservedError::with_type_name`] with a stable name instead.
    pub fn new<E: std::error::Error + 'static>(error: &E) -> Self {
        Self {
            type_name: Cow::Borrowed(any::type_name::<E>()),
            message: error.to_string(),
        }
    }

    /// Capture a failure whose type is known only by name, e.g. a panic.
    pub fn with_type_name(
        type_name: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Store this error in the response extensions for the middleware to pick up.
    ///
    /// Its type name becomes the `exception` label, so it must stay bounded.
    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

impl fmt::Display for ObservedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Decoded query string parameters in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pairs: Vec<(String, String)>,
}

impl QueryParameters {
    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A name given without `=` is present with an empty value.
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value for the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Everything conventions may read about one HTTP server request.
#[derive(Debug, Clone, Default)]
pub struct ServerRequestObservationContext {
    method: Option<String>,
    path: String,
    route: Option<String>,
    query: QueryParameters,
    request_id: Option<String>,
    response_status: Option<u16>,
    error: Option<ObservedError>,
}

impl ServerRequestObservationContext {
    /// Empty context; fields are filled with the `with_*` builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the request-side fields of an inbound request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request.uri();
        Self {
            method: Some(request.method().as_str().to_string()),
            path: uri.path().to_string(),
            route: request
                .extensions()
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string()),
            query: uri.query().map(QueryParameters::parse).unwrap_or_default(),
            request_id: request.request_id().map(str::to_string),
            response_status: None,
            error: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Set the raw (still encoded) query string.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = QueryParameters::parse(query);
        self
    }

    pub fn with_response_status(mut self, status: u16) -> Self {
        self.response_status = Some(status);
        self
    }

    pub fn with_error(mut self, error: ObservedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn set_response_status(&mut self, status: u16) {
        self.response_status = Some(status);
    }

    pub fn set_error(&mut self, error: ObservedError) {
        self.error = Some(error);
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route template matched by the router, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn query(&self) -> &QueryParameters {
        &self.query
    }

    /// Decoded value of a query parameter.
    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn response_status(&self) -> Option<u16> {
        self.response_status
    }

    pub fn error(&self) -> Option<&ObservedError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::X_REQUEST_ID;
    use axum::body::Body;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_query_decoding() {
        let query = QueryParameters::parse("user=al%20ice&x=1&user=bob");
        assert_eq!(query.get("user"), Some("al ice"));
        assert_eq!(query.get("x"), Some("1"));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_query_name_without_value() {
        let query = QueryParameters::parse("user");
        assert_eq!(query.get("user"), Some(""));
    }

    #[test]
    fn test_query_plus_is_space() {
        let query = QueryParameters::parse("user=a+b");
        assert_eq!(query.get("user"), Some("a b"));
    }

    #[test]
    fn test_from_request() {
        let req = Request::builder()
            .method("POST")
            .uri("http://example.com/orders?user=alice")
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap();

        let ctx = ServerRequestObservationContext::from_request(&req);
        assert_eq!(ctx.method(), Some("POST"));
        assert_eq!(ctx.path(), "/orders");
        assert_eq!(ctx.query_parameter("user"), Some("alice"));
        assert_eq!(ctx.request_id(), Some("req-1"));
        assert_eq!(ctx.route(), None);
        assert_eq!(ctx.response_status(), None);
        assert!(ctx.error().is_none());
    }

    #[test]
    fn test_from_request_without_query() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let ctx = ServerRequestObservationContext::from_request(&req);
        assert!(ctx.query().is_empty());
        assert_eq!(ctx.method(), Some("GET"));
    }

    #[test]
    fn test_observed_error_type_name() {
        let err = ObservedError::new(&Boom);
        assert!(err.type_name().ends_with("::Boom"));
        assert!(err.type_name().contains("context"));
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_observed_error_names_static_type() {
        let boxed = Box::new(Boom);

        let wrapped = ObservedError::new(&boxed);
        assert!(wrapped.type_name().starts_with("alloc::boxed::Box<"));

        let unwrapped = ObservedError::new(&*boxed);
        assert!(unwrapped.type_name().ends_with("::Boom"));
        assert_eq!(unwrapped.message(), wrapped.message());
    }

    #[test]
    fn test_observed_error_attach() {
        let mut response = Response::new(Body::empty());
        ObservedError::with_type_name("panic", "oops").attach(&mut response);
        let attached = response.extensions().get::<ObservedError>().unwrap();
        assert_eq!(attached.type_name(), "panic");
    }
}
