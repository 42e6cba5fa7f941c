//! Transport capability
//!
//! The engine never opens sockets itself. A transport performs one blocking
//! request on a worker thread and reports a status code and body.

/// Successful HTTP status
pub const HTTP_OK: i32 = 200;

/// Status reported when the transport could not complete the request at all
pub const HTTP_TRANSPORT_ERROR: i32 = -1;

/// An outbound request. A `post_data` body turns it into a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub post_data: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            post_data: None,
        }
    }

    pub fn post(url: impl Into<String>, post_data: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            post_data: Some(post_data.into()),
        }
    }

    pub fn is_post(&self) -> bool {
        self.post_data.is_some()
    }
}

/// Result of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: i32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: HTTP_OK,
            body: body.into(),
        }
    }

    pub fn transport_error() -> Self {
        Self {
            status: HTTP_TRANSPORT_ERROR,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HTTP_OK
    }

    /// Body as text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs blocking HTTP transfers. Called from worker threads only.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> HttpResponse;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync,
{
    fn execute(&self, request: &HttpRequest) -> HttpResponse {
        self(request)
    }
}
