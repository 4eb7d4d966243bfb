//! Outgoing HTTP response type.
//!
//! Build a [`Response`] in your handler and return it. Serialization
//! failures surface as errors, so the usual handler tail is:
//!
//! ```rust
//! use strut::{Response, StatusCode};
//! # use strut::Error;
//! # #[derive(serde::Serialize)] struct User { id: u32 }
//! # fn demo(user: User) -> Result<Response, Error> {
//! Response::json(StatusCode::OK, &user)
//! # }
//! ```

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;

/// An outgoing HTTP response.
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// A JSON response with the given status.
    ///
    /// This is the one conversion point from domain payloads to wire bytes —
    /// a serializer failure here is an untrusted error like any other.
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(data).map_err(Error::untrusted)?;
        Ok(Self {
            status,
            headers: vec![("content-type".to_owned(), "application/json".to_owned())],
            body,
        })
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type".to_owned(), "text/plain; charset=utf-8".to_owned())],
            body: body.into().into_bytes(),
        }
    }

    /// A response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, headers: Vec::new(), body: Vec::new() }
    }

    /// Builder for responses that need extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: Vec::new() }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        match builder.body(Full::new(Bytes::from(self.body))) {
            Ok(response) => response,
            Err(_) => {
                // A handler smuggled an invalid header name/value. The body
                // is already spoken for; all we can do is fail the request.
                let mut response = http::Response::new(Full::new(Bytes::new()));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Obtain via [`Response::builder()`];
/// defaults to `200 OK`. Terminated by a body method.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body.
    pub fn json<T: Serialize>(self, data: &T) -> Result<Response, Error> {
        let body = serde_json::to_vec(data).map_err(Error::untrusted)?;
        let mut headers =
            vec![("content-type".to_owned(), "application/json".to_owned())];
        headers.extend(self.headers);
        Ok(Response { status: self.status, headers, body })
    }

    /// Terminate with a plain-text body.
    pub fn text(self, body: impl Into<String>) -> Response {
        let mut headers =
            vec![("content-type".to_owned(), "text/plain; charset=utf-8".to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body: body.into().into_bytes() }
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Vec::new() }
    }
}
