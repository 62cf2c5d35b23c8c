use serde_json::Value;
use vercel_runtime::{Body, Error, Request, Response};

/// Sent on every response, including preflight and errors.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

/// Status and body of a handler result, independent of the hosting runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let mut builder = Response::builder().status(self.status);
        for (name, value) in CORS_HEADERS {
            builder = builder.header(name, value);
        }
        let resp = match self.body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::Text(body.to_string()))?,
            None => builder.body(Body::Empty)?,
        };
        Ok(resp)
    }
}

/// Raw bytes of an incoming request body.
pub fn body_bytes(req: &Request) -> &[u8] {
    match req.body() {
        Body::Empty => &[][..],
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes.as_slice(),
    }
}
