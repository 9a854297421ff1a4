//! Reconstruction of the outgoing request after signing.

use ureq::http::Method;

use crate::error::SigningError;
use crate::params::{ParameterOrigin, ParameterSet, decode_form, is_reserved};
use crate::signature::{OAUTH_SIGNATURE, TargetUrl, oauth_encode};

/// Request handed to the transport. Built once, sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    url: String,
    method: Method,
    headers: Option<String>,
    body: Option<String>,
}

impl SignedRequest {
    /// Request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: None,
            body: None,
        }
    }

    /// Attach a raw header block (`Name: value` lines).
    #[must_use]
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Attach a request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> Option<&str> {
        self.headers.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Rebuild the request around a signed parameter set.
///
/// GET puts every signed parameter in the query. POST puts body-origin
/// parameters in a form body and everything else in the query. In both cases
/// `oauth_signature` is added to the query and query pairs of the original URL
/// that were not signed (stripped control parameters, say) are re-appended.
/// Pairs under a reserved prefix are never re-appended; only the signer sets
/// those.
pub fn rebuild(
    original_url: &str,
    method: &Method,
    params: &ParameterSet,
    signature: &str,
) -> Result<SignedRequest, SigningError> {
    let target = TargetUrl::parse(original_url)?;
    let body_split = method.as_str().eq_ignore_ascii_case(Method::POST.as_str());

    let mut query = Vec::new();
    let mut body = Vec::new();
    for param in params {
        let pair = encode_pair(&param.name, &param.value);
        if body_split && param.origin == ParameterOrigin::Body {
            body.push(pair);
        } else {
            query.push(pair);
        }
    }
    query.push(encode_pair(OAUTH_SIGNATURE, signature));

    // Unsigned original query parameters survive, except forged signer ones
    if let Some(original) = target.query() {
        for (name, value) in decode_form(original) {
            if is_reserved(&name) {
                continue;
            }
            let signed = params.iter().any(|param| {
                param.origin == ParameterOrigin::Query && param.name == name && param.value == value
            });
            if !signed {
                query.push(encode_pair(&name, &value));
            }
        }
    }

    let url = format!("{}?{}", target.without_query(), query.join("&"));
    let request = SignedRequest::new(method.clone(), url);

    Ok(if body_split {
        request.with_body(body.join("&"))
    } else {
        request
    })
}

fn encode_pair(name: &str, value: &str) -> String {
    format!("{}={}", oauth_encode(name), oauth_encode(value))
}
