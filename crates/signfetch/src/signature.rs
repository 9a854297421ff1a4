//! OAuth 1.0 signature generation (RFC 5849).

use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;
use ureq::http::{Method, Uri};

use crate::error::SigningError;
use crate::params::ParameterSet;

/// Name of the signature parameter, never part of the base string.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";

/// OAuth unreserved characters: A-Z a-z 0-9 - . _ ~
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode string per RFC 3986.
pub(crate) fn oauth_encode(input: &str) -> String {
    percent_encode(input.as_bytes(), OAUTH_ENCODE_SET).to_string()
}

/// Strategy for turning a signature base string into `oauth_signature`.
pub trait SignatureMethod: Send + Sync {
    /// Value of `oauth_signature_method`.
    fn name(&self) -> &'static str;

    /// Sign `base_string`, returning the encoded signature.
    fn sign(&self, base_string: &str) -> Result<String, SigningError>;
}

/// RSASSA-PKCS1-v1_5 over SHA-1, base64 output.
pub struct RsaSha1 {
    signing_key: SigningKey<Sha1>,
}

impl RsaSha1 {
    /// Value of `oauth_signature_method`.
    pub const NAME: &'static str = "RSA-SHA1";

    /// Prepare a signer for `private_key`.
    pub fn new(private_key: &RsaPrivateKey) -> Self {
        Self {
            signing_key: SigningKey::<Sha1>::new(private_key.clone()),
        }
    }
}

impl SignatureMethod for RsaSha1 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sign(&self, base_string: &str) -> Result<String, SigningError> {
        let signature = self
            .signing_key
            .try_sign(base_string.as_bytes())
            .map_err(SigningError::Signature)?;
        Ok(BASE64_STANDARD.encode(signature.to_bytes()))
    }
}

impl fmt::Debug for RsaSha1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RsaSha1")
    }
}

/// Absolute http(s) URL split into the parts signing needs.
#[derive(Debug)]
pub(crate) struct TargetUrl {
    uri: Uri,
}

impl TargetUrl {
    pub(crate) fn parse(url: &str) -> Result<Self, SigningError> {
        let invalid = |reason: &str| SigningError::InvalidUrl {
            url: url.to_owned(),
            reason: reason.to_owned(),
        };

        let uri: Uri = url.parse().map_err(|e: ureq::http::uri::InvalidUri| {
            SigningError::InvalidUrl {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        })?;

        let scheme = uri.scheme_str().ok_or_else(|| invalid("missing scheme"))?;
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(invalid("scheme must be http or https"));
        }
        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(Self { uri })
    }

    /// Base string URI (RFC 5849 Section 3.4.1.2).
    ///
    /// Lower-cased scheme and host, default port removed, no query.
    pub(crate) fn normalized(&self) -> String {
        let scheme = self.uri.scheme_str().unwrap_or("http").to_ascii_lowercase();
        let host = self.uri.host().unwrap_or_default().to_ascii_lowercase();
        let port = self.uri.port_u16().filter(|port| {
            !matches!((scheme.as_str(), port), ("http", 80) | ("https", 443))
        });

        match port {
            Some(port) => format!("{scheme}://{host}:{port}{}", self.path()),
            None => format!("{scheme}://{host}{}", self.path()),
        }
    }

    /// Scheme, authority and path as given, without query or fragment.
    pub(crate) fn without_query(&self) -> String {
        let scheme = self.uri.scheme_str().unwrap_or("http");
        let authority = self.uri.authority().map_or("", |a| a.as_str());
        format!("{scheme}://{authority}{}", self.path())
    }

    /// Raw query string, if any.
    pub(crate) fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    fn path(&self) -> &str {
        match self.uri.path() {
            "" => "/",
            path => path,
        }
    }
}

/// Build OAuth signature base string per RFC 5849 Section 3.4.1.
///
/// Format: `HTTP_METHOD&encoded_base_url&encoded_parameters`
///
/// Parameters are encoded, then sorted by name and value; `oauth_signature`
/// is skipped.
pub fn signature_base_string(
    method: &Method,
    url: &str,
    params: &ParameterSet,
) -> Result<String, SigningError> {
    let target = TargetUrl::parse(url)?;

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|param| param.name != OAUTH_SIGNATURE)
        .map(|param| (oauth_encode(&param.name), oauth_encode(&param.value)))
        .collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.as_str().to_uppercase(),
        oauth_encode(&target.normalized()),
        oauth_encode(&param_string)
    ))
}

/// Compute `oauth_signature` for a canonicalized parameter set.
pub fn sign_parameters(
    method: &Method,
    url: &str,
    params: &ParameterSet,
    signer: &dyn SignatureMethod,
) -> Result<String, SigningError> {
    let base_string = signature_base_string(method, url, params)?;
    tracing::trace!(%base_string, "Signature base string");
    signer.sign(&base_string)
}
