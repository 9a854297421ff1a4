//! Signed fetch orchestration.

use ureq::http::Method;

use crate::error::{FetchError, SigningError};
use crate::key::KeyMaterial;
use crate::nonce::{NonceSource, RandomNonceSource};
use crate::params::{Canonicalizer, SignerContext, SigningIdentity, SigningOptions, decode_form};
use crate::rebuild::{SignedRequest, rebuild};
use crate::signature::{RsaSha1, SignatureMethod, TargetUrl, sign_parameters};

/// Transport that executes requests. Signing never performs I/O itself.
pub trait RemoteContentFetcher {
    /// Successful transport result.
    type Response;
    /// Transport failure.
    type Error: std::error::Error + 'static;

    /// Send one request.
    fn fetch_request(&self, request: SignedRequest) -> Result<Self::Response, Self::Error>;

    /// Send several requests; results are in input order.
    fn multi_fetch_request(
        &self,
        requests: Vec<SignedRequest>,
    ) -> Vec<Result<Self::Response, Self::Error>> {
        requests
            .into_iter()
            .map(|request| self.fetch_request(request))
            .collect()
    }
}

/// Unsigned request as received by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute target URL; its query parameters are signed too.
    pub url: String,
    /// GET or POST.
    pub method: Method,
    /// Proxy query parameters.
    pub query_params: Vec<(String, String)>,
    /// Proxy form body parameters; a `postData` field is unpacked.
    pub body_params: Vec<(String, String)>,
    /// Raw header block forwarded on POST; dropped on GET.
    pub headers: Option<String>,
    pub options: SigningOptions,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            query_params: Vec::new(),
            body_params: Vec::new(),
            headers: None,
            options: SigningOptions::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body_params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SigningOptions) -> Self {
        self.options = options;
        self
    }
}

/// Signs requests with the container key and hands them to a transport.
///
/// All methods take `&self`; one fetcher can serve many threads at once.
pub struct SigningFetcher<F> {
    transport: F,
    canonicalizer: Canonicalizer,
    key_name: Option<String>,
    signature_method: Box<dyn SignatureMethod>,
    nonce_source: Box<dyn NonceSource>,
}

impl<F> SigningFetcher<F> {
    /// RSA-SHA1 fetcher over `transport`.
    pub fn new(transport: F, key: &KeyMaterial) -> Self {
        Self {
            transport,
            canonicalizer: Canonicalizer::new(),
            key_name: key.key_name().map(str::to_owned),
            signature_method: Box::new(RsaSha1::new(key.private_key())),
            nonce_source: Box::new(RandomNonceSource),
        }
    }

    #[must_use]
    pub fn with_canonicalizer(mut self, canonicalizer: Canonicalizer) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    #[must_use]
    pub fn with_signature_method(mut self, method: impl SignatureMethod + 'static) -> Self {
        self.signature_method = Box::new(method);
        self
    }

    #[must_use]
    pub fn with_nonce_source(mut self, source: impl NonceSource + 'static) -> Self {
        self.nonce_source = Box::new(source);
        self
    }

    pub fn transport(&self) -> &F {
        &self.transport
    }

    /// Turn an unsigned request into a signed one without sending it.
    pub fn sign(
        &self,
        request: &FetchRequest,
        identity: &SigningIdentity,
    ) -> Result<SignedRequest, SigningError> {
        let method = normalize_method(&request.method)?;

        let target = TargetUrl::parse(&request.url)?;
        let mut query = target.query().map(decode_form).unwrap_or_default();
        let url_pairs = query.len();
        for pair in &request.query_params {
            if !query[..url_pairs].contains(pair) {
                query.push(pair.clone());
            }
        }

        let context = SignerContext {
            identity,
            options: request.options,
            key_name: self.key_name.as_deref(),
            nonce: self.nonce_source.nonce(),
            timestamp: self.nonce_source.timestamp()?,
            signature_method: self.signature_method.name(),
        };
        let params = self
            .canonicalizer
            .canonicalize(&query, &request.body_params, &context);

        let signature = sign_parameters(
            &method,
            &request.url,
            &params,
            self.signature_method.as_ref(),
        )?;
        let signed = rebuild(&request.url, &method, &params, &signature)?;

        tracing::debug!(
            method = %method,
            url = %target.without_query(),
            params = params.len(),
            "Signed request"
        );

        Ok(match request.headers {
            Some(ref headers) if method == Method::POST => signed.with_headers(headers.as_str()),
            Some(_) => {
                tracing::debug!(url = %request.url, "Dropping headers on GET request");
                signed
            }
            None => signed,
        })
    }
}

/// Map GET and POST, in any case, to their standard methods.
fn normalize_method(method: &Method) -> Result<Method, SigningError> {
    let name = method.as_str();
    if name.eq_ignore_ascii_case(Method::GET.as_str()) {
        Ok(Method::GET)
    } else if name.eq_ignore_ascii_case(Method::POST.as_str()) {
        Ok(Method::POST)
    } else {
        Err(SigningError::UnsupportedMethod(name.to_owned()))
    }
}

impl<F: RemoteContentFetcher> SigningFetcher<F> {
    /// Sign `request` and send it.
    ///
    /// Nothing is sent when signing fails. Transport errors are returned as
    /// [`FetchError::Transport`] without retrying.
    pub fn fetch(
        &self,
        request: &FetchRequest,
        identity: &SigningIdentity,
    ) -> Result<F::Response, FetchError<F::Error>> {
        let signed = self.sign(request, identity).inspect_err(|err| {
            tracing::warn!(url = %request.url, error = %err, "Failed to sign request");
        })?;
        self.transport
            .fetch_request(signed)
            .map_err(FetchError::Transport)
    }

    /// Send a request as-is, without signing.
    pub fn fetch_request(&self, request: SignedRequest) -> Result<F::Response, F::Error> {
        self.transport.fetch_request(request)
    }

    /// Send several requests as-is, without signing.
    pub fn multi_fetch_request(
        &self,
        requests: Vec<SignedRequest>,
    ) -> Vec<Result<F::Response, F::Error>> {
        self.transport.multi_fetch_request(requests)
    }
}
