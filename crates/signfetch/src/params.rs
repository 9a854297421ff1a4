//! Parameter canonicalization for signed fetch.
//!
//! Client-supplied parameters are filtered before signing: proxy control
//! parameters and anything under a reserved prefix (`oauth`, `xoauth`,
//! `opensocial`) are dropped, as are names outside `[A-Za-z0-9_-]`. The
//! signer then appends its own identity and OAuth parameters, so every
//! reserved-prefix entry in the result was produced by the signer.
//!
//! Dropped parameters are not an error; they are logged at `trace` level.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;

/// Proxy control parameters that never take part in the signature.
pub const DEFAULT_DENIED_PARAMS: &[&str] = &[
    "output",
    "httpmethod",
    "authz",
    "st",
    "headers",
    "url",
    "contenttype",
    "postdata",
    "numentries",
    "getsummaries",
    "signowner",
    "signviewer",
    "gadget",
    "bypassspeccache",
];

/// Prefixes reserved for signer-generated parameters.
pub const RESERVED_PREFIXES: &[&str] = &["oauth", "xoauth", "opensocial"];

/// Body field carrying a pre-encoded form string.
const POST_DATA_PARAM: &str = "postdata";

pub const OPENSOCIAL_OWNER_ID: &str = "opensocial_owner_id";
pub const OPENSOCIAL_VIEWER_ID: &str = "opensocial_viewer_id";
pub const OPENSOCIAL_APP_ID: &str = "opensocial_app_id";
pub const OAUTH_TOKEN: &str = "oauth_token";
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub const XOAUTH_PUBLIC_KEY: &str = "xoauth_signature_publickey";
pub const OAUTH_NONCE: &str = "oauth_nonce";
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub const OAUTH_VERSION: &str = "oauth_version";

/// Identity asserted to the target service, taken from a verified security token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Gadget owner.
    pub owner_id: Option<String>,
    /// Current viewer.
    pub viewer_id: Option<String>,
    /// Gadget application id.
    pub app_id: Option<String>,
    /// Container domain, sent as `oauth_consumer_key`.
    pub domain: Option<String>,
}

impl SigningIdentity {
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    #[must_use]
    pub fn with_viewer(mut self, viewer_id: impl Into<String>) -> Self {
        self.viewer_id = Some(viewer_id.into());
        self
    }

    #[must_use]
    pub fn with_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Per-request switches for identity assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningOptions {
    /// Append `opensocial_owner_id`.
    pub sign_owner: bool,
    /// Append `opensocial_viewer_id`.
    pub sign_viewer: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            sign_owner: true,
            sign_viewer: true,
        }
    }
}

/// Where a parameter came from; decides its place in the rebuilt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterOrigin {
    /// Target URL query or proxy query parameters.
    Query,
    /// Form body, including pairs unpacked from `postData`.
    Body,
    /// Added by the signer.
    Signer,
}

/// A single name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub origin: ParameterOrigin,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, origin: ParameterOrigin) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            origin,
        }
    }
}

/// Ordered parameters; repeated names are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: Parameter) {
        self.entries.push(param);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.entries.iter()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|param| param.name == name)
            .map(|param| param.value.as_str())
    }

    /// All values stored under `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |param| param.name == name)
            .map(|param| param.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Values the signer contributes to one request.
#[derive(Debug)]
pub struct SignerContext<'a> {
    pub identity: &'a SigningIdentity,
    pub options: SigningOptions,
    /// Public certificate URL (`xoauth_signature_publickey`).
    pub key_name: Option<&'a str>,
    pub nonce: String,
    pub timestamp: u64,
    /// Value of `oauth_signature_method`.
    pub signature_method: &'static str,
}

/// Filters client parameters and appends the signer's own.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    denied: HashSet<String>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self {
            denied: DEFAULT_DENIED_PARAMS.iter().map(|&name| name.to_owned()).collect(),
        }
    }
}

impl Canonicalizer {
    /// Canonicalizer with the built-in deny table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the deny table (case-insensitive).
    #[must_use]
    pub fn with_denied<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denied
            .extend(names.into_iter().map(|name| name.as_ref().to_ascii_lowercase()));
        self
    }

    /// Whether a client-supplied parameter may take part in the signature.
    pub fn is_allowed(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        if self.denied.contains(&lower) {
            return false;
        }
        if is_reserved(&lower) {
            return false;
        }
        is_valid_name(name)
    }

    /// Build the parameter set that gets signed.
    ///
    /// Query parameters come first, then body parameters (with any `postData`
    /// field unpacked in place), then identity parameters, then OAuth parameters.
    pub fn canonicalize(
        &self,
        query: &[(String, String)],
        body: &[(String, String)],
        context: &SignerContext<'_>,
    ) -> ParameterSet {
        let mut params = ParameterSet::new();

        for (name, value) in query {
            self.push_client(&mut params, name, value, ParameterOrigin::Query);
        }

        for (name, value) in body {
            if name.eq_ignore_ascii_case(POST_DATA_PARAM) {
                for (name, value) in decode_form(value) {
                    self.push_client(&mut params, &name, &value, ParameterOrigin::Body);
                }
            } else {
                self.push_client(&mut params, name, value, ParameterOrigin::Body);
            }
        }

        push_identity(&mut params, context);
        push_oauth(&mut params, context);

        params
    }

    fn push_client(&self, params: &mut ParameterSet, name: &str, value: &str, origin: ParameterOrigin) {
        if self.is_allowed(name) {
            params.push(Parameter::new(name, value, origin));
        } else {
            tracing::trace!(name, ?origin, "Dropping parameter before signing");
        }
    }
}

fn push_identity(params: &mut ParameterSet, context: &SignerContext<'_>) {
    let identity = context.identity;
    let mut push = |name: &str, value: Option<&String>| {
        if let Some(value) = value {
            params.push(Parameter::new(name, value.as_str(), ParameterOrigin::Signer));
        }
    };

    if context.options.sign_owner {
        push(OPENSOCIAL_OWNER_ID, identity.owner_id.as_ref());
    }
    if context.options.sign_viewer {
        push(OPENSOCIAL_VIEWER_ID, identity.viewer_id.as_ref());
    }
    push(OPENSOCIAL_APP_ID, identity.app_id.as_ref());
}

fn push_oauth(params: &mut ParameterSet, context: &SignerContext<'_>) {
    let signer = |name: &str, value: &str| Parameter::new(name, value, ParameterOrigin::Signer);

    // Signed fetch carries no user token
    params.push(signer(OAUTH_TOKEN, ""));
    if let Some(ref domain) = context.identity.domain {
        params.push(signer(OAUTH_CONSUMER_KEY, domain));
    }
    if let Some(key_name) = context.key_name {
        params.push(signer(XOAUTH_PUBLIC_KEY, key_name));
    }
    params.push(signer(OAUTH_NONCE, &context.nonce));
    params.push(signer(OAUTH_TIMESTAMP, &context.timestamp.to_string()));
    params.push(signer(OAUTH_SIGNATURE_METHOD, context.signature_method));
    params.push(signer(OAUTH_VERSION, "1.0"));
}

/// ASCII letters, digits, `_` and `-`; at least one character.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Whether `name` falls under a prefix only the signer may set.
pub(crate) fn is_reserved(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Parse an `application/x-www-form-urlencoded` string.
///
/// `+` decodes to a space; a pair without `=` gets an empty value; empty
/// segments are skipped.
pub fn decode_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(input: &str) -> String {
    let input = input.replace('+', " ");
    percent_decode_str(&input).decode_utf8_lossy().into_owned()
}
