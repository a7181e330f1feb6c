//! Request signing: expiry policy, parameter digest and query-string encoding.
//!
//! The remote API authenticates a GET by an MD5 digest over the sorted
//! `key=value` pairs followed by the account secret. MD5 is the service's
//! contract, not a choice made here.

use crate::config::Credentials;
use crate::error::SignError;
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

pub const API_KEY_PARAM: &str = "api_key";
pub const EXPIRE_PARAM: &str = "expire";
pub const SIG_PARAM: &str = "sig";

/// Scalar query-parameter value. `Display` is the single stringification rule
/// used for both the digest and the encoded query.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{n}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self { ParamValue::Str(s.to_string()) }
}
impl From<String> for ParamValue {
    fn from(s: String) -> Self { ParamValue::Str(s) }
}
impl From<i64> for ParamValue {
    fn from(n: i64) -> Self { ParamValue::Int(n) }
}
impl From<u32> for ParamValue {
    fn from(n: u32) -> Self { ParamValue::Int(i64::from(n)) }
}
impl From<f64> for ParamValue {
    fn from(x: f64) -> Self { ParamValue::Float(x) }
}
impl From<bool> for ParamValue {
    fn from(b: bool) -> Self { ParamValue::Bool(b) }
}

/// Query parameters, always iterated in byte-wise key order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        f.write_str("{")?;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

/// How long a signed request stays valid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpiryPolicy {
    /// Scale the validity window with the number of days requested.
    pub scale: bool,
    pub seconds_per_day: f64,
    pub unscaled_seconds: i64,
    pub min_scaled_seconds: i64,
    pub max_scaled_seconds: i64,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            scale: false,
            seconds_per_day: 1.0,
            unscaled_seconds: 60,
            min_scaled_seconds: 30,
            max_scaled_seconds: 180,
        }
    }
}

impl ExpiryPolicy {
    /// Seconds of validity for a request spanning `window_days`.
    pub fn compute_expiry_seconds(&self, window_days: u32) -> i64 {
        if !self.scale {
            return self.unscaled_seconds;
        }
        let raw = self.seconds_per_day * f64::from(window_days);
        // max-then-min: an inverted [min, max] resolves to max instead of panicking.
        let bounded = raw.max(self.min_scaled_seconds as f64).min(self.max_scaled_seconds as f64);
        bounded.round() as i64
    }
}

/// Parameters after signing: the caller's set plus `api_key`, `expire` and the signature.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedQuery {
    params: QueryParams,
    signature: String,
}

impl SignedQuery {
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn expire(&self) -> Option<&ParamValue> {
        self.params.get(EXPIRE_PARAM)
    }

    /// Form-urlencoded query: every parameter in key order, `sig` last.
    pub fn to_query_string(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.params.iter() {
            ser.append_pair(k, &v.to_string());
        }
        ser.append_pair(SIG_PARAM, &self.signature);
        ser.finish()
    }
}

impl fmt::Display for SignedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

pub struct RequestSigner {
    credentials: Credentials,
    expiry: ExpiryPolicy,
}

impl RequestSigner {
    pub fn new(credentials: Credentials, expiry: ExpiryPolicy) -> Self {
        Self { credentials, expiry }
    }

    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    /// Absolute `expire` timestamp for a request issued at `now`.
    pub fn expire_at(&self, now: OffsetDateTime, window_days: u32) -> i64 {
        now.unix_timestamp() + self.expiry.compute_expiry_seconds(window_days)
    }

    /// Sign `params` for `resource`. An `expire` already present is kept as-is;
    /// otherwise one is derived from `now` and `window_days`.
    pub fn sign(
        &self,
        resource: &str,
        params: &QueryParams,
        window_days: u32,
        now: OffsetDateTime,
    ) -> Result<SignedQuery, SignError> {
        for reserved in [API_KEY_PARAM, SIG_PARAM] {
            if params.contains_key(reserved) {
                return Err(SignError::ReservedParameter(reserved.to_string()));
            }
        }

        let mut signed = params.clone();
        if !signed.contains_key(EXPIRE_PARAM) {
            let seconds = self.expiry.compute_expiry_seconds(window_days);
            tracing::debug!(resource, seconds, "using request expiry");
            signed.insert(EXPIRE_PARAM, now.unix_timestamp() + seconds);
        }
        signed.insert(API_KEY_PARAM, self.credentials.api_key());

        let signature = signature_digest(&signed, self.credentials.api_secret());
        Ok(SignedQuery { params: signed, signature })
    }
}

/// Lowercase hex MD5 of `k1=v1k2=v2...` (key order, no separators) followed by `secret`.
pub fn signature_digest(params: &QueryParams, secret: &str) -> String {
    let mut hasher = Md5::new();
    for (k, v) in params.iter() {
        if k == SIG_PARAM {
            continue;
        }
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.to_string().as_bytes());
    }
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
