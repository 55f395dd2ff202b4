use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HMAC computation failed: {0}")]
    HmacError(String),
}

/// Exchange API credentials.
#[derive(Clone)]
pub struct ExchangeAuth {
    pub api_key: String,
    secret_key: String,
}

impl std::fmt::Debug for ExchangeAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeAuth")
            .field("api_key", &self.api_key)
            .field("secret_key", &"***")
            .finish()
    }
}

impl ExchangeAuth {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }

    /// HMAC-SHA256 over the `k=v&k=v` string of params sorted by key,
    /// hex-encoded lowercase.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| AuthError::HmacError(e.to_string()))?;
        mac.update(query_string(params).as_bytes());
        let digest = mac.finalize().into_bytes();

        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Add `api_key`, `timestamp` and the resulting `sign` to `params` and
    /// return the encoded body ready to send.
    pub fn signed_body(
        &self,
        mut params: BTreeMap<String, String>,
        timestamp_ms: i64,
    ) -> Result<String, AuthError> {
        params.insert("api_key".into(), self.api_key.clone());
        params.insert("signature_method".into(), "HmacSHA256".into());
        params.insert("timestamp".into(), timestamp_ms.to_string());
        let sign = self.sign(&params)?;
        params.insert("sign".into(), sign);
        Ok(query_string(&params))
    }
}

/// `k=v` pairs joined by `&`, in key order.
pub fn query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sign_is_order_independent_hex() {
        let auth = ExchangeAuth::new("key".into(), "secret".into());
        let a = auth
            .sign(&params(&[("symbol", "btc_usdt"), ("amount", "1")]))
            .unwrap();
        let b = auth
            .sign(&params(&[("amount", "1"), ("symbol", "btc_usdt")]))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn sign_is_hmac_over_query_string() {
        let auth = ExchangeAuth::new("k".into(), "Jefe".into());
        let mut mac = HmacSha256::new_from_slice(b"Jefe").unwrap();
        mac.update(b"a=what do ya want for nothing?");
        let expected: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        let sig = auth
            .sign(&params(&[("a", "what do ya want for nothing?")]))
            .unwrap();
        assert_eq!(sig, expected);
    }

    #[test]
    fn signed_body_carries_key_and_signature() {
        let auth = ExchangeAuth::new("my-key".into(), "s3cret".into());
        let body = auth
            .signed_body(params(&[("symbol", "eth_usdt")]), 1_700_000_000_000)
            .unwrap();

        assert!(body.starts_with("api_key=my-key&"));
        assert!(body.contains("&timestamp=1700000000000"));
        assert!(body.contains("&sign="));
        assert!(!body.contains("s3cret"));
    }
}
