use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use url::Url;

use crate::crypto::csrf::generate_nonce;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters pass through, everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Builds the signature base string: `METHOD&enc(base_url)&enc(sorted params)`.
///
/// Query parameters already present on `url` are folded into `params`.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url.as_str()),
        encode(&normalized)
    )
}

/// HMAC-SHA1 over `base` keyed with `enc(consumer_secret)&enc(token_secret)`, base64.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Signs requests on behalf of one consumer and, optionally, one token.
pub struct OAuth1Signer<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: &'a str,
}

impl<'a> OAuth1Signer<'a> {
    pub fn consumer(consumer_key: &'a str, consumer_secret: &'a str) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            token: None,
            token_secret: "",
        }
    }

    pub fn with_token(mut self, token: &'a str, token_secret: &'a str) -> Self {
        self.token = Some(token);
        self.token_secret = token_secret;
        self
    }

    /// The `Authorization` header value for one request.
    ///
    /// `body_params` are the form-encoded body fields (if any); `extra` are
    /// additional protocol parameters such as `oauth_callback` or `oauth_verifier`.
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        body_params: &[(String, String)],
        extra: &[(&str, &str)],
    ) -> String {
        self.authorization_with(
            method,
            url,
            body_params,
            extra,
            &generate_nonce(),
            chrono::Utc::now().timestamp(),
        )
    }

    fn authorization_with(
        &self,
        method: &str,
        url: &Url,
        body_params: &[(String, String)],
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut oauth: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.into()),
            ("oauth_nonce".into(), nonce.into()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_version".into(), "1.0".into()),
        ];
        if let Some(token) = self.token {
            oauth.push(("oauth_token".into(), token.into()));
        }
        oauth.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let mut all = oauth.clone();
        all.extend(body_params.iter().cloned());
        let base = signature_base_string(method, url, &all);
        let signature = sign(&base, self.consumer_secret, self.token_secret);

        oauth.push(("oauth_signature".into(), signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}
