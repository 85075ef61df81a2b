// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use bcesign_core::hash::hex_hmac_sha256;
use bcesign_core::time::{format_iso8601, now, parse_iso8601, truncate_to_seconds, DateTime};
use bcesign_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::header::{AUTHORIZATION, HOST};
use http::HeaderValue;
use log::debug;

use crate::canonical::CanonicalRequest;
use crate::constants::*;
use crate::credential::Credential;

/// SigningTimeWindow is the period a signature stays valid in:
/// `[timestamp, timestamp + expires_in)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningTimeWindow {
    timestamp: DateTime,
    expires_in: u64,
    expires_at: DateTime,
}

impl SigningTimeWindow {
    /// Create a new window starting at `timestamp`, truncated to whole seconds.
    ///
    /// `expires_in` is in seconds and must be at least 1.
    pub fn new(timestamp: DateTime, expires_in: u64) -> Result<Self> {
        if expires_in == 0 {
            return Err(Error::config_invalid("signature expiration must be at least 1 second"));
        }

        let timestamp = truncate_to_seconds(timestamp);
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|delta| timestamp.checked_add_signed(delta))
            .ok_or_else(|| {
                Error::config_invalid("signature expiration is out of range")
                    .with_context("expires_in", expires_in.to_string())
            })?;

        Ok(Self {
            timestamp,
            expires_in,
            expires_at,
        })
    }

    /// Start of the window.
    pub fn timestamp(&self) -> DateTime {
        self.timestamp
    }

    /// Length of the window in seconds.
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// First instant the signature is no longer valid.
    pub fn expires_at(&self) -> DateTime {
        self.expires_at
    }

    /// Check if the instant falls inside this window.
    pub fn contains(&self, instant: DateTime) -> bool {
        self.timestamp <= instant && instant < self.expires_at()
    }
}

/// AuthorizationToken is the bce auth v1 authorization string.
///
/// ```text
/// bce-auth-v1/{accessKeyId}/{timestamp}/{expirationInSeconds}/{signedHeaders}/{signature}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    /// Access key id that signed the request.
    pub access_key_id: String,
    /// Signing time.
    pub timestamp: DateTime,
    /// Seconds the signature stays valid.
    pub expires_in: u64,
    /// Lower cased signed header names, sorted.
    pub signed_headers: Vec<String>,
    /// Hex encoded signature.
    pub signature: String,
}

impl AuthorizationToken {
    /// The `bce-auth-v1/{ak}/{timestamp}/{expires}` prefix, which is also
    /// the input of the signing key.
    pub fn auth_string_prefix(&self) -> String {
        auth_string_prefix(&self.access_key_id, self.timestamp, self.expires_in)
    }

    /// The time window this token is valid in.
    pub fn window(&self) -> Result<SigningTimeWindow> {
        SigningTimeWindow::new(self.timestamp, self.expires_in)
    }

    /// Recompute the signature for the canonical request and compare.
    pub fn verify(&self, cred: &Credential, creq: &CanonicalRequest) -> bool {
        if cred.access_key_id != self.access_key_id {
            return false;
        }

        let signing_key = hex_hmac_sha256(
            cred.secret_access_key.as_bytes(),
            self.auth_string_prefix().as_bytes(),
        );
        let signature = hex_hmac_sha256(signing_key.as_bytes(), creq.to_string().as_bytes());
        signature == self.signature
    }
}

impl Display for AuthorizationToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.auth_string_prefix(),
            self.signed_headers.join(";"),
            self.signature
        )
    }
}

impl FromStr for AuthorizationToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |msg: &str| Error::request_invalid(msg.to_string()).with_context("token", s);

        let fields: Vec<&str> = s.split('/').collect();
        let [version, ak, timestamp, expires_in, signed_headers, signature] = fields[..] else {
            return Err(invalid("authorization token must have 6 fields"));
        };
        if version != BCE_AUTH_VERSION {
            return Err(invalid("unsupported authorization version"));
        }
        if ak.is_empty() || signature.is_empty() {
            return Err(invalid("authorization token has empty fields"));
        }

        Ok(Self {
            access_key_id: ak.to_string(),
            timestamp: parse_iso8601(timestamp)?,
            expires_in: expires_in
                .parse()
                .map_err(|e| invalid("expiration is not a number").with_source(e))?,
            signed_headers: signed_headers
                .split(';')
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .collect(),
            signature: signature.to_string(),
        })
    }
}

fn auth_string_prefix(ak: &str, timestamp: DateTime, expires_in: u64) -> String {
    format!(
        "{BCE_AUTH_VERSION}/{ak}/{}/{expires_in}",
        format_iso8601(timestamp)
    )
}

/// Sign a canonical request.
///
/// This is a pure function: the same credential, canonical request and
/// window always produce the same token.
pub fn sign(
    cred: &Credential,
    creq: &CanonicalRequest,
    window: &SigningTimeWindow,
) -> Result<AuthorizationToken> {
    if cred.access_key_id.is_empty() {
        return Err(Error::config_invalid("access key id must not be empty"));
    }
    if cred.secret_access_key.is_empty() {
        return Err(Error::config_invalid("secret access key must not be empty"));
    }

    let prefix = auth_string_prefix(&cred.access_key_id, window.timestamp, window.expires_in);
    let signing_key = hex_hmac_sha256(cred.secret_access_key.as_bytes(), prefix.as_bytes());

    let canonical = creq.to_string();
    debug!("calculated canonical request: {canonical}");
    let signature = hex_hmac_sha256(signing_key.as_bytes(), canonical.as_bytes());

    Ok(AuthorizationToken {
        access_key_id: cred.access_key_id.clone(),
        timestamp: window.timestamp,
        expires_in: window.expires_in,
        signed_headers: creq
            .signed_headers()
            .into_iter()
            .map(|v| v.to_string())
            .collect(),
        signature,
    })
}

/// RequestSigner that implements bce auth v1.
///
/// - [Authentication mechanism](https://cloud.baidu.com/doc/Reference/s/Njwvz1wot)
#[derive(Debug)]
pub struct RequestSigner {
    expires_in: u64,
    signed_headers: Option<Vec<String>>,
    time: Option<DateTime>,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSigner {
    /// Create a new signer which expires signatures after 1800 seconds.
    pub fn new() -> Self {
        Self {
            expires_in: DEFAULT_EXPIRATION_IN_SECONDS,
            signed_headers: None,
            time: None,
        }
    }

    /// Set how long a header signature stays valid.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in.as_secs();
        self
    }

    /// Sign exactly these headers instead of the default set.
    pub fn with_signed_headers(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.signed_headers = Some(
            names
                .into_iter()
                .map(|v| Into::<String>::into(v).trim().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait::async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        parts: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let k = credential.ok_or_else(|| Error::credential_invalid("missing credential"))?;
        let now = self.time.unwrap_or_else(now);

        let mut req = SigningRequest::build(parts)?;
        if !req.headers.contains_key(HOST) {
            let host = HeaderValue::from_str(req.authority.as_str())?;
            req.headers.insert(HOST, host);
        }

        match expires_in {
            None => {
                req.headers.insert(X_BCE_DATE, format_iso8601(now).parse()?);
                if let Some(token) = &k.session_token {
                    let mut value: HeaderValue = token.parse()?;
                    value.set_sensitive(true);
                    req.headers.insert(X_BCE_SECURITY_TOKEN, value);
                }

                let window = SigningTimeWindow::new(now, self.expires_in)?;
                let creq =
                    CanonicalRequest::from_signing_request(&req, self.signed_headers.as_deref())?;
                let token = sign(k, &creq, &window)?;

                req.headers.insert(AUTHORIZATION, {
                    let mut value: HeaderValue = token.to_string().parse()?;
                    value.set_sensitive(true);

                    value
                });
            }
            Some(expires_in) => {
                if req.query_contains(AUTHORIZATION_QUERY) {
                    return Err(Error::request_invalid("request is already presigned"));
                }
                if let Some(token) = &k.session_token {
                    if !req.query_contains(X_BCE_SECURITY_TOKEN) {
                        req.query_push(X_BCE_SECURITY_TOKEN, token);
                    }
                }

                // Presigned urls can't control the headers sent by the client.
                let host_only = [HOST.to_string()];
                let window = SigningTimeWindow::new(now, expires_in.as_secs())?;
                let creq = CanonicalRequest::from_signing_request(&req, Some(&host_only[..]))?;
                let token = sign(k, &creq, &window)?;

                req.query_push(AUTHORIZATION_QUERY, token.to_string());
            }
        }

        req.apply(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCredentialProvider;
    use bcesign_core::Signer;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    const AK: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SK: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2015, 4, 27, 8, 23, 49).unwrap()
    }

    fn put_part_request() -> http::request::Parts {
        http::Request::put(
            "http://bj.bcebos.com/v1/test/myfolder/readme.txt?partNumber=9&uploadId=a44cc9bab11cbd156984767aad637851",
        )
        .header("Date", "Mon, 27 Apr 2015 16:23:49 +0800")
        .header("Content-Type", "text/plain")
        .header("Content-Length", "8")
        .header("Content-Md5", "NFzcPqhviddjRNnSOGo4rw==")
        .body(())
        .unwrap()
        .into_parts()
        .0
    }

    #[test]
    fn test_signing_time_window() -> Result<()> {
        let window = SigningTimeWindow::new(test_time() + chrono::TimeDelta::milliseconds(500), 10)?;

        assert_eq!(test_time(), window.timestamp());
        assert!(window.contains(test_time()));
        assert!(window.contains(test_time() + chrono::TimeDelta::seconds(9)));
        assert!(!window.contains(test_time() + chrono::TimeDelta::seconds(10)));
        assert!(!window.contains(test_time() - chrono::TimeDelta::seconds(1)));

        let err = SigningTimeWindow::new(test_time(), 0).unwrap_err();
        assert_eq!(bcesign_core::ErrorKind::ConfigInvalid, err.kind());

        for expires_in in [u64::MAX, i64::MAX as u64, i64::MAX as u64 / 1000 + 1] {
            let err = SigningTimeWindow::new(test_time(), expires_in).unwrap_err();
            assert_eq!(bcesign_core::ErrorKind::ConfigInvalid, err.kind());
            assert_eq!(Some(expires_in.to_string().as_str()), err.context("expires_in"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_sign() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, SK),
            RequestSigner::new().with_time(test_time()),
        );

        let mut parts = put_part_request();
        signer.sign(&mut parts, None).await?;

        // Official example of bce auth v1.
        assert_eq!(
            "bce-auth-v1/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/2015-04-27T08:23:49Z/1800/content-length;content-md5;content-type;host;x-bce-date/d74a04362e6a848f5b39b15421cb449427f419c95a480fd6b8cf9fc783e2999e",
            parts.headers[AUTHORIZATION].to_str()?
        );
        assert_eq!("2015-04-27T08:23:49Z", parts.headers[X_BCE_DATE]);
        assert_eq!("bj.bcebos.com", parts.headers[HOST]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_with_session_token() -> Result<()> {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, SK).with_session_token("sts-token"),
            RequestSigner::new().with_time(test_time()),
        );

        let mut parts = put_part_request();
        signer.sign(&mut parts, None).await?;

        assert_eq!("sts-token", parts.headers[X_BCE_SECURITY_TOKEN]);
        assert_eq!(
            "bce-auth-v1/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/2015-04-27T08:23:49Z/1800/content-length;content-md5;content-type;host;x-bce-date;x-bce-security-token/954c1ef9eb691b8c7eb1e2eff2ba9de4336f2d42183f65146fbd15205ebdd2bd",
            parts.headers[AUTHORIZATION].to_str()?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_query() -> Result<()> {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, SK),
            RequestSigner::new().with_time(test_time()),
        );

        let (mut parts, _) = http::Request::get("http://bj.bcebos.com/bucket/key.txt")
            .body(())?
            .into_parts();
        signer
            .sign(&mut parts, Some(Duration::from_secs(3600)))
            .await?;

        assert_eq!(
            "http://bj.bcebos.com/bucket/key.txt?authorization=bce-auth-v1%2Faaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa%2F2015-04-27T08%3A23%3A49Z%2F3600%2Fhost%2F4e5e282fdab23e284d4d6b25fbe71b43e9f3d2619e9d6a2a00ee08e7bac3079e",
            parts.uri.to_string()
        );
        assert!(parts.headers.get(AUTHORIZATION).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_query_with_session_token() -> Result<()> {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, SK).with_session_token("sts-token"),
            RequestSigner::new().with_time(test_time()),
        );

        let (mut parts, _) = http::Request::get("http://bj.bcebos.com/bucket/key.txt")
            .body(())?
            .into_parts();
        signer
            .sign(&mut parts, Some(Duration::from_secs(3600)))
            .await?;

        assert_eq!(
            "http://bj.bcebos.com/bucket/key.txt?x-bce-security-token=sts-token&authorization=bce-auth-v1%2Faaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa%2F2015-04-27T08%3A23%3A49Z%2F3600%2Fhost%2F3d1baecd6fe6e86591bb635ad825f6f10c1fa1dad71c861ec3065121136b618b",
            parts.uri.to_string()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_query_twice() -> Result<()> {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, SK),
            RequestSigner::new().with_time(test_time()),
        );

        let (mut parts, _) = http::Request::get("http://bj.bcebos.com/bucket/key.txt")
            .body(())?
            .into_parts();
        signer.sign(&mut parts, Some(Duration::from_secs(60))).await?;

        let err = signer
            .sign(&mut parts, Some(Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert_eq!(bcesign_core::ErrorKind::RequestInvalid, err.kind());
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_with_empty_secret_key() {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new(AK, ""),
            RequestSigner::new().with_time(test_time()),
        );

        let mut parts = put_part_request();
        let err = signer.sign(&mut parts, None).await.unwrap_err();
        assert_eq!(bcesign_core::ErrorKind::ConfigInvalid, err.kind());
    }

    #[tokio::test]
    async fn test_sign_without_credential() {
        let signer = RequestSigner::new();

        let mut parts = put_part_request();
        let err = signer
            .sign_request(&Context::new(), &mut parts, None, None)
            .await
            .unwrap_err();
        assert_eq!(bcesign_core::ErrorKind::CredentialInvalid, err.kind());
    }

    #[test]
    fn test_token_display_and_parse() -> Result<()> {
        let raw = "bce-auth-v1/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/2015-04-27T08:23:49Z/1800/content-length;content-md5;content-type;host;x-bce-date/d74a04362e6a848f5b39b15421cb449427f419c95a480fd6b8cf9fc783e2999e";

        let token: AuthorizationToken = raw.parse()?;
        assert_eq!(AK, token.access_key_id);
        assert_eq!(test_time(), token.timestamp);
        assert_eq!(1800, token.expires_in);
        assert_eq!(5, token.signed_headers.len());
        assert_eq!(
            "bce-auth-v1/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/2015-04-27T08:23:49Z/1800",
            token.auth_string_prefix()
        );
        assert_eq!(raw, token.to_string());
        Ok(())
    }

    #[test]
    fn test_token_parse_invalid() {
        for raw in [
            "",
            "bce-auth-v2/ak/2015-04-27T08:23:49Z/1800/host/sig",
            "bce-auth-v1/ak/2015-04-27T08:23:49Z/abc/host/sig",
            "bce-auth-v1/ak/not-a-time/1800/host/sig",
            "bce-auth-v1/ak/2015-04-27T08:23:49Z/1800/host",
        ] {
            let err = raw.parse::<AuthorizationToken>().unwrap_err();
            assert_eq!(bcesign_core::ErrorKind::RequestInvalid, err.kind(), "{raw}");
        }
    }

    #[test]
    fn test_pure_sign_and_verify() -> Result<()> {
        let cred = Credential::new(AK, SK, None);
        let creq = CanonicalRequest::new(
            "GET",
            "/bucket/key.txt",
            [("acl", "")],
            [("host", "bj.bcebos.com")],
            None,
        )?;
        let window = SigningTimeWindow::new(test_time(), 1800)?;

        let token = sign(&cred, &creq, &window)?;
        assert_eq!(token, sign(&cred, &creq, &window)?);
        assert!(token.verify(&cred, &creq));
        assert!(!token.verify(&Credential::new(AK, "other", None), &creq));
        assert_eq!(window, token.window()?);
        Ok(())
    }
}
