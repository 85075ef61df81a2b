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

use std::mem;
use std::str::FromStr;

use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;
use http::Uri;
use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

use crate::{Error, Result};

/// AsciiSet that keeps only the unreserved characters: `A-Z a-z 0-9 - . _ ~`.
pub static UNRESERVED_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Same as [`UNRESERVED_ENCODE_SET`] but keeps `/` as the path separator.
pub static PATH_ENCODE_SET: AsciiSet = UNRESERVED_ENCODE_SET.remove(b'/');

/// Signing context for request.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as it appears on the wire.
    pub path: String,
    /// HTTP query parameters, percent decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query keys and values are percent encoded with [`UNRESERVED_ENCODE_SET`].
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let mut s = self.path;
                for (i, (k, v)) in self.query.iter().enumerate() {
                    s.push(if i == 0 { '?' } else { '&' });
                    s.extend(utf8_percent_encode(k, &UNRESERVED_ENCODE_SET));
                    if !v.is_empty() {
                        s.push('=');
                        s.extend(utf8_percent_encode(v, &UNRESERVED_ENCODE_SET));
                    }
                }

                Some(PathAndQuery::from_str(&s)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Push a new query pair into query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Check if the query contains `key`, compared case-insensitively.
    pub fn query_contains(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_apply() -> Result<()> {
        let (mut parts, _) = http::Request::put(
            "http://bj.bcebos.com/bucket/my%20file.txt?partNumber=1&uploadId=abc",
        )
        .header("Content-Type", "text/plain")
        .body(())?
        .into_parts();

        let mut req = SigningRequest::build(&mut parts)?;
        assert_eq!("/bucket/my%20file.txt", req.path);
        assert_eq!(
            vec![
                ("partNumber".to_string(), "1".to_string()),
                ("uploadId".to_string(), "abc".to_string())
            ],
            req.query
        );
        assert!(parts.headers.is_empty());

        req.query_push("authorization", "bce-auth-v1/ak/2015-04-27T08:23:49Z/1800/host/sig");
        req.apply(&mut parts)?;

        assert_eq!(
            "http://bj.bcebos.com/bucket/my%20file.txt?partNumber=1&uploadId=abc&authorization=bce-auth-v1%2Fak%2F2015-04-27T08%3A23%3A49Z%2F1800%2Fhost%2Fsig",
            parts.uri.to_string()
        );
        assert_eq!("text/plain", parts.headers[http::header::CONTENT_TYPE]);
        Ok(())
    }

    #[test]
    fn test_apply_keeps_empty_value_key() -> Result<()> {
        let (mut parts, _) = http::Request::post("http://bj.bcebos.com/bucket/key?uploads")
            .body(())?
            .into_parts();

        let req = SigningRequest::build(&mut parts)?;
        assert_eq!(vec![("uploads".to_string(), "".to_string())], req.query);
        req.apply(&mut parts)?;

        assert_eq!("http://bj.bcebos.com/bucket/key?uploads", parts.uri.to_string());
        Ok(())
    }

    #[test]
    fn test_build_without_authority() -> Result<()> {
        let (mut parts, _) = http::Request::get("/bucket/key").body(())?.into_parts();

        let err = SigningRequest::build(&mut parts).unwrap_err();
        assert_eq!(crate::ErrorKind::RequestInvalid, err.kind());
        Ok(())
    }
}
