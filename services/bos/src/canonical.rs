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

//! Canonical request of bce auth v1.
//!
//! ## Format
//!
//! ```text
//! HTTPMethod + "\n" +
//! CanonicalURI + "\n" +
//! CanonicalQueryString + "\n" +
//! CanonicalHeaders
//! ```
//!
//! ## Reference
//!
//! - [Generate authentication string](https://cloud.baidu.com/doc/Reference/s/njwvz1yfu)

use std::fmt::{Display, Formatter, Write};
use std::iter;

use bcesign_core::{Error, Result, SigningRequest, PATH_ENCODE_SET, UNRESERVED_ENCODE_SET};
use percent_encoding::{percent_decode_str, percent_encode, utf8_percent_encode};

use crate::constants::*;

/// CanonicalRequest is the deterministic form of a request used as the
/// signing input.
///
/// All parts are stored already encoded and sorted, so two requests that only
/// differ in header letter casing or in the order of query parameters and
/// headers produce the same canonical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// HTTP method in upper case.
    pub method: String,
    /// Percent encoded path, always starts with `/`.
    pub path: String,
    /// Percent encoded query pairs, sorted by key then value.
    pub query: Vec<(String, String)>,
    /// Lower cased header names with percent encoded values, sorted by
    /// their `name:value` rendering.
    pub headers: Vec<(String, String)>,
}

impl CanonicalRequest {
    /// Build a canonical request from raw parts.
    ///
    /// `path` may be percent encoded already; it's decoded first so that it
    /// never gets encoded twice. When `signed_headers` is `None`, `host`,
    /// `content-length`, `content-type`, `content-md5` and every `x-bce-*`
    /// header are signed.
    pub fn new<'a>(
        method: &str,
        path: &str,
        query: impl IntoIterator<Item = (&'a str, &'a str)>,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
        signed_headers: Option<&[String]>,
    ) -> Result<Self> {
        let method = method.trim();
        if method.is_empty() {
            return Err(Error::request_invalid("http method must not be empty"));
        }

        let mut canonical_headers: Vec<(String, String)> = Vec::new();
        for (name, value) in headers {
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() || name.contains(|c: char| c == ':' || c.is_ascii_control()) {
                return Err(Error::request_invalid("header name is not valid for signing")
                    .with_context("header", name));
            }
            if !is_signed_header(&name, signed_headers) {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            let value = utf8_percent_encode(value, &UNRESERVED_ENCODE_SET).to_string();
            // Repeated headers are folded into one comma separated value.
            match canonical_headers.iter_mut().find(|(k, _)| *k == name) {
                Some((_, v)) => {
                    v.push_str("%2C");
                    v.push_str(&value);
                }
                None => canonical_headers.push((name, value)),
            }
        }
        canonical_headers
            .sort_by(|(ak, av), (bk, bv)| header_line(ak, av).cmp(header_line(bk, bv)));

        let mut canonical_query: Vec<(String, String)> = query
            .into_iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION_QUERY))
            .map(|(k, v)| {
                (
                    utf8_percent_encode(k, &UNRESERVED_ENCODE_SET).to_string(),
                    utf8_percent_encode(v, &UNRESERVED_ENCODE_SET).to_string(),
                )
            })
            .collect();
        canonical_query.sort();

        Ok(Self {
            method: method.to_ascii_uppercase(),
            path: canonicalize_path(path),
            query: canonical_query,
            headers: canonical_headers,
        })
    }

    /// Build a canonical request from a [`SigningRequest`].
    pub fn from_signing_request(
        req: &SigningRequest,
        signed_headers: Option<&[String]>,
    ) -> Result<Self> {
        let mut headers = Vec::with_capacity(req.headers.len());
        for (name, value) in req.headers.iter() {
            let value = value.to_str().map_err(|e| {
                Error::request_invalid("header value is not visible ascii")
                    .with_context("header", name.as_str())
                    .with_source(e)
            })?;
            headers.push((name.as_str(), value));
        }

        Self::new(
            req.method.as_str(),
            &req.path,
            req.query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            headers,
            signed_headers,
        )
    }

    /// Names of the headers that take part in signing, sorted.
    pub fn signed_headers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Canonical query string like `partNumber=9&uploadId=abc`.
    pub fn canonical_query_string(&self) -> String {
        let mut s = String::new();
        for (idx, (k, v)) in self.query.iter().enumerate() {
            if idx != 0 {
                s.push('&');
            }
            s.push_str(k);
            s.push('=');
            s.push_str(v);
        }
        s
    }

    /// Canonical headers joined by `\n`, without a trailing newline.
    pub fn canonical_headers(&self) -> String {
        let mut s = String::new();
        for (idx, (k, v)) in self.headers.iter().enumerate() {
            if idx != 0 {
                s.push('\n');
            }
            s.push_str(k);
            s.push(':');
            s.push_str(v);
        }
        s
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.method)?;
        f.write_char('\n')?;
        f.write_str(&self.path)?;
        f.write_char('\n')?;
        f.write_str(&self.canonical_query_string())?;
        f.write_char('\n')?;
        f.write_str(&self.canonical_headers())
    }
}

fn is_signed_header(name: &str, signed_headers: Option<&[String]>) -> bool {
    match signed_headers {
        Some(names) => names
            .iter()
            .any(|v| v.trim().eq_ignore_ascii_case(name)),
        None => DEFAULT_SIGNED_HEADERS.contains(name) || name.starts_with(X_BCE_PREFIX),
    }
}

fn header_line<'a>(name: &'a str, value: &'a str) -> impl Iterator<Item = u8> + 'a {
    name.bytes().chain(iter::once(b':')).chain(value.bytes())
}

fn canonicalize_path(path: &str) -> String {
    let decoded: Vec<u8> = percent_decode_str(path).collect();
    let encoded = percent_encode(&decoded, &PATH_ENCODE_SET).to_string();
    if encoded.starts_with('/') {
        encoded
    } else {
        format!("/{encoded}")
    }
}
