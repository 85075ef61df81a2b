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

//! Hash related utils.
//!
//! Content digests are always base64 encoded MD5, the format used by the
//! `Content-MD5` header. The in-memory, streaming and file variants produce
//! identical output for identical bytes.

use std::path::Path;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use futures::Stream;
use futures::TryStreamExt;
use hmac::Hmac;
use hmac::Mac;
use md5::Md5;
use sha2::Digest;
use sha2::Sha256;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use crate::{Error, Result};

/// Read buffer size used by [`base64_md5_reader`].
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Base64 encode
pub fn base64_encode(content: &[u8]) -> String {
    BASE64_STANDARD.encode(content)
}

/// Base64 decode
pub fn base64_decode(content: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(content)
        .map_err(|e| Error::request_invalid("value is not valid base64").with_source(e))
}

/// Hex encoded SHA256 hash.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// HMAC with SHA256 hash.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    h.finalize().into_bytes().to_vec()
}

/// Hex encoded HMAC with SHA256 hash.
///
/// Use this function instead of `hex::encode(hmac_sha256(key, content))` can
/// reduce extra copy.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    hex::encode(h.finalize().into_bytes())
}

/// Base64 encoded MD5 of an in-memory buffer.
pub fn base64_md5(content: &[u8]) -> String {
    base64_encode(Md5::digest(content).as_slice())
}

/// Base64 encoded MD5 of a byte stream.
///
/// The stream is consumed exactly once, in order, and never buffered as a whole.
pub async fn base64_md5_stream<S, B, E>(stream: S) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    let mut hasher = Md5::new();
    let mut stream = std::pin::pin!(stream.map_err(Into::into));
    while let Some(chunk) = stream.try_next().await? {
        hasher.update(chunk.as_ref());
    }

    Ok(base64_encode(hasher.finalize().as_slice()))
}

/// Base64 encoded MD5 of everything an async reader yields.
pub async fn base64_md5_reader<R: AsyncRead + Unpin>(mut reader: R) -> Result<String> {
    let mut hasher = Md5::new();
    let mut buf = vec![0; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(base64_encode(hasher.finalize().as_slice()))
}

/// Base64 encoded MD5 of a file.
pub async fn base64_md5_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        Error::io("failed to open file for hashing")
            .with_context("path", path.display().to_string())
            .with_source(e)
    })?;

    base64_md5_reader(file).await
}

/// Check whether a server returned eTag matches a base64 encoded MD5.
///
/// The eTag is the hex MD5 of the stored bytes, optionally wrapped in quotes.
pub fn etag_matches(etag: &str, base64_md5: &str) -> bool {
    let etag = etag.trim().trim_matches('"');
    match base64_decode(base64_md5) {
        Ok(digest) => etag.eq_ignore_ascii_case(&hex::encode(digest)),
        Err(_) => false,
    }
}
