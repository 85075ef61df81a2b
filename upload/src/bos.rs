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

//! Wire format of the BOS multipart upload api.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{CompletedPart, Error};

/// Response header carrying the request id.
pub(crate) const X_BCE_REQUEST_ID: &str = "x-bce-request-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitiateMultipartUploadResult {
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteMultipartUploadRequest<'a> {
    pub parts: &'a [CompletedPart],
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartUploadResult {
    /// Url of the object.
    #[serde(default)]
    pub location: String,
    /// Bucket of the object.
    pub bucket: String,
    /// Key of the object.
    pub key: String,
    /// eTag of the assembled object.
    #[serde(rename = "eTag")]
    pub etag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ErrorResponse {
    code: String,
    message: String,
    request_id: String,
}

/// Turn a non-success response into a protocol error.
pub(crate) fn parse_error_response(resp: &http::Response<Bytes>) -> Error {
    let status = resp.status();
    let body: ErrorResponse = serde_json::from_slice(resp.body()).unwrap_or_default();

    let message = if body.message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        body.message
    };
    let request_id = if body.request_id.is_empty() {
        resp.headers()
            .get(X_BCE_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    } else {
        body.request_id
    };

    let mut err = Error::protocol(message).with_status(status);
    if !body.code.is_empty() {
        err = err.with_context("code", body.code);
    }
    if !request_id.is_empty() {
        err = err.with_context("request_id", request_id);
    }
    err
}

/// Strip the quotes around an eTag.
pub(crate) fn normalize_etag(etag: &str) -> String {
    etag.trim().trim_matches('"').to_string()
}
