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

//! Browser style form upload with a signed post policy.

use bcesign_bos::PostPolicy;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use http::Request;
use log::debug;

use crate::bos::normalize_etag;
use crate::{Error, FormEncoder, Result, Uploader};

/// Response of a form upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostObjectOutput {
    /// eTag of the stored object, empty if the server didn't return one.
    pub etag: String,
}

impl Uploader {
    /// Upload `content` to `bucket/key` as a `multipart/form-data` POST.
    ///
    /// The request itself is not signed: the signed `policy` travels in the
    /// form together with the access key. The file field is always last.
    pub async fn post_object(
        &self,
        bucket: &str,
        key: &str,
        policy: &PostPolicy,
        content: impl Into<Bytes>,
    ) -> Result<PostObjectOutput> {
        let cred = self
            .signer()
            .credential()
            .await?
            .ok_or_else(|| Error::config_invalid("no credential available for post policy"))?;
        let signed = policy.sign(&cred)?;

        let mut form = FormEncoder::with_random_boundary();
        for (name, value) in signed.fields() {
            form.add_field(name, value)?;
        }
        form.add_field("key", key)?;
        form.add_field("file", content.into())?;

        let body = form.encode();
        debug!("post object {bucket}/{key} with {} form fields", form.len());

        let req = Request::post(self.bucket_url(bucket))
            .header(CONTENT_TYPE, form.content_type())
            .header(CONTENT_LENGTH, body.len())
            .body(body)?;
        let resp = self.send(req, false).await?;

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(normalize_etag)
            .unwrap_or_default();
        Ok(PostObjectOutput { etag })
    }
}
