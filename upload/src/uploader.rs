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

use std::sync::Arc;

use bcesign_bos::constants::CONTENT_MD5;
use bcesign_bos::Credential;
use bcesign_core::{Context, Signer, PATH_ENCODE_SET, UNRESERVED_ENCODE_SET};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use http::{Request, Response};
use log::{debug, warn};
use percent_encoding::utf8_percent_encode;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::bos::{
    normalize_etag, parse_error_response, CompleteMultipartUploadRequest,
    CompleteMultipartUploadResult, InitiateMultipartUploadResult,
};
use crate::{
    CompletedPart, CompletedUpload, Error, MultipartUpload, PartTask, PayloadSource, Result,
    UploadConfig,
};

/// Uploader sends authenticated requests to one BOS endpoint.
///
/// An uploader only holds the signer and immutable config, so it's cheap to
/// clone and safe to share between concurrent sessions. Every session owns
/// its own part map and retry counters.
#[derive(Debug, Clone)]
pub struct Uploader {
    ctx: Context,
    signer: Signer<Credential>,
    endpoint: Arc<str>,
    config: Arc<UploadConfig>,
}

impl Uploader {
    /// Create a new uploader for `endpoint` like `https://bj.bcebos.com`.
    pub fn new(
        ctx: Context,
        signer: Signer<Credential>,
        endpoint: &str,
        config: UploadConfig,
    ) -> Result<Self> {
        config.validate()?;

        let endpoint = endpoint.trim_end_matches('/');
        let uri: http::Uri = endpoint.parse().map_err(|e| {
            Error::config_invalid("endpoint is not a valid url")
                .with_context("endpoint", endpoint)
                .with_source(e)
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(Error::config_invalid("endpoint must contain scheme and host")
                .with_context("endpoint", endpoint));
        }

        Ok(Self {
            ctx,
            signer,
            endpoint: endpoint.into(),
            config: Arc::new(config),
        })
    }

    /// Config of this uploader.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Signer used by this uploader.
    pub fn signer(&self) -> &Signer<Credential> {
        &self.signer
    }

    /// Start a new multipart upload session for `bucket/key`.
    ///
    /// No request is sent until [`MultipartUpload::initiate`] is called.
    pub fn session(&self, bucket: &str, key: &str) -> MultipartUpload {
        MultipartUpload::new(self.clone(), bucket, key)
    }

    /// Upload the whole payload with a multipart upload.
    pub async fn upload<S: PayloadSource>(
        &self,
        bucket: &str,
        key: &str,
        source: &S,
    ) -> Result<CompletedUpload> {
        self.session(bucket, key).run(source).await
    }

    pub(crate) fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{bucket}", self.endpoint)
    }

    pub(crate) fn object_url(&self, bucket: &str, key: &str, query: &str) -> String {
        let key = utf8_percent_encode(key.trim_start_matches('/'), &PATH_ENCODE_SET);
        if query.is_empty() {
            format!("{}/{bucket}/{key}", self.endpoint)
        } else {
            format!("{}/{bucket}/{key}?{query}", self.endpoint)
        }
    }

    /// Send one request, signing it first if asked.
    ///
    /// Transport failures and timeouts become [`crate::ErrorKind::Network`],
    /// non-success responses [`crate::ErrorKind::Protocol`].
    pub(crate) async fn send(&self, req: Request<Bytes>, sign: bool) -> Result<Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        if sign {
            self.signer.sign(&mut parts, None).await?;
        }

        let url = parts.uri.to_string();
        debug!("sending request: {} {url}", parts.method);
        let req = Request::from_parts(parts, body);

        let resp = match timeout(self.config.timeout, self.ctx.http_send(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                return Err(Error::network("failed to send request")
                    .with_context("url", url)
                    .with_source(err))
            }
            Err(_) => {
                return Err(Error::network("request timed out")
                    .with_context("url", url)
                    .with_context("timeout", format!("{:?}", self.config.timeout)))
            }
        };

        if !resp.status().is_success() {
            let err = parse_error_response(&resp).with_context("url", url);
            debug!("request failed: {err}");
            return Err(err);
        }
        Ok(resp)
    }

    /// Send a signed request built by `build`, retrying retryable failures
    /// with exponential backoff.
    ///
    /// The request is rebuilt and signed again for every attempt. `attempts`
    /// counts every request sent.
    pub(crate) async fn send_with_retry<F>(
        &self,
        mut build: F,
        attempts: &mut u32,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Response<Bytes>>
    where
        F: FnMut() -> Result<Request<Bytes>>,
    {
        let retry = &self.config.retry;
        let mut tries = 0;
        loop {
            tries += 1;
            *attempts += 1;

            let err = match self.send(build()?, true).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };
            if !err.is_retryable() || tries >= retry.max_attempts {
                return Err(err);
            }
            if *cancel.borrow() {
                return Err(Error::cancelled("upload cancelled while retrying").with_source(err));
            }

            let delay = retry.backoff(tries);
            warn!("request failed, retrying in {delay:?} (attempt {tries} of {}): {err}", retry.max_attempts);
            let mut cancel = cancel.clone();
            tokio::select! {
                _ = sleep(delay) => {}
                Ok(_) = cancel.wait_for(|cancelled| *cancelled) => {
                    return Err(Error::cancelled("upload cancelled while retrying").with_source(err));
                }
            }
        }
    }

    pub(crate) async fn initiate_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        cancel: &watch::Receiver<bool>,
    ) -> Result<String> {
        let url = self.object_url(bucket, key, "uploads");
        let mut attempts = 0;
        let resp = self
            .send_with_retry(
                || Ok(Request::post(&url).body(Bytes::new())?),
                &mut attempts,
                cancel,
            )
            .await?;

        let result: InitiateMultipartUploadResult = serde_json::from_slice(resp.body())
            .map_err(|e| {
                Error::protocol("invalid initiate multipart upload response").with_source(e)
            })?;
        debug!("initiated multipart upload {bucket}/{key}: {}", result.upload_id);
        Ok(result.upload_id)
    }

    /// Upload one part, returns the eTag without quotes.
    pub(crate) async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        task: &mut PartTask,
        body: Bytes,
        cancel: &watch::Receiver<bool>,
    ) -> Result<String> {
        let query = format!(
            "partNumber={}&uploadId={}",
            task.part_number,
            utf8_percent_encode(upload_id, &UNRESERVED_ENCODE_SET)
        );
        let url = self.object_url(bucket, key, &query);
        let content_md5 = task.content_md5.clone();

        let resp = self
            .send_with_retry(
                || {
                    let mut req = Request::put(&url).header(CONTENT_LENGTH, body.len());
                    if let Some(md5) = &content_md5 {
                        req = req.header(CONTENT_MD5, md5);
                    }
                    Ok(req.body(body.clone())?)
                },
                &mut task.attempts,
                cancel,
            )
            .await?;

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(normalize_etag)
            .ok_or_else(|| {
                Error::protocol("upload part response has no eTag")
                    .with_status(resp.status())
            })?;
        Ok(etag)
    }

    pub(crate) async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompleteMultipartUploadResult> {
        let url = self.object_url(
            bucket,
            key,
            &format!(
                "uploadId={}",
                utf8_percent_encode(upload_id, &UNRESERVED_ENCODE_SET)
            ),
        );
        let body = serde_json::to_vec(&CompleteMultipartUploadRequest { parts })
            .map_err(|e| Error::request_invalid("failed to serialize part list").with_source(e))?;

        let req = Request::post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(Bytes::from(body))?;
        let resp = self.send(req, true).await?;

        serde_json::from_slice(resp.body()).map_err(|e| {
            Error::protocol("invalid complete multipart upload response").with_source(e)
        })
    }

    pub(crate) async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        let url = self.object_url(
            bucket,
            key,
            &format!(
                "uploadId={}",
                utf8_percent_encode(upload_id, &UNRESERVED_ENCODE_SET)
            ),
        );

        let req = Request::delete(&url).body(Bytes::new())?;
        self.send(req, true).await?;
        debug!("aborted multipart upload {bucket}/{key}: {upload_id}");
        Ok(())
    }
}
