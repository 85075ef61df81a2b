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

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use bcesign_core::hash::{base64_md5, etag_matches};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::bos::normalize_etag;
use crate::part::{plan_parts, validate_part_list, validate_plan, PartRecord, PartState};
use crate::{
    AbortOutcome, CompletedPart, Error, PartTask, PayloadSource, Progress, ProgressRegistry,
    Result, Uploader,
};

/// State of a multipart upload session.
///
/// A session moves forward only:
/// `Idle -> Initiating -> UploadingParts -> Completing -> Completed`, or from
/// any active state to `Aborting -> Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Nothing sent yet.
    Idle,
    /// Waiting for the upload id.
    Initiating,
    /// Upload id known, parts may be uploaded.
    UploadingParts,
    /// Complete request in flight.
    Completing,
    /// Object assembled by the server.
    Completed,
    /// Abort request in flight.
    Aborting,
    /// Session ended without an object.
    Aborted,
}

impl UploadState {
    /// Whether the session can't make any further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Aborted)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadState::Idle => "idle",
            UploadState::Initiating => "initiate",
            UploadState::UploadingParts => "part upload",
            UploadState::Completing => "complete",
            UploadState::Completed => "completed",
            UploadState::Aborting => "abort",
            UploadState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// CancelHandle cancels a running session from anywhere.
///
/// Cancelling stops dispatching new parts. Parts already in flight finish,
/// then the session aborts the upload once and fails with
/// [`crate::ErrorKind::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Calling it more than once has no extra effect.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Result of a completed multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    /// Bucket of the object.
    pub bucket: String,
    /// Key of the object.
    pub key: String,
    /// Upload id of the finished session.
    pub upload_id: String,
    /// eTag of the assembled object.
    pub etag: String,
    /// Location returned by the server, may be empty.
    pub location: String,
    /// Sum of all part sizes.
    pub size: u64,
    /// Number of parts.
    pub parts: usize,
}

enum PartEvent {
    Uploaded { task: PartTask, etag: String },
    Failed { task: PartTask, error: Error },
}

/// MultipartUpload drives one upload session against the server.
///
/// The session is the single owner of its part map: part uploads run
/// concurrently but only report back, and the map is updated as their
/// results arrive. Any failure after the upload id is known aborts the
/// upload exactly once.
#[derive(Debug)]
pub struct MultipartUpload {
    uploader: Uploader,
    bucket: String,
    key: String,
    upload_id: Option<String>,
    state: UploadState,
    tasks: BTreeMap<u32, PartTask>,
    parts: BTreeMap<u32, PartRecord>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    progress: ProgressRegistry,
    abort_sent: bool,
}

impl MultipartUpload {
    pub(crate) fn new(uploader: Uploader, bucket: &str, key: &str) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            uploader,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: None,
            state: UploadState::Idle,
            tasks: BTreeMap::new(),
            parts: BTreeMap::new(),
            cancel_tx: Arc::new(tx),
            cancel_rx: rx,
            progress: ProgressRegistry::new(),
            abort_sent: false,
        }
    }

    /// Bucket of this session.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key of this session.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload id, known once initiated.
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Current state.
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Parts acknowledged by the server, keyed by part number.
    pub fn parts(&self) -> &BTreeMap<u32, PartRecord> {
        &self.parts
    }

    /// Every part task dispatched so far, keyed by part number.
    pub fn tasks(&self) -> &BTreeMap<u32, PartTask> {
        &self.tasks
    }

    /// Handle to cancel this session from another task or a progress listener.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Progress listeners of this session.
    pub fn progress(&self) -> &ProgressRegistry {
        &self.progress
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    fn transition(&mut self, next: UploadState) {
        debug!(
            "upload {}/{}: {} -> {}",
            self.bucket, self.key, self.state, next
        );
        self.state = next;
    }

    fn ensure_state(&self, expected: UploadState, op: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::request_invalid(format!(
                "{op} is not allowed once the session is in {} state",
                self.state
            ))
            .with_context("state", format!("{:?}", self.state)));
        }
        Ok(())
    }

    /// Ask the server for an upload id.
    ///
    /// Transient failures are retried. If the upload can't be initiated the
    /// session ends in `Aborted` without any abort request.
    pub async fn initiate(&mut self) -> Result<&str> {
        self.ensure_state(UploadState::Idle, "initiate")?;

        self.transition(UploadState::Initiating);
        if self.is_cancelled() {
            self.transition(UploadState::Aborted);
            return Err(Error::cancelled("upload cancelled before initiate")
                .with_state(UploadState::Initiating)
                .with_abort(AbortOutcome::Skipped));
        }

        match self
            .uploader
            .initiate_multipart_upload(&self.bucket, &self.key, &self.cancel_rx)
            .await
        {
            Ok(upload_id) => {
                info!(
                    "initiated multipart upload {}/{}: {upload_id}",
                    self.bucket, self.key
                );
                self.transition(UploadState::UploadingParts);
                Ok(self.upload_id.insert(upload_id).as_str())
            }
            Err(err) => {
                self.transition(UploadState::Aborted);
                Err(err
                    .with_state(UploadState::Initiating)
                    .with_abort(AbortOutcome::Skipped))
            }
        }
    }

    /// Upload the parts described by `plan`, reading them from `source`.
    ///
    /// The plan is validated before any request. Parts already acknowledged
    /// by the server are skipped. Up to `concurrency` parts are in flight at
    /// once. On failure or cancellation no new part is dispatched, in-flight
    /// parts are allowed to finish, and the upload is aborted.
    pub async fn upload_parts<S: PayloadSource>(
        &mut self,
        plan: &[PartTask],
        source: &S,
    ) -> Result<()> {
        self.ensure_state(UploadState::UploadingParts, "upload parts")?;
        validate_plan(plan, self.uploader.config().min_part_size)?;
        if let Some(last) = plan.last() {
            if last.range.end > source.len() {
                return Err(Error::payload_invalid("plan is larger than the payload")
                    .with_context("plan_end", last.range.end.to_string())
                    .with_context("payload_len", source.len().to_string()));
            }
        }

        match self.drive_parts(plan, source).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn drive_parts<S: PayloadSource>(&mut self, plan: &[PartTask], source: &S) -> Result<()> {
        let upload_id = self
            .upload_id
            .clone()
            .ok_or_else(|| Error::request_invalid("upload has not been initiated"))?;
        let uploader = self.uploader.clone();
        let concurrency = uploader.config().concurrency;
        let bucket = self.bucket.clone();
        let key = self.key.clone();

        let total_parts = plan.len();
        let total_bytes: u64 = plan.iter().map(PartTask::size).sum();
        let mut transferred: u64 = plan
            .iter()
            .filter_map(|t| self.parts.get(&t.part_number))
            .map(|p| p.size)
            .sum();
        self.progress.report(Progress {
            transferred,
            total: total_bytes,
        });

        let mut pending: VecDeque<PartTask> = plan
            .iter()
            .filter(|t| !self.parts.contains_key(&t.part_number))
            .cloned()
            .collect();
        for task in &pending {
            self.tasks.insert(task.part_number, task.clone());
        }

        let mut cancel = self.cancel_rx.clone();
        let mut in_flight = FuturesUnordered::new();
        let mut failure: Option<Error> = None;

        loop {
            while failure.is_none() && !*cancel.borrow() && in_flight.len() < concurrency {
                let Some(mut task) = pending.pop_front() else {
                    break;
                };
                task.state = PartState::InFlight;
                self.tasks.insert(task.part_number, task.clone());
                debug!("dispatching part {} of {total_parts}", task.part_number);

                in_flight.push(upload_one_part(
                    &uploader,
                    &bucket,
                    &key,
                    &upload_id,
                    task,
                    source,
                    cancel.clone(),
                ));
            }

            if in_flight.is_empty() {
                break;
            }

            let cancelled = *cancel.borrow();
            let event = tokio::select! {
                Some(event) = in_flight.next() => event,
                _ = cancel.changed(), if !cancelled => continue,
            };

            match event {
                PartEvent::Uploaded { task, etag } => {
                    debug!("part {} of {total_parts} uploaded", task.part_number);
                    transferred += task.size();
                    self.parts.insert(
                        task.part_number,
                        PartRecord {
                            etag,
                            size: task.size(),
                        },
                    );
                    self.tasks.insert(task.part_number, task);
                    self.progress.report(Progress {
                        transferred,
                        total: total_bytes,
                    });
                }
                PartEvent::Failed { task, error } => {
                    let part_number = task.part_number;
                    warn!("part {part_number} of {total_parts} failed: {error}");
                    self.tasks.insert(part_number, task);
                    if failure.is_none() {
                        failure = Some(error.with_part(part_number, total_parts));
                    }
                }
            }
        }

        if *cancel.borrow() {
            return Err(Error::cancelled("upload cancelled by caller")
                .with_context("uploaded_parts", self.parts.len().to_string())
                .with_context("total_parts", total_parts.to_string()));
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Complete the upload with every acknowledged part.
    pub async fn complete(&mut self) -> Result<CompletedUpload> {
        let parts: Vec<CompletedPart> = self
            .parts
            .iter()
            .map(|(number, record)| CompletedPart {
                part_number: *number,
                etag: record.etag.clone(),
            })
            .collect();
        self.complete_with(&parts).await
    }

    /// Complete the upload with a caller provided part list.
    ///
    /// The list is checked before any request: it must be contiguous from 1,
    /// every part must have been uploaded by this session, and each eTag must
    /// match what the server acknowledged for that part.
    /// A rejected list leaves the session untouched.
    pub async fn complete_with(&mut self, parts: &[CompletedPart]) -> Result<CompletedUpload> {
        self.ensure_state(UploadState::UploadingParts, "complete")?;
        validate_part_list(parts)?;
        for part in parts {
            let Some(record) = self.parts.get(&part.part_number) else {
                return Err(Error::request_invalid("part was never uploaded in this session")
                    .with_part(part.part_number, parts.len()));
            };
            if record.etag != normalize_etag(&part.etag) {
                return Err(
                    Error::request_invalid("eTag doesn't match the uploaded part")
                        .with_part(part.part_number, parts.len())
                        .with_context("expected", record.etag.clone())
                        .with_context("found", part.etag.clone()),
                );
            }
        }

        if self.is_cancelled() {
            let err = Error::cancelled("upload cancelled before complete");
            return Err(self.fail(err).await);
        }

        let upload_id = self
            .upload_id
            .clone()
            .ok_or_else(|| Error::request_invalid("upload has not been initiated"))?;
        self.transition(UploadState::Completing);

        let result = match self
            .uploader
            .complete_multipart_upload(&self.bucket, &self.key, &upload_id, parts)
            .await
        {
            Ok(result) => result,
            Err(err) => return Err(self.fail(err).await),
        };

        self.transition(UploadState::Completed);
        info!(
            "completed multipart upload {}/{}: {upload_id}",
            self.bucket, self.key
        );

        let size = parts
            .iter()
            .filter_map(|p| self.parts.get(&p.part_number))
            .map(|r| r.size)
            .sum();
        Ok(CompletedUpload {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            upload_id,
            etag: normalize_etag(&result.etag),
            location: result.location,
            size,
            parts: parts.len(),
        })
    }

    /// Abort the upload.
    ///
    /// Aborting an aborted session is a no-op and sends nothing. A completed
    /// session can't be aborted.
    pub async fn abort(&mut self) -> Result<()> {
        match self.state {
            UploadState::Aborted => Ok(()),
            UploadState::Completed => Err(Error::request_invalid(
                "completed upload can't be aborted",
            )),
            UploadState::Idle => {
                self.transition(UploadState::Aborted);
                Ok(())
            }
            _ => self
                .send_abort()
                .await
                .map(|_| ())
                .map_err(|err| err.with_state(UploadState::Aborting)),
        }
    }

    /// Plan, initiate, upload every part and complete.
    pub async fn run<S: PayloadSource>(&mut self, source: &S) -> Result<CompletedUpload> {
        let plan = {
            let config = self.uploader.config();
            plan_parts(source.len(), config.part_size, config.min_part_size)?
        };

        self.initiate().await?;
        self.upload_parts(&plan, source).await?;
        self.complete().await
    }

    /// Abort after a failure, and attach the outcome to `err`.
    async fn fail(&mut self, err: Error) -> Error {
        let err = err.with_state(self.state);
        let outcome = match self.send_abort().await {
            Ok(outcome) => outcome,
            Err(abort_err) => AbortOutcome::Failed(abort_err.to_string()),
        };
        err.with_abort(outcome)
    }

    async fn send_abort(&mut self) -> Result<AbortOutcome> {
        self.transition(UploadState::Aborting);

        let upload_id = match &self.upload_id {
            Some(id) if !self.abort_sent => id.clone(),
            _ => {
                self.transition(UploadState::Aborted);
                return Ok(AbortOutcome::Skipped);
            }
        };

        self.abort_sent = true;
        let result = self
            .uploader
            .abort_multipart_upload(&self.bucket, &self.key, &upload_id)
            .await;
        self.transition(UploadState::Aborted);

        match result {
            Ok(()) => Ok(AbortOutcome::Aborted),
            Err(err) => {
                warn!(
                    "failed to abort multipart upload {}/{}: {err}",
                    self.bucket, self.key
                );
                Err(err)
            }
        }
    }
}

async fn upload_one_part<S: PayloadSource>(
    uploader: &Uploader,
    bucket: &str,
    key: &str,
    upload_id: &str,
    mut task: PartTask,
    source: &S,
    cancel: watch::Receiver<bool>,
) -> PartEvent {
    match upload_part_checked(uploader, bucket, key, upload_id, &mut task, source, &cancel).await {
        Ok(etag) => {
            task.state = PartState::Uploaded;
            PartEvent::Uploaded { task, etag }
        }
        Err(error) => {
            task.state = PartState::Failed;
            PartEvent::Failed { task, error }
        }
    }
}

/// Read, hash and upload one part.
///
/// An eTag that doesn't match the local MD5 is retried once. Other
/// retryable failures follow the retry config.
async fn upload_part_checked<S: PayloadSource>(
    uploader: &Uploader,
    bucket: &str,
    key: &str,
    upload_id: &str,
    task: &mut PartTask,
    source: &S,
    cancel: &watch::Receiver<bool>,
) -> Result<String> {
    let body = source.read_range(task.range.clone()).await?;
    if body.len() as u64 != task.size() {
        return Err(Error::payload_invalid("payload returned fewer bytes than planned")
            .with_context("expected", task.size().to_string())
            .with_context("actual", body.len().to_string()));
    }
    let content_md5 = base64_md5(&body);
    task.content_md5 = Some(content_md5.clone());

    let mut integrity_retried = false;
    loop {
        let etag = uploader
            .upload_part(bucket, key, upload_id, task, body.clone(), cancel)
            .await?;
        if !uploader.config().verify_etag || etag_matches(&etag, &content_md5) {
            return Ok(etag);
        }

        let err = Error::integrity("part eTag doesn't match local MD5")
            .with_context("etag", etag)
            .with_context("content_md5", content_md5.clone());
        if integrity_retried || *cancel.borrow() {
            return Err(err);
        }
        warn!("part {} retrying once: {err}", task.part_number);
        integrity_retried = true;
    }
}
