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

//! Multipart and form uploads to Baidu Object Storage (BOS).
//!
//! [`Uploader`] sends `bce-auth-v1` signed requests to one endpoint.
//! Large payloads go through a [`MultipartUpload`] session: the payload is
//! split into parts, each part is hashed and uploaded with bounded
//! concurrency, and the object is assembled once every part has been
//! acknowledged. Any failure after the upload has been initiated aborts it.
//!
//! ```no_run
//! use bcesign_bos::{DefaultCredentialProvider, RequestSigner};
//! use bcesign_core::{Context, OsEnv, Signer};
//! use bcesign_upload::{FileSource, Result, UploadConfig, Uploader};
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let signer = Signer::new(ctx.clone(), DefaultCredentialProvider::new(), RequestSigner::new());
//! let uploader = Uploader::new(ctx, signer, "https://bj.bcebos.com", UploadConfig::default())?;
//!
//! let source = FileSource::open("/tmp/large.bin").await?;
//! let mut session = uploader.session("bucket", "large.bin");
//! session.progress().attach(|p: bcesign_upload::Progress| {
//!     println!("{} of {} bytes", p.transferred, p.total);
//! });
//! let upload = session.run(&source).await?;
//! println!("uploaded {} as {}", upload.key, upload.etag);
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod error;
pub use error::{AbortOutcome, Error, ErrorKind, Result};

mod config;
pub use config::{
    RetryConfig, UploadConfig, DEFAULT_MIN_PART_SIZE, DEFAULT_PART_SIZE, MAX_PART_COUNT,
};

mod source;
pub use source::{BytesSource, FileSource, PayloadSource};

mod progress;
pub use progress::{ListenerId, Progress, ProgressListener, ProgressRegistry};

mod form;
pub use form::{FormEncoder, Payload};

mod part;
pub use part::{
    plan_parts, validate_part_list, validate_plan, CompletedPart, PartRecord, PartState, PartTask,
};

mod bos;
pub use bos::CompleteMultipartUploadResult;

mod uploader;
pub use uploader::Uploader;

mod coordinator;
pub use coordinator::{CancelHandle, CompletedUpload, MultipartUpload, UploadState};

mod post_object;
pub use post_object::PostObjectOutput;
