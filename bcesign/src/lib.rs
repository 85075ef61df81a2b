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

//! Signing and uploading for Baidu Object Storage (BOS).
//!
//! This crate bundles the `bcesign` crates behind one dependency:
//!
//! - [`bos`]: `bce-auth-v1` signing, presigned urls and post policies
//! - [`upload`]: multipart uploads and form uploads, behind the `upload` feature
//! - [`default_context`]: a ready to use [`Context`], behind the `default-context` feature
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> bcesign::Result<()> {
//! let signer = bcesign::bos::default_signer();
//!
//! let mut req = http::Request::get("https://bj.bcebos.com/bucket/object.txt")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut req, None).await?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use bcesign_core::*;

pub mod bos;

#[cfg(feature = "upload")]
pub mod upload {
    //! Multipart and form uploads.
    pub use bcesign_upload::*;
}

/// Create a context that sends requests with reqwest and reads the OS
/// environment.
#[cfg(feature = "default-context")]
pub fn default_context() -> Context {
    Context::new()
        .with_http_send(bcesign_http_send_reqwest::ReqwestHttpSend::default())
        .with_env(OsEnv)
}
