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

//! BOS signing with convenience constructors.

pub use bcesign_bos::*;

use crate::Signer;

#[cfg(feature = "default-context")]
use crate::default_context;

/// Signer for BOS requests.
pub type DefaultSigner = Signer<Credential>;

/// Create a signer with the default context and credential chain.
///
/// Credentials are loaded from `BCE_ACCESS_KEY_ID`, `BCE_SECRET_ACCESS_KEY`
/// and the optional `BCE_SESSION_TOKEN`.
#[cfg(feature = "default-context")]
pub fn default_signer() -> DefaultSigner {
    Signer::new(
        default_context(),
        DefaultCredentialProvider::new(),
        RequestSigner::new(),
    )
}

/// Create an uploader for `endpoint` with the default signer and config.
///
/// ```no_run
/// # async fn example() -> bcesign::upload::Result<()> {
/// let uploader = bcesign::bos::default_uploader("https://bj.bcebos.com")?;
/// let source = bcesign::upload::FileSource::open("/tmp/large.bin").await?;
/// uploader.upload("bucket", "large.bin", &source).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "default-context", feature = "upload"))]
pub fn default_uploader(endpoint: &str) -> bcesign_upload::Result<bcesign_upload::Uploader> {
    bcesign_upload::Uploader::new(
        default_context(),
        default_signer(),
        endpoint,
        bcesign_upload::UploadConfig::default(),
    )
}
