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

//! Baidu Cloud Object Storage (BOS) signing.
//!
//! This crate implements `bce-auth-v1`, the authentication protocol of
//! Baidu Cloud services.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bcesign_bos::{DefaultCredentialProvider, RequestSigner};
//! use bcesign_core::{Context, OsEnv, Result, Signer};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let signer = Signer::new(ctx, DefaultCredentialProvider::new(), RequestSigner::new());
//!
//!     let mut req = http::Request::get("https://bj.bcebos.com/bucket/object.txt")
//!         .body(())
//!         .unwrap()
//!         .into_parts()
//!         .0;
//!
//!     signer.sign(&mut req, None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! ```bash
//! export BCE_ACCESS_KEY_ID=your-access-key-id
//! export BCE_SECRET_ACCESS_KEY=your-secret-access-key
//! export BCE_SESSION_TOKEN=your-sts-token  # Optional, for STS
//! ```
//!
//! ## Presigned URLs
//!
//! Passing `expires_in` to [`bcesign_core::Signer::sign`] moves the
//! authorization string into the `authorization` query parameter:
//!
//! ```no_run
//! # use bcesign_bos::{RequestSigner, StaticCredentialProvider};
//! # use bcesign_core::{Context, Result, Signer};
//! # use std::time::Duration;
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(
//!     Context::new(),
//!     StaticCredentialProvider::new("access_key_id", "secret_access_key"),
//!     RequestSigner::new(),
//! );
//!
//! let mut req = http::Request::get("https://bj.bcebos.com/bucket/object.txt")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut req, Some(Duration::from_secs(3600))).await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod canonical;
pub use canonical::CanonicalRequest;

mod sign_request;
pub use sign_request::{sign, AuthorizationToken, RequestSigner, SigningTimeWindow};

mod policy;
pub use policy::{PostPolicy, PostPolicyForm};

mod provide_credential;
pub use provide_credential::*;
