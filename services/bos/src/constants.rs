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

use std::collections::HashSet;

use once_cell::sync::Lazy;

// Authorization version prefix.
pub const BCE_AUTH_VERSION: &str = "bce-auth-v1";
pub const DEFAULT_EXPIRATION_IN_SECONDS: u64 = 1800;

// Headers used in bos.
pub const X_BCE_PREFIX: &str = "x-bce-";
pub const X_BCE_DATE: &str = "x-bce-date";
pub const X_BCE_SECURITY_TOKEN: &str = "x-bce-security-token";
pub const CONTENT_MD5: &str = "content-md5";

// Query used by presigned urls.
pub const AUTHORIZATION_QUERY: &str = "authorization";

// Env values used in bos.
pub const BCE_ACCESS_KEY_ID: &str = "BCE_ACCESS_KEY_ID";
pub const BCE_SECRET_ACCESS_KEY: &str = "BCE_SECRET_ACCESS_KEY";
pub const BCE_SESSION_TOKEN: &str = "BCE_SESSION_TOKEN";

/// Headers signed by default besides every `x-bce-*` header.
pub static DEFAULT_SIGNED_HEADERS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["host", "content-length", "content-type", "content-md5"]));
