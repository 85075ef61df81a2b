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

use bcesign_core::hash::{base64_encode, hex_hmac_sha256};
use bcesign_core::time::{format_iso8601, DateTime};
use bcesign_core::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::constants::*;
use crate::credential::Credential;

/// PostPolicy restricts what a browser based `POST` upload may store.
///
/// - [PostObject](https://cloud.baidu.com/doc/BOS/s/Ikc5nv4kg)
#[derive(Debug, Clone, Serialize)]
pub struct PostPolicy {
    #[serde(serialize_with = "serialize_expiration")]
    expiration: DateTime,
    conditions: Vec<Value>,
}

fn serialize_expiration<S: Serializer>(t: &DateTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_iso8601(*t))
}

impl PostPolicy {
    /// Create a policy that stops being accepted at `expiration`.
    pub fn new(expiration: DateTime) -> Self {
        Self {
            expiration,
            conditions: Vec::new(),
        }
    }

    /// Only allow uploads into this bucket.
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.with_condition(json!({ "bucket": bucket }))
    }

    /// Only allow this exact object key.
    pub fn with_key(self, key: &str) -> Self {
        self.with_condition(json!({ "key": key }))
    }

    /// Only allow object keys starting with `prefix`.
    pub fn with_key_prefix(self, prefix: &str) -> Self {
        self.with_condition(json!(["starts-with", "$key", prefix]))
    }

    /// Limit the size of the uploaded object, both ends inclusive.
    pub fn with_content_length_range(self, min: u64, max: u64) -> Self {
        self.with_condition(json!(["content-length-range", min, max]))
    }

    /// Append a raw condition.
    pub fn with_condition(mut self, condition: Value) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Base64 encoded json of this policy.
    pub fn to_base64(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| Error::request_invalid("failed to serialize post policy").with_source(e))?;
        Ok(base64_encode(&json))
    }

    /// Sign the policy with the credential.
    pub fn sign(&self, cred: &Credential) -> Result<PostPolicyForm> {
        if cred.access_key_id.is_empty() || cred.secret_access_key.is_empty() {
            return Err(Error::config_invalid(
                "access key id and secret access key are required to sign post policy",
            ));
        }

        let policy = self.to_base64()?;
        let signature = hex_hmac_sha256(cred.secret_access_key.as_bytes(), policy.as_bytes());

        Ok(PostPolicyForm {
            access_key_id: cred.access_key_id.clone(),
            policy,
            signature,
            session_token: cred.session_token.clone(),
        })
    }
}

/// The signed form fields of a [`PostPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPolicyForm {
    /// Access key id that signed the policy.
    pub access_key_id: String,
    /// Base64 encoded policy.
    pub policy: String,
    /// Hex encoded signature of the policy.
    pub signature: String,
    /// Session token of temporary credentials.
    pub session_token: Option<String>,
}

impl PostPolicyForm {
    /// Form fields in the order they should be sent.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("accessKey", self.access_key_id.as_str()),
            ("policy", self.policy.as_str()),
            ("signature", self.signature.as_str()),
        ];
        if let Some(token) = &self.session_token {
            fields.push((X_BCE_SECURITY_TOKEN, token.as_str()));
        }
        fields
    }
}
