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

use std::fmt::{Debug, Formatter};

use bcesign_core::{utils::Redact, SigningCredential};

/// Credential for bos.
///
/// A credential never changes after it has been built. Temporary (STS)
/// credentials carry a `session_token`, sent as `x-bce-security-token`.
#[derive(Clone, Default)]
pub struct Credential {
    /// Access key id for bos
    pub access_key_id: String,
    /// Secret access key for bos
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl Credential {
    /// Create a new credential.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::new(
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            Some("temporary-session-token".to_string()),
        );

        let s = format!("{cred:?}");
        assert!(s.contains("aaa***aaa"));
        assert!(!s.contains("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert!(!s.contains("temporary-session-token"));
    }

    #[test]
    fn test_is_valid() {
        assert!(Credential::new("ak", "sk", None).is_valid());
        assert!(!Credential::new("ak", "", None).is_valid());
        assert!(!Credential::new("", "sk", None).is_valid());
    }
}
