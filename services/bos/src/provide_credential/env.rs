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

use async_trait::async_trait;
use bcesign_core::{Context, ProvideCredential, Result};

use crate::{constants::*, Credential};

/// EnvCredentialProvider loads bos credentials from environment variables.
///
/// - `BCE_ACCESS_KEY_ID`: The access key id
/// - `BCE_SECRET_ACCESS_KEY`: The secret access key
/// - `BCE_SESSION_TOKEN`: The session token (optional)
#[derive(Debug, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        match (
            envs.get(BCE_ACCESS_KEY_ID),
            envs.get(BCE_SECRET_ACCESS_KEY),
        ) {
            (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => Ok(Some(Credential {
                access_key_id: ak.clone(),
                secret_access_key: sk.clone(),
                session_token: envs.get(BCE_SESSION_TOKEN).cloned(),
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcesign_core::StaticEnv;
    use std::collections::HashMap;
    use test_case::test_case;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_env_credential_provider() -> Result<()> {
        let ctx = ctx(&[
            (BCE_ACCESS_KEY_ID, "test_access_key"),
            (BCE_SECRET_ACCESS_KEY, "test_secret_key"),
            (BCE_SESSION_TOKEN, "test_session_token"),
        ]);

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!("test_access_key", cred.access_key_id);
        assert_eq!("test_secret_key", cred.secret_access_key);
        assert_eq!(Some("test_session_token".to_string()), cred.session_token);
        Ok(())
    }

    #[test_case(&[]; "missing")]
    #[test_case(&[(BCE_ACCESS_KEY_ID, "ak")]; "only access key")]
    #[test_case(&[(BCE_ACCESS_KEY_ID, "ak"), (BCE_SECRET_ACCESS_KEY, "")]; "empty secret key")]
    #[tokio::test]
    async fn test_env_credential_provider_incomplete(envs: &[(&str, &str)]) -> Result<()> {
        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx(envs))
            .await?;
        assert!(cred.is_none());
        Ok(())
    }
}
