use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::auth::{AuthError, Identity, IdentityVerifier};

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Verifies Firebase ID tokens through the Identity Toolkit `accounts:lookup`
/// endpoint. Custom claims arrive as a JSON string in `customAttributes`.
#[derive(Clone)]
pub struct FirebaseVerifier {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    custom_attributes: Option<String>,
}

impl FirebaseVerifier {
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(LOOKUP_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Identity provider returned {status}: {body}");
            return Err(AuthError::Provider(format!("status {status}")));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            admin: admin_claim(user.custom_attributes.as_deref()),
        })
    }
}

/// `true` only when the custom claims JSON carries `"admin": true`.
fn admin_claim(custom_attributes: Option<&str>) -> bool {
    custom_attributes
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .and_then(|claims| claims.get("admin").and_then(|v| v.as_bool()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_claim_requires_boolean_true() {
        assert!(admin_claim(Some(r#"{"admin":true}"#)));
        assert!(!admin_claim(Some(r#"{"admin":"true"}"#)));
        assert!(!admin_claim(Some(r#"{"admin":false}"#)));
        assert!(!admin_claim(Some("not json")));
        assert!(!admin_claim(None));
    }

    #[test]
    fn test_lookup_response_parses() {
        let body = r#"{"kind":"identitytoolkit#GetAccountInfoResponse","users":[{"localId":"abc","email":"a@b.c","customAttributes":"{\"admin\":true}"}]}"#;
        let parsed: LookupResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.users[0].local_id, "abc");
        assert!(admin_claim(parsed.users[0].custom_attributes.as_deref()));
    }
}
