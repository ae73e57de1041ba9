//! Thin HTTP client resolving a bearer token to a user profile, grounded on
//! `original_source/phiraapi.py`'s `PhiraFetcher.get_user_info`: `GET {base}/me`
//! with a bearer token, retried a fixed number of times with a fixed wait.

use protocol::UserProfile;
use serde::Deserialize;

use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    id: i32,
    name: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_wait: std::time::Duration,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, retry_attempts: u32, retry_wait_ms: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            retry_attempts: retry_attempts.max(1),
            retry_wait: std::time::Duration::from_millis(retry_wait_ms),
        }
    }

    /// Resolves `token` to a `UserProfile`, retrying transport errors and
    /// non-2xx responses up to `retry_attempts` times with a fixed delay
    /// between attempts. Never retries after a successful 2xx response.
    pub async fn resolve(&self, token: &str) -> Result<UserProfile, AuthError> {
        let url = format!("{}me", ensure_trailing_slash(&self.base_url));
        let mut last_err = None;

        for attempt in 0..self.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_wait).await;
            }
            match self.try_once(&url, token).await {
                Ok(profile) => return Ok(profile),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.expect("loop runs at least once"))
    }

    async fn try_once(&self, url: &str, token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::BadStatus(response.status()));
        }

        let body: IdentityResponse = response.json().await?;
        Ok(UserProfile::new(body.id, body.name))
    }
}

fn ensure_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensures_trailing_slash() {
        assert_eq!(ensure_trailing_slash("https://x.test"), "https://x.test/");
        assert_eq!(ensure_trailing_slash("https://x.test/"), "https://x.test/");
    }
}
