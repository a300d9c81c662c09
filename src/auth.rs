//! Token-based authentication against the Primary auth endpoint

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::env::EnvironmentContext;
use crate::error::{Result, RofexError};

pub(crate) const AUTH_PATH: &str = "auth/getToken";
const TOKEN_HEADER: &str = "X-Auth-Token";

/// Exchanges the environment's user/password for a bearer token.
///
/// On success the token is stored in the shared [`EnvironmentContext`] and the
/// environment is marked initialized; on failure the state is left untouched.
pub struct Authenticator {
    ctx: EnvironmentContext,
    http: reqwest::Client,
}

impl Authenticator {
    pub fn new(ctx: EnvironmentContext, http: reqwest::Client) -> Self {
        Self { ctx, http }
    }

    /// Builds a reqwest client honoring the environment's TLS and proxy settings.
    pub(crate) fn build_http_client(ctx: &EnvironmentContext) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if !ctx.config().verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(proxy) = &ctx.config().proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }
        Ok(builder.build()?)
    }

    /// POSTs the credentials and stores the returned token.
    pub async fn authenticate(&self) -> Result<()> {
        let url = self.ctx.config().rest_url.join(AUTH_PATH)?;
        let (user, password) = self.ctx.credentials();
        debug!(%url, %user, "requesting auth token");

        let response = self
            .http
            .post(url)
            .header("X-Username", user)
            .header("X-Password", password)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "authentication rejected");
            return Err(RofexError::Authentication(auth_failure_message(status)));
        }

        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                RofexError::Authentication(format!(
                    "auth response is missing the {TOKEN_HEADER} header"
                ))
            })?;

        self.ctx.set_token(token);
        info!("authentication succeeded, session initialized");
        Ok(())
    }
}

fn auth_failure_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "incorrect user or password".to_string(),
        other => format!("auth endpoint returned {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_names_bad_credentials() {
        assert_eq!(
            auth_failure_message(StatusCode::UNAUTHORIZED),
            "incorrect user or password"
        );
        assert!(auth_failure_message(StatusCode::BAD_GATEWAY).contains("502"));
    }
}
