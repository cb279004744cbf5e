//! Sign-in session: token exchange, durable persistence and the bearer header.

use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::credentials::{AUTH_TOKEN_KEY, AUTH_USER_KEY, CredentialError},
    dto::auth::{AuthUser, LoginRequest},
    error::ScoreError,
    state::SharedState,
};

/// Exchange credentials for a token, persist both token and user, and attach the token to
/// every later remote call.
pub async fn login(
    state: &SharedState,
    email: impl Into<String>,
    password: impl Into<String>,
) -> Result<AuthUser, ScoreError> {
    let request = LoginRequest {
        email: email.into().trim().to_string(),
        password: password.into(),
    };
    request.validate()?;

    let response = state.api().login(request).await?;
    let user_json =
        serde_json::to_string(&response.user).map_err(|source| CredentialError::Encode {
            key: AUTH_USER_KEY,
            source,
        })?;

    let credentials = state.credentials();
    credentials.set(AUTH_TOKEN_KEY, &response.token)?;
    if let Err(err) = credentials.set(AUTH_USER_KEY, &user_json) {
        // Never leave a token without its user behind.
        if let Err(cleanup) = credentials.remove(AUTH_TOKEN_KEY) {
            warn!(error = %cleanup, "failed to discard half-stored sign-in");
        }
        return Err(err.into());
    }

    state.api().set_bearer_token(Some(response.token)).await;
    state.set_current_user(Some(response.user.clone())).await;
    info!(user_id = %response.user.id, "signed in");
    Ok(response.user)
}

/// Forget the persisted credentials and stop sending the token.
pub async fn logout(state: &SharedState) -> Result<(), ScoreError> {
    let credentials = state.credentials();
    credentials.remove(AUTH_TOKEN_KEY)?;
    credentials.remove(AUTH_USER_KEY)?;

    state.api().set_bearer_token(None).await;
    state.set_current_user(None).await;
    info!("signed out");
    Ok(())
}

/// Reload a persisted sign-in at start-up. Both token and user must be present and
/// readable; otherwise nothing is restored.
pub async fn restore(state: &SharedState) -> Result<Option<AuthUser>, ScoreError> {
    let credentials = state.credentials();
    let (Some(token), Some(user_json)) = (
        credentials.get(AUTH_TOKEN_KEY)?,
        credentials.get(AUTH_USER_KEY)?,
    ) else {
        return Ok(None);
    };

    let user: AuthUser = match serde_json::from_str(&user_json) {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "stored user is unreadable; ignoring persisted sign-in");
            return Ok(None);
        }
    };

    state.api().set_bearer_token(Some(token)).await;
    state.set_current_user(Some(user.clone())).await;
    info!(user_id = %user.id, "restored sign-in");
    Ok(Some(user))
}
