use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, Credentials, ProfileUpdate, SignupRequest};
use crate::records::AuthenticatedUser;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("nothing to update")]
    EmptyUpdate,
}

/// Login, signup, logout and profile flows over the shared session.
#[derive(Clone, Debug)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Re-hydrates the user behind a stored token. Returns `None` when there
    /// is no token or the server no longer accepts it; the stale token is
    /// dropped in that case.
    pub async fn restore(&self) -> Option<AuthenticatedUser> {
        let session = self.api.session();
        if !session.has_token() {
            return None;
        }
        match self.api.profile().await {
            Ok(resp) => {
                session.attach_user(resp.data.clone());
                Some(resp.data)
            }
            Err(ApiError::Unauthorized) => None,
            Err(e) => {
                warn!(error = %e, "profile re-hydration failed, dropping stored token");
                session.sign_out();
                None
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let payload = self.api.login(&credentials).await?.into_data();
        self.api
            .session()
            .establish(&payload.token, payload.user.clone())?;
        Ok(payload.user)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthenticatedUser, AuthError> {
        let payload = self.api.signup(request).await?.into_data();
        self.api
            .session()
            .establish(&payload.token, payload.user.clone())?;
        Ok(payload.user)
    }

    /// The remote logout is best effort; the local session is always cleared.
    pub async fn logout(&self) {
        if self.api.session().has_token() {
            if let Err(e) = self.api.logout().await {
                warn!(error = %e, "remote logout failed");
            }
        }
        self.api.session().sign_out();
        info!("signed out");
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<AuthenticatedUser, AuthError> {
        if update.is_empty() {
            return Err(AuthError::EmptyUpdate);
        }
        let user = self.api.update_profile(update).await?.into_data();
        self.api.session().replace_user(user.clone());
        Ok(user)
    }
}
