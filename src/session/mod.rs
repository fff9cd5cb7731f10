use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::records::AuthenticatedUser;

/// Durable storage for the single bearer token. Absence means anonymous.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    /// The server rejected the token; the user has to sign in again.
    Expired,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to persist session token: {source}")]
    Storage {
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<AuthenticatedUser>,
}

struct Inner {
    store: Box<dyn TokenStore>,
    state: RwLock<SessionState>,
    status: watch::Sender<SessionStatus>,
}

/// Process-wide session handle passed explicitly to the components that need
/// it. Clones share state; only the methods below mutate it.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status())
            .field("has_token", &self.has_token())
            .finish()
    }
}

impl Session {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to read stored session token");
                None
            }
        };
        let (status, _) = watch::channel(SessionStatus::Anonymous);
        Self {
            inner: Arc::new(Inner {
                store,
                state: RwLock::new(SessionState { token, user: None }),
                status,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::<MemoryTokenStore>::default())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn has_token(&self) -> bool {
        self.read(|s| s.token.is_some())
    }

    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.read(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.user.is_some())
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn establish(&self, token: &str, user: AuthenticatedUser) -> Result<(), SessionError> {
        self.inner
            .store
            .save(token)
            .map_err(|source| SessionError::Storage { source })?;
        info!(user = %user.email, "session established");
        self.write(|s| {
            s.token = Some(token.to_string());
            s.user = Some(user);
        });
        self.inner.status.send_replace(SessionStatus::Authenticated);
        Ok(())
    }

    /// Profile re-hydration for a token that was already stored.
    pub fn attach_user(&self, user: AuthenticatedUser) {
        self.write(|s| s.user = Some(user));
        self.inner.status.send_replace(SessionStatus::Authenticated);
    }

    pub fn replace_user(&self, user: AuthenticatedUser) {
        debug!(user = %user.email, "session user replaced");
        self.write(|s| s.user = Some(user));
    }

    pub fn sign_out(&self) {
        self.clear_local();
        self.inner.status.send_replace(SessionStatus::Anonymous);
    }

    /// Drops the token after the server rejected it and signals every
    /// subscriber that re-authentication is required.
    pub fn invalidate(&self) {
        warn!("session token rejected by server, signing out");
        self.clear_local();
        self.inner.status.send_replace(SessionStatus::Expired);
    }

    fn clear_local(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "failed to clear stored session token");
        }
        self.write(|s| {
            s.token = None;
            s.user = None;
        });
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.inner.state.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut SessionState)) {
        let mut guard = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}
