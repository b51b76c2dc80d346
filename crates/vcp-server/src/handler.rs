//! Per-connection command dispatch.
//!
//! Each connection carries exactly one command. The dispatcher reads the
//! command name, drives the matching exchange to completion, and returns;
//! the caller then closes the stream. Any transport failure ends the
//! exchange immediately with an error.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};
use vcp_auth::{AuthError, AuthResult, CredentialStore, NewUser};
use vcp_protocol::{
    drain_file, is_partial_file, recv_file, recv_string, send_ack, send_end, send_frame,
    validate_project_name, validate_relative_path, AuthCommand, Command, OutgoingFile, Silent,
};
use vcp_types::{SessionToken, UserId};

use crate::config::{ServerConfig, USERS_DIR};
use crate::error::{ServerError, ServerResult};
use crate::walk::list_files;

/// Drives one connection's request/response exchange.
pub struct Dispatcher {
    config: Arc<ServerConfig>,
    credentials: Arc<dyn CredentialStore>,
}

impl Dispatcher {
    pub fn new(config: Arc<ServerConfig>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Run a credential store operation off the async executor.
    async fn credentials<T, F>(&self, op: F) -> ServerResult<AuthResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CredentialStore) -> AuthResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ServerError::Internal(format!("credential task failed: {e}")))
    }

    async fn resolve(&self, token: String) -> ServerResult<AuthResult<UserId>> {
        self.credentials(move |store| store.resolve_session(&token))
            .await
    }

    /// Read one command and serve it.
    pub async fn handle<S>(&self, stream: &mut S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let name = recv_string(stream).await?;
        let Some(command) = Command::parse(&name) else {
            warn!(command = %name, "unknown command");
            send_ack(stream, false).await?;
            return Ok(());
        };
        debug!(%command, "command received");
        match command {
            Command::Submit => self.submit(stream).await,
            Command::Clone => self.clone_project(stream).await,
            Command::List => self.list(stream).await,
            Command::Auth => self.auth(stream).await,
        }
    }

    async fn submit<S>(&self, stream: &mut S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let token = recv_string(stream).await?;
        let user = match self.resolve(token).await? {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "submit refused");
                send_ack(stream, false).await?;
                return Ok(());
            }
        };

        let project = recv_string(stream).await?;
        if let Err(e) = validate_project_name(&project) {
            warn!(user = %user, error = %e, "submit refused");
            send_ack(stream, false).await?;
            return Ok(());
        }
        let project_dir = self.config.user_root(&user).join(&project);
        if let Err(e) = tokio::fs::create_dir_all(&project_dir).await {
            error!(user = %user, project = %project, error = %e, "cannot create project directory");
            send_ack(stream, false).await?;
            return Ok(());
        }
        send_ack(stream, true).await?;

        let mut all_ok = true;
        let mut received = 0usize;
        loop {
            let path = recv_string(stream).await?;
            if path.is_empty() {
                break;
            }
            let checked = validate_relative_path(&path).and_then(|()| {
                if is_partial_file(&path) {
                    Err(vcp_protocol::ProtocolError::UnsafePath {
                        path: path.clone(),
                        reason: "reserved suffix".into(),
                    })
                } else {
                    Ok(())
                }
            });
            if let Err(e) = checked {
                warn!(user = %user, project = %project, error = %e, "path rejected");
                drain_file(stream).await?;
                send_ack(stream, false).await?;
                all_ok = false;
                continue;
            }

            let dest = project_dir.join(&path);
            match recv_file(stream, &dest, &mut Silent).await {
                Ok(bytes) => {
                    debug!(project = %project, path = %path, bytes, "file received");
                    received += 1;
                    send_ack(stream, true).await?;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(project = %project, path = %path, error = %e, "file not stored");
                    all_ok = false;
                    send_ack(stream, false).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        send_ack(stream, all_ok).await?;
        info!(user = %user, project = %project, files = received, ok = all_ok, "submit completed");
        Ok(())
    }

    /// A failure here only delays the directory until the first submit.
    async fn create_user_root(&self, user: &UserId) {
        let dir = self.config.user_root(user);
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => debug!(user = %user, "user directory created"),
            Err(e) => warn!(user = %user, error = %e, "cannot create user directory"),
        }
    }

    /// `users` is refused in any letter case, since the data root may sit on
    /// a case-insensitive filesystem.
    fn cloneable_dir(&self, project: &str) -> Option<PathBuf> {
        if validate_project_name(project).is_err() || project.eq_ignore_ascii_case(USERS_DIR) {
            return None;
        }
        let dir = self.config.data_root.join(project);
        dir.is_dir().then_some(dir)
    }

    async fn clone_project<S>(&self, stream: &mut S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let project = recv_string(stream).await?;
        let Some(dir) = self.cloneable_dir(&project) else {
            warn!(project = %project, "clone refused");
            send_ack(stream, false).await?;
            return Ok(());
        };
        send_ack(stream, true).await?;

        let files = tokio::task::spawn_blocking(move || list_files(&dir))
            .await
            .map_err(|e| ServerError::Internal(format!("walk task failed: {e}")))??;

        let mut sent = 0usize;
        for file in files {
            // Open first so an unreadable file is skipped before its path is announced.
            let outgoing = match OutgoingFile::open(&file.path).await {
                Ok(outgoing) => outgoing,
                Err(e) => {
                    warn!(project = %project, path = %file.relative, error = %e, "skipping file");
                    continue;
                }
            };
            send_frame(stream, file.relative.as_bytes()).await?;
            outgoing.send(stream, &mut Silent).await?;
            sent += 1;
        }
        send_end(stream).await?;
        info!(project = %project, files = sent, "clone completed");
        Ok(())
    }

    async fn list<S>(&self, stream: &mut S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let token = recv_string(stream).await?;
        if token.is_empty() {
            send_end(stream).await?;
            return Ok(());
        }
        let user = match self.resolve(token).await? {
            Ok(user) => user,
            Err(e) => {
                debug!(error = %e, "list with invalid session");
                send_end(stream).await?;
                return Ok(());
            }
        };

        let root = self.config.user_root(&user);
        let files = tokio::task::spawn_blocking(move || list_files(&root))
            .await
            .map_err(|e| ServerError::Internal(format!("walk task failed: {e}")))??;
        for file in &files {
            send_frame(stream, file.relative.as_bytes()).await?;
        }
        send_end(stream).await?;
        debug!(user = %user, files = files.len(), "list completed");
        Ok(())
    }

    async fn auth<S>(&self, stream: &mut S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let sub = recv_string(stream).await?;
        let outcome = match AuthCommand::parse(&sub) {
            Some(AuthCommand::Signup) => {
                let email = recv_string(stream).await?;
                let full_name = recv_string(stream).await?;
                let password = recv_string(stream).await?;
                let phone = recv_string(stream).await?;
                let user = NewUser::new(email, full_name, password, phone);
                let created = self
                    .credentials(move |store| {
                        let id = store.create_user(&user)?;
                        let token = store.create_session(&id)?;
                        Ok((id, token))
                    })
                    .await?;
                match created {
                    Ok((id, token)) => {
                        self.create_user_root(&id).await;
                        Ok(token)
                    }
                    Err(e) => Err(e),
                }
            }
            Some(AuthCommand::Login) => {
                let email = recv_string(stream).await?;
                let password = recv_string(stream).await?;
                self.credentials(move |store| {
                    let id = store.authenticate(&email, &password)?;
                    store.create_session(&id)
                })
                .await?
            }
            None => {
                warn!(command = %sub, "unknown auth command");
                send_ack(stream, false).await?;
                send_frame(stream, format!("Unknown AUTH command: {sub}").as_bytes()).await?;
                return Ok(());
            }
        };
        reply_auth(stream, &sub, outcome).await
    }
}

/// Message sent to the client for a failed auth request.
fn client_message(err: &AuthError) -> String {
    if err.is_client_error() {
        err.to_string()
    } else {
        "internal server error".to_string()
    }
}

async fn reply_auth<S>(stream: &mut S, sub: &str, outcome: AuthResult<SessionToken>) -> ServerResult<()>
where
    S: AsyncWrite + Unpin + Send,
{
    match outcome {
        Ok(token) => {
            info!(command = %sub.to_ascii_uppercase(), "auth succeeded");
            send_ack(stream, true).await?;
            send_frame(stream, token.as_str().as_bytes()).await?;
        }
        Err(e) => {
            if e.is_client_error() {
                info!(command = %sub.to_ascii_uppercase(), error = %e, "auth failed");
            } else {
                error!(command = %sub.to_ascii_uppercase(), error = %e, "auth failed");
            }
            send_ack(stream, false).await?;
            send_frame(stream, client_message(&e).as_bytes()).await?;
        }
    }
    Ok(())
}
