use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use vcp_protocol::{
    drain_file, is_partial_file, recv_ack, recv_file, recv_string, send_end, send_frame,
    validate_project_name, validate_relative_path, AuthCommand, Command, OutgoingFile,
    ProtocolError,
};
use vcp_store::Repository;
use vcp_types::SessionToken;

use crate::error::{ClientError, ClientResult};

/// Called as `(path, bytes_done, bytes_total)` while a file is streamed.
pub type ProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Account details for `AUTH SIGNUP`.
#[derive(Clone)]
pub struct Signup {
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// Empty if the user gave none.
    pub phone: String,
}

impl std::fmt::Debug for Signup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signup")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// Outcome of a submission, file by file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub project: String,
    /// Files the server stored.
    pub accepted: Vec<String>,
    /// Files the server refused.
    pub rejected: Vec<String>,
    /// Files that could not be read locally, with the reason. Never sent.
    pub skipped: Vec<(String, String)>,
    /// The server's final verdict on the whole submission.
    pub complete: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloneReport {
    pub dest: PathBuf,
    pub files: Vec<String>,
    /// Paths refused because they would land outside `dest`, or local write failures.
    pub skipped: Vec<(String, String)>,
    pub bytes: u64,
}

/// One-connection-per-request client.
#[derive(Clone)]
pub struct Client {
    addr: String,
    progress: Option<ProgressFn>,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> ClientResult<TcpStream> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn reporter(&self, path: &str) -> impl FnMut(u64, u64) {
        let progress = self.progress.clone();
        let path = path.to_string();
        move |done, total| {
            if let Some(cb) = &progress {
                cb(&path, done, total);
            }
        }
    }

    pub async fn signup(&self, account: &Signup) -> ClientResult<SessionToken> {
        let mut stream = self.connect().await?;
        send_frame(&mut stream, Command::Auth.as_str().as_bytes()).await?;
        send_frame(&mut stream, AuthCommand::Signup.as_str().as_bytes()).await?;
        for field in [
            &account.email,
            &account.full_name,
            &account.password,
            &account.phone,
        ] {
            send_frame(&mut stream, field.as_bytes()).await?;
        }
        read_auth_reply(&mut stream).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<SessionToken> {
        let mut stream = self.connect().await?;
        send_frame(&mut stream, Command::Auth.as_str().as_bytes()).await?;
        send_frame(&mut stream, AuthCommand::Login.as_str().as_bytes()).await?;
        send_frame(&mut stream, email.as_bytes()).await?;
        send_frame(&mut stream, password.as_bytes()).await?;
        read_auth_reply(&mut stream).await
    }

    /// Upload every tracked file of `repo` under the tracker's project name.
    pub async fn submit(&self, token: &SessionToken, repo: &Repository) -> ClientResult<SubmitReport> {
        let tracker = repo.tracker()?;
        let project = tracker.project().to_string();
        validate_project_name(&project)?;

        let mut stream = self.connect().await?;
        send_frame(&mut stream, Command::Submit.as_str().as_bytes()).await?;
        send_frame(&mut stream, token.as_str().as_bytes()).await?;
        send_frame(&mut stream, project.as_bytes()).await?;
        if !recv_ack(&mut stream).await? {
            return Err(ClientError::Refused(format!(
                "submission of {project} (is the session still valid?)"
            )));
        }

        let mut report = SubmitReport {
            project: project.clone(),
            ..SubmitReport::default()
        };
        for entry in tracker.files() {
            let path = entry.path;
            let outgoing = match OutgoingFile::open(repo.root().join(path)).await {
                Ok(outgoing) => outgoing,
                Err(e) => {
                    warn!(path, error = %e, "skipping unreadable file");
                    report.skipped.push((path.to_string(), e.to_string()));
                    continue;
                }
            };
            send_frame(&mut stream, path.as_bytes()).await?;
            let bytes = outgoing.send(&mut stream, &mut self.reporter(path)).await?;
            if recv_ack(&mut stream).await? {
                debug!(path, bytes, "file accepted");
                report.accepted.push(path.to_string());
            } else {
                warn!(path, "file rejected by server");
                report.rejected.push(path.to_string());
            }
        }
        send_end(&mut stream).await?;
        report.complete = recv_ack(&mut stream).await?;
        info!(
            project = %project,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            skipped = report.skipped.len(),
            "submit finished"
        );
        Ok(report)
    }

    /// Download `project` into `dest`, which must not exist yet.
    pub async fn clone_project(&self, project: &str, dest: &Path) -> ClientResult<CloneReport> {
        validate_project_name(project)?;
        if dest.exists() {
            return Err(ClientError::DestinationExists(dest.to_path_buf()));
        }

        let mut stream = self.connect().await?;
        send_frame(&mut stream, Command::Clone.as_str().as_bytes()).await?;
        send_frame(&mut stream, project.as_bytes()).await?;
        if !recv_ack(&mut stream).await? {
            return Err(ClientError::Refused(format!("no project named {project}")));
        }
        tokio::fs::create_dir_all(dest).await?;

        let mut report = CloneReport {
            dest: dest.to_path_buf(),
            ..CloneReport::default()
        };
        loop {
            let path = recv_string(&mut stream).await?;
            if path.is_empty() {
                break;
            }
            if let Err(e) = check_received_path(&path) {
                warn!(path = %path, error = %e, "refusing path from server");
                drain_file(&mut stream).await?;
                report.skipped.push((path, e.to_string()));
                continue;
            }
            let mut progress = self.reporter(&path);
            match recv_file(&mut stream, &dest.join(&path), &mut progress).await {
                Ok(bytes) => {
                    report.bytes += bytes;
                    report.files.push(path);
                }
                Err(e) if !e.is_fatal() => {
                    warn!(path = %path, error = %e, "file not written");
                    report.skipped.push((path, e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(project, files = report.files.len(), bytes = report.bytes, "clone finished");
        Ok(report)
    }

    /// Every file the token's owner has submitted, as `project/path`.
    ///
    /// Without a token an empty token frame is sent; the server answers an
    /// anonymous listing with no entries.
    pub async fn list(&self, token: Option<&SessionToken>) -> ClientResult<Vec<String>> {
        let mut stream = self.connect().await?;
        send_frame(&mut stream, Command::List.as_str().as_bytes()).await?;
        let token = token.map(SessionToken::as_str).unwrap_or_default();
        send_frame(&mut stream, token.as_bytes()).await?;
        let mut files = Vec::new();
        loop {
            let path = recv_string(&mut stream).await?;
            if path.is_empty() {
                return Ok(files);
            }
            files.push(path);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.addr)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

fn check_received_path(path: &str) -> Result<(), ProtocolError> {
    validate_relative_path(path)?;
    if is_partial_file(path) {
        return Err(ProtocolError::UnsafePath {
            path: path.to_string(),
            reason: "reserved suffix".into(),
        });
    }
    Ok(())
}

async fn read_auth_reply(stream: &mut TcpStream) -> ClientResult<SessionToken> {
    let ok = recv_ack(stream).await?;
    let body = recv_string(stream).await?;
    if !ok {
        return Err(ClientError::Refused(body));
    }
    SessionToken::new(body).map_err(|_| ClientError::InvalidToken)
}
