use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, warn};
use vcp_client::{Client, SessionCache, Signup};
use vcp_index::{stage, status, DefaultIgnore};
use vcp_protocol::validate_project_name;
use vcp_server::{ServerConfig, VcpServer};
use vcp_store::{stamped_project_name, Repository};

use crate::cli::*;
use crate::logging;

/// Everything a command needs besides its own arguments.
pub struct RunContext {
    pub cwd: PathBuf,
    pub format: OutputFormat,
    pub verbose: bool,
    pub client: Client,
    /// Token cache; `~/.vcp_session` unless set.
    pub session_file: Option<PathBuf>,
}

impl RunContext {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let client = Client::new(cli.server.clone());
        let client = if cli.format == OutputFormat::Text {
            client.with_progress(Arc::new(|path: &str, done: u64, total: u64| {
                if done == total {
                    eprintln!("  {} {} ({} bytes)", "✓".green(), path, total);
                }
            }))
        } else {
            client
        };
        Ok(Self {
            cwd: std::env::current_dir()?,
            format: cli.format,
            verbose: cli.verbose,
            client,
            session_file: None,
        })
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn session(&self) -> anyhow::Result<SessionCache> {
        Ok(match &self.session_file {
            Some(path) => SessionCache::new(path),
            None => SessionCache::in_home()?,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    fn repo(&self) -> anyhow::Result<Repository> {
        Repository::discover(&self.cwd).context("not inside a VCP project (run `vcp init`)")
    }
}

pub async fn run_command(command: Command, ctx: &RunContext) -> anyhow::Result<()> {
    debug!(cwd = %ctx.cwd.display(), server = ctx.client.addr(), "running command");
    match command {
        Command::Init(args) => cmd_init(args, ctx),
        Command::Add(args) => cmd_add(args, ctx),
        Command::Status => cmd_status(ctx),
        Command::Commit(args) => cmd_commit(args, ctx),
        Command::Log(args) => cmd_log(args, ctx),
        Command::Submit => cmd_submit(ctx).await,
        Command::Clone(args) => cmd_clone(args, ctx).await,
        Command::List => cmd_list(ctx).await,
        Command::Signup(args) => cmd_signup(args, ctx).await,
        Command::Login(args) => cmd_login(args, ctx).await,
        Command::Serve(args) => cmd_serve(args, ctx.verbose).await,
    }
}

fn cmd_init(args: InitArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let root = ctx.resolve(args.path.as_deref().unwrap_or(Path::new(".")));
    std::fs::create_dir_all(&root)?;
    let root = root.canonicalize()?;
    let base = match args.name {
        Some(name) => name,
        None => root
            .file_name()
            .and_then(|n| n.to_str())
            .context("cannot derive a project name from the directory; pass --name")?
            .to_string(),
    };
    let project = stamped_project_name(&base, chrono::Local::now().naive_local());
    validate_project_name(&project)?;
    Repository::init(&root, &project)?;

    if ctx.json() {
        println!("{}", json!({ "root": root, "project": project }));
    } else {
        println!("{} Initialized VCP project {} in {}", "✓".green().bold(), project.bold(), root.display());
    }
    Ok(())
}

fn cmd_add(args: AddArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let repo = ctx.repo()?;
    let rule = DefaultIgnore::load(repo.root())?;
    let mut staged = Vec::new();
    let mut skipped = Vec::new();
    for path in &args.paths {
        let report = stage(&repo, &ctx.resolve(path), &rule)?;
        staged.extend(report.files);
        skipped.extend(report.skipped);
    }

    if ctx.json() {
        let skipped: Vec<_> = skipped
            .iter()
            .map(|(path, reason)| json!({ "path": path, "reason": reason }))
            .collect();
        println!("{}", json!({ "staged": staged, "skipped": skipped }));
    } else {
        for path in &staged {
            println!("  {} {}", "staged:".green(), path);
        }
        for (path, reason) in &skipped {
            println!("  {} {} ({})", "skipped:".yellow(), path, reason.dimmed());
        }
    }
    Ok(())
}

fn cmd_status(ctx: &RunContext) -> anyhow::Result<()> {
    let repo = ctx.repo()?;
    let rule = DefaultIgnore::load(repo.root())?;
    let st = status(&repo, &rule)?;
    let project = repo.tracker()?.project().to_string();

    if ctx.json() {
        println!(
            "{}",
            json!({ "project": project, "new": st.new, "modified": st.modified, "deleted": st.deleted })
        );
        return Ok(());
    }
    println!("Project {}", project.bold());
    if st.is_clean() {
        println!("\nNothing to stage. Working directory matches the tracker.");
        return Ok(());
    }
    for path in &st.new {
        println!("  {} {}", "new:     ".green(), path);
    }
    for path in &st.modified {
        println!("  {} {}", "modified:".yellow(), path);
    }
    for path in &st.deleted {
        println!("  {} {}", "deleted: ".red(), path);
    }
    Ok(())
}

fn default_author() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn cmd_commit(args: CommitArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let repo = ctx.repo()?;
    if repo.tracker()?.files().next().is_none() {
        bail!("nothing staged; run `vcp add` first");
    }
    let author = args.author.unwrap_or_else(default_author);
    let id = repo.commit(&author, &args.message)?;

    if ctx.json() {
        println!("{}", json!({ "commit": id.to_hex() }));
    } else {
        println!("{} Committed {}", "✓".green().bold(), id.short_hex().yellow());
        println!("  {}", args.message);
    }
    Ok(())
}

fn cmd_log(args: LogArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let repo = ctx.repo()?;
    let history = repo.history(args.limit)?;

    if ctx.json() {
        let entries: Vec<_> = history
            .iter()
            .map(|(id, c)| {
                json!({
                    "commit": id.to_hex(),
                    "tree": c.tree.to_hex(),
                    "parents": c.parents.iter().map(|p| p.to_hex()).collect::<Vec<_>>(),
                    "author": c.author,
                    "message": c.message,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(entries));
        return Ok(());
    }
    if history.is_empty() {
        println!("No commits yet.");
    }
    for (id, commit) in &history {
        let summary = commit.message.lines().next().unwrap_or("");
        if args.oneline {
            println!("{} {}", id.short_hex().yellow(), summary);
        } else {
            println!("{} {}", "commit".yellow(), id.to_hex().yellow());
            println!("Author: {}", commit.author);
            println!("\n    {}\n", commit.message.replace('\n', "\n    "));
        }
    }
    Ok(())
}

async fn cmd_submit(ctx: &RunContext) -> anyhow::Result<()> {
    let repo = ctx.repo()?;
    let token = ctx.session()?.require()?;
    let report = ctx.client.submit(&token, &repo).await?;

    if ctx.json() {
        let skipped: Vec<_> = report
            .skipped
            .iter()
            .map(|(path, reason)| json!({ "path": path, "reason": reason }))
            .collect();
        println!(
            "{}",
            json!({
                "project": report.project,
                "accepted": report.accepted,
                "rejected": report.rejected,
                "skipped": skipped,
                "complete": report.complete,
            })
        );
    } else {
        for path in &report.rejected {
            println!("  {} {}", "rejected:".red(), path);
        }
        for (path, reason) in &report.skipped {
            println!("  {} {} ({})", "skipped:".yellow(), path, reason.dimmed());
        }
        if report.complete {
            println!(
                "{} Submitted {} ({} files)",
                "✓".green().bold(),
                report.project.bold(),
                report.accepted.len()
            );
        } else {
            println!("{} Submission of {} was incomplete", "✗".red().bold(), report.project.bold());
        }
    }
    if !report.complete {
        bail!("server reported failures for {} file(s)", report.rejected.len());
    }
    Ok(())
}

async fn cmd_clone(args: CloneArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let dest = ctx.resolve(args.dest.as_deref().unwrap_or(Path::new(&args.project)));
    let report = ctx.client.clone_project(&args.project, &dest).await?;

    if ctx.json() {
        println!(
            "{}",
            json!({ "dest": report.dest, "files": report.files, "bytes": report.bytes })
        );
    } else {
        for (path, reason) in &report.skipped {
            println!("  {} {} ({})", "skipped:".yellow(), path, reason.dimmed());
        }
        println!(
            "{} Cloned {} into {} ({} files, {} bytes)",
            "✓".green().bold(),
            args.project.bold(),
            dest.display(),
            report.files.len(),
            report.bytes
        );
    }
    Ok(())
}

async fn cmd_list(ctx: &RunContext) -> anyhow::Result<()> {
    let token = ctx.session()?.load()?;
    if token.is_none() {
        warn!("not logged in, listing anonymously");
    }
    let files = ctx.client.list(token.as_ref()).await?;
    if ctx.json() {
        println!("{}", json!(files));
    } else if files.is_empty() {
        println!("No submitted files.");
    } else {
        for file in &files {
            println!("{file}");
        }
    }
    Ok(())
}

fn read_password(given: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn cmd_signup(args: SignupArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let account = Signup {
        email: args.email,
        full_name: args.name,
        password: read_password(args.password)?,
        phone: args.phone,
    };
    let token = ctx.client.signup(&account).await?;
    ctx.session()?.save(&token)?;
    println!("{} Signed up and logged in as {}", "✓".green().bold(), account.email.bold());
    Ok(())
}

async fn cmd_login(args: LoginArgs, ctx: &RunContext) -> anyhow::Result<()> {
    let password = read_password(args.password)?;
    let token = ctx.client.login(&args.email, &password).await?;
    ctx.session()?.save(&token)?;
    println!("{} Logged in as {}", "✓".green().bold(), args.email.bold());
    Ok(())
}

/// The server configuration: file first, then flag overrides.
pub fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = &args.root {
        config.data_root = root.clone();
    }
    if let Some(db) = &args.database {
        config.database = db.clone();
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if let Some(log) = &args.log_file {
        config.log_file = Some(log.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(args: ServeArgs, verbose: bool) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    logging::init_server(verbose, config.log_file.as_deref())?;
    let server = VcpServer::open(config).await?;
    println!("VCP server on {}", server.local_addr()?.to_string().bold());
    server.serve().await?;
    Ok(())
}
