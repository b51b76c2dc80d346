use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vcp", about = "VCP: a small content-addressed version control system", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Server address for submit, clone, list, signup and login
    #[arg(long, global = true, default_value = "127.0.0.1:8080")]
    pub server: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new project in a directory
    Init(InitArgs),
    /// Stage files or directories
    Add(AddArgs),
    /// Show the working tree compared with the tracker
    Status,
    /// Record the staged files as a commit
    Commit(CommitArgs),
    /// Show commit history
    Log(LogArgs),
    /// Upload the staged files to the server
    Submit,
    /// Download a project from the server
    Clone(CloneArgs),
    /// List the files you have submitted
    List,
    /// Create an account and log in
    Signup(SignupArgs),
    /// Log in and cache the session token
    Login(LoginArgs),
    /// Run the VCP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project directory (defaults to the current directory)
    pub path: Option<PathBuf>,
    /// Project name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long)]
    pub message: String,
    /// Defaults to $USER
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct CloneArgs {
    pub project: String,
    /// Destination directory (defaults to the project name)
    pub dest: Option<PathBuf>,
}

#[derive(Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    /// Read from stdin if omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Read from stdin if omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub root: Option<PathBuf>,
    #[arg(long)]
    pub database: Option<PathBuf>,
    #[arg(long)]
    pub max_connections: Option<usize>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
