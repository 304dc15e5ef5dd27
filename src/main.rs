use appyard::commands::*;
use appyard::core::{error::Result, print_error, workspace::find_parent_workspace};
use clap::{Parser, Subcommand};
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "appyard.log";

#[derive(Parser)]
#[command(name = "appyard")]
#[command(about = "Keep the app repositories of a workspace on consistent branches and versions")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Workspace directory (defaults to the current directory or its parents)
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and show the branch, commit and version of every app
    Status {
        /// Only update the state of this app
        #[arg(long)]
        app: Option<String>,
    },
    /// Switch apps to a branch, gating major-version upgrades
    SwitchToBranch {
        branch: String,
        /// Apps to switch (all apps if omitted)
        apps: Vec<String>,
        /// Confirm switching across a major version
        #[arg(long)]
        upgrade: bool,
        /// Do not compare major versions before switching
        #[arg(long = "no-check-upgrade")]
        no_check_upgrade: bool,
    },
    /// Switch apps to develop, upgrades allowed
    SwitchToDevelop {
        /// Apps to switch (all apps if omitted)
        apps: Vec<String>,
    },
    /// Check that a branch or tag exists on a remote
    ValidateBranch {
        remote: String,
        branch: Option<String>,
    },
    /// List the apps an app declares in its required_apps
    RequiredApps {
        /// `org/repo@branch`, or a hooks.py path with --local
        source: String,
        #[arg(long)]
        local: bool,
    },
    /// Show the current (and upstream) version of an app
    Version {
        app: String,
        /// Also resolve the version on this upstream branch
        #[arg(long)]
        upstream: Option<String>,
    },
    /// Point the upstream remote of an installed app at a git URL
    RemoteSetUrl { git_url: String },
    /// Rename an app folder to the app's canonical name
    ReconcileName { folder: String },
}

/// Log records go to stderr and, inside a workspace, to `logs/appyard.log`
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_logging(debug: bool, start: &Path) {
    // Configure logging based on --debug flag
    if debug {
        env::set_var("RUST_LOG", "debug");
    } else if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }

    let mut builder = env_logger::Builder::from_default_env();

    let logs_dir = find_parent_workspace(start).map(|root| root.join("logs"));
    if let Some(logs_dir) = logs_dir.filter(|dir| dir.is_dir()) {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(LOG_FILE))
        {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            }
            Err(e) => eprintln!("Could not open {}: {e}", logs_dir.join(LOG_FILE).display()),
        }
    }

    builder.init();
}

fn run(command: Commands, start: &Path) -> Result<()> {
    match command {
        Commands::Status { app } => execute_status(start, app),
        Commands::SwitchToBranch {
            branch,
            apps,
            upgrade,
            no_check_upgrade,
        } => execute_switch_to_branch(start, branch, apps, upgrade, !no_check_upgrade),
        Commands::SwitchToDevelop { apps } => execute_switch_to_develop(start, apps),
        Commands::ValidateBranch { remote, branch } => {
            execute_validate_branch(start, &remote, branch.as_deref())
        }
        Commands::RequiredApps { source, local } => execute_required_apps(start, &source, local),
        Commands::Version { app, upstream } => execute_version(start, &app, upstream.as_deref()),
        Commands::RemoteSetUrl { git_url } => execute_remote_set_url(start, &git_url),
        Commands::ReconcileName { folder } => execute_reconcile_name(start, &folder),
    }
}

fn main() {
    let cli = Cli::parse();

    let start = match cli.path {
        Some(path) => path,
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    init_logging(cli.debug, &start);

    if let Err(e) = run(cli.command, &start) {
        log::debug!("{e:?}");
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
