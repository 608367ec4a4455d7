use anyhow::Result;
use clap::{Parser, ValueEnum};
use git_pending::git::{GitCli, StatusFormat};
use git_pending::{commands, get_base_dir};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;
use termcolor::ColorChoice;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "git-pending")]
#[command(about = "Summarize staged, modified and untracked files of sibling git repositories")]
#[command(version)]
struct Cli {
    /// Directory whose subdirectories are scanned (defaults to the parent of this executable's directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// How to read each repository's status
    #[arg(short, long, value_enum, default_value_t = StatusFormat::Long)]
    format: StatusFormat,

    /// Seconds to wait for `git status` in a single repository
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// When to color the report
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto)]
    color: ColorWhen,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorWhen {
    Auto,
    Always,
    Never,
}

impl ColorWhen {
    fn choice(self) -> ColorChoice {
        match self {
            ColorWhen::Auto if io::stdout().is_terminal() => ColorChoice::Auto,
            ColorWhen::Auto | ColorWhen::Never => ColorChoice::Never,
            ColorWhen::Always => ColorChoice::Always,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let base_dir = get_base_dir(cli.dir)?;
    let git = GitCli::new(cli.format, Duration::from_secs(cli.timeout));

    let result = commands::scan::execute(&base_dir, &git, cli.color.choice());

    if cli.pause {
        println!("Press Enter to continue...");
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
    }

    result
}
