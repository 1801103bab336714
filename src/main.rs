mod config;
mod github;
mod parser;
mod render;

use clap::{CommandFactory, FromArgMatches, Parser};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use config::{Config, Environment};
use github::{GitHubClient, Resource};
use render::{OutputFormat, RenderOptions};

/// issue2md: convert a GitHub Issue, Pull Request or Discussion into a
/// Markdown (or JSON) document, comments included.
#[derive(Parser, Debug)]
#[command(name = "issue2md", version, about)]
struct Cli {
    /// GitHub resource URL (e.g., https://github.com/org/repo/issues/42)
    url: String,

    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include reaction counts for the body and every comment
    #[arg(long)]
    enable_reactions: bool,

    /// Link author names and @mentions to GitHub profiles
    #[arg(long)]
    enable_user_links: bool,

    /// Output format (defaults to the config file setting, then markdown)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Config file path (defaults to ./.issue2md.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env = Environment::from_env();

    let default_level = if env.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    env.log_invalid_vars();

    if env.no_color {
        colored::control::set_override(false);
    }

    let matches = Cli::command().after_help(parser::usage_help()).get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    let span = info_span!("issue2md", url = %cli.url);
    match run(cli, &env).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, env: &Environment) -> Result<(), Box<dyn std::error::Error>> {
    info!("classifying URL");
    let target = parser::parse(&cli.url)?;
    debug!(owner = %target.owner, repo = %target.repo, number = target.number, kind = ?target.kind, "classified URL");

    info!("loading configuration");
    let config = Config::load(cli.config.as_deref(), env)?;
    let options = render_options(&cli, &config);

    let client = GitHubClient::new(&config.github)?;
    info!("fetching resource from GitHub");
    let resource = github::fetch_resource(&client, &target).await?;
    info!(
        kind = %resource.kind(),
        status = %resource.status(),
        comments = resource.comments().len(),
        "fetched resource"
    );

    info!(format = %options.format, "rendering document");
    let content = render::render(&resource, &options)?;
    render::output(&content, cli.output.as_deref())?;

    if let Some(path) = &cli.output {
        eprintln!("{} {}", "wrote".green(), path.display());
    }
    info!("done");

    Ok(())
}

/// Command-line flags override the config file; a boolean flag can only turn a feature on.
fn render_options(cli: &Cli, config: &Config) -> RenderOptions {
    let mut options = RenderOptions::from(&config.output);
    options.enable_reactions |= cli.enable_reactions;
    options.enable_user_links |= cli.enable_user_links;
    if let Some(format) = cli.format {
        options.format = format;
    }
    options
}
