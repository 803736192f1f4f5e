// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Checkwerk — check text and documents against a content-checking platform
//
// Entry point. Initialises logging, loads the client config, signs in and
// runs the requested demo.

mod config_dir;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use checkwerk_client::{CancelToken, CheckWorkflowClient, PlatformEndpoint};
use checkwerk_core::error::{CheckwerkError, Result};
use checkwerk_core::human_errors::{Severity, humanize_error};
use checkwerk_core::request::{CONTENT_FORMAT_TEXT, ContentSource};
use checkwerk_core::types::{AccessToken, CheckResult, ContentEncoding, ErrorClass};

const SAMPLE_TEXT: &str = "This textt has an errorr.";

#[derive(Debug, Parser)]
#[command(name = "checkwerk", version, about = "Check text and documents against a content-checking platform")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/checkwerk/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Language prefix used to pick a guidance profile.
    #[arg(short, long, global = true, default_value = "en")]
    language: String,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a piece of plain text.
    Text {
        /// Text to check.
        #[arg(default_value = SAMPLE_TEXT)]
        text: String,
    },
    /// Check a document file (the platform infers its format).
    File { path: PathBuf },
    /// List guidance profiles, content formats and encodings.
    Capabilities,
    /// Show platform name, version and locales.
    Info,
}

type Client = CheckWorkflowClient<PlatformEndpoint>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match run(cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli, cancel: &CancelToken) -> Result<()> {
    let config = config_dir::load_config(cli.config.as_deref())?;
    let endpoint = PlatformEndpoint::new(&config)?;
    info!(platform = %endpoint.base_url(), "Checkwerk starting");
    let client = CheckWorkflowClient::new(endpoint, config);

    match cli.command {
        Command::Info => print_info(&client).await,
        Command::Capabilities => {
            let token = authenticate(&client, cancel).await?;
            print_capabilities(&client, &token).await
        }
        Command::Text { text } => {
            let source = ContentSource::text(text, CONTENT_FORMAT_TEXT);
            check(&client, source, &cli.language, cancel).await
        }
        Command::File { path } => {
            let source = ContentSource::from_file(&path)?;
            check(&client, source, &cli.language, cancel).await
        }
    }
}

/// Use the configured API token if there is one, otherwise sign in through
/// the browser.
async fn authenticate(client: &Client, cancel: &CancelToken) -> Result<AccessToken> {
    if let Some(token) = &client.config().access_token {
        info!("using configured API token");
        return Ok(AccessToken::api_token(token.as_str()));
    }
    client
        .sign_in(
            |url| println!("Please sign in at:\n{url}\n"),
            cancel,
        )
        .await
}

async fn check(client: &Client, source: ContentSource, language: &str, cancel: &CancelToken) -> Result<()> {
    let token = authenticate(client, cancel).await?;
    let session = client.open_session(token, language).await?;
    println!(
        "Guidance profile: {} ({})",
        session.guidance_profile().display_name,
        session.guidance_profile().language.id
    );

    let result = session
        .check(source, |progress| println!("Progress: {progress}"), cancel)
        .await?;
    print!("{}", render_result(&result));
    Ok(())
}

async fn print_info(client: &Client) -> Result<()> {
    let info = client.platform_information().await?;
    println!("Server:  {}", info.server_name);
    println!("Version: {}", info.version);
    if !info.locales.is_empty() {
        println!("Locales: {}", info.locales.join(", "));
    }
    Ok(())
}

async fn print_capabilities(client: &Client, token: &AccessToken) -> Result<()> {
    let capabilities = client.capabilities(token).await?;

    println!("Guidance profiles:");
    for profile in &capabilities.guidance_profiles {
        println!(
            "  {:<24} {} [{}]",
            profile.id, profile.display_name, profile.language.id
        );
    }
    println!("Content formats:");
    for format in &capabilities.content_formats {
        println!("  {:<24} {}", format.id, format.display_name);
    }
    let encodings: Vec<&str> = capabilities
        .content_encodings
        .iter()
        .map(|encoding| match encoding {
            ContentEncoding::None => "none",
            ContentEncoding::Base64 => "base64",
        })
        .collect();
    println!("Content encodings: {}", encodings.join(", "));
    Ok(())
}

fn render_result(result: &CheckResult) -> String {
    let mut out = format!(
        "Score: {}\nStatus: {}\n",
        result.quality.score, result.quality.status
    );
    if let Some(scorecard) = result.scorecard() {
        out.push_str(&format!("Scorecard: {}\n", scorecard.link));
    }
    out
}

fn report(err: &CheckwerkError) {
    eprint!("{}", render_report(err));
}

fn render_report(err: &CheckwerkError) -> String {
    let human = humanize_error(err);
    let heading = match human.severity {
        Severity::Transient => "Temporary problem",
        Severity::ActionRequired => "Action needed",
        Severity::Permanent => "Error",
    };
    let mut out = format!("{heading}: {}\n  {}\n", human.message, human.suggestion);
    if human.retriable {
        out.push_str("  Submitting again may help.\n");
    }
    out.push_str(&format!("  ({err})\n"));
    out
}

/// 0 success, 1 check or platform failure, 2 when the user has to fix
/// something (sign-in, configuration), 130 interrupted.
fn exit_code(err: &CheckwerkError) -> u8 {
    match err {
        CheckwerkError::Interrupted { .. } => 130,
        _ if err.class() == ErrorClass::UserAction => 2,
        _ => 1,
    }
}
