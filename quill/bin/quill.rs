//! Compose an email from the command line and submit it.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use quill::{
    Email,
    config::{Config, find_config_file},
};
use quill_common::{logging, tracing};

/// Build an email and submit it over SMTP
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Build an email and submit it over SMTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file. Defaults to `QUILL_CONFIG`, then
    /// ./quill.config.ron, then /etc/quill/quill.config.ron
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recipient (repeatable)
    #[arg(long, required = true)]
    to: Vec<String>,

    /// Carbon copy recipient (repeatable)
    #[arg(long)]
    cc: Vec<String>,

    /// Blind carbon copy recipient (repeatable)
    #[arg(long)]
    bcc: Vec<String>,

    #[arg(short, long)]
    subject: String,

    /// Plain text body
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read the plain text body from a file
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Read the HTML body from a file
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Attach a file (repeatable)
    #[arg(long)]
    attach: Vec<PathBuf>,

    /// Attach a file inline, referable as `cid:<file name>` (repeatable)
    #[arg(long)]
    inline: Vec<PathBuf>,

    /// Print the message instead of sending it
    #[arg(long)]
    dry_run: bool,
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("Unable to open {}", path.display()))
}

fn compose(email: &mut Email, cli: &Cli) -> anyhow::Result<()> {
    let message = email.message_mut();
    message
        .set_to(&cli.to)
        .set_cc(&cli.cc)
        .set_bcc(&cli.bcc)
        .set_subject(&cli.subject);

    if let Some(text) = &cli.text {
        message.plain_mut().set(text);
    } else if let Some(path) = &cli.text_file {
        let text = std::fs::read(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        message.plain_mut().set(text);
    }

    if let Some(path) = &cli.html_file {
        let html = std::fs::read(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        message.html_mut().set(html);
    }

    for path in &cli.attach {
        message.attach(&file_name(path)?, open(path)?);
    }

    for path in &cli.inline {
        message.attach_inline(&file_name(path)?, open(path)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => find_config_file()?,
    };
    let config = Config::load(&config_path)?;

    let mut email = config.email();
    compose(&mut email, &cli)?;

    if cli.dry_run {
        let content = email.mime_buf()?;
        std::io::stdout().write_all(&content)?;
        return Ok(());
    }

    tokio::time::timeout(config.timeout(), email.send())
        .await
        .map_err(|_| anyhow::anyhow!("Timed out after {}s", config.timeout_secs))??;

    tracing::info!(
        recipients = cli.to.len() + cli.cc.len() + cli.bcc.len(),
        "Message sent"
    );

    Ok(())
}
