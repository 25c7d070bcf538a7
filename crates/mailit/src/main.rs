//! `mailit` - send the message described by a directive file.
//!
//! ```text
//! mailit [--config PATH] [--check] [--restricted] FILE
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as _;
use mailit_directive::{MailDirective, Parser, ParserConfig};
use mailit_transport::{OutgoingMail, SmtpTransport, Transport};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directive file to send
    file: PathBuf,

    #[clap(short, long, env = "MAILIT_CONFIG")]
    /// Path to the JSON configuration file
    config: Option<PathBuf>,

    /// Parse only and print the directive as JSON
    #[clap(long)]
    check: bool,

    /// Read the restricted dialect (CR lines, no Bcc, one attachment)
    #[clap(long)]
    restricted: bool,

    /// SMTP password, overrides the configured one
    #[clap(long, env = "MAILIT_SMTP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailit=info,mailit_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = config::load(args.config.as_deref()).await?;
    if args.restricted {
        config.format = ParserConfig::restricted();
    }
    if args.password.is_some() {
        config.smtp.password = args.password;
    }

    let directive = Parser::new(config.format).parse_file(&args.file)?;
    info!(
        file = %args.file.display(),
        recipients = directive.recipient_count(),
        attachments = directive.attachments.len(),
        "directive parsed"
    );

    if args.check {
        println!("{}", render_check(&directive)?);
        return Ok(());
    }

    let book = config.address_book()?;
    let mail = OutgoingMail::resolve(&directive, &book)?;

    let transport = SmtpTransport::new(config.smtp);
    transport
        .send(&mail)
        .await
        .with_context(|| format!("Delivery through {} failed", transport.settings().host))?;

    println!("Succeeded");
    Ok(())
}

/// One line with the whole context chain.
fn failure_message(err: &anyhow::Error) -> String {
    format!("Error: {err:#}")
}

fn render_check(directive: &MailDirective) -> Result<String> {
    serde_json::to_string_pretty(directive).context("Cannot render directive")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["mailit", "--check", "--restricted", "msg.txt"]).unwrap();
        assert!(args.check);
        assert!(args.restricted);
        assert_eq!(args.file, PathBuf::from("msg.txt"));
    }

    #[test]
    fn test_file_required() {
        assert!(Args::try_parse_from(["mailit", "--check"]).is_err());
    }

    #[test]
    fn test_failure_message_has_chain_once() {
        let err = anyhow::anyhow!("connection refused").context("Delivery through mx failed");
        let message = failure_message(&err);
        assert_eq!(message, "Error: Delivery through mx failed: connection refused");
        assert!(!message.contains('\n'));
    }

    #[test]
    fn test_render_check() {
        let directive = mailit_directive::parse(
            b"TO: a@example.com\nCC: \nBCC: \nFROM: me@example.com\nSUBJECT: Hi\nBody\n",
        )
        .unwrap();
        let json = render_check(&directive).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["to"][0], "a@example.com");
        assert_eq!(value["subject"], "Hi");
        assert_eq!(value["body"], "Body\n");
    }
}
