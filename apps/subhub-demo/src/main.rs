#![allow(clippy::print_stdout)]

mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use scenario::Scenario;
use subhub_core::{Address, ConfigError, Outcome, Page, SubHubConfig, TokenAmount};
use subhub_view::{build_shell_view, render_page_document};
use tracing::{info, warn};

const DEMO_TOKEN_ADDRESS: &str = "0x5b0b000000000000000000000000000000000001";
const DEMO_LEDGER_ADDRESS: &str = "0x5b0b000000000000000000000000000000000002";

/// Drive SubHub against an in-memory ledger and render one page as HTML.
#[derive(Parser, Debug)]
#[command(name = "subhub-demo")]
struct Args {
    /// Page to render (home, creators, studio, dashboard, library).
    #[arg(long, default_value = "creators", value_parser = parse_page)]
    page: Page,

    /// Output HTML file. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Account the wallet exposes.
    #[arg(long, default_value = "0xc0ffee0000000000000000000000000000000003", value_parser = parse_address)]
    account: Address,

    /// Starting token balance for the account, in whole tokens.
    #[arg(long, default_value = "50")]
    balance: String,

    #[arg(long, value_enum, default_value_t = Scenario::Browse)]
    scenario: Scenario,
}

fn parse_page(raw: &str) -> Result<Page, String> {
    Page::from_id(raw).ok_or_else(|| format!("unknown page {raw:?}"))
}

fn parse_address(raw: &str) -> Result<Address, String> {
    Address::parse(raw).map_err(|error| error.to_string())
}

/// `SUBHUB_*` variables when set; placeholder contract addresses otherwise.
fn load_config() -> Result<SubHubConfig> {
    match SubHubConfig::from_env() {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingAddress(_)) => {
            let config = SubHubConfig {
                token_address: Address::parse(DEMO_TOKEN_ADDRESS)?,
                ledger_address: Address::parse(DEMO_LEDGER_ADDRESS)?,
                ..SubHubConfig::default()
            };
            config.validate()?;
            Ok(config)
        }
        Err(error) => Err(error).context("invalid SUBHUB_* configuration"),
    }
}

fn write_output(output: Option<&Path>, document: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, document)
                .with_context(|| format!("write rendered page to {}", path.display()))?;
            info!(path = %path.display(), bytes = document.len(), "rendered page written");
        }
        None => println!("{document}"),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config()?;
    let balance = TokenAmount::parse_units(&args.balance, config.token_decimals)
        .with_context(|| format!("invalid --balance {:?}", args.balance))?;

    let run = scenario::run(&config, args.scenario, &args.account, balance, args.page).await?;
    let failed: Vec<&str> = run
        .outcomes
        .iter()
        .filter(|(_, outcome)| *outcome == Outcome::Failed)
        .map(|(step, _)| *step)
        .collect();
    if !failed.is_empty() {
        warn!(?failed, "some demo steps failed; see notifications in the rendered page");
    }

    let document = render_page_document(&build_shell_view(&run.state, &config));
    write_output(args.output.as_deref(), &document)
}

#[cfg(test)]
mod tests {
    use super::write_output;

    #[test]
    fn output_file_receives_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page.html");
        write_output(Some(&path), "<!DOCTYPE html><p>hi</p>")?;
        assert_eq!(std::fs::read_to_string(&path)?, "<!DOCTYPE html><p>hi</p>");
        Ok(())
    }
}
