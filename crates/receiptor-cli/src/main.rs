//! `receiptor` — reads a noisy OCR receipt transcript and prints the
//! reconciled [`receiptor_core::Receipt`] as pretty JSON.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use receiptor_interpreter::{default_categorizer, interpret, LocaleHint, MerchantTable};

/// Interpret a noisy OCR receipt transcript into structured, reconciled JSON.
#[derive(Parser, Debug)]
#[command(name = "receiptor", version, about)]
struct Cli {
    /// Path to the transcript file. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Purchase date fallback (YYYY-MM-DD), used when none can be located
    /// in the transcript. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// Locale hint for the ambiguous NN/NN/YYYY date form.
    #[arg(long, value_enum, default_value = "none")]
    locale: CliLocale,

    /// Path to a TOML merchant-pattern table overriding the built-in list.
    #[arg(long)]
    merchant_table: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum CliLocale {
    Us,
    Intl,
    None,
}

impl From<CliLocale> for LocaleHint {
    fn from(value: CliLocale) -> Self {
        match value {
            CliLocale::Us => LocaleHint::Us,
            CliLocale::Intl => LocaleHint::Intl,
            CliLocale::None => LocaleHint::None,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let transcript = read_transcript(cli.input.as_deref())?;

    let today = match cli.date {
        Some(ref s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date {s:?}, expected YYYY-MM-DD"))?,
        None => chrono::Local::now().date_naive(),
    };

    let merchant_table = match cli.merchant_table {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading merchant table {}", path.display()))?;
            MerchantTable::from_toml(&text)
                .with_context(|| format!("parsing merchant table {}", path.display()))?
        }
        None => MerchantTable::default_table(),
    };

    let receipt = interpret(&transcript, today, cli.locale.into(), &merchant_table, default_categorizer);

    let json = serde_json::to_string_pretty(&receipt).context("serializing receipt")?;
    println!("{json}");

    Ok(())
}

fn read_transcript(input: Option<&std::path::Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading transcript {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading transcript from stdin")?;
            Ok(buf)
        }
    }
}
