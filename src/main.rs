use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tabquery::data::policy::UnknownTargetPolicy;
use tabquery::{DatasetService, Endpoint, Response, Settings};

#[derive(Parser)]
#[clap(name = "tabquery", about = "Run dataset queries against a CSV file")]
struct Arguments {
    /// JSON settings file.
    #[clap(long, env = "TABQUERY_CONFIG")]
    config: Option<PathBuf>,
    /// Rows returned by `preview`.
    #[clap(long, env = "TABQUERY_PREVIEW_ROWS")]
    preview_rows: Option<usize>,
    /// `skip` or `reject` unknown filter/sort columns and operators.
    #[clap(long, env = "TABQUERY_UNKNOWN_TARGETS")]
    unknown_targets: Option<UnknownTargetPolicy>,
    /// Dataset id echoed in the response body.
    #[clap(long, default_value_t = 1)]
    id: u64,
    /// Query string, e.g. `f=country,eq,CO&sort=-amount&page=1`.
    #[clap(short, long, default_value = "")]
    query: String,
    /// CSV file to query.
    file: PathBuf,
    /// One of preview, summary, rows, correlation, trend.
    endpoint: Endpoint,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("ERROR: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Arguments) -> Result<ExitCode> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(rows) = args.preview_rows {
        settings.preview_rows = rows;
    }
    if let Some(policy) = args.unknown_targets {
        settings.unknown_targets = policy;
    }
    settings.validate().context("invalid settings")?;

    let service = DatasetService::new(settings);
    let response = service.handle_file(args.endpoint, args.id, &args.file, &args.query);
    print_response(&response)
}

fn print_response(response: &Response) -> Result<ExitCode> {
    let text = serde_json::to_string_pretty(&response.body).context("encoding response")?;
    if response.is_success() {
        println!("{text}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{text}");
        Ok(ExitCode::FAILURE)
    }
}
