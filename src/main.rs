use std::panic;
use std::process::ExitCode;

use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use coderunner_sandbox::config::Config;
use coderunner_sandbox::core::domain::DebugRequest;
use coderunner_sandbox::native;

const USAGE: &str = "usage: coderunner-sandbox <source-file> < input";

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let source_path = std::env::args().nth(1).ok_or(USAGE)?;
    let code = tokio::fs::read_to_string(&source_path).await?;
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let config = Config::from_env()?;
    tracing::info!("Loaded configuration: {:?}", config);
    let pipeline = native::pipeline(&config)?;

    let result = pipeline
        .debug(DebugRequest {
            code,
            input: (!input.is_empty()).then_some(input),
        })
        .await?;

    if let Some(output) = &result.result {
        println!("{}", output);
    }
    match &result.error {
        Some(error) => {
            eprintln!("{}", error);
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
