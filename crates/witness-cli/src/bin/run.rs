//! Runs one streaming chat-completion call and prints its metrics.
//!
//! Configuration comes from the environment (after `.env` loading); see
//! `witness_cli::config` for the recognized variables. The streamed text
//! goes to stdout as it arrives, followed by a summary block.

use std::process::ExitCode;

use clap::Parser;
use witness_cli::config::RunConfig;
use witness_cli::logger;
use witness_stream::{StdioSink, StreamClient, StreamResult};

#[derive(Parser)]
#[command(name = "witness-run")]
#[command(about = "Stream a chat completion and capture a receipt")]
struct Args {
    /// Prompt text; overrides PROMPT and PROMPT_FILE when given.
    #[arg(long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    logger::init();

    let mut config = match RunConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(prompt) = args.prompt {
        config.request.prompt = prompt;
    }

    let client = match StreamClient::new() {
        Ok(client) => client,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut sink = StdioSink;
    let result = client
        .execute(&config.request, &config.options, &mut sink)
        .await;
    print_summary(&config.request.model, &result);

    if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(model: &str, result: &StreamResult) {
    println!("--- stream summary ---");
    println!("model: {model}");
    println!("started_at: {}", result.started_at);
    println!("ttfb_seconds: {:.3}", result.ttfb_seconds);
    println!("ttc_seconds: {:.3}", result.ttc_seconds);
    println!(
        "chars: output={} content={} reasoning={}",
        result.output_chars, result.content_chars, result.reasoning_chars
    );
    println!(
        "stalls: count={} max_gap_seconds={:.3}",
        result.stall_count, result.stall_max_gap_seconds
    );
    println!("parse_errors: {}", result.parse_errors);
    if let Some(usage) = &result.usage {
        println!(
            "usage: {}",
            serde_json::Value::Object(usage.clone())
        );
    }
    match &result.receipt_path {
        Some(path) => println!("receipt: {}", path.display()),
        None => println!("receipt: -"),
    }
    if let Some(error) = &result.error {
        let status = result
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("error: {error} (status={status})");
    }
}
