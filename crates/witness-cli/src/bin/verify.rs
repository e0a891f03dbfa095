//! Offline receipt verifier.
//!
//! Recomputes the canonical digests of a persisted receipt and reports a
//! verdict. Exit code 0 means the receipt verified; anything else exits 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use witness_receipt::{TamperMode, build_report, load_receipt, tamper, verify_receipt};

#[derive(Parser)]
#[command(name = "witness-verify")]
#[command(about = "Verify the integrity of a stream receipt")]
struct Args {
    /// Path to receipt JSON file.
    receipt: PathBuf,

    /// Modify a field in-memory to demonstrate rejection.
    #[arg(long, value_enum)]
    tamper: Option<TamperArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TamperArg {
    /// Mutate the first structured event.
    Event,
    /// Perturb the first raw frame.
    Raw,
    /// Overwrite the stored events digest.
    Meta,
}

impl From<TamperArg> for TamperMode {
    fn from(value: TamperArg) -> Self {
        match value {
            TamperArg::Event => TamperMode::Event,
            TamperArg::Raw => TamperMode::Raw,
            TamperArg::Meta => TamperMode::Meta,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut receipt = match load_receipt(&args.receipt) {
        Ok(receipt) => receipt,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(mode) = args.tamper {
        receipt = tamper(&receipt, mode.into());
    }

    let result = verify_receipt(&receipt);
    for line in build_report(&result) {
        println!("{line}");
    }
    if result.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
