use std::path::PathBuf;

use clap::Parser;
use digit_extractor::invert::invert_dataset;
use dotenv::dotenv;
use log::error;

/// Write colour-inverted copies of a digit dataset.
///
/// Every single-digit subfolder of `--input` (`0` .. `9`) is mirrored into
/// `--output` with each image bitwise inverted.
#[derive(Parser, Debug)]
#[command(name = "invert", version, about)]
struct Args {
    /// Dataset root containing `0` .. `9` folders.
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// Where the inverted tree is written.
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    match invert_dataset(&args.input, &args.output) {
        Ok(report) => println!(
            "Inverted {} images in {} folders ({} skipped) → {}",
            report.written,
            report.folders,
            report.skipped,
            args.output.display()
        ),
        Err(e) => {
            error!("invert failed: {}", e);
            std::process::exit(1);
        }
    }
}
