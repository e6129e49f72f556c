use std::path::PathBuf;

use clap::Parser;
use digit_extractor::config::{Config, NUM_SEGMENTS};
use digit_extractor::geometry::order_points;
use digit_extractor::saver::save_segments;
use digit_extractor::segment::segment_strip;
use digit_extractor::utils::{read_color, rotate_image};
use digit_extractor::warp::warp_strip;
use digit_extractor::Result;
use dotenv::dotenv;
use log::{error, info};
use opencv::core::Point2f;

/// Headless extraction: warp one quad out of an image and save its cells.
#[derive(Parser, Debug)]
#[command(name = "extract", version, about)]
struct Args {
    /// Source photograph.
    #[arg(long, value_name = "FILE")]
    image: PathBuf,

    /// Four corners as `x,y`, in any order.
    #[arg(long, value_name = "X,Y", num_args = 4, required = true, allow_hyphen_values = true, value_parser = parse_point)]
    points: Vec<Point2f>,

    /// One character per cell.
    #[arg(long)]
    label: String,

    /// Dataset root; defaults to DIGIT_EXTRACTOR_OUTPUT_DIR.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Rotate the image counter-clockwise before picking points.
    #[arg(long, value_name = "DEGREES", default_value_t = 0.0, allow_negative_numbers = true)]
    rotate: f64,
}

fn parse_point(raw: &str) -> std::result::Result<Point2f, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {raw:?}"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok(Point2f::new(coord(x)?, coord(y)?))
}

fn run(args: Args, config: Config) -> Result<()> {
    let root = args
        .output
        .or(config.output_dir)
        .ok_or(digit_extractor::ExtractorError::NoOutputDir)?;

    let image = rotate_image(&read_color(&args.image)?, args.rotate)?;
    let quad = order_points(&args.points)?;
    let strip = warp_strip(&image, &quad, &config.warp)?;
    let segments = segment_strip(&strip, NUM_SEGMENTS)?;
    let report = save_segments(&root, &args.label, &segments)?;

    for path in &report.written {
        info!("wrote {}", path.display());
    }
    println!("Saved {} segments into {}", report.written.len(), root.display());
    Ok(())
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let result = Config::from_env().and_then(|config| run(args, config));
    if let Err(e) = result {
        error!("extract failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points_with_negatives_and_spaces() {
        assert_eq!(parse_point("12.5, -3").unwrap(), Point2f::new(12.5, -3.0));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
