// ============================================================================
// filtermix CLI: headless batch stylization via command-line arguments
// ============================================================================
//
// Typical invocations:
//   filtermix --input photo.png --filter pointillism --output dots.png
//   filtermix -i photo.jpg -F layered_strokes --max-brush 12 --seed 7
//   filtermix -i "shots/*.jpg" -F glass_patterns --output-dir out/ --format png
//   filtermix --list-filters
//
// Each input file is one self-contained filter invocation with its own random
// generator, so files are processed in parallel with rayon. Results are
// reported in input order.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::error::{Error, Result};
use crate::io::{DEFAULT_JPEG_QUALITY, SaveFormat, encode_and_write, load_image};
use crate::ops::effects::{Filter, FilterKind, FilterSummary};
use crate::{log_err, log_info, log_warn};

// ============================================================================
// ARGUMENTS
// ============================================================================

/// Artistic image filters: layered brush strokes, pointillism and glass patterns.
#[derive(Parser, Debug)]
#[command(
    name = "filtermix",
    about = "Headless artistic image filters",
    long_about = "Apply a painterly stylization filter to image files.\n\
                  Reads PNG, BMP and JPEG; writes PNG, BMP or JPEG.\n\n\
                  Example:\n  \
                  filtermix --input photo.png --filter pointillism --output dots.png\n  \
                  filtermix -i \"*.jpg\" -F glass_patterns --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Files or glob patterns to stylize, e.g. "shots/*.jpg".
    #[arg(short, long, num_args = 1.., required_unless_present = "list_filters")]
    pub input: Vec<String>,

    /// Filter to apply: layered_strokes, pointillism, glass_patterns.
    #[arg(short = 'F', long, value_name = "NAME", required_unless_present = "list_filters")]
    pub filter: Option<String>,

    /// Where to write the result of a single input.
    #[arg(short, long, value_name = "FILE", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory receiving `<stem>_<filter>.<ext>` for every input.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, bmp, jpeg. Inferred from --output when omitted,
    /// defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90). Ignored for PNG and BMP.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Seed for reproducible output. File N of a batch uses seed + N.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Layered strokes: largest brush radius (1–100).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_brush: Option<i32>,

    /// Layered strokes: smallest brush radius (1–100, at most --max-brush).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub min_brush: Option<i32>,

    /// Layered strokes: colour error needed to start a stroke (0–600).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub error_threshold: Option<i32>,

    /// Pointillism: dot radius (1–50).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub radius: Option<i32>,

    /// Pointillism / glass patterns: effect strength (0–1).
    #[arg(long, value_name = "F", allow_negative_numbers = true)]
    pub strength: Option<f64>,

    /// Pointillism: edge-layer hue distortion (0–1).
    #[arg(long, value_name = "F", allow_negative_numbers = true)]
    pub hue_distortion: Option<f64>,

    /// Write the session log here instead of the default location.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// List the available filters and exit.
    #[arg(long)]
    pub list_filters: bool,

    /// Print per-file timing and paint statistics.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Execute a parsed command line. Fails (exit status 1) if planning fails or
/// any single file fails; the other files of a batch are still written.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list_filters {
        for kind in FilterKind::ALL {
            println!("{:<16} {}", kind.name(), kind.description());
        }
        return ExitCode::SUCCESS;
    }

    let plan = match plan_batch(&args) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    log_info!(
        "Running {} on {} file(s), format {}",
        plan.filter.kind().label(),
        plan.jobs.len(),
        plan.format.extension()
    );

    let results: Vec<Result<FileReport>> = plan
        .jobs
        .par_iter()
        .enumerate()
        .map(|(idx, job)| {
            let seed = args.seed.map(|s| s.wrapping_add(idx as u64));
            run_one(job, &plan.filter, plan.format, plan.quality, seed)
        })
        .collect();

    let total = plan.jobs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, (job, result)) in plan.jobs.iter().zip(results).enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, job.input.display());
        }
        match result {
            Ok(report) => {
                if report.unchanged {
                    eprintln!(
                        "  warning: output of '{}' is identical to the input.",
                        job.input.display()
                    );
                    log_warn!("{}: filter output identical to input", job.input.display());
                }
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms, {})",
                        job.output.display(),
                        report.elapsed_ms,
                        report.summary
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("{}: {}", job.input.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Batch planning
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Job {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug)]
struct BatchPlan {
    filter: Filter,
    format: SaveFormat,
    quality: u8,
    jobs: Vec<Job>,
}

fn plan_batch(args: &CliArgs) -> Result<BatchPlan> {
    let filter = build_filter(args)?;

    let (inputs, warnings) = resolve_inputs(&args.input);
    for warning in &warnings {
        eprintln!("warning: {}", warning);
        log_warn!("{}", warning);
    }
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    if inputs.len() > 1 && args.output.is_some() {
        return Err(Error::OutputConflict(format!(
            "{} input files given but --output only accepts a single file path; \
             use --output-dir for batch processing",
            inputs.len()
        )));
    }

    let format = parse_format(args.format.as_deref(), args.output.as_deref());
    if let Some(warning) = quality_warning(format, args.quality) {
        eprintln!("warning: {}", warning);
        log_warn!("{}", warning);
    }
    let quality = args.quality.unwrap_or(DEFAULT_JPEG_QUALITY);

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut jobs: Vec<Job> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = build_output_path(
            &input,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            filter.kind(),
            format,
        )
        .ok_or_else(|| {
            Error::OutputConflict(format!("cannot determine output path for '{}'", input.display()))
        })?;
        if let Some(prev) = jobs.iter().find(|j| j.output == output) {
            return Err(Error::OutputConflict(format!(
                "'{}' and '{}' would both be written to '{}'",
                prev.input.display(),
                input.display(),
                output.display()
            )));
        }
        jobs.push(Job { input, output });
    }

    Ok(BatchPlan {
        filter,
        format,
        quality,
        jobs,
    })
}

/// Resolve `--filter` and apply any parameter flags on top of its defaults.
/// Flags that do not belong to the chosen filter are ignored.
fn build_filter(args: &CliArgs) -> Result<Filter> {
    let name = args.filter.as_deref().unwrap_or_default();
    let filter = match Filter::from_name(name)? {
        Filter::LayeredStrokes(mut p) => {
            if let Some(v) = args.max_brush {
                p.max_brush_size = v;
            }
            if let Some(v) = args.min_brush {
                p.min_brush_size = v;
            }
            if let Some(v) = args.error_threshold {
                p.error_threshold = v;
            }
            Filter::LayeredStrokes(p)
        }
        Filter::Pointillism(mut p) => {
            if let Some(v) = args.radius {
                p.radius = v;
            }
            if let Some(v) = args.strength {
                p.strength = v;
            }
            if let Some(v) = args.hue_distortion {
                p.hue_distortion = v;
            }
            Filter::Pointillism(p)
        }
        Filter::GlassPatterns(mut p) => {
            if let Some(v) = args.strength {
                p.strength = v;
            }
            Filter::GlassPatterns(p)
        }
    };
    Ok(filter.clamped())
}

// ============================================================================
// ONE FILE: decode, filter, encode
// ============================================================================

struct FileReport {
    summary: FilterSummary,
    unchanged: bool,
    elapsed_ms: f64,
}

fn run_one(
    job: &Job,
    filter: &Filter,
    format: SaveFormat,
    quality: u8,
    seed: Option<u64>,
) -> Result<FileReport> {
    let start = Instant::now();

    // decode
    let source: PixelBuffer = load_image(&job.input)?;

    // filter, seeded per file
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    let (result, summary) = filter.run(&source, &mut rng);

    // encode
    encode_and_write(&result, &job.output, format, quality)?;

    Ok(FileReport {
        summary,
        unchanged: result == source,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

// ============================================================================
// INPUT / OUTPUT RESOLUTION
// ============================================================================

/// Inputs in command-line order with duplicates dropped. An argument naming an
/// existing file is taken literally; anything else is expanded as a glob.
/// Problems with individual patterns come back as warnings.
fn resolve_inputs(patterns: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut warnings = Vec::new();
    let mut push = |path: PathBuf| {
        if !files.contains(&path) {
            files.push(path);
        }
    };

    for pattern in patterns {
        let literal = PathBuf::from(pattern);
        if literal.is_file() {
            push(literal);
            continue;
        }
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warnings.push(format!("'{}' is not a valid glob: {}", pattern, e));
                continue;
            }
        };
        let before = warnings.len();
        let hits: Vec<PathBuf> = paths
            .filter_map(|entry| entry.map_err(|e| warnings.push(e.to_string())).ok())
            .filter(|p| p.is_file())
            .collect();
        if hits.is_empty() && warnings.len() == before {
            warnings.push(format!("'{}' matched no files", pattern));
        }
        hits.into_iter().for_each(&mut push);
    }

    (files, warnings)
}

/// `--format` wins, then the extension of `--output`, then PNG.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).unwrap_or_else(|| {
            eprintln!("warning: unknown format '{}', writing png.", f);
            SaveFormat::Png
        });
    }
    output.and_then(SaveFormat::from_path).unwrap_or_default()
}

/// `--quality` only affects lossy output.
fn quality_warning(format: SaveFormat, quality: Option<u8>) -> Option<String> {
    match quality {
        Some(q) if !format.supports_quality() => Some(format!(
            "--quality {} has no effect on {} output",
            q,
            format.extension()
        )),
        _ => None,
    }
}

/// Destination for `input`: the explicit `--output` path, else
/// `<stem>_<filter>.<ext>` inside `--output-dir` or beside the input.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    filter: FilterKind,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let file_name = format!("{}_{}.{}", stem, filter.name(), format.extension());

    match output_dir {
        Some(dir) => Some(dir.join(file_name)),
        None => Some(input.parent().unwrap_or(Path::new(".")).join(file_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("filtermix").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn list_filters_needs_no_input() {
        let args = parse(&["--list-filters"]);
        assert!(args.list_filters);
        assert!(args.input.is_empty());
    }

    #[test]
    fn input_and_filter_are_required() {
        assert!(CliArgs::try_parse_from(["filtermix", "-F", "pointillism"]).is_err());
        assert!(CliArgs::try_parse_from(["filtermix", "-i", "a.png"]).is_err());
    }

    #[test]
    fn output_and_output_dir_conflict() {
        let res = CliArgs::try_parse_from([
            "filtermix", "-i", "a.png", "-F", "pointillism", "-o", "x.png", "--output-dir", "d",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn parameter_flags_override_and_clamp() {
        let args = parse(&[
            "-i",
            "a.png",
            "-F",
            "layered-strokes",
            "--max-brush",
            "500",
            "--min-brush",
            "3",
        ]);
        match build_filter(&args).unwrap() {
            Filter::LayeredStrokes(p) => {
                assert_eq!(p.max_brush_size, 100);
                assert_eq!(p.min_brush_size, 3);
                assert_eq!(p.error_threshold, 200);
            }
            other => panic!("unexpected {other:?}"),
        }

        let args = parse(&[
            "-i",
            "a.png",
            "-F",
            "glass_patterns",
            "--strength",
            "-2",
            "--radius",
            "9",
        ]);
        match build_filter(&args).unwrap() {
            Filter::GlassPatterns(p) => assert_eq!(p.strength, 0.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_filter_is_reported() {
        let args = parse(&["-i", "a.png", "-F", "sepia"]);
        assert!(matches!(build_filter(&args), Err(Error::UnknownFilter(_))));
    }

    #[test]
    fn format_comes_from_flag_then_extension() {
        assert_eq!(parse_format(Some("BMP"), Some(Path::new("x.jpg"))), SaveFormat::Bmp);
        assert_eq!(parse_format(None, Some(Path::new("x.jpeg"))), SaveFormat::Jpeg);
        assert_eq!(parse_format(None, Some(Path::new("x.webp"))), SaveFormat::Png);
        assert_eq!(parse_format(None, None), SaveFormat::Png);
    }

    #[test]
    fn quality_is_only_meaningful_for_jpeg() {
        assert_eq!(quality_warning(SaveFormat::Jpeg, Some(40)), None);
        assert_eq!(quality_warning(SaveFormat::Png, None), None);
        let warning = quality_warning(SaveFormat::Bmp, Some(40)).unwrap();
        assert!(warning.contains("bmp"), "{warning}");

        let args = parse(&["-i", "a.png", "-F", "pointillism", "-q", "40"]);
        assert_eq!(args.quality, Some(40));
        let args = parse(&["-i", "a.png", "-F", "pointillism"]);
        assert_eq!(args.quality, None);
    }

    #[test]
    fn default_output_names_carry_the_filter() {
        let p = build_output_path(
            Path::new("shots/cat.jpg"),
            None,
            None,
            FilterKind::Pointillism,
            SaveFormat::Png,
        );
        assert_eq!(p, Some(PathBuf::from("shots/cat_pointillism.png")));

        let p = build_output_path(
            Path::new("shots/cat.jpg"),
            None,
            Some(Path::new("out")),
            FilterKind::GlassPatterns,
            SaveFormat::Jpeg,
        );
        assert_eq!(p, Some(PathBuf::from("out/cat_glass_patterns.jpg")));

        let p = build_output_path(
            Path::new("cat.jpg"),
            Some(Path::new("final.bmp")),
            None,
            FilterKind::LayeredStrokes,
            SaveFormat::Bmp,
        );
        assert_eq!(p, Some(PathBuf::from("final.bmp")));
    }

    #[test]
    fn inputs_keep_order_and_drop_duplicates() {
        let dir = std::env::temp_dir().join(format!("filtermix-inputs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.png", "a.png", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let literal = dir.join("b.png").to_string_lossy().into_owned();
        let pattern = dir.join("*.png").to_string_lossy().into_owned();
        let missing = dir.join("*.bmp").to_string_lossy().into_owned();

        let (files, warnings) = resolve_inputs(&[literal, pattern, missing]);
        assert_eq!(files, vec![dir.join("b.png"), dir.join("a.png")]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("matched no files"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unmatched_inputs_are_an_error() {
        let args = parse(&["-i", "/no/such/dir/*.png", "-F", "pointillism"]);
        assert!(matches!(plan_batch(&args), Err(Error::NoInputs)));
    }

    #[test]
    fn single_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("filtermix-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("tile.png");
        let mut src = PixelBuffer::filled(12, 10, [40, 160, 90, 255]);
        src.set_pixel(6, 5, [255, 255, 255, 255]);
        encode_and_write(&src, &input, SaveFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();

        let input_arg = input.to_string_lossy().into_owned();
        let args = parse(&["-i", &input_arg, "-F", "glass_patterns", "--seed", "4"]);
        let plan = plan_batch(&args).unwrap();
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].output, dir.join("tile_glass_patterns.png"));

        let report = run_one(&plan.jobs[0], &plan.filter, plan.format, 90, Some(4)).unwrap();
        assert_eq!(report.summary, FilterSummary::Flow);
        let written = load_image(&plan.jobs[0].output).unwrap();
        assert_eq!((written.width(), written.height()), (12, 10));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
