use clap::{Parser, Subcommand};
use gallery_datamodel::config::{self, MANIFEST_FILENAME};
use gallery_datamodel::imaging::ExternalToolsBackend;
use gallery_datamodel::output;
use gallery_datamodel::pipeline::{self, BuildError, BuildEvent, BuildOptions};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Shared flags for commands that read EXIF.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the previous run's records and read every image's EXIF again
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "gallery-datamodel")]
#[command(about = "Build the JavaScript datamodel and thumbnails for a photo gallery")]
#[command(long_about = "\
Build the JavaScript datamodel and thumbnails for a photo gallery

admin.toml declares which images belong in the gallery, with their tags and
ratings. Each build reads EXIF with exiftool, creates missing thumbnails with
ImageMagick and writes a frozen DATAMODEL object the front-end loads.

Layout:

  admin.toml                 # Manifest (declares images, tags, ratings)
  datamodel.js               # Generated
  .datamodel-cache.json      # Generated, reused by the next build
  images/
  ├── IMG_0001.jpg           # Declared in admin.toml
  ├── IMG_0002.jpg           # Not declared: skipped and reported
  └── thumbnails/            # Generated, existing files are kept

Requires exiftool and ImageMagick (magick) on PATH.

Run 'gallery-datamodel gen-config' to generate a documented admin.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Manifest file
    #[arg(long, default_value = MANIFEST_FILENAME, global = true)]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read EXIF, create thumbnails and write the datamodel
    Build {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Validate the manifest against the image directory without building
    Check,
    /// Print a stock admin.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<BuildError>() {
                Some(build_err) => eprintln!("error ({}): {}", build_err.kind(), build_err),
                None => eprintln!("error: {}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build { yes, cache } => {
            let manifest = pipeline::load(&cli.manifest)?;

            if !yes {
                println!(
                    "{}",
                    output::format_preamble(&cli.manifest, &manifest.config.image_directory)
                );
                if !confirm("Continue [y/N]: ")? {
                    return Ok(());
                }
            }

            let backend = ExternalToolsBackend::new();
            let options = BuildOptions {
                use_cache: !cache.no_cache,
            };
            let report = pipeline::run_build(
                &manifest,
                &backend,
                &options,
                chrono::Utc::now(),
                |event| match event {
                    BuildEvent::PriorState(prior) => output::print_prior_state(prior),
                    BuildEvent::Reconcile(e) => println!("{}", output::format_reconcile_event(e)),
                    BuildEvent::Reconciled(stats) => {
                        println!("{}", output::format_cache_stats(stats))
                    }
                    BuildEvent::Thumbnail(e) => {
                        if let Some(line) = output::format_thumbnail_event(e) {
                            println!("{}", line);
                        }
                    }
                },
            )?;

            println!(
                "{}",
                output::format_thumbnail_summary(&report.thumbnail_dir, &report.thumbnails)
            );
            println!("{}", output::format_written(&report.artifact_path));
            output::print_not_included(&manifest.config.image_directory, &report.not_included);
            println!("Complete!");
        }
        Command::Check => {
            let manifest = pipeline::load(&cli.manifest)?;
            let result = pipeline::check(&manifest)?;
            output::print_check_output(
                &manifest.config.image_directory,
                result.included.len(),
                &result.not_included,
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_manifest_toml());
        }
    }

    Ok(())
}

/// Ask on stdout, read one line from stdin.
fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(output::is_confirmation(&answer))
}
