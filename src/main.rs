use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yeargal::gallery;
use yeargal::media::PendingFile;
use yeargal::preview::DirectoryIssuer;
use yeargal::storage::DirectoryService;
use yeargal::store::MediaStore;
use yeargal::transcode::CommandDecoder;
use yeargal::upload::{SubmitOutcome, UploadForm};
use yeargal::{config, output};

fn version_string() -> &'static str {
    let on_tag = env!("YEARGAL_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("YEARGAL_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Called once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "yeargal")]
#[command(about = "Photo and video gallery organised by year")]
#[command(long_about = "\
Photo and video gallery organised by year

Uploads land in a library directory, one folder per year. HEIC/HEIF photos
are converted to JPEG on the way in; everything else is stored as-is.

Library structure:

  library/
  ├── config.toml                  # Optional, overrides the stock settings
  ├── 2023/
  │   ├── index.json               # Stored items, in upload order
  │   ├── 001-beach.jpg
  │   └── 002-toast.mp4
  └── 2024/
      ├── index.json
      └── 001-group-photo.jpg

Run 'yeargal gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Library directory
    #[arg(long, default_value = "library", global = true)]
    library: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate, convert and store files under a year
    Upload {
        /// Year to file the uploads under
        #[arg(long)]
        year: i32,
        /// Show what would be uploaded without storing anything
        #[arg(long)]
        dry_run: bool,
        /// Photos and videos to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the stored items of one year
    List { year: i32 },
    /// List the years that have media, newest first
    Years,
    /// Render the static gallery site
    Generate {
        /// Output directory
        #[arg(long, default_value = "dist")]
        output: PathBuf,
    },
    /// Validate the config and every year index without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Upload {
            year,
            dry_run,
            files,
        } => {
            let config = config::load_config(&cli.library)?;
            let pending = files
                .iter()
                .map(|path| PendingFile::from_path(path))
                .collect::<Result<Vec<_>, _>>()?;

            let mut form = UploadForm::new(
                &config,
                CommandDecoder::new(config.transcode.decoder.clone()),
                DirectoryIssuer::new()?,
            );
            if !form.select_year(year) {
                let allowed: Vec<String> = form.years().iter().map(|y| y.to_string()).collect();
                return Err(format!(
                    "{year} is not an upload year (configured: {})",
                    allowed.join(", ")
                )
                .into());
            }
            form.select_files(pending);
            output::print_notices(form.notices());

            if dry_run {
                output::print_selection(year, form.selection());
                return Ok(());
            }

            let mut store = MediaStore::new(DirectoryService::new(&cli.library));
            store.fetch_media_by_year(year)?;
            let rx = store.subscribe();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_store_event(&event) {
                        println!("{}", line);
                    }
                }
            });

            println!("Uploading to {year}");
            let outcome = form.submit(&mut store);
            let bucket = store.bucket(year).cloned();
            drop(store);
            printer
                .join()
                .map_err(|_| "progress printer panicked")?;

            if let Some(bucket) = &bucket {
                output::print_year_listing(bucket);
            }
            output::print_notices(form.notices());
            match outcome {
                SubmitOutcome::Completed { .. } => {}
                SubmitOutcome::Blocked => return Err("nothing to upload".into()),
                SubmitOutcome::Aborted { error, .. } => return Err(error.into()),
            }
        }
        Command::List { year } => {
            let mut store = MediaStore::new(DirectoryService::new(&cli.library));
            let bucket = store.fetch_media_by_year(year)?;
            output::print_year_listing(bucket);
        }
        Command::Years => {
            let mut store = MediaStore::new(DirectoryService::new(&cli.library));
            output::print_years(&store.known_years()?);
        }
        Command::Generate { output: out } => {
            let config = config::load_config(&cli.library)?;
            let mut store = MediaStore::new(DirectoryService::new(&cli.library));
            println!("==> Generating {} → {}", cli.library.display(), out.display());
            let report = gallery::generate_site(&mut store, &cli.library, &out, &config)?;
            output::print_site_report(&report);
        }
        Command::Check => {
            println!("==> Checking {}", cli.library.display());
            config::load_config(&cli.library)?;
            let mut store = MediaStore::new(DirectoryService::new(&cli.library));
            for year in store.known_years()? {
                let bucket = store.fetch_media_by_year(year)?;
                output::print_year_listing(bucket);
            }
            println!("==> Library is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
