// waiver-pdf: Render signed passenger waivers and stamp scanned paper waivers

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use waiver_pdf::assets::RenderAssets;
use waiver_pdf::content::default_template;
use waiver_pdf::format::parse_date;
use waiver_pdf::metrics::StandardFonts;
use waiver_pdf::{
    annotate, generate_waiver_id, Compositor, OverlayMetadata, PageSize, RenderSettings,
    WaiverError, WaiverSubmission, WaiverTemplate,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Render passenger waivers and stamp paper waivers")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a signed waiver submission to PDF
    Compose {
        /// Submission JSON file
        #[arg(short, long)]
        submission: PathBuf,

        /// Template JSON file (defaults to the built-in template for the waiver type)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Render settings JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Logo image (file path or URL) shown in the header
        #[arg(long)]
        logo: Option<String>,

        /// Page size: a4 or letter
        #[arg(long)]
        page_size: Option<PageSize>,

        /// IANA time zone for signature timestamps (defaults to the local zone)
        #[arg(long)]
        time_zone: Option<String>,

        /// Output filename (defaults to waiver-{id}.pdf)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Stamp waiver metadata onto the first page of a scanned PDF
    Annotate {
        /// Scanned waiver PDF
        #[arg(short, long)]
        input: PathBuf,

        /// Date the paper waiver was signed (YYYY-MM-DD)
        #[arg(long)]
        signed_date: String,

        /// Email of the person uploading the scan
        #[arg(long)]
        uploaded_by: String,

        /// Upload date (YYYY-MM-DD)
        #[arg(long)]
        upload_date: Option<String>,

        /// Waiver ID (a fresh one is generated when omitted)
        #[arg(long)]
        waiver_id: Option<String>,

        /// Output filename (defaults to {input}-annotated.pdf)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print fresh waiver IDs
    NewId {
        /// How many IDs to print
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), WaiverError> {
    match Args::parse().command {
        Command::Compose {
            submission,
            template,
            config,
            logo,
            page_size,
            time_zone,
            output,
        } => {
            let mut settings = match config {
                Some(path) => RenderSettings::load(&path)?,
                None => RenderSettings::default(),
            };
            if logo.is_some() {
                settings.logo = logo;
            }
            if let Some(page_size) = page_size {
                settings.page_size = page_size;
            }
            if time_zone.is_some() {
                settings.time_zone = time_zone;
            }

            let mut submission: WaiverSubmission = read_json(&submission)?;
            let template = match template {
                Some(path) => read_json::<WaiverTemplate>(&path)?,
                None => default_template(submission.waiver_type),
            };
            let waiver_id = submission
                .waiver_id
                .get_or_insert_with(generate_waiver_id)
                .clone();

            let zone = settings.display_zone()?;
            let assets = RenderAssets::load(settings.logo.as_deref());
            let fonts = StandardFonts;
            let bytes = Compositor::new(&fonts, settings, zone).compose(
                &template,
                &submission,
                &assets,
                Utc::now(),
            )?;

            let output_file = output.unwrap_or_else(|| format!("waiver-{}.pdf", waiver_id));
            fs::write(&output_file, bytes)?;

            println!("✓ Generated: {}", output_file);
            println!("  Waiver: {}", submission.signer_name());
            println!("  ID: {}", waiver_id);
        }

        Command::Annotate {
            input,
            signed_date,
            uploaded_by,
            upload_date,
            waiver_id,
            output,
        } => {
            let metadata = OverlayMetadata {
                waiver_id: waiver_id.unwrap_or_else(generate_waiver_id),
                signed_date: parse_date(&signed_date)?,
                uploaded_by_email: uploaded_by,
                upload_date: upload_date.as_deref().map(parse_date).transpose()?,
            };

            let pdf_bytes = fs::read(&input)?;
            info!(input = %input.display(), bytes = pdf_bytes.len(), "annotating");
            let bytes = annotate(&pdf_bytes, &metadata)?;

            let output_file = output.unwrap_or_else(|| annotated_name(&input));
            fs::write(&output_file, bytes)?;

            println!("✓ Generated: {}", output_file);
            println!("  ID: {}", metadata.waiver_id);
        }

        Command::NewId { count } => {
            for _ in 0..count {
                println!("{}", generate_waiver_id());
            }
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, WaiverError> {
    let content = fs::read_to_string(path)
        .map_err(|e| WaiverError::InputError(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| WaiverError::InputError(format!("{}: {}", path.display(), e)))
}

fn annotated_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "waiver".to_string());
    input
        .with_file_name(format!("{}-annotated.pdf", stem))
        .to_string_lossy()
        .into_owned()
}
