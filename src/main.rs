use clap::Parser as _;
use std::path::{Path, PathBuf};

use obrapdf::error::ExportError;
use obrapdf::render::{export_report, AssetFetcher, ExportOptions};
use obrapdf::report::ReportRecord;

/// The command line arguments are the path of the resolved report JSON and the
/// directory the exported PDF is written to, feel free to add more depending on
/// the need.
#[derive(clap::Parser)]
struct CliArguments {
    /// The path of the resolved report JSON.
    #[arg(short = 'r', long = "report", value_name = "report_file")]
    report_path: PathBuf,
    /// The directory the exported PDF is written into, under its generated name.
    #[arg(short = 'o', long = "output", value_name = "output_directory", default_value = ".")]
    output_directory: PathBuf,
    /// Optional logo drawn in the page header, as a path or file:// URL.
    #[arg(short = 'l', long = "logo", value_name = "logo_file")]
    logo_path: Option<String>,
}

/// Resolves asset URLs against the local filesystem: plain paths and `file://`
/// URLs are read directly. The export treats every fetch failure as a skipped
/// asset, so a missing photo only costs its page.
struct FileFetcher;

impl AssetFetcher for FileFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ExportError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        std::fs::read(Path::new(path))
            .map_err(|error| ExportError::with_error(format!("Unable to read {:?}", path), &error))
    }
}

fn main() {
    env_logger::init();
    let cli_arguments = CliArguments::parse();

    let report_content = match std::fs::read(&cli_arguments.report_path) {
        Ok(report_content) => report_content,
        Err(error) => {
            log::error!(
                "Failed to read the report {:?}: {}",
                cli_arguments.report_path,
                error
            );
            eprintln!("No se pudo generar el documento.");
            std::process::exit(1);
        }
    };
    let report: ReportRecord = match serde_json::from_slice(&report_content) {
        Ok(report) => report,
        Err(error) => {
            log::error!(
                "Failed to parse the report {:?}: {}",
                cli_arguments.report_path,
                error
            );
            eprintln!("No se pudo generar el documento.");
            std::process::exit(1);
        }
    };

    let options = ExportOptions {
        logo_url: cli_arguments.logo_path,
    };

    // Asset failures are already handled inside the export; reaching this error
    // branch means document assembly itself failed and no output exists. The
    // user-facing message stays generic on purpose, the detail goes to the log.
    match export_report(&report, &FileFetcher, &options) {
        Ok(exported_report) => {
            let output_path = cli_arguments.output_directory.join(&exported_report.file_name);
            if let Err(error) = std::fs::write(&output_path, &exported_report.bytes) {
                log::error!("Failed to write the document {:?}: {}", output_path, error);
                eprintln!("No se pudo generar el documento.");
                std::process::exit(1);
            }
            println!("{}", output_path.display());
        }
        Err(error) => {
            log::error!("Failed to assemble the document: {}", error);
            eprintln!("No se pudo generar el documento.");
            std::process::exit(1);
        }
    }
}
