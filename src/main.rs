use clap::Parser;
use embedprint::{Downloader, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Download a document from its viewer embed as a clean PDF.
#[derive(Debug, Parser)]
#[command(name = "embedprint", version, about)]
struct Cli {
    /// Full document URL or numeric document ID
    url_or_id: String,

    /// Compress the PDF after download (requires Ghostscript)
    #[arg(long)]
    compress: bool,

    /// Keep blank pages instead of removing them
    #[arg(long = "no-clean")]
    no_clean: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Keep Chrome's sandbox enabled
    #[arg(long)]
    sandbox: bool,

    /// Chrome/Chromium executable to use
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Directory for finished PDFs
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if self.compress {
            config.compress.enabled = true;
        }
        if self.no_clean {
            config.blank_filter.enabled = false;
        }
        if self.headful {
            config.surface.headless = false;
        }
        if self.sandbox {
            config.surface.sandbox = true;
        }
        if let Some(chrome) = &self.chrome {
            config.surface.chrome_path = Some(chrome.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();

    let config = match cli.pipeline_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match Downloader::new(config).run(&cli.url_or_id) {
        Ok(download) => {
            for warning in &download.report.warnings {
                log::warn!("{}", warning);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Download failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
