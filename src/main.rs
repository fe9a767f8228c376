use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use helloqr::app::{Action, App, AppConfig, Notifier, SystemLinkOpener, Toast, DEFAULT_QR_SIZE};
use helloqr::encoder::{EncodeHints, Encoder, QrEncoder};
use helloqr::helper::{print_matrix, save_bitmap, to_svg_string};
use helloqr::overlay::DEFAULT_LOGO_RATIO;
use helloqr::render::EncodeRequest;
use helloqr::scan::{CaptureActivity, ImageFileScanner};

#[derive(Parser, Debug)]
#[command(name = "helloqr", version, about = "Scan QR codes from images and generate QR code images")]
struct Cli {
    /// Image file the scanner reads frames from
    #[arg(long, short = 'i', global = true, env = "HELLOQR_SCAN_SOURCE", default_value = "scan.png")]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a QR code from the source image
    Scan {
        /// Prompt shown while scanning
        #[arg(long, env = "HELLOQR_SCAN_PROMPT", default_value = "Scan frame")]
        prompt: String,

        #[arg(long, value_enum, env = "HELLOQR_CAPTURE", default_value_t = Capture::Vertical)]
        capture: Capture,

        /// Open the scanned text as a link
        #[arg(long)]
        open: bool,
    },
    /// Open text as a link with the system handler
    Open { uri: String },
    /// Generate a QR code image from text
    Generate {
        text: String,

        /// Side length of the image in pixels
        #[arg(long, short, env = "HELLOQR_SIZE", default_value_t = DEFAULT_QR_SIZE)]
        size: u32,

        /// Image drawn over the center of the code
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Share of the code's width the logo is scaled to
        #[arg(long, env = "HELLOQR_LOGO_RATIO", default_value_t = DEFAULT_LOGO_RATIO)]
        logo_ratio: f32,

        /// Directory the PNG is written to
        #[arg(long, short, env = "HELLOQR_OUTPUT_DIR")]
        output: Option<String>,

        /// File name of the PNG, without extension
        #[arg(long)]
        name: Option<String>,

        /// Also print the code as SVG
        #[arg(long)]
        svg: bool,

        /// Also print the code to the console
        #[arg(long)]
        print: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Capture {
    Default,
    Vertical,
}

impl From<Capture> for CaptureActivity {
    fn from(capture: Capture) -> Self {
        match capture {
            Capture::Default => CaptureActivity::Default,
            Capture::Vertical => CaptureActivity::VerticalOrientation,
        }
    }
}

/// Prints notifications to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        println!("{}", toast.text);
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    debug!(?cli, "parsed arguments");

    match cli.command {
        Command::Scan { prompt, capture, open } => {
            let config = AppConfig {
                scan_prompt: prompt,
                capture_activity: capture.into(),
                ..AppConfig::default()
            };
            let mut app = build_app(config, cli.source);
            app.click(Action::Scan);
            app.finish_scan();
            if open && !app.result_text().is_empty() {
                app.click(Action::OpenLink);
            }
        }
        Command::Open { uri } => {
            let mut app = build_app(AppConfig::default(), cli.source);
            app.set_result_text(uri);
            app.click(Action::OpenLink);
        }
        Command::Generate {
            text,
            size,
            logo,
            logo_ratio,
            output,
            name,
            svg,
            print,
        } => {
            let config = AppConfig {
                qr_size: size,
                logo_ratio,
                ..AppConfig::default()
            };
            let mut app = build_app(config, cli.source);
            if let Some(path) = logo {
                let logo = image::open(&path)
                    .with_context(|| format!("failed to load logo from {}", path.display()))?
                    .to_rgba8();
                app = app.with_logo(logo);
            }

            app.set_data_text(text.as_str());
            app.click(Action::Generate);
            let Some(bitmap) = app.image() else {
                bail!("no QR code was generated");
            };
            let path = save_bitmap(bitmap, output.as_deref(), name.as_deref())
                .context("failed to save QR code")?;
            println!("Saved {}", path.display());

            if svg || print {
                let content = text.trim();
                let request = EncodeRequest::new(content, size)?;
                let hints: EncodeHints = request.hints();
                let matrix = QrEncoder.encode(content, 0, 0, &hints)?;
                if print {
                    print_matrix(&matrix);
                }
                if svg {
                    println!("{}", to_svg_string(&matrix));
                }
            }
        }
    }

    Ok(())
}

fn build_app(config: AppConfig, source: PathBuf) -> App<QrEncoder, ImageFileScanner> {
    App::new(
        config,
        QrEncoder,
        ImageFileScanner::new(source),
        Box::new(SystemLinkOpener),
        Box::new(ConsoleNotifier),
    )
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["helloqr", "generate", "hello"]).unwrap();
        match cli.command {
            Command::Generate { text, size, logo, .. } => {
                assert_eq!(text, "hello");
                assert_eq!(size, DEFAULT_QR_SIZE);
                assert!(logo.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_scan_reads_global_source() {
        let cli = Cli::try_parse_from(["helloqr", "scan", "--source", "frame.png", "--capture", "default"]).unwrap();
        assert_eq!(cli.source, PathBuf::from("frame.png"));
        assert!(matches!(cli.command, Command::Scan { capture: Capture::Default, open: false, .. }));
    }
}
