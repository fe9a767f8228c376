//! # helloqr
//!
//! Scan QR codes and render them back out as bitmaps.
//!
//! `helloqr` wires two collaborators together behind small traits: a [`scan::Scanner`]
//! that turns a captured frame into text, and an [`encoder::Encoder`] that turns text into a
//! module matrix. The crate's own work is rasterizing that matrix into a square bitmap,
//! compositing an optional logo over its center, and dispatching the three screen actions
//! (scan, open as link, generate) in [`app::App`].
//!
//! ## Features
//!
//! - Render any Unicode text as a `size` x `size` QR code with High error correction
//!   and a one-module quiet zone.
//! - Draw a logo over the center of the code, scaled to a share of its width.
//! - Decode QR codes from image files, off the calling thread.
//! - Save codes as PNG, or print them as SVG or console text.
//!
//! ## Example
//!
//! Render a code and save it:
//!
//! ```no_run
//! use helloqr::{encoder::QrEncoder, helper::save_bitmap, render::QrRenderer};
//!
//! fn main() {
//!     let renderer = QrRenderer::new(QrEncoder);
//!     let img = renderer.render("https://example.com", 800, None).expect("Failed to render");
//!     save_bitmap(&img, Some("output"), Some("qr")).expect("Failed to save image");
//! }
//! ```
//!
//! Scan a code from an image file:
//!
//! ```no_run
//! use helloqr::scan::{ImageFileScanner, ScanLauncher, ScanOptions, ScanOutcome};
//!
//! fn main() {
//!     let launcher = ScanLauncher::new(ImageFileScanner::new("output/qr.png"));
//!     let pending = launcher.launch(ScanOptions::new()).expect("Failed to launch scan");
//!     if let Ok(ScanOutcome::Scanned(text)) = pending.wait() {
//!         println!("{text}");
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`encoder`]: The encoder seam and its `qrcode`-backed implementation.
//! - [`render`]: Rasterization of matrices into bitmaps.
//! - [`overlay`]: Centered logo composition.
//! - [`scan`]: Scanner seam, launcher and image-file scanner.
//! - [`app`]: Action dispatch and notifications.
//! - [`helper`]: Utilities for saving and printing codes.

pub mod app;
pub mod encoder;
pub mod error;
pub mod helper;
pub mod overlay;
pub mod render;
pub mod scan;

pub use error::{EncodeError, OpenError, OverlayError, RenderError, ScanError};
