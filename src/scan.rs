//! Launching scans and receiving their outcome.
//!
//! A [`Scanner`] does the actual capture and decoding. [`ScanLauncher`] runs it
//! off the caller's thread and hands back a [`PendingScan`] that delivers the
//! single outcome once the scanner is done.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use flume::{Receiver, TryRecvError};
use image::imageops;
use tracing::{debug, info};

use crate::error::ScanError;

/// Which capture screen the scanner presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureActivity {
    /// Frames are used as delivered.
    #[default]
    Default,
    /// Frames are turned upright (portrait) before detection.
    VerticalOrientation,
}

/// Settings for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub capture_activity: CaptureActivity,
    /// Text shown to the user while scanning.
    pub prompt: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            capture_activity: CaptureActivity::default(),
            prompt: "Place a barcode inside the viewfinder rectangle to scan it.".to_string(),
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture_activity(mut self, capture_activity: CaptureActivity) -> Self {
        self.capture_activity = capture_activity;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// How a scan ended. Cancellations are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Scanned(String),
    Cancelled,
    MissingCameraPermission,
}

/// Captures and decodes a code.
pub trait Scanner: Send + Sync {
    fn scan(&self, options: &ScanOptions) -> Result<ScanOutcome, ScanError>;
}

/// Scanner that reads a single frame from an image file.
///
/// Permission to read the file stands in for camera permission. A frame with no
/// detectable code is reported as [`ScanOutcome::Cancelled`], as a live scanner
/// would keep looking until the user gave up.
#[derive(Debug, Clone)]
pub struct ImageFileScanner {
    path: PathBuf,
}

impl ImageFileScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Scanner for ImageFileScanner {
    fn scan(&self, options: &ScanOptions) -> Result<ScanOutcome, ScanError> {
        info!(prompt = %options.prompt, path = %self.path.display(), "scanning");

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                return Ok(ScanOutcome::MissingCameraPermission);
            }
            Err(err) => return Err(err.into()),
        };

        let mut frame = image::load_from_memory(&bytes)?.to_luma8();
        if options.capture_activity == CaptureActivity::VerticalOrientation
            && frame.width() > frame.height()
        {
            frame = imageops::rotate90(&frame);
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.get_pixel(x as u32, y as u32)[0],
        );
        let Some(grid) = prepared.detect_grids().into_iter().next() else {
            debug!("no QR code found in frame");
            return Ok(ScanOutcome::Cancelled);
        };
        let (_meta, content) = grid.decode().map_err(|e| ScanError::Decode(e.to_string()))?;
        Ok(ScanOutcome::Scanned(content))
    }
}

/// Clears the in-flight flag when the scan thread finishes, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs a [`Scanner`], one scan at a time.
pub struct ScanLauncher<S> {
    scanner: Arc<S>,
    in_flight: Arc<AtomicBool>,
}

impl<S: Scanner + 'static> ScanLauncher<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner: Arc::new(scanner),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Starts a scan. Fails with [`ScanError::AlreadyInFlight`] while another is running.
    pub fn launch(&self, options: ScanOptions) -> Result<PendingScan, ScanError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::AlreadyInFlight);
        }

        let (tx, rx) = flume::bounded(1);
        let scanner = Arc::clone(&self.scanner);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        thread::Builder::new()
            .name("scan".to_string())
            .spawn(move || {
                let result = {
                    let _guard = guard;
                    scanner.scan(&options)
                };
                // The receiver may already be gone; nobody is waiting then.
                let _ = tx.send(result);
            })?;

        Ok(PendingScan { rx })
    }
}

/// Handle to a running scan.
#[derive(Debug)]
pub struct PendingScan {
    rx: Receiver<Result<ScanOutcome, ScanError>>,
}

impl PendingScan {
    /// Blocks until the scan finishes.
    pub fn wait(self) -> Result<ScanOutcome, ScanError> {
        self.rx.recv().map_err(|_| ScanError::Interrupted)?
    }

    /// Returns the result if the scan has finished, without blocking.
    pub fn try_take(&self) -> Option<Result<ScanOutcome, ScanError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ScanError::Interrupted)),
        }
    }
}
