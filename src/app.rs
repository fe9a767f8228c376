//! Action dispatch for the scan / open / generate screen.
//!
//! [`App`] owns the screen state (the result field, the data field and the
//! image slot) and turns each [`Action`] into calls on the scanner, the link
//! opener and the renderer. Every failure ends up as a [`Toast`]; nothing here
//! returns an error to the caller.

use tracing::{debug, info, warn};
use url::Url;

use crate::encoder::Encoder;
use crate::error::{OpenError, ScanError};
use crate::overlay::DEFAULT_LOGO_RATIO;
use crate::render::{Bitmap, QrRenderer};
use crate::scan::{CaptureActivity, PendingScan, ScanLauncher, ScanOptions, ScanOutcome, Scanner};

/// Side length of generated codes, in pixels.
pub const DEFAULT_QR_SIZE: u32 = 800;

/// How long a notification stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLength {
    Short,
    Long,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub length: ToastLength,
}

impl Toast {
    pub fn short(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            length: ToastLength::Short,
        }
    }

    pub fn long(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            length: ToastLength::Long,
        }
    }
}

/// Shows notifications to the user.
pub trait Notifier {
    fn notify(&self, toast: Toast);
}

/// Hands links to whatever the platform uses to open them.
pub trait LinkOpener {
    fn open(&self, uri: &Url) -> Result<(), OpenError>;
}

/// [`LinkOpener`] using the system's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLinkOpener;

impl LinkOpener for SystemLinkOpener {
    fn open(&self, uri: &Url) -> Result<(), OpenError> {
        open::that(uri.as_str()).map_err(|source| OpenError::Launch {
            uri: uri.to_string(),
            source,
        })
    }
}

/// Parses the text of the result field as a link.
pub fn parse_link(input: &str) -> Result<Url, OpenError> {
    Url::parse(input.trim()).map_err(|source| OpenError::InvalidUri {
        input: input.to_string(),
        source,
    })
}

/// User-triggered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Scan,
    OpenLink,
    Generate,
}

/// Settings for an [`App`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub qr_size: u32,
    pub scan_prompt: String,
    pub capture_activity: CaptureActivity,
    pub logo_ratio: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            qr_size: DEFAULT_QR_SIZE,
            scan_prompt: "Scan frame".to_string(),
            capture_activity: CaptureActivity::VerticalOrientation,
            logo_ratio: DEFAULT_LOGO_RATIO,
        }
    }
}

pub struct App<E, S> {
    config: AppConfig,
    renderer: QrRenderer<E>,
    launcher: ScanLauncher<S>,
    opener: Box<dyn LinkOpener>,
    notifier: Box<dyn Notifier>,
    logo: Option<Bitmap>,
    pending: Option<PendingScan>,
    result_text: String,
    data_text: String,
    image: Option<Bitmap>,
}

impl<E: Encoder, S: Scanner + 'static> App<E, S> {
    pub fn new(
        config: AppConfig,
        encoder: E,
        scanner: S,
        opener: Box<dyn LinkOpener>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let renderer = QrRenderer::new(encoder).with_logo_ratio(config.logo_ratio);
        Self {
            config,
            renderer,
            launcher: ScanLauncher::new(scanner),
            opener,
            notifier,
            logo: None,
            pending: None,
            result_text: String::new(),
            data_text: String::new(),
            image: None,
        }
    }

    /// Sets the logo drawn on generated codes.
    pub fn with_logo(mut self, logo: Bitmap) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn set_result_text(&mut self, text: impl Into<String>) {
        self.result_text = text.into();
    }

    pub fn data_text(&self) -> &str {
        &self.data_text
    }

    pub fn set_data_text(&mut self, text: impl Into<String>) {
        self.data_text = text.into();
    }

    /// The most recently generated code, if the last generation succeeded.
    pub fn image(&self) -> Option<&Bitmap> {
        self.image.as_ref()
    }

    pub fn is_scanning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn click(&mut self, action: Action) {
        debug!(?action, "click");
        match action {
            Action::Scan => self.start_scan(),
            Action::OpenLink => self.open_link(),
            Action::Generate => self.generate(),
        }
    }

    fn start_scan(&mut self) {
        let options = ScanOptions::new()
            .with_capture_activity(self.config.capture_activity)
            .with_prompt(self.config.scan_prompt.clone());
        match self.launcher.launch(options) {
            Ok(pending) => self.pending = Some(pending),
            Err(ScanError::AlreadyInFlight) => debug!("scan already in progress"),
            Err(err) => self.on_scan_result(Err(err)),
        }
    }

    /// Waits for the running scan, if any, and applies its outcome.
    ///
    /// Returns `false` when no scan was running.
    pub fn finish_scan(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                let result = pending.wait();
                self.on_scan_result(result);
                true
            }
            None => false,
        }
    }

    /// Applies the running scan's outcome if it has arrived. Returns `true` once applied.
    pub fn poll_scan(&mut self) -> bool {
        let Some(result) = self.pending.as_ref().and_then(PendingScan::try_take) else {
            return false;
        };
        self.pending = None;
        self.on_scan_result(result);
        true
    }

    fn on_scan_result(&mut self, result: Result<ScanOutcome, ScanError>) {
        match result {
            Ok(ScanOutcome::Scanned(contents)) => {
                info!("scanned");
                self.notifier.notify(Toast::long(format!("Scanned: {contents}")));
                self.result_text = contents;
            }
            Ok(ScanOutcome::Cancelled) => {
                info!("cancelled scan");
                self.notifier.notify(Toast::long("Cancelled"));
            }
            Ok(ScanOutcome::MissingCameraPermission) => {
                info!("cancelled scan due to missing camera permission");
                self.notifier
                    .notify(Toast::long("Cancelled due to missing camera permission"));
            }
            Err(err) => {
                warn!(%err, "scan failed");
                self.notifier.notify(Toast::long(format!("Scan failed: {err}")));
            }
        }
    }

    fn open_link(&mut self) {
        let result = parse_link(&self.result_text).and_then(|uri| {
            info!(%uri, "opening link");
            self.opener.open(&uri)
        });
        if let Err(err) = result {
            warn!(%err, "failed to open link");
            self.notifier.notify(Toast::short(format!("Cannot open link: {err}")));
        }
    }

    fn generate(&mut self) {
        let data = self.data_text.trim();
        if data.is_empty() {
            self.notifier.notify(Toast::short("Please enter text"));
            return;
        }

        self.image = self
            .renderer
            .render(data, self.config.qr_size, self.logo.as_ref())
            .inspect_err(|err| warn!(%err, "failed to generate QR code"))
            .ok();
        if self.image.is_none() {
            self.notifier.notify(Toast::short("Generation failed"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{BitMatrix, EncodeHints, QrEncoder};
    use crate::error::EncodeError;
    use image::{ImageBuffer, Rgba};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingNotifier(Rc<RefCell<Vec<Toast>>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, toast: Toast) {
            self.0.borrow_mut().push(toast);
        }
    }

    impl RecordingNotifier {
        fn texts(&self) -> Vec<String> {
            self.0.borrow().iter().map(|t| t.text.clone()).collect()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingOpener(Rc<RefCell<Vec<String>>>);

    impl LinkOpener for RecordingOpener {
        fn open(&self, uri: &Url) -> Result<(), OpenError> {
            self.0.borrow_mut().push(uri.to_string());
            Ok(())
        }
    }

    struct FailingOpener;

    impl LinkOpener for FailingOpener {
        fn open(&self, uri: &Url) -> Result<(), OpenError> {
            Err(OpenError::Launch {
                uri: uri.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no handler"),
            })
        }
    }

    struct FixedScanner(ScanOutcome);

    impl Scanner for FixedScanner {
        fn scan(&self, _: &ScanOptions) -> Result<ScanOutcome, ScanError> {
            Ok(self.0.clone())
        }
    }

    struct RejectingEncoder;

    impl Encoder for RejectingEncoder {
        fn encode(&self, _: &str, _: u32, _: u32, _: &EncodeHints) -> Result<BitMatrix, EncodeError> {
            Err(EncodeError::DataTooLong)
        }
    }

    fn app_with<E: Encoder>(
        encoder: E,
        outcome: ScanOutcome,
    ) -> (App<E, FixedScanner>, RecordingNotifier, RecordingOpener) {
        let notifier = RecordingNotifier::default();
        let opener = RecordingOpener::default();
        let config = AppConfig {
            qr_size: 200,
            ..AppConfig::default()
        };
        let app = App::new(
            config,
            encoder,
            FixedScanner(outcome),
            Box::new(opener.clone()),
            Box::new(notifier.clone()),
        );
        (app, notifier, opener)
    }

    #[test]
    fn test_scan_success_fills_result_field() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Scanned("https://a.b".into()));
        app.click(Action::Scan);
        assert!(app.is_scanning());
        assert!(app.finish_scan());
        assert!(!app.is_scanning());
        assert_eq!(app.result_text(), "https://a.b");
        assert_eq!(notifier.0.borrow()[0], Toast::long("Scanned: https://a.b"));
    }

    #[test]
    fn test_scan_cancellations_leave_result_field() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_result_text("kept");
        app.click(Action::Scan);
        app.finish_scan();
        assert_eq!(app.result_text(), "kept");
        assert_eq!(notifier.texts(), vec!["Cancelled"]);

        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::MissingCameraPermission);
        app.click(Action::Scan);
        app.finish_scan();
        assert_eq!(app.result_text(), "");
        assert_eq!(notifier.texts(), vec!["Cancelled due to missing camera permission"]);
    }

    #[test]
    fn test_poll_scan_eventually_applies() {
        let (mut app, _, _) = app_with(QrEncoder, ScanOutcome::Scanned("polled".into()));
        app.click(Action::Scan);
        while !app.poll_scan() {
            std::thread::yield_now();
        }
        assert_eq!(app.result_text(), "polled");
        assert!(!app.poll_scan());
    }

    #[test]
    fn test_finish_scan_without_scan() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        assert!(!app.finish_scan());
        assert!(notifier.texts().is_empty());
    }

    #[test]
    fn test_open_link_uses_result_field() {
        let (mut app, notifier, opener) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_result_text("https://example.com/path");
        app.click(Action::OpenLink);
        assert_eq!(*opener.0.borrow(), vec!["https://example.com/path"]);
        assert!(notifier.texts().is_empty());
    }

    #[test]
    fn test_open_link_invalid_uri_notifies() {
        let (mut app, notifier, opener) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_result_text("not a link");
        app.click(Action::OpenLink);
        assert!(opener.0.borrow().is_empty());
        assert!(notifier.texts()[0].starts_with("Cannot open link"));
    }

    #[test]
    fn test_open_link_launch_failure_notifies() {
        let notifier = RecordingNotifier::default();
        let mut app = App::new(
            AppConfig::default(),
            QrEncoder,
            FixedScanner(ScanOutcome::Cancelled),
            Box::new(FailingOpener),
            Box::new(notifier.clone()),
        );
        app.set_result_text("https://example.com");
        app.click(Action::OpenLink);
        assert_eq!(notifier.0.borrow()[0].length, ToastLength::Short);
    }

    #[test]
    fn test_generate_requires_text() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_data_text("   ");
        app.click(Action::Generate);
        assert!(app.image().is_none());
        assert_eq!(notifier.0.borrow()[0], Toast::short("Please enter text"));
    }

    #[test]
    fn test_generate_trims_and_renders() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_data_text("  hello  ");
        app.click(Action::Generate);
        let image = app.image().expect("image should be generated");
        assert_eq!(image.dimensions(), (200, 200));
        assert!(notifier.texts().is_empty());

        let expected = QrRenderer::new(QrEncoder).render("hello", 200, None).unwrap();
        assert_eq!(image, &expected);
    }

    #[test]
    fn test_generate_failure_clears_image() {
        let (mut app, notifier, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        app.set_data_text("hello");
        app.click(Action::Generate);
        assert!(app.image().is_some());

        app.set_data_text("x".repeat(5000));
        app.click(Action::Generate);
        assert!(app.image().is_none());
        assert_eq!(notifier.texts(), vec!["Generation failed"]);

        let (mut app, notifier, _) = app_with(RejectingEncoder, ScanOutcome::Cancelled);
        app.set_data_text("hello");
        app.click(Action::Generate);
        assert!(app.image().is_none());
        assert_eq!(notifier.texts(), vec!["Generation failed"]);
    }

    #[test]
    fn test_generate_with_logo() {
        let (app, _, _) = app_with(QrEncoder, ScanOutcome::Cancelled);
        let logo = ImageBuffer::from_pixel(20, 20, Rgba([0, 0, 255, 255]));
        let mut app = app.with_logo(logo);
        app.set_data_text("https://example.com");
        app.click(Action::Generate);
        let image = app.image().unwrap();
        assert_eq!(*image.get_pixel(100, 100), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_parse_link_trims() {
        assert_eq!(parse_link(" https://a.b/ ").unwrap().as_str(), "https://a.b/");
        assert!(matches!(parse_link(""), Err(OpenError::InvalidUri { .. })));
    }
}
