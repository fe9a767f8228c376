//! Text to module matrix encoding.
//!
//! The [`Encoder`] trait is the seam between rendering and the QR symbol
//! construction itself. [`QrEncoder`] is the concrete implementation, backed by
//! the `qrcode` crate, and lays the symbol out the same way ZXing's
//! `QRCodeWriter` does: the symbol plus margin is scaled by the largest whole
//! multiple that fits the requested size and centered in it.

use qrcode::bits::Bits;
use qrcode::types::{Color, EcLevel, QrError, QrResult, Version};
use qrcode::QrCode;
use tracing::debug;

use crate::error::EncodeError;

/// ECI assignment number for UTF-8.
const ECI_UTF8: u32 = 26;

/// Quiet zone used when the caller does not ask for one, in modules.
pub const DEFAULT_MARGIN: u32 = 4;

/// Largest matrix side [`QrEncoder`] will allocate.
pub const MAX_DIMENSION: u32 = 8192;

/// Character set used for byte-mode segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterSet {
    #[default]
    Utf8,
    Iso8859_1,
}

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    #[default]
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// Options passed alongside the content to an [`Encoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeHints {
    pub character_set: CharacterSet,
    pub error_correction: ErrorCorrection,
    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
}

impl Default for EncodeHints {
    fn default() -> Self {
        Self {
            character_set: CharacterSet::default(),
            error_correction: ErrorCorrection::default(),
            margin: DEFAULT_MARGIN,
        }
    }
}

/// A rectangular grid of set/unset flags, indexed by `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BitMatrix {
    /// Creates a matrix with every cell unset.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns whether the cell at `(x, y)` is set. Cells outside the matrix are unset.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32) {
        assert!(x < self.width && y < self.height, "cell ({x}, {y}) outside matrix");
        let i = self.index(x, y);
        self.bits[i] = true;
    }

    /// Sets every cell of the `width` x `height` block whose top-left corner is `(left, top)`.
    pub fn set_region(&mut self, left: u32, top: u32, width: u32, height: u32) {
        for y in top..top + height {
            for x in left..left + width {
                self.set(x, y);
            }
        }
    }

    /// Number of set cells.
    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Produces a module matrix for some content.
pub trait Encoder {
    /// Encodes `content` into a matrix at least `width` x `height` cells large.
    ///
    /// Implementations may return a larger matrix when the symbol plus margin
    /// does not fit in the requested dimensions.
    fn encode(
        &self,
        content: &str,
        width: u32,
        height: u32,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError>;
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode(
        &self,
        content: &str,
        width: u32,
        height: u32,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        (**self).encode(content, width, height, hints)
    }
}

/// Segment mode chosen for the whole content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
}

fn is_alphanumeric(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'A'..=b'Z' | b' ' | b'$' | b'%' | b'*' | b'+' | b'-' | b'.' | b'/' | b':')
}

fn choose_mode(data: &[u8]) -> Mode {
    if data.iter().all(u8::is_ascii_digit) {
        Mode::Numeric
    } else if data.iter().copied().all(is_alphanumeric) {
        Mode::Alphanumeric
    } else {
        Mode::Byte
    }
}

fn to_bytes(content: &str, charset: CharacterSet) -> Result<Vec<u8>, EncodeError> {
    match charset {
        CharacterSet::Utf8 => Ok(content.as_bytes().to_vec()),
        CharacterSet::Iso8859_1 => content
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| EncodeError::UnsupportedCharacter(c)))
            .collect(),
    }
}

fn build_bits(
    data: &[u8],
    mode: Mode,
    eci: Option<u32>,
    version: Version,
    ec_level: EcLevel,
) -> QrResult<Bits> {
    let mut bits = Bits::new(version);
    if let Some(designator) = eci {
        bits.push_eci_designator(designator)?;
    }
    match mode {
        Mode::Numeric => bits.push_numeric_data(data)?,
        Mode::Alphanumeric => bits.push_alphanumeric_data(data)?,
        Mode::Byte => bits.push_byte_data(data)?,
    }
    bits.push_terminator(ec_level)?;
    Ok(bits)
}

/// [`Encoder`] backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl QrEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the smallest symbol that holds `content` at the hinted level.
    fn symbol(&self, content: &str, hints: &EncodeHints) -> Result<QrCode, EncodeError> {
        let data = to_bytes(content, hints.character_set)?;
        let mode = choose_mode(&data);
        let eci = match (mode, hints.character_set) {
            (Mode::Byte, CharacterSet::Utf8) => Some(ECI_UTF8),
            _ => None,
        };
        let ec_level = EcLevel::from(hints.error_correction);

        for v in 1..=40 {
            match build_bits(&data, mode, eci, Version::Normal(v), ec_level) {
                Ok(bits) => {
                    debug!(version = v, ?mode, "selected QR version");
                    return Ok(QrCode::with_bits(bits, ec_level)?);
                }
                Err(QrError::DataTooLong) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(EncodeError::DataTooLong)
    }
}

impl Encoder for QrEncoder {
    fn encode(
        &self,
        content: &str,
        width: u32,
        height: u32,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        if content.is_empty() {
            return Err(EncodeError::EmptyContent);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(EncodeError::InvalidSize {
                size: width.max(height),
                max: MAX_DIMENSION,
            });
        }
        let code = self.symbol(content, hints)?;

        let input = code.width() as u32;
        let qr_width = hints
            .margin
            .checked_mul(2)
            .and_then(|m| m.checked_add(input))
            .filter(|&w| w <= MAX_DIMENSION)
            .ok_or_else(|| EncodeError::Encoder(format!("margin of {} modules is too large", hints.margin)))?;
        let output_width = width.max(qr_width);
        let output_height = height.max(qr_width);

        let multiple = (output_width / qr_width).min(output_height / qr_width);
        let left = (output_width - input * multiple) / 2;
        let top = (output_height - input * multiple) / 2;

        let mut matrix = BitMatrix::new(output_width, output_height);
        for y in 0..input {
            for x in 0..input {
                if code[(x as usize, y as usize)] == Color::Dark {
                    matrix.set_region(left + x * multiple, top + y * multiple, multiple, multiple);
                }
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high(margin: u32) -> EncodeHints {
        EncodeHints {
            character_set: CharacterSet::Utf8,
            error_correction: ErrorCorrection::High,
            margin,
        }
    }

    #[test]
    fn test_natural_size_includes_margin() {
        // "HELLO" fits version 1 (21 modules) in alphanumeric mode.
        let matrix = QrEncoder.encode("HELLO", 0, 0, &high(1)).unwrap();
        assert_eq!((matrix.width(), matrix.height()), (23, 23));
        assert!(!matrix.get(0, 0));
        assert!(matrix.get(1, 1));
    }

    #[test]
    fn test_scaled_symbol_is_centered() {
        let matrix = QrEncoder.encode("HELLO", 800, 800, &high(1)).unwrap();
        assert_eq!((matrix.width(), matrix.height()), (800, 800));
        // 800 / 23 = 34 pixels per module, (800 - 21 * 34) / 2 = 43 pixels of padding.
        assert!(!matrix.get(42, 42));
        assert!(matrix.get(43, 43));
        assert!(matrix.get(43 + 34 * 7 - 1, 43));
        assert!(!matrix.get(43 + 34 * 7, 43));
    }

    #[test]
    fn test_small_request_returns_natural_size() {
        let matrix = QrEncoder.encode("HELLO", 10, 10, &high(1)).unwrap();
        assert_eq!(matrix.width(), 23);
    }

    #[test]
    fn test_oversized_request_rejected() {
        assert_eq!(
            QrEncoder.encode("HELLO", u32::MAX, 10, &high(1)),
            Err(EncodeError::InvalidSize {
                size: u32::MAX,
                max: MAX_DIMENSION
            })
        );
    }

    #[test]
    fn test_huge_margin_rejected() {
        assert!(matches!(
            QrEncoder.encode("HELLO", 0, 0, &high(u32::MAX)),
            Err(EncodeError::Encoder(_))
        ));
        assert!(matches!(
            QrEncoder.encode("HELLO", 0, 0, &high(MAX_DIMENSION)),
            Err(EncodeError::Encoder(_))
        ));
    }

    #[test]
    fn test_empty_content_rejected() {
        assert_eq!(
            QrEncoder.encode("", 100, 100, &high(1)),
            Err(EncodeError::EmptyContent)
        );
    }

    #[test]
    fn test_data_too_long() {
        let content = "x".repeat(5000);
        assert_eq!(
            QrEncoder.encode(&content, 800, 800, &high(1)),
            Err(EncodeError::DataTooLong)
        );
    }

    #[test]
    fn test_unicode_content_encodes() {
        let matrix = QrEncoder.encode("二维码 https://example.com", 400, 400, &high(1)).unwrap();
        assert_eq!(matrix.width(), 400);
        assert!(matrix.count_set() > 0);
    }

    #[test]
    fn test_latin1_rejects_wide_characters() {
        let hints = EncodeHints {
            character_set: CharacterSet::Iso8859_1,
            ..high(1)
        };
        assert_eq!(
            QrEncoder.encode("码", 100, 100, &hints),
            Err(EncodeError::UnsupportedCharacter('码'))
        );
        assert!(QrEncoder.encode("café", 100, 100, &hints).is_ok());
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(choose_mode(b"0123"), Mode::Numeric);
        assert_eq!(choose_mode(b"HTTP://A.B"), Mode::Alphanumeric);
        assert_eq!(choose_mode(b"https://example.com"), Mode::Byte);
    }

    #[test]
    fn test_bit_matrix_out_of_bounds_is_unset() {
        let mut matrix = BitMatrix::new(2, 2);
        matrix.set(1, 1);
        assert!(matrix.get(1, 1));
        assert!(!matrix.get(2, 1));
        assert_eq!(matrix.count_set(), 1);
    }
}
