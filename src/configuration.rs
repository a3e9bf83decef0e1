use std::path::PathBuf;

pub use clap::Parser;
use thiserror::Error;

use crate::{
    codec::{ErrorCorrection, RenderOptions, DEFAULT_JPEG_QUALITY, DEFAULT_SCALE, MAX_SCALE},
    file::FileKind,
    payload::Tax,
    report::OutputFormat,
};

/// Highest QR version.
pub const MAX_QR_VERSION: i16 = 40;

/// Errors found while validating the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Price {0} must not be negative")]
    NegativePrice(i64),
    #[error("Scale {0} out of range 1-{MAX_SCALE}")]
    InvalidScale(u32),
    #[error("QR version {0} out of range 1-{MAX_QR_VERSION}")]
    InvalidVersion(i16),
    #[error("JPEG quality {0} out of range 1-100")]
    InvalidJpegQuality(u8),
    #[error("Unsupported output {0:?}: expected .txt, .png, .jpg or .jpeg")]
    UnsupportedOutput(PathBuf),
}

/// Converts a static QRIS code into a dynamic one.
#[derive(Parser, Debug, Clone)]
#[command(author = "Piotr Olszewski", version, about, long_about = None)]
pub struct Configuration {
    /// Static code to read: a .txt file holding the payload, or a QR image
    #[arg(short, long)]
    pub input: PathBuf,
    /// Destination (.txt, .png, .jpg, .jpeg); payload goes to stdout if omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Transaction amount
    #[arg(short, long, allow_negative_numbers = true)]
    pub price: Option<i64>,
    /// Convenience fee: a fixed amount (5000) or a percentage (10%)
    #[arg(short, long)]
    pub tax: Option<Tax>,
    /// Error correction level for image output
    #[arg(short, long, value_enum, default_value_t = ErrorCorrection::M)]
    pub ec_level: ErrorCorrection,
    /// Pixels per QR module (1-64)
    #[arg(short, long, default_value_t = DEFAULT_SCALE)]
    pub scale: u32,
    /// Fixed QR version (1-40); smallest fitting version if omitted
    #[arg(long)]
    pub qr_version: Option<i16>,
    /// Render without the white border around the code
    #[arg(long)]
    pub no_quiet_zone: bool,
    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,
    /// Print merchant metadata of the resulting payload
    #[arg(long)]
    pub info: bool,
    /// Metadata report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Configuration {
    /// Checks value ranges that clap cannot express.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(price) = self.price {
            if price < 0 {
                return Err(ConfigurationError::NegativePrice(price));
            }
        }
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigurationError::InvalidScale(self.scale));
        }
        if let Some(version) = self.qr_version {
            if !(1..=MAX_QR_VERSION).contains(&version) {
                return Err(ConfigurationError::InvalidVersion(version));
            }
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigurationError::InvalidJpegQuality(self.jpeg_quality));
        }
        if let Some(ref output) = self.output {
            if FileKind::from_path(output).is_err() {
                return Err(ConfigurationError::UnsupportedOutput(output.clone()));
            }
        }

        Ok(())
    }

    /// Image rendering options. The raster format follows the output path.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            version: self.qr_version,
            error_correction: self.ec_level,
            scale: self.scale,
            quiet_zone: !self.no_quiet_zone,
            jpeg_quality: self.jpeg_quality,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Configuration {
        let mut argv = vec!["qris-dynamic"];
        argv.extend_from_slice(args);
        Configuration::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let conf = parse(&["-i", "static.png"]);
        assert_eq!(conf.input, PathBuf::from("static.png"));
        assert_eq!(conf.output, None);
        assert_eq!(conf.price, None);
        assert_eq!(conf.ec_level, ErrorCorrection::M);
        assert_eq!(conf.scale, DEFAULT_SCALE);
        assert_eq!(conf.format, OutputFormat::Text);
        assert!(!conf.info);
        assert_eq!(conf.validate(), Ok(()));

        let options = conf.render_options();
        assert!(options.quiet_zone);
        assert_eq!(options.version, None);
    }

    #[test]
    fn test_full_command_line() {
        let conf = parse(&[
            "-i", "static.txt", "-o", "dynamic.jpg", "-p", "50000", "-t", "10%", "-e", "H",
            "-s", "4", "--qr-version", "10", "--no-quiet-zone", "--info", "-f", "json",
        ]);
        assert_eq!(conf.price, Some(50000));
        assert_eq!(conf.tax, Some(Tax::Percentage("10".to_string())));
        assert_eq!(conf.ec_level, ErrorCorrection::H);
        assert_eq!(conf.format, OutputFormat::Json);
        assert_eq!(conf.validate(), Ok(()));

        let options = conf.render_options();
        assert_eq!(options.scale, 4);
        assert_eq!(options.version, Some(10));
        assert!(!options.quiet_zone);
    }

    #[test]
    fn test_negative_price_rejected() {
        let conf = parse(&["-i", "a.txt", "-p", "-1"]);
        assert_eq!(conf.validate(), Err(ConfigurationError::NegativePrice(-1)));
    }

    #[test]
    fn test_invalid_tax_rejected_by_parser() {
        let argv = ["qris-dynamic", "-i", "a.txt", "-t", "ten"];
        assert!(Configuration::try_parse_from(argv).is_err());
        let argv = ["qris-dynamic", "-i", "a.txt", "-t", "-5"];
        assert!(Configuration::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_ranges() {
        let conf = parse(&["-i", "a.txt", "-s", "0"]);
        assert_eq!(conf.validate(), Err(ConfigurationError::InvalidScale(0)));

        let max = MAX_SCALE.to_string();
        let conf = parse(&["-i", "a.txt", "-s", &max]);
        assert_eq!(conf.validate(), Ok(()));

        let conf = parse(&["-i", "a.txt", "--qr-version", "41"]);
        assert_eq!(conf.validate(), Err(ConfigurationError::InvalidVersion(41)));

        let conf = parse(&["-i", "a.txt", "--jpeg-quality", "0"]);
        assert_eq!(
            conf.validate(),
            Err(ConfigurationError::InvalidJpegQuality(0))
        );
    }

    #[test]
    fn test_oversized_scale_rejected() {
        let conf = parse(&["-i", "a.txt", "-s", "130150525", "--qr-version", "2"]);
        assert_eq!(
            conf.validate(),
            Err(ConfigurationError::InvalidScale(130_150_525))
        );

        let conf = parse(&["-i", "a.txt", "-s", "65"]);
        assert_eq!(conf.validate(), Err(ConfigurationError::InvalidScale(65)));
    }

    #[test]
    fn test_tax_does_not_swallow_flags() {
        let argv = ["qris-dynamic", "-i", "a.txt", "-t", "--info"];
        assert!(Configuration::try_parse_from(argv).is_err());

        let conf = parse(&["-i", "a.txt", "-p", "100", "-t", "5000", "--info"]);
        assert_eq!(conf.tax, Some(Tax::Nominal(5000)));
        assert!(conf.info);
    }

    #[test]
    fn test_unsupported_output() {
        let conf = parse(&["-i", "a.txt", "-o", "out.gif"]);
        assert_eq!(
            conf.validate(),
            Err(ConfigurationError::UnsupportedOutput(PathBuf::from("out.gif")))
        );
    }

    #[test]
    fn test_input_required() {
        assert!(Configuration::try_parse_from(["qris-dynamic"]).is_err());
    }
}
