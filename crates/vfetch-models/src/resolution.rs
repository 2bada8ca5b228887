//! Supported output resolutions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// 3840x2160
    P2160,
    /// 1920x1080
    P1080,
    /// 1280x720
    P720,
    /// 854x480
    P480,
}

/// Unknown resolution label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Unsupported resolution '{0}'. Supported resolutions: {labels}", labels = Resolution::supported_labels())]
    Unsupported(String),
}

impl Resolution {
    /// Every supported resolution, highest first.
    pub const ALL: [Resolution; 4] = [
        Resolution::P2160,
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::P2160 => "2160p",
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
            Resolution::P480 => "480p",
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Resolution::P2160 => 3840,
            Resolution::P1080 => 1920,
            Resolution::P720 => 1280,
            Resolution::P480 => 854,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Resolution::P2160 => 2160,
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
            Resolution::P480 => 480,
        }
    }

    /// Comma separated list of labels, e.g. for error messages.
    pub fn supported_labels() -> String {
        Self::ALL
            .iter()
            .map(Resolution::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Resolution {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| ResolutionError::Unsupported(s.to_string()))
    }
}

impl TryFrom<String> for Resolution {
    type Error = ResolutionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_catalog_geometry() {
        assert_eq!((Resolution::P2160.width(), Resolution::P2160.height()), (3840, 2160));
        assert_eq!((Resolution::P1080.width(), Resolution::P1080.height()), (1920, 1080));
        assert_eq!((Resolution::P720.width(), Resolution::P720.height()), (1280, 720));
        assert_eq!((Resolution::P480.width(), Resolution::P480.height()), (854, 480));
    }

    #[test]
    fn test_parse_accepts_labels() {
        assert_eq!("720p".parse::<Resolution>().unwrap(), Resolution::P720);
        assert_eq!(" 1080P ".parse::<Resolution>().unwrap(), Resolution::P1080);
    }

    #[test]
    fn test_unsupported_label_lists_supported() {
        let err = "4k".parse::<Resolution>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported resolution '4k'. Supported resolutions: 2160p, 1080p, 720p, 480p"
        );
        assert_err!("240p".parse::<Resolution>());
        assert_err!("".parse::<Resolution>());
    }

    #[test]
    fn test_serde_uses_label() {
        assert_eq!(serde_json::to_string(&Resolution::P480).unwrap(), "\"480p\"");
        let r: Resolution = serde_json::from_str("\"2160p\"").unwrap();
        assert_eq!(r, Resolution::P2160);
        assert!(serde_json::from_str::<Resolution>("\"4k\"").is_err());
    }
}
