//! Instrument identifiers and their default exposure settings.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Known all-sky imager instrument families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    /// Redline Emission Geospace Observatory (630.0 nm).
    Rego,
    /// TREx near-infrared imager.
    TrexNir,
    /// TREx colour (RGB) imager.
    TrexRgb,
    /// TREx blueline imager.
    TrexBlue,
    /// THEMIS white-light imager.
    Themis,
    /// Anything else.
    Other,
}

impl Default for Instrument {
    fn default() -> Self {
        Self::Other
    }
}

/// Case-insensitive, with `-` and `_` interchangeable. Unrecognised names
/// parse as [`Instrument::Other`].
impl FromStr for Instrument {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().replace('-', "_").as_str() {
            "rego" => Self::Rego,
            "trex_nir" | "nir" => Self::TrexNir,
            "trex_rgb" | "rgb" => Self::TrexRgb,
            "trex_blue" | "blue" => Self::TrexBlue,
            "themis" | "themis_asi" => Self::Themis,
            _ => Self::Other,
        })
    }
}

impl Instrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rego => "rego",
            Self::TrexNir => "trex_nir",
            Self::TrexRgb => "trex_rgb",
            Self::TrexBlue => "trex_blue",
            Self::Themis => "themis",
            Self::Other => "other",
        }
    }

    /// Exposure length in seconds used for Rayleighs conversion when the
    /// caller does not supply one.
    pub fn default_exposure_seconds(&self) -> Option<f64> {
        match self {
            Self::Rego => Some(2.0),
            Self::TrexNir => Some(5.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("REGO".parse::<Instrument>(), Ok(Instrument::Rego));
        assert_eq!("trex-nir".parse::<Instrument>(), Ok(Instrument::TrexNir));
        assert_eq!("TREx_RGB".parse::<Instrument>(), Ok(Instrument::TrexRgb));
        assert_eq!("unknown".parse::<Instrument>(), Ok(Instrument::Other));
    }

    #[test]
    fn test_default_exposures() {
        assert_eq!(Instrument::Rego.default_exposure_seconds(), Some(2.0));
        assert_eq!(Instrument::TrexNir.default_exposure_seconds(), Some(5.0));
        assert_eq!(Instrument::Themis.default_exposure_seconds(), None);
    }

    #[test]
    fn test_display_round_trip() {
        for inst in [Instrument::Rego, Instrument::TrexNir, Instrument::TrexBlue] {
            assert_eq!(inst.to_string().parse::<Instrument>(), Ok(inst));
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&Instrument::TrexNir).unwrap();
        assert_eq!(json, "\"trex_nir\"");
        let back: Instrument = serde_json::from_str("\"rego\"").unwrap();
        assert_eq!(back, Instrument::Rego);
    }
}
