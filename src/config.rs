//! Render settings shared by the CLI and library callers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaiverError};
use crate::format::DisplayZone;

/// A4 dimensions in mm
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// US Letter dimensions in mm
pub const LETTER_WIDTH_MM: f32 = 215.9;
pub const LETTER_HEIGHT_MM: f32 = 279.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// (width, height) in mm.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (A4_WIDTH_MM, A4_HEIGHT_MM),
            PageSize::Letter => (LETTER_WIDTH_MM, LETTER_HEIGHT_MM),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = WaiverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(WaiverError::InputError(format!("unknown page size: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    pub organization_name: String,
    /// Prefix of the footer version tag.
    pub organization_short_name: String,
    /// File path or http(s) URL.
    pub logo: Option<String>,
    pub page_size: PageSize,
    /// IANA zone for signature timestamps; the host's zone when unset.
    pub time_zone: Option<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            organization_name: "Cycling Without Age Society".to_string(),
            organization_short_name: "CWAS".to_string(),
            logo: None,
            page_size: PageSize::A4,
            time_zone: None,
        }
    }
}

impl RenderSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WaiverError::InputError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WaiverError::InputError(format!("Invalid settings JSON: {}", e)))
    }

    /// Footer tag such as `CWAS-PAS(v1.0)`.
    pub fn version_tag(&self, version: &str) -> String {
        format!("{}-PAS({})", self.organization_short_name, version)
    }

    pub fn display_zone(&self) -> Result<DisplayZone> {
        match &self.time_zone {
            Some(name) => DisplayZone::from_name(name),
            None => Ok(DisplayZone::local()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = RenderSettings::from_json(r#"{ "pageSize": "letter" }"#).unwrap();
        assert_eq!(settings.page_size, PageSize::Letter);
        assert_eq!(settings.organization_short_name, "CWAS");
        assert_eq!(settings.version_tag("v1.0"), "CWAS-PAS(v1.0)");
    }

    #[test]
    fn bad_json_is_an_input_error() {
        let err = RenderSettings::from_json("{ nope").unwrap_err();
        assert!(matches!(err, WaiverError::InputError(_)));
    }

    #[test]
    fn page_size_parses_case_insensitively() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("Letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert!("tabloid".parse::<PageSize>().is_err());
    }

    #[test]
    fn configured_zone_is_used() {
        let settings = RenderSettings {
            time_zone: Some("Europe/Paris".into()),
            ..Default::default()
        };
        assert_eq!(settings.display_zone().unwrap().name(), "Europe/Paris");
    }
}
