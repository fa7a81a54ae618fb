//! Render inputs: template snapshots, submissions and overlay metadata.
//!
//! Field names follow the camelCase JSON the form layer produces.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::format::RawTimestamp;

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaiverType {
    Passenger,
    Representative,
}

impl WaiverType {
    pub fn display_name(self) -> &'static str {
        match self {
            WaiverType::Passenger => "Passenger",
            WaiverType::Representative => "Representative",
        }
    }
}

/// One immutable template snapshot. Block order is significant: block 0
/// is the introduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiverTemplate {
    pub waiver_type: WaiverType,
    pub version: String,
    pub effective_date: String,
    pub title: String,
    pub blocks: Vec<TemplateBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBlock {
    pub id: String,
    pub label: String,
    pub template_text: String,
    /// Authoring hint only; the text is the source of truth.
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Role a block plays in the composed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Intro,
    Title,
    Media,
    Clause,
}

impl TemplateBlock {
    pub fn new(id: &str, label: &str, template_text: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            template_text: template_text.to_string(),
            parameters: crate::interpolate::extract_placeholders(template_text),
        }
    }

    /// Kind inferred from the block id.
    pub fn kind(&self) -> BlockKind {
        let id = self.id.to_lowercase();
        if id.contains("intro") {
            BlockKind::Intro
        } else if id.contains("title") {
            BlockKind::Title
        } else if id.contains("media") {
            BlockKind::Media
        } else {
            BlockKind::Clause
        }
    }
}

// ============================================================================
// Submissions
// ============================================================================

/// The signer's choice on use of the passenger's likeness.
///
/// Deserializes from its camelCase tag, or from the free text stored by
/// older form versions (see [`MediaRelease::from_legacy_text`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaRelease {
    FullConsent,
    ConsentWithInitials,
    NoConsent,
}

impl MediaRelease {
    /// Resolves a free-text selection from older form versions or the
    /// paper upload form ("yes" / "no").
    pub fn from_legacy_text(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if lower == "no" || lower.contains("do not consent") {
            MediaRelease::NoConsent
        } else if lower.contains("initials instead") {
            MediaRelease::ConsentWithInitials
        } else {
            MediaRelease::FullConsent
        }
    }
}

impl<'de> Deserialize<'de> for MediaRelease {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(match text.as_str() {
            "fullConsent" => MediaRelease::FullConsent,
            "consentWithInitials" => MediaRelease::ConsentWithInitials,
            "noConsent" => MediaRelease::NoConsent,
            legacy => MediaRelease::from_legacy_text(legacy),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub town: String,
}

impl Passenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// PNG/JPEG as a `data:` URL or bare base64.
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessSignature {
    pub name: String,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signatures {
    pub passenger: Signature,
    pub witness: WitnessSignature,
}

/// Everything needed to paint one composed waiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiverSubmission {
    #[serde(default, alias = "waiverUId")]
    pub waiver_id: Option<String>,
    pub waiver_type: WaiverType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    pub passenger: Passenger,
    #[serde(default)]
    pub representative: Option<Person>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub agreements: BTreeMap<String, bool>,
    pub media_release: MediaRelease,
    #[serde(default)]
    pub signatures: Signatures,
}

impl WaiverSubmission {
    pub fn is_representative(&self) -> bool {
        self.waiver_type == WaiverType::Representative
    }

    /// Name of whoever signs on the left of the signature row.
    pub fn signer_name(&self) -> String {
        match (&self.representative, self.waiver_type) {
            (Some(rep), WaiverType::Representative) => rep.full_name(),
            _ => self.passenger.full_name(),
        }
    }
}

// ============================================================================
// Paper uploads
// ============================================================================

/// Facts stamped onto the first page of a scanned paper waiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayMetadata {
    pub waiver_id: String,
    pub signed_date: NaiveDate,
    pub uploaded_by_email: String,
    #[serde(default)]
    pub upload_date: Option<NaiveDate>,
}
