//! `{{placeholder}}` substitution for template text.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::format::{format_date, one_year_after, DisplayZone};
use crate::model::WaiverSubmission;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replaces every `{{name}}` in `text` with `values[name]`, or with the
/// empty string when the name is unknown.
///
/// Single pass: substituted values are never re-scanned, so a value that
/// itself contains `{{...}}` is emitted literally.
pub fn interpolate<V>(text: &str, values: &V) -> String
where
    V: Lookup + ?Sized,
{
    interpolate_with(text, |name| values.lookup(name))
}

/// [`interpolate`] driven by a lookup closure.
pub fn interpolate_with<'v, F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<&'v str>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Placeholder names in order of first appearance, without duplicates.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps[1].to_string();
            seen.insert(name.clone()).then_some(name)
        })
        .collect()
}

/// Anything interpolation can read values from.
pub trait Lookup {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl Lookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Lookup for std::collections::HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Lookup for BTreeMap<String, Option<String>> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_deref())
    }
}

// ============================================================================
// Standard parameter set
// ============================================================================

/// The values every waiver template may reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpolationParams {
    values: BTreeMap<String, String>,
}

impl InterpolationParams {
    /// Builds `firstName`, `lastName`, `town`, `representativeFirstName`,
    /// `representativeLastName`, `email`, `phone`, `currentDate`,
    /// `expiryDate`, `year` and `waiverId` from a submission.
    ///
    /// Dates come from the submission's creation and expiry instants; `now`
    /// only stands in for a missing creation time.
    pub fn from_submission(
        submission: &WaiverSubmission,
        now: DateTime<Utc>,
        zone: &DisplayZone,
    ) -> Self {
        let created = submission.created_at.unwrap_or(now);
        let created_date = zone.local_date(created);
        let expiry_date = submission
            .expiry_date
            .map(|e| zone.local_date(e))
            .unwrap_or_else(|| one_year_after(created_date));
        let (rep_first, rep_last) = submission
            .representative
            .as_ref()
            .map(|r| (r.first_name.as_str(), r.last_name.as_str()))
            .unwrap_or_default();

        let mut params = Self::default();
        params
            .set("firstName", &submission.passenger.first_name)
            .set("lastName", &submission.passenger.last_name)
            .set("town", &submission.passenger.town)
            .set("representativeFirstName", rep_first)
            .set("representativeLastName", rep_last)
            .set("email", &submission.contact.email)
            .set("phone", &submission.contact.phone)
            .set("currentDate", &format_date(created_date))
            .set("expiryDate", &format_date(expiry_date))
            .set("year", &zone.year_of(created).to_string());
        if let Some(id) = &submission.waiver_id {
            params.set("waiverId", id);
        }
        params
    }

    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl Lookup for InterpolationParams {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}
