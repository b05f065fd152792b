use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookup tables driving structured-data validation.
///
/// Built once (from defaults or a config file) and shared by reference; the
/// validator never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Type name -> retirement note
    #[serde(default = "default_deprecated")]
    pub deprecated: BTreeMap<String, String>,

    /// Type name -> restriction note
    #[serde(default = "default_restricted")]
    pub restricted: BTreeMap<String, String>,

    /// Literal markers, matched case-insensitively, reported in this order
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            deprecated: default_deprecated(),
            restricted: default_restricted(),
            placeholders: default_placeholders(),
        }
    }
}

impl RuleSet {
    pub fn deprecation(&self, type_name: &str) -> Option<&str> {
        self.deprecated.get(type_name).map(String::as_str)
    }

    pub fn restriction(&self, type_name: &str) -> Option<&str> {
        self.restricted.get(type_name).map(String::as_str)
    }

    /// Markers found in `text`, in table order, each at most once
    pub fn placeholders_in<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a str> {
        let haystack = text.to_lowercase();
        self.placeholders
            .iter()
            .filter(move |marker| haystack.contains(&marker.to_lowercase()))
            .map(String::as_str)
    }
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_deprecated() -> BTreeMap<String, String> {
    table(&[
        ("HowTo", "deprecated September 2023"),
        ("SpecialAnnouncement", "deprecated July 31, 2025"),
        ("CourseInfo", "retired June 2025"),
        ("EstimatedSalary", "retired June 2025"),
        ("LearningVideo", "retired June 2025"),
        (
            "ClaimReview",
            "retired June 2025 - fact-check rich results discontinued",
        ),
        (
            "VehicleListing",
            "retired June 2025 - vehicle listing structured data discontinued",
        ),
    ])
}

fn default_restricted() -> BTreeMap<String, String> {
    table(&[(
        "FAQPage",
        "restricted to government and healthcare sites only (Aug 2023)",
    )])
}

fn default_placeholders() -> Vec<String> {
    [
        "[Business Name]",
        "[City]",
        "[State]",
        "[Phone]",
        "[Address]",
        "[Your",
        "[INSERT",
        "REPLACE",
        "[URL]",
        "[Email]",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}
