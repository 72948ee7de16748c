// SPDX-License-Identifier: Apache-2.0

use crate::project::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The five provinces. Stored records use the labels verbatim; filter
/// parsing additionally accepts the `… Province` long forms and bare
/// `Kigali`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Province {
    #[serde(rename = "Kigali City")]
    Kigali,
    Northern,
    Southern,
    Eastern,
    Western,
}

impl Province {
    pub const ALL: [Province; 5] = [
        Province::Kigali,
        Province::Northern,
        Province::Southern,
        Province::Eastern,
        Province::Western,
    ];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "kigali" | "kigali city" => Ok(Province::Kigali),
            "northern" | "northern province" => Ok(Province::Northern),
            "southern" | "southern province" => Ok(Province::Southern),
            "eastern" | "eastern province" => Ok(Province::Eastern),
            "western" | "western province" => Ok(Province::Western),
            other => Err(ValidationError(format!("unknown province {other:?}"))),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Province::Kigali => "Kigali City",
            Province::Northern => "Northern",
            Province::Southern => "Southern",
            Province::Eastern => "Eastern",
            Province::Western => "Western",
        }
    }
}

impl Display for Province {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Authoritative sector catalog. Record writes canonicalize against it;
/// sector filters stay free-form substrings so a parent label like
/// `Agriculture` still matches the compound entry.
pub const SECTORS: [&str; 11] = [
    "Agriculture & Agro-processing",
    "Manufacturing",
    "ICT & Digital Services",
    "Tourism & Hospitality",
    "Energy",
    "Construction & Real Estate",
    "Mining",
    "Health Services",
    "Education",
    "Transport & Logistics",
    "Financial Services",
];

#[must_use]
pub fn canonical_sector(input: &str) -> Option<&'static str> {
    let wanted = input.trim();
    SECTORS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(wanted))
        .copied()
}

#[must_use]
pub fn is_known_sector(input: &str) -> bool {
    canonical_sector(input).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Startup,
    Expansion,
    #[serde(rename = "Joint Venture")]
    JointVenture,
    #[serde(rename = "Public-Private Partnership")]
    PublicPrivatePartnership,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Startup,
        Category::Expansion,
        Category::JointVenture,
        Category::PublicPrivatePartnership,
    ];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "startup" => Ok(Category::Startup),
            "expansion" => Ok(Category::Expansion),
            "joint venture" => Ok(Category::JointVenture),
            "public-private partnership" | "ppp" => Ok(Category::PublicPrivatePartnership),
            other => Err(ValidationError(format!("unknown category {other:?}"))),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Startup => "Startup",
            Category::Expansion => "Expansion",
            Category::JointVenture => "Joint Venture",
            Category::PublicPrivatePartnership => "Public-Private Partnership",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
