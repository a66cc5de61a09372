//! Country normalisation for campaign records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A country a pilot or squadron can serve.
///
/// Campaign files spell countries many ways (`"GER"`, `"Deutschland"`,
/// `"United Kingdom"`). Everything that is not recognised falls back to
/// [`Country::Germany`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    #[default]
    Germany,
    France,
    Britain,
    Belgian,
    Usa,
}

impl Country {
    /// All countries, in display order.
    pub const ALL: [Country; 5] = [
        Country::Germany,
        Country::France,
        Country::Britain,
        Country::Belgian,
        Country::Usa,
    ];

    /// Folder-style code, e.g. `"BRITAIN"`.
    pub fn code(self) -> &'static str {
        match self {
            Country::Germany => "GERMANY",
            Country::France => "FRANCE",
            Country::Britain => "BRITAIN",
            Country::Belgian => "BELGIAN",
            Country::Usa => "USA",
        }
    }

    /// Human-readable label, e.g. `"Britain"`.
    pub fn label(self) -> &'static str {
        match self {
            Country::Germany => "Germany",
            Country::France => "France",
            Country::Britain => "Britain",
            Country::Belgian => "Belgian",
            Country::Usa => "USA",
        }
    }

    /// Recognises a spelling, ignoring case and surrounding whitespace.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        let country = match upper.as_str() {
            "GERMANY" | "GER" | "DE" | "DEU" | "ALEMANHA" | "ALLEMAGNE" | "DEUTSCHLAND" => {
                Country::Germany
            }
            "FRANCE" | "FR" | "FRA" => Country::France,
            "BRITAIN" | "UK" | "GB" | "GBR" | "UNITED KINGDOM" | "BRIT" => Country::Britain,
            "BELGIAN" | "BELGIUM" | "BE" | "BEL" => Country::Belgian,
            "USA" | "US" | "UNITED STATES" | "UNITED STATES OF AMERICA" => Country::Usa,
            _ => return None,
        };
        Some(country)
    }

    /// Like [`from_alias`](Self::from_alias), with the default for unknown
    /// or missing values.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(Self::from_alias).unwrap_or_default()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
