//! Painter styles offered by the reference deployment

use crate::error::{Result, StyleTransferError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of painter styles.
///
/// Each style maps to exactly one pretrained-weights identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Style {
    Monet,
    Ukiyoe,
    Cezanne,
    Vangogh,
}

impl Style {
    /// Every style, in display order
    pub const ALL: [Style; 4] = [Style::Monet, Style::Ukiyoe, Style::Cezanne, Style::Vangogh];

    /// Lowercase identifier used in URLs, file names and translation keys
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Style::Monet => "monet",
            Style::Ukiyoe => "ukiyoe",
            Style::Cezanne => "cezanne",
            Style::Vangogh => "vangogh",
        }
    }

    /// Pretrained-weights identifier consumed by the model collaborator
    #[must_use]
    pub fn weights_id(self) -> &'static str {
        match self {
            Style::Monet => "style_monet_pretrained",
            Style::Ukiyoe => "style_ukiyoe_pretrained",
            Style::Cezanne => "style_cezanne_pretrained",
            Style::Vangogh => "style_vangogh_pretrained",
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::Monet
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Style {
    type Err = StyleTransferError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|style| style.key()).collect();
                StyleTransferError::invalid_config(format!(
                    "Unknown style '{}'. Available: {}",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}
