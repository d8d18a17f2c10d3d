//! Display settings: ticker text, mute flag and logo.
//!
//! Stored as key/value rows; see [`DisplaySettings::to_pairs`] and
//! [`DisplaySettings::from_pairs`] for the mapping.

use serde::{Deserialize, Serialize};

pub const KEY_TICKER_TEXT: &str = "ticker_text";
pub const KEY_LOGO_FILENAME: &str = "logo_filename";
pub const KEY_VIDEO_MUTED: &str = "video_muted";

/// Ticker text used when nothing has been configured.
pub const DEFAULT_TICKER_TEXT: &str = "Welcome to our information service.";

/// Longest ticker text accepted from the admin form, in characters.
pub const MAX_TICKER_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub ticker_text: String,
    pub video_muted: bool,
    pub logo_filename: Option<String>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::with_ticker(DEFAULT_TICKER_TEXT)
    }
}

impl DisplaySettings {
    pub fn with_ticker(ticker_text: impl Into<String>) -> Self {
        Self {
            ticker_text: ticker_text.into(),
            video_muted: true,
            logo_filename: None,
        }
    }

    /// Builds settings from stored rows on top of `defaults`.
    ///
    /// Unknown keys are ignored; missing keys keep the default value.
    pub fn from_pairs<I, K, V>(defaults: DisplaySettings, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = defaults;
        for (key, value) in pairs {
            let value: String = value.into();
            match key.as_ref() {
                KEY_TICKER_TEXT => settings.ticker_text = value,
                KEY_VIDEO_MUTED => settings.video_muted = value == "1",
                KEY_LOGO_FILENAME => {
                    settings.logo_filename = if value.is_empty() { None } else { Some(value) }
                }
                _ => {}
            }
        }
        settings
    }

    /// The rows to store, one per known key.
    pub fn to_pairs(&self) -> [(&'static str, String); 3] {
        [
            (KEY_TICKER_TEXT, self.ticker_text.clone()),
            (
                KEY_LOGO_FILENAME,
                self.logo_filename.clone().unwrap_or_default(),
            ),
            (
                KEY_VIDEO_MUTED,
                if self.video_muted { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}

/// Trims ticker input and caps it at [`MAX_TICKER_CHARS`] characters.
pub fn normalize_ticker(input: &str) -> String {
    input.trim().chars().take(MAX_TICKER_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_muted_without_logo() {
        let s = DisplaySettings::default();
        assert!(s.video_muted);
        assert!(s.logo_filename.is_none());
        assert_eq!(s.ticker_text, DEFAULT_TICKER_TEXT);
    }

    #[test]
    fn from_pairs_overrides_known_keys() {
        let s = DisplaySettings::from_pairs(
            DisplaySettings::default(),
            vec![
                ("ticker_text", "Visiting hours 11:00-13:00"),
                ("video_muted", "0"),
                ("logo_filename", "logo_x.png"),
            ],
        );
        assert_eq!(s.ticker_text, "Visiting hours 11:00-13:00");
        assert!(!s.video_muted);
        assert_eq!(s.logo_filename.as_deref(), Some("logo_x.png"));
    }

    #[test]
    fn from_pairs_ignores_unknown_and_keeps_missing() {
        let s = DisplaySettings::from_pairs(
            DisplaySettings::with_ticker("Hello"),
            vec![("theme", "dark")],
        );
        assert_eq!(s, DisplaySettings::with_ticker("Hello"));
    }

    #[test]
    fn empty_logo_means_none() {
        let s = DisplaySettings::from_pairs(
            DisplaySettings::default(),
            vec![("logo_filename", "")],
        );
        assert!(s.logo_filename.is_none());
    }

    #[test]
    fn to_pairs_encodes_flag_and_missing_logo() {
        let s = DisplaySettings {
            ticker_text: "t".into(),
            video_muted: false,
            logo_filename: None,
        };
        let pairs = s.to_pairs();
        assert!(pairs.contains(&("video_muted", "0".to_string())));
        assert!(pairs.contains(&("logo_filename", String::new())));
        assert_eq!(
            DisplaySettings::from_pairs(DisplaySettings::default(), pairs),
            s
        );
    }

    #[test]
    fn normalize_ticker_trims_and_caps() {
        assert_eq!(normalize_ticker("  hi  "), "hi");
        let long = "é".repeat(300);
        assert_eq!(normalize_ticker(&long).chars().count(), MAX_TICKER_CHARS);
    }
}
