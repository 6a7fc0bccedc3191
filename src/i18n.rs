//! Localised interface text
//!
//! Locale documents are nested JSON objects flattened to dotted keys
//! (`styles.monet.name`). Lookups walk an explicit chain: requested locale,
//! then the default locale, then the literal key.

use crate::{
    config::ProcessorConfig,
    error::{Result, StyleTransferError},
    styles::Style,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const BUILTIN_LOCALES: [(&str, &str); 2] = [
    ("en", include_str!("../locales/en.json")),
    ("ru", include_str!("../locales/ru.json")),
];

/// Display metadata for locales the interface knows by name
const LANGUAGE_INFO: [(&str, LanguageInfo); 2] = [
    (
        "en",
        LanguageInfo {
            name: "English",
            flag: "🇺🇸",
            native: "English",
        },
    ),
    (
        "ru",
        LanguageInfo {
            name: "Russian",
            flag: "🇷🇺",
            native: "Русский",
        },
    ),
];

#[derive(Debug, Clone, Copy)]
struct LanguageInfo {
    name: &'static str,
    flag: &'static str,
    native: &'static str,
}

/// Outcome of a translation lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Present in the requested locale
    Found(&'a str),
    /// Absent from the requested locale, taken from the default locale
    Fallback(&'a str),
    /// Absent everywhere; carries the key itself
    Missing(&'a str),
}

impl<'a> Lookup<'a> {
    /// Text to display, whatever the outcome
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match *self {
            Lookup::Found(text) | Lookup::Fallback(text) | Lookup::Missing(text) => text,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing(_))
    }
}

/// Translation tables for every loaded locale
#[derive(Debug, Clone)]
pub struct Translator {
    default_locale: String,
    tables: BTreeMap<String, HashMap<String, String>>,
}

impl Translator {
    /// Empty translator; every lookup is `Missing` until locales are added
    #[must_use]
    pub fn new<S: Into<String>>(default_locale: S) -> Self {
        Self {
            default_locale: default_locale.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Translator with the embedded `en` and `ru` tables
    pub fn builtin<S: Into<String>>(default_locale: S) -> Result<Self> {
        let mut translator = Self::new(default_locale);
        for (locale, json) in BUILTIN_LOCALES {
            translator.add_locale_json(locale, json)?;
        }
        Ok(translator)
    }

    /// Built-in tables plus any `*.json` in the configured locales directory
    pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
        let mut translator = Self::builtin(config.default_locale.clone())?;
        if let Some(dir) = &config.locales_dir {
            translator.load_dir(dir)?;
        }
        if !translator.has_locale(&translator.default_locale) {
            log::warn!(
                "Default locale '{}' has no translation table; keys will be shown verbatim",
                translator.default_locale
            );
        }
        Ok(translator)
    }

    /// Add or extend a locale from a JSON document
    ///
    /// Keys from later documents override earlier ones.
    pub fn add_locale_json(&mut self, locale: &str, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            StyleTransferError::invalid_config(format!(
                "Failed to parse translations for '{}': {}",
                locale, e
            ))
        })?;
        if !value.is_object() {
            return Err(StyleTransferError::invalid_config(format!(
                "Translations for '{}' must be a JSON object",
                locale
            )));
        }

        let table = self.tables.entry(locale.to_string()).or_default();
        flatten_into(table, String::new(), &value);
        Ok(())
    }

    /// Load every `<locale>.json` in `dir`
    ///
    /// Unreadable or malformed files are logged and skipped. Returns the
    /// number of files loaded.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| StyleTransferError::storage("read locales directory", dir, e))?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let result = std::fs::read_to_string(&path)
                .map_err(StyleTransferError::from)
                .and_then(|json| self.add_locale_json(locale, &json));
            match result {
                Ok(()) => {
                    log::info!("Loaded locale '{}' from {}", locale, path.display());
                    loaded += 1;
                },
                Err(e) => log::warn!("Skipping locale file {}: {}", path.display(), e),
            }
        }
        Ok(loaded)
    }

    /// Locale used when a key is missing from the requested one
    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    #[must_use]
    pub fn has_locale(&self, locale: &str) -> bool {
        self.tables.contains_key(locale)
    }

    /// Loaded locale codes, sorted
    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// `requested` if loaded, otherwise the default locale
    #[must_use]
    pub fn resolve_locale<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.has_locale(requested) {
            requested
        } else {
            &self.default_locale
        }
    }

    /// Look up `key` following requested locale, default locale, literal key
    #[must_use]
    pub fn lookup<'a>(&'a self, locale: &str, key: &'a str) -> Lookup<'a> {
        if let Some(text) = self.get(locale, key) {
            return Lookup::Found(text);
        }
        if locale != self.default_locale {
            if let Some(text) = self.get(&self.default_locale, key) {
                return Lookup::Fallback(text);
            }
        }
        Lookup::Missing(key)
    }

    fn get(&self, locale: &str, key: &str) -> Option<&str> {
        self.tables
            .get(locale)
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }

    /// Translated text with `{name}` placeholders filled from `args`
    ///
    /// Placeholders without a matching argument are left as written.
    #[must_use]
    pub fn text(&self, locale: &str, key: &str, args: &[(&str, String)]) -> String {
        let lookup = self.lookup(locale, key);
        if lookup.is_missing() {
            log::debug!("Missing translation '{}' for locale '{}'", key, locale);
        }
        fill_placeholders(lookup.as_str(), args)
    }

    /// Shorthand for [`Self::text`] without arguments
    #[must_use]
    pub fn t(&self, locale: &str, key: &str) -> String {
        self.text(locale, key, &[])
    }

    /// Localised painter name; the style key if untranslated
    #[must_use]
    pub fn style_name(&self, locale: &str, style: Style) -> String {
        let key = format!("styles.{}.name", style.key());
        match self.lookup(locale, &key) {
            Lookup::Missing(_) => style.key().to_string(),
            found => found.as_str().to_string(),
        }
    }

    /// Localised painter description; empty if untranslated
    #[must_use]
    pub fn style_description(&self, locale: &str, style: Style) -> String {
        let key = format!("styles.{}.description", style.key());
        match self.lookup(locale, &key) {
            Lookup::Missing(_) => String::new(),
            found => found.as_str().to_string(),
        }
    }

    /// Short user-facing message for an error
    #[must_use]
    pub fn error_message(&self, locale: &str, err: &StyleTransferError) -> String {
        self.text(locale, err.message_key(), &err.message_args())
    }

    /// Label such as `🇷🇺 Русский (Russian)`; the bare code if unknown
    #[must_use]
    pub fn language_display_name(&self, code: &str) -> String {
        LANGUAGE_INFO
            .iter()
            .find(|(known, _)| *known == code)
            .map_or_else(
                || code.to_string(),
                |(_, info)| format!("{} {} ({})", info.flag, info.native, info.name),
            )
    }

    /// `(code, display name)` for every loaded locale with display metadata
    #[must_use]
    pub fn language_options(&self) -> Vec<(String, String)> {
        LANGUAGE_INFO
            .iter()
            .filter(|(code, _)| self.has_locale(code))
            .map(|(code, _)| ((*code).to_string(), self.language_display_name(code)))
            .collect()
    }
}

fn flatten_into(table: &mut HashMap<String, String>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(table, path, child);
            }
        },
        Value::String(text) => {
            table.insert(prefix, text.clone());
        },
        Value::Number(_) | Value::Bool(_) => {
            table.insert(prefix, value.to_string());
        },
        // Lists and nulls carry no display text
        Value::Array(_) | Value::Null => {},
    }
}

fn fill_placeholders(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}
