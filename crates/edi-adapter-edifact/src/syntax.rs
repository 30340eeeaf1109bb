//! EDIFACT syntax definitions and delimiter handling
//!
//! This module holds the separator configuration, the service string advice
//! (UNA) and the escape-aware splitting/escaping primitives shared by the
//! tokenizer and the serializer.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default EDIFACT separators (when no UNA is present)
pub const DEFAULT_COMPONENT_SEPARATOR: char = ':';
pub const DEFAULT_ELEMENT_SEPARATOR: char = '+';
pub const DEFAULT_DECIMAL_NOTATION: char = '.';
pub const DEFAULT_RELEASE_CHARACTER: char = '?';
pub const DEFAULT_SEGMENT_SEPARATOR: &str = "'\n";

/// Separator and rendering configuration
///
/// The first character of `segment_separator` terminates a segment; anything
/// after it (typically a newline) is layout written after each segment and
/// trimmed away on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdiConfig {
    pub segment_separator: String,
    pub data_element_separator: char,
    pub data_component_separator: char,
    pub release_character: char,
    pub decimal_notation: char,
    /// Prepend a UNA segment when serializing
    pub service_string_advice: bool,
    pub trailers: TrailerConfig,
}

/// Segments that carry running totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrailerConfig {
    /// Resets the per-message segment count and counts one message
    pub message_header_tag: String,
    /// Receives the per-message segment count (itself included)
    pub message_trailer_tag: String,
    pub segment_count_field: String,
    /// Receives the number of messages in the interchange
    pub interchange_trailer_tag: String,
    pub message_count_field: String,
}

impl Default for TrailerConfig {
    fn default() -> Self {
        Self {
            message_header_tag: "UNH".to_string(),
            message_trailer_tag: "UNT".to_string(),
            segment_count_field: "numberOfSegmentsInMessage".to_string(),
            interchange_trailer_tag: "UNZ".to_string(),
            message_count_field: "interchangeControlCount".to_string(),
        }
    }
}

impl Default for EdiConfig {
    fn default() -> Self {
        Self {
            segment_separator: DEFAULT_SEGMENT_SEPARATOR.to_string(),
            data_element_separator: DEFAULT_ELEMENT_SEPARATOR,
            data_component_separator: DEFAULT_COMPONENT_SEPARATOR,
            release_character: DEFAULT_RELEASE_CHARACTER,
            decimal_notation: DEFAULT_DECIMAL_NOTATION,
            service_string_advice: false,
            trailers: TrailerConfig::default(),
        }
    }
}

impl EdiConfig {
    /// Character terminating a segment
    #[must_use]
    pub fn segment_terminator(&self) -> char {
        self.segment_separator
            .chars()
            .next()
            .unwrap_or('\'')
    }

    /// Check if a character is a special character (needs escaping)
    #[must_use]
    pub fn is_special(&self, c: char) -> bool {
        c == self.segment_terminator()
            || c == self.data_element_separator
            || c == self.data_component_separator
            || c == self.release_character
    }

    /// Reject configurations whose special characters collide
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty segment separator or when two
    /// special characters (or the decimal notation) coincide.
    pub fn validate(&self) -> Result<()> {
        if self.segment_separator.is_empty() {
            return Err(Error::Config("segment separator must not be empty".to_string()));
        }

        let specials = [
            ("segment terminator", self.segment_terminator()),
            ("data element separator", self.data_element_separator),
            ("data component separator", self.data_component_separator),
            ("release character", self.release_character),
        ];

        for (i, (name, c)) in specials.iter().enumerate() {
            for (other_name, other) in &specials[i + 1..] {
                if c == other {
                    return Err(Error::Config(format!(
                        "{name} and {other_name} are both '{c}'"
                    )));
                }
            }
            if *c == self.decimal_notation {
                return Err(Error::Config(format!(
                    "decimal notation '{c}' collides with the {name}"
                )));
            }
        }

        Ok(())
    }

    /// Render the service string advice for this configuration
    /// UNA format: UNA:+.? '
    /// Positions:  012345678
    #[must_use]
    pub fn to_una(&self) -> String {
        let layout: String = self.segment_separator.chars().skip(1).collect();
        format!(
            "UNA{}{}{}{} {}{}",
            self.data_component_separator,
            self.data_element_separator,
            self.decimal_notation,
            self.release_character,
            self.segment_terminator(),
            layout
        )
    }

    /// Apply a leading UNA service string advice, if present
    ///
    /// Returns the effective configuration and the remaining input after the
    /// UNA segment. Input without UNA is returned unchanged.
    #[must_use]
    pub fn with_una<'a>(&self, input: &'a str) -> (EdiConfig, &'a str) {
        let trimmed = input.trim_start();
        if !trimmed.starts_with("UNA") {
            return (self.clone(), input);
        }

        let chars: Vec<(usize, char)> = trimmed.char_indices().take(10).collect();
        if chars.len() < 9 {
            return (self.clone(), input);
        }

        let terminator = chars[8].1;
        let layout: String = self.segment_separator.chars().skip(1).collect();
        let config = EdiConfig {
            segment_separator: format!("{terminator}{layout}"),
            data_component_separator: chars[3].1,
            data_element_separator: chars[4].1,
            decimal_notation: chars[5].1,
            release_character: chars[6].1,
            // Position 7 is reserved (space)
            ..self.clone()
        };

        let rest = chars
            .get(9)
            .map_or("", |(offset, _)| &trimmed[*offset..]);
        (config, rest)
    }

    /// Escape every special character by prefixing the release character
    #[must_use]
    pub fn escape(&self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            if self.is_special(c) {
                escaped.push(self.release_character);
            }
            escaped.push(c);
        }
        escaped
    }
}

/// Split on unescaped occurrences of `separator`
///
/// A release character makes the next character literal, so `??+` splits
/// (the release is itself released) while `?+` does not. Escapes are kept in
/// the returned parts for the next splitting level. A trailing empty part is
/// dropped.
#[must_use]
pub fn split_unescaped(input: &str, separator: char, release: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut released = false;

    for (index, c) in input.char_indices() {
        if released {
            released = false;
        } else if c == release {
            released = true;
        } else if c == separator {
            parts.push(&input[start..index]);
            start = index + c.len_utf8();
        }
    }

    if start < input.len() {
        parts.push(&input[start..]);
    }

    parts
}

/// Remove release characters, keeping the character each one releases
///
/// A release character at the very end has nothing to release and is kept.
#[must_use]
pub fn unescape(input: &str, release: char) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c == release {
            match chars.next() {
                Some(released) => output.push(released),
                None => output.push(c),
            }
        } else {
            output.push(c);
        }
    }

    output
}
