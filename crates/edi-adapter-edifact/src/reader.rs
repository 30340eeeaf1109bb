//! Segment tokenizer and cursor
//!
//! [`SegmentReader`] splits EDIFACT text into [`SegmentRecord`]s and exposes a
//! three-level cursor (segment, data element, data component) that the node
//! tree consumes while parsing.

use crate::syntax::{EdiConfig, split_unescaped, unescape};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// A tokenized segment
///
/// Data elements and their components are stored as queues; reading a
/// component removes it from the front of the first data element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    /// Segment tag (e.g. `UNH`)
    pub tag: String,
    /// Data elements, each an ordered list of unescaped components
    pub data_elements: VecDeque<VecDeque<String>>,
    /// Segment body as it appeared in the input, still escaped
    pub raw: String,
}

impl SegmentRecord {
    /// Tokenize a single segment body (without its terminator)
    #[must_use]
    pub fn tokenize(body: &str, config: &EdiConfig) -> Self {
        let release = config.release_character;
        let mut parts = split_unescaped(body, config.data_element_separator, release)
            .into_iter()
            .map(str::trim);

        let tag = parts.next().map(|t| unescape(t, release)).unwrap_or_default();
        let data_elements = parts
            .map(|element| {
                split_unescaped(element, config.data_component_separator, release)
                    .into_iter()
                    .map(|component| unescape(component.trim(), release))
                    .collect()
            })
            .collect();

        Self {
            tag,
            data_elements,
            raw: body.to_string(),
        }
    }

    /// Data elements as plain vectors
    #[must_use]
    pub fn elements(&self) -> Vec<Vec<String>> {
        self.data_elements
            .iter()
            .map(|element| element.iter().cloned().collect())
            .collect()
    }
}

/// Cursor over the segments of one EDIFACT text
#[derive(Debug, Clone)]
pub struct SegmentReader {
    segments: VecDeque<SegmentRecord>,
    consumed: usize,
    config: EdiConfig,
}

impl SegmentReader {
    /// Tokenize `text`
    ///
    /// A leading UNA overrides the separators of `config` for this text.
    /// Segment bodies are trimmed and empty segments are dropped.
    #[must_use]
    pub fn new(text: &str, config: &EdiConfig) -> Self {
        let (config, body) = config.with_una(text);
        if body.len() != text.len() {
            debug!(
                "Using UNA separators: component '{}', element '{}', release '{}'",
                config.data_component_separator,
                config.data_element_separator,
                config.release_character
            );
        }

        let segments: VecDeque<SegmentRecord> =
            split_unescaped(body, config.segment_terminator(), config.release_character)
                .into_iter()
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(|segment| SegmentRecord::tokenize(segment, &config))
                .collect();

        debug!("Tokenized {} segment(s)", segments.len());

        Self {
            segments,
            consumed: 0,
            config,
        }
    }

    /// Effective configuration (after any UNA)
    #[must_use]
    pub fn config(&self) -> &EdiConfig {
        &self.config
    }

    /// Segment under the cursor
    #[must_use]
    pub fn current(&self) -> Option<&SegmentRecord> {
        self.segments.front()
    }

    /// True when the current segment has the given tag
    #[must_use]
    pub fn at_tag(&self, tag: &str) -> bool {
        self.current().is_some_and(|segment| segment.tag == tag)
    }

    /// First remaining data element of the current segment
    #[must_use]
    pub fn current_data_element(&self) -> Option<&VecDeque<String>> {
        self.current()
            .and_then(|segment| segment.data_elements.front())
    }

    /// Remove and return the first remaining data element of the current segment
    pub fn next_data_element(&mut self) -> Option<Vec<String>> {
        self.segments
            .front_mut()
            .and_then(|segment| segment.data_elements.pop_front())
            .map(Vec::from)
    }

    /// First remaining component of the current data element
    #[must_use]
    pub fn current_data_component(&self) -> Option<&str> {
        self.current_data_element()
            .and_then(|element| element.front())
            .map(String::as_str)
    }

    /// Remove and return the first remaining component of the current data element
    pub fn next_data_component(&mut self) -> Option<String> {
        self.segments
            .front_mut()
            .and_then(|segment| segment.data_elements.front_mut())
            .and_then(VecDeque::pop_front)
    }

    /// Number of segments consumed so far
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of segments not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.segments.len()
    }

    /// True when every segment has been consumed
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Iterator for SegmentReader {
    type Item = SegmentRecord;

    /// Advance past the current segment, returning it
    fn next(&mut self) -> Option<SegmentRecord> {
        let segment = self.segments.pop_front()?;
        self.consumed += 1;
        trace!("Consumed segment {} ({})", self.consumed, segment.tag);
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> SegmentReader {
        SegmentReader::new(text, &EdiConfig::default())
    }

    #[test]
    fn test_tokenize_released_separator() {
        let reader = reader("UNH+1:2?+3'");
        assert_eq!(reader.remaining(), 1);

        let segment = reader.current().unwrap();
        assert_eq!(segment.tag, "UNH");
        assert_eq!(segment.elements(), vec![vec!["1", "2+3"]]);
        assert_eq!(segment.raw, "UNH+1:2?+3");
    }

    #[test]
    fn test_whitespace_and_empty_segments_dropped() {
        let reader = reader("UNB+UNOC:3'\n\n  ''BGM+7'\n");
        let tags: Vec<String> = reader.map(|s| s.tag).collect();
        assert_eq!(tags, vec!["UNB", "BGM"]);
    }

    #[test]
    fn test_component_cursor() {
        let mut reader = reader("QTY+220:4250.000:KWH+X'LIN+1'");

        assert_eq!(reader.current_data_component(), Some("220"));
        assert_eq!(reader.next_data_component().as_deref(), Some("220"));
        assert_eq!(reader.next_data_component().as_deref(), Some("4250.000"));
        assert_eq!(reader.next_data_component().as_deref(), Some("KWH"));
        assert_eq!(reader.next_data_component(), None);

        // The exhausted element stays in place until it is explicitly advanced
        assert_eq!(reader.next_data_element(), Some(Vec::new()));
        assert_eq!(reader.next_data_element(), Some(vec!["X".to_string()]));
        assert_eq!(reader.next_data_element(), None);

        let consumed = reader.next().unwrap();
        assert_eq!(consumed.tag, "QTY");
        assert_eq!(reader.consumed(), 1);
        assert!(reader.at_tag("LIN"));
    }

    #[test]
    fn test_empty_element_has_no_components() {
        let mut reader = reader("NAD+MS++9900:293'");
        assert_eq!(reader.next_data_element(), Some(vec!["MS".to_string()]));
        assert_eq!(reader.current_data_component(), None);
        assert_eq!(reader.next_data_element(), Some(Vec::new()));
        assert_eq!(reader.next_data_component().as_deref(), Some("9900"));
    }

    #[test]
    fn test_released_terminator_and_release() {
        let reader = reader("FTX+AAA+++It?'s 50?? off'");
        let segment = reader.current().unwrap();
        assert_eq!(segment.data_elements[3][0], "It's 50? off");
    }

    #[test]
    fn test_una_switches_separators() {
        let mut reader = reader("UNA*=,# ~UNB=UNOC*3~QTY=220*1,5~");
        assert_eq!(reader.config().decimal_notation, ',');
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.next().unwrap().elements(), vec![vec!["UNOC", "3"]]);
        assert_eq!(reader.current().unwrap().elements(), vec![vec!["220", "1,5"]]);
    }

    #[test]
    fn test_exhausted_reader() {
        let mut reader = reader("");
        assert!(reader.is_exhausted());
        assert!(reader.current().is_none());
        assert!(reader.next().is_none());
        assert_eq!(reader.next_data_component(), None);
        assert_eq!(reader.consumed(), 0);
    }
}
