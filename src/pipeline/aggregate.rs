//! Ordered accumulation of extracted text.
//!
//! Parts carry the listing index they were dispatched with, so the rendered document follows
//! storage order even when jobs complete out of order.

use super::types::ExtractionKind;

/// Text extracted from one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedPart {
    /// Key of the source object.
    pub source_key: String,
    /// Extraction that produced the text.
    pub kind: ExtractionKind,
    /// Extracted text.
    pub text: String,
}

/// Extracted text blocks in storage listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedDocument {
    parts: Vec<AggregatedPart>,
}

impl AggregatedDocument {
    /// Build a document from parts tagged with their listing index.
    ///
    /// Parts are ordered by index, never by the order they were produced in.
    pub fn from_indexed(mut parts: Vec<(usize, AggregatedPart)>) -> Self {
        parts.sort_by_key(|(index, _)| *index);
        Self {
            parts: parts.into_iter().map(|(_, part)| part).collect(),
        }
    }

    /// Source keys in order.
    pub fn source_keys(&self) -> Vec<String> {
        self.parts
            .iter()
            .map(|part| part.source_key.clone())
            .collect()
    }

    /// Concatenate every block as `\n\n<LABEL> from <key>:\n<text>`.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for part in &self.parts {
            rendered.push_str("\n\n");
            rendered.push_str(part.kind.label());
            rendered.push_str(" from ");
            rendered.push_str(&part.source_key);
            rendered.push_str(":\n");
            rendered.push_str(&part.text);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(key: &str, kind: ExtractionKind, text: &str) -> AggregatedPart {
        AggregatedPart {
            source_key: key.into(),
            kind,
            text: text.into(),
        }
    }

    #[test]
    fn empty_document_renders_empty() {
        assert_eq!(AggregatedDocument::default().render(), "");
        assert_eq!(AggregatedDocument::from_indexed(Vec::new()).render(), "");
    }

    #[test]
    fn renders_header_per_block() {
        let document = AggregatedDocument::from_indexed(vec![
            (0, part("case1/a.pdf", ExtractionKind::Ocr, "Hello\nWorld")),
            (1, part("case1/b.wav", ExtractionKind::Transcription, "spoken")),
        ]);

        assert_eq!(
            document.render(),
            "\n\nOCR from case1/a.pdf:\nHello\nWorld\n\nTranscription from case1/b.wav:\nspoken"
        );
        assert_eq!(document.source_keys(), ["case1/a.pdf", "case1/b.wav"]);
    }

    #[test]
    fn indexed_parts_follow_listing_index_not_completion_order() {
        let document = AggregatedDocument::from_indexed(vec![
            (2, part("c", ExtractionKind::Ocr, "C")),
            (0, part("a", ExtractionKind::Ocr, "A")),
            (1, part("b", ExtractionKind::Ocr, "B")),
        ]);

        assert_eq!(document.source_keys(), ["a", "b", "c"]);
    }
}
