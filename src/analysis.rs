//! # Telegram Analysis Annotations
//!
//! While decoding, drivers and the telegram parser describe how each byte
//! range was interpreted. These annotations feed protocol-analysis tooling
//! (the CLI `analyze` view); they never influence the decoded field values.
//!
//! Each [`Annotation`] covers exactly one byte range of the telegram,
//! addressed by absolute frame offset, and carries a confidence level so
//! partially understood or unknown bytes stand out in the listing.

use serde::Serialize;

/// What layer of the telegram an annotation describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnnotationKind {
    /// Framing and structural bytes (headers, identifiers)
    Protocol,
    /// Decoded measurement content
    Content,
}

/// How well the annotated bytes are understood
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    /// Bytes are present but their meaning is unknown
    None,
    /// Interpretation is plausible but not certain
    Partial,
    /// Interpretation is known to be correct
    Full,
}

/// One annotated byte range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Absolute offset of the first byte within the telegram frame
    pub offset: usize,
    /// Number of bytes covered
    pub length: usize,
    pub kind: AnnotationKind,
    pub confidence: Confidence,
    pub message: String,
}

impl Annotation {
    pub fn new(
        offset: usize,
        length: usize,
        kind: AnnotationKind,
        confidence: Confidence,
        message: impl Into<String>,
    ) -> Self {
        Self {
            offset,
            length,
            kind,
            confidence,
            message: message.into(),
        }
    }
}

/// Where decoders publish annotations
pub trait AnnotationSink {
    fn annotate(&mut self, note: Annotation);
}

/// Collects the annotations of one telegram
#[derive(Debug, Clone, Default)]
pub struct TelegramAnalysis {
    notes: Vec<Annotation>,
}

impl TelegramAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations in arrival order
    pub fn notes(&self) -> &[Annotation] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Render the annotations as one line per byte range, sorted by offset
    ///
    /// Lines carry a marker for reduced confidence: `?` for partial, `!` for
    /// unknown bytes. Offsets are hexadecimal, matching the hexdump view.
    pub fn render(&self) -> String {
        let mut sorted: Vec<&Annotation> = self.notes.iter().collect();
        sorted.sort_by_key(|note| note.offset);

        sorted
            .iter()
            .map(|note| {
                let marker = match note.confidence {
                    Confidence::Full => ' ',
                    Confidence::Partial => '?',
                    Confidence::None => '!',
                };
                format!("{:04x} {} {}", note.offset, marker, note.message)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AnnotationSink for TelegramAnalysis {
    fn annotate(&mut self, note: Annotation) {
        self.notes.push(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_arrival_order() {
        let mut analysis = TelegramAnalysis::new();
        analysis.annotate(Annotation::new(
            20,
            1,
            AnnotationKind::Content,
            Confidence::Full,
            "0e voltage of battery 3.70 V",
        ));
        analysis.annotate(Annotation::new(
            19,
            1,
            AnnotationKind::Protocol,
            Confidence::Full,
            "15 frame content",
        ));

        assert_eq!(analysis.len(), 2);
        assert_eq!(analysis.notes()[0].offset, 20);
        assert_eq!(analysis.notes()[1].offset, 19);
    }

    #[test]
    fn test_render_sorts_by_offset_with_markers() {
        let mut analysis = TelegramAnalysis::new();
        analysis.annotate(Annotation::new(
            33,
            1,
            AnnotationKind::Content,
            Confidence::None,
            "00 unknown data",
        ));
        analysis.annotate(Annotation::new(
            19,
            1,
            AnnotationKind::Protocol,
            Confidence::Full,
            "15 frame content",
        ));

        let rendered = analysis.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0013   15 frame content"));
        assert!(lines[1].starts_with("0021 ! 00 unknown data"));
    }

    #[test]
    fn test_render_empty() {
        let analysis = TelegramAnalysis::new();
        assert_eq!(analysis.render(), "");
        assert!(analysis.is_empty());
    }
}
