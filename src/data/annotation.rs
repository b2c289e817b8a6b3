//! Annotation grammar for variant-matrix row labels.
//!
//! A row label produced by the annotation pipeline has the shape
//!
//! ```text
//! position_info ; gene_segment ; gene_segment ... [;]
//! ```
//!
//! The position info is free text holding the allele call (`> A` or, at a
//! multiallelic site, `> A,C`), the `functional=` description and the
//! `locus_tag=... Strand ...` block. Each gene segment is ten pipe-separated
//! fields: allele, effect, impact, gene, locus tag, feature type, feature id,
//! biotype, rank and a terminal sentinel. A segment starting with a nucleotide
//! is one annotated event.
//!
//! Two parse levels are offered. [`RawAnnotation::tokenize`] never fails and is
//! what the splitter works on. [`ParsedAnnotation::parse`] is strict and only
//! succeeds for labels that satisfy the full grammar.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::collections::BTreeSet;
use thiserror::Error;

/// Pipes in a well-formed gene segment (nine fields plus the sentinel).
pub const PIPES_PER_SEGMENT: usize = 9;

/// Index of the gene identifier within a gene segment.
pub const GENE_FIELD: usize = 3;

/// Index of the locus tag within a gene segment.
pub const LOCUS_TAG_FIELD: usize = 4;

static LOCUS_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"locus_tag=(.*?) Strand ").expect("valid locus tag pattern"));

static MULTIALLELIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"> [ACGT],[ACGT]").expect("valid multiallelic pattern"));

static ALT_LIST_TO_FUNCTIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"> [ACGT](?:,[ACGT])+.*?functional=").expect("valid allele list pattern")
});

static ALT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"> [ACGT](?:,[ACGT])+").expect("valid allele list pattern"));

/// Ways a label can violate the annotation grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("no gene segment follows the position info")]
    NoGeneSegments,

    #[error("gene segment {index} is empty")]
    EmptySegment { index: usize },

    #[error("gene segment {index} has {pipes} pipes, expected {PIPES_PER_SEGMENT}")]
    FieldCount { index: usize, pipes: usize },
}

/// True for `A`, `C`, `G` or `T`.
#[inline]
pub fn is_nucleotide(byte: u8) -> bool {
    matches!(byte, b'A' | b'C' | b'G' | b'T')
}

/// Count dividers: a semicolon immediately followed by a nucleotide.
pub fn count_dividers(label: &str) -> usize {
    label
        .as_bytes()
        .windows(2)
        .filter(|w| w[0] == b';' && is_nucleotide(w[1]))
        .count()
}

/// Number of `|` characters in the label.
pub fn pipe_count(label: &str) -> usize {
    label.bytes().filter(|&b| b == b'|').count()
}

/// Number of `;` characters in the label.
pub fn semicolon_count(label: &str) -> usize {
    label.bytes().filter(|&b| b == b';').count()
}

/// Extract the locus tag from a `locus_tag=<tag> Strand ` block.
pub fn locus_tag(label: &str) -> Option<&str> {
    LOCUS_TAG
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// True if the text records two or more alternate alleles together (`> A,C`).
pub fn is_multiallelic(position_info: &str) -> bool {
    MULTIALLELIC.is_match(position_info)
}

/// Narrow a multiallelic allele list down to a single allele.
///
/// `> A,C ... functional=` becomes `> C functional=` for allele `C`. Without a
/// `functional=` field only the allele list itself is replaced. Returns `None`
/// if the text holds no allele list.
pub fn narrow_alleles(position_info: &str, allele: char) -> Option<String> {
    if ALT_LIST_TO_FUNCTIONAL.is_match(position_info) {
        let replacement = format!("> {} functional=", allele);
        return Some(
            ALT_LIST_TO_FUNCTIONAL
                .replacen(position_info, 1, NoExpand(&replacement))
                .into_owned(),
        );
    }
    if ALT_LIST.is_match(position_info) {
        let replacement = format!("> {}", allele);
        return Some(
            ALT_LIST
                .replacen(position_info, 1, NoExpand(&replacement))
                .into_owned(),
        );
    }
    None
}

/// Leading nucleotide of a segment, if it is an event segment.
fn leading_nucleotide(segment: &str) -> Option<char> {
    segment
        .as_bytes()
        .first()
        .copied()
        .filter(|&b| is_nucleotide(b))
        .map(char::from)
}

/// A label split into position info and semicolon segments, without validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnnotation<'a> {
    position_info: &'a str,
    segments: Vec<&'a str>,
    terminated: bool,
}

impl<'a> RawAnnotation<'a> {
    /// Split a label on semicolons.
    ///
    /// A single empty trailing segment is taken as the terminating `;`.
    pub fn tokenize(label: &'a str) -> Self {
        let mut parts = label.split(';');
        let position_info = parts.next().unwrap_or_default();
        let mut segments: Vec<&str> = parts.collect();
        let terminated = segments.last() == Some(&"");
        if terminated {
            segments.pop();
        }
        Self {
            position_info,
            segments,
            terminated,
        }
    }

    /// Text before the first semicolon.
    pub fn position_info(&self) -> &'a str {
        self.position_info
    }

    /// All gene segments, in order.
    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// Segments that start with a nucleotide, one per annotated event.
    pub fn event_segments(&self) -> Vec<&'a str> {
        self.segments
            .iter()
            .copied()
            .filter(|s| leading_nucleotide(s).is_some())
            .collect()
    }

    /// Whether the label ends with a terminating semicolon.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Distinct non-empty gene identifiers across the gene segments.
    pub fn gene_ids(&self) -> BTreeSet<&'a str> {
        self.segments
            .iter()
            .filter_map(|s| s.split('|').nth(GENE_FIELD))
            .filter(|gene| !gene.is_empty())
            .collect()
    }

    /// Reassemble a label from position info and the given segments,
    /// keeping the original terminator.
    pub fn assemble(&self, position_info: &str, segments: &[&str]) -> String {
        let mut label = String::from(position_info);
        for segment in segments {
            label.push(';');
            label.push_str(segment);
        }
        if self.terminated {
            label.push(';');
        }
        label
    }
}

/// Allele of an event segment (its leading nucleotide).
pub fn segment_allele(segment: &str) -> Option<char> {
    leading_nucleotide(segment)
}

/// One well-formed gene segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSegment<'a> {
    raw: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> GeneSegment<'a> {
    /// The segment text without its surrounding semicolons.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// All ten fields, sentinel included.
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    /// Field by 0-based index.
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    /// Allele of the event, if the segment starts with a nucleotide.
    pub fn allele(&self) -> Option<char> {
        leading_nucleotide(self.raw)
    }

    /// Gene identifier (field 4).
    pub fn gene(&self) -> &'a str {
        self.fields[GENE_FIELD]
    }

    /// Locus tag (field 5).
    pub fn locus_tag(&self) -> &'a str {
        self.fields[LOCUS_TAG_FIELD]
    }

    /// True if the segment marks a distinct annotated event.
    pub fn is_event(&self) -> bool {
        self.allele().is_some()
    }
}

/// A label that satisfies the annotation grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnnotation<'a> {
    position_info: &'a str,
    segments: Vec<GeneSegment<'a>>,
    terminated: bool,
}

impl<'a> ParsedAnnotation<'a> {
    /// Parse a label, requiring at least one gene segment and exactly
    /// [`PIPES_PER_SEGMENT`] pipes in every gene segment.
    pub fn parse(label: &'a str) -> Result<Self, AnnotationError> {
        Parser::new(label).parse_annotation()
    }

    /// Text before the first semicolon.
    pub fn position_info(&self) -> &'a str {
        self.position_info
    }

    /// All gene segments, in order.
    pub fn segments(&self) -> &[GeneSegment<'a>] {
        &self.segments
    }

    /// Segments that mark annotated events.
    pub fn events(&self) -> impl Iterator<Item = &GeneSegment<'a>> + '_ {
        self.segments.iter().filter(|s| s.is_event())
    }

    /// Whether the label ends with a terminating semicolon.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Distinct gene identifiers across the gene segments.
    pub fn gene_ids(&self) -> BTreeSet<&'a str> {
        self.segments.iter().map(|s| s.gene()).collect()
    }
}

/// Recursive-descent parser over the label bytes.
///
/// Delimiters are ASCII, so every byte offset the parser stops at is a valid
/// char boundary.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn take_until(&mut self, stop: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stop(b) {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    // annotation := position_info (';' segment)* [';']
    fn parse_annotation(mut self) -> Result<ParsedAnnotation<'a>, AnnotationError> {
        let position_info = self.take_until(|b| b == b';');
        let mut segments = Vec::new();
        let mut terminated = false;

        while self.eat(b';') {
            if self.at_end() {
                terminated = true;
                break;
            }
            let segment = self.parse_segment(segments.len())?;
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(AnnotationError::NoGeneSegments);
        }

        Ok(ParsedAnnotation {
            position_info,
            segments,
            terminated,
        })
    }

    // segment := field ('|' field)*
    fn parse_segment(&mut self, index: usize) -> Result<GeneSegment<'a>, AnnotationError> {
        let start = self.pos;
        let mut fields = vec![self.parse_field()];
        while self.eat(b'|') {
            fields.push(self.parse_field());
        }

        let raw = &self.input[start..self.pos];
        if raw.is_empty() {
            return Err(AnnotationError::EmptySegment { index });
        }
        let pipes = fields.len() - 1;
        if pipes != PIPES_PER_SEGMENT {
            return Err(AnnotationError::FieldCount { index, pipes });
        }

        Ok(GeneSegment { raw, fields })
    }

    fn parse_field(&mut self) -> &'a str {
        self.take_until(|b| b == b';' || b == b'|')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITION: &str =
        "SNP at 1849 > A,C functional=NSYN locus_tag=Rv0001 Strand Information:+";
    const SEG_A: &str = "A|missense_variant|MODERATE|dnaA|Rv0001|transcript|Rv0001.t01|protein_coding|1/1|";
    const SEG_C: &str = "C|synonymous_variant|LOW|dnaN|Rv0002|transcript|Rv0002.t01|protein_coding|1/1|";

    fn label() -> String {
        format!("{};{};{};", POSITION, SEG_A, SEG_C)
    }

    #[test]
    fn test_counts() {
        let label = label();
        assert_eq!(count_dividers(&label), 2);
        assert_eq!(pipe_count(&label), 18);
        assert_eq!(semicolon_count(&label), 3);
        assert_eq!(count_dividers("pos;x|y;"), 0);
    }

    #[test]
    fn test_tokenize() {
        let label = label();
        let raw = RawAnnotation::tokenize(&label);
        assert_eq!(raw.position_info(), POSITION);
        assert_eq!(raw.segments(), &[SEG_A, SEG_C]);
        assert!(raw.is_terminated());
        assert_eq!(raw.event_segments().len(), 2);
        assert_eq!(raw.gene_ids().into_iter().collect::<Vec<_>>(), vec!["dnaA", "dnaN"]);

        let bare = RawAnnotation::tokenize("no segments here");
        assert_eq!(bare.position_info(), "no segments here");
        assert!(bare.segments().is_empty());
        assert!(!bare.is_terminated());
    }

    #[test]
    fn test_assemble_keeps_terminator() {
        let label = label();
        let raw = RawAnnotation::tokenize(&label);
        assert_eq!(raw.assemble(POSITION, &[SEG_C]), format!("{};{};", POSITION, SEG_C));

        let open = format!("{};{}", POSITION, SEG_A);
        let raw = RawAnnotation::tokenize(&open);
        assert_eq!(raw.assemble("p", &[SEG_A]), format!("p;{}", SEG_A));
    }

    #[test]
    fn test_parse_well_formed() {
        let label = label();
        let parsed = ParsedAnnotation::parse(&label).unwrap();
        assert_eq!(parsed.position_info(), POSITION);
        assert_eq!(parsed.segments().len(), 2);
        assert!(parsed.is_terminated());

        let first = &parsed.segments()[0];
        assert_eq!(first.allele(), Some('A'));
        assert_eq!(first.gene(), "dnaA");
        assert_eq!(first.locus_tag(), "Rv0001");
        assert_eq!(first.field(9), Some(""));
        assert_eq!(parsed.events().count(), 2);
        assert_eq!(parsed.gene_ids().len(), 2);
    }

    #[test]
    fn test_parse_single_unterminated_segment() {
        let label = format!("{};{}", POSITION, SEG_A);
        let parsed = ParsedAnnotation::parse(&label).unwrap();
        assert_eq!(parsed.segments().len(), 1);
        assert!(!parsed.is_terminated());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ParsedAnnotation::parse(POSITION),
            Err(AnnotationError::NoGeneSegments)
        );
        assert_eq!(
            ParsedAnnotation::parse(&format!("{};", POSITION)),
            Err(AnnotationError::NoGeneSegments)
        );
        assert_eq!(
            ParsedAnnotation::parse(&format!("{};;{};", POSITION, SEG_A)),
            Err(AnnotationError::EmptySegment { index: 0 })
        );
        let short = "C|synonymous_variant|LOW|dnaN|Rv0002|transcript|protein_coding|1/1|";
        assert_eq!(
            ParsedAnnotation::parse(&format!("{};{};{};", POSITION, SEG_A, short)),
            Err(AnnotationError::FieldCount { index: 1, pipes: 8 })
        );
    }

    #[test]
    fn test_locus_tag() {
        assert_eq!(locus_tag(POSITION), Some("Rv0001"));
        assert_eq!(locus_tag("x locus_tag=NULL Strand Information:-"), Some("NULL"));
        assert_eq!(locus_tag("no tag"), None);
    }

    #[test]
    fn test_multiallelic_and_narrowing() {
        assert!(is_multiallelic(POSITION));
        assert!(!is_multiallelic("SNP at 1849 > A functional=NSYN"));

        let narrowed = narrow_alleles(POSITION, 'C').unwrap();
        assert_eq!(
            narrowed,
            "SNP at 1849 > C functional=NSYN locus_tag=Rv0001 Strand Information:+"
        );

        let spaced = "SNP > A,C,T (3 alts) functional=X";
        assert_eq!(narrow_alleles(spaced, 'T').unwrap(), "SNP > T functional=X");

        assert_eq!(narrow_alleles("SNP > A,G only", 'G').unwrap(), "SNP > G only");
        assert_eq!(narrow_alleles("SNP > A functional=X", 'A'), None);
    }
}
