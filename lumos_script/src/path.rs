use std::ops::Range;

use crate::diagnostics::ResolveError;

pub const SEPARATOR: char = '.';

/// A dotted identifier path split into its segments.
///
/// Segments borrow from the raw input and remember their byte span so
/// diagnostics can quote the traversed prefix exactly as the caller wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPath<'a> {
    raw: &'a str,
    spans: Vec<Range<usize>>,
}

impl<'a> ScriptPath<'a> {
    /// Splits `raw` on `.`. Empty input and empty segments (leading,
    /// trailing or doubled separators) are rejected.
    pub fn parse(raw: &'a str) -> Result<Self, ResolveError> {
        if raw.is_empty() {
            return Err(ResolveError::EmptyPath);
        }
        let mut spans = Vec::new();
        let mut start = 0;
        for (offset, ch) in raw.char_indices() {
            if ch == SEPARATOR {
                if offset == start {
                    return Err(ResolveError::EmptySegment { offset });
                }
                spans.push(start..offset);
                start = offset + ch.len_utf8();
            }
        }
        if start == raw.len() {
            return Err(ResolveError::EmptySegment { offset: start });
        }
        spans.push(start..raw.len());
        Ok(Self { raw, spans })
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn segment(&self, index: usize) -> Option<&'a str> {
        let raw = self.raw;
        self.spans.get(index).map(|span| &raw[span.clone()])
    }

    pub fn segments(&self) -> impl Iterator<Item = &'a str> + '_ {
        let raw = self.raw;
        self.spans.iter().map(move |span| &raw[span.clone()])
    }

    /// The raw text up to and including segment `index`.
    pub fn prefix(&self, index: usize) -> &'a str {
        match self.spans.get(index) {
            Some(span) => &self.raw[..span.end],
            None => self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_is_a_global_lookup() {
        let path = ScriptPath::parse("hp").expect("valid path");
        assert_eq!(path.segments().count(), 1);
        assert_eq!(path.segment(0), Some("hp"));
        assert_eq!(path.prefix(0), "hp");
    }

    #[test]
    fn nested_path_keeps_every_segment() {
        let path = ScriptPath::parse("player.stats.hp").expect("valid path");
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, ["player", "stats", "hp"]);
        assert_eq!(path.prefix(1), "player.stats");
        assert_eq!(path.prefix(2), "player.stats.hp");
    }

    #[test]
    fn empty_and_doubled_separators_are_rejected() {
        assert_eq!(ScriptPath::parse(""), Err(ResolveError::EmptyPath));
        assert_eq!(
            ScriptPath::parse("a..b"),
            Err(ResolveError::EmptySegment { offset: 2 })
        );
        assert_eq!(
            ScriptPath::parse(".a"),
            Err(ResolveError::EmptySegment { offset: 0 })
        );
        assert_eq!(
            ScriptPath::parse("a."),
            Err(ResolveError::EmptySegment { offset: 2 })
        );
    }

    #[test]
    fn non_ascii_segments_split_on_char_boundaries() {
        let path = ScriptPath::parse("héros.vie").expect("valid path");
        assert_eq!(path.segment(0), Some("héros"));
        assert_eq!(path.segment(1), Some("vie"));
        assert_eq!(path.segment(2), None);
    }
}
