//! String type carrying per-segment display attributes.
//!
//! A [`RichStr`] is a list of [`Segment`]s.  Content operations (equality,
//! hashing, ordering, length, searching) only ever look at the plain text;
//! attributes are applied by [`RichStr::render`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::attr::{Attr, Rgb};

/// A run of text sharing the same display attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    pub text: String,
    pub attr: Attr,
    pub rgb: Option<Rgb>,
    pub hyperlink: Option<Rc<str>>,
}

impl Segment {
    fn plain(text: String) -> Self {
        Self { text, ..Self::default() }
    }

    /// A new segment with our attributes and different text.
    fn with_text(&self, text: String) -> Self {
        Self {
            text,
            attr: self.attr,
            rgb: self.rgb,
            hyperlink: self.hyperlink.clone(),
        }
    }

    fn is_styled(&self) -> bool {
        !self.attr.is_empty() || self.rgb.is_some() || self.hyperlink.is_some()
    }
}

/// An immutable-by-convention string made of attributed segments.
///
/// Empty segments are never stored, so `segments().is_empty()` iff the
/// string is empty.
#[derive(Debug, Clone, Default)]
pub struct RichStr {
    segments: Vec<Segment>,
}

impl RichStr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Concatenated text with no attributes applied.
    pub fn plain(&self) -> String {
        let mut out = String::with_capacity(self.byte_len());
        for seg in &self.segments {
            out.push_str(&seg.text);
        }
        out
    }

    fn byte_len(&self) -> usize {
        self.segments.iter().map(|s| s.text.len()).sum()
    }

    /// Number of Unicode characters.
    pub fn char_count(&self) -> usize {
        self.segments.iter().map(|s| s.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a segment, dropping it if empty.
    pub fn push_segment(&mut self, seg: Segment) {
        if !seg.text.is_empty() {
            self.segments.push(seg);
        }
    }

    /// Append plain, unattributed text.
    pub fn push_str(&mut self, s: &str) {
        self.push_segment(Segment::plain(s.to_owned()));
    }

    /// Concatenate, keeping both sides' segment boundaries.
    pub fn concat(&self, other: &RichStr) -> RichStr {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        RichStr { segments }
    }

    /// The character at `idx` (already bounds-checked by the caller),
    /// carrying the attributes of its segment.
    pub fn char_at(&self, idx: usize) -> Option<RichStr> {
        Some(self.slice(idx, idx + 1)).filter(|s| !s.is_empty())
    }

    /// Characters `[start, end)`, clamped to the string.  Each resulting
    /// segment keeps the attributes of the segment it was cut from.
    pub fn slice(&self, start: usize, end: usize) -> RichStr {
        let mut out = RichStr::new();
        let mut offset = 0;
        for seg in &self.segments {
            let n = seg.text.chars().count();
            let (seg_start, seg_end) = (offset, offset + n);
            offset = seg_end;
            let lo = start.max(seg_start);
            let hi = end.min(seg_end);
            if lo >= hi {
                continue;
            }
            let text: String = seg.text.chars().skip(lo - seg_start).take(hi - lo).collect();
            out.push_segment(seg.with_text(text));
        }
        out
    }

    /// Copy with `attr` layered onto every segment.
    pub fn with_attr(&self, attr: Attr) -> RichStr {
        self.map_segments(|seg| seg.attr = seg.attr.apply(attr))
    }

    pub fn with_rgb(&self, rgb: Rgb) -> RichStr {
        self.map_segments(|seg| seg.rgb = Some(rgb))
    }

    pub fn with_hyperlink(&self, link: &str) -> RichStr {
        let link: Rc<str> = Rc::from(link);
        self.map_segments(|seg| seg.hyperlink = Some(link.clone()))
    }

    /// Apply `f` to each segment's text, keeping attributes.
    pub fn map_text(&self, f: impl Fn(&str) -> String) -> RichStr {
        let mut out = RichStr::new();
        for seg in &self.segments {
            out.push_segment(seg.with_text(f(&seg.text)));
        }
        out
    }

    /// Repeat the whole string `n` times (`n <= 0` gives the empty string).
    pub fn repeat(&self, n: i64) -> RichStr {
        let mut out = RichStr::new();
        for _ in 0..n.max(0) {
            out.segments.extend(self.segments.iter().cloned());
        }
        out
    }

    fn map_segments(&self, f: impl Fn(&mut Segment)) -> RichStr {
        let mut out = self.clone();
        for seg in &mut out.segments {
            f(seg);
        }
        out
    }

    /// Render with terminal escape sequences.  With `color` off this is
    /// the same as [`RichStr::plain`].
    pub fn render(&self, color: bool) -> String {
        if !color {
            return self.plain();
        }
        let mut out = String::with_capacity(self.byte_len());
        for seg in &self.segments {
            if !seg.is_styled() {
                out.push_str(&seg.text);
                continue;
            }
            let mut style = seg.attr.to_style();
            if let Some(rgb) = seg.rgb {
                style.foreground_color = Some(rgb.into());
            }
            let styled = style.apply(seg.text.as_str()).to_string();
            match &seg.hyperlink {
                // OSC 8 hyperlink
                Some(link) => {
                    out.push_str(&format!("\x1b]8;;{link}\x1b\\{styled}\x1b]8;;\x1b\\"));
                }
                None => out.push_str(&styled),
            }
        }
        out
    }
}

impl PartialEq for RichStr {
    fn eq(&self, other: &Self) -> bool {
        self.plain() == other.plain()
    }
}

impl Eq for RichStr {}

impl Hash for RichStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.plain().hash(state);
    }
}

impl PartialOrd for RichStr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RichStr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.plain().cmp(&other.plain())
    }
}

impl From<&str> for RichStr {
    fn from(s: &str) -> Self {
        let mut out = RichStr::new();
        out.push_str(s);
        out
    }
}

impl From<String> for RichStr {
    fn from(s: String) -> Self {
        let mut out = RichStr::new();
        out.push_segment(Segment::plain(s));
        out
    }
}

impl fmt::Display for RichStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            f.write_str(&seg.text)?;
        }
        Ok(())
    }
}
