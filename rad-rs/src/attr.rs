//! Text display attributes.
//!
//! An [`Attr`] packs style bits (bold, italic, underline) and an optional
//! named foreground color into a single `u32`.  RGB colors and hyperlinks
//! are carried separately on each string segment (see
//! [`RichStr`](crate::richstr::RichStr)) because they don't fit the packed
//! layout.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crossterm::style::{Attribute, Color, ContentStyle};

/// Text display attributes for a run of characters.
///
/// Use the associated constants and [`Attr::with_fg`] to build values; use
/// [`Attr::contains`] and [`Attr::fg_color`] to inspect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attr(u32);

impl Attr {
    // ── Style flags (low bits) ────────────────────────────────────────────
    pub const UNDERLINE: Self = Self(0x0001);
    pub const BOLD: Self      = Self(0x0004);
    pub const ITALIC: Self    = Self(0x0008);

    // ── Color encoding ────────────────────────────────────────────────────
    // Foreground: flag at bit 7, 4-bit palette index at bits 8-11.
    const FG_FLAG: u32  = 0x0080;
    const FG_MASK: u32  = 0x0f00;
    const FG_SHIFT: u32 = 8;

    /// The empty/zero attribute value.
    pub const EMPTY: Self = Self(0);

    // ── Inspection ────────────────────────────────────────────────────────

    /// Returns `true` if no attribute bits are set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the foreground palette index, if one is set.
    #[inline]
    pub fn fg_color(self) -> Option<u8> {
        if self.0 & Self::FG_FLAG != 0 {
            Some(((self.0 & Self::FG_MASK) >> Self::FG_SHIFT) as u8)
        } else {
            None
        }
    }

    // ── Construction ──────────────────────────────────────────────────────

    /// Return a copy of `self` with the foreground color set to `color`.
    #[inline]
    pub fn with_fg(self, color: u8) -> Self {
        Self(
            (self.0 & !(Self::FG_FLAG | Self::FG_MASK))
                | Self::FG_FLAG
                | ((color as u32) << Self::FG_SHIFT),
        )
    }

    /// Return a copy of `self` with the foreground color cleared.
    #[inline]
    pub fn without_fg(self) -> Self {
        Self(self.0 & !(Self::FG_FLAG | Self::FG_MASK))
    }

    /// Parse a script-level attribute name (`"red"`, `"bold"`, …).
    ///
    /// `"plain"` yields [`Attr::EMPTY`].
    pub fn from_name(name: &str) -> Option<Self> {
        let attr = match name {
            "plain" => Self::EMPTY,
            "bold" => Self::BOLD,
            "italic" => Self::ITALIC,
            "underline" => Self::UNDERLINE,
            other => Self::EMPTY.with_fg(color::from_name(other)?),
        };
        Some(attr)
    }

    /// Combine `other` into `self`.  A color in `other` replaces ours;
    /// [`Attr::EMPTY`] (`plain`) resets everything.
    pub fn apply(self, other: Self) -> Self {
        if other.is_empty() {
            return Self::EMPTY;
        }
        let base = if other.fg_color().is_some() { self.without_fg() } else { self };
        base | other
    }

    /// Build a crossterm style for rendering.
    pub fn to_style(self) -> ContentStyle {
        let mut style = ContentStyle::new();
        if let Some(c) = self.fg_color() {
            style.foreground_color = Some(color::to_crossterm(c));
        }
        if self.contains(Self::BOLD)      { style.attributes.set(Attribute::Bold); }
        if self.contains(Self::ITALIC)    { style.attributes.set(Attribute::Italic); }
        if self.contains(Self::UNDERLINE) { style.attributes.set(Attribute::Underlined); }
        style
    }
}

impl BitOr for Attr {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for Attr {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitAnd for Attr {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
}

impl Not for Attr {
    type Output = Self;
    fn not(self) -> Self { Self(!self.0) }
}

/// Every attribute name accepted by [`Attr::from_name`], sorted.
pub const ATTR_NAMES: &[&str] = &[
    "black", "blue", "bold", "cyan", "green", "italic", "magenta", "orange",
    "pink", "plain", "red", "underline", "white", "yellow",
];

// ── Named colors ──────────────────────────────────────────────────────────

/// Palette indices for the named colors scripts can apply.
pub mod color {
    use crossterm::style::Color;

    pub const BLACK: u8   = 0;
    pub const RED: u8     = 1;
    pub const GREEN: u8   = 2;
    pub const YELLOW: u8  = 3;
    pub const BLUE: u8    = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8    = 6;
    pub const WHITE: u8   = 7;
    pub const ORANGE: u8  = 8;
    pub const PINK: u8    = 9;

    pub fn from_name(name: &str) -> Option<u8> {
        Some(match name {
            "black" => BLACK,
            "red" => RED,
            "green" => GREEN,
            "yellow" => YELLOW,
            "blue" => BLUE,
            "magenta" => MAGENTA,
            "cyan" => CYAN,
            "white" => WHITE,
            "orange" => ORANGE,
            "pink" => PINK,
            _ => return None,
        })
    }

    /// Orange and pink have no ANSI slot and render as RGB.
    pub fn to_crossterm(index: u8) -> Color {
        match index {
            BLACK => Color::Black,
            RED => Color::DarkRed,
            GREEN => Color::DarkGreen,
            YELLOW => Color::DarkYellow,
            BLUE => Color::DarkBlue,
            MAGENTA => Color::DarkMagenta,
            CYAN => Color::DarkCyan,
            WHITE => Color::Grey,
            ORANGE => Color::Rgb { r: 255, g: 128, b: 0 },
            PINK => Color::Rgb { r: 255, g: 172, b: 187 },
            _ => Color::Reset,
        }
    }
}

/// A 24-bit color applied to a segment on top of its [`Attr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for Color {
    fn from(c: Rgb) -> Self {
        Color::Rgb { r: c.r, g: c.g, b: c.b }
    }
}
