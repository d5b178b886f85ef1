//! Parse and Format Options
//!
//! Both option sets are plain bitmasks; combining flags with `|` yields the
//! union of their behaviors. Bit values are stable and match the values the
//! engine has always used, so they can be stored or passed across a binding.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

macro_rules! bitmask {
    ($name:ident) => {
        impl $name {
            /// Raw bit value
            #[inline]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Build from raw bits (unknown bits are kept)
            #[inline]
            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            /// Check that every bit of `other` is set
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Check that at least one bit of `other` is set
            #[inline]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Copy with the bits of `other` cleared
            #[inline]
            pub const fn without(self, other: Self) -> Self {
                $name(self.0 & !other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            #[inline]
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            #[inline]
            fn bitand(self, rhs: Self) -> Self {
                $name(self.0 & rhs.0)
            }
        }

        impl Not for $name {
            type Output = Self;

            #[inline]
            fn not(self) -> Self {
                $name(!self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

/// Parser behavior flags
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseOptions(u32);

impl ParseOptions {
    /// Elements, attributes and PCDATA only; no text processing
    pub const MINIMAL: Self = ParseOptions(0x0000);
    /// Create processing instruction nodes
    pub const PI: Self = ParseOptions(0x0001);
    /// Create comment nodes
    pub const COMMENTS: Self = ParseOptions(0x0002);
    /// Create CDATA nodes
    pub const CDATA: Self = ParseOptions(0x0004);
    /// Keep whitespace-only PCDATA
    pub const WS_PCDATA: Self = ParseOptions(0x0008);
    /// Decode character and entity references
    pub const ESCAPES: Self = ParseOptions(0x0010);
    /// Normalize line endings to `\n`
    pub const EOL: Self = ParseOptions(0x0020);
    /// Convert attribute whitespace characters to spaces
    pub const WCONV_ATTRIBUTE: Self = ParseOptions(0x0040);
    /// Normalize attribute whitespace (trim and collapse runs)
    pub const WNORM_ATTRIBUTE: Self = ParseOptions(0x0080);
    /// Create the XML declaration node
    pub const DECLARATION: Self = ParseOptions(0x0100);
    /// Create the DOCTYPE node
    pub const DOCTYPE: Self = ParseOptions(0x0200);
    /// Keep whitespace-only PCDATA when it is the only child of its parent
    pub const WS_PCDATA_SINGLE: Self = ParseOptions(0x0400);
    /// Trim leading and trailing whitespace of PCDATA
    pub const TRIM_PCDATA: Self = ParseOptions(0x0800);
    /// Accept documents without an element; keep top-level PCDATA
    pub const FRAGMENT: Self = ParseOptions(0x1000);
    /// Store the first PCDATA of an element in the element's value
    pub const EMBED_PCDATA: Self = ParseOptions(0x2000);
    /// Merge adjacent PCDATA and CDATA into a single text node
    pub const MERGE_PCDATA: Self = ParseOptions(0x4000);

    pub const DEFAULT: Self =
        ParseOptions(Self::CDATA.0 | Self::ESCAPES.0 | Self::WCONV_ATTRIBUTE.0 | Self::EOL.0);
    pub const FULL: Self = ParseOptions(
        Self::DEFAULT.0 | Self::PI.0 | Self::COMMENTS.0 | Self::DECLARATION.0 | Self::DOCTYPE.0,
    );
}

bitmask!(ParseOptions);

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::DEFAULT
    }
}

/// Serializer behavior flags
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatOptions(u32);

impl FormatOptions {
    /// Indent nested nodes with the indent string
    pub const INDENT: Self = FormatOptions(0x0001);
    /// Write the encoding's byte order mark first
    pub const WRITE_BOM: Self = FormatOptions(0x0002);
    /// No incidental whitespace at all
    pub const RAW: Self = FormatOptions(0x0004);
    /// Never emit the default XML declaration
    pub const NO_DECLARATION: Self = FormatOptions(0x0008);
    /// Write text and attribute values without escaping
    pub const NO_ESCAPES: Self = FormatOptions(0x0010);
    /// Open files in text mode when saving
    pub const SAVE_FILE_TEXT: Self = FormatOptions(0x0020);
    /// Put every attribute on its own indented line
    pub const INDENT_ATTRIBUTES: Self = FormatOptions(0x0040);
    /// Write `<a></a>` instead of `<a />` for childless elements
    pub const NO_EMPTY_ELEMENT_TAGS: Self = FormatOptions(0x0080);
    /// Drop control characters instead of writing `&#NN;`
    pub const SKIP_CONTROL_CHARS: Self = FormatOptions(0x0100);
    /// Quote attribute values with `'`
    pub const ATTRIBUTE_SINGLE_QUOTE: Self = FormatOptions(0x0200);

    pub const DEFAULT: Self = Self::INDENT;
}

bitmask!(FormatOptions);

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_bits() {
        assert_eq!(ParseOptions::DEFAULT.bits(), 0x74);
        assert_eq!(ParseOptions::FULL.bits(), 0x377);
        assert_eq!(ParseOptions::default(), ParseOptions::DEFAULT);
    }

    #[test]
    fn test_union_and_contains() {
        let opts = ParseOptions::DEFAULT | ParseOptions::MERGE_PCDATA;
        assert!(opts.contains(ParseOptions::MERGE_PCDATA));
        assert!(opts.contains(ParseOptions::ESCAPES | ParseOptions::EOL));
        assert!(!opts.contains(ParseOptions::COMMENTS));
        assert!(!opts.without(ParseOptions::ESCAPES).contains(ParseOptions::ESCAPES));
    }

    #[test]
    fn test_format_bits() {
        let mut flags = FormatOptions::RAW;
        flags |= FormatOptions::NO_DECLARATION;
        assert_eq!(flags.bits(), 0x0c);
        assert!(flags.intersects(FormatOptions::RAW | FormatOptions::INDENT));
        assert_eq!(FormatOptions::from_bits(1), FormatOptions::INDENT);
    }
}
