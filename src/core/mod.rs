//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: entity decoding, EOL and attribute whitespace handling with Cow
//! - Encoding: UTF-8/16/32 and Latin-1 detection and conversion
//! - Options: parse and format flag sets
//! - Numbers: C-compatible number formatting and lenient parsing

pub mod encoding;
pub mod entities;
pub mod numbers;
pub mod options;
pub mod scanner;
