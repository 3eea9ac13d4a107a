//! EBCDIC (code page 500) conversion for token names
//!
//! AFP token names are 8-byte EBCDIC strings. Only the graphic characters
//! that can actually appear in resource names are mapped; anything else
//! decodes to `?`. Comparisons elsewhere are done on the raw bytes, so a
//! lossy decode only ever affects log output and rename prefixes.

/// EBCDIC blank, used to pad short names
pub const BLANK: u8 = 0x40;

/// Decode one code page 500 byte to its ASCII character
pub fn decode_byte(b: u8) -> char {
    match b {
        0x40 => ' ',
        0x4A => '[',
        0x4B => '.',
        0x4C => '<',
        0x4D => '(',
        0x4E => '+',
        0x4F => '!',
        0x50 => '&',
        0x5A => ']',
        0x5B => '$',
        0x5C => '*',
        0x5D => ')',
        0x5E => ';',
        0x5F => '^',
        0x60 => '-',
        0x61 => '/',
        0x6B => ',',
        0x6C => '%',
        0x6D => '_',
        0x6E => '>',
        0x6F => '?',
        0x79 => '`',
        0x7A => ':',
        0x7B => '#',
        0x7C => '@',
        0x7D => '\'',
        0x7E => '=',
        0x7F => '"',
        0x81..=0x89 => (b'a' + (b - 0x81)) as char,
        0x91..=0x99 => (b'j' + (b - 0x91)) as char,
        0xA1 => '~',
        0xA2..=0xA9 => (b's' + (b - 0xA2)) as char,
        0xBB => '|',
        0xC0 => '{',
        0xC1..=0xC9 => (b'A' + (b - 0xC1)) as char,
        0xD0 => '}',
        0xD1..=0xD9 => (b'J' + (b - 0xD1)) as char,
        0xE0 => '\\',
        0xE2..=0xE9 => (b'S' + (b - 0xE2)) as char,
        0xF0..=0xF9 => (b'0' + (b - 0xF0)) as char,
        _ => '?',
    }
}

/// Encode one ASCII character to its code page 500 byte
pub fn encode_char(c: char) -> u8 {
    match c {
        ' ' => 0x40,
        '[' => 0x4A,
        '.' => 0x4B,
        '<' => 0x4C,
        '(' => 0x4D,
        '+' => 0x4E,
        '!' => 0x4F,
        '&' => 0x50,
        ']' => 0x5A,
        '$' => 0x5B,
        '*' => 0x5C,
        ')' => 0x5D,
        ';' => 0x5E,
        '^' => 0x5F,
        '-' => 0x60,
        '/' => 0x61,
        ',' => 0x6B,
        '%' => 0x6C,
        '_' => 0x6D,
        '>' => 0x6E,
        '?' => 0x6F,
        '`' => 0x79,
        ':' => 0x7A,
        '#' => 0x7B,
        '@' => 0x7C,
        '\'' => 0x7D,
        '=' => 0x7E,
        '"' => 0x7F,
        'a'..='i' => 0x81 + (c as u8 - b'a'),
        'j'..='r' => 0x91 + (c as u8 - b'j'),
        '~' => 0xA1,
        's'..='z' => 0xA2 + (c as u8 - b's'),
        '|' => 0xBB,
        '{' => 0xC0,
        'A'..='I' => 0xC1 + (c as u8 - b'A'),
        '}' => 0xD0,
        'J'..='R' => 0xD1 + (c as u8 - b'J'),
        '\\' => 0xE0,
        'S'..='Z' => 0xE2 + (c as u8 - b'S'),
        '0'..='9' => 0xF0 + (c as u8 - b'0'),
        _ => 0x6F,
    }
}
