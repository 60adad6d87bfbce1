//! Advance widths of the built-in Helvetica faces.
//!
//! Values are the Adobe AFM widths in 1/1000 em for printable ASCII, plus the
//! Latin-1 characters that show up in German clinic documents. Anything else
//! falls back to the width of a digit, which keeps estimates monotonic in the
//! character count.

/// Widths for U+0020..=U+007E, Helvetica.
const REGULAR_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Widths for U+0020..=U+007E, Helvetica-Bold.
const BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

/// Advance width of `ch` in 1/1000 em.
pub fn char_width(ch: char, bold: bool) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        let idx = (code - 0x20) as usize;
        return if bold { BOLD_ASCII[idx] } else { REGULAR_ASCII[idx] };
    }
    match (ch, bold) {
        ('ä' | 'ö' | 'ü' | 'é' | 'è' | 'á' | 'à', false) => 556,
        ('ä' | 'ö' | 'ü' | 'é' | 'è' | 'á' | 'à', true) => 611,
        ('Ä', false) => 667,
        ('Ä', true) => 722,
        ('Ö', _) => 778,
        ('Ü', _) => 722,
        ('ß', _) => 611,
        ('µ', false) => 556,
        ('µ', true) => 611,
        ('•', _) => 350,
        ('–', _) => 556,
        ('½' | '¼', _) => 834,
        ('°', _) => 400,
        ('\u{a0}', _) => 278,
        _ => FALLBACK_WIDTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_width() {
        assert_eq!(char_width(' ', false), 278);
        assert_eq!(char_width(' ', true), 278);
    }

    #[test]
    fn test_bold_is_never_narrower() {
        for code in 0x20u32..=0x7E {
            let ch = char::from_u32(code).unwrap();
            assert!(
                char_width(ch, true) >= char_width(ch, false) || ch == '@',
                "bold narrower for {:?}",
                ch
            );
        }
    }

    #[test]
    fn test_table_spot_checks() {
        assert_eq!(char_width('A', false), 667);
        assert_eq!(char_width('W', false), 944);
        assert_eq!(char_width('i', false), 222);
        assert_eq!(char_width('m', true), 889);
        assert_eq!(char_width('~', false), 584);
    }

    #[test]
    fn test_non_ascii_fallback() {
        assert_eq!(char_width('ü', false), 556);
        assert_eq!(char_width('Ö', true), 778);
        assert_eq!(char_width('€', false), FALLBACK_WIDTH);
    }
}
