//! 8-bit sine lookup for direct digital synthesis

/// `round(127 * sin(2π·i/256))`, indexed by the top byte of a 32-bit phase.
#[rustfmt::skip]
pub const SINE_TABLE_I8: [i8; 256] = [
       0,    3,    6,    9,   12,   16,   19,   22,   25,   28,   31,   34,   37,   40,   43,   46,
      49,   51,   54,   57,   60,   63,   65,   68,   71,   73,   76,   78,   81,   83,   85,   88,
      90,   92,   94,   96,   98,  100,  102,  104,  106,  107,  109,  111,  112,  113,  115,  116,
     117,  118,  120,  121,  122,  122,  123,  124,  125,  125,  126,  126,  126,  127,  127,  127,
     127,  127,  127,  127,  126,  126,  126,  125,  125,  124,  123,  122,  122,  121,  120,  118,
     117,  116,  115,  113,  112,  111,  109,  107,  106,  104,  102,  100,   98,   96,   94,   92,
      90,   88,   85,   83,   81,   78,   76,   73,   71,   68,   65,   63,   60,   57,   54,   51,
      49,   46,   43,   40,   37,   34,   31,   28,   25,   22,   19,   16,   12,    9,    6,    3,
       0,   -3,   -6,   -9,  -12,  -16,  -19,  -22,  -25,  -28,  -31,  -34,  -37,  -40,  -43,  -46,
     -49,  -51,  -54,  -57,  -60,  -63,  -65,  -68,  -71,  -73,  -76,  -78,  -81,  -83,  -85,  -88,
     -90,  -92,  -94,  -96,  -98, -100, -102, -104, -106, -107, -109, -111, -112, -113, -115, -116,
    -117, -118, -120, -121, -122, -122, -123, -124, -125, -125, -126, -126, -126, -127, -127, -127,
    -127, -127, -127, -127, -126, -126, -126, -125, -125, -124, -123, -122, -122, -121, -120, -118,
    -117, -116, -115, -113, -112, -111, -109, -107, -106, -104, -102, -100,  -98,  -96,  -94,  -92,
     -90,  -88,  -85,  -83,  -81,  -78,  -76,  -73,  -71,  -68,  -65,  -63,  -60,  -57,  -54,  -51,
     -49,  -46,  -43,  -40,  -37,  -34,  -31,  -28,  -25,  -22,  -19,  -16,  -12,   -9,   -6,   -3,
];

/// Quarter turn in 32-bit phase units.
pub const QUARTER_TURN: u32 = 64 << 24;

/// Sine of a 32-bit phase
#[inline]
pub fn sin_i8(phase: u32) -> i8 {
    SINE_TABLE_I8[(phase >> 24) as usize]
}

/// Cosine of a 32-bit phase, via the quarter-turn offset
#[inline]
pub fn cos_i8(phase: u32) -> i8 {
    sin_i8(phase.wrapping_add(QUARTER_TURN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_symmetry() {
        for i in 0..128 {
            assert_eq!(SINE_TABLE_I8[i], -SINE_TABLE_I8[i + 128]);
        }
        assert_eq!(SINE_TABLE_I8[64], 127);
        assert_eq!(SINE_TABLE_I8[192], -127);
    }

    #[test]
    fn test_cosine_offset() {
        assert_eq!(cos_i8(0), 127);
        assert_eq!(cos_i8(QUARTER_TURN), 0);
        assert_eq!(cos_i8(u32::MAX - 0xFF_FFFF), sin_i8(63 << 24));
    }
}
