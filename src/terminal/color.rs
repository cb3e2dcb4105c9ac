/// Terminal color representation supporting 16-color, 256-color, and truecolor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

/// Convert a 256-color index to an RGB triplet. Used by `state.rs` to answer
/// OSC 4 / 10-19 palette queries. The first 16 are the standard ANSI colors
/// (fixed to a Tokyo-Night-derived palette since this crate does not own a
/// theme engine), 16-231 are a 6x6x6 color cube, 232-255 are a grayscale ramp.
pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0 => (0x15, 0x16, 0x1e),
        1 => (0xf7, 0x76, 0x8e),
        2 => (0x9e, 0xce, 0x6a),
        3 => (0xe0, 0xaf, 0x68),
        4 => (0x7a, 0xa2, 0xf7),
        5 => (0xbb, 0x9a, 0xf7),
        6 => (0x7d, 0xcf, 0xff),
        7 => (0xa9, 0xb1, 0xd6),
        8 => (0x41, 0x48, 0x68),
        9 => (0xff, 0x9e, 0x9e),
        10 => (0xb9, 0xf2, 0x7c),
        11 => (0xff, 0x9e, 0x64),
        12 => (0x82, 0xaa, 0xff),
        13 => (0xd4, 0xb0, 0xff),
        14 => (0xa9, 0xe1, 0xff),
        15 => (0xc0, 0xca, 0xf5),
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (to_val(r), to_val(g), to_val(b))
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            (v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_ramp_is_monotonic() {
        let (r0, g0, b0) = indexed_to_rgb(232);
        let (r1, g1, b1) = indexed_to_rgb(255);
        assert_eq!(r0, g0);
        assert_eq!(g0, b0);
        assert!(r1 > r0);
        assert_eq!((r1, g1, b1), (238, 238, 238));
    }

    #[test]
    fn color_cube_corner_is_black() {
        assert_eq!(indexed_to_rgb(16), (0, 0, 0));
    }
}
