#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parses `#rrggbb` or `rrggbb` in any case. Shorthand and named colors are
/// rejected.
pub fn parse_hex_color(raw: &str) -> Option<Rgb> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);

    if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();

    Some(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_hash() {
        let expected = Rgb {
            r: 0x12,
            g: 0xab,
            b: 0xef,
        };

        assert_eq!(parse_hex_color("#12abef"), Some(expected));
        assert_eq!(parse_hex_color("12abef"), Some(expected));
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(parse_hex_color("#FFa07A"), parse_hex_color("#ffa07a"));
        assert_eq!(
            parse_hex_color("FF0000"),
            Some(Rgb { r: 255, g: 0, b: 0 })
        );
    }

    #[test]
    fn every_channel_value_round_trips_through_hex() {
        for value in 0..=u8::MAX {
            let rgb = Rgb {
                r: value,
                g: value.wrapping_mul(7),
                b: u8::MAX - value,
            };
            assert_eq!(parse_hex_color(&rgb.to_hex()), Some(rgb));
        }
    }

    #[test]
    fn rejects_other_shapes() {
        let cases = [
            "", "#", "#fff", "fff", "red", "#12345", "#1234567", "##123456", "#12345g",
            " #123456", "#123456 ", "0x123456", "#ffééff",
        ];

        for case in cases {
            assert_eq!(parse_hex_color(case), None, "input {case:?}");
        }
    }
}
