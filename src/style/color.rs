//! RGBA byte colors and CSS color parsing.

/// Straight (non-premultiplied) RGBA bytes.
pub type Rgba = [u8; 4];

/// Scale alpha by `factor` (clamped to `[0, 1]`).
#[inline]
pub fn scale_alpha(color: Rgba, factor: f32) -> Rgba {
    let [r, g, b, a] = color;
    [r, g, b, to_byte(f32::from(a) * factor.clamp(0.0, 1.0))]
}

/// Multiply alpha by `factor`, allowing boosts, capped at opaque.
#[inline]
pub fn boost_alpha(color: Rgba, factor: f32) -> Rgba {
    let [r, g, b, a] = color;
    [r, g, b, to_byte(f32::from(a) * factor.max(0.0))]
}

/// Multiply each RGB channel by `factor`; alpha unchanged.
#[inline]
pub fn darken(color: Rgba, factor: f32) -> Rgba {
    let [r, g, b, a] = color;
    let f = factor.clamp(0.0, 1.0);
    [
        to_byte(f32::from(r) * f),
        to_byte(f32::from(g) * f),
        to_byte(f32::from(b) * f),
        a,
    ]
}

#[inline]
fn to_byte(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Parse a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(r, g, b)`, `rgba(r, g, b, a)` or one of a few common names.
pub fn parse_css_color(input: &str) -> Option<Rgba> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(body) = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body);
    }
    named(&s)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 | 4 => {
            let mut out = [255; 4];
            for (i, slot) in out.iter_mut().take(hex.len()).enumerate() {
                *slot = nibble(i)? * 17;
            }
            Some(out)
        }
        6 | 8 => {
            let mut out = [255; 4];
            for (i, slot) in out.iter_mut().take(hex.len() / 2).enumerate() {
                *slot = byte(i * 2)?;
            }
            Some(out)
        }
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let mut out = [255; 4];
    for (slot, part) in out.iter_mut().zip(&parts[..3]) {
        *slot = to_byte(part.parse::<f32>().ok()?);
    }
    if let Some(alpha) = parts.get(3) {
        out[3] = to_byte(alpha.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0);
    }
    Some(out)
}

fn named(name: &str) -> Option<Rgba> {
    let rgb: [u8; 3] = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "gray" | "grey" => [128, 128, 128],
        "teal" => [0, 128, 128],
        "brown" => [165, 42, 42],
        "gold" => [255, 215, 0],
        "magenta" | "fuchsia" => [255, 0, 255],
        "cyan" | "aqua" => [0, 255, 255],
        _ => return None,
    };
    Some([rgb[0], rgb[1], rgb[2], 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(parse_css_color("#ff8800"), Some([255, 136, 0, 255]));
        assert_eq!(parse_css_color("#F80"), Some([255, 136, 0, 255]));
        assert_eq!(parse_css_color("#ff880080"), Some([255, 136, 0, 128]));
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#gg0000"), None);
    }

    #[test]
    fn functional_and_named() {
        assert_eq!(parse_css_color("rgb(1, 2, 3)"), Some([1, 2, 3, 255]));
        assert_eq!(
            parse_css_color("rgba(10,20,30,0.5)"),
            Some([10, 20, 30, 128])
        );
        assert_eq!(parse_css_color(" Teal "), Some([0, 128, 128, 255]));
        assert_eq!(parse_css_color("chartreuse-ish"), None);
    }

    #[test]
    fn alpha_and_darken() {
        assert_eq!(scale_alpha([1, 2, 3, 200], 0.5), [1, 2, 3, 100]);
        assert_eq!(boost_alpha([0, 0, 0, 220], 1.3), [0, 0, 0, 255]);
        assert_eq!(darken([100, 200, 50, 77], 0.7), [70, 140, 35, 77]);
    }
}
