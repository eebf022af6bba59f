//! Hex color parsing and the sRGB transfer function.

/// An sRGB-encoded color with straight alpha, channels in `[0, 1]`.
pub type Rgba = [f64; 4];

pub const OPAQUE_WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`, case-insensitive.
pub fn parse_hex_color(raw: &str) -> Option<Rgba> {
    let normalized = raw.trim().to_lowercase();
    let value = normalized.strip_prefix('#')?;

    let expanded: String = match value.len() {
        3 | 4 => value.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => format!("{value}ff"),
        8 => value.to_owned(),
        _ => return None,
    };
    let expanded = if expanded.len() == 6 {
        format!("{expanded}ff")
    } else {
        expanded
    };
    if expanded.len() != 8 {
        return None;
    }

    let mut channels = [0.0; 4];
    for (index, channel) in channels.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&expanded[index * 2..index * 2 + 2], 16).ok()?;
        *channel = f64::from(byte) / 255.0;
    }
    Some(channels)
}

/// Parse a color string, defaulting to opaque white for anything invalid.
pub fn color_or_white(raw: &str) -> Rgba {
    parse_hex_color(raw).unwrap_or(OPAQUE_WHITE)
}

/// The sRGB electro-optical transfer function for one channel.
///
/// Input is clamped to `[0, 1]`.
pub fn srgb_to_linear_channel(value: f64) -> f64 {
    let clamped = value.clamp(0.0, 1.0);
    if clamped <= 0.04045 {
        clamped / 12.92
    } else {
        ((clamped + 0.055) / 1.055).powf(2.4)
    }
}

/// Linearize an sRGB color. Alpha passes through unchanged.
pub fn srgb_to_linear(srgb: Rgba) -> Rgba {
    let [r, g, b, a] = srgb;
    [
        srgb_to_linear_channel(r),
        srgb_to_linear_channel(g),
        srgb_to_linear_channel(b),
        a,
    ]
}
