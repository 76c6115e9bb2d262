pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Map an opacity in `0.0..=1.0` to an 8-bit multiplier. NaN maps to 0.
pub(crate) fn opacity_u8(opacity: f32) -> u8 {
    if opacity.is_nan() {
        return 0;
    }
    ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u8
}

/// Premultiply straight RGBA8.
pub(crate) fn premultiply(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    let a16 = u16::from(a);
    [
        mul_div255_u8(u16::from(r), a16),
        mul_div255_u8(u16::from(g), a16),
        mul_div255_u8(u16::from(b), a16),
        a,
    ]
}

/// Undo premultiplication, rounding to nearest. Opaque and fully transparent pixels are exact.
pub(crate) fn unpremultiply(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    match a {
        0 => [0, 0, 0, 0],
        255 => rgba,
        _ => {
            let a32 = u32::from(a);
            let un = |c: u8| -> u8 { ((u32::from(c) * 255 + a32 / 2) / a32).min(255) as u8 };
            [un(r), un(g), un(b), a]
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
