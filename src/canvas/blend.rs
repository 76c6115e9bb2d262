use crate::foundation::math::{mul_div255_u8, mul_div255_u16};

/// Straight-alpha source-over. Fully transparent and fully opaque sources take exact shortcuts.
pub(crate) fn over_straight(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let da = u32::from(mul_div255_u16(u16::from(dst[3]), inv));
    let out_a = u32::from(sa) + da;

    let mut out = [0u8; 4];
    for c in 0..3 {
        let num = u32::from(src[c]) * u32::from(sa) + u32::from(dst[c]) * da;
        out[c] = ((num + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

/// Scale a straight pixel's alpha by an 8-bit opacity.
#[inline]
pub(crate) fn attenuate(rgba: [u8; 4], opacity: u8) -> [u8; 4] {
    if opacity == 255 {
        return rgba;
    }
    [
        rgba[0],
        rgba[1],
        rgba[2],
        mul_div255_u8(u16::from(rgba[3]), u16::from(opacity)),
    ]
}

/// Premultiplied source-over of one row of RGBA8 bytes onto another.
pub(crate) fn premul_over_row(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        if sa == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - sa;
        d[3] = s[3].saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let dc = mul_div255_u8(u16::from(d[c]), inv);
            d[c] = s[c].saturating_add(dc);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/blend.rs"]
mod tests;
