//! AVX2 summation kernel.
#![allow(unsafe_code)]

use crate::sample::reduce::ChannelSums;

#[inline(always)]
pub(crate) fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    return std::arch::is_x86_feature_detected!("avx2");
    #[cfg(not(target_arch = "x86_64"))]
    return false;
}

/// Per-lane `u32` accumulators: r, g, b, a, r*a, g*a, b*a.
#[cfg(target_arch = "x86_64")]
#[derive(Default)]
struct LaneSums([[u32; 8]; 7]);

#[cfg(target_arch = "x86_64")]
impl LaneSums {
    fn fold_into(&self, sums: &mut ChannelSums) {
        let h = |i: usize| -> u64 { self.0[i].iter().map(|&v| u64::from(v)).sum() };
        sums.merge(ChannelSums {
            r: h(0),
            g: h(1),
            b: h(2),
            a: h(3),
            ra: h(4),
            ga: h(5),
            ba: h(6),
        });
    }
}

/// Sum every pixel of `rows`, or `None` when AVX2 is unavailable.
///
/// Whole batches go through the vector kernel; each row's remainder is summed by the scalar loop.
/// Lane sums are folded horizontally once, after all rows. Callers bound the total pixel count by
/// `SIMD_MAX_AREA` so the lanes cannot overflow.
#[cfg(target_arch = "x86_64")]
pub(crate) fn sum_rows<'a>(rows: impl Iterator<Item = &'a [u32]>) -> Option<ChannelSums> {
    use crate::sample::reduce::SIMD_BATCH_PIXELS;

    if !avx2_available() {
        return None;
    }
    let mut lanes = LaneSums::default();
    let mut sums = ChannelSums::default();
    for row in rows {
        let body = row.len() - row.len() % SIMD_BATCH_PIXELS;
        // SAFETY: AVX2 support was checked above.
        unsafe { accumulate_avx2(&row[..body], &mut lanes) };
        sums.add_run(&row[body..]);
    }
    lanes.fold_into(&mut sums);
    Some(sums)
}

#[cfg(not(target_arch = "x86_64"))]
pub(crate) fn sum_rows<'a>(_rows: impl Iterator<Item = &'a [u32]>) -> Option<ChannelSums> {
    None
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn accumulate_avx2(run: &[u32], lanes: &mut LaneSums) {
    use crate::sample::reduce::SIMD_BATCH_PIXELS;
    use std::arch::x86_64::*;

    debug_assert!(run.len().is_multiple_of(SIMD_BATCH_PIXELS));

    // SAFETY: every load reads 8 u32 from inside a 32-pixel chunk of `run`; lane loads and stores
    // cover exactly one `[u32; 8]`. All accesses use the unaligned variants.
    unsafe {
        let byte = _mm256_set1_epi32(0xff);
        let mut acc = [_mm256_setzero_si256(); 7];
        for (a, lane) in acc.iter_mut().zip(lanes.0.iter()) {
            *a = _mm256_loadu_si256(lane.as_ptr().cast());
        }

        for batch in run.chunks_exact(SIMD_BATCH_PIXELS) {
            let p = batch.as_ptr();
            for k in 0..SIMD_BATCH_PIXELS / 8 {
                let px = _mm256_loadu_si256(p.add(k * 8).cast());
                let r = _mm256_and_si256(px, byte);
                let g = _mm256_and_si256(_mm256_srli_epi32::<8>(px), byte);
                let b = _mm256_and_si256(_mm256_srli_epi32::<16>(px), byte);
                let a = _mm256_srli_epi32::<24>(px);

                acc[0] = _mm256_add_epi32(acc[0], r);
                acc[1] = _mm256_add_epi32(acc[1], g);
                acc[2] = _mm256_add_epi32(acc[2], b);
                acc[3] = _mm256_add_epi32(acc[3], a);
                acc[4] = _mm256_add_epi32(acc[4], _mm256_mullo_epi32(r, a));
                acc[5] = _mm256_add_epi32(acc[5], _mm256_mullo_epi32(g, a));
                acc[6] = _mm256_add_epi32(acc[6], _mm256_mullo_epi32(b, a));
            }
        }

        for (a, lane) in acc.iter().zip(lanes.0.iter_mut()) {
            _mm256_storeu_si256(lane.as_mut_ptr().cast(), *a);
        }
    }
}
