// THEORY:
// Discrete histogram equalization, in the two flavours the scorers need:
//
// 1.  **8-bit (256 bins)**: used on each noise-residual channel. The lookup table is
//     anchored at the first populated bin, which maps to 0, and the remaining bins are
//     spread over 0..=255 by their cumulative count. A channel holding a single value
//     is returned unchanged, so a flat residual (a perfectly clean image) stays at 0
//     instead of being stretched to white.
// 2.  **Float (65536 bins)**: used on PCA projections, which are signed, unbounded f64
//     values. The histogram spans the observed [min, max], the cumulative distribution
//     is normalized to [0, 1], and every value is linearly interpolated through
//     (left bin edge -> cdf). Interpolation rather than a bin lookup keeps the output
//     smooth even when a handful of bins hold most of the mass.
//
// Both functions are stateless utilities over plain slices.

pub mod histogram {
    pub const BYTE_BINS: usize = 256;
    pub const FLOAT_BINS: usize = 65536;

    /// Equalizes 8-bit samples through their cumulative distribution.
    pub fn equalize_u8(values: &[u8]) -> Vec<u8> {
        let lut = equalization_lut(values);
        values.iter().map(|&v| lut[v as usize]).collect()
    }

    fn equalization_lut(values: &[u8]) -> [u8; BYTE_BINS] {
        let mut hist = [0usize; BYTE_BINS];
        for &v in values {
            hist[v as usize] += 1;
        }

        let mut lut = [0u8; BYTE_BINS];
        let total = values.len();
        let Some(first) = hist.iter().position(|&count| count > 0) else {
            return lut;
        };

        // Single-valued input: identity on the one populated bin.
        if hist[first] == total {
            lut[first] = first as u8;
            return lut;
        }

        let scale = 255.0 / (total - hist[first]) as f64;
        let mut cumulative = 0usize;
        for bin in first + 1..BYTE_BINS {
            cumulative += hist[bin];
            lut[bin] = (cumulative as f64 * scale).round().min(255.0) as u8;
        }
        lut
    }

    /// Equalizes f64 samples into [0, 1] with a 65536-bin histogram and linear
    /// interpolation through the normalized cdf.
    pub fn equalize_f64(values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }

        let (mut low, mut high) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if low == high {
            low -= 0.5;
            high += 0.5;
        }
        let bin_width = (high - low) / FLOAT_BINS as f64;

        let mut cdf = vec![0.0f64; FLOAT_BINS];
        for &v in values {
            // The last bin is closed on the right.
            let bin = (((v - low) / bin_width) as usize).min(FLOAT_BINS - 1);
            cdf[bin] += 1.0;
        }
        let mut running = 0.0;
        for slot in cdf.iter_mut() {
            running += *slot;
            *slot = running;
        }
        for slot in cdf.iter_mut() {
            *slot /= running;
        }

        values
            .iter()
            .map(|&v| interpolate(&cdf, (v - low) / bin_width))
            .collect()
    }

    /// `position` is measured in bins from the first left edge.
    fn interpolate(cdf: &[f64], position: f64) -> f64 {
        let last = cdf.len() - 1;
        if position <= 0.0 {
            return cdf[0];
        }
        if position >= last as f64 {
            return cdf[last];
        }
        let index = position.floor() as usize;
        let fraction = position - index as f64;
        cdf[index] + fraction * (cdf[index + 1] - cdf[index])
    }
}
