//! Audio level metering

/// Quietest level the meter resolves, in dBFS
const DB_FLOOR: f32 = -80.0;

/// Normalized audio level for a buffer of i16 PCM samples.
///
/// Root-mean-square amplitude, converted to dBFS, mapped onto [0.0, 1.0]
/// with 0.0 at -80 dBFS and 1.0 at full scale.
pub fn normalized_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let x = s as f64 / i16::MAX as f64;
            x * x
        })
        .sum();
    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;

    if rms <= 0.0 {
        return 0.0;
    }

    let db = 20.0 * rms.log10();
    ((db - DB_FLOOR) / -DB_FLOOR).clamp(0.0, 1.0)
}
