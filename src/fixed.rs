//! Q1.31 fixed-point arithmetic and the 1024-entry sine lookup table.
//!
//! Q1.31 is the only runtime numeric format used past table/oscillator
//! initialization: `0x7FFF_FFFF` represents `+1.0`, `0x8000_0000` represents
//! `-1.0`. Every multiplication widens to 64 bits and shifts right by 31;
//! every sample on the synthesis hot path is produced this way, never with
//! `f32`/`f64`.

use crate::constants::SINE_TABLE_SIZE;

/// Q1.31 representation of `+1.0`.
pub const Q31_ONE: i32 = 0x7FFF_FFFF;

/// Multiply two Q1.31 values, rounding toward negative infinity via the
/// arithmetic right shift. Uses a 64-bit intermediate so the multiply never
/// overflows.
#[inline]
pub fn mul_q31(a: i32, b: i32) -> i32 {
    (((a as i64) * (b as i64)) >> 31) as i32
}

/// Convert a Q1.31 sample to signed 16-bit PCM by truncating the low 16
/// fractional bits. Saturation is the caller's responsibility (volume
/// headroom is chosen at compile time so in-range inputs never need it);
/// this is a plain wrapping right shift, matching the spec's "truncate to
/// S16 (wrapping truncation)".
#[inline]
pub fn to_pcm16(sample_q31: i32) -> i16 {
    (sample_q31 >> 16) as i16
}

/// Build a Q1.31 value from a ratio of two `f64`s. Only used while building
/// compile-time tables and during offline event compilation — never on the
/// sequencer's per-sample path.
#[inline]
pub fn q31_from_f64(value: f64) -> i32 {
    let clamped = value.clamp(-1.0, 1.0 - 1.0 / (1u64 << 31) as f64);
    (clamped * (1u64 << 31) as f64).round() as i32
}

/// The sine lookup table: entry `i` is `round(sin(2*pi*i/1024) * 0x7FFFFFFF)`.
///
/// Built once, before any [`crate::sequencer::Sequencer`] runs, by
/// [`init`]. Reads of `SINE_TABLE` prior to calling [`init`] return all
/// zeros; callers that only ever go through [`crate::sequencer::Sequencer`]
/// never observe that state because `Sequencer::new` calls [`init`].
pub struct SineTable {
    entries: [i32; SINE_TABLE_SIZE],
}

impl SineTable {
    /// Compute the table from scratch. This is the only place in the crate
    /// that calls a transcendental function.
    pub fn build() -> Self {
        let mut entries = [0i32; SINE_TABLE_SIZE];
        for (i, entry) in entries.iter_mut().enumerate() {
            let angle = 2.0 * std::f64::consts::PI * (i as f64) / (SINE_TABLE_SIZE as f64);
            *entry = q31_from_f64(angle.sin());
        }
        Self { entries }
    }

    /// Look up a sample given a full 32-bit DDS phase accumulator. Only the
    /// top 10 bits (`phase >> 22`) select the table entry; the lower 22
    /// bits are the oscillator's sub-entry phase, discarded by this lookup
    /// (matching the spec's un-interpolated sine lookup).
    #[inline]
    pub fn lookup(&self, phase: u32) -> i32 {
        let index = (phase >> 22) as usize & (SINE_TABLE_SIZE - 1);
        self.entries[index]
    }
}

impl Default for SineTable {
    fn default() -> Self {
        Self::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_q31_identity() {
        assert_eq!(mul_q31(Q31_ONE, Q31_ONE), Q31_ONE - 1);
        assert_eq!(mul_q31(0, Q31_ONE), 0);
    }

    #[test]
    fn mul_q31_negative_one() {
        let neg_one = i32::MIN;
        assert_eq!(mul_q31(neg_one, neg_one), Q31_ONE - 1);
    }

    #[test]
    fn to_pcm16_shifts_by_16() {
        assert_eq!(to_pcm16(0x1234_0000), 0x1234);
        assert_eq!(to_pcm16(-0x1_0000), -1);
    }

    #[test]
    fn sine_table_has_1024_entries_and_zero_crossings() {
        let table = SineTable::build();
        // phase 0 -> angle 0 -> sin(0) == 0
        assert_eq!(table.lookup(0), 0);
        // a quarter turn (phase = 1<<30, top bits = 256) should be close to +1
        let quarter = table.lookup(1u32 << 30);
        assert!(quarter > Q31_ONE - 1000);
        // half turn should be close to 0 (sin(pi) ~ 0, possibly off by one ULP)
        let half = table.lookup(1u32 << 31);
        assert!(half.abs() < 1000);
    }

    #[test]
    fn sine_table_is_antisymmetric() {
        let table = SineTable::build();
        for i in 1..SINE_TABLE_SIZE / 2 {
            let phase_pos = (i as u32) << 22;
            let phase_neg = ((SINE_TABLE_SIZE - i) as u32) << 22;
            let pos = table.lookup(phase_pos) as i64;
            let neg = table.lookup(phase_neg) as i64;
            assert!((pos + neg).abs() <= 1, "index {i}: {pos} + {neg}");
        }
    }
}
