//! Instrument registry: a static, name-indexed table of envelope shape +
//! harmonic partial recipes (spec.md §4.3).
//!
//! Instruments are process-lifetime constants, matching
//! `bonnie-32::tracker::spu::types::AdsrParams`'s role as read-only preset
//! data — but dispatched by a tagged enum (`EnvelopeKind`) rather than a
//! function pointer, per spec.md §9's "Function pointers for envelopes"
//! design note.

use crate::constants::MAX_PARTIALS;

/// Which envelope shape an instrument uses. Dispatched on in
/// [`crate::event::EnvelopeState`] rather than boxed/pointer-indirected, so
/// both branches inline on the synthesis hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Adsr,
    Pluck,
}

/// A playable instrument: an envelope shape plus a fixed set of harmonic
/// partials (ratio of the fundamental, relative amplitude).
#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub name: &'static str,
    pub envelope: EnvelopeKind,
    pub partial_count: usize,
    /// Harmonic ratio of each partial to the fundamental frequency.
    pub harmonic_ratios: [f64; MAX_PARTIALS],
    /// Relative amplitude of each partial, already normalized so the
    /// partials sum to at most 1.0 (so mixing partials can never alone
    /// push a sample out of Q1.31 range before envelope/volume scaling).
    pub amplitudes: [f64; MAX_PARTIALS],
}

const fn pad(values: &[f64]) -> [f64; MAX_PARTIALS] {
    let mut out = [0.0; MAX_PARTIALS];
    let mut i = 0;
    while i < values.len() {
        out[i] = values[i];
        i += 1;
    }
    out
}

/// `pluck sine`: a single unit partial driven by an ADSR envelope. The
/// default, used when a name is unknown or missing (spec.md §4.3).
pub const PLUCK_SINE: Instrument = Instrument {
    name: "pluck sine",
    envelope: EnvelopeKind::Adsr,
    partial_count: 1,
    harmonic_ratios: pad(&[1.0]),
    amplitudes: pad(&[1.0]),
};

/// `pluck square`: three partials at ratios 1, 3, 5 (an odd-harmonic
/// approximation of a square wave). Raw amplitudes 1, 1/3, 1/5 (sum
/// 23/15) are normalized here to sum to 1.0, driven by the
/// exponential-decay pluck envelope.
pub const PLUCK_SQUARE: Instrument = Instrument {
    name: "pluck square",
    envelope: EnvelopeKind::Pluck,
    partial_count: 3,
    harmonic_ratios: pad(&[1.0, 3.0, 5.0]),
    amplitudes: pad(&[0.652_173_913_043_478, 0.217_391_304_347_826, 0.130_434_782_608_696]),
};

/// `organ sine`: two partials at ratios 1, 2 with raw amplitudes 1, 0.5
/// (sum 1.5), normalized to sum to 1.0, driven by an ADSR envelope.
/// **[SUPPLEMENT]** — exercises the multi-partial ADSR path the spec's
/// own example instruments don't (see SPEC_FULL.md §4.3).
pub const ORGAN_SINE: Instrument = Instrument {
    name: "organ sine",
    envelope: EnvelopeKind::Adsr,
    partial_count: 2,
    harmonic_ratios: pad(&[1.0, 2.0]),
    amplitudes: pad(&[0.666_666_666_666_667, 0.333_333_333_333_333]),
};

/// All pre-declared instruments, for name lookup.
pub const INSTRUMENTS: [Instrument; 3] = [PLUCK_SINE, PLUCK_SQUARE, ORGAN_SINE];

/// Look up an instrument by name. Lookup is case-insensitive but
/// whitespace-significant within the token (so `"pluck  square"` with two
/// spaces does not match `"pluck square"`). Unknown or missing names fall
/// back to [`PLUCK_SINE`] (spec.md §4.3).
pub fn lookup(name: &str) -> &'static Instrument {
    INSTRUMENTS
        .iter()
        .find(|inst| inst.name.eq_ignore_ascii_case(name))
        .unwrap_or(&PLUCK_SINE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("PLUCK SQUARE").name, "pluck square");
        assert_eq!(lookup("Pluck Square").name, "pluck square");
    }

    #[test]
    fn lookup_is_whitespace_significant() {
        // Two spaces does not collapse to one.
        assert_eq!(lookup("pluck  square").name, PLUCK_SINE.name);
    }

    #[test]
    fn unknown_name_falls_back_to_pluck_sine() {
        assert_eq!(lookup("banjo").name, PLUCK_SINE.name);
        assert_eq!(lookup("").name, PLUCK_SINE.name);
    }

    #[test]
    fn pluck_square_has_three_partials_at_1_3_5() {
        let inst = PLUCK_SQUARE;
        assert_eq!(inst.partial_count, 3);
        assert_eq!(&inst.harmonic_ratios[..3], &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn amplitudes_are_normalized() {
        for inst in INSTRUMENTS {
            let sum: f64 = inst.amplitudes[..inst.partial_count].iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{}: sum={sum}", inst.name);
        }
    }
}
