//! Compiled events: the output of [`crate::compiler`] and the only thing
//! [`crate::sequencer::Sequencer`] touches on its per-sample hot path
//! (spec.md §3 `Event`/`Partial`/`EnvelopeState`).
//!
//! An `Event` splits into immutable scheduling/timbre data (set once by the
//! compiler) and mutable oscillator/envelope state (advanced one sample at
//! a time by the sequencer). Partials are a fixed-size array guarded by a
//! count rather than a `Vec`, per spec.md §9's "variable-length event
//! structs" design note — no allocation survives past compilation.

use crate::constants::MAX_PARTIALS;
use crate::fixed::Q31_ONE;
use crate::instrument::Instrument;

/// One oscillator partial: a DDS phase accumulator/increment pair plus a
/// fixed Q1.31 amplitude (spec.md §3 `Partial`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Partial {
    pub phase_accumulator: u32,
    pub phase_increment: u32,
    pub amplitude_q31: i32,
}

/// Which phase an ADSR envelope is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdsrPhase {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Mutable envelope state, tagged by shape (spec.md §3 `EnvelopeState`).
/// Dispatched on in [`generate_event_sample`] rather than boxed, matching
/// the tagged-variant design note in spec.md §9.
#[derive(Debug, Clone, Copy)]
pub enum EnvelopeState {
    Adsr {
        attack_samples: u32,
        decay_samples: u32,
        release_samples: u32,
        min_release_samples: u32,
        sustain_level: i32,
        current_level: i32,
        release_start_level: i32,
        release_coeff: i32,
        phase: AdsrPhase,
    },
    Pluck {
        decay_multiplier: i32,
        current_level: i32,
    },
}

impl EnvelopeState {
    /// Current Q1.31 envelope level, whatever the active phase/shape —
    /// used by the sequencer's eviction check (spec.md §4.6 step 3).
    #[inline]
    pub fn current_level(&self) -> i32 {
        match self {
            EnvelopeState::Adsr { current_level, .. } => *current_level,
            EnvelopeState::Pluck { current_level, .. } => *current_level,
        }
    }
}

/// One compiled note or chord member, ready for mixing.
///
/// Invariants (spec.md §3): `release_sample >= start_sample`,
/// `num_partials >= 1`, all partials carry phase increments for the
/// absolute pitch this event was compiled at.
#[derive(Debug, Clone)]
pub struct Event {
    pub start_sample: u32,
    pub duration_samples: u32,
    pub release_sample: u32,
    pub instrument: &'static Instrument,
    /// Q1.31 volume scale: `base_volume * chord_attenuation * 0x10000000`.
    pub volume_scale: i32,
    pub envelope: EnvelopeState,
    pub partials: [Partial; MAX_PARTIALS],
    pub num_partials: usize,
}

impl Event {
    /// Has this event reached its release point as of `current_sample`?
    /// Signed so a sample index past `release_sample` reads negative,
    /// matching spec.md §4.6's `samples_until_release = release_sample -
    /// current_sample_index` (computed at the call site, not here).
    #[inline]
    pub fn samples_until_release(&self, current_sample: u64) -> i64 {
        self.release_sample as i64 - current_sample as i64
    }
}

/// Advance one event by one sample and return its signed S16 output,
/// already scaled by envelope and volume and truncated from Q1.31 (spec.md
/// §4.6 `generate_event_sample`: "Return `(sample >> 16)` as signed
/// 16-bit"). The mixer sums these S16-range values into its own i32
/// accumulator — the `>>16` happens once, here, per voice, not again at
/// the end of mixing.
///
/// `current_sample` must be `>= event.start_sample` (callers only invoke
/// this on activated events). Mutates the event's partials' phase
/// accumulators and its envelope state in place — the only mutation that
/// happens to an `Event` after compilation.
pub fn generate_event_sample(event: &mut Event, sine_table: &crate::fixed::SineTable, current_sample: u64) -> i16 {
    let samples_since_start = (current_sample - event.start_sample as u64) as u32;
    let samples_until_release = event.samples_until_release(current_sample);

    let envelope_level = tick_envelope(&mut event.envelope, samples_since_start, samples_until_release);

    let mut accumulated: i32 = 0;
    for partial in event.partials[..event.num_partials].iter_mut() {
        let table_sample = sine_table.lookup(partial.phase_accumulator);
        accumulated = accumulated.wrapping_add(crate::fixed::mul_q31(table_sample, partial.amplitude_q31));
        partial.phase_accumulator = partial.phase_accumulator.wrapping_add(partial.phase_increment);
    }

    let enveloped = crate::fixed::mul_q31(accumulated, envelope_level);
    let scaled = crate::fixed::mul_q31(enveloped, event.volume_scale);
    crate::fixed::to_pcm16(scaled)
}

/// Advance an envelope by one sample and return its new Q1.31 level
/// (spec.md §4.6 "ADSR envelope algorithm" / "Pluck envelope").
fn tick_envelope(envelope: &mut EnvelopeState, samples_since_start: u32, samples_until_release: i64) -> i32 {
    match envelope {
        EnvelopeState::Adsr {
            attack_samples,
            decay_samples,
            sustain_level,
            current_level,
            release_start_level,
            release_coeff,
            phase,
            ..
        } => {
            if samples_until_release <= 0 {
                if *phase != AdsrPhase::Release {
                    *release_start_level = *current_level;
                    *phase = AdsrPhase::Release;
                }
                *current_level = crate::fixed::mul_q31(*current_level, *release_coeff);
                if *current_level < crate::constants::AUDIBLE_THRESHOLD / 4 {
                    *current_level = 0;
                }
            } else if samples_since_start < *attack_samples {
                // Linear ramp AUDIBLE_THRESHOLD -> Q31_ONE over attack_samples.
                *phase = AdsrPhase::Attack;
                let span = (Q31_ONE as i64) - (crate::constants::AUDIBLE_THRESHOLD as i64);
                let progressed = span * samples_since_start as i64 / (*attack_samples).max(1) as i64;
                *current_level = crate::constants::AUDIBLE_THRESHOLD + progressed as i32;
            } else if samples_since_start < *attack_samples + *decay_samples {
                // Linear ramp Q31_ONE -> sustain_level over decay_samples.
                *phase = AdsrPhase::Decay;
                let into_decay = samples_since_start - *attack_samples;
                let span = (Q31_ONE as i64) - (*sustain_level as i64);
                let descended = span * into_decay as i64 / (*decay_samples).max(1) as i64;
                *current_level = Q31_ONE - descended as i32;
            } else {
                *phase = AdsrPhase::Sustain;
                *current_level = *sustain_level;
            }
            *current_level
        }
        EnvelopeState::Pluck { decay_multiplier, current_level } => {
            *current_level = crate::fixed::mul_q31(*current_level, *decay_multiplier);
            *current_level
        }
    }
}

/// Build the ADSR release coefficient from `exp(-ln((1+r)/r)/T) *
/// 0x7FFFFFFF` with `r = 1e-5` (spec.md §4.6), given `T = max(release_samples,
/// min_release_samples)`. One-time arithmetic at compile time, never on the
/// sequencer's per-sample path.
pub fn release_coefficient(release_samples: u32, min_release_samples: u32) -> i32 {
    const R: f64 = 1e-5;
    let t = release_samples.max(min_release_samples).max(1) as f64;
    let coeff = (-((1.0 + R) / R).ln() / t).exp();
    crate::fixed::q31_from_f64(coeff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::SineTable;

    fn adsr(attack: u32, decay: u32, release: u32, sustain: i32) -> EnvelopeState {
        EnvelopeState::Adsr {
            attack_samples: attack,
            decay_samples: decay,
            release_samples: release,
            min_release_samples: 1,
            sustain_level: sustain,
            current_level: crate::constants::AUDIBLE_THRESHOLD,
            release_start_level: 0,
            release_coeff: release_coefficient(release, 1),
            phase: AdsrPhase::Attack,
        }
    }

    fn simple_event(envelope: EnvelopeState) -> Event {
        let mut partials = [Partial::default(); MAX_PARTIALS];
        partials[0] = Partial { phase_accumulator: 0, phase_increment: 1 << 20, amplitude_q31: Q31_ONE };
        Event {
            start_sample: 0,
            duration_samples: 1000,
            release_sample: 1000,
            instrument: &crate::instrument::PLUCK_SINE,
            volume_scale: crate::constants::DEFAULT_VOLUME_SCALE,
            envelope,
            partials,
            num_partials: 1,
        }
    }

    #[test]
    fn adsr_attack_ramps_up_from_threshold() {
        let mut event = simple_event(adsr(100, 400, 500, crate::fixed::mul_q31(Q31_ONE, crate::fixed::q31_from_f64(0.6))));
        let table = SineTable::build();
        let first = generate_event_sample(&mut event, &table, 0);
        let _ = first;
        // After some attack samples, the underlying level should have grown.
        let level_at_start = event.envelope.current_level();
        for s in 1..50u64 {
            generate_event_sample(&mut event, &table, s);
        }
        assert!(event.envelope.current_level() > level_at_start);
    }

    #[test]
    fn adsr_reaches_sustain_after_attack_and_decay() {
        let sustain = crate::fixed::mul_q31(Q31_ONE, crate::fixed::q31_from_f64(0.6));
        let mut event = simple_event(adsr(10, 10, 500, sustain));
        let table = SineTable::build();
        for s in 0..30u64 {
            generate_event_sample(&mut event, &table, s);
        }
        let level = event.envelope.current_level();
        assert!((level - sustain).abs() < 1000, "level={level} sustain={sustain}");
    }

    #[test]
    fn adsr_release_decays_toward_zero() {
        let sustain = crate::fixed::mul_q31(Q31_ONE, crate::fixed::q31_from_f64(0.6));
        let mut event = simple_event(adsr(10, 10, 200, sustain));
        event.release_sample = 25;
        let table = SineTable::build();
        for s in 0..25u64 {
            generate_event_sample(&mut event, &table, s);
        }
        let at_release_start = event.envelope.current_level();
        for s in 25..800u64 {
            generate_event_sample(&mut event, &table, s);
        }
        assert!(event.envelope.current_level() < at_release_start);
    }

    #[test]
    fn pluck_envelope_decays_geometrically() {
        let decay_multiplier = crate::fixed::q31_from_f64(0.999);
        let mut event = simple_event(EnvelopeState::Pluck { decay_multiplier, current_level: Q31_ONE });
        let table = SineTable::build();
        let before = event.envelope.current_level();
        generate_event_sample(&mut event, &table, 0);
        assert!(event.envelope.current_level() < before);
    }

    #[test]
    fn dds_phase_wraps_unsigned() {
        let mut event = simple_event(adsr(10, 10, 10, Q31_ONE));
        event.partials[0].phase_accumulator = u32::MAX - 10;
        event.partials[0].phase_increment = 20;
        let table = SineTable::build();
        generate_event_sample(&mut event, &table, 0);
        // wrapped around past u32::MAX back to a small value
        assert_eq!(event.partials[0].phase_accumulator, 9);
    }
}
