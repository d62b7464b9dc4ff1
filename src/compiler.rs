//! Event compiler: turns a parsed [`Note`] sequence into a chronologically
//! ordered [`Event`] vector (spec.md §4.5).
//!
//! Everything here runs once, offline, before playback starts — it is the
//! only place besides table initialization where floating point and
//! division are allowed. The sequencer's hot path never calls back into
//! this module.

use crate::constants::{DEFAULT_VOLUME_SCALE, MAX_PARTIALS};
use crate::event::{AdsrPhase, Event, EnvelopeState, Partial};
use crate::fixed::{q31_from_f64, Q31_ONE};
use crate::instrument::EnvelopeKind;
use crate::parser::Note;
use crate::theory::{self, KeySignature, Temperament, C_MAJOR};

/// ADSR attack time, reference value (spec.md §4.5), overridable per call.
pub const ADSR_ATTACK_MS: f64 = 50.0;
pub const ADSR_DECAY_MS: f64 = 200.0;
pub const ADSR_RELEASE_MS: f64 = 500.0;
pub const ADSR_MIN_RELEASE_MS: f64 = 20.0;
/// Sustain level as a fraction of full Q1.31 scale (60%, spec.md §4.5).
pub const ADSR_SUSTAIN_FRACTION: f64 = 0.6;
/// Pluck envelope time constant, chosen to match spec.md §4.6's example
/// ("e.g. 0.2 s at 44.1 kHz").
pub const PLUCK_TIME_CONSTANT_SECS: f64 = 0.2;
/// Tenuto-like articulation used by the reference melody path (spec.md §4.5).
pub const DEFAULT_ARTICULATION_FACTOR: f32 = 0.9;

/// Everything the compiler needs besides the note sequence: tempo, key,
/// tuning, transposition, and volume (spec.md §4.5 "Input").
#[derive(Debug, Clone, Copy)]
pub struct CompileParams {
    pub sample_rate: u32,
    pub bpm: f32,
    pub key: &'static KeySignature,
    pub temperament: Temperament,
    pub transpose: i32,
    /// Base volume in `[0, 1]`.
    pub base_volume: f32,
    /// `(0, 1]`; the reference implementation uses
    /// [`DEFAULT_ARTICULATION_FACTOR`] for the melody path.
    pub articulation_factor: f32,
}

impl Default for CompileParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bpm: 120.0,
            key: &C_MAJOR,
            temperament: Temperament::Equal,
            transpose: 0,
            base_volume: 1.0,
            articulation_factor: DEFAULT_ARTICULATION_FACTOR,
        }
    }
}

/// `0->1, 3->2/3, 5->4/5, 6->4/6, 7->4/7, 9->unspecified` (spec.md §4.4;
/// SPEC_FULL §9 resolves 9 to the identity, matching "treat as 1 until the
/// domain demands otherwise").
fn tuplet_ratio(code: u8) -> f64 {
    match code {
        3 => 2.0 / 3.0,
        5 => 4.0 / 5.0,
        6 => 4.0 / 6.0,
        7 => 4.0 / 7.0,
        _ => 1.0,
    }
}

/// Raw (pre-articulation) duration in samples for one note.
fn raw_duration_samples(samples_per_beat: f64, duration: u32, dotted: bool, tuplet: u8) -> f64 {
    let mut raw = samples_per_beat * 4.0 / duration as f64;
    if dotted {
        raw *= 3.0 / 2.0;
    }
    raw * tuplet_ratio(tuplet)
}

fn ms_to_samples(ms: f64, sample_rate: u32) -> u32 {
    (ms / 1000.0 * sample_rate as f64).round() as u32
}

/// Build the initial envelope state for a freshly compiled event.
fn build_envelope(kind: EnvelopeKind, sample_rate: u32) -> EnvelopeState {
    match kind {
        EnvelopeKind::Adsr => {
            let attack_samples = ms_to_samples(ADSR_ATTACK_MS, sample_rate);
            let decay_samples = ms_to_samples(ADSR_DECAY_MS, sample_rate);
            let release_samples = ms_to_samples(ADSR_RELEASE_MS, sample_rate);
            let min_release_samples = ms_to_samples(ADSR_MIN_RELEASE_MS, sample_rate);
            let sustain_level = q31_from_f64(ADSR_SUSTAIN_FRACTION);
            EnvelopeState::Adsr {
                attack_samples,
                decay_samples,
                release_samples,
                min_release_samples,
                sustain_level,
                current_level: crate::constants::AUDIBLE_THRESHOLD,
                release_start_level: 0,
                release_coeff: crate::event::release_coefficient(release_samples, min_release_samples),
                phase: AdsrPhase::Attack,
            }
        }
        EnvelopeKind::Pluck => {
            let decay_multiplier =
                q31_from_f64((-1.0 / (PLUCK_TIME_CONSTANT_SECS * sample_rate as f64)).exp());
            EnvelopeState::Pluck { decay_multiplier, current_level: Q31_ONE }
        }
    }
}

/// Build an event's fixed partial array from an instrument's harmonic
/// recipe at a given fundamental frequency. `phase_inc = floor((freq /
/// sample_rate) * 2^32)` per partial (spec.md §4.5) — the one calculation
/// on this path required to be bit-identical across platforms.
fn build_partials(
    instrument: &'static crate::instrument::Instrument,
    fundamental_hz: f64,
    sample_rate: u32,
) -> ([Partial; MAX_PARTIALS], usize) {
    let mut partials = [Partial::default(); MAX_PARTIALS];
    for i in 0..instrument.partial_count {
        let partial_hz = fundamental_hz * instrument.harmonic_ratios[i];
        let phase_increment = ((partial_hz / sample_rate as f64) * (1u64 << 32) as f64).floor() as u32;
        partials[i] = Partial {
            phase_accumulator: 0,
            phase_increment,
            amplitude_q31: q31_from_f64(instrument.amplitudes[i]),
        };
    }
    (partials, instrument.partial_count)
}

/// Compile a single voice's note sequence into a chronologically sorted
/// event vector (spec.md §4.5).
pub fn compile_voice(notes: &[Note], params: &CompileParams) -> Vec<Event> {
    let samples_per_beat = 60.0 * params.sample_rate as f64 / params.bpm as f64;
    let mut events = Vec::new();
    let mut current_sample: f64 = 0.0;
    let mut i = 0;

    while i < notes.len() {
        let note = &notes[i];
        let raw = raw_duration_samples(samples_per_beat, note.duration, note.dotted, note.tuplet);

        // Chord-mates are consecutive and share a positive chord_id; a
        // standalone note/rest is its own run of length 1. Grouping the
        // run up front lets us compute the chord's 1/sqrt(N) attenuation
        // once and advance current_sample exactly once per group, which is
        // equivalent to "advance only when the next note is not a
        // chord-mate" (spec.md §4.5) applied note-by-note.
        let chord_id = note.chord_id;
        let mut run_end = i + 1;
        if chord_id != 0 {
            while run_end < notes.len() && notes[run_end].chord_id == chord_id {
                run_end += 1;
            }
        }
        let chord_size = run_end - i;
        let attenuation = if chord_id != 0 { 1.0 / (chord_size as f64).sqrt() } else { 1.0 };
        let start_sample = current_sample.round() as u32;
        let duration_samples = (raw * params.articulation_factor as f64).round() as u32;
        let release_sample = start_sample + duration_samples;

        for member in &notes[i..run_end] {
            let Some(pitch) = member.pitch.as_ref() else {
                continue; // rests produce no event, only time advance
            };
            let semitone = theory::note_to_absolute_semitone(Some(pitch), params.key, params.transpose);
            let freq = theory::note_to_frequency(semitone, params.temperament);
            if freq <= 0.0 {
                continue; // invalid name or rest: skip event (spec.md §4.5)
            }

            let (partials, num_partials) = build_partials(member.instrument, freq, params.sample_rate);
            let volume_scale =
                (params.base_volume as f64 * attenuation * DEFAULT_VOLUME_SCALE as f64).round() as i32;

            events.push(Event {
                start_sample,
                duration_samples,
                release_sample,
                instrument: member.instrument,
                volume_scale,
                envelope: build_envelope(member.instrument.envelope, params.sample_rate),
                partials,
                num_partials,
            });
        }

        current_sample += raw;
        i = run_end;
    }

    // Already monotone by construction, but spec.md §4.5 calls for an
    // explicit stable sort on start_sample (ties preserve emission order,
    // keeping chord members grouped) — make that guarantee load-bearing
    // rather than implicit.
    events.sort_by_key(|e| e.start_sample);
    events
}

/// Compile several independently-written voices and merge them into one
/// sorted event stream (spec.md §4.5's closing paragraph; SPEC_FULL §4.5
/// names this its own entry point). Ties across voices preserve each
/// voice's own emission order and are broken by voice order (`Vec::sort_by_key`
/// is stable) — per SPEC_FULL §9's resolution of the open question.
pub fn compile_multi_voice(voices: &[(&[Note], CompileParams)]) -> Vec<Event> {
    let mut merged = Vec::new();
    for (notes, params) in voices {
        merged.extend(compile_voice(notes, params));
    }
    merged.sort_by_key(|e| e.start_sample);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn params_120bpm_44100() -> CompileParams {
        CompileParams { sample_rate: 44100, bpm: 120.0, ..Default::default() }
    }

    #[test]
    fn scale_scenario_produces_eight_events_at_quarter_spacing() {
        let notes = parser::parse("c4 d e f g a b c'2");
        let events = compile_voice(&notes, &params_120bpm_44100());
        assert_eq!(events.len(), 8);
        // samples_per_beat = 60*44100/120 = 22050
        for (i, event) in events[..7].iter().enumerate() {
            assert_eq!(event.start_sample, (i as u32) * 22050);
        }
        assert_eq!(events[7].start_sample, 7 * 22050);
        // half note duration before articulation: 2*22050 = 44100
        let expected_duration = (44100.0 * DEFAULT_ARTICULATION_FACTOR as f64).round() as u32;
        assert_eq!(events[7].duration_samples, expected_duration);
    }

    #[test]
    fn first_event_phase_increment_matches_middle_c() {
        let notes = parser::parse("c4");
        let events = compile_voice(&notes, &params_120bpm_44100());
        let freq = 261.625_565_3_f64;
        let expected = ((freq / 44100.0) * (1u64 << 32) as f64).floor() as u32;
        assert_eq!(events[0].partials[0].phase_increment, expected);
    }

    #[test]
    fn chord_produces_three_events_at_same_start_with_attenuated_volume() {
        let notes = parser::parse("<c e g>2");
        let events = compile_voice(&notes, &params_120bpm_44100());
        assert_eq!(events.len(), 3);
        let chord_id = notes[0].chord_id;
        let expected_scale =
            (1.0_f64 * (1.0 / 3f64.sqrt()) * DEFAULT_VOLUME_SCALE as f64).round() as i32;
        for (event, note) in events.iter().zip(&notes) {
            assert_eq!(event.start_sample, 0);
            assert_eq!(note.chord_id, chord_id);
            assert_eq!(event.volume_scale, expected_scale);
        }
    }

    #[test]
    fn rest_then_note_scenario_starts_after_the_rest() {
        let notes = parser::parse("r2 c4");
        let events = compile_voice(&notes, &params_120bpm_44100());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_sample, 44100); // 2*22050
    }

    #[test]
    fn pluck_square_instrument_has_three_harmonically_related_partials() {
        let notes = parser::parse("[pluck square] c4");
        let events = compile_voice(&notes, &params_120bpm_44100());
        assert_eq!(events[0].num_partials, 3);
        let fundamental = events[0].partials[0].phase_increment as f64;
        let third = events[0].partials[1].phase_increment as f64;
        let fifth = events[0].partials[2].phase_increment as f64;
        assert!((third / fundamental - 3.0).abs() < 0.01);
        assert!((fifth / fundamental - 5.0).abs() < 0.01);
    }

    #[test]
    fn invalid_frequency_notes_produce_no_event() {
        // An empty note sequence compiles to no events; rests never reach
        // the frequency path at all.
        let notes = parser::parse("r4 r4 r4");
        let events = compile_voice(&notes, &params_120bpm_44100());
        assert!(events.is_empty());
    }

    #[test]
    fn events_are_sorted_ascending_by_start_sample() {
        let notes = parser::parse("c4 d e f");
        let events = compile_voice(&notes, &params_120bpm_44100());
        let mut prev = 0;
        for event in &events {
            assert!(event.start_sample >= prev);
            prev = event.start_sample;
        }
    }

    #[test]
    fn multi_voice_merge_interleaves_by_start_sample() {
        let melody = parser::parse("c4 e g");
        let bass = parser::parse("c,1");
        let params = params_120bpm_44100();
        let events = compile_multi_voice(&[(&melody, params), (&bass, params)]);
        assert_eq!(events.len(), 4);
        assert!(events.windows(2).all(|w| w[0].start_sample <= w[1].start_sample));
    }
}
