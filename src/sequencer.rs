//! Pull-model sample sequencer: the real-time hot path (spec.md §4.6).
//!
//! [`Sequencer::render`] is the only function in this crate meant to be
//! called from an audio-driver callback. It never allocates, never
//! touches floating point, and never blocks — every `Vec` it owns is
//! pre-sized during construction and never grows again (spec.md §9 "No
//! allocation on the hot path").

use crate::constants::{AUDIBLE_THRESHOLD, MAX_SIMULTANEOUS_EVENTS};
use crate::event::{generate_event_sample, AdsrPhase, EnvelopeState, Event};
use crate::fixed::SineTable;

/// Owns a compiled event timeline and the bounded mixing state needed to
/// pull PCM samples out of it on demand (spec.md §3 `SequencerState`).
pub struct Sequencer {
    /// Sorted ascending by `start_sample`; ties allowed (spec.md §3).
    events: Vec<Event>,
    sample_rate: u32,
    current_sample_index: u64,
    next_event_index: usize,
    /// Non-owning indices into `events`, bounded to
    /// [`MAX_SIMULTANEOUS_EVENTS`] and pre-allocated so mixing never
    /// reallocates.
    active_events: Vec<usize>,
    completed: bool,
    sine_table: SineTable,
}

impl Sequencer {
    /// Build a sequencer from a compiled, sorted event vector. Initializes
    /// the sine table (spec.md §4.1 "initialized once before any callback
    /// runs") and pre-allocates the active-event slot array.
    pub fn new(events: Vec<Event>, sample_rate: u32) -> Self {
        Self {
            events,
            sample_rate,
            current_sample_index: 0,
            next_event_index: 0,
            active_events: Vec::with_capacity(MAX_SIMULTANEOUS_EVENTS),
            completed: false,
            sine_table: SineTable::build(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn current_sample_index(&self) -> u64 {
        self.current_sample_index
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn active_voice_count(&self) -> usize {
        self.active_events.len()
    }

    /// Produce `buffer.len()` mono S16 samples. Returns `true` to mean
    /// "continue" (the driver should call again) and `false` exactly once,
    /// on the invocation where all events are exhausted and the active set
    /// empties out — at which point [`Self::completed`] is also set
    /// (spec.md §4.6 / §5 "Cancellation and completion").
    ///
    /// Once `completed()` is true, further calls fill `buffer` with
    /// silence and keep returning `false`; the driver contract says it
    /// should never call again, but the sequencer stays well-defined if it
    /// does (spec.md §8 scenario 6).
    pub fn render(&mut self, buffer: &mut [i16]) -> bool {
        if self.completed {
            buffer.fill(0);
            return false;
        }

        for slot in buffer.iter_mut() {
            self.activate_due_events();
            *slot = self.mix_one_sample();
            self.evict_finished_events();
            self.current_sample_index += 1;
        }

        if self.active_events.is_empty() && self.next_event_index == self.events.len() {
            self.completed = true;
            return false;
        }
        true
    }

    /// Step 1: activate every event whose `start_sample` has arrived.
    /// Starvation past [`MAX_SIMULTANEOUS_EVENTS`] is silent, non-fatal
    /// drop (spec.md §7 "Runtime saturation").
    fn activate_due_events(&mut self) {
        while self.next_event_index < self.events.len()
            && self.events[self.next_event_index].start_sample as u64 <= self.current_sample_index
        {
            if self.active_events.len() < MAX_SIMULTANEOUS_EVENTS {
                self.active_events.push(self.next_event_index);
            }
            self.next_event_index += 1;
        }
    }

    /// Step 2: each active event already produced its own S16-range sample
    /// ([`generate_event_sample`] applies the `>>16` truncation per voice,
    /// per spec.md §4.6); sum those into an i32 accumulator and truncate
    /// once more to fold the sum back into S16. The 4x volume headroom
    /// baked into [`crate::constants::DEFAULT_VOLUME_SCALE`] keeps this in
    /// range for the documented voice counts; out-of-range sums wrap
    /// rather than clamp, matching spec.md §4.6.
    fn mix_one_sample(&mut self) -> i16 {
        let mut accumulator: i32 = 0;
        let current_sample_index = self.current_sample_index;
        for &event_index in &self.active_events {
            let event = &mut self.events[event_index];
            let voice_sample = generate_event_sample(event, &self.sine_table, current_sample_index);
            accumulator = accumulator.wrapping_add(voice_sample as i32);
        }
        accumulator as i16
    }

    /// Step 3: drop events whose envelope has finished, back-to-front so
    /// `swap_remove` never skips the next candidate.
    fn evict_finished_events(&mut self) {
        let mut i = self.active_events.len();
        while i > 0 {
            i -= 1;
            let event_index = self.active_events[i];
            if is_finished(&self.events[event_index].envelope) {
                self.active_events.swap_remove(i);
            }
        }
    }
}

/// An event is finished once its envelope has run its course: an ADSR
/// envelope in `Release` that has decayed to exactly zero, or any other
/// envelope whose current level has fallen below [`AUDIBLE_THRESHOLD`]
/// (spec.md §4.6 step 3).
fn is_finished(envelope: &EnvelopeState) -> bool {
    match envelope {
        EnvelopeState::Adsr { phase, current_level, .. } => {
            *phase == AdsrPhase::Release && *current_level == 0
        }
        EnvelopeState::Pluck { current_level, .. } => *current_level < AUDIBLE_THRESHOLD,
    }
}
