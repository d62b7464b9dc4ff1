//! Crate-wide constants named in spec.md §6.

/// Maximum number of events the sequencer will mix at once.
pub const MAX_SIMULTANEOUS_EVENTS: usize = 32;

/// Maximum number of oscillator partials per instrument/event.
pub const MAX_PARTIALS: usize = 8;

/// Maximum number of notes kept from a single `<...>` chord; surplus notes
/// are silently dropped.
pub const MAX_CHORD_SIZE: usize = 8;

/// Number of entries in the DDS sine lookup table.
pub const SINE_TABLE_SIZE: usize = 1024;

/// Q1.31 floor below which an envelope is considered inaudible (~0.05% of
/// full scale). spec.md §9 notes the reference implementation uses two
/// different values (0x00080000 and 0x00001000); this crate uses the
/// lower, more sensitive one.
pub const AUDIBLE_THRESHOLD: i32 = 0x0000_1000;

/// Default Q1.31 base-volume scale: `0x10000000`, not `0x7FFFFFFF` — this
/// provides 4x headroom for mixing up to 16 simultaneous voices before S16
/// saturation risk (spec.md §4.5).
pub const DEFAULT_VOLUME_SCALE: i32 = 0x1000_0000;
