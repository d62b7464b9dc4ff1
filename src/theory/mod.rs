//! Music theory: key signatures, temperaments, and the note -> absolute
//! semitone -> frequency derivation (spec.md §4.2).

mod keys;
mod temperament;

pub use keys::{KeySignature, C_MAJOR, KEY_SIGNATURES};
pub use temperament::{Temperament, WERCKMEISTER_RATIOS};

use crate::parser::Pitch;

/// Letter -> semitone offset within an octave, C = 0.
const LETTER_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Sentinel absolute semitone returned for rests / invalid pitches.
pub const REST_SEMITONE: i32 = -1;

/// `(octave_shift + 4) * 12 + letter_to_semitone + key_accidental +
/// note_accidental + transpose`. Rests (`pitch = None`) return
/// [`REST_SEMITONE`] and never reach the letter table.
pub fn note_to_absolute_semitone(pitch: Option<&Pitch>, key: &KeySignature, transpose: i32) -> i32 {
    let Some(pitch) = pitch else {
        return REST_SEMITONE;
    };
    let letter_index = pitch.letter as usize;
    let key_accidental = key.accidental_for_letter(letter_index);
    (pitch.octave_shift + 4) * 12
        + LETTER_SEMITONES[letter_index]
        + key_accidental
        + pitch.accidental
        + transpose
}

/// `temperament(absolute_semitone)`, guarded to `0.0` for rests or any
/// semitone that would otherwise be a valid computation but the caller
/// marks invalid by passing [`REST_SEMITONE`] or below.
pub fn note_to_frequency(absolute_semitone: i32, temperament: Temperament) -> f64 {
    if absolute_semitone <= REST_SEMITONE {
        return 0.0;
    }
    temperament.frequency(absolute_semitone)
}

/// `tonic(to) - tonic(from)`, the semitone transposition needed to move
/// material written in `from` into `to`.
pub fn transposition_between(from: &KeySignature, to: &KeySignature) -> i32 {
    to.tonic_semitone - from.tonic_semitone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Pitch;

    fn pitch(letter: u8, accidental: i32, octave_shift: i32) -> Pitch {
        Pitch { letter, accidental, octave_shift }
    }

    #[test]
    fn rest_is_sentinel() {
        assert_eq!(note_to_absolute_semitone(None, &C_MAJOR, 0), REST_SEMITONE);
        assert_eq!(note_to_frequency(REST_SEMITONE, Temperament::Equal), 0.0);
    }

    #[test]
    fn middle_c_is_48() {
        // c' in our notation (octave_shift 0) sits at octave 4 by the
        // (octave_shift + 4) convention -> absolute semitone 48.
        let c = pitch(0, 0, 0);
        assert_eq!(note_to_absolute_semitone(Some(&c), &C_MAJOR, 0), 48);
    }

    #[test]
    fn key_accidental_is_additive_over_c_major() {
        // Invariant from spec.md §8: for all notes n and keys k,
        // semitone(n, k) == semitone(n, C) + key_accidental(n.letter, k).
        let f = pitch(3, 0, 0);
        let g_major = &KEY_SIGNATURES[1];
        let in_c = note_to_absolute_semitone(Some(&f), &C_MAJOR, 0);
        let in_g = note_to_absolute_semitone(Some(&f), g_major, 0);
        assert_eq!(in_g, in_c + g_major.accidental_for_letter(3));
    }

    #[test]
    fn transposition_c_to_g_is_seven_semitones_up() {
        let g_major = &KEY_SIGNATURES[1];
        assert_eq!(transposition_between(&C_MAJOR, g_major), 7);
    }

    #[test]
    fn transposition_is_antisymmetric() {
        let g_major = &KEY_SIGNATURES[1];
        assert_eq!(
            transposition_between(&C_MAJOR, g_major),
            -transposition_between(g_major, &C_MAJOR)
        );
    }
}
