//! Key signature table: 15 major/minor pairs sharing one set of
//! accidentals, indexed in letter order C, D, E, F, G, A, B.

/// A key signature: a display name and the semitone offset applied to each
/// natural letter (C, D, E, F, G, A, B order) when it appears without an
/// explicit accidental in the notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySignature {
    pub name: &'static str,
    /// Offsets indexed C=0, D=1, E=2, F=3, G=4, A=5, B=6.
    pub accidentals: [i32; 7],
    /// Pitch class (0-11) of the major tonic, used by
    /// [`super::transposition_between`]. Relative major and minor share a
    /// tonic per the spec, so this is the major tonic's pitch class for
    /// both members of a pair.
    pub tonic_semitone: i32,
}

impl KeySignature {
    /// The offset for a given letter index (0=C .. 6=B).
    #[inline]
    pub fn accidental_for_letter(&self, letter_index: usize) -> i32 {
        self.accidentals[letter_index]
    }
}

/// All 15 major/minor key-signature pairs, sharps side then flats side,
/// matching the circle of fifths. `C_MAJOR` is the identity key (no
/// accidentals).
pub const KEY_SIGNATURES: [KeySignature; 15] = [
    KeySignature { name: "C major / A minor", accidentals: [0, 0, 0, 0, 0, 0, 0], tonic_semitone: 0 },
    KeySignature { name: "G major / E minor", accidentals: [0, 0, 0, 1, 0, 0, 0], tonic_semitone: 7 },
    KeySignature { name: "D major / B minor", accidentals: [1, 0, 0, 1, 0, 0, 0], tonic_semitone: 2 },
    KeySignature { name: "A major / F# minor", accidentals: [1, 0, 0, 1, 1, 0, 0], tonic_semitone: 9 },
    KeySignature { name: "E major / C# minor", accidentals: [1, 1, 0, 1, 1, 0, 0], tonic_semitone: 4 },
    KeySignature { name: "B major / G# minor", accidentals: [1, 1, 0, 1, 1, 1, 0], tonic_semitone: 11 },
    KeySignature { name: "F# major / D# minor", accidentals: [1, 1, 1, 1, 1, 1, 0], tonic_semitone: 6 },
    KeySignature { name: "C# major / A# minor", accidentals: [1, 1, 1, 1, 1, 1, 1], tonic_semitone: 1 },
    KeySignature { name: "F major / D minor", accidentals: [0, 0, 0, 0, 0, 0, -1], tonic_semitone: 5 },
    KeySignature { name: "Bb major / G minor", accidentals: [0, 0, -1, 0, 0, 0, -1], tonic_semitone: 10 },
    KeySignature { name: "Eb major / C minor", accidentals: [0, 0, -1, 0, 0, -1, -1], tonic_semitone: 3 },
    KeySignature { name: "Ab major / F minor", accidentals: [0, -1, -1, 0, 0, -1, -1], tonic_semitone: 8 },
    KeySignature { name: "Db major / Bb minor", accidentals: [0, -1, -1, 0, -1, -1, -1], tonic_semitone: 1 },
    KeySignature { name: "Gb major / Eb minor", accidentals: [-1, -1, -1, 0, -1, -1, -1], tonic_semitone: 6 },
    KeySignature { name: "Cb major / Ab minor", accidentals: [-1, -1, -1, -1, -1, -1, -1], tonic_semitone: 11 },
];

/// C major — the default key, used wherever an accidental-free reference
/// is needed (e.g. the parser invariant tests in spec.md §8).
pub const C_MAJOR: KeySignature = KEY_SIGNATURES[0];
