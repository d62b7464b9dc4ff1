//! Notation parser: a small, stateful recursive-descent scanner over the
//! LilyPond-style grammar in spec.md §4.4.
//!
//! The parser never fails the whole input — an unrecognized byte at the
//! top level stops the scan and returns the longest prefix understood so
//! far (spec.md §4.4/§7); locally invalid tokens (bad duration literals,
//! oversize/unterminated chords) are dropped and the scanner recovers at
//! the next whitespace.

use crate::instrument::{self, Instrument};

/// Allowed note-duration denominators.
const VALID_DURATIONS: [u32; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// A parsed pitch: letter index (0=C, 1=D, 2=E, 3=F, 4=G, 5=A, 6=B),
/// accumulated accidental offset, and accumulated octave shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    pub letter: u8,
    pub accidental: i32,
    pub octave_shift: i32,
}

/// One parsed note or rest, with sticky defaults already resolved.
#[derive(Debug, Clone)]
pub struct Note {
    /// `None` for a rest (`r`).
    pub pitch: Option<Pitch>,
    /// Duration denominator, one of [`VALID_DURATIONS`].
    pub duration: u32,
    pub dotted: bool,
    /// 0, 3, 5, 6, 7, or 9; 0 means "no tuplet".
    pub tuplet: u8,
    /// 0 for a standalone note; otherwise shared by every member of one
    /// `<...>` chord.
    pub chord_id: u32,
    pub instrument: &'static Instrument,
    /// Byte offsets into the source this note's pitch token spans, for
    /// diagnostics only — never consulted by the compiler or sequencer.
    pub span: (usize, usize),
}

/// Parse `input`, returning the notes understood before any unrecoverable
/// failure. Never panics and never returns an error: see the module docs.
pub fn parse(input: &str) -> Vec<Note> {
    let bytes = input.as_bytes();
    let mut cursor = Cursor {
        bytes,
        pos: 0,
        last_duration: 4,
        current_instrument: &instrument::PLUCK_SINE,
        next_chord_id: 1,
    };
    let mut notes = Vec::new();

    while cursor.pos < bytes.len() {
        let c = bytes[cursor.pos];
        if c.is_ascii_whitespace() {
            cursor.pos += 1;
            continue;
        }
        match c {
            b'[' => cursor.parse_instrument(),
            b'<' => cursor.parse_chord(&mut notes),
            b'r' | b'a'..=b'g' => cursor.parse_single_note(&mut notes),
            _ => break, // unrecognized byte: stop, keep the longest prefix
        }
    }

    notes
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    last_duration: u32,
    current_instrument: &'static Instrument,
    next_chord_id: u32,
}

/// Parsed `dur_mods := digits? '.'? tuplet?`.
struct DurMods {
    /// `None` if no digits were present (inherit the sticky duration).
    explicit_duration: Option<u32>,
    /// Digits were present but did not form a valid denominator.
    invalid: bool,
    dotted: bool,
    tuplet: u8,
}

fn tuplet_code(c: u8) -> Option<u8> {
    match c {
        b't' => Some(3),
        b'q' => Some(5),
        b'x' => Some(6),
        b's' => Some(7),
        b'n' => Some(9),
        _ => None,
    }
}

fn letter_index(c: u8) -> Option<u8> {
    match c {
        b'c' => Some(0),
        b'd' => Some(1),
        b'e' => Some(2),
        b'f' => Some(3),
        b'g' => Some(4),
        b'a' => Some(5),
        b'b' => Some(6),
        _ => None,
    }
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skip forward to the next whitespace byte (or end of input). Used to
    /// recover after dropping a locally invalid token.
    fn recover_to_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// `instrument := '[' [^\]]{0,31} ']'`
    fn parse_instrument(&mut self) {
        debug_assert_eq!(self.peek(), Some(b'['));
        let content_start = self.pos + 1;
        let mut i = content_start;
        while i < self.bytes.len() && self.bytes[i] != b']' && (i - content_start) < 31 {
            i += 1;
        }
        if i < self.bytes.len() && self.bytes[i] == b']' {
            let name = std::str::from_utf8(&self.bytes[content_start..i]).unwrap_or("");
            self.current_instrument = instrument::lookup(name);
            self.pos = i + 1;
        } else {
            // No closing ']' within 31 bytes (or end of input): malformed,
            // drop the token and recover.
            self.pos = content_start;
            self.recover_to_whitespace();
        }
    }

    /// `note_head := 'r' | (letter accidentals? octaves?)`, starting at the
    /// current position (a letter or `r`).
    fn parse_note_head(&mut self) -> (Option<Pitch>, usize, usize) {
        let start = self.pos;
        let c = self.bytes[self.pos];
        if c == b'r' {
            self.pos += 1;
            return (None, start, self.pos);
        }

        let letter = letter_index(c).expect("caller only dispatches on a-g/r");
        self.pos += 1;

        let mut accidental = 0i32;
        while let Some(b) = self.peek() {
            match b {
                b's' => {
                    accidental += 1;
                    self.pos += 1;
                }
                b'f' => {
                    accidental -= 1;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let mut octave_shift = 0i32;
        while let Some(b) = self.peek() {
            match b {
                b'\'' => {
                    octave_shift += 1;
                    self.pos += 1;
                }
                b',' => {
                    octave_shift -= 1;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        (Some(Pitch { letter, accidental, octave_shift }), start, self.pos)
    }

    /// `dur_mods := digits? '.'? tuplet?`
    fn parse_dur_mods(&mut self) -> DurMods {
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let explicit_duration;
        let mut invalid = false;
        if self.pos > digits_start {
            let text = std::str::from_utf8(&self.bytes[digits_start..self.pos]).unwrap_or("");
            match text.parse::<u32>() {
                Ok(v) if VALID_DURATIONS.contains(&v) => explicit_duration = Some(v),
                _ => {
                    explicit_duration = None;
                    invalid = true;
                }
            }
        } else {
            explicit_duration = None;
        }

        let dotted = if self.peek() == Some(b'.') {
            self.pos += 1;
            true
        } else {
            false
        };

        let tuplet = match self.peek().and_then(tuplet_code) {
            Some(code) => {
                self.pos += 1;
                code
            }
            None => 0,
        };

        DurMods { explicit_duration, invalid, dotted, tuplet }
    }

    /// `note := note_head dur_mods?`
    fn parse_single_note(&mut self, notes: &mut Vec<Note>) {
        let (pitch, start, head_end) = self.parse_note_head();
        let mods = self.parse_dur_mods();
        if mods.invalid {
            // Invalid numeric literal: drop this note, don't touch the
            // sticky duration, and recover at the next whitespace (the
            // scan has already consumed the whole token).
            self.recover_to_whitespace();
            return;
        }
        let duration = mods.explicit_duration.unwrap_or(self.last_duration);
        if let Some(d) = mods.explicit_duration {
            self.last_duration = d;
        }
        notes.push(Note {
            pitch,
            duration,
            dotted: mods.dotted,
            tuplet: mods.tuplet,
            chord_id: 0,
            instrument: self.current_instrument,
            span: (start, head_end),
        });
    }

    /// `chord := '<' (ws? note_head)* ws? '>' dur_mods?`
    fn parse_chord(&mut self, notes: &mut Vec<Note>) {
        debug_assert_eq!(self.peek(), Some(b'<'));
        self.pos += 1;

        let mut members: Vec<(Option<Pitch>, usize, usize)> = Vec::new();
        let mut terminated = false;
        loop {
            match self.peek() {
                None => break, // EOF without '>': unterminated, drop below
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'>') => {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
                Some(b'r') | Some(b'a'..=b'g') => {
                    members.push(self.parse_note_head());
                }
                Some(_) => {
                    // Anything else inside a chord is malformed; treat like
                    // a missing terminator and drop the whole chord.
                    break;
                }
            }
        }

        if !terminated {
            self.recover_to_whitespace();
            return;
        }

        let mods = self.parse_dur_mods();
        if mods.invalid {
            self.recover_to_whitespace();
            return;
        }
        let duration = mods.explicit_duration.unwrap_or(self.last_duration);
        if let Some(d) = mods.explicit_duration {
            self.last_duration = d;
        }

        let chord_id = self.next_chord_id;
        self.next_chord_id += 1;

        for (pitch, start, end) in members.into_iter().take(crate::constants::MAX_CHORD_SIZE) {
            notes.push(Note {
                pitch,
                duration,
                dotted: mods.dotted,
                tuplet: mods.tuplet,
                chord_id,
                instrument: self.current_instrument,
                span: (start, end),
            });
        }
    }
}

const LETTERS: [u8; 7] = [b'c', b'd', b'e', b'f', b'g', b'a', b'b'];

fn tuplet_letter(code: u8) -> Option<u8> {
    match code {
        3 => Some(b't'),
        5 => Some(b'q'),
        6 => Some(b'x'),
        7 => Some(b's'),
        9 => Some(b'n'),
        _ => None,
    }
}

/// Print a single standalone note back into the grammar's surface syntax —
/// the inverse of [`Cursor::parse_note_head`] + [`Cursor::parse_dur_mods`],
/// used only to exercise the round-trip invariant in spec.md §8 ("parsing
/// then printing a note then parsing again yields an equivalent note").
/// Never consulted by the compiler or sequencer.
pub fn format_note(note: &Note) -> String {
    let mut out = String::new();
    match &note.pitch {
        None => out.push('r'),
        Some(pitch) => {
            out.push(LETTERS[pitch.letter as usize] as char);
            let (accidental_char, count) = if pitch.accidental >= 0 {
                ('s', pitch.accidental)
            } else {
                ('f', -pitch.accidental)
            };
            for _ in 0..count {
                out.push(accidental_char);
            }
            let (octave_char, count) = if pitch.octave_shift >= 0 {
                ('\'', pitch.octave_shift)
            } else {
                (',', -pitch.octave_shift)
            };
            for _ in 0..count {
                out.push(octave_char);
            }
        }
    }
    out.push_str(&note.duration.to_string());
    if note.dotted {
        out.push('.');
    }
    if let Some(t) = tuplet_letter(note.tuplet) {
        out.push(t as char);
    }
    out
}
