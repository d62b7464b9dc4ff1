//! Engine configuration: the ambient layer around [`crate::compiler`]'s
//! parameters (sample rate, tempo, key, temperament, transposition, base
//! volume), loadable from a RON file the way the teacher's
//! `tracker::io::{save_song, load_song}` loads a `Song`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::{CompileParams, DEFAULT_ARTICULATION_FACTOR};
use crate::theory::{KeySignature, Temperament, C_MAJOR, KEY_SIGNATURES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("unknown key signature: {0}")]
    UnknownKey(String),
}

/// A serializable, RON-roundtrippable stand-in for [`CompileParams`].
/// `CompileParams` itself borrows a `&'static KeySignature`, which isn't
/// `Deserialize`; this carries the key by name and resolves it against
/// [`KEY_SIGNATURES`] at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub bpm: f32,
    pub key_name: String,
    pub temperament: TemperamentName,
    pub transpose: i32,
    pub base_volume: f32,
    pub articulation_factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperamentName {
    Equal,
    Werckmeister3,
}

impl From<TemperamentName> for Temperament {
    fn from(name: TemperamentName) -> Self {
        match name {
            TemperamentName::Equal => Temperament::Equal,
            TemperamentName::Werckmeister3 => Temperament::Werckmeister3,
        }
    }
}

impl Default for EngineConfig {
    /// Matches the concrete scenarios in spec.md §8: 120 BPM, C major,
    /// equal temperament, 44100 Hz, base volume 1.0.
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bpm: 120.0,
            key_name: C_MAJOR.name.to_string(),
            temperament: TemperamentName::Equal,
            transpose: 0,
            base_volume: 1.0,
            articulation_factor: DEFAULT_ARTICULATION_FACTOR,
        }
    }
}

impl EngineConfig {
    /// Resolve `key_name` against the static key-signature table and
    /// produce the [`CompileParams`] the compiler actually needs.
    pub fn to_compile_params(&self) -> Result<CompileParams, ConfigError> {
        let key = find_key(&self.key_name)?;
        Ok(CompileParams {
            sample_rate: self.sample_rate,
            bpm: self.bpm,
            key,
            temperament: self.temperament.into(),
            transpose: self.transpose,
            base_volume: self.base_volume,
            articulation_factor: self.articulation_factor,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(4).indentor("  ".to_string());
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(contents)?;
        // Validate the key name eagerly so a bad config fails at load time
        // rather than silently falling through at compile time.
        find_key(&config.key_name)?;
        Ok(config)
    }
}

fn find_key(name: &str) -> Result<&'static KeySignature, ConfigError> {
    KEY_SIGNATURES
        .iter()
        .find(|k| k.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_scenarios() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.bpm, 120.0);
        assert_eq!(config.temperament, TemperamentName::Equal);
        assert_eq!(config.base_volume, 1.0);
    }

    #[test]
    fn default_config_resolves_to_c_major_compile_params() {
        let config = EngineConfig::default();
        let params = config.to_compile_params().unwrap();
        assert_eq!(params.key.name, C_MAJOR.name);
        assert_eq!(params.sample_rate, 44100);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        let config = EngineConfig { bpm: 96.0, ..EngineConfig::default() };
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.bpm, 96.0);
        assert_eq!(loaded.key_name, config.key_name);
    }

    #[test]
    fn unknown_key_name_fails_at_load() {
        let ron_text = r#"(
            sample_rate: 44100,
            bpm: 120.0,
            key_name: "Z major / nonsense",
            temperament: Equal,
            transpose: 0,
            base_volume: 1.0,
            articulation_factor: 0.9,
        )"#;
        assert!(EngineConfig::load_from_str(ron_text).is_err());
    }

    #[test]
    fn invalid_ron_is_a_parse_error() {
        assert!(EngineConfig::load_from_str("not valid ron").is_err());
    }
}
