//! Audio-driver contract (spec.md §6): the seam between this crate's core
//! and whatever backend actually owns an output device. The core itself
//! never depends on anything in this module except [`Sequencer::render`]'s
//! shape — `AudioDriver` exists so the bundled `cpal` backend (and any
//! other backend an application wires up) has one trait to implement.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::sequencer::Sequencer;

/// Errors an [`AudioDriver`] backend can report. Ordinary fallible I/O —
/// not part of the core's "no error channel" hot path (spec.md §7).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to build output stream: {0}")]
    StreamBuild(String),
    #[error("failed to start output stream: {0}")]
    StreamPlay(String),
    #[error("driver is not currently playing")]
    NotPlaying,
}

/// Lock a mutex, recovering from poisoning rather than propagating the
/// panic. A panic inside [`Sequencer::render`] must not permanently
/// silence the output stream it runs on.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("scoresynth: sequencer mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// The driver operations consumed by an application layer (spec.md §6):
/// `init`, `play`, `stop`, `resume`. `cleanup` is modeled as `Drop` and
/// `strerror` as [`DriverError`]'s `Display` impl (via `thiserror`), since
/// idiomatic Rust gives both of those for free.
pub trait AudioDriver {
    /// Open the backend at a given sample rate. Must be called before
    /// [`Self::play`].
    fn init(&mut self, sample_rate: u32) -> Result<(), DriverError>;

    /// Begin pulling samples from `sequencer` on whatever thread this
    /// backend owns. The core assumes exactly one callback executes at a
    /// time (spec.md §5) — backends enforce that with `Arc<Mutex<_>>` or
    /// equivalent, never by reaching back into the sequencer themselves.
    fn play(&mut self, sequencer: Arc<Mutex<Sequencer>>) -> Result<(), DriverError>;

    /// Pause output without tearing down the stream.
    fn stop(&mut self) -> Result<(), DriverError>;

    /// Resume output after [`Self::stop`].
    fn resume(&mut self) -> Result<(), DriverError>;
}

/// A driver that discards everything. Used in tests and wherever a caller
/// only wants to exercise [`Sequencer::render`] directly without a real
/// output device.
#[derive(Debug, Default)]
pub struct NullDriver {
    playing: bool,
}

impl AudioDriver for NullDriver {
    fn init(&mut self, _sample_rate: u32) -> Result<(), DriverError> {
        Ok(())
    }

    fn play(&mut self, _sequencer: Arc<Mutex<Sequencer>>) -> Result<(), DriverError> {
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        if !self.playing {
            return Err(DriverError::NotPlaying);
        }
        self.playing = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DriverError> {
        self.playing = true;
        Ok(())
    }
}

/// Reference native backend built on `cpal`, following the split between a
/// cross-platform wrapper and a platform-specific stream builder that the
/// teacher's `tracker::audio::AudioEngine` / `native::init_audio_stream`
/// use for their own output stream.
#[cfg(feature = "cpal-driver")]
pub mod cpal_driver {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, Stream, StreamConfig};

    /// Owns the live `cpal::Stream`; dropping it tears down the device.
    pub struct CpalDriver {
        stream: Option<Stream>,
    }

    impl CpalDriver {
        pub fn new() -> Self {
            Self { stream: None }
        }
    }

    impl Default for CpalDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioDriver for CpalDriver {
        fn init(&mut self, _sample_rate: u32) -> Result<(), DriverError> {
            // Device/stream are built in `play`, once the sequencer to pull
            // from is known; `init` just validates a device exists.
            cpal::default_host()
                .default_output_device()
                .map(|_| ())
                .ok_or(DriverError::NoOutputDevice)
        }

        fn play(&mut self, sequencer: Arc<Mutex<Sequencer>>) -> Result<(), DriverError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(DriverError::NoOutputDevice)?;
            let sample_rate = lock_or_recover(&sequencer).sample_rate();

            let config = StreamConfig {
                channels: 1,
                sample_rate: SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            let mut sequencer = lock_or_recover(&sequencer);
                            sequencer.render(data);
                        }));
                        if result.is_err() {
                            data.fill(0);
                        }
                    },
                    |err| log::error!("scoresynth: audio stream error: {err}"),
                    None,
                )
                .map_err(|e| DriverError::StreamBuild(e.to_string()))?;

            stream.play().map_err(|e| DriverError::StreamPlay(e.to_string()))?;
            self.stream = Some(stream);
            Ok(())
        }

        fn stop(&mut self) -> Result<(), DriverError> {
            match &self.stream {
                Some(stream) => stream.pause().map_err(|e| DriverError::StreamPlay(e.to_string())),
                None => Err(DriverError::NotPlaying),
            }
        }

        fn resume(&mut self) -> Result<(), DriverError> {
            match &self.stream {
                Some(stream) => stream.play().map_err(|e| DriverError::StreamPlay(e.to_string())),
                None => Err(DriverError::NotPlaying),
            }
        }
    }
}

#[cfg(feature = "cpal-driver")]
pub use cpal_driver::CpalDriver;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile_voice, CompileParams};
    use crate::parser;

    #[test]
    fn null_driver_rejects_stop_before_play() {
        let mut driver = NullDriver::default();
        assert!(driver.stop().is_err());
    }

    #[test]
    fn null_driver_play_then_stop_then_resume() {
        let notes = parser::parse("c4");
        let events = compile_voice(&notes, &CompileParams::default());
        let sequencer = Arc::new(Mutex::new(Sequencer::new(events, 44100)));

        let mut driver = NullDriver::default();
        driver.init(44100).unwrap();
        driver.play(sequencer).unwrap();
        driver.stop().unwrap();
        driver.resume().unwrap();
    }

    #[test]
    fn lock_or_recover_survives_a_poisoned_mutex() {
        let mutex = Arc::new(Mutex::new(0i32));
        let clone = Arc::clone(&mutex);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the mutex on purpose");
        })
        .join();

        let guard = lock_or_recover(&mutex);
        assert_eq!(*guard, 0);
    }
}
