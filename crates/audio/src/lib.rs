//! livevoice-audio – Audio fuer Sprach-Sessions und Anrufe
//!
//! - Mikrofon-Capture mit Chunking, Software-Aufbereitung und PCM16-Kodierung
//! - Lueckenloses, unterbrechbares Playback-Scheduling
//! - PCM16-Codec und Downsampling
//! - cpal-Backends (Mikrofon, Lautsprecher ueber Software-Mixer)
//! - Speicher-Backends fuer Headless-Betrieb und Tests
//! - Freizeichen-Generator

pub mod backend;
pub mod capture;
pub mod codec;
pub mod conditioning;
pub mod device;
pub mod error;
pub mod frame;
pub mod memory;
pub mod mixer;
pub mod playback;
pub mod ringback;

// Bequeme Re-Exporte der wichtigsten Typen
pub use backend::{CpalInput, CpalOutput};
pub use capture::{
    AudioInput, CaptureConfig, CaptureConstraints, CapturePipeline, CapturedChunk, OpenedInput,
    SampleSink, DEFAULT_CHUNK_SIZE, DEFAULT_WIRE_RATE,
};
pub use codec::{decode_pcm16, downsample, encode_pcm16, rms};
pub use conditioning::{
    BlockContext, ConditioningChain, EchoDucker, GainNormalizer, NoiseFloorSuppressor,
    SignalProcessor,
};
pub use device::{list_devices, resolve_device, AudioDevice, DeviceDirection};
pub use error::{AudioError, AudioResult};
pub use frame::{AudioFrame, FrameDirection, FramePayload};
pub use memory::{
    ManualClock, MemoryInput, MemoryInputFeeder, MemoryOutput, MemoryOutputProbe, RecordedVoice,
};
pub use mixer::Mixer;
pub use playback::{AudioOutput, PlaybackScheduler, PlaybackStats, ScheduledBuffer, VoiceHandle};
pub use ringback::{RingbackTone, RINGBACK_OFF, RINGBACK_ON};
