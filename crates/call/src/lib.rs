//! livevoice-call – Ausgehende Anrufe ueber einen Telefonie-Provider
//!
//! ## Architektur
//!
//! ```text
//! CallHandle --Befehle--> CallController-Task
//!                             |  State Machine: Idle -> Ringing -> Active -> Ended
//!                             |
//!                             +-- CallProvider     place_call, get_call_details, end_call
//!                             +-- RingIndicator    Freizeichen waehrend Ringing
//!                             +-- LevelMonitor     Live-Pegel waehrend Active
//!                             +-- retrieve_recording  nach Active -> Ended
//! ```

pub mod controller;
pub mod http;
pub mod monitor;
pub mod provider;
pub mod record;
pub mod retrieval;
pub mod ring;
pub mod state;

pub use controller::{
    AnswerPolicy, CallConfig, CallController, CallEvent, CallHandle, CallObserver,
    ChannelCallObserver, NoopCallObserver, RecordingStatus,
};
pub use http::{HttpCallProvider, HttpProviderConfig, DEFAULT_BASE_URL};
pub use monitor::{LevelMonitor, LevelStream, WsLevelMonitor};
pub use provider::{CallDetails, CallProvider, CallRequest, Persona, ProviderError, ProviderResult};
pub use record::{CallOutcome, CallRecord, PendingRecording, SavedRecording};
pub use retrieval::{retrieve_recording, RetrievalError, RetrievalPolicy, RetrievalRequest};
pub use ring::{RingIndicator, SilentRing, ToneRing};
pub use state::{CallState, CallTrigger};
