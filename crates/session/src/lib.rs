//! livevoice-session – Duplex-Sprachsession mit einem entfernten Agenten
//!
//! ## Architektur
//!
//! ```text
//! VoiceAssistant (hoechstens eine aktive Session)
//!     |
//!     v
//! SessionChannel::connect  -> SessionHandle
//!     |  State Machine: Idle -> Connecting -> Open -> Closing -> Closed
//!     |
//!     v
//! Session-Task (select!)
//!     +-- CapturePipeline  Mikrofon -> PCM16 -> AgentLink
//!     +-- AgentLink        Audio -> PlaybackScheduler, Tool-Aufrufe -> ToolBridge
//!     +-- JoinSet          fertige Tool-Aufrufe -> ToolResponse
//!     +-- SessionObserver  Zustaende, Transkripte, Pegel
//! ```

pub mod assistant;
pub mod channel;
pub mod observer;
pub mod state;
pub mod transport;
pub mod ws;

pub use assistant::VoiceAssistant;
pub use channel::{SessionChannel, SessionConfig, SessionHandle, SessionSummary};
pub use observer::{ChannelObserver, NoopObserver, SessionEvent, SessionObserver};
pub use state::{SessionParams, SessionState, SessionTrigger};
pub use transport::{AgentLink, AgentTransport, TransportEvent};
pub use ws::{WsLink, WsTransport};
