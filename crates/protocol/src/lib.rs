//! livevoice-protocol – Nachrichtenformat zum Sprach-Agenten
//!
//! Dieses Crate definiert alle Nachrichten, die ueber die Session
//! zwischen lokalem Client und entferntem Agenten ausgetauscht werden,
//! sowie die Schema-Beschreibung der lokal aufrufbaren Capabilities.

pub mod agent;
pub mod payload;
pub mod schema;
pub mod wire;

pub use agent::{
    ClientMessage, FunctionCall, FunctionResponse, ServerMessage, SessionSetup, DEFAULT_MODEL,
    DEFAULT_VOICE, WIRE_INPUT_RATE, WIRE_OUTPUT_RATE,
};
pub use payload::{decode_payload, encode_payload, is_pcm, parse_pcm_rate, pcm_mime};
pub use schema::{FunctionDeclaration, ParamKind, ParameterSchema, ParameterSpec};
pub use wire::{decode_server, encode_client, ProtocolError, MAX_FRAME_SIZE};
