//! Zustandsautomat eines Anrufs
//!
//! ```text
//! Idle -> Ringing -> Active -> Ended -> Idle
//!            |                   ^
//!            +-------------------+  (Auflegen waehrend es klingelt)
//!            |
//!            +-> Error -> Idle
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Ringing,
    Active,
    Ended,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTrigger {
    /// Neuer Anruf angefordert
    Place,
    /// Provider hat die Platzierung abgelehnt
    PlacementFailed,
    /// Abgehoben (Klingelfenster abgelaufen oder Provider-Signal)
    Answered,
    /// Lokal aufgelegt
    HangUp,
    /// Provider hat den Anruf beendet
    RemoteEnded,
    /// Rueckkehr in den Ruhezustand
    Reset,
}

impl CallState {
    /// Uebergangstabelle
    pub fn next(self, trigger: CallTrigger) -> Option<CallState> {
        use CallState::*;
        use CallTrigger::*;

        match (self, trigger) {
            (Idle | Ended | Error, Place) => Some(Ringing),

            (Ringing, PlacementFailed) => Some(Error),
            (Ringing, Answered) => Some(Active),
            (Ringing | Active, HangUp | RemoteEnded) => Some(Ended),

            (Ended | Error, Reset) => Some(Idle),

            _ => None,
        }
    }

    /// Ein Anruf klingelt oder laeuft
    pub fn in_call(self) -> bool {
        matches!(self, Self::Ringing | Self::Active)
    }

    /// Ein neuer Anruf darf platziert werden
    pub fn can_place(self) -> bool {
        self.next(CallTrigger::Place).is_some()
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Ringing => "ringing",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Error => "error",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CallState::*;
    use CallTrigger::*;

    #[test]
    fn normaler_anruf() {
        let mut s = Idle;
        for t in [Place, Answered, HangUp, Reset] {
            s = s.next(t).unwrap();
        }
        assert_eq!(s, Idle);
    }

    #[test]
    fn fehler_nur_aus_ringing() {
        assert_eq!(Ringing.next(PlacementFailed), Some(Error));
        assert_eq!(Active.next(PlacementFailed), None);
        assert_eq!(Idle.next(PlacementFailed), None);
    }

    #[test]
    fn neuer_anruf_aus_endzustaenden() {
        assert!(Idle.can_place());
        assert!(Ended.can_place());
        assert!(Error.can_place());
        assert!(!Ringing.can_place());
        assert!(!Active.can_place());
    }

    #[test]
    fn auflegen_waehrend_es_klingelt() {
        assert_eq!(Ringing.next(HangUp), Some(Ended));
        assert_eq!(Ringing.next(RemoteEnded), Some(Ended));
        assert_eq!(Ended.next(HangUp), None);
    }
}
