use serde::{Deserialize, Serialize};

/// What kind of quantity transition a change event describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Increment,
    Decrement,
    Reservation,
}

impl ChangeKind {
    /// Derive the kind of a plain quantity update from the delta sign.
    /// Reservations are tagged explicitly by the façade, never inferred.
    pub fn for_update(delta: i64) -> Self {
        if delta < 0 {
            Self::Decrement
        } else {
            Self::Increment
        }
    }

    /// Which operation an alert attributes its trigger to.
    pub fn trigger_action(self) -> TriggerAction {
        match self {
            Self::Reservation => TriggerAction::Reservation,
            Self::Increment | Self::Decrement => TriggerAction::Update,
        }
    }
}

/// Whether a low-stock alert is a fresh crossing or a repeat.
///
/// Classified from the pre-mutation snapshot observed under the item lease:
/// `New` when the item was at Normal before the delta, `Continued` when it
/// was already low.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    New,
    Continued,
}

/// The operation that caused a low-stock alert.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerAction {
    Update,
    Reservation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Reservation).unwrap(),
            "\"RESERVATION\""
        );
        assert_eq!(serde_json::to_string(&AlertType::New).unwrap(), "\"NEW\"");
        assert_eq!(
            serde_json::to_string(&TriggerAction::Update).unwrap(),
            "\"UPDATE\""
        );
    }

    #[test]
    fn update_kind_follows_delta_sign() {
        assert_eq!(ChangeKind::for_update(5), ChangeKind::Increment);
        assert_eq!(ChangeKind::for_update(0), ChangeKind::Increment);
        assert_eq!(ChangeKind::for_update(-5), ChangeKind::Decrement);
    }

    #[test]
    fn reservation_triggers_reservation_action() {
        assert_eq!(
            ChangeKind::Reservation.trigger_action(),
            TriggerAction::Reservation
        );
        assert_eq!(ChangeKind::Decrement.trigger_action(), TriggerAction::Update);
    }
}
