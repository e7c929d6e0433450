//! Battery swaps and the client-observed swap lifecycle.
//!
//! The backend owns every transition. The client only ever *asks* for one
//! (borrow, deposit, cancel) and then re-reads the authoritative state; it
//! never moves a swap between states on its own. [`SwapPhase`] captures what
//! the client last learned and decides which requests are worth sending.

use std::fmt;

use chrono::{DateTime, Utc};

use super::station::{Station, StationRef};

/// Backend identifier of a swap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwapId(String);

impl SwapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapStatus {
    Active,
    Completed,
    Cancelled,
}

impl SwapStatus {
    /// Parse the backend's status string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(SwapStatus::Active),
            "completed" => Some(SwapStatus::Completed),
            "cancelled" | "canceled" => Some(SwapStatus::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SwapStatus::Active => "Active",
            SwapStatus::Completed => "Completed",
            SwapStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A borrowed battery, from pickup to deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct Swap {
    pub id: SwapId,
    /// Where the battery was borrowed.
    pub source: StationRef,
    /// Where it was deposited, once it has been.
    pub destination: Option<StationRef>,
    pub cost: f64,
    pub swapped_at: Option<DateTime<Utc>>,
    pub status: SwapStatus,
}

impl Swap {
    pub fn is_active(&self) -> bool {
        self.status == SwapStatus::Active
    }
}

/// Why a swap action was refused locally, without contacting the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapRejection {
    #[error("you already have an active swap; deposit or cancel it first")]
    AlreadyActive,

    #[error("{station} has no charged batteries right now")]
    NoChargedBatteries { station: String },

    #[error("you have no active swap")]
    NoActiveSwap,
}

/// What the client currently knows about the user's swap.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapPhase {
    NoActiveSwap,
    Active(Swap),
}

impl SwapPhase {
    /// Phase from the backend's "active swap" lookup.
    ///
    /// A non-active swap in that slot is ignored rather than trusted.
    pub fn from_active(active: Option<Swap>) -> Self {
        match active {
            Some(swap) if swap.is_active() => SwapPhase::Active(swap),
            _ => SwapPhase::NoActiveSwap,
        }
    }

    /// Phase derived from the user's swap history.
    pub fn from_history(swaps: &[Swap]) -> Self {
        Self::from_active(swaps.iter().find(|s| s.is_active()).cloned())
    }

    pub fn active(&self) -> Option<&Swap> {
        match self {
            SwapPhase::Active(swap) => Some(swap),
            SwapPhase::NoActiveSwap => None,
        }
    }

    /// Whether the borrow action should be offered at all.
    pub fn can_borrow(&self) -> bool {
        matches!(self, SwapPhase::NoActiveSwap)
    }

    /// Gate a borrow request at `station`.
    ///
    /// One active swap per user is enforced by the backend; this only avoids
    /// sending a request that is known to fail.
    pub fn check_borrow(&self, station: &Station) -> Result<(), SwapRejection> {
        if !self.can_borrow() {
            return Err(SwapRejection::AlreadyActive);
        }
        if !station.batteries.has_charged() {
            return Err(SwapRejection::NoChargedBatteries {
                station: station.name.clone(),
            });
        }
        Ok(())
    }

    /// The swap a deposit would complete.
    pub fn check_deposit(&self) -> Result<&Swap, SwapRejection> {
        self.active().ok_or(SwapRejection::NoActiveSwap)
    }

    /// The swap a cancel would cancel.
    pub fn check_cancel(&self) -> Result<&Swap, SwapRejection> {
        self.active().ok_or(SwapRejection::NoActiveSwap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StationId, StationStatus, SwapInventory};

    fn swap(id: &str, status: SwapStatus) -> Swap {
        Swap {
            id: SwapId::new(id),
            source: StationRef::new(StationId::new("src"), Some("HSR Layout".into())),
            destination: None,
            cost: 150.0,
            swapped_at: None,
            status,
        }
    }

    fn station(charged: u32) -> Station {
        Station::new(StationId::new("s"), "Jayanagar", StationStatus::Available).with_batteries(
            SwapInventory {
                charged,
                charging: 2,
                total: charged + 2,
            },
        )
    }

    #[test]
    fn status_parse() {
        assert_eq!(SwapStatus::parse("Active"), Some(SwapStatus::Active));
        assert_eq!(SwapStatus::parse("COMPLETED"), Some(SwapStatus::Completed));
        assert_eq!(SwapStatus::parse("Lost"), None);
    }

    #[test]
    fn from_active_ignores_finished_swaps() {
        assert_eq!(SwapPhase::from_active(None), SwapPhase::NoActiveSwap);
        assert_eq!(
            SwapPhase::from_active(Some(swap("x", SwapStatus::Completed))),
            SwapPhase::NoActiveSwap
        );
        assert!(matches!(
            SwapPhase::from_active(Some(swap("x", SwapStatus::Active))),
            SwapPhase::Active(_)
        ));
    }

    #[test]
    fn from_history_finds_active() {
        let history = vec![
            swap("old", SwapStatus::Completed),
            swap("now", SwapStatus::Active),
            swap("gone", SwapStatus::Cancelled),
        ];
        let phase = SwapPhase::from_history(&history);
        assert_eq!(phase.active().map(|s| s.id.as_str()), Some("now"));

        let phase = SwapPhase::from_history(&history[..1]);
        assert_eq!(phase, SwapPhase::NoActiveSwap);
    }

    #[test]
    fn borrow_refused_while_active() {
        let phase = SwapPhase::Active(swap("now", SwapStatus::Active));
        assert!(!phase.can_borrow());
        assert_eq!(phase.check_borrow(&station(5)), Err(SwapRejection::AlreadyActive));
    }

    #[test]
    fn borrow_refused_without_charged_batteries() {
        let phase = SwapPhase::NoActiveSwap;
        assert_eq!(
            phase.check_borrow(&station(0)),
            Err(SwapRejection::NoChargedBatteries {
                station: "Jayanagar".into()
            })
        );
    }

    #[test]
    fn borrow_allowed() {
        assert_eq!(SwapPhase::NoActiveSwap.check_borrow(&station(3)), Ok(()));
    }

    #[test]
    fn deposit_and_cancel_need_active_swap() {
        assert_eq!(
            SwapPhase::NoActiveSwap.check_deposit(),
            Err(SwapRejection::NoActiveSwap)
        );
        assert_eq!(
            SwapPhase::NoActiveSwap.check_cancel(),
            Err(SwapRejection::NoActiveSwap)
        );

        let phase = SwapPhase::Active(swap("now", SwapStatus::Active));
        assert_eq!(phase.check_deposit().unwrap().id.as_str(), "now");
        assert_eq!(phase.check_cancel().unwrap().id.as_str(), "now");
    }
}
