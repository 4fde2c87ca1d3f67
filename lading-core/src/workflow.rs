//! Workflow engine for shipment status transitions.
//!
//! The engine is a deterministic pure function over
//! `(record, operation, inputs) -> (new record | rejection)`. It performs
//! no I/O and never reads the system clock: the caller supplies `now`, so
//! the same inputs always produce the same output.
//!
//! # State Transition Diagram
//!
//! ```text
//! planned_* → in_transit_* → arrived_{pta,klm,offsite}
//!     ── start_unloading ──→ unloading
//!     ── complete_unloading → inspection_pending
//!     ── start_inspection ──→ inspecting ── complete_inspection ──┬→ inspection_passed
//!                                                                 └→ inspection_failed ── reject → rejected
//!     inspection_passed ── start_receiving → receiving ── complete_receiving → received → stored
//!     any non-archived ── archive ⇄ unarchive (restores prior status)
//! ```

use crate::error::TransitionError;
use crate::shipment::{
    InspectionProgress, ReceivingProgress, RejectionRecord, Shipment, ShipmentStatus,
};
use crate::Timestamp;

// ============================================================================
// TRANSITION REQUESTS
// ============================================================================

/// A requested workflow move plus its operation-specific inputs.
///
/// Each variant corresponds to one independently invocable operation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionRequest {
    StartUnloading,
    CompleteUnloading,
    StartInspection {
        /// Inspector taking the job; defaults to the acting user.
        inspector: Option<String>,
    },
    CompleteInspection {
        passed: bool,
        notes: Option<String>,
        /// Falls back to the inspector recorded at start when omitted.
        inspector: Option<String>,
    },
    StartReceiving {
        receiver: Option<String>,
    },
    CompleteReceiving {
        received_quantity: i32,
    },
    Reject {
        reason: String,
    },
    Archive,
    Unarchive,
}

impl TransitionRequest {
    /// Short operation name used in conflict messages and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            TransitionRequest::StartUnloading => "start_unloading",
            TransitionRequest::CompleteUnloading => "complete_unloading",
            TransitionRequest::StartInspection { .. } => "start_inspection",
            TransitionRequest::CompleteInspection { .. } => "complete_inspection",
            TransitionRequest::StartReceiving { .. } => "start_receiving",
            TransitionRequest::CompleteReceiving { .. } => "complete_receiving",
            TransitionRequest::Reject { .. } => "reject",
            TransitionRequest::Archive => "archive",
            TransitionRequest::Unarchive => "unarchive",
        }
    }

    /// The statuses this operation is legal from.
    ///
    /// This is the single source of truth for transition legality; the
    /// property tests iterate it against every status.
    pub fn required_statuses(&self) -> Vec<ShipmentStatus> {
        match self {
            TransitionRequest::StartUnloading => vec![
                ShipmentStatus::ArrivedPta,
                ShipmentStatus::ArrivedKlm,
                ShipmentStatus::ArrivedOffsite,
            ],
            TransitionRequest::CompleteUnloading => vec![ShipmentStatus::Unloading],
            TransitionRequest::StartInspection { .. } => vec![ShipmentStatus::InspectionPending],
            TransitionRequest::CompleteInspection { .. } => vec![ShipmentStatus::Inspecting],
            TransitionRequest::StartReceiving { .. } => vec![ShipmentStatus::InspectionPassed],
            TransitionRequest::CompleteReceiving { .. } => vec![ShipmentStatus::Receiving],
            TransitionRequest::Reject { .. } => vec![ShipmentStatus::InspectionFailed],
            TransitionRequest::Archive => ShipmentStatus::all()
                .into_iter()
                .filter(|s| *s != ShipmentStatus::Archived)
                .collect(),
            TransitionRequest::Unarchive => vec![ShipmentStatus::Archived],
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Attempt a workflow transition.
///
/// On success returns the updated record; the input record is never
/// mutated, so a rejection leaves no partial state behind. `actor` is the
/// acting-user reference recorded into stage metadata where the operation
/// calls for one.
pub fn apply_transition(
    shipment: &Shipment,
    request: &TransitionRequest,
    actor: &str,
    now: Timestamp,
) -> Result<Shipment, TransitionError> {
    let allowed = request.required_statuses();
    if !allowed.contains(&shipment.status) {
        return Err(TransitionError::InvalidSourceStatus {
            operation: request.operation(),
            current: shipment.status,
            allowed,
        });
    }

    let mut next = shipment.clone();
    match request {
        TransitionRequest::StartUnloading => {
            next.status = ShipmentStatus::Unloading;
            next.unloading.started_at = Some(now);
        }
        TransitionRequest::CompleteUnloading => {
            next.status = ShipmentStatus::InspectionPending;
            next.unloading.completed_at = Some(now);
        }
        TransitionRequest::StartInspection { inspector } => {
            next.status = ShipmentStatus::Inspecting;
            next.inspection.progress = Some(InspectionProgress::InProgress);
            next.inspection.inspector =
                Some(inspector.clone().unwrap_or_else(|| actor.to_string()));
            next.inspection.started_at = Some(now);
        }
        TransitionRequest::CompleteInspection {
            passed,
            notes,
            inspector,
        } => {
            next.status = if *passed {
                ShipmentStatus::InspectionPassed
            } else {
                ShipmentStatus::InspectionFailed
            };
            next.inspection.progress = Some(if *passed {
                InspectionProgress::Passed
            } else {
                InspectionProgress::Failed
            });
            if let Some(inspector) = inspector {
                next.inspection.inspector = Some(inspector.clone());
            }
            next.inspection.completed_at = Some(now);
            next.inspection.notes = notes.clone();
        }
        TransitionRequest::StartReceiving { receiver } => {
            next.status = ShipmentStatus::Receiving;
            next.receiving.progress = Some(ReceivingProgress::InProgress);
            next.receiving.receiver = Some(receiver.clone().unwrap_or_else(|| actor.to_string()));
            next.receiving.started_at = Some(now);
        }
        TransitionRequest::CompleteReceiving { received_quantity } => {
            next.status = ShipmentStatus::Received;
            next.receiving.progress = Some(ReceivingProgress::Completed);
            next.receiving.received_quantity = Some(*received_quantity);
            if next.receiving.receiver.is_none() {
                next.receiving.receiver = Some(actor.to_string());
            }
            next.receiving.completed_at = Some(now);
        }
        TransitionRequest::Reject { reason } => {
            next.status = ShipmentStatus::Rejected;
            next.rejection = Some(RejectionRecord {
                reason: reason.clone(),
                rejected_by: actor.to_string(),
                rejected_at: now,
            });
        }
        TransitionRequest::Archive => {
            next.archived_from = Some(shipment.status);
            next.status = ShipmentStatus::Archived;
            next.archived_at = Some(now);
        }
        TransitionRequest::Unarchive => {
            let restored = next
                .archived_from
                .take()
                .ok_or(TransitionError::MissingRestoreStatus)?;
            next.status = restored;
            next.archived_at = None;
        }
    }
    next.updated_at = now;
    Ok(next)
}
