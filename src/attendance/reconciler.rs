use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::credential::Credential;
use crate::client::attendance_store::AttendanceStore;
use crate::error::ReconcileError;
use crate::model::attendance::{AttendanceRecord, MemberId};

/// How a scan is turned into a check-in or a check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReconcileStrategy {
    /// Try to check in; if the store refuses, try to check out.
    Probe,
    /// Ask the store whether the member is inside, then issue the one matching mutation.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ScanAction {
    CheckIn,
    CheckOut,
}

impl ScanAction {
    /// Pure toggle: a member who is inside leaves, anyone else enters.
    pub fn decide(checked_in: bool) -> Self {
        if checked_in {
            ScanAction::CheckOut
        } else {
            ScanAction::CheckIn
        }
    }

    /// What a reconciled record says happened.
    pub fn of(record: &AttendanceRecord) -> Self {
        if record.is_active() {
            ScanAction::CheckIn
        } else {
            ScanAction::CheckOut
        }
    }
}

/// Resolves a scanned member id against the store without keeping any
/// presence state of its own.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn AttendanceStore>,
    strategy: ReconcileStrategy,
    session_type: String,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        strategy: ReconcileStrategy,
        session_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            strategy,
            session_type: session_type.into(),
        }
    }

    #[instrument(
        name = "reconcile_scan",
        skip(self, credential),
        fields(scan_id = %Uuid::new_v4(), strategy = %self.strategy)
    )]
    pub async fn reconcile_scan(
        &self,
        member_id: &str,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ReconcileError> {
        let member_id = MemberId::parse(member_id).ok_or(ReconcileError::InvalidMemberId)?;

        let record = match self.strategy {
            ReconcileStrategy::Probe => self.probe(&member_id, credential).await?,
            ReconcileStrategy::Status => self.by_status(&member_id, credential).await?,
        };

        info!(
            member_id = %member_id,
            record_id = %record.id,
            action = ?ScanAction::of(&record),
            "Scan reconciled"
        );
        Ok(record)
    }

    async fn probe(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ReconcileError> {
        let check_in = match self
            .store
            .check_in(member_id, &self.session_type, credential)
            .await
        {
            Ok(record) => return Ok(record),
            Err(e) => e,
        };

        debug!(error = %check_in, member_id = %member_id, "Check-in refused, trying check-out");

        self.store
            .check_out(member_id, credential)
            .await
            .map_err(|check_out| {
                error!(
                    check_in_error = %check_in,
                    check_out_error = %check_out,
                    member_id = %member_id,
                    "Scan could not be reconciled"
                );
                ReconcileError::BothFailed {
                    check_in,
                    check_out,
                }
            })
    }

    async fn by_status(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ReconcileError> {
        let status = self
            .store
            .status(member_id, credential)
            .await
            .map_err(|e| {
                error!(error = %e, member_id = %member_id, "Status lookup failed");
                ReconcileError::StatusLookup(e)
            })?;

        if let Some(open) = &status.open_record {
            debug!(member_id = %member_id, record_id = %open.id, since = %open.check_in_time, "Store reports open visit");
        }

        match ScanAction::decide(status.is_inside()) {
            ScanAction::CheckIn => self
                .store
                .check_in(member_id, &self.session_type, credential)
                .await
                .map_err(ReconcileError::CheckIn),
            ScanAction::CheckOut => self
                .store
                .check_out(member_id, credential)
                .await
                .map_err(ReconcileError::CheckOut),
        }
    }
}
