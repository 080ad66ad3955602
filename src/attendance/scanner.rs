use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::attendance::reconciler::{Reconciler, ScanAction};
use crate::auth::credential::Credential;
use crate::error::ScanFlowError;
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Toast shown by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub dismissible: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn for_record(record: &AttendanceRecord) -> Self {
        match (ScanAction::of(record), record.duration_minutes) {
            (ScanAction::CheckIn, _) => Self::success(format!("{} checked in", record.member_name)),
            (ScanAction::CheckOut, Some(minutes)) => Self::success(format!(
                "{} checked out after {minutes} min",
                record.member_name
            )),
            (ScanAction::CheckOut, None) => {
                Self::success(format!("{} checked out", record.member_name))
            }
        }
    }
}

/// Something that eventually reads a member card.
#[async_trait]
pub trait ScanSource: Send {
    /// `None` when the dialog was dismissed before anything was read.
    async fn next_scan(&mut self) -> Option<String>;
}

/// Reads a fixed member id after a delay, for desks without a camera.
pub struct SimulatedScanner {
    member_id: String,
    delay: Duration,
}

impl SimulatedScanner {
    pub fn new(member_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            member_id: member_id.into(),
            delay,
        }
    }
}

#[async_trait]
impl ScanSource for SimulatedScanner {
    async fn next_scan(&mut self) -> Option<String> {
        tokio::time::sleep(self.delay).await;
        Some(self.member_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    Scanning,
}

/// Scan dialog of one front desk: `Closed -> Scanning -> Closed`.
///
/// At most one scan is in flight per dialog; a second `scan` while the first
/// is reading is refused.
pub struct ScanDialog {
    state: Mutex<DialogState>,
}

impl Default for ScanDialog {
    fn default() -> Self {
        Self {
            state: Mutex::new(DialogState::Closed),
        }
    }
}

/// Closes the dialog when dropped, including when the scan future is cancelled.
struct OpenDialog<'a> {
    dialog: &'a ScanDialog,
}

impl Drop for OpenDialog<'_> {
    fn drop(&mut self) {
        self.dialog.set(DialogState::Closed);
    }
}

impl ScanDialog {
    pub fn state(&self) -> DialogState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, next: DialogState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn open(&self) -> Result<OpenDialog<'_>, ScanFlowError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == DialogState::Scanning {
            return Err(ScanFlowError::Busy);
        }
        *state = DialogState::Scanning;
        Ok(OpenDialog { dialog: self })
    }

    /// Opens the dialog, waits for one read and closes again before returning.
    pub async fn scan<S: ScanSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Option<String>, ScanFlowError> {
        let open = self.open()?;
        debug!("Scan dialog open");
        let scanned = source.next_scan().await;
        drop(open);
        Ok(scanned)
    }
}

/// Full desk workflow: read a card, close the dialog, reconcile.
///
/// Returns `Ok(None)` when the dialog was dismissed without a read.
pub async fn run_scan<S: ScanSource + ?Sized>(
    dialog: &ScanDialog,
    source: &mut S,
    reconciler: &Reconciler,
    credential: &Credential,
) -> Result<Option<AttendanceRecord>, ScanFlowError> {
    let Some(member_id) = dialog.scan(source).await? else {
        info!("Scan dialog dismissed");
        return Ok(None);
    };

    let record = reconciler.reconcile_scan(&member_id, credential).await?;
    Ok(Some(record))
}
