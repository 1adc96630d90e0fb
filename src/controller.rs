//! Resource controller: keeps a local record list in step with a remote
//! collection and drives one draft through create/update/delete.
//!
//! DESIGN
//! ======
//! All operations take `&self` so a view can fire them from independent
//! event handlers. State sits behind a `std::sync::Mutex` that is never
//! held across an await; network calls happen with the lock released.
//!
//! - The record list is a cache. It is only ever replaced wholesale by a
//!   load, except for an optimistic delete, which removes one entry and
//!   relies on a full reload if the server refuses.
//! - Loads may overlap. Each takes a sequence number and is applied only if
//!   nothing newer has been applied, so a slow stale response cannot
//!   overwrite a fresher list.
//! - Submit and delete are exclusive: while either is outstanding, another
//!   submit or delete is rejected with `Busy` before any network call. The
//!   flag is an RAII guard, so a dropped future releases it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::draft::{Draft, LocalFile, Mode};
use crate::error::ControllerError;
use crate::notify::{Notice, Notifier};
use crate::record::{Record, RecordId};
use crate::resource::{DeleteContract, DeletePolicy, ResourceSpec};
use crate::transport::{CollectionApi, DeleteRequest};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Default)]
struct ControllerState {
    records: Vec<Record>,
    draft: Draft,
    mode: Mode,
    loads_in_flight: usize,
    submitting: bool,
    deleting: bool,
    last_error: Option<ControllerError>,
    last_notice: Option<Notice>,
    /// Sequence number handed to the most recently started load.
    issued_seq: u64,
    /// Sequence number of the newest state applied to `records`.
    applied_seq: u64,
}

/// Point-in-time copy of a controller's state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub draft: Draft,
    pub mode: Mode,
    pub loading: bool,
    pub submitting: bool,
    pub deleting: bool,
    pub last_error: Option<ControllerError>,
    pub last_notice: Option<Notice>,
}

impl Snapshot {
    #[must_use]
    pub fn busy(&self) -> bool {
        self.loading || self.submitting || self.deleting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Load,
    Submit,
    Delete,
}

/// Marks an operation as outstanding until dropped.
struct InFlight<'a> {
    state: &'a Mutex<ControllerState>,
    op: Op,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.op {
            Op::Load => st.loads_in_flight = st.loads_in_flight.saturating_sub(1),
            Op::Submit => st.submitting = false,
            Op::Delete => st.deleting = false,
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ResourceController {
    spec: ResourceSpec,
    api: Arc<dyn CollectionApi>,
    state: Mutex<ControllerState>,
    notifier: Notifier,
}

impl ResourceController {
    #[must_use]
    pub fn new(spec: ResourceSpec, api: Arc<dyn CollectionApi>) -> Self {
        Self { spec, api, state: Mutex::new(ControllerState::default()), notifier: Notifier::new() }
    }

    #[must_use]
    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self, op: Op) -> Result<InFlight<'_>, ControllerError> {
        let mut st = self.lock();
        match op {
            Op::Load => st.loads_in_flight += 1,
            Op::Submit | Op::Delete => {
                if st.submitting || st.deleting {
                    debug!(resource = %self.spec.name, ?op, "rejected while another request is outstanding");
                    return Err(ControllerError::Busy);
                }
                if op == Op::Submit {
                    st.submitting = true;
                } else {
                    st.deleting = true;
                }
            }
        }
        Ok(InFlight { state: &self.state, op })
    }

    /// Record a failure as the latest error and publish it.
    fn fail(&self, err: ControllerError) -> ControllerError {
        warn!(resource = %self.spec.name, code = err.code(), error = %err, "operation failed");
        self.lock().last_error = Some(err.clone());
        self.notifier.publish(Notice::error(&err));
        err
    }

    fn notify(&self, message: String) {
        let notice = Notice::info(message);
        self.lock().last_notice = Some(notice.clone());
        self.notifier.publish(notice);
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let st = self.lock();
        Snapshot {
            records: st.records.clone(),
            draft: st.draft.clone(),
            mode: st.mode.clone(),
            loading: st.loads_in_flight > 0,
            submitting: st.submitting,
            deleting: st.deleting,
            last_error: st.last_error.clone(),
            last_notice: st.last_notice.clone(),
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    #[must_use]
    pub fn draft(&self) -> Draft {
        self.lock().draft.clone()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock().mode.clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        let st = self.lock();
        st.loads_in_flight > 0 || st.submitting || st.deleting
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ControllerError> {
        self.lock().last_error.clone()
    }

    #[must_use]
    pub fn last_notice(&self) -> Option<Notice> {
        self.lock().last_notice.clone()
    }

    /// Receive every notice this controller publishes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.notifier.subscribe()
    }

    /// Clear the latest error and notice once the view has shown them.
    pub fn dismiss(&self) {
        let mut st = self.lock();
        st.last_error = None;
        st.last_notice = None;
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Fetch the collection and replace the local list with it. A fresh
    /// result also clears `last_error`; a stale one changes nothing.
    ///
    /// # Errors
    ///
    /// Any transport error; the local list is left unchanged.
    pub async fn load(&self) -> Result<(), ControllerError> {
        let _flight = self.start(Op::Load)?;
        let seq = {
            let mut st = self.lock();
            st.issued_seq += 1;
            st.issued_seq
        };

        let result = match self.api.list(&self.spec).await {
            Ok(values) => self.parse_records(values),
            Err(e) => Err(e),
        };

        let records = match result {
            Ok(records) => records,
            Err(e) => return Err(self.fail(e)),
        };

        let mut st = self.lock();
        if seq <= st.applied_seq {
            debug!(resource = %self.spec.name, seq, applied = st.applied_seq, "discarding stale load");
            return Ok(());
        }
        st.applied_seq = seq;
        debug!(resource = %self.spec.name, count = records.len(), "records loaded");
        st.records = records;
        st.last_error = None;
        Ok(())
    }

    fn parse_records(&self, values: Vec<serde_json::Value>) -> Result<Vec<Record>, ControllerError> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                Record::from_value(value, &self.spec).map_err(|found| {
                    ControllerError::Decode(format!("{} entry {index} is a {found}, not an object", self.spec.name))
                })
            })
            .collect()
    }

    // =========================================================================
    // DRAFT
    // =========================================================================

    /// Start a fresh draft for a new record.
    pub fn begin_create(&self) {
        let mut st = self.lock();
        st.draft = Draft::new();
        st.mode = Mode::Create;
    }

    /// Start editing `record`. The draft is a copy; `records` is untouched.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidArgument`] if the record has no id.
    pub fn begin_edit(&self, record: &Record) -> Result<(), ControllerError> {
        let Some(id) = record.id.clone() else {
            return Err(ControllerError::InvalidArgument(format!(
                "{} record has no id and cannot be edited",
                self.spec.name
            )));
        };
        let draft = Draft::from_record(record, &self.spec);
        let mut st = self.lock();
        st.draft = draft;
        st.mode = Mode::Edit(id);
        Ok(())
    }

    /// Start editing the loaded record with `id`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidArgument`] if no loaded record has that id.
    pub fn begin_edit_by_id(&self, id: &RecordId) -> Result<(), ControllerError> {
        let record = self
            .lock()
            .records
            .iter()
            .find(|r| r.id.as_ref() == Some(id))
            .cloned()
            .ok_or_else(|| ControllerError::InvalidArgument(format!("no {} record with id {id}", self.spec.name)))?;
        self.begin_edit(&record)
    }

    /// Drop the draft and go back to create mode.
    pub fn cancel(&self) {
        self.begin_create();
    }

    /// Set one field of the draft. Values are checked at submit time.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidArgument`] if the resource has no such field.
    pub fn set_draft_field(&self, name: &str, value: impl Into<String>) -> Result<(), ControllerError> {
        if self.spec.field(name).is_none() {
            return Err(ControllerError::InvalidArgument(format!("{} has no field '{name}'", self.spec.name)));
        }
        self.lock().draft.set_field(name, value);
        Ok(())
    }

    /// Replace the file selection of an attachment role.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidArgument`] if the resource has no such role.
    pub fn attach_files(&self, role: &str, files: Vec<LocalFile>) -> Result<(), ControllerError> {
        let Some(spec_role) = self.spec.attachment(role) else {
            return Err(ControllerError::InvalidArgument(format!(
                "{} has no attachment role '{role}'",
                self.spec.name
            )));
        };
        self.lock().draft.attach(role, spec_role.multiplicity, files);
        Ok(())
    }

    // =========================================================================
    // SUBMIT
    // =========================================================================

    /// Validate and send the draft, then reload on success.
    ///
    /// The draft survives any failure unchanged, and a draft edited while
    /// the request was outstanding survives success too. Once the server
    /// accepts the record, a failed reload is reported through `last_error`
    /// but does not make the submit itself fail.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Busy`] while a submit or delete is outstanding,
    /// [`ControllerError::Validation`] before any network call, or the
    /// transport error.
    pub async fn submit(&self) -> Result<(), ControllerError> {
        let flight = self.start(Op::Submit)?;

        let prepared = {
            let st = self.lock();
            self.spec.validate(&st.draft).map(|()| {
                (self.spec.build_payload(&st.draft, &st.mode), st.draft.clone(), st.mode.clone())
            })
        };
        let (parts, sent, mode) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(e) = self.api.upsert(&self.spec, parts).await {
            return Err(self.fail(e));
        }

        {
            // Only the draft that was sent is consumed.
            let mut st = self.lock();
            if st.mode == mode && st.draft == sent {
                st.draft = Draft::new();
                st.mode = Mode::Create;
            } else {
                debug!(resource = %self.spec.name, "draft changed during submit; keeping it");
            }
        }
        match &mode {
            Mode::Create => {
                info!(resource = %self.spec.name, "record created");
                self.notify(format!("{} added", self.spec.name));
            }
            Mode::Edit(id) => {
                info!(resource = %self.spec.name, %id, "record updated");
                self.notify(format!("{} {id} updated", self.spec.name));
            }
        }

        if let Err(e) = self.load().await {
            warn!(resource = %self.spec.name, error = %e, "reload after submit failed");
        }
        drop(flight);
        Ok(())
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Delete a record according to the resource's delete policy.
    ///
    /// Optimistic: the record leaves the local list at once and a full
    /// reload restores consistency if the server refuses. Confirmed: the
    /// server is asked first and the list is reloaded on success.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidArgument`] for a missing id,
    /// [`ControllerError::Busy`] while a submit or delete is outstanding, or
    /// the transport error.
    pub async fn delete(&self, id: Option<&RecordId>) -> Result<(), ControllerError> {
        let Some(id) = id.cloned() else {
            return Err(ControllerError::InvalidArgument(format!(
                "a {} record id is required to delete",
                self.spec.name
            )));
        };
        let _flight = self.start(Op::Delete)?;
        let optimistic = self.spec.delete_policy == DeletePolicy::Optimistic;

        let request = {
            let mut st = self.lock();
            let request = match &self.spec.delete {
                DeleteContract::ById { .. } => DeleteRequest::ById(id.clone()),
                DeleteContract::Resubmit { .. } => DeleteRequest::Resubmit {
                    target: id.clone(),
                    remaining: st
                        .records
                        .iter()
                        .filter(|r| r.id.as_ref() != Some(&id))
                        .map(Record::to_value)
                        .collect(),
                },
            };
            if optimistic {
                st.records.retain(|r| r.id.as_ref() != Some(&id));
                // Loads already in flight were issued before the removal.
                st.applied_seq = st.issued_seq;
            }
            request
        };

        if let Err(e) = self.api.delete(&self.spec, request).await {
            // Resync first: a successful reload clears last_error.
            if optimistic {
                if let Err(reload) = self.load().await {
                    warn!(resource = %self.spec.name, error = %reload, "resync after failed delete failed");
                }
            }
            return Err(self.fail(e));
        }

        {
            let mut st = self.lock();
            if st.mode.target() == Some(&id) {
                st.mode = Mode::Create;
            }
        }
        info!(resource = %self.spec.name, %id, "record deleted");
        self.notify(format!("{} {id} deleted", self.spec.name));

        if !optimistic {
            if let Err(e) = self.load().await {
                warn!(resource = %self.spec.name, error = %e, "reload after delete failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
