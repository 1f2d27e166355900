//! Bulk import state machine.
//!
//! `ImportFlow` is a pure reducer: user actions and asynchronous outcomes go
//! in, `Command`s for the driver come out. Every outcome is stamped with the
//! attempt that requested it, and outcomes from an older attempt are dropped,
//! so a response that lands after a reset or a new file selection never
//! touches the newer state.
//!
//! The upload's HTTP response and the progress channel are independent
//! producers. The channel only drives the live percentage and text while the
//! upload is in flight; the HTTP response alone decides success or failure.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::message::{clamp_percentage, ProgressMessage};
use super::SessionId;
use crate::api::{ApiResult, PreviewData, SpreadsheetFile, UploadResult, ValidationReport};
use crate::error::{ApiError, ImportError};

pub type Attempt = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Validating,
    Invalid {
        report: ValidationReport,
    },
    PreviewLoading {
        report: ValidationReport,
    },
    PreviewReady {
        report: ValidationReport,
        preview: PreviewData,
    },
    Confirming {
        report: ValidationReport,
        preview: PreviewData,
    },
    Uploading {
        report: ValidationReport,
        preview: PreviewData,
        percentage: u8,
        channel_open: bool,
    },
    Succeeded {
        report: ValidationReport,
        preview: PreviewData,
        result: UploadResult,
    },
    Failed {
        stage: Stage,
        report: Option<ValidationReport>,
        preview: Option<PreviewData>,
    },
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Preview,
    Upload,
}

#[derive(Debug)]
pub enum ChannelEvent {
    Message(ProgressMessage),
    /// The channel ended; `Some` carries the transport error.
    Closed(Option<String>),
}

#[derive(Debug)]
pub enum Outcome {
    Validated(ApiResult<ValidationReport>),
    Previewed(ApiResult<PreviewData>),
    Uploaded(ApiResult<UploadResult>),
    Channel(ChannelEvent),
}

/// An outcome tagged with the attempt that produced it.
#[derive(Debug)]
pub struct Stamped {
    pub attempt: Attempt,
    pub outcome: Outcome,
}

impl Stamped {
    pub fn new(attempt: Attempt, outcome: Outcome) -> Self {
        Self { attempt, outcome }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Validate {
        attempt: Attempt,
        file: Arc<SpreadsheetFile>,
    },
    Preview {
        attempt: Attempt,
        file: Arc<SpreadsheetFile>,
    },
    OpenChannel {
        attempt: Attempt,
        session: SessionId,
    },
    Upload {
        attempt: Attempt,
        file: Arc<SpreadsheetFile>,
        session: SessionId,
    },
    CloseChannel,
}

#[derive(Debug, Default)]
pub struct ImportFlow {
    attempt: Attempt,
    session: Option<SessionId>,
    file: Option<Arc<SpreadsheetFile>>,
    phase: Phase,
    status: String,
}

impl ImportFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[cfg(test)]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn file(&self) -> Option<&SpreadsheetFile> {
        self.file.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn validation(&self) -> Option<&ValidationReport> {
        match &self.phase {
            Phase::Idle | Phase::Validating => None,
            Phase::Invalid { report }
            | Phase::PreviewLoading { report }
            | Phase::PreviewReady { report, .. }
            | Phase::Confirming { report, .. }
            | Phase::Uploading { report, .. }
            | Phase::Succeeded { report, .. } => Some(report),
            Phase::Failed { report, .. } => report.as_ref(),
        }
    }

    pub fn preview(&self) -> Option<&PreviewData> {
        match &self.phase {
            Phase::PreviewReady { preview, .. }
            | Phase::Confirming { preview, .. }
            | Phase::Uploading { preview, .. }
            | Phase::Succeeded { preview, .. } => Some(preview),
            Phase::Failed { preview, .. } => preview.as_ref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&UploadResult> {
        match &self.phase {
            Phase::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn preview_visible(&self) -> bool {
        self.preview().is_some()
    }

    pub fn result_visible(&self) -> bool {
        self.result().is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            Phase::Validating | Phase::PreviewLoading { .. } | Phase::Uploading { .. }
        )
    }

    /// Percentage for the progress bar; `None` when no import has started.
    pub fn percentage(&self) -> Option<u8> {
        match &self.phase {
            Phase::Uploading { percentage, .. } => Some(*percentage),
            Phase::Succeeded { .. } => Some(100),
            _ => None,
        }
    }

    /// Whether the progress channel is still expected to report while uploading.
    pub fn live_progress(&self) -> bool {
        matches!(
            self.phase,
            Phase::Uploading {
                channel_open: true,
                ..
            }
        )
    }

    /// Record count to name in the confirmation prompt.
    pub fn pending_confirmation(&self) -> Option<usize> {
        match &self.phase {
            Phase::Confirming { preview, .. } => Some(preview.total),
            _ => None,
        }
    }

    /// Starts a new attempt with `file`. A rejected file leaves the flow untouched.
    pub fn select_file(&mut self, file: SpreadsheetFile) -> Result<Vec<Command>, ImportError> {
        super::selector::check_name(&file.name)?;

        let was_uploading = matches!(self.phase, Phase::Uploading { .. });
        self.attempt += 1;
        self.session = Some(SessionId::generate());
        let file = Arc::new(file);
        self.file = Some(file.clone());
        self.phase = Phase::Validating;
        self.status = "Validando estructura del archivo...".to_string();
        info!(attempt = self.attempt, name = %file.name, "import attempt started");

        let mut commands = Vec::new();
        if was_uploading {
            commands.push(Command::CloseChannel);
        }
        commands.push(Command::Validate {
            attempt: self.attempt,
            file,
        });
        Ok(commands)
    }

    /// Moves to the confirmation prompt once a preview is on screen.
    pub fn request_import(&mut self) -> Vec<Command> {
        self.phase = match std::mem::take(&mut self.phase) {
            Phase::PreviewReady { report, preview } => Phase::Confirming { report, preview },
            other => {
                debug!("request_import ignored outside PreviewReady");
                other
            }
        };
        Vec::new()
    }

    pub fn cancel_import(&mut self) -> Vec<Command> {
        self.phase = match std::mem::take(&mut self.phase) {
            Phase::Confirming { report, preview } => Phase::PreviewReady { report, preview },
            other => other,
        };
        Vec::new()
    }

    /// User said yes: open the progress channel and issue the upload, in that order.
    pub fn confirm_import(&mut self) -> Vec<Command> {
        let (Some(file), Some(session)) = (self.file.clone(), self.session.clone()) else {
            return Vec::new();
        };
        let (report, preview) = match std::mem::take(&mut self.phase) {
            Phase::Confirming { report, preview } => (report, preview),
            other => {
                self.phase = other;
                return Vec::new();
            }
        };

        info!(attempt = self.attempt, %session, records = preview.total, "import confirmed");
        self.phase = Phase::Uploading {
            report,
            preview,
            percentage: 0,
            channel_open: true,
        };
        self.status = "Iniciando carga...".to_string();

        vec![
            Command::OpenChannel {
                attempt: self.attempt,
                session: session.clone(),
            },
            Command::Upload {
                attempt: self.attempt,
                file,
                session,
            },
        ]
    }

    /// Back to `Idle`, dropping every stored result and the session.
    pub fn reset(&mut self) -> Vec<Command> {
        info!(attempt = self.attempt, "import flow reset");
        self.attempt += 1;
        self.session = None;
        self.file = None;
        self.phase = Phase::Idle;
        self.status.clear();
        vec![Command::CloseChannel]
    }

    pub fn apply(&mut self, stamped: Stamped) -> Vec<Command> {
        if stamped.attempt != self.attempt {
            debug!(
                stale = stamped.attempt,
                current = self.attempt,
                "discarding outcome of an abandoned attempt"
            );
            return Vec::new();
        }

        match stamped.outcome {
            Outcome::Validated(result) => self.on_validated(result),
            Outcome::Previewed(result) => self.on_previewed(result),
            Outcome::Uploaded(result) => self.on_uploaded(result),
            Outcome::Channel(event) => {
                self.on_channel(event);
                Vec::new()
            }
        }
    }

    fn on_validated(&mut self, result: ApiResult<ValidationReport>) -> Vec<Command> {
        if !matches!(self.phase, Phase::Validating) {
            return Vec::new();
        }

        match result {
            Ok(report) if report.valid => {
                info!(columns = report.columns.len(), "spreadsheet columns valid");
                let Some(file) = self.file.clone() else {
                    return Vec::new();
                };
                self.phase = Phase::PreviewLoading { report };
                self.status = "✓ Columnas válidas. Cargando vista previa...".to_string();
                vec![Command::Preview {
                    attempt: self.attempt,
                    file,
                }]
            }
            Ok(report) => {
                let missing: Vec<&str> = report
                    .columns
                    .iter()
                    .filter(|c| !c.valid)
                    .map(|c| c.column.as_str())
                    .collect();
                info!(?missing, "spreadsheet columns invalid");
                self.phase = Phase::Invalid { report };
                self.status = "✗ Hay errores en las columnas del archivo".to_string();
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "validation request failed");
                self.fail(Stage::Validation, &e, "Error al validar el archivo");
                Vec::new()
            }
        }
    }

    fn on_previewed(&mut self, result: ApiResult<PreviewData>) -> Vec<Command> {
        let report = match std::mem::take(&mut self.phase) {
            Phase::PreviewLoading { report } => report,
            other => {
                self.phase = other;
                return Vec::new();
            }
        };

        match result {
            Ok(preview) => {
                self.status = format!("Vista previa lista ({} registros)", preview.total);
                info!(records = preview.total, "preview ready");
                self.phase = Phase::PreviewReady { report, preview };
            }
            Err(e) => {
                warn!(error = %e, "preview request failed");
                self.phase = Phase::PreviewLoading { report };
                self.fail(Stage::Preview, &e, "Error al cargar vista previa");
            }
        }
        Vec::new()
    }

    fn on_uploaded(&mut self, result: ApiResult<UploadResult>) -> Vec<Command> {
        let (report, preview) = match std::mem::take(&mut self.phase) {
            Phase::Uploading { report, preview, .. } => (report, preview),
            other => {
                self.phase = other;
                return Vec::new();
            }
        };

        match result {
            Ok(result) => {
                info!(
                    successes = result.successes,
                    failures = result.failures,
                    "import finished"
                );
                self.status = completed_status(result.successes, result.failures);
                self.phase = Phase::Succeeded {
                    report,
                    preview,
                    result,
                };
            }
            Err(e) => {
                warn!(error = %e, "import request failed");
                self.phase = Phase::Uploading {
                    report,
                    preview,
                    percentage: 0,
                    channel_open: false,
                };
                self.fail(Stage::Upload, &e, "Error al cargar datos");
            }
        }
        vec![Command::CloseChannel]
    }

    fn on_channel(&mut self, event: ChannelEvent) {
        let Phase::Uploading {
            percentage,
            channel_open,
            ..
        } = &mut self.phase
        else {
            debug!(?event, "progress event after the import settled; ignored");
            return;
        };

        match event {
            ChannelEvent::Message(ProgressMessage::Progress { percentage: p, text }) => {
                *percentage = clamp_percentage(p);
                self.status = text.unwrap_or_default();
            }
            ChannelEvent::Message(ProgressMessage::Completed {
                successes, failures, ..
            }) => {
                *percentage = 100;
                self.status = completed_status(successes, failures);
            }
            ChannelEvent::Message(ProgressMessage::Error { text }) => {
                warn!(?text, "backend reported an error on the progress channel");
                if let Some(text) = text {
                    self.status = text;
                }
            }
            ChannelEvent::Closed(reason) => {
                if let Some(reason) = reason {
                    warn!(%reason, "progress channel failed; waiting for the upload response");
                } else {
                    debug!("progress channel closed");
                }
                *channel_open = false;
            }
        }
    }

    /// Failure at `stage`; keeps whatever validation/preview data is still
    /// meaningful for that stage.
    fn fail(&mut self, stage: Stage, error: &ApiError, fallback: &str) {
        let (report, preview) = match std::mem::take(&mut self.phase) {
            Phase::PreviewLoading { report } => (Some(report), None),
            Phase::Uploading { report, preview, .. } => (Some(report), Some(preview)),
            _ => (None, None),
        };
        self.phase = Phase::Failed {
            stage,
            report,
            preview,
        };
        self.status = error.user_message(fallback);
    }
}

pub fn completed_status(successes: usize, failures: usize) -> String {
    format!("Completado ({} exitosos, {} fallidos)", successes, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ColumnValidation;
    use reqwest::StatusCode;

    fn spreadsheet(name: &str) -> SpreadsheetFile {
        SpreadsheetFile {
            name: name.to_string(),
            bytes: vec![0x50, 0x4b, 0x03, 0x04],
        }
    }

    fn report(valid: bool) -> ValidationReport {
        ValidationReport {
            valid,
            columns: vec![
                ColumnValidation {
                    column: "marca".to_string(),
                    required: true,
                    valid: true,
                    message: Some("Columna encontrada ✓".to_string()),
                },
                ColumnValidation {
                    column: "torque".to_string(),
                    required: true,
                    valid,
                    message: None,
                },
            ],
            total_columnas: 8,
            total_filas: 10,
        }
    }

    fn preview(total: usize) -> PreviewData {
        PreviewData {
            columns: vec!["marca".to_string(), "modelo".to_string()],
            rows: Vec::new(),
            total,
        }
    }

    fn upload(successes: usize, failures: usize) -> UploadResult {
        UploadResult {
            total: successes + failures,
            successes,
            failures,
            errors: Vec::new(),
        }
    }

    fn server_error() -> ApiError {
        ApiError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        }
    }

    fn current(flow: &ImportFlow, outcome: Outcome) -> Stamped {
        Stamped::new(flow.attempt(), outcome)
    }

    fn progress(p: f64) -> Outcome {
        Outcome::Channel(ChannelEvent::Message(ProgressMessage::Progress {
            percentage: p,
            text: Some(format!("Procesando... {}%", p)),
        }))
    }

    /// Drives a fresh flow up to the upload being in flight.
    fn uploading_flow(total: usize) -> ImportFlow {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(total)))));
        flow.request_import();
        flow.confirm_import();
        flow
    }

    fn is_preview(command: &Command) -> bool {
        matches!(command, Command::Preview { .. })
    }

    #[test]
    fn test_unrecognized_extension_is_rejected_without_state_change() {
        let mut flow = ImportFlow::new();
        for name in ["flota.csv", "flota.ods", "flota", "flota.xlsx.bak"] {
            let result = flow.select_file(spreadsheet(name));
            assert!(matches!(result, Err(ImportError::UnsupportedExtension { .. })));
        }
        assert_eq!(flow.phase(), &Phase::Idle);
        assert_eq!(flow.attempt(), 0);
        assert!(flow.file().is_none());
        assert!(flow.session().is_none());
    }

    #[test]
    fn test_rejected_file_keeps_previous_flow() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(12)))));
        let before = flow.phase().clone();

        assert!(flow.select_file(spreadsheet("notas.txt")).is_err());
        assert_eq!(flow.phase(), &before);
        assert_eq!(flow.file().map(|f| f.name.as_str()), Some("flota.xlsx"));
    }

    #[test]
    fn test_accepted_file_starts_validation() {
        let mut flow = ImportFlow::new();
        let commands = flow.select_file(spreadsheet("flota.XLSX")).unwrap();

        assert_eq!(commands.len(), 1);
        assert!(matches!(&commands[0], Command::Validate { attempt: 1, file } if file.name == "flota.XLSX"));
        assert_eq!(flow.phase(), &Phase::Validating);
        assert!(flow.is_loading());
        assert!(flow.session().is_some());
    }

    #[test]
    fn test_invalid_columns_never_request_preview() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xls")).unwrap();

        let commands = flow.apply(current(&flow, Outcome::Validated(Ok(report(false)))));
        assert!(commands.is_empty());
        assert!(!flow.preview_visible());
        assert!(!flow.is_loading());
        assert!(matches!(flow.phase(), Phase::Invalid { .. }));
        assert_eq!(flow.validation().map(|r| r.columns.len()), Some(2));
    }

    #[test]
    fn test_preview_follows_only_the_latest_valid_validation() {
        // (file, verdict) sequences; a preview may only follow a `true`
        // verdict for the attempt that is current when it arrives.
        let verdicts = [true, false, false, true, true, false];
        let mut flow = ImportFlow::new();

        for valid in verdicts {
            flow.select_file(spreadsheet("flota.xlsx")).unwrap();
            let stale = flow.attempt() - 1;
            let late = flow.apply(Stamped::new(stale, Outcome::Validated(Ok(report(true)))));
            assert!(!late.iter().any(is_preview));

            let commands = flow.apply(current(&flow, Outcome::Validated(Ok(report(valid)))));
            assert_eq!(commands.iter().any(is_preview), valid);
            assert_eq!(flow.validation().map(|r| r.valid), Some(valid));
        }
    }

    #[test]
    fn test_duplicate_validation_response_does_not_repeat_preview() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        let first = flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        let second = flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));

        assert_eq!(first.iter().filter(|c| is_preview(c)).count(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_validation_failure_leaves_no_partial_data() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        let commands = flow.apply(current(&flow, Outcome::Validated(Err(server_error()))));

        assert!(commands.is_empty());
        assert!(flow.validation().is_none());
        assert!(!flow.preview_visible());
        assert!(!flow.is_loading());
        assert_eq!(flow.status(), "Error al validar el archivo");
    }

    #[test]
    fn test_preview_success_and_failure() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(37)))));
        assert!(flow.preview_visible());
        assert_eq!(flow.status(), "Vista previa lista (37 registros)");

        flow.select_file(spreadsheet("otra.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Err(server_error()))));
        assert!(!flow.preview_visible());
        assert!(matches!(flow.phase(), Phase::Failed { stage: Stage::Preview, .. }));
        assert_eq!(flow.file().map(|f| f.name.as_str()), Some("otra.xlsx"));
    }

    #[test]
    fn test_confirmation_names_record_count_and_can_be_cancelled() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(25)))));

        flow.request_import();
        assert_eq!(flow.pending_confirmation(), Some(25));

        flow.cancel_import();
        assert_eq!(flow.pending_confirmation(), None);
        assert!(matches!(flow.phase(), Phase::PreviewReady { .. }));
    }

    #[test]
    fn test_confirm_opens_channel_before_upload_with_same_session() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(10)))));
        flow.request_import();
        let commands = flow.confirm_import();

        let session = flow.session().cloned().unwrap();
        match commands.as_slice() {
            [Command::OpenChannel { session: opened, .. }, Command::Upload { session: sent, .. }] => {
                assert_eq!(opened, &session);
                assert_eq!(sent, &session);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
        assert_eq!(flow.percentage(), Some(0));
        assert_eq!(flow.status(), "Iniciando carga...");
        assert!(flow.is_loading());
    }

    #[test]
    fn test_confirm_without_prompt_does_nothing() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(10)))));

        assert!(flow.confirm_import().is_empty());
        assert!(matches!(flow.phase(), Phase::PreviewReady { .. }));
    }

    #[test]
    fn test_upload_success_reports_counts() {
        let mut flow = uploading_flow(10);
        let commands = flow.apply(current(&flow, Outcome::Uploaded(Ok(upload(8, 2)))));

        assert_eq!(commands, vec![Command::CloseChannel]);
        assert!(flow.result_visible());
        assert!(!flow.is_loading());
        assert!(flow.status().contains('8'));
        assert!(flow.status().contains('2'));
        assert_eq!(flow.status(), "Completado (8 exitosos, 2 fallidos)");
        assert_eq!(flow.percentage(), Some(100));
    }

    #[test]
    fn test_progress_sets_exact_percentage() {
        let mut flow = uploading_flow(100);
        assert!(flow.live_progress());
        flow.apply(current(&flow, progress(90.0)));
        assert_eq!(flow.percentage(), Some(90));

        flow.apply(current(&flow, progress(42.0)));
        assert_eq!(flow.percentage(), Some(42));
        assert_eq!(flow.status(), "Procesando... 42%");
    }

    #[test]
    fn test_channel_completed_before_http_response() {
        let mut flow = uploading_flow(10);
        flow.apply(current(
            &flow,
            Outcome::Channel(ChannelEvent::Message(ProgressMessage::Completed {
                successes: 8,
                failures: 2,
                errors: None,
            })),
        ));

        assert_eq!(flow.percentage(), Some(100));
        assert_eq!(flow.status(), "Completado (8 exitosos, 2 fallidos)");
        assert!(flow.is_loading());
        assert!(!flow.result_visible());

        flow.apply(current(&flow, Outcome::Uploaded(Ok(upload(8, 2)))));
        assert!(flow.result_visible());
    }

    #[test]
    fn test_http_failure_overrides_channel_completed() {
        let mut flow = uploading_flow(10);
        flow.apply(current(
            &flow,
            Outcome::Channel(ChannelEvent::Message(ProgressMessage::Completed {
                successes: 10,
                failures: 0,
                errors: None,
            })),
        ));
        flow.apply(current(&flow, Outcome::Uploaded(Err(server_error()))));

        assert!(matches!(flow.phase(), Phase::Failed { stage: Stage::Upload, .. }));
        assert_eq!(flow.status(), "Error al cargar datos");
        assert!(!flow.is_loading());
        assert!(!flow.result_visible());
        assert_eq!(flow.percentage(), None);
    }

    #[test]
    fn test_channel_messages_after_settling_are_ignored() {
        let mut flow = uploading_flow(10);
        flow.apply(current(&flow, Outcome::Uploaded(Err(server_error()))));
        let status = flow.status().to_string();
        let phase = flow.phase().clone();

        flow.apply(current(&flow, progress(55.0)));
        flow.apply(current(
            &flow,
            Outcome::Channel(ChannelEvent::Message(ProgressMessage::Completed {
                successes: 10,
                failures: 0,
                errors: None,
            })),
        ));

        assert_eq!(flow.status(), status);
        assert_eq!(flow.phase(), &phase);
    }

    #[test]
    fn test_channel_failure_does_not_fail_upload() {
        let mut flow = uploading_flow(10);
        flow.apply(current(
            &flow,
            Outcome::Channel(ChannelEvent::Closed(Some("connection refused".to_string()))),
        ));
        assert!(matches!(
            flow.phase(),
            Phase::Uploading {
                channel_open: false,
                ..
            }
        ));
        assert!(flow.is_loading());
        assert!(!flow.live_progress());

        flow.apply(current(&flow, Outcome::Uploaded(Ok(upload(10, 0)))));
        assert!(flow.result_visible());
    }

    #[test]
    fn test_reset_clears_everything_and_rotates_session() {
        let mut flow = uploading_flow(10);
        flow.apply(current(&flow, Outcome::Uploaded(Ok(upload(9, 1)))));
        let old_session = flow.session().cloned().unwrap();

        let commands = flow.reset();
        assert_eq!(commands, vec![Command::CloseChannel]);
        assert_eq!(flow.phase(), &Phase::Idle);
        assert!(flow.validation().is_none());
        assert!(flow.preview().is_none());
        assert!(flow.result().is_none());
        assert!(flow.session().is_none());
        assert!(flow.status().is_empty());

        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        assert_ne!(flow.session(), Some(&old_session));
    }

    #[test]
    fn test_responses_after_reset_are_discarded() {
        let mut flow = ImportFlow::new();
        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        let abandoned = flow.attempt();
        flow.reset();

        let commands = flow.apply(Stamped::new(abandoned, Outcome::Validated(Ok(report(true)))));
        assert!(commands.is_empty());
        assert_eq!(flow.phase(), &Phase::Idle);

        let mut flow = uploading_flow(10);
        let abandoned = flow.attempt();
        flow.reset();
        flow.apply(Stamped::new(abandoned, progress(70.0)));
        flow.apply(Stamped::new(abandoned, Outcome::Uploaded(Ok(upload(10, 0)))));
        assert_eq!(flow.phase(), &Phase::Idle);
        assert!(flow.status().is_empty());
    }

    #[test]
    fn test_new_selection_during_upload_closes_channel() {
        let mut flow = uploading_flow(10);
        let commands = flow.select_file(spreadsheet("nueva.xlsx")).unwrap();
        assert_eq!(commands.first(), Some(&Command::CloseChannel));
        assert!(matches!(commands.last(), Some(Command::Validate { .. })));
    }

    #[test]
    fn test_loading_and_result_are_never_both_visible() {
        let mut flow = ImportFlow::new();
        let check = |flow: &ImportFlow| assert!(!(flow.is_loading() && flow.result_visible()));

        flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        check(&flow);
        flow.apply(current(&flow, Outcome::Validated(Ok(report(true)))));
        check(&flow);
        flow.apply(current(&flow, Outcome::Previewed(Ok(preview(3)))));
        check(&flow);
        flow.request_import();
        flow.confirm_import();
        check(&flow);
        flow.apply(current(&flow, progress(33.0)));
        check(&flow);
        flow.apply(current(&flow, Outcome::Uploaded(Ok(upload(3, 0)))));
        check(&flow);
        flow.apply(current(&flow, progress(66.0)));
        check(&flow);
    }
}
