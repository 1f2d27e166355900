use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::channel::{progress_url, ProgressChannel};
use super::flow::{Command, Outcome, Stamped};
use crate::api::FleetApi;

/// Runs the reducer's commands on the tokio runtime and hands the outcomes
/// back to the UI thread.
pub struct ImportDriver {
    api: Arc<dyn FleetApi>,
    runtime: Handle,
    ws_base_url: String,
    progress_path: String,
    sender: Sender<Stamped>,
    receiver: Receiver<Stamped>,
    channel: Option<ProgressChannel>,
}

impl ImportDriver {
    pub fn new(api: Arc<dyn FleetApi>, runtime: Handle, ws_base_url: String, progress_path: String) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            api,
            runtime,
            ws_base_url,
            progress_path,
            sender,
            receiver,
            channel: None,
        }
    }

    pub fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }

    /// Next outcome that has arrived, without blocking.
    pub fn poll(&self) -> Option<Stamped> {
        self.receiver.try_recv().ok()
    }

    #[cfg(test)]
    pub fn channel_open(&self) -> bool {
        self.channel.is_some()
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Validate { attempt, file } => {
                let api = self.api.clone();
                let tx = self.sender.clone();
                self.runtime.spawn(async move {
                    let result = api.validate_spreadsheet(&file).await;
                    let _ = tx.send(Stamped::new(attempt, Outcome::Validated(result)));
                });
            }
            Command::Preview { attempt, file } => {
                let api = self.api.clone();
                let tx = self.sender.clone();
                self.runtime.spawn(async move {
                    let result = api.preview_spreadsheet(&file).await;
                    let _ = tx.send(Stamped::new(attempt, Outcome::Previewed(result)));
                });
            }
            Command::OpenChannel { attempt, session } => {
                if let Some(previous) = self.channel.take() {
                    previous.close();
                }
                let url = progress_url(&self.ws_base_url, &self.progress_path, &session);
                self.channel = Some(ProgressChannel::open(
                    &self.runtime,
                    url,
                    session,
                    attempt,
                    self.sender.clone(),
                ));
            }
            Command::Upload {
                attempt,
                file,
                session,
            } => {
                let api = self.api.clone();
                let tx = self.sender.clone();
                self.runtime.spawn(async move {
                    let result = api.import_spreadsheet(&file, &session).await;
                    let _ = tx.send(Stamped::new(attempt, Outcome::Uploaded(result)));
                });
            }
            Command::CloseChannel => {
                if let Some(channel) = self.channel.take() {
                    debug!(session = %channel.session(), "closing channel on request");
                    channel.close();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockFleetApi;
    use crate::api::{PreviewData, SpreadsheetFile, UploadResult, ValidationReport};
    use crate::import::flow::{ChannelEvent, ImportFlow, Phase};
    use std::time::Duration;

    fn driver(api: Arc<MockFleetApi>) -> ImportDriver {
        // Nothing listens on port 1, so the progress channel fails to connect.
        ImportDriver::new(
            api,
            Handle::current(),
            "ws://127.0.0.1:1".to_string(),
            "/excel/ws".to_string(),
        )
    }

    fn spreadsheet(name: &str) -> SpreadsheetFile {
        SpreadsheetFile {
            name: name.to_string(),
            bytes: b"PK".to_vec(),
        }
    }

    async fn next(driver: &ImportDriver) -> Stamped {
        for _ in 0..500 {
            if let Some(stamped) = driver.poll() {
                return stamped;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no outcome arrived");
    }

    /// Feeds outcomes into the flow until `done` holds.
    async fn pump_until(flow: &mut ImportFlow, driver: &mut ImportDriver, done: impl Fn(&ImportFlow) -> bool) {
        while !done(flow) {
            let stamped = next(driver).await;
            let commands = flow.apply(stamped);
            driver.execute(commands);
        }
    }

    #[tokio::test]
    async fn test_full_import_round() {
        let api = Arc::new(MockFleetApi::new());
        *api.validation.lock().unwrap() = Some(ValidationReport {
            valid: true,
            columns: Vec::new(),
            total_columnas: 8,
            total_filas: 10,
        });
        *api.preview.lock().unwrap() = Some(PreviewData {
            columns: vec!["marca".to_string()],
            rows: Vec::new(),
            total: 10,
        });
        *api.upload.lock().unwrap() = Some(UploadResult {
            total: 10,
            successes: 8,
            failures: 2,
            errors: vec!["Fila 4: Marca o modelo faltante".to_string()],
        });

        let mut flow = ImportFlow::new();
        let mut driver = driver(api.clone());

        let commands = flow.select_file(spreadsheet("flota.xlsx")).unwrap();
        driver.execute(commands);
        pump_until(&mut flow, &mut driver, |f| f.preview_visible()).await;
        assert_eq!(api.calls("validate_spreadsheet"), 1);
        assert_eq!(api.calls("preview_spreadsheet"), 1);

        flow.request_import();
        let commands = flow.confirm_import();
        driver.execute(commands);
        assert!(driver.channel_open());

        pump_until(&mut flow, &mut driver, |f| !f.is_loading()).await;
        assert!(flow.result_visible());
        assert_eq!(flow.status(), "Completado (8 exitosos, 2 fallidos)");
        assert!(!driver.channel_open());

        let session = flow.session().unwrap().to_string();
        assert_eq!(api.sessions_seen.lock().unwrap().as_slice(), &[session]);
    }

    #[tokio::test]
    async fn test_invalid_spreadsheet_issues_no_preview_request() {
        let api = Arc::new(MockFleetApi::new());
        *api.validation.lock().unwrap() = Some(ValidationReport {
            valid: false,
            columns: Vec::new(),
            total_columnas: 3,
            total_filas: 10,
        });

        let mut flow = ImportFlow::new();
        let mut driver = driver(api.clone());
        driver.execute(flow.select_file(spreadsheet("flota.xls")).unwrap());
        pump_until(&mut flow, &mut driver, |f| !f.is_loading()).await;

        assert!(matches!(flow.phase(), Phase::Invalid { .. }));
        assert_eq!(api.calls("preview_spreadsheet"), 0);
    }

    #[tokio::test]
    async fn test_rejected_extension_issues_no_request() {
        let api = Arc::new(MockFleetApi::new());
        let mut flow = ImportFlow::new();
        let _driver = driver(api.clone());

        assert!(flow.select_file(spreadsheet("flota.csv")).is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_channel_reports_closed() {
        let api = Arc::new(MockFleetApi::new());
        let mut driver = driver(api);
        let session = crate::import::SessionId::generate();

        driver.execute(vec![Command::OpenChannel { attempt: 7, session }]);
        let stamped = next(&driver).await;

        assert_eq!(stamped.attempt, 7);
        assert!(matches!(stamped.outcome, Outcome::Channel(ChannelEvent::Closed(Some(_)))));
    }
}
