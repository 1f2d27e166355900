mod state;
mod ui;

use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use derivative::Derivative;
use eframe::{egui, App};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::api::{ApiResult, AssignmentState, FleetApi};
use crate::config::Config;
use crate::forms::{FormSchema, MechanicForm, VehicleForm};
use crate::import::{self, ImportDriver, ImportFlow};
pub use state::{Action, CrudEvent, DashboardState, Entity, PendingConfirmation, Tab};

/// Something the user clicked this frame, handled once rendering is done.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Refresh(Entity),
    SubmitVehicle,
    EditVehicle(i64),
    SubmitMechanic,
    EditMechanic(i64),
    SubmitAssignment,
    CancelEdit(Entity),
    AskDelete(Entity, i64),
    SetAssignmentState(i64, AssignmentState),
    Confirm,
    Dismiss,
    ChooseSpreadsheet,
    RequestImport,
    ConfirmImport,
    CancelImport,
    ResetImport,
    ListImported,
    AskClearImported,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct FleetDashboard {
    state: DashboardState,
    import: ImportFlow,
    backend: String,
    #[derivative(Debug = "ignore")]
    driver: ImportDriver,
    #[derivative(Debug = "ignore")]
    api: Arc<dyn FleetApi>,
    #[derivative(Debug = "ignore")]
    runtime: Handle,
    #[derivative(Debug = "ignore")]
    sender: Sender<CrudEvent>,
    #[derivative(Debug = "ignore")]
    receiver: Receiver<CrudEvent>,
}

impl FleetDashboard {
    pub fn new(_cc: &eframe::CreationContext<'_>, api: Arc<dyn FleetApi>, runtime: Handle, config: &Config) -> Self {
        info!(backend = %config.api_base_url, "initializing fleet dashboard");
        let mut dashboard = Self::with_api(api, runtime, config);
        for entity in [Entity::Vehicles, Entity::Mechanics, Entity::Assignments] {
            dashboard.refresh(entity);
        }
        dashboard
    }

    fn with_api(api: Arc<dyn FleetApi>, runtime: Handle, config: &Config) -> Self {
        let (sender, receiver) = mpsc::channel();
        let driver = ImportDriver::new(
            api.clone(),
            runtime.clone(),
            config.ws_base_url.clone(),
            config.progress_path.clone(),
        );
        Self {
            state: DashboardState::default(),
            import: ImportFlow::new(),
            backend: config.api_base_url.clone(),
            driver,
            api,
            runtime,
            sender,
            receiver,
        }
    }

    /// Runs `request` on the runtime and posts its result back as a `CrudEvent`.
    fn spawn<T, F>(&self, request: F, deliver: impl FnOnce(T) -> CrudEvent + Send + 'static)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let tx = self.sender.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(deliver(request.await));
        });
    }

    fn refresh(&mut self, entity: Entity) {
        debug!(?entity, "refreshing list");
        *self.state.loading_mut(entity) = true;
        let api = self.api.clone();
        match entity {
            Entity::Vehicles => self.spawn(async move { api.list_vehicles().await }, CrudEvent::Vehicles),
            Entity::Mechanics => self.spawn(async move { api.list_mechanics().await }, CrudEvent::Mechanics),
            Entity::Assignments => self.spawn(async move { api.list_assignments().await }, CrudEvent::Assignments),
        }
    }

    fn saved(entity: Entity, action: Action) -> impl FnOnce(ApiResult<()>) -> CrudEvent + Send + 'static {
        move |result| CrudEvent::Saved { entity, action, result }
    }

    fn alert(title: &str, description: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(description)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn submit_vehicle(&mut self) {
        let payload = match self.state.vehicle_form.to_payload() {
            Ok(payload) => payload,
            Err(e) => return Self::alert("Datos del vehículo incompletos", &e.to_string()),
        };
        let api = self.api.clone();
        match self.state.editing_vehicle {
            Some(id) => self.spawn(
                async move { api.update_vehicle(id, &payload).await.map(|_| ()) },
                Self::saved(Entity::Vehicles, Action::Update),
            ),
            None => self.spawn(
                async move { api.create_vehicle(&payload).await.map(|_| ()) },
                Self::saved(Entity::Vehicles, Action::Create),
            ),
        }
    }

    fn submit_mechanic(&mut self) {
        let payload = match self.state.mechanic_form.to_payload() {
            Ok(payload) => payload,
            Err(e) => return Self::alert("Datos del mecánico incompletos", &e.to_string()),
        };
        let api = self.api.clone();
        match self.state.editing_mechanic {
            Some(id) => self.spawn(
                async move { api.update_mechanic(id, &payload).await.map(|_| ()) },
                Self::saved(Entity::Mechanics, Action::Update),
            ),
            None => self.spawn(
                async move { api.create_mechanic(&payload).await.map(|_| ()) },
                Self::saved(Entity::Mechanics, Action::Create),
            ),
        }
    }

    fn submit_assignment(&mut self) {
        let payload = match self.state.assignment_form.to_payload() {
            Ok(payload) => payload,
            Err(e) => return Self::alert("Datos de la asignación incompletos", &e.to_string()),
        };
        let api = self.api.clone();
        self.spawn(
            async move { api.create_assignment(&payload).await.map(|_| ()) },
            Self::saved(Entity::Assignments, Action::Create),
        );
    }

    fn delete(&self, entity: Entity, id: i64) {
        info!(?entity, id, "deleting record");
        let api = self.api.clone();
        let deliver = Self::saved(entity, Action::Delete);
        match entity {
            Entity::Vehicles => self.spawn(async move { api.delete_vehicle(id).await }, deliver),
            Entity::Mechanics => self.spawn(async move { api.delete_mechanic(id).await }, deliver),
            Entity::Assignments => self.spawn(async move { api.delete_assignment(id).await }, deliver),
        }
    }

    fn set_assignment_state(&self, id: i64, state: AssignmentState) {
        let api = self.api.clone();
        self.spawn(async move { api.set_assignment_state(id, state).await }, move |result| {
            CrudEvent::StateChanged { id, state, result }
        });
    }

    fn choose_spreadsheet(&mut self) {
        let Some(path) = FileDialog::new().add_filter("Excel", &["xlsx", "xls"]).pick_file() else {
            return;
        };
        let selected = import::load(&path).and_then(|file| self.import.select_file(file));
        match selected {
            Ok(commands) => self.driver.execute(commands),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "spreadsheet rejected");
                Self::alert("Archivo no válido", &e.to_string());
            }
        }
    }

    fn handle(&mut self, action: UiAction) {
        match action {
            UiAction::Refresh(entity) => self.refresh(entity),
            UiAction::SubmitVehicle => self.submit_vehicle(),
            UiAction::EditVehicle(id) => {
                if let Some(vehicle) = self.state.vehicles.items.iter().find(|v| v.id == id) {
                    self.state.vehicle_form = VehicleForm::from_vehicle(vehicle);
                    self.state.editing_vehicle = Some(id);
                }
            }
            UiAction::SubmitMechanic => self.submit_mechanic(),
            UiAction::EditMechanic(id) => {
                if let Some(mechanic) = self.state.mechanics.items.iter().find(|m| m.id == id) {
                    self.state.mechanic_form = MechanicForm::from_mechanic(mechanic);
                    self.state.editing_mechanic = Some(id);
                }
            }
            UiAction::SubmitAssignment => self.submit_assignment(),
            UiAction::CancelEdit(entity) => self.state.reset_form(entity),
            UiAction::AskDelete(entity, id) => self.state.pending = Some(PendingConfirmation::Delete(entity, id)),
            UiAction::SetAssignmentState(id, state) => self.set_assignment_state(id, state),
            UiAction::Confirm => match self.state.pending.take() {
                Some(PendingConfirmation::Delete(entity, id)) => self.delete(entity, id),
                Some(PendingConfirmation::ClearImported) => {
                    let api = self.api.clone();
                    self.spawn(async move { api.clear_imported_vehicles().await }, CrudEvent::Cleared);
                }
                None => {}
            },
            UiAction::Dismiss => self.state.pending = None,
            UiAction::ChooseSpreadsheet => self.choose_spreadsheet(),
            UiAction::RequestImport => {
                let commands = self.import.request_import();
                self.driver.execute(commands);
            }
            UiAction::ConfirmImport => {
                let commands = self.import.confirm_import();
                self.driver.execute(commands);
            }
            UiAction::CancelImport => {
                let commands = self.import.cancel_import();
                self.driver.execute(commands);
            }
            UiAction::ResetImport => {
                let commands = self.import.reset();
                self.driver.execute(commands);
            }
            UiAction::ListImported => {
                let api = self.api.clone();
                self.spawn(async move { api.list_imported_vehicles().await }, CrudEvent::Imported);
            }
            UiAction::AskClearImported => self.state.pending = Some(PendingConfirmation::ClearImported),
        }
    }

    /// Drains finished requests and import outcomes into the screen state.
    pub fn update_state(&mut self, ctx: &egui::Context) {
        let mut had_updates = false;

        while let Ok(event) = self.receiver.try_recv() {
            had_updates = true;
            if let Some(entity) = self.state.apply(event) {
                self.refresh(entity);
            }
        }

        while let Some(stamped) = self.driver.poll() {
            had_updates = true;
            let finished_before = self.import.result_visible();
            let commands = self.import.apply(stamped);
            self.driver.execute(commands);
            if !finished_before && self.import.result_visible() {
                self.refresh(Entity::Vehicles);
            }
        }

        if had_updates {
            ctx.request_repaint();
        }
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

impl App for FleetDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        for action in self.render(ctx) {
            self.handle(action);
        }
    }
}
