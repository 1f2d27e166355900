use derivative::Derivative;
use tracing::{info, warn};

use crate::api::{ApiResult, Assignment, AssignmentState, ClearResponse, ImportedVehicles, Mechanic, Vehicle};
use crate::forms::{AssignmentForm, MechanicForm, VehicleForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Vehicles,
    Mechanics,
    Assignments,
    BulkImport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Vehicles,
    Mechanics,
    Assignments,
}

impl Entity {
    pub fn noun(&self) -> &'static str {
        match self {
            Entity::Vehicles => "el vehículo",
            Entity::Mechanics => "el mecánico",
            Entity::Assignments => "la asignación",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Create => "crear",
            Action::Update => "actualizar",
            Action::Delete => "eliminar",
        }
    }

    fn done(&self) -> &'static str {
        match self {
            Action::Create => "creado",
            Action::Update => "actualizado",
            Action::Delete => "eliminado",
        }
    }
}

/// Outcome of a CRUD request, delivered back to the UI thread.
#[derive(Debug)]
pub enum CrudEvent {
    Vehicles(ApiResult<Vec<Vehicle>>),
    Mechanics(ApiResult<Vec<Mechanic>>),
    Assignments(ApiResult<Vec<Assignment>>),
    Saved {
        entity: Entity,
        action: Action,
        result: ApiResult<()>,
    },
    StateChanged {
        id: i64,
        state: AssignmentState,
        result: ApiResult<()>,
    },
    Imported(ApiResult<ImportedVehicles>),
    Cleared(ApiResult<ClearResponse>),
}

#[derive(Derivative)]
#[derivative(Debug, Default(bound = ""))]
pub struct ListState<T> {
    #[derivative(Debug = "ignore")]
    pub items: Vec<T>,
    pub loading: bool,
}

impl<T> ListState<T> {
    fn finish(&mut self, result: ApiResult<Vec<T>>, what: &str, error: &mut Option<String>) {
        self.loading = false;
        match result {
            Ok(items) => {
                info!(count = items.len(), "{} loaded", what);
                self.items = items;
            }
            Err(e) => {
                warn!(error = %e, "failed to load {}", what);
                *error = Some(e.user_message(&format!(
                    "Error al cargar {}. Verifique que el servidor esté funcionando",
                    what
                )));
            }
        }
    }
}

/// Deletion or table wipe waiting for a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmation {
    Delete(Entity, i64),
    ClearImported,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub tab: Tab,
    pub vehicles: ListState<Vehicle>,
    pub mechanics: ListState<Mechanic>,
    pub assignments: ListState<Assignment>,
    pub vehicle_form: VehicleForm,
    pub editing_vehicle: Option<i64>,
    pub mechanic_form: MechanicForm,
    pub editing_mechanic: Option<i64>,
    pub assignment_form: AssignmentForm,
    pub pending: Option<PendingConfirmation>,
    pub imported: Option<ImportedVehicles>,
    pub notice: Option<String>,
    pub error_message: Option<String>,
    pub show_details: bool,
}

impl DashboardState {
    pub fn loading_mut(&mut self, entity: Entity) -> &mut bool {
        match entity {
            Entity::Vehicles => &mut self.vehicles.loading,
            Entity::Mechanics => &mut self.mechanics.loading,
            Entity::Assignments => &mut self.assignments.loading,
        }
    }

    pub fn clear_messages(&mut self) {
        self.notice = None;
        self.error_message = None;
    }

    /// Applies a finished request; returns the list that must be fetched again.
    pub fn apply(&mut self, event: CrudEvent) -> Option<Entity> {
        match event {
            CrudEvent::Vehicles(result) => {
                self.vehicles.finish(result, "vehículos", &mut self.error_message);
                None
            }
            CrudEvent::Mechanics(result) => {
                self.mechanics.finish(result, "mecánicos", &mut self.error_message);
                None
            }
            CrudEvent::Assignments(result) => {
                self.assignments
                    .finish(result, "asignaciones", &mut self.error_message);
                None
            }
            CrudEvent::Saved {
                entity,
                action,
                result,
            } => match result {
                Ok(()) => {
                    info!(?entity, ?action, "change saved");
                    self.notice = Some(format!("Registro {} correctamente", action.done()));
                    if action != Action::Delete {
                        self.reset_form(entity);
                    }
                    Some(entity)
                }
                Err(e) => {
                    warn!(?entity, ?action, error = %e, "change rejected");
                    self.error_message =
                        Some(e.user_message(&format!("Error al {} {}", action.verb(), entity.noun())));
                    None
                }
            },
            CrudEvent::StateChanged { id, state, result } => {
                match result {
                    Ok(()) => {
                        if let Some(assignment) = self.assignments.items.iter_mut().find(|a| a.id == id) {
                            assignment.estado = state;
                        }
                        self.notice = Some(format!("Asignación {} ahora está {}", id, state));
                    }
                    Err(e) => {
                        warn!(id, %state, error = %e, "state change rejected");
                        self.error_message = Some(e.user_message("Error al actualizar el estado"));
                    }
                }
                None
            }
            CrudEvent::Imported(result) => {
                match result {
                    Ok(imported) => self.imported = Some(imported),
                    Err(e) => self.error_message = Some(e.user_message("Error al listar los vehículos cargados")),
                }
                None
            }
            CrudEvent::Cleared(result) => match result {
                Ok(response) => {
                    self.notice = Some(response.mensaje);
                    self.imported = None;
                    Some(Entity::Vehicles)
                }
                Err(e) => {
                    self.error_message = Some(e.user_message("Error al vaciar la tabla"));
                    None
                }
            },
        }
    }

    pub fn reset_form(&mut self, entity: Entity) {
        match entity {
            Entity::Vehicles => {
                self.vehicle_form = VehicleForm::default();
                self.editing_vehicle = None;
            }
            Entity::Mechanics => {
                self.mechanic_form = MechanicForm::default();
                self.editing_mechanic = None;
            }
            Entity::Assignments => self.assignment_form = AssignmentForm::default(),
        }
    }
}
