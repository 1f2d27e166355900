//! REST client for the fleet backend.
//!
//! `FleetApi` is the seam the screens and the import driver talk to; the
//! reqwest implementation lives in `http`, an in-memory one backs the tests.

mod http;
mod types;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::import::SessionId;

pub use http::HttpFleetApi;
pub use types::{
    Assignment, AssignmentState, ClearResponse, ColumnValidation, ImportedVehicles, Mechanic, NewAssignment,
    NewMechanic, NewVehicle, PreviewData, SpreadsheetFile, UploadResult, ValidationReport, Vehicle,
};

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn list_vehicles(&self) -> ApiResult<Vec<Vehicle>>;
    async fn create_vehicle(&self, vehicle: &NewVehicle) -> ApiResult<Vehicle>;
    async fn update_vehicle(&self, id: i64, vehicle: &NewVehicle) -> ApiResult<Vehicle>;
    async fn delete_vehicle(&self, id: i64) -> ApiResult<()>;

    async fn list_mechanics(&self) -> ApiResult<Vec<Mechanic>>;
    async fn create_mechanic(&self, mechanic: &NewMechanic) -> ApiResult<Mechanic>;
    async fn update_mechanic(&self, id: i64, mechanic: &NewMechanic) -> ApiResult<Mechanic>;
    async fn delete_mechanic(&self, id: i64) -> ApiResult<()>;

    async fn list_assignments(&self) -> ApiResult<Vec<Assignment>>;
    async fn create_assignment(&self, assignment: &NewAssignment) -> ApiResult<Assignment>;
    async fn set_assignment_state(&self, id: i64, state: AssignmentState) -> ApiResult<()>;
    async fn delete_assignment(&self, id: i64) -> ApiResult<()>;

    /// Column-schema check of a spreadsheet.
    async fn validate_spreadsheet(&self, file: &SpreadsheetFile) -> ApiResult<ValidationReport>;
    /// First rows, column names and record count of a spreadsheet.
    async fn preview_spreadsheet(&self, file: &SpreadsheetFile) -> ApiResult<PreviewData>;
    /// Imports every row; progress is pushed separately on the channel keyed by `session`.
    async fn import_spreadsheet(&self, file: &SpreadsheetFile, session: &SessionId) -> ApiResult<UploadResult>;
    async fn list_imported_vehicles(&self) -> ApiResult<ImportedVehicles>;
    async fn clear_imported_vehicles(&self) -> ApiResult<ClearResponse>;
}
