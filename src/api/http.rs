use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::StatePatch;
use super::*;

/// `FleetApi` over HTTP.
///
/// Collection endpoints are addressed with a trailing slash, item endpoints
/// without one.
#[derive(Clone)]
pub struct HttpFleetApi {
    client: Client,
    base_url: String,
}

impl HttpFleetApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        if status.is_success() {
            debug!(%status, %url, "request succeeded");
            Ok(body)
        } else {
            warn!(%status, %url, "request rejected by server");
            Err(ApiError::from_response_body(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
        let body = Self::send(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn spreadsheet_form(file: &SpreadsheetFile) -> Form {
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        Form::new().part("file", part)
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn list_vehicles(&self) -> ApiResult<Vec<Vehicle>> {
        Self::send_json(self.client.get(self.url("/vehiculos/"))).await
    }

    async fn create_vehicle(&self, vehicle: &NewVehicle) -> ApiResult<Vehicle> {
        debug!(marca = %vehicle.marca, modelo = %vehicle.modelo, "creating vehicle");
        Self::send_json(self.client.post(self.url("/vehiculos/")).json(vehicle)).await
    }

    async fn update_vehicle(&self, id: i64, vehicle: &NewVehicle) -> ApiResult<Vehicle> {
        let url = self.url(&format!("/vehiculos/{}", id));
        Self::send_json(self.client.put(url).json(vehicle)).await
    }

    async fn delete_vehicle(&self, id: i64) -> ApiResult<()> {
        let url = self.url(&format!("/vehiculos/{}", id));
        Self::send(self.client.delete(url)).await.map(|_| ())
    }

    async fn list_mechanics(&self) -> ApiResult<Vec<Mechanic>> {
        Self::send_json(self.client.get(self.url("/mecanicos/"))).await
    }

    async fn create_mechanic(&self, mechanic: &NewMechanic) -> ApiResult<Mechanic> {
        Self::send_json(self.client.post(self.url("/mecanicos/")).json(mechanic)).await
    }

    async fn update_mechanic(&self, id: i64, mechanic: &NewMechanic) -> ApiResult<Mechanic> {
        let url = self.url(&format!("/mecanicos/{}", id));
        Self::send_json(self.client.put(url).json(mechanic)).await
    }

    async fn delete_mechanic(&self, id: i64) -> ApiResult<()> {
        let url = self.url(&format!("/mecanicos/{}", id));
        Self::send(self.client.delete(url)).await.map(|_| ())
    }

    async fn list_assignments(&self) -> ApiResult<Vec<Assignment>> {
        Self::send_json(self.client.get(self.url("/asignaciones/"))).await
    }

    async fn create_assignment(&self, assignment: &NewAssignment) -> ApiResult<Assignment> {
        Self::send_json(self.client.post(self.url("/asignaciones/")).json(assignment)).await
    }

    async fn set_assignment_state(&self, id: i64, state: AssignmentState) -> ApiResult<()> {
        debug!(id, %state, "patching assignment state");
        let url = self.url(&format!("/asignaciones/{}", id));
        Self::send(self.client.patch(url).json(&StatePatch { estado: state }))
            .await
            .map(|_| ())
    }

    async fn delete_assignment(&self, id: i64) -> ApiResult<()> {
        let url = self.url(&format!("/asignaciones/{}", id));
        Self::send(self.client.delete(url)).await.map(|_| ())
    }

    async fn validate_spreadsheet(&self, file: &SpreadsheetFile) -> ApiResult<ValidationReport> {
        debug!(name = %file.name, "validating spreadsheet");
        let request = self
            .client
            .post(self.url("/excel/validar"))
            .multipart(Self::spreadsheet_form(file));
        Self::send_json(request).await
    }

    async fn preview_spreadsheet(&self, file: &SpreadsheetFile) -> ApiResult<PreviewData> {
        debug!(name = %file.name, "requesting spreadsheet preview");
        let request = self
            .client
            .post(self.url("/excel/preview"))
            .multipart(Self::spreadsheet_form(file));
        Self::send_json(request).await
    }

    async fn import_spreadsheet(&self, file: &SpreadsheetFile, session: &SessionId) -> ApiResult<UploadResult> {
        debug!(name = %file.name, %session, "importing spreadsheet");
        let form = Self::spreadsheet_form(file).text("sessionId", session.to_string());
        let request = self.client.post(self.url("/excel/cargar_directo")).multipart(form);
        Self::send_json(request).await
    }

    async fn list_imported_vehicles(&self) -> ApiResult<ImportedVehicles> {
        Self::send_json(self.client.get(self.url("/excel/listar"))).await
    }

    async fn clear_imported_vehicles(&self) -> ApiResult<ClearResponse> {
        Self::send_json(self.client.delete(self.url("/excel/limpiar"))).await
    }
}
