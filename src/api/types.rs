use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::Validate;

/// Accepts a JSON string or number for columns the backend stores as text.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub marca: String,
    pub modelo: String,
    #[serde(default)]
    pub anio: Option<i32>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub kilometraje: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub tipo_combustible: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub caballos: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub torque: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub segmento: Option<String>,
}

/// Body of a vehicle create/update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewVehicle {
    #[validate(length(min = 1, message = "campo requerido"))]
    pub marca: String,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub modelo: String,
    #[validate(range(min = 1886, max = 2100, message = "año fuera de rango"))]
    pub anio: Option<i32>,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub kilometraje: String,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub tipo_combustible: String,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub caballos: String,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub torque: String,
    #[validate(length(min = 1, message = "campo requerido"))]
    pub segmento: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mechanic {
    pub id: i64,
    pub nombre: String,
    pub apellido: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewMechanic {
    #[validate(length(min = 1, max = 50, message = "campo requerido (máx. 50)"))]
    pub nombre: String,
    #[validate(length(min = 1, max = 50, message = "campo requerido (máx. 50)"))]
    pub apellido: String,
}

/// Work-order state as the backend presents it to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentState {
    #[serde(rename = "Pendiente", alias = "pendiente")]
    Pending,
    #[serde(rename = "En Proceso", alias = "en_proceso")]
    InProgress,
    #[serde(rename = "Completado", alias = "completado")]
    Completed,
    #[serde(other, skip_serializing)]
    Unknown,
}

impl AssignmentState {
    pub const SELECTABLE: [AssignmentState; 3] = [
        AssignmentState::Pending,
        AssignmentState::InProgress,
        AssignmentState::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentState::Pending => "Pendiente",
            AssignmentState::InProgress => "En Proceso",
            AssignmentState::Completed => "Completado",
            AssignmentState::Unknown => "Desconocido",
        }
    }
}

impl Default for AssignmentState {
    fn default() -> Self {
        AssignmentState::Pending
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub id_mecanico: i64,
    pub id_vehiculo: i64,
    #[serde(default)]
    pub vehiculo: String,
    #[serde(default)]
    pub mecanico: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub fecha_asignacion: Option<String>,
    pub estado: AssignmentState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewAssignment {
    #[validate(range(min = 1, message = "seleccione un mecánico"))]
    pub id_mecanico: i64,
    #[validate(range(min = 1, message = "seleccione un vehículo"))]
    pub id_vehiculo: i64,
    #[validate(length(max = 255, message = "máximo 255 caracteres"))]
    pub descripcion: String,
    pub estado: AssignmentState,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatePatch {
    pub estado: AssignmentState,
}

/// Backend verdict for one expected (or extra) spreadsheet column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValidation {
    #[serde(rename = "columna")]
    pub column: String,
    #[serde(rename = "requerida")]
    pub required: bool,
    #[serde(rename = "valida")]
    pub valid: bool,
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(rename = "valido")]
    pub valid: bool,
    #[serde(rename = "validaciones", default)]
    pub columns: Vec<ColumnValidation>,
    #[serde(default)]
    pub total_columnas: usize,
    #[serde(default)]
    pub total_filas: usize,
}

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    #[serde(rename = "columnas")]
    pub columns: Vec<String>,
    #[serde(rename = "filas", default)]
    pub rows: Vec<Row>,
    #[serde(rename = "total_registros")]
    pub total: usize,
}

impl PreviewData {
    /// Cell text for display; missing and null cells render empty.
    pub fn cell(&self, row: usize, column: &str) -> String {
        match self.rows.get(row).and_then(|r| r.get(column)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub total: usize,
    #[serde(rename = "exitosos")]
    pub successes: usize,
    #[serde(rename = "fallidos")]
    pub failures: usize,
    #[serde(rename = "errores")]
    pub errors: Vec<String>,
}

impl<'de> Deserialize<'de> for UploadResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The direct-import endpoint omits `total`.
        #[derive(Deserialize)]
        struct Raw {
            total: Option<usize>,
            #[serde(default)]
            exitosos: usize,
            #[serde(default)]
            fallidos: usize,
            #[serde(default)]
            errores: Vec<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(UploadResult {
            total: raw.total.unwrap_or(raw.exitosos + raw.fallidos),
            successes: raw.exitosos,
            failures: raw.fallidos,
            errors: raw.errores,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedVehicles {
    pub total: usize,
    #[serde(default)]
    pub vehiculos: Vec<Vehicle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub mensaje: String,
}

/// A spreadsheet held in memory, ready to be sent as a multipart part.
#[derive(Clone, PartialEq, Eq)]
pub struct SpreadsheetFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SpreadsheetFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpreadsheetFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vehicle_accepts_numeric_text_columns() {
        let vehicle: Vehicle = serde_json::from_value(json!({
            "id": 3,
            "marca": "Toyota",
            "modelo": "Hilux",
            "anio": 2020,
            "kilometraje": 45000,
            "tipo_combustible": "Diesel",
            "caballos": "150",
            "torque": null,
            "segmento": "Pickup"
        }))
        .unwrap();

        assert_eq!(vehicle.anio, Some(2020));
        assert_eq!(vehicle.kilometraje.as_deref(), Some("45000"));
        assert_eq!(vehicle.caballos.as_deref(), Some("150"));
        assert_eq!(vehicle.torque, None);
    }

    #[test]
    fn test_assignment_state_wire_names() {
        let state: AssignmentState = serde_json::from_value(json!("En Proceso")).unwrap();
        assert_eq!(state, AssignmentState::InProgress);
        let state: AssignmentState = serde_json::from_value(json!("completado")).unwrap();
        assert_eq!(state, AssignmentState::Completed);
        let state: AssignmentState = serde_json::from_value(json!("archivado")).unwrap();
        assert_eq!(state, AssignmentState::Unknown);

        let patch = serde_json::to_value(StatePatch {
            estado: AssignmentState::InProgress,
        })
        .unwrap();
        assert_eq!(patch, json!({ "estado": "En Proceso" }));
    }

    #[test]
    fn test_upload_result_without_total() {
        let result: UploadResult = serde_json::from_value(json!({
            "mensaje": "✅ 8 registros guardados correctamente.",
            "exitosos": 8,
            "fallidos": 2,
            "errores": ["fila 3", "fila 9"]
        }))
        .unwrap();

        assert_eq!(result.total, 10);
        assert_eq!(result.successes, 8);
        assert_eq!(result.failures, 2);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_validation_report_decodes_column_verdicts() {
        let report: ValidationReport = serde_json::from_value(json!({
            "valido": false,
            "validaciones": [
                {"columna": "marca", "requerida": true, "valida": true, "mensaje": "Columna encontrada ✓"},
                {"columna": "torque", "requerida": true, "valida": false}
            ],
            "total_columnas": 7,
            "total_filas": 12
        }))
        .unwrap();

        assert!(!report.valid);
        assert_eq!(report.columns[1].column, "torque");
        assert!(!report.columns[1].valid);
        assert_eq!(report.columns[1].message, None);
        assert_eq!(report.total_filas, 12);
    }

    #[test]
    fn test_preview_cell_rendering() {
        let preview: PreviewData = serde_json::from_value(json!({
            "columnas": ["marca", "anio", "torque"],
            "filas": [{"marca": "Kia", "anio": 2019, "torque": null}],
            "total_registros": 40
        }))
        .unwrap();

        assert_eq!(preview.cell(0, "marca"), "Kia");
        assert_eq!(preview.cell(0, "anio"), "2019");
        assert_eq!(preview.cell(0, "torque"), "");
        assert_eq!(preview.cell(5, "marca"), "");
    }
}
