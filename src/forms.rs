//! Text-field buffers behind the CRUD screens.
//!
//! Each form converts its raw input into the request body and runs that
//! body's `validator` schema, so every screen checks required fields the same
//! way before anything is sent.

use validator::Validate;

use crate::api::{AssignmentState, Mechanic, NewAssignment, NewMechanic, NewVehicle, Vehicle};
use crate::error::FormError;

fn optional_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<Option<T>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| FormError::InvalidNumber { field })
}

fn required_number<T: std::str::FromStr + Default>(field: &'static str, raw: &str) -> Result<T, FormError> {
    Ok(optional_number(field, raw)?.unwrap_or_default())
}

/// Parse-then-validate, shared by every form.
pub trait FormSchema {
    type Payload: Validate;

    fn parse(&self) -> Result<Self::Payload, FormError>;

    fn to_payload(&self) -> Result<Self::Payload, FormError> {
        let payload = self.parse()?;
        payload.validate()?;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleForm {
    pub marca: String,
    pub modelo: String,
    pub anio: String,
    pub kilometraje: String,
    pub tipo_combustible: String,
    pub caballos: String,
    pub torque: String,
    pub segmento: String,
}

impl VehicleForm {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            marca: vehicle.marca.clone(),
            modelo: vehicle.modelo.clone(),
            anio: vehicle.anio.map(|a| a.to_string()).unwrap_or_default(),
            kilometraje: text(&vehicle.kilometraje),
            tipo_combustible: text(&vehicle.tipo_combustible),
            caballos: text(&vehicle.caballos),
            torque: text(&vehicle.torque),
            segmento: text(&vehicle.segmento),
        }
    }
}

impl FormSchema for VehicleForm {
    type Payload = NewVehicle;

    fn parse(&self) -> Result<NewVehicle, FormError> {
        Ok(NewVehicle {
            marca: self.marca.trim().to_string(),
            modelo: self.modelo.trim().to_string(),
            anio: optional_number("anio", &self.anio)?,
            kilometraje: self.kilometraje.trim().to_string(),
            tipo_combustible: self.tipo_combustible.trim().to_string(),
            caballos: self.caballos.trim().to_string(),
            torque: self.torque.trim().to_string(),
            segmento: self.segmento.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MechanicForm {
    pub nombre: String,
    pub apellido: String,
}

impl MechanicForm {
    pub fn from_mechanic(mechanic: &Mechanic) -> Self {
        Self {
            nombre: mechanic.nombre.clone(),
            apellido: mechanic.apellido.clone(),
        }
    }
}

impl FormSchema for MechanicForm {
    type Payload = NewMechanic;

    fn parse(&self) -> Result<NewMechanic, FormError> {
        Ok(NewMechanic {
            nombre: self.nombre.trim().to_string(),
            apellido: self.apellido.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentForm {
    pub id_mecanico: String,
    pub id_vehiculo: String,
    pub descripcion: String,
    pub estado: AssignmentState,
}

impl FormSchema for AssignmentForm {
    type Payload = NewAssignment;

    fn parse(&self) -> Result<NewAssignment, FormError> {
        Ok(NewAssignment {
            id_mecanico: required_number("id_mecanico", &self.id_mecanico)?,
            id_vehiculo: required_number("id_vehiculo", &self.id_vehiculo)?,
            descripcion: self.descripcion.trim().to_string(),
            estado: self.estado,
        })
    }
}
