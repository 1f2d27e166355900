use eframe::egui::{self, Align2, Color32, RichText};

use super::{Entity, FleetDashboard, PendingConfirmation, Tab, UiAction};
use crate::api::{AssignmentState, ColumnValidation};
use crate::import::Phase;
use crate::utils::file_size::format_size;

const ACCENT: Color32 = Color32::from_rgb(52, 120, 246);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const FAILURE: Color32 = Color32::from_rgb(220, 50, 50);

fn field(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.label(label);
    ui.add(egui::TextEdit::singleline(value).desired_width(160.0));
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn headers(ui: &mut egui::Ui, names: &[&str]) {
    for name in names {
        ui.label(RichText::new(*name).strong());
    }
    ui.end_row();
}

fn form_buttons(ui: &mut egui::Ui, editing: bool, submit: UiAction, entity: Entity, actions: &mut Vec<UiAction>) {
    ui.add_space(6.0);
    ui.horizontal(|ui| {
        let label = if editing { "💾 Guardar cambios" } else { "➕ Agregar" };
        if ui.button(label).clicked() {
            actions.push(submit);
        }
        if editing && ui.button("Cancelar").clicked() {
            actions.push(UiAction::CancelEdit(entity));
        }
    });
}

fn list_header(ui: &mut egui::Ui, count: usize, loading: bool, entity: Entity, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(format!("{} registros", count)).strong());
        if ui.button("🔄 Recargar").clicked() {
            actions.push(UiAction::Refresh(entity));
        }
        if loading {
            ui.spinner();
        }
    });
    ui.add_space(4.0);
}

fn row_buttons(ui: &mut egui::Ui, edit: Option<UiAction>, entity: Entity, id: i64, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        if let Some(edit) = edit {
            if ui.small_button("✏").on_hover_text("Editar").clicked() {
                actions.push(edit);
            }
        }
        if ui.small_button("🗑").on_hover_text("Eliminar").clicked() {
            actions.push(UiAction::AskDelete(entity, id));
        }
    });
}

fn column_row(ui: &mut egui::Ui, column: &ColumnValidation) {
    ui.label(column.column.as_str());
    ui.label(if column.required { "Sí" } else { "No" });
    if column.valid {
        ui.colored_label(SUCCESS, "✓");
    } else {
        ui.colored_label(FAILURE, "✗");
    }
    ui.label(column.message.as_deref().unwrap_or(""));
    ui.end_row();
}

impl FleetDashboard {
    /// Draws the whole window and returns what the user asked for this frame.
    pub fn render(&mut self, ctx: &egui::Context) -> Vec<UiAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Gestión de Flota");
                ui.add_space(20.0);
                ui.selectable_value(&mut self.state.tab, Tab::Vehicles, "🚗 Vehículos");
                ui.selectable_value(&mut self.state.tab, Tab::Mechanics, "🔧 Mecánicos");
                ui.selectable_value(&mut self.state.tab, Tab::Assignments, "📋 Asignaciones");
                ui.selectable_value(&mut self.state.tab, Tab::BulkImport, "📤 Carga Excel");
            });
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| self.render_footer(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.state.tab {
                Tab::Vehicles => self.render_vehicles(ui, &mut actions),
                Tab::Mechanics => self.render_mechanics(ui, &mut actions),
                Tab::Assignments => self.render_assignments(ui, &mut actions),
                Tab::BulkImport => self.render_import(ui, &mut actions),
            });
        });

        self.render_confirmation(ctx, &mut actions);
        actions
    }

    fn render_footer(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("Servidor: {}", self.backend))
                    .color(ui.visuals().text_color().gamma_multiply(0.7)),
            );
            if let Some(notice) = &self.state.notice {
                ui.separator();
                ui.colored_label(SUCCESS, notice.as_str());
            }
            if let Some(error) = &self.state.error_message {
                ui.separator();
                ui.colored_label(FAILURE, error.as_str());
            }
            if (self.state.notice.is_some() || self.state.error_message.is_some()) && ui.small_button("✖").clicked() {
                self.state.clear_messages();
            }
        });
        ui.add_space(4.0);
    }

    fn render_vehicles(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Vehículos");
        ui.add_space(8.0);

        let editing = self.state.editing_vehicle.is_some();
        ui.group(|ui| {
            ui.label(RichText::new(if editing { "Editar vehículo" } else { "Nuevo vehículo" }).strong());
            let form = &mut self.state.vehicle_form;
            egui::Grid::new("vehicle_form")
                .num_columns(4)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    field(ui, "Marca", &mut form.marca);
                    field(ui, "Modelo", &mut form.modelo);
                    ui.end_row();
                    field(ui, "Año", &mut form.anio);
                    field(ui, "Kilometraje", &mut form.kilometraje);
                    ui.end_row();
                    field(ui, "Combustible", &mut form.tipo_combustible);
                    field(ui, "Caballos", &mut form.caballos);
                    ui.end_row();
                    field(ui, "Torque", &mut form.torque);
                    field(ui, "Segmento", &mut form.segmento);
                    ui.end_row();
                });
            form_buttons(ui, editing, UiAction::SubmitVehicle, Entity::Vehicles, actions);
        });

        ui.add_space(12.0);
        let list = &self.state.vehicles;
        list_header(ui, list.items.len(), list.loading, Entity::Vehicles, actions);
        if list.items.is_empty() {
            ui.label("No hay vehículos registrados");
            return;
        }
        egui::Grid::new("vehicle_list").striped(true).num_columns(10).show(ui, |ui| {
            headers(
                ui,
                &["ID", "Marca", "Modelo", "Año", "Kilometraje", "Combustible", "Caballos", "Torque", "Segmento", ""],
            );
            for vehicle in &list.items {
                ui.label(vehicle.id.to_string());
                ui.label(vehicle.marca.as_str());
                ui.label(vehicle.modelo.as_str());
                ui.label(vehicle.anio.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()));
                ui.label(text(&vehicle.kilometraje));
                ui.label(text(&vehicle.tipo_combustible));
                ui.label(text(&vehicle.caballos));
                ui.label(text(&vehicle.torque));
                ui.label(text(&vehicle.segmento));
                row_buttons(ui, Some(UiAction::EditVehicle(vehicle.id)), Entity::Vehicles, vehicle.id, actions);
                ui.end_row();
            }
        });
    }

    fn render_mechanics(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Mecánicos");
        ui.add_space(8.0);

        let editing = self.state.editing_mechanic.is_some();
        ui.group(|ui| {
            ui.label(RichText::new(if editing { "Editar mecánico" } else { "Nuevo mecánico" }).strong());
            let form = &mut self.state.mechanic_form;
            egui::Grid::new("mechanic_form")
                .num_columns(4)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    field(ui, "Nombre", &mut form.nombre);
                    field(ui, "Apellido", &mut form.apellido);
                    ui.end_row();
                });
            form_buttons(ui, editing, UiAction::SubmitMechanic, Entity::Mechanics, actions);
        });

        ui.add_space(12.0);
        let list = &self.state.mechanics;
        list_header(ui, list.items.len(), list.loading, Entity::Mechanics, actions);
        if list.items.is_empty() {
            ui.label("No hay mecánicos registrados");
            return;
        }
        egui::Grid::new("mechanic_list").striped(true).num_columns(4).show(ui, |ui| {
            headers(ui, &["ID", "Nombre", "Apellido", ""]);
            for mechanic in &list.items {
                ui.label(mechanic.id.to_string());
                ui.label(mechanic.nombre.as_str());
                ui.label(mechanic.apellido.as_str());
                row_buttons(ui, Some(UiAction::EditMechanic(mechanic.id)), Entity::Mechanics, mechanic.id, actions);
                ui.end_row();
            }
        });
    }

    fn render_assignments(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Asignaciones");
        ui.add_space(8.0);

        let mechanics = &self.state.mechanics.items;
        let vehicles = &self.state.vehicles.items;
        let form = &mut self.state.assignment_form;
        ui.group(|ui| {
            ui.label(RichText::new("Nueva asignación").strong());
            egui::Grid::new("assignment_form")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Mecánico");
                    let selected = mechanics
                        .iter()
                        .find(|m| m.id.to_string() == form.id_mecanico)
                        .map(|m| format!("{} {}", m.nombre, m.apellido))
                        .unwrap_or_else(|| "Seleccione un mecánico".to_string());
                    egui::ComboBox::from_id_source("assignment_mechanic")
                        .selected_text(selected)
                        .show_ui(ui, |ui| {
                            for mechanic in mechanics {
                                ui.selectable_value(
                                    &mut form.id_mecanico,
                                    mechanic.id.to_string(),
                                    format!("{} {}", mechanic.nombre, mechanic.apellido),
                                );
                            }
                        });
                    ui.end_row();

                    ui.label("Vehículo");
                    let selected = vehicles
                        .iter()
                        .find(|v| v.id.to_string() == form.id_vehiculo)
                        .map(|v| format!("{} {}", v.marca, v.modelo))
                        .unwrap_or_else(|| "Seleccione un vehículo".to_string());
                    egui::ComboBox::from_id_source("assignment_vehicle")
                        .selected_text(selected)
                        .show_ui(ui, |ui| {
                            for vehicle in vehicles {
                                ui.selectable_value(
                                    &mut form.id_vehiculo,
                                    vehicle.id.to_string(),
                                    format!("{} {}", vehicle.marca, vehicle.modelo),
                                );
                            }
                        });
                    ui.end_row();

                    ui.label("Descripción");
                    ui.add(egui::TextEdit::multiline(&mut form.descripcion).desired_rows(2));
                    ui.end_row();

                    ui.label("Estado");
                    egui::ComboBox::from_id_source("assignment_state")
                        .selected_text(form.estado.label())
                        .show_ui(ui, |ui| {
                            for state in AssignmentState::SELECTABLE {
                                ui.selectable_value(&mut form.estado, state, state.label());
                            }
                        });
                    ui.end_row();
                });
            form_buttons(ui, false, UiAction::SubmitAssignment, Entity::Assignments, actions);
        });

        ui.add_space(12.0);
        let list = &self.state.assignments;
        list_header(ui, list.items.len(), list.loading, Entity::Assignments, actions);
        if list.items.is_empty() {
            ui.label("No hay asignaciones registradas");
            return;
        }
        egui::Grid::new("assignment_list").striped(true).num_columns(7).show(ui, |ui| {
            headers(ui, &["ID", "Mecánico", "Vehículo", "Descripción", "Fecha", "Estado", ""]);
            for assignment in &list.items {
                ui.label(assignment.id.to_string());
                if assignment.mecanico.is_empty() {
                    ui.label(format!("#{}", assignment.id_mecanico));
                } else {
                    ui.label(assignment.mecanico.as_str());
                }
                if assignment.vehiculo.is_empty() {
                    ui.label(format!("#{}", assignment.id_vehiculo));
                } else {
                    ui.label(assignment.vehiculo.as_str());
                }
                ui.label(assignment.descripcion.as_str());
                ui.label(text(&assignment.fecha_asignacion));
                egui::ComboBox::from_id_source(("assignment_row_state", assignment.id))
                    .selected_text(assignment.estado.label())
                    .show_ui(ui, |ui| {
                        for state in AssignmentState::SELECTABLE {
                            if ui.selectable_label(assignment.estado == state, state.label()).clicked()
                                && assignment.estado != state
                            {
                                actions.push(UiAction::SetAssignmentState(assignment.id, state));
                            }
                        }
                    });
                row_buttons(ui, None, Entity::Assignments, assignment.id, actions);
                ui.end_row();
            }
        });
    }

    fn render_import(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Carga masiva desde Excel");
        ui.label(
            RichText::new("Seleccione un archivo .xlsx o .xls con las columnas de vehículos")
                .color(ui.visuals().text_color().gamma_multiply(0.7)),
        );
        ui.add_space(8.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("📁 Seleccionar archivo Excel").clicked() {
                    actions.push(UiAction::ChooseSpreadsheet);
                }
                if let Some(file) = self.import.file() {
                    ui.label(format!("{} ({})", file.name, format_size(file.bytes.len() as u64)));
                }
                if let Some(session) = self.import.session() {
                    ui.label(
                        RichText::new(format!("Sesión: {}", session.as_str()))
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                }
                if self.import.is_loading() {
                    ui.spinner();
                }
                if !matches!(self.import.phase(), Phase::Idle) && ui.button("🗑 Reiniciar").clicked() {
                    actions.push(UiAction::ResetImport);
                }
            });
            let status = self.import.status();
            if !status.is_empty() {
                match self.import.phase() {
                    Phase::Invalid { .. } | Phase::Failed { .. } => ui.colored_label(FAILURE, status),
                    Phase::Succeeded { .. } => ui.colored_label(SUCCESS, status),
                    _ => ui.label(status),
                };
            }
        });

        if let Some(report) = self.import.validation() {
            ui.add_space(12.0);
            ui.label(
                RichText::new(format!(
                    "Validación de columnas ({} columnas, {} filas)",
                    report.total_columnas, report.total_filas
                ))
                .strong(),
            );
            egui::Grid::new("column_validation").striped(true).num_columns(4).show(ui, |ui| {
                headers(ui, &["Columna", "Requerida", "Estado", "Detalle"]);
                for column in &report.columns {
                    column_row(ui, column);
                }
            });
        }

        if let Some(preview) = self.import.preview() {
            ui.add_space(12.0);
            ui.label(RichText::new(format!("Vista previa ({} registros)", preview.total)).strong());
            egui::ScrollArea::horizontal().id_source("preview_scroll").show(ui, |ui| {
                egui::Grid::new("preview_grid").striped(true).show(ui, |ui| {
                    for column in &preview.columns {
                        ui.label(RichText::new(column.as_str()).strong());
                    }
                    ui.end_row();
                    for row in 0..preview.rows.len() {
                        for column in &preview.columns {
                            ui.label(preview.cell(row, column));
                        }
                        ui.end_row();
                    }
                });
            });

            if matches!(self.import.phase(), Phase::PreviewReady { .. }) {
                ui.add_space(8.0);
                let button = egui::Button::new(format!("📤 Cargar {} registros", preview.total))
                    .min_size(egui::vec2(200.0, 36.0));
                if ui.add(button).clicked() {
                    actions.push(UiAction::RequestImport);
                }
            }
        }

        if let Some(percentage) = self.import.percentage() {
            ui.add_space(12.0);
            let progress_bar = egui::ProgressBar::new(f32::from(percentage) / 100.0)
                .show_percentage()
                .animate(self.import.live_progress())
                .fill(ACCENT);
            ui.add(progress_bar);
            if self.import.is_loading() && !self.import.live_progress() {
                ui.label(
                    RichText::new("Sin progreso en vivo; esperando la respuesta del servidor")
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                );
            }
        }

        if let Some(result) = self.import.result() {
            ui.add_space(12.0);
            ui.group(|ui| {
                ui.label(RichText::new("Resultado de la carga").strong());
                ui.label(format!("Total procesados: {}", result.total));
                ui.colored_label(SUCCESS, format!("Exitosos: {}", result.successes));
                if result.failures > 0 {
                    ui.colored_label(FAILURE, format!("Fallidos: {}", result.failures));
                } else {
                    ui.label("Fallidos: 0");
                }
                if !result.errors.is_empty() {
                    let toggle = if self.state.show_details {
                        "Ocultar errores"
                    } else {
                        "Ver errores"
                    };
                    if ui.button(toggle).clicked() {
                        self.state.show_details = !self.state.show_details;
                    }
                    if self.state.show_details {
                        egui::ScrollArea::vertical()
                            .id_source("import_errors")
                            .max_height(200.0)
                            .show(ui, |ui| {
                                for error in &result.errors {
                                    ui.colored_label(FAILURE, error.as_str());
                                }
                            });
                    }
                }
            });
        }

        ui.add_space(16.0);
        ui.separator();
        ui.label(RichText::new("Vehículos en la base de datos").strong());
        ui.horizontal(|ui| {
            if ui.button("📋 Ver vehículos cargados").clicked() {
                actions.push(UiAction::ListImported);
            }
            if ui.button("🧹 Vaciar tabla").clicked() {
                actions.push(UiAction::AskClearImported);
            }
        });
        if let Some(imported) = &self.state.imported {
            ui.label(format!("{} vehículos", imported.total));
            egui::Grid::new("imported_list").striped(true).num_columns(4).show(ui, |ui| {
                headers(ui, &["ID", "Marca", "Modelo", "Año"]);
                for vehicle in &imported.vehiculos {
                    ui.label(vehicle.id.to_string());
                    ui.label(vehicle.marca.as_str());
                    ui.label(vehicle.modelo.as_str());
                    ui.label(vehicle.anio.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()));
                    ui.end_row();
                }
            });
        }
    }

    fn render_confirmation(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let prompt = match (self.import.pending_confirmation(), self.state.pending) {
            (Some(total), _) => (
                format!("¿Desea cargar {} registros a la base de datos?", total),
                UiAction::ConfirmImport,
                UiAction::CancelImport,
            ),
            (None, Some(PendingConfirmation::Delete(entity, id))) => (
                format!("¿Está seguro de eliminar {} #{}?", entity.noun(), id),
                UiAction::Confirm,
                UiAction::Dismiss,
            ),
            (None, Some(PendingConfirmation::ClearImported)) => (
                "¿Está seguro de vaciar la tabla de vehículos? Esta acción no se puede deshacer".to_string(),
                UiAction::Confirm,
                UiAction::Dismiss,
            ),
            (None, None) => return,
        };
        let (question, yes, no) = prompt;

        egui::Window::new("Confirmar")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(question);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Sí").clicked() {
                        actions.push(yes);
                    }
                    if ui.button("No").clicked() {
                        actions.push(no);
                    }
                });
            });
    }
}
