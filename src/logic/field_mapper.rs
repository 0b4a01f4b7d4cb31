use log::debug;

use crate::logic::color_spec::{self, Swatch, DEFAULT_GLASS_COLOR};
use crate::logic::validation::RAIL_MOUNTINGS;
use crate::model::field_ids::{COLOR, COLOR_SPEC, ID, MANUFACTURER, NAME, PHOTO, SIZE};
use crate::model::{ColorPreview, EntityKind, FieldDescriptor, FieldRecord, FormState, WidgetKind};

/// Form field id → backend column, per kind
fn column_map(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Handle => &[
            (ID, "id"),
            (NAME, "modelo"),
            (SIZE, "medida"),
            (MANUFACTURER, "fabricante"),
            (COLOR, "cor"),
            (PHOTO, "foto"),
        ],
        EntityKind::Rail => &[
            (ID, "id"),
            (NAME, "nome"),
            (SIZE, "tipo"),
            (MANUFACTURER, "fabricante"),
            (COLOR, "cor"),
            (PHOTO, "foto"),
        ],
        EntityKind::Glass => &[(ID, "id"), (NAME, "tipo"), (COLOR_SPEC, "rgb")],
    }
}

fn descriptor(id: &str, label: &str, widget: WidgetKind, required: bool) -> FieldDescriptor {
    FieldDescriptor {
        id: id.to_string(),
        label: label.to_string(),
        widget,
        required,
        visible: true,
    }
}

/// Maps the shared modal form to flat records and back, and reshapes the
/// form for each entity kind. Pure: never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    pub fn new() -> Self {
        Self
    }

    /// Ordered visible fields for `kind`
    pub fn descriptors(&self, kind: EntityKind) -> Vec<FieldDescriptor> {
        match kind {
            EntityKind::Handle => vec![
                descriptor(NAME, "Model", WidgetKind::Text, true),
                descriptor(SIZE, "Size", WidgetKind::Text, true),
                descriptor(MANUFACTURER, "Manufacturer", WidgetKind::Text, false),
                descriptor(COLOR, "Color", WidgetKind::Text, false),
                descriptor(PHOTO, "Photo", WidgetKind::File, false),
            ],
            EntityKind::Rail => vec![
                descriptor(NAME, "Name", WidgetKind::Text, true),
                descriptor(
                    SIZE,
                    "Type",
                    WidgetKind::Choice {
                        options: RAIL_MOUNTINGS.iter().map(|s| s.to_string()).collect(),
                    },
                    false,
                ),
                descriptor(MANUFACTURER, "Manufacturer", WidgetKind::Text, false),
                descriptor(COLOR, "Color", WidgetKind::Text, false),
                descriptor(PHOTO, "Photo", WidgetKind::File, false),
            ],
            EntityKind::Glass => vec![
                descriptor(NAME, "Glass type", WidgetKind::Text, true),
                descriptor(COLOR_SPEC, "Color (r,g,b,a)", WidgetKind::Text, false),
            ],
        }
    }

    /// Hide every optional field, then reveal and relabel the kind's subset.
    /// Widget swaps only touch the descriptor, so field ids and values survive.
    pub fn configure_fields_for(&self, kind: EntityKind, form: &mut FormState) {
        for id in [ID, SIZE, MANUFACTURER, COLOR, PHOTO, COLOR_SPEC] {
            if let Some(field) = form.field_mut(id) {
                field.descriptor.visible = false;
                field.descriptor.required = false;
            }
        }

        for layout in self.descriptors(kind) {
            if let Some(field) = form.field_mut(&layout.id) {
                field.descriptor = layout;
            }
        }

        if kind == EntityKind::Glass {
            let preview = preview_for(form.value(COLOR_SPEC));
            form.set_preview(Some(preview));
        } else {
            form.set_preview(None);
        }

        debug!("Configured modal fields for {}", kind);
    }

    /// Empty the form and apply the kind's defaults for a new record
    pub fn clear(&self, kind: EntityKind, form: &mut FormState) {
        form.clear_values();
        if kind == EntityKind::Glass {
            form.set_value(COLOR_SPEC, DEFAULT_GLASS_COLOR);
        }
        self.refresh_preview(form);
    }

    pub fn populate(&self, kind: EntityKind, form: &mut FormState, record: &FieldRecord) {
        form.clear_values();
        for (field_id, column) in column_map(kind) {
            form.set_value(field_id, record.get(column).unwrap_or_default());
        }
        if kind == EntityKind::Glass && form.value(COLOR_SPEC).trim().is_empty() {
            form.set_value(COLOR_SPEC, DEFAULT_GLASS_COLOR);
        }
        self.refresh_preview(form);
    }

    /// Flat record of the non-blank values relevant to `kind`
    pub fn extract(&self, kind: EntityKind, form: &FormState) -> FieldRecord {
        let mut record = FieldRecord::new();
        for (field_id, column) in column_map(kind) {
            let value = form.value(field_id).trim();
            if value.is_empty() {
                continue;
            }
            if *field_id == COLOR_SPEC {
                let normalized = color_spec::normalize(value).unwrap_or_else(|| value.to_string());
                record.insert(*column, normalized);
            } else {
                record.insert(*column, value);
            }
        }
        record
    }

    /// Handle a value-change event from the UI. Returns false for unknown fields.
    pub fn apply_change(&self, form: &mut FormState, field_id: &str, value: &str) -> bool {
        if !form.set_value(field_id, value) {
            return false;
        }
        let bound = form
            .preview()
            .map(|preview| preview.bound_field == field_id)
            .unwrap_or(false);
        if bound {
            self.refresh_preview(form);
        }
        true
    }

    fn refresh_preview(&self, form: &mut FormState) {
        let Some(bound_field) = form.preview().map(|preview| preview.bound_field.clone()) else {
            return;
        };
        let updated = preview_for(form.value(&bound_field));
        if let Some(preview) = form.preview_mut() {
            *preview = updated;
        }
    }
}

fn preview_for(spec: &str) -> ColorPreview {
    match Swatch::from_spec(spec) {
        Some(swatch) => ColorPreview {
            bound_field: COLOR_SPEC.to_string(),
            swatch,
            valid: true,
        },
        None => ColorPreview {
            bound_field: COLOR_SPEC.to_string(),
            swatch: Swatch::neutral(),
            valid: false,
        },
    }
}
