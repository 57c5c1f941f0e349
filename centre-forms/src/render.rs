//! Data-driven rendering model
//!
//! Maps field descriptors plus controller state onto declarative controls.
//! UI layers draw these however they like; the engine only guarantees that
//! rendering and validation iterate the same descriptors.

use crate::schema::{FieldKind, StepDefinition};
use crate::state::FormController;
use crate::types::FieldValue;

/// One interactive control, bound to the current state of its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Control<'a> {
    TextInput {
        key: &'a str,
        label: &'a str,
        value: &'a str,
        required: bool,
        read_only: bool,
    },
    NumberInput {
        key: &'a str,
        label: &'a str,
        value: &'a str,
        required: bool,
    },
    SelectBox {
        key: &'a str,
        label: &'a str,
        options: &'a [String],
        selected: &'a str,
        required: bool,
    },
    CheckboxGroup {
        key: &'a str,
        label: &'a str,
        options: &'a [String],
        selected: Vec<&'a str>,
        required: bool,
    },
    FilePicker {
        key: &'a str,
        label: &'a str,
        file_name: Option<&'a str>,
        preview: Option<String>,
        required: bool,
    },
}

/// A control together with its current validation message, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField<'a> {
    pub control: Control<'a>,
    pub error: Option<&'a str>,
}

/// Produce the controls for one step, in descriptor order.
pub fn render_step<'a>(form: &'a FormController, step: &'a StepDefinition) -> Vec<RenderedField<'a>> {
    step.fields
        .iter()
        .map(|field| {
            let value = form.value(&field.key);
            let control = match &field.kind {
                FieldKind::Text => Control::TextInput {
                    key: &field.key,
                    label: &field.label,
                    value: value.and_then(FieldValue::as_text).unwrap_or(""),
                    required: field.required,
                    read_only: field.read_only,
                },
                FieldKind::Number => Control::NumberInput {
                    key: &field.key,
                    label: &field.label,
                    value: value.and_then(FieldValue::as_text).unwrap_or(""),
                    required: field.required,
                },
                FieldKind::Select(options) => Control::SelectBox {
                    key: &field.key,
                    label: &field.label,
                    options,
                    selected: value.and_then(FieldValue::as_text).unwrap_or(""),
                    required: field.required,
                },
                FieldKind::Checkbox(options) => Control::CheckboxGroup {
                    key: &field.key,
                    label: &field.label,
                    options,
                    selected: value
                        .and_then(FieldValue::as_selection)
                        .map(|set| set.iter().map(String::as_str).collect())
                        .unwrap_or_default(),
                    required: field.required,
                },
                FieldKind::File => Control::FilePicker {
                    key: &field.key,
                    label: &field.label,
                    file_name: value.and_then(FieldValue::as_image).map(|i| i.file_name()),
                    preview: value.and_then(FieldValue::as_image).map(|i| i.data_url()),
                    required: field.required,
                },
            };
            RenderedField {
                control,
                error: form.errors().get(&field.key),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, FormSchema};
    use crate::types::RecordingMode;
    use crate::ImageUpload;

    #[test]
    fn basic_info_step_renders_one_control_per_descriptor() {
        let form = FormController::new(FormSchema::centre_information(1, RecordingMode::CategoryTally))
            .unwrap();
        let step = form.schema().step(1).unwrap();
        let fields = render_step(&form, step);
        assert_eq!(fields.len(), step.fields.len());

        let latitude = fields
            .iter()
            .find_map(|f| match &f.control {
                Control::TextInput { key, read_only, .. } if *key == schema::LATITUDE => {
                    Some(*read_only)
                }
                _ => None,
            })
            .expect("latitude control");
        assert!(latitude);
    }

    #[test]
    fn controls_reflect_state_and_errors() {
        let mut form =
            FormController::new(FormSchema::centre_information(1, RecordingMode::CategoryTally))
                .unwrap();
        form.toggle_option(schema::DEVICES, "Tablet").unwrap();
        let photo = ImageUpload::from_bytes("centre.png", "image/png", vec![9]).unwrap();
        form.set_image(schema::CENTRE_IMAGE, photo).unwrap();
        form.errors_mut().insert(schema::DEVICES, "Select at least one option");

        let step = form.schema().step(2).unwrap();
        let fields = render_step(&form, step);

        match &fields[0].control {
            Control::CheckboxGroup { selected, .. } => assert_eq!(selected, &vec!["Tablet"]),
            other => panic!("expected a checkbox group, got {other:?}"),
        }
        assert_eq!(fields[0].error, Some("Select at least one option"));

        match &fields[1].control {
            Control::FilePicker { file_name, preview, .. } => {
                assert_eq!(*file_name, Some("centre.png"));
                assert!(preview.as_deref().unwrap().starts_with("data:image/png"));
            }
            other => panic!("expected a file picker, got {other:?}"),
        }
    }
}
