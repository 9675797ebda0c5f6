/*! Editors shown by Grafana for this datasource.

Both editors are stateless: rendering is a pure function of the current value
and produces a description of the controls Grafana should draw, while every
user event produces a brand new value which is reported straight back to
Grafana. Nothing is buffered between events.
*/
use serde::Serialize;

pub mod config;
pub mod query;

pub use config::{ConfigEditorProps, ConfigEvent, ConfigView};
pub use query::{QueryEditorProps, QueryEvent, QueryView};

/// A labelled group of fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSet {
    /// Heading of the group.
    pub label: &'static str,
    /// The fields in display order.
    pub fields: Vec<InlineField>,
}

impl FieldSet {
    /// Look up a field by its label.
    pub fn field(&self, label: &str) -> Option<&InlineField> {
        self.fields.iter().find(|f| f.label == label)
    }
}

/// A single control with a label and tooltip.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineField {
    /// The field label.
    pub label: &'static str,
    /// Width of the label, in grid units.
    pub label_width: u32,
    /// Help text shown on hover.
    pub tooltip: &'static str,
    /// The control itself.
    pub control: Control,
}

/// An option of a [`Control::Select`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectOption {
    /// The text shown for the option.
    pub label: &'static str,
    /// The value stored when the option is chosen.
    pub value: &'static str,
    /// Additional explanation shown under the label.
    pub description: &'static str,
}

/// The widgets the editors are built from. Grafana supplies the implementations.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Control {
    /// A plain text or number input.
    Input {
        /// Current text.
        value: String,
        /// Placeholder shown when empty.
        placeholder: &'static str,
        /// Input width, in grid units.
        width: u32,
        /// Whether the input only accepts numbers.
        numeric: bool,
    },
    /// An on/off switch.
    Switch {
        /// Current state.
        value: bool,
    },
    /// An input for a secret that cannot be read back once saved.
    SecretInput {
        /// Grafana already stores a value for this secret.
        is_configured: bool,
        /// Value typed in this session; empty when configured.
        value: String,
        /// Placeholder shown when empty.
        placeholder: &'static str,
        /// Input width, in grid units.
        width: u32,
    },
    /// A drop-down.
    Select {
        /// The available options.
        options: Vec<SelectOption>,
        /// The selected value.
        value: &'static str,
        /// Width, in grid units.
        width: u32,
    },
    /// A code editor.
    CodeEditor {
        /// Current text.
        value: String,
        /// Syntax highlighting language.
        language: &'static str,
        /// CSS height of the editor.
        height: &'static str,
        /// Whether to show the minimap.
        show_mini_map: bool,
        /// Whether to show line numbers.
        show_line_numbers: bool,
    },
}

impl Control {
    /// Whether this is a secret input that should render masked with a reset action.
    pub fn is_masked(&self) -> bool {
        matches!(
            self,
            Self::SecretInput {
                is_configured: true,
                ..
            }
        )
    }
}
