//! The datasource configuration editor: connection and authentication settings.
use serde::Serialize;

use super::{Control, FieldSet, InlineField};
use crate::types::{parse_port, DataSourceSettings, JsonData, SecureJsonData, SecureJsonFields};

const LABEL_WIDTH: u32 = 14;

/// A user interaction with the config editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigEvent {
    /// The host input changed.
    HostChanged(String),
    /// The port input changed; holds the raw input text.
    PortChanged(String),
    /// The username input changed.
    UsernameChanged(String),
    /// The "Use TLS" switch was toggled.
    UseTlsChanged(bool),
    /// The "Skip TLS Verify" switch was toggled.
    SkipTlsVerifyChanged(bool),
    /// A new password was typed.
    PasswordChanged(String),
    /// The saved password was reset.
    PasswordReset,
    /// A new token was typed.
    TokenChanged(String),
    /// The saved token was reset.
    TokenReset,
}

/// What the config editor shows for a given set of options.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigView {
    /// Host, port and TLS settings.
    pub connection: FieldSet,
    /// Username and secrets.
    pub authentication: FieldSet,
}

impl ConfigView {
    /// Look up a field by label in either field set.
    pub fn field(&self, label: &str) -> Option<&InlineField> {
        self.connection
            .field(label)
            .or_else(|| self.authentication.field(label))
    }
}

/// Describe the editor for `options`.
pub fn render(options: &DataSourceSettings) -> ConfigView {
    let DataSourceSettings {
        json_data,
        secure_json_data,
        secure_json_fields,
        ..
    } = options;

    let mut connection = vec![
        field(
            "Host",
            "GizmoSQL server hostname or IP address",
            Control::Input {
                value: json_data.host().to_string(),
                placeholder: "localhost",
                width: 40,
                numeric: false,
            },
        ),
        field(
            "Port",
            "GizmoSQL Flight SQL port (default: 31337)",
            Control::Input {
                value: json_data.port().to_string(),
                placeholder: "31337",
                width: 20,
                numeric: true,
            },
        ),
        field(
            "Use TLS",
            "Enable TLS/SSL encryption",
            Control::Switch {
                value: json_data.use_tls(),
            },
        ),
    ];
    if json_data.use_tls() {
        connection.push(field(
            "Skip TLS Verify",
            "Skip TLS certificate verification (not recommended for production)",
            Control::Switch {
                value: json_data.skip_tls_verify(),
            },
        ));
    }

    let authentication = vec![
        field(
            "Username",
            "Username for authentication (optional)",
            Control::Input {
                value: json_data.username().to_string(),
                placeholder: "username",
                width: 40,
                numeric: false,
            },
        ),
        field(
            "Password",
            "Password for authentication (optional)",
            secret(
                secure_json_fields.password,
                secure_json_data.password.as_deref(),
                "password",
            ),
        ),
        field(
            "Token",
            "Bearer token for authentication (optional, alternative to password)",
            secret(
                secure_json_fields.token,
                secure_json_data.token.as_deref(),
                "bearer token",
            ),
        ),
    ];

    ConfigView {
        connection: FieldSet {
            label: "Connection",
            fields: connection,
        },
        authentication: FieldSet {
            label: "Authentication",
            fields: authentication,
        },
    }
}

fn field(label: &'static str, tooltip: &'static str, control: Control) -> InlineField {
    InlineField {
        label,
        label_width: LABEL_WIDTH,
        tooltip,
        control,
    }
}

fn secret(is_configured: bool, value: Option<&str>, placeholder: &'static str) -> Control {
    Control::SecretInput {
        is_configured,
        value: value.unwrap_or_default().to_string(),
        placeholder,
        width: 40,
    }
}

/// Apply `event` to `options`, returning the updated copy.
///
/// Exactly one setting changes per event; `options` itself is left as-is.
pub fn apply(options: &DataSourceSettings, event: ConfigEvent) -> DataSourceSettings {
    let json = |json_data: JsonData| DataSourceSettings {
        json_data,
        ..options.clone()
    };
    let secure = |secure_json_data: SecureJsonData| DataSourceSettings {
        secure_json_data,
        ..options.clone()
    };
    let current = &options.json_data;
    let secrets = &options.secure_json_data;
    match event {
        ConfigEvent::HostChanged(host) => json(JsonData {
            host: Some(host),
            ..current.clone()
        }),
        ConfigEvent::PortChanged(input) => json(JsonData {
            port: Some(i64::from(parse_port(&input))),
            ..current.clone()
        }),
        ConfigEvent::UsernameChanged(username) => json(JsonData {
            username: Some(username),
            ..current.clone()
        }),
        ConfigEvent::UseTlsChanged(use_tls) => json(JsonData {
            use_tls: Some(use_tls),
            ..current.clone()
        }),
        ConfigEvent::SkipTlsVerifyChanged(skip) => json(JsonData {
            skip_tls_verify: Some(skip),
            ..current.clone()
        }),
        ConfigEvent::PasswordChanged(password) => secure(SecureJsonData {
            password: Some(password),
            ..secrets.clone()
        }),
        ConfigEvent::TokenChanged(token) => secure(SecureJsonData {
            token: Some(token),
            ..secrets.clone()
        }),
        ConfigEvent::PasswordReset => DataSourceSettings {
            secure_json_fields: SecureJsonFields {
                password: false,
                ..options.secure_json_fields
            },
            secure_json_data: SecureJsonData {
                password: Some(String::new()),
                ..secrets.clone()
            },
            ..options.clone()
        },
        ConfigEvent::TokenReset => DataSourceSettings {
            secure_json_fields: SecureJsonFields {
                token: false,
                ..options.secure_json_fields
            },
            secure_json_data: SecureJsonData {
                token: Some(String::new()),
                ..secrets.clone()
            },
            ..options.clone()
        },
    }
}

/// The props Grafana passes to the config editor.
pub struct ConfigEditorProps<'a, F>
where
    F: FnMut(DataSourceSettings),
{
    /// The current settings.
    pub options: &'a DataSourceSettings,
    /// Called with the new settings after every change.
    pub on_options_change: F,
}

impl<'a, F> ConfigEditorProps<'a, F>
where
    F: FnMut(DataSourceSettings),
{
    /// Bundle the current settings with the change callback.
    pub fn new(options: &'a DataSourceSettings, on_options_change: F) -> Self {
        Self {
            options,
            on_options_change,
        }
    }

    /// Describe the editor for the current settings.
    pub fn render(&self) -> ConfigView {
        render(self.options)
    }

    /// Apply `event` and report the new settings immediately.
    pub fn handle(&mut self, event: ConfigEvent) {
        let updated = apply(self.options, event);
        (self.on_options_change)(updated);
    }
}
