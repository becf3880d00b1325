//! 表单元数据：表单列表、字段（控件）列表、创建/删除表单。
//!
//! App-level form metadata and the form definition builder.

use crate::client::core::decode;
use crate::client::{ApiRequest, Gateway};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PATH_WIDGET_LIST: &str = "/app/entry/widget/list";

/// A form as listed by the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "entryId", alias = "entry_id")]
    pub entry_id: String,
}

/// A field definition as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Field id used as the key in record payloads (e.g. `_widget_1529400746031`).
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub widget_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    MultiSelect,
    Phone,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// One field in a form definition sent to `create_form`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub name: String,
    pub label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
}

impl FieldSpec {
    fn new(widget_type: WidgetType, name: &str, label: &str, required: bool) -> Self {
        Self {
            widget_type,
            name: name.to_string(),
            label: label.to_string(),
            required,
            placeholder: None,
            min: None,
            max: None,
            options: Vec::new(),
            format: None,
            rows: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    pub widgets: Vec<FieldSpec>,
}

/// Accumulates field specs, then produces a [`FormDefinition`].
#[derive(Debug, Clone, Default)]
pub struct FormBuilder {
    fields: Vec<FieldSpec>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, label: &str, required: bool) -> Self {
        self.fields
            .push(FieldSpec::new(WidgetType::Text, name, label, required));
        self
    }

    pub fn textarea(mut self, name: &str, label: &str, required: bool, rows: u32) -> Self {
        let mut field = FieldSpec::new(WidgetType::Textarea, name, label, required);
        field.rows = Some(rows.max(1));
        self.fields.push(field);
        self
    }

    pub fn number(
        mut self,
        name: &str,
        label: &str,
        required: bool,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        let mut field = FieldSpec::new(WidgetType::Number, name, label, required);
        field.min = min;
        field.max = max;
        self.fields.push(field);
        self
    }

    pub fn date(mut self, name: &str, label: &str, required: bool) -> Self {
        let mut field = FieldSpec::new(WidgetType::Date, name, label, required);
        field.format = Some("YYYY-MM-DD".to_string());
        self.fields.push(field);
        self
    }

    pub fn select(
        mut self,
        name: &str,
        label: &str,
        options: &[&str],
        required: bool,
        multiple: bool,
    ) -> Self {
        let widget_type = if multiple {
            WidgetType::MultiSelect
        } else {
            WidgetType::Select
        };
        let mut field = FieldSpec::new(widget_type, name, label, required);
        field.options = options
            .iter()
            .map(|o| SelectOption {
                label: o.to_string(),
                value: o.to_string(),
            })
            .collect();
        self.fields.push(field);
        self
    }

    pub fn phone(mut self, name: &str, label: &str, required: bool) -> Self {
        self.fields
            .push(FieldSpec::new(WidgetType::Phone, name, label, required));
        self
    }

    pub fn email(mut self, name: &str, label: &str, required: bool) -> Self {
        self.fields
            .push(FieldSpec::new(WidgetType::Email, name, label, required));
        self
    }

    /// Finish the definition. Names must be non-empty and unique.
    pub fn build(self, name: &str, description: &str) -> Result<FormDefinition> {
        if name.trim().is_empty() {
            return Err(Error::invalid_request("form name must not be empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::invalid_request(format!(
                    "field '{}' has an empty name",
                    field.label
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::invalid_request(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }
        Ok(FormDefinition {
            name: name.to_string(),
            description: description.to_string(),
            widgets: self.fields,
        })
    }
}

impl Gateway {
    pub async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        let path = format!("/app/{}/form", self.app_id());
        let payload = self.execute_request(ApiRequest::get(path)).await?;
        decode(list_part(payload, "forms"))
    }

    /// Create a form and return its entry id.
    pub async fn create_form(&self, definition: &FormDefinition) -> Result<String> {
        let path = format!("/app/{}/entry", self.app_id());
        let body = serde_json::to_value(definition)
            .map_err(|e| Error::invalid_request(format!("unserializable form: {}", e)))?;
        let payload = self.execute_request(ApiRequest::post(path, body)).await?;
        payload
            .get("entryId")
            .or_else(|| payload.get("entry_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::response_format("create_form reply has no entryId", &payload.to_string())
            })
    }

    pub async fn delete_form(&self, entry_id: &str) -> Result<()> {
        let path = format!("/app/{}/entry/{}", self.app_id(), entry_id);
        self.execute_request(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Field definitions of one form.
    pub async fn list_widgets(&self, entry_id: &str) -> Result<Vec<Widget>> {
        let mut body = Map::new();
        body.insert("app_id".into(), Value::String(self.app_id().to_string()));
        body.insert("entry_id".into(), Value::String(entry_id.to_string()));
        let payload = self
            .execute_request(ApiRequest::post(PATH_WIDGET_LIST, Value::Object(body)))
            .await?;
        decode(list_part(payload, "widgets"))
    }

    /// Create a dashboard from an opaque definition and return its id.
    pub async fn create_dashboard(&self, definition: &Value) -> Result<String> {
        let path = format!("/app/{}/dashboard", self.app_id());
        let payload = self
            .execute_request(ApiRequest::post(path, definition.clone()))
            .await?;
        payload
            .get("dashboardId")
            .or_else(|| payload.get("dashboard_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::response_format(
                    "create_dashboard reply has no dashboardId",
                    &payload.to_string(),
                )
            })
    }

    /// Dashboards of the app, as raw JSON.
    pub async fn list_dashboards(&self) -> Result<Vec<Value>> {
        let path = format!("/app/{}/dashboard", self.app_id());
        let payload = self.execute_request(ApiRequest::get(path)).await?;
        decode(list_part(payload, "dashboards"))
    }
}

/// Lists arrive either bare or under a named key.
fn list_part(payload: Value, key: &str) -> Value {
    match payload {
        Value::Object(mut obj) => obj
            .remove(key)
            .or_else(|| obj.remove("data"))
            .unwrap_or(Value::Object(obj)),
        other => other,
    }
}
