//! 表单数据 CRUD：创建、批量创建、查询、更新、删除。
//!
//! Record operations on one form (entry).
//!
//! Every call goes through [`Gateway`]; this module only shapes request bodies
//! (field wrapping, transaction tokens, filters) and reads the `data` part of
//! the replies.
//!
//! ```rust,no_run
//! use jdy_gateway::records::{Filter, RecordQuery, WriteOptions};
//! use jdy_gateway::Gateway;
//! use serde_json::json;
//!
//! # async fn run() -> jdy_gateway::Result<()> {
//! let gateway = Gateway::from_env()?;
//! let volunteers = gateway.named_entry("volunteer")?;
//!
//! let fields = json!({"姓名": "张三", "状态": "活跃"});
//! let created = volunteers
//!     .create(fields.as_object().cloned().unwrap_or_default(), WriteOptions::default())
//!     .await?;
//!
//! let active = volunteers
//!     .list_all(Some(Filter::all().eq("状态", "活跃")))
//!     .await?;
//! # let _ = (created, active);
//! # Ok(())
//! # }
//! ```

use crate::client::core::decode;
use crate::client::{ApiRequest, Gateway};
use crate::payload::{unwrap_field, wrap_fields, FieldMap};
use crate::transaction::TransactionId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const PATH_CREATE: &str = "/app/entry/data/create";
pub const PATH_BATCH_CREATE: &str = "/app/entry/data/batch_create";
pub const PATH_GET: &str = "/app/entry/data/get";
pub const PATH_UPDATE: &str = "/app/entry/data/update";
pub const PATH_DELETE: &str = "/app/entry/data/delete";
pub const PATH_BATCH_DELETE: &str = "/app/entry/data/batch_delete";
pub const PATH_LIST: &str = "/app/entry/data/list";

/// Largest page the list endpoint returns.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One record as returned by the platform (`_id` plus fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    /// Field value, unwrapped from `{"value": x}` when needed.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).map(unwrap_field)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Options shared by create / batch create / update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Token for platform-side deduplication; generated when absent.
    pub transaction_id: Option<TransactionId>,
    pub start_workflow: bool,
    pub start_trigger: bool,
}

impl WriteOptions {
    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn start_workflow(mut self, enable: bool) -> Self {
        self.start_workflow = enable;
        self
    }

    pub fn start_trigger(mut self, enable: bool) -> Self {
        self.start_trigger = enable;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchCreateResult {
    pub success_count: u64,
    pub success_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMethod {
    Eq,
    Ne,
    In,
    Nin,
    Range,
    Like,
    Empty,
    NotEmpty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    pub method: FilterMethod,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<Value>,
}

/// Data filter in the platform's `{rel, cond}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub rel: Relation,
    pub cond: Vec<Condition>,
}

impl Filter {
    /// Every condition must match.
    pub fn all() -> Self {
        Self {
            rel: Relation::And,
            cond: Vec::new(),
        }
    }

    /// Any condition may match.
    pub fn any() -> Self {
        Self {
            rel: Relation::Or,
            cond: Vec::new(),
        }
    }

    pub fn condition(
        mut self,
        field: impl Into<String>,
        method: FilterMethod,
        value: Vec<Value>,
    ) -> Self {
        self.cond.push(Condition {
            field: field.into(),
            field_type: None,
            method,
            value,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, FilterMethod::Eq, vec![value.into()])
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, FilterMethod::Ne, vec![value.into()])
    }

    pub fn one_of(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.condition(field, FilterMethod::In, values)
    }

    /// Inclusive range; `None` leaves that side open.
    pub fn range(
        self,
        field: impl Into<String>,
        from: Option<Value>,
        to: Option<Value>,
    ) -> Self {
        let bounds = vec![from.unwrap_or(Value::Null), to.unwrap_or(Value::Null)];
        self.condition(field, FilterMethod::Range, bounds)
    }

    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.condition(field, FilterMethod::Like, vec![Value::String(pattern.into())])
    }

    pub fn empty(self, field: impl Into<String>) -> Self {
        self.condition(field, FilterMethod::Empty, Vec::new())
    }

    pub fn not_empty(self, field: impl Into<String>) -> Self {
        self.condition(field, FilterMethod::NotEmpty, Vec::new())
    }
}

/// One page of the list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub limit: u32,
    /// Cursor: return records after this `_id`.
    pub data_id: Option<String>,
    pub fields: Vec<String>,
    pub filter: Option<Filter>,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            limit: MAX_PAGE_SIZE,
            data_id: None,
            fields: Vec::new(),
            filter: None,
        }
    }
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn after(mut self, data_id: impl Into<String>) -> Self {
        self.data_id = Some(data_id.into());
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Record operations bound to one app + entry.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    gateway: &'a Gateway,
    entry_id: String,
}

impl Gateway {
    pub fn entry(&self, entry_id: impl Into<String>) -> Records<'_> {
        Records {
            gateway: self,
            entry_id: entry_id.into(),
        }
    }

    /// Entry configured under `name` (e.g. `JDY_VOLUNTEER_ENTRY_ID`).
    pub fn named_entry(&self, name: &str) -> Result<Records<'_>> {
        let entry_id = self.config.entry_id(name)?.to_string();
        Ok(self.entry(entry_id))
    }
}

impl<'a> Records<'a> {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    fn base_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("app_id".into(), Value::String(self.gateway.app_id().to_string()));
        body.insert("entry_id".into(), Value::String(self.entry_id.clone()));
        body
    }

    fn write_request(path: &str, body: Map<String, Value>, options: WriteOptions) -> ApiRequest {
        let mut req = ApiRequest::post(path, Value::Object(body));
        if let Some(id) = options.transaction_id {
            req = req.transaction_id(id);
        }
        req.idempotent()
    }

    pub async fn create(&self, fields: FieldMap, options: WriteOptions) -> Result<Record> {
        let mut body = self.base_body();
        body.insert("data".into(), Value::Object(wrap_fields(fields)));
        body.insert("is_start_workflow".into(), Value::Bool(options.start_workflow));
        body.insert("is_start_trigger".into(), Value::Bool(options.start_trigger));

        let payload = self
            .gateway
            .execute_request(Self::write_request(PATH_CREATE, body, options))
            .await?;
        decode(data_part(payload))
    }

    pub async fn batch_create(
        &self,
        records: Vec<FieldMap>,
        options: WriteOptions,
    ) -> Result<BatchCreateResult> {
        let data_list: Vec<Value> = records
            .into_iter()
            .map(|fields| Value::Object(wrap_fields(fields)))
            .collect();
        debug!(entry_id = %self.entry_id, count = data_list.len(), "batch create");

        let mut body = self.base_body();
        body.insert("data_list".into(), Value::Array(data_list));
        body.insert("is_start_workflow".into(), Value::Bool(options.start_workflow));

        let payload = self
            .gateway
            .execute_request(Self::write_request(PATH_BATCH_CREATE, body, options))
            .await?;
        decode(data_part(payload))
    }

    pub async fn get(&self, data_id: &str) -> Result<Record> {
        let mut body = self.base_body();
        body.insert("data_id".into(), Value::String(data_id.to_string()));
        let payload = self
            .gateway
            .execute_request(ApiRequest::post(PATH_GET, Value::Object(body)))
            .await?;
        decode(data_part(payload))
    }

    pub async fn update(
        &self,
        data_id: &str,
        fields: FieldMap,
        options: WriteOptions,
    ) -> Result<Record> {
        let mut body = self.base_body();
        body.insert("data_id".into(), Value::String(data_id.to_string()));
        body.insert("data".into(), Value::Object(wrap_fields(fields)));
        body.insert("is_start_trigger".into(), Value::Bool(options.start_trigger));

        let payload = self
            .gateway
            .execute_request(Self::write_request(PATH_UPDATE, body, options))
            .await?;
        decode(data_part(payload))
    }

    pub async fn delete(&self, data_id: &str) -> Result<()> {
        let mut body = self.base_body();
        body.insert("data_id".into(), Value::String(data_id.to_string()));
        self.gateway
            .execute_request(Self::write_request(PATH_DELETE, body, WriteOptions::default()))
            .await?;
        Ok(())
    }

    /// Returns the number of deleted records reported by the platform.
    pub async fn batch_delete(&self, data_ids: &[String]) -> Result<u64> {
        let mut body = self.base_body();
        body.insert(
            "data_ids".into(),
            Value::Array(data_ids.iter().cloned().map(Value::String).collect()),
        );
        let payload = self
            .gateway
            .execute_request(Self::write_request(
                PATH_BATCH_DELETE,
                body,
                WriteOptions::default(),
            ))
            .await?;
        Ok(data_part(payload)
            .get("success_count")
            .and_then(Value::as_u64)
            .unwrap_or(data_ids.len() as u64))
    }

    pub async fn list(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let mut body = self.base_body();
        body.insert("limit".into(), Value::from(query.limit.clamp(1, MAX_PAGE_SIZE)));
        if let Some(ref data_id) = query.data_id {
            body.insert("data_id".into(), Value::String(data_id.clone()));
        }
        if !query.fields.is_empty() {
            body.insert("fields".into(), Value::from(query.fields.clone()));
        }
        if let Some(ref filter) = query.filter {
            let filter = serde_json::to_value(filter)
                .map_err(|e| Error::invalid_request(format!("unserializable filter: {}", e)))?;
            body.insert("filter".into(), filter);
        }

        let payload = self
            .gateway
            .execute_request(ApiRequest::post(PATH_LIST, Value::Object(body)))
            .await?;
        decode(data_part(payload))
    }

    /// Follow the `_id` cursor until a short page comes back.
    pub async fn list_all(&self, filter: Option<Filter>) -> Result<Vec<Record>> {
        let mut query = RecordQuery::new();
        query.filter = filter;
        let mut out = Vec::new();

        loop {
            let page = self.list(&query).await?;
            let page_len = page.len();
            let cursor = page.last().and_then(Record::id).map(str::to_string);
            out.extend(page);

            match cursor {
                Some(id) if page_len as u32 >= query.limit => {
                    if query.data_id.as_deref() == Some(id.as_str()) {
                        warn!(entry_id = %self.entry_id, cursor = %id, "list cursor did not advance, stopping");
                        break;
                    }
                    query.data_id = Some(id);
                }
                _ => break,
            }
        }

        debug!(entry_id = %self.entry_id, total = out.len(), "listed all records");
        Ok(out)
    }

    pub async fn count(&self, filter: Option<Filter>) -> Result<usize> {
        Ok(self.list_all(filter).await?.len())
    }
}

/// The `data` member of a reply when present, else the reply itself.
fn data_part(payload: Value) -> Value {
    match payload {
        Value::Object(mut obj) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
