//! Record CRUD example
//!
//! Creates a volunteer record, reads it back, updates it, lists the entry
//! with a filter and finally deletes the record.
//!
//! Required environment variables:
//! - JDY_API_KEY, JDY_APP_ID
//! - JDY_VOLUNTEER_ENTRY_ID
//!
//! Usage:
//!   RUST_LOG=jdy_gateway=debug cargo run --example record_crud

use jdy_gateway::records::{Filter, RecordQuery, WriteOptions};
use jdy_gateway::{FieldMap, Gateway};
use serde_json::json;

fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let gateway = Gateway::from_env()?;
    let volunteers = gateway.named_entry("volunteer")?;

    let created = volunteers
        .create(
            fields(&[
                ("姓名", json!("张三")),
                ("手机号", json!("13800138000")),
                ("年龄", json!(25)),
                ("状态", json!("活跃")),
            ]),
            WriteOptions::default(),
        )
        .await?;
    let id = created.id().unwrap_or_default().to_string();
    println!("created {id}");

    let record = volunteers.get(&id).await?;
    println!("read back: 姓名 = {:?}", record.field("姓名"));

    volunteers
        .update(&id, fields(&[("状态", json!("停用"))]), WriteOptions::default())
        .await?;

    let page = volunteers
        .list(
            &RecordQuery::new()
                .limit(10)
                .filter(Filter::all().eq("状态", "停用")),
        )
        .await?;
    println!("{} inactive volunteer(s) on the first page", page.len());

    let total = volunteers.count(None).await?;
    println!("{total} volunteer(s) in total");

    volunteers.delete(&id).await?;
    println!("deleted {id}");

    Ok(())
}
