//! jdy-cli: 简道云 API 连接检查与表单字段查询的命令行工具
//!
//! Usage:
//!   jdy-cli check                 Verify credentials and list forms
//!   jdy-cli forms                 List forms of the app
//!   jdy-cli fields <entry-id>     Show field ids of a form
//!   jdy-cli fields --name <name>  Same, resolving JDY_<NAME>_ENTRY_ID

use anyhow::{bail, Context};
use jdy_gateway::{Credential, Gateway, GatewayBuilder, GatewayConfig};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "check" => cmd_check().await,
        "forms" => cmd_forms().await,
        "fields" => cmd_fields(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"jdy-cli: 简道云 API 命令行工具

USAGE:
    jdy-cli <COMMAND> [OPTIONS]

COMMANDS:
    check                       Verify credentials and list forms
    forms                       List forms of the app
    fields <entry-id>           Show field ids of a form
    fields --name <name>        Resolve the entry id from JDY_<NAME>_ENTRY_ID
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    JDY_API_KEY                 API key (required)
    JDY_APP_ID                  Application id (required)
    JDY_AUTH_SCHEME             signed_header (default) | bearer
    JDY_BASE_URL                Override the API base URL
    JDY_RETRIES                 Attempts per call (default 3)
    RUST_LOG                    Log filter, e.g. jdy_gateway=info"#
    );
}

fn cmd_version() {
    println!("jdy-cli {}", env!("CARGO_PKG_VERSION"));
}

async fn cmd_check() -> anyhow::Result<()> {
    println!("Checking configuration...");
    let credential = Credential::from_env().context("credential check failed")?;
    let config = GatewayConfig::from_env()?;
    println!("  API key:     {}", credential.masked_key());
    println!("  App id:      {}", credential.app_id());
    println!("  Base URL:    {}", config.base_url);
    println!("  Auth scheme: {}", config.auth_scheme.as_str());
    for (name, id) in &config.entries {
        println!("  Entry {name}: {id}");
    }

    let gateway = GatewayBuilder::new(credential).config(config).build()?;

    println!("\nChecking API connection...");
    let forms = gateway
        .list_forms()
        .await
        .context("API connection failed")?;
    println!("  OK, {} form(s) found", forms.len());
    for form in forms.iter().take(3) {
        println!("    - {} ({})", form.name, form.entry_id);
    }
    if forms.len() > 3 {
        println!("    ... and {} more", forms.len() - 3);
    }
    Ok(())
}

async fn cmd_forms() -> anyhow::Result<()> {
    let gateway = Gateway::from_env()?;
    let forms = gateway.list_forms().await?;
    if forms.is_empty() {
        println!("No forms found.");
    }
    for form in forms {
        println!("{}\t{}", form.entry_id, form.name);
    }
    Ok(())
}

async fn cmd_fields(args: &[String]) -> anyhow::Result<()> {
    let gateway = Gateway::from_env()?;
    let entry_id = match args {
        [flag, name, ..] if flag == "--name" => gateway.config().entry_id(name)?.to_string(),
        [entry_id, ..] => entry_id.clone(),
        [] => bail!("missing <entry-id> (or --name <name>)"),
    };

    let widgets = gateway.list_widgets(&entry_id).await?;
    if widgets.is_empty() {
        println!("Form {entry_id} has no fields.");
        return Ok(());
    }

    println!("{} field(s) in {}:", widgets.len(), entry_id);
    println!("{}", "-".repeat(60));
    for widget in widgets {
        println!("name:  {}", widget.label);
        println!("  type: {}", widget.widget_type);
        println!("  id:   {}", widget.name);
    }
    Ok(())
}
