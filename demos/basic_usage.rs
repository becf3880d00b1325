//! Basic usage example
//!
//! Lists the forms of an app and prints the field ids of the first one.
//!
//! Credentials are read from environment variables:
//! - JDY_API_KEY
//! - JDY_APP_ID
//!
//! Usage:
//!   JDY_API_KEY=... JDY_APP_ID=... cargo run --example basic_usage

use jdy_gateway::{Gateway, Method};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    if std::env::var("JDY_API_KEY").is_err() || std::env::var("JDY_APP_ID").is_err() {
        eprintln!("JDY_API_KEY and JDY_APP_ID must be set.");
        std::process::exit(1);
    }

    let gateway = Gateway::from_env()?;
    println!("Using {:?}", gateway);

    let forms = gateway.list_forms().await?;
    println!("{} form(s):", forms.len());
    for form in &forms {
        println!("  {} ({})", form.name, form.entry_id);
    }

    if let Some(first) = forms.first() {
        let widgets = gateway.list_widgets(&first.entry_id).await?;
        println!("\nFields of {}:", first.name);
        for widget in widgets {
            println!("  {:<20} {:<10} {}", widget.label, widget.widget_type, widget.name);
        }
    }

    // Raw access: any endpoint, envelope already unwrapped
    let path = format!("/app/{}/dashboard", gateway.app_id());
    let dashboards = gateway.execute(Method::Get, &path, None).await?;
    println!("\nDashboards: {dashboards}");

    Ok(())
}
