use admin_client::{ClientEvent, DictItem, NoticeLevel, UserInfo};
use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("Failed to render JSON: {e}")),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Renders what the client published while a command ran.
pub fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Notice { level, message } => match level {
            NoticeLevel::Info => eprintln!("{} {}", "i".blue(), message),
            NoticeLevel::Success => eprintln!("{} {}", "✓".green(), message),
            NoticeLevel::Warning => eprintln!("{} {}", "!".yellow(), message.yellow()),
            // Failed commands print their own error.
            NoticeLevel::Error => tracing::debug!(%message, "Error notice"),
        },
        ClientEvent::SessionExpired { redirect } => {
            eprintln!(
                "{} Session expired, run `adminctl login` (web console: {})",
                "!".yellow(),
                redirect.dimmed()
            );
        }
        ClientEvent::SessionChanged { .. } => {}
    }
}

pub fn print_dict_items(code: &str, items: &[DictItem], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(items),
        OutputFormat::Table => {
            if items.is_empty() {
                println!("Dictionary \"{code}\" has no items.");
                return;
            }
            let mut builder = Builder::default();
            builder.push_record(["Label", "Value", "Sort", "Status", "Tag"]);
            for item in items {
                let status = if item.is_enabled() { "enabled" } else { "disabled" };
                builder.push_record([
                    item.label.clone(),
                    item.value.clone(),
                    item.sort.to_string(),
                    status.to_string(),
                    item.tag_type.clone().unwrap_or_else(|| "-".into()),
                ]);
            }
            let table = builder.build().with(Style::rounded()).to_string();
            println!("{} {}", "Dictionary:".cyan(), code.cyan());
            println!("{table}");
        }
    }
}

pub fn print_user(user: &UserInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(user),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            builder.push_record(["Username".to_string(), user.username.clone()]);
            builder.push_record(["Name".to_string(), user.display_name().to_string()]);
            builder.push_record(["Roles".to_string(), join_or_dash(&user.roles)]);
            builder.push_record(["Permissions".to_string(), user.perms.len().to_string()]);
            let table = builder.build().with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
