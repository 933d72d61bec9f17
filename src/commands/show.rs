use anyhow::{Result, bail};
use colored::Colorize;
use serde_json::Value;

use crate::Context;
use crate::cli::ShowArgs;
use crate::resource::model_garden::{ModelGarden, TYPE_NAME};
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let state = StateFile::load(&ctx.state_path)?;
    let entities = select(&state, args.address.as_deref())?;

    if args.json {
        let map: serde_json::Map<String, Value> = entities
            .iter()
            .map(|(name, entity)| Ok((format!("{TYPE_NAME}.{name}"), serde_json::to_value(entity)?)))
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if entities.is_empty() {
        ui::info("No entities in state");
        return Ok(());
    }

    ui::header("State");
    if ctx.verbose > 0 {
        ui::kv("Serial", &state.serial.to_string());
        ui::kv("Last updated", &state.last_updated.to_rfc3339());
    }

    for (name, entity) in entities {
        show_entity(name, entity);
    }
    Ok(())
}

/// Entities matching an optional address, in name order
fn select<'a>(
    state: &'a StateFile,
    address: Option<&str>,
) -> Result<Vec<(&'a String, &'a ModelGarden)>> {
    let Some(address) = address else {
        return Ok(state.model_garden.iter().collect());
    };

    let (resource_type, name) = declarative::parse_target(address)?;
    if resource_type != TYPE_NAME {
        bail!("Unknown resource type: {resource_type}");
    }
    match name {
        None => Ok(state.model_garden.iter().collect()),
        Some(name) => match state.model_garden.get_key_value(&name) {
            Some(entry) => Ok(vec![entry]),
            None => bail!("No entity {address} in state"),
        },
    }
}

fn show_entity(name: &str, entity: &ModelGarden) {
    ui::section(&format!("{TYPE_NAME}.{name}"));
    ui::kv("model_name", &entity.model_name);
    ui::kv("project_id", &entity.project_id);
    ui::kv("location", &entity.location);
    ui::kv("prompt", &entity.prompt);
    ui::kv("response_schema", &entity.response_schema);

    match &entity.response {
        Some(response) => {
            println!("  {}:", "response".dimmed());
            for line in pretty(response).lines() {
                println!("    {line}");
            }
        }
        None => ui::kv("response", &"(not generated)".dimmed().to_string()),
    }
}

/// Indent JSON responses; anything else is shown as stored
fn pretty(response: &str) -> String {
    serde_json::from_str::<Value>(response)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| response.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> StateFile {
        let mut state = StateFile::default();
        for name in ["b", "a"] {
            state.model_garden.insert(
                name.to_string(),
                ModelGarden {
                    prompt: "X".to_string(),
                    project_id: "p".to_string(),
                    location: "us-central1".to_string(),
                    model_name: "gemini-1.5-pro-002".to_string(),
                    response_schema: "{}".to_string(),
                    response: None,
                },
            );
        }
        state
    }

    #[test]
    fn test_select_all_in_name_order() {
        let state = state();
        let names: Vec<_> = select(&state, None)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_select_by_address() {
        let state = state();
        let selected = select(&state, Some("model_garden.b")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "b");

        assert!(select(&state, Some("model_garden.missing")).is_err());
        assert!(select(&state, Some("other.a")).is_err());
    }

    #[test]
    fn test_pretty_response() {
        assert_eq!(pretty(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(pretty("not json"), "not json");
    }
}
