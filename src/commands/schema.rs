use anyhow::{Context as _, Result, bail};
use std::fs;
use std::io::{self, Read};

use crate::Context;
use crate::cli::SchemaArgs;
use crate::ui;
use declarative::Diagnostic;
use vertexkit::{StructuralSchema, translate};

pub fn run(_ctx: &Context, args: &SchemaArgs) -> Result<()> {
    let text = read_input(&args.file)?;
    println!("{}", render(&text)?);
    Ok(())
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read schema from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("Failed to read schema file: {file}"))
}

/// Parse and translate schema text into its wire form
fn render(text: &str) -> Result<String> {
    let raw = match StructuralSchema::parse(text) {
        Ok(raw) => raw,
        Err(err) => {
            ui::diagnostics(&Diagnostic::error(err.title(), err.to_string()).into());
            bail!("Schema could not be parsed");
        }
    };
    Ok(serde_json::to_string_pretty(&translate(Some(&raw)))?)
}
