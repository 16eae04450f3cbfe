//! Output formatting: table, JSON, YAML.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use asm_core::Manifest;

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// One manifest, labelled with the pass or stage that produced it.
#[derive(Debug, Serialize)]
pub struct Stage {
    pub stage: String,
    pub target: String,
    pub resources: Manifest,
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

fn attribute_summary(attrs: &indexmap::IndexMap<String, serde_json::Value>) -> String {
    attrs
        .iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(s) => format!("{name}={s}"),
            other => format!("{name}={other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render manifests: one row per resource in table mode.
pub fn render_stages(format: OutputFormat, stages: &[Stage]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<ResourceRow> = stages
                .iter()
                .flat_map(|stage| {
                    stage.resources.rows().map(move |(resource_type, id, attrs)| ResourceRow {
                        stage: stage.stage.clone(),
                        resource_type: resource_type.to_owned(),
                        id: id.to_owned(),
                        attributes: attribute_summary(attrs),
                    })
                })
                .collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(stages, false),
        OutputFormat::JsonCompact => render_json(stages, true),
        OutputFormat::Yaml => render_yaml(stages),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}
