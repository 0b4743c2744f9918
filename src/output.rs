//! Output renderers and formatting helpers for command results.

use crate::api::RequestDescription;
use crate::error::{CliError, CliResult};
use crate::resource::ColumnDef;
use anyhow::anyhow;
use comfy_table::{presets, CellAlignment, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
}

impl OutputFormat {
    /// JSON and YAML must stay machine readable, even on failure
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json | Self::Yaml)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Restrict output to these columns / keys
    pub fields: Vec<String>,
    /// Suppress success output
    pub quiet: bool,
}

/// Pagination metadata from a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageMeta {
    pub size: u64,
    pub total: u64,
    pub offset: u64,
}

impl PageMeta {
    /// Read `meta.size/total/offset`; falls back to the row count
    pub fn from_response(response: &Value, rows: usize) -> Self {
        let meta = response.get("meta");
        let read = |key: &str| meta.and_then(|m| m.get(key)).and_then(Value::as_u64);
        let size = read("size").unwrap_or(rows as u64);
        Self {
            size,
            total: read("total").unwrap_or(size),
            offset: read("offset").unwrap_or(0),
        }
    }

    pub fn summary(&self, plural_name: &str) -> String {
        if self.size == 0 {
            return format!("No {} found.", plural_name);
        }
        format!(
            "Viewing {}-{} of {} {}",
            self.offset + 1,
            self.offset + self.size,
            self.total,
            plural_name
        )
    }
}

pub struct ResultRenderer {
    pub options: RenderOptions,
}

impl ResultRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn format(&self) -> OutputFormat {
        self.options.format
    }

    /// Render a list response
    pub fn render_list(
        &self,
        response: &Value,
        list_key: &str,
        columns: &[ColumnDef],
        plural_name: &str,
    ) -> CliResult<String> {
        let rows: Vec<Value> = response
            .get(list_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let columns = self.select_columns(columns);
        match self.options.format {
            OutputFormat::Table => {
                let page = PageMeta::from_response(response, rows.len());
                if rows.is_empty() {
                    return Ok(page.summary(plural_name));
                }
                Ok(format!("{}\n{}", render_table(&rows, &columns), page.summary(plural_name)))
            }
            OutputFormat::Csv => render_csv(&rows, &columns),
            OutputFormat::Json | OutputFormat::Yaml => {
                let filtered = self.filter_wrapped(response, list_key);
                self.render_value(&filtered)
            }
        }
    }

    /// Render a single-record response
    pub fn render_record(&self, response: &Value, object_key: &str, columns: &[ColumnDef]) -> CliResult<String> {
        let record = response.get(object_key).unwrap_or(response);
        let columns = self.select_columns(columns);
        match self.options.format {
            OutputFormat::Table => Ok(render_details(record, &columns)),
            OutputFormat::Csv => render_csv(std::slice::from_ref(record), &columns),
            OutputFormat::Json | OutputFormat::Yaml => {
                let filtered = self.filter_wrapped(response, object_key);
                self.render_value(&filtered)
            }
        }
    }

    /// Rows as a plain table regardless of format, for remediation output
    pub fn render_candidates(&self, rows: &[Value], columns: &[ColumnDef]) -> String {
        render_table(rows, columns)
    }

    /// Serialize a value in the structured format (JSON for table/csv)
    pub fn render_value(&self, value: &Value) -> CliResult<String> {
        match self.options.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .map(|s| s.trim_end().to_string())
                .map_err(|err| CliError::Other(anyhow!("failed to format YAML: {err}"))),
            _ => serde_json::to_string_pretty(value)
                .map_err(|err| CliError::Other(anyhow!("failed to format JSON: {err}"))),
        }
    }

    /// Dry-run output
    pub fn render_request(&self, request: &RequestDescription) -> CliResult<String> {
        match self.options.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let mut value = serde_json::to_value(request)?;
                if let Value::Object(map) = &mut value {
                    map.insert("url".to_string(), Value::String(request.full_url()));
                    map.remove("query");
                }
                self.render_value(&value)
            }
            _ => Ok(format!("DRY RUN\n{}", request)),
        }
    }

    /// Minimal error document for structured output modes
    pub fn error_envelope(&self, error: &CliError) -> Option<String> {
        if !self.options.format.is_structured() {
            return None;
        }
        let mut envelope = json!({
            "success": false,
            "msg": error.to_string(),
            "exitCode": error.exit_code(),
        });
        if let Some(status) = error.status() {
            envelope["status"] = json!(status);
        }
        self.render_value(&envelope).ok()
    }

    fn select_columns(&self, columns: &[ColumnDef]) -> Vec<ColumnDef> {
        if self.options.fields.is_empty() {
            return columns.to_vec();
        }
        self.options
            .fields
            .iter()
            .map(|field| {
                columns
                    .iter()
                    .find(|c| c.header.eq_ignore_ascii_case(field) || c.json_path == *field)
                    .cloned()
                    .unwrap_or_else(|| ColumnDef::new(field, field))
            })
            .collect()
    }

    /// Apply `--fields` to the record(s) under `key`
    fn filter_wrapped(&self, response: &Value, key: &str) -> Value {
        if self.options.fields.is_empty() {
            return response.clone();
        }
        let mut filtered = response.clone();
        if let Some(inner) = filtered.get_mut(key) {
            *inner = match &*inner {
                Value::Array(items) => Value::Array(items.iter().map(|i| self.pick_fields(i)).collect()),
                other => self.pick_fields(other),
            };
        }
        filtered
    }

    fn pick_fields(&self, record: &Value) -> Value {
        let mut picked = Map::new();
        for field in &self.options.fields {
            let path: Vec<&str> = field.split('.').collect();
            if let Some(value) = record.as_object().and_then(|m| crate::options::payload::get_path(m, &path)) {
                crate::options::payload::set_path(&mut picked, &path, value.clone());
            }
        }
        Value::Object(picked)
    }
}

/// Extract a display value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let mut current = item;

    for part in path.split('.') {
        // Handle array index
        let next = match part.parse::<usize>() {
            Ok(idx) => current.get(idx),
            Err(_) => current.get(part),
        };
        current = match next {
            Some(v) => v,
            None => return String::new(),
        };
    }

    display_value(current)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            if arr.iter().all(|v| !v.is_object() && !v.is_array()) {
                arr.iter().map(display_value).collect::<Vec<_>>().join(", ")
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "[object]".to_string()),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table
}

/// comfy-table pads every cell; drop the trailing padding of each line
fn table_text(table: &Table) -> String {
    table
        .to_string()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table(rows: &[Value], columns: &[ColumnDef]) -> String {
    let mut table = new_table();
    table.set_header(columns.iter().map(|c| c.header.to_uppercase()));
    for row in rows {
        table.add_row(columns.iter().map(|c| extract_json_value(row, &c.json_path)));
    }
    table_text(&table)
}

fn render_details(record: &Value, columns: &[ColumnDef]) -> String {
    let mut table = new_table();
    for column in columns {
        table.add_row(vec![
            format!("{}:", column.header),
            extract_json_value(record, &column.json_path),
        ]);
    }
    if let Some(labels) = table.column_mut(0) {
        labels.set_cell_alignment(CellAlignment::Right);
    }
    table_text(&table)
}

fn render_csv(rows: &[Value], columns: &[ColumnDef]) -> CliResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let write = |writer: &mut csv::Writer<Vec<u8>>| -> Result<(), csv::Error> {
        writer.write_record(columns.iter().map(|c| c.header.as_str()))?;
        for row in rows {
            writer.write_record(columns.iter().map(|c| extract_json_value(row, &c.json_path)))?;
        }
        Ok(())
    };
    write(&mut writer).map_err(|err| CliError::Other(anyhow!("failed to format CSV: {err}")))?;
    let bytes = writer
        .into_inner()
        .map_err(|err| CliError::Other(anyhow!("failed to format CSV: {err}")))?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}
