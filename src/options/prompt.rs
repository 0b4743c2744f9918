//! Prompt engine
//!
//! Walks an ordered list of [`FieldSpec`]s and produces the nested value map
//! for a request body. Values come from overrides first, then from the
//! terminal (interactive mode) or from defaults (non-interactive mode).

use super::choices::{match_choice, ChoiceProvider, ChoiceResolver};
use super::field::{scalar_string, values_match, Choice, ChoiceSource, FieldKind, FieldSpec};
use super::payload::{flatten_context, get_path, normalize_bool, normalize_checkboxes, set_path, ValueMap};
use crate::error::{CliError, CliResult};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Interactive,
    /// Never touch the terminal; missing required values are errors
    NonInteractive,
}

/// Terminal input used by the engine. Empty answers mean "nothing supplied".
pub trait Prompter {
    fn input(&mut self, field: &FieldSpec, default: Option<&str>) -> CliResult<String>;

    fn password(&mut self, field: &FieldSpec) -> CliResult<String>;

    fn checkbox(&mut self, field: &FieldSpec, default: bool) -> CliResult<bool>;

    /// Index of the picked choice, `None` if the user skipped
    fn select(&mut self, field: &FieldSpec, choices: &[Choice], default: Option<usize>) -> CliResult<Option<usize>>;

    fn multi_select(&mut self, field: &FieldSpec, choices: &[Choice], defaults: &[bool]) -> CliResult<Vec<usize>>;

    /// Yes/no gate before destructive operations
    fn confirm(&mut self, message: &str) -> CliResult<bool>;
}

/// [`Prompter`] backed by dialoguer on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn prompt_text(field: &FieldSpec) -> String {
        let mut text = field.display_label().to_string();
        if field.required {
            text.push_str(" *");
        }
        if let Some(desc) = &field.description {
            text.push_str(&format!(" ({})", desc));
        }
        text
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, field: &FieldSpec, default: Option<&str>) -> CliResult<String> {
        let mut input = dialoguer::Input::<String>::new();
        input.with_prompt(Self::prompt_text(field)).allow_empty(true);
        if let Some(default) = default {
            input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn password(&mut self, field: &FieldSpec) -> CliResult<String> {
        let mut password = dialoguer::Password::new();
        password
            .with_prompt(Self::prompt_text(field))
            .allow_empty_password(true);
        Ok(password.interact()?)
    }

    fn checkbox(&mut self, field: &FieldSpec, default: bool) -> CliResult<bool> {
        let mut confirm = dialoguer::Confirm::new();
        confirm.with_prompt(Self::prompt_text(field)).default(default);
        Ok(confirm.interact()?)
    }

    fn select(&mut self, field: &FieldSpec, choices: &[Choice], default: Option<usize>) -> CliResult<Option<usize>> {
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
        let mut select = dialoguer::Select::new();
        select.with_prompt(Self::prompt_text(field)).items(&labels);
        if let Some(index) = default {
            select.default(index);
        }
        Ok(select.interact_opt()?)
    }

    fn multi_select(&mut self, field: &FieldSpec, choices: &[Choice], defaults: &[bool]) -> CliResult<Vec<usize>> {
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
        let mut select = dialoguer::MultiSelect::new();
        select
            .with_prompt(Self::prompt_text(field))
            .items(&labels)
            .defaults(defaults);
        Ok(select.interact()?)
    }

    fn confirm(&mut self, message: &str) -> CliResult<bool> {
        let mut confirm = dialoguer::Confirm::new();
        confirm.with_prompt(message).default(false);
        Ok(confirm.interact()?)
    }
}

pub struct PromptEngine<'a, P: ChoiceProvider, T: Prompter> {
    provider: &'a P,
    prompter: &'a mut T,
    /// Values visible to choice parameters as `$name` (e.g. `parentId`)
    context: ValueMap,
    /// Namespaces merged into their parent once prompting is done
    flatten_contexts: Vec<String>,
}

impl<'a, P: ChoiceProvider, T: Prompter> PromptEngine<'a, P, T> {
    pub fn new(provider: &'a P, prompter: &'a mut T) -> Self {
        Self {
            provider,
            prompter,
            context: Map::new(),
            flatten_contexts: vec!["domain".to_string()],
        }
    }

    pub fn with_context(mut self, context: ValueMap) -> Self {
        self.context = context;
        self
    }

    pub fn with_flatten_contexts(mut self, contexts: Vec<String>) -> Self {
        self.flatten_contexts = contexts;
        self
    }

    /// Resolve `fields` in declaration order into a value map
    pub async fn run(&mut self, fields: &[FieldSpec], overrides: &ValueMap, mode: PromptMode) -> CliResult<ValueMap> {
        super::field::validate_unique(fields)?;
        let mut resolver = ChoiceResolver::new(self.provider, self.context.clone());
        let mut values = Map::new();

        for field in fields {
            if !dependency_met(field, &values) {
                tracing::debug!("Skipping option {} (dependency not met)", field.key());
                continue;
            }

            let path = field.path();
            let value = match get_path(overrides, &path).filter(|v| !v.is_null()) {
                Some(supplied) => Some(coerce_override(field, supplied)?),
                None => match mode {
                    PromptMode::Interactive => self.ask(field, &mut resolver, &values).await?,
                    PromptMode::NonInteractive => fallback(field)?,
                },
            };

            if let Some(value) = value {
                set_path(&mut values, &path, value);
            }
        }

        normalize_checkboxes(&mut values, &checkbox_paths(fields, &[]));
        for context in &self.flatten_contexts {
            flatten_context(&mut values, context);
        }
        Ok(values)
    }

    async fn ask(
        &mut self,
        field: &FieldSpec,
        resolver: &mut ChoiceResolver<'_, P>,
        values: &ValueMap,
    ) -> CliResult<Option<Value>> {
        match field.kind {
            FieldKind::Hidden => fallback(field),
            FieldKind::Checkbox => {
                let default = field
                    .default
                    .as_ref()
                    .map(|d| normalize_bool(d) == Value::Bool(true))
                    .unwrap_or(false);
                Ok(Some(Value::Bool(self.prompter.checkbox(field, default)?)))
            }
            FieldKind::Select | FieldKind::MultiSelect => {
                let choices = match &field.choices {
                    Some(source) => resolver.resolve(source, values).await?,
                    None => Vec::new(),
                };
                if choices.is_empty() {
                    if field.required {
                        return Err(CliError::NoChoicesAvailable { field: field.key() });
                    }
                    return Ok(None);
                }
                if field.kind == FieldKind::Select {
                    self.ask_select(field, &choices)
                } else {
                    self.ask_multi_select(field, &choices)
                }
            }
            FieldKind::Password => loop {
                let answer = self.prompter.password(field)?;
                if !answer.is_empty() {
                    return Ok(Some(Value::String(answer)));
                }
                if let Some(default) = &field.default {
                    return Ok(Some(default.clone()));
                }
                if !field.required {
                    return Ok(None);
                }
            },
            FieldKind::Text | FieldKind::Number | FieldKind::Code => {
                let default = field.default.as_ref().and_then(scalar_string);
                loop {
                    let answer = self.prompter.input(field, default.as_deref())?;
                    let answer = answer.trim();
                    if !answer.is_empty() {
                        return Ok(Some(coerce_scalar(field, answer)));
                    }
                    if let Some(default) = &field.default {
                        return Ok(Some(default.clone()));
                    }
                    if !field.required {
                        return Ok(None);
                    }
                    tracing::debug!("Required option {} left empty, asking again", field.key());
                }
            }
        }
    }

    fn ask_select(&mut self, field: &FieldSpec, choices: &[Choice]) -> CliResult<Option<Value>> {
        let default = field
            .default
            .as_ref()
            .and_then(|d| choices.iter().position(|c| values_match(&c.value, d)));
        loop {
            if let Some(index) = self.prompter.select(field, choices, default)? {
                if let Some(choice) = choices.get(index) {
                    return Ok(Some(choice.value.clone()));
                }
            }
            if let Some(index) = default {
                return Ok(Some(choices[index].value.clone()));
            }
            if !field.required {
                return Ok(None);
            }
            tracing::debug!("Required option {} left unselected, asking again", field.key());
        }
    }

    fn ask_multi_select(&mut self, field: &FieldSpec, choices: &[Choice]) -> CliResult<Option<Value>> {
        let preset: Vec<Value> = match &field.default {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        let defaults: Vec<bool> = choices
            .iter()
            .map(|c| preset.iter().any(|d| values_match(&c.value, d)))
            .collect();
        loop {
            let picked = self.prompter.multi_select(field, choices, &defaults)?;
            if !picked.is_empty() {
                let selected = picked
                    .into_iter()
                    .filter_map(|i| choices.get(i).map(|c| c.value.clone()))
                    .collect();
                return Ok(Some(Value::Array(selected)));
            }
            if !field.required {
                return Ok(None);
            }
            tracing::debug!("Required option {} left unselected, asking again", field.key());
        }
    }
}

/// Final locations of every checkbox field, after flattening `contexts`
pub fn checkbox_paths(fields: &[FieldSpec], contexts: &[String]) -> Vec<Vec<String>> {
    fields
        .iter()
        .filter(|f| f.kind == FieldKind::Checkbox)
        .map(|f| {
            let mut path = f.path();
            if path.len() > 1 && contexts.contains(&path[0]) {
                path.remove(0);
            }
            path
        })
        .collect()
}

fn dependency_met(field: &FieldSpec, values: &ValueMap) -> bool {
    let (Some(dep), Some(path)) = (&field.depends_on, field.dependency_path()) else {
        return true;
    };
    get_path(values, &path)
        .map(|actual| values_match(actual, &dep.equals))
        .unwrap_or(false)
}

/// Value for a field nobody answered: its default, or an error if required
fn fallback(field: &FieldSpec) -> CliResult<Option<Value>> {
    match &field.default {
        Some(default) => Ok(Some(default.clone())),
        None if field.required => Err(CliError::MissingRequiredField { field: field.key() }),
        None => Ok(None),
    }
}

fn coerce_scalar(field: &FieldSpec, raw: &str) -> Value {
    if field.kind == FieldKind::Number {
        if let Ok(int) = raw.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(float) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(float);
        }
    }
    Value::String(raw.to_string())
}

/// Apply the field's type rules to a value that came from an override
fn coerce_override(field: &FieldSpec, supplied: &Value) -> CliResult<Value> {
    match field.kind {
        FieldKind::Checkbox => Ok(normalize_bool(supplied)),
        FieldKind::Number => Ok(match supplied {
            Value::String(s) => coerce_scalar(field, s.trim()),
            other => other.clone(),
        }),
        FieldKind::Select => match &field.choices {
            Some(ChoiceSource::Static(choices)) => {
                match_choice(choices, supplied).ok_or_else(|| invalid_choice(field, supplied, choices))
            }
            _ => Ok(supplied.clone()),
        },
        FieldKind::MultiSelect => {
            let items: Vec<Value> = match supplied {
                Value::String(s) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            match &field.choices {
                Some(ChoiceSource::Static(choices)) => items
                    .iter()
                    .map(|item| match_choice(choices, item).ok_or_else(|| invalid_choice(field, item, choices)))
                    .collect::<CliResult<Vec<_>>>()
                    .map(Value::Array),
                _ => Ok(Value::Array(items)),
            }
        }
        _ => Ok(supplied.clone()),
    }
}

fn invalid_choice(field: &FieldSpec, supplied: &Value, choices: &[Choice]) -> CliError {
    CliError::InvalidChoice {
        field: field.key(),
        value: scalar_string(supplied).unwrap_or_else(|| supplied.to_string()),
        expected: choices
            .iter()
            .filter_map(|c| scalar_string(&c.value))
            .collect(),
    }
}
