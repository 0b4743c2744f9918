//! Field descriptors
//!
//! A [`FieldSpec`] describes one input of a resource payload: where it lives
//! in the request body, how it is prompted, and where its choices come from.
//! Resource definitions carry them as JSON; commands may also build them in
//! code when a choice list has to be computed from earlier answers.

use crate::error::CliResult;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Kind of input a field expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Number,
    Checkbox,
    Select,
    #[serde(alias = "multiSelect")]
    MultiSelect,
    Hidden,
    #[serde(alias = "code-block", alias = "code_block")]
    Code,
}

impl FieldKind {
    pub fn has_choices(self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }
}

/// One selectable option
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    #[serde(alias = "name")]
    pub label: String,
    pub value: Value,
}

impl Choice {
    pub fn new(label: &str, value: impl Into<Value>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }

    /// Does `input` name this choice, either by value or by label?
    pub fn matches(&self, input: &str) -> bool {
        scalar_string(&self.value).as_deref() == Some(input) || self.label == input
    }
}

/// Computes choices from the values answered so far
pub type ChoiceCallback = Arc<dyn Fn(&Map<String, Value>) -> CliResult<Vec<Choice>> + Send + Sync>;

/// Where a select field gets its options
#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSource {
    /// Fixed list, returned verbatim
    Static(Vec<Choice>),
    /// Named lookup against the API. Parameter values starting with `$` are
    /// references to earlier answers (`$group.id`) or to `$parentId`.
    Dynamic {
        name: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
    /// Ad-hoc function supplied by the command
    #[serde(skip)]
    Callback { key: String, func: ChoiceCallback },
}

impl ChoiceSource {
    pub fn dynamic(name: &str) -> Self {
        Self::Dynamic {
            name: name.to_string(),
            params: Map::new(),
        }
    }

    pub fn callback<F>(key: &str, func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> CliResult<Vec<Choice>> + Send + Sync + 'static,
    {
        Self::Callback {
            key: key.to_string(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for ChoiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(choices) => f.debug_tuple("Static").field(choices).finish(),
            Self::Dynamic { name, params } => f
                .debug_struct("Dynamic")
                .field("name", name)
                .field("params", params)
                .finish(),
            Self::Callback { key, .. } => f.debug_struct("Callback").field("key", key).finish(),
        }
    }
}

/// Show a field only when another field holds a given value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DependsOn {
    /// Name of the other field. A bare name refers to a sibling in the same
    /// context; a dotted name is a full path.
    pub field: String,
    pub equals: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub depends_on: Option<DependsOn>,
    #[serde(default)]
    pub choices: Option<ChoiceSource>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            context: None,
            label: None,
            kind,
            required: false,
            default: None,
            depends_on: None,
            choices: None,
            description: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn depends_on(mut self, field: &str, equals: impl Into<Value>) -> Self {
        self.depends_on = Some(DependsOn {
            field: field.to_string(),
            equals: equals.into(),
        });
        self
    }

    pub fn with_choices(mut self, source: ChoiceSource) -> Self {
        self.choices = Some(source);
        self
    }

    /// Path of the field inside the value map: context segments then name
    pub fn path(&self) -> Vec<String> {
        let mut path: Vec<String> = self
            .context
            .as_deref()
            .map(|ctx| {
                ctx.split('.')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        path.push(self.name.clone());
        path
    }

    /// Dotted form of [`FieldSpec::path`], used in messages and lookups
    pub fn key(&self) -> String {
        self.path().join(".")
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Path of the field named by `depends_on`
    pub fn dependency_path(&self) -> Option<Vec<String>> {
        let dep = self.depends_on.as_ref()?;
        if dep.field.contains('.') {
            return Some(dep.field.split('.').map(str::to_string).collect());
        }
        let mut path = self.path();
        path.pop();
        path.push(dep.field.clone());
        Some(path)
    }

    /// Copy used by update commands: nothing is required and no default
    /// is injected, so only explicitly supplied values end up in the body.
    pub fn for_update(&self) -> Self {
        let mut field = self.clone();
        field.required = false;
        field.default = None;
        field
    }
}

/// Reject lists where two fields share the same context + name
pub fn validate_unique(fields: &[FieldSpec]) -> CliResult<()> {
    let mut seen = HashSet::new();
    for field in fields {
        let key = field.key();
        if !seen.insert(key.clone()) {
            return Err(anyhow::anyhow!("Duplicate option definition: {}", key).into());
        }
    }
    Ok(())
}

/// String form of a scalar JSON value (`None` for arrays, objects and null)
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose equality used by `depends_on`: `"5"` equals `5`, `"on"` equals `true`
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    if let Value::Bool(b) = expected {
        return super::payload::normalize_bool(actual) == Value::Bool(*b);
    }
    match (scalar_string(actual), scalar_string(expected)) {
        (Some(a), Some(e)) => a == e,
        _ => false,
    }
}
