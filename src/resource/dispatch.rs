//! CRUD dispatcher
//!
//! One generic state machine runs every verb of every resource:
//! `Resolving -> (DryRun | Executing) -> Rendering -> Done`, with `Failed`
//! reachable from any step. Errors end the invocation; nothing is retried.

use super::registry::{ResourceDescriptor, ResourceRegistry, Verb};
use super::resolve::{classify, resolve_target, Resolution, Target};
use crate::api::{Operation, Query, ResourceFactory, ResourceInterface};
use crate::error::{CliError, CliResult, Outcome};
use crate::options::payload::{ensure_update_has_fields, merge_nested};
use crate::options::{ChoiceProvider, PayloadBuilder, PromptEngine, PromptMode, Prompter, ValueMap};
use crate::output::ResultRenderer;
use serde_json::{Map, Value};
use std::io::Write;

/// Where an invocation currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    DryRun,
    Executing,
    Rendering,
    Done,
    Failed,
}

/// Everything one command line asks for
#[derive(Debug, Clone)]
pub struct Invocation {
    pub verb: Verb,
    /// Id or name of the record (`add` takes an optional name here)
    pub target: Option<String>,
    /// Id or name of the parent record for scoped resources
    pub parent: Option<String>,
    pub query: Query,
    /// `-O key=value` overrides, already nested
    pub overrides: ValueMap,
    /// `--payload` body; bypasses prompting
    pub raw_payload: Option<ValueMap>,
    pub mode: PromptMode,
    pub dry_run: bool,
    /// Skip the confirmation gate of destructive verbs
    pub auto_confirm: bool,
}

impl Invocation {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            target: None,
            parent: None,
            query: Vec::new(),
            overrides: Map::new(),
            raw_payload: None,
            mode: PromptMode::Interactive,
            dry_run: false,
            auto_confirm: false,
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }
}

/// Body builder for a descriptor's create and update payloads
fn payload_builder(descriptor: &ResourceDescriptor) -> PayloadBuilder {
    PayloadBuilder::new(&descriptor.object_key)
        .with_checkboxes(descriptor.checkbox_paths())
        .with_flatten_contexts(descriptor.flatten_contexts.clone())
}

pub struct CrudDispatcher<'a, F: ResourceFactory, C: ChoiceProvider, T: Prompter> {
    registry: &'a ResourceRegistry,
    factory: &'a F,
    choices: &'a C,
    prompter: &'a mut T,
    renderer: ResultRenderer,
    phase: Phase,
}

impl<'a, F: ResourceFactory, C: ChoiceProvider, T: Prompter> CrudDispatcher<'a, F, C, T> {
    pub fn new(
        registry: &'a ResourceRegistry,
        factory: &'a F,
        choices: &'a C,
        prompter: &'a mut T,
        renderer: ResultRenderer,
    ) -> Self {
        Self {
            registry,
            factory,
            choices,
            prompter,
            renderer,
            phase: Phase::Resolving,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!("Dispatcher {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Run one invocation. Results go to `out`; diagnostics go to `err`,
    /// except the error envelope of structured formats, which goes to `out`.
    pub async fn execute(
        &mut self,
        descriptor: &ResourceDescriptor,
        invocation: Invocation,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Outcome {
        self.phase = Phase::Resolving;
        let verb = invocation.verb;
        match self.run(descriptor, invocation, out, err).await {
            Ok(()) => {
                self.enter(Phase::Done);
                Outcome::success()
            }
            Err(error) => {
                self.enter(Phase::Failed);
                tracing::error!("{} {} failed: {}", descriptor.key, verb, error);
                if let Some(envelope) = self.renderer.error_envelope(&error) {
                    let _ = writeln!(out, "{}", envelope);
                }
                let _ = writeln!(err, "{}", error);
                Outcome::from(&error)
            }
        }
    }

    async fn run(
        &mut self,
        descriptor: &ResourceDescriptor,
        invocation: Invocation,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> CliResult<()> {
        let verb = invocation.verb;
        if !descriptor.supports(verb) {
            return Err(CliError::Unsupported {
                resource: descriptor.display_name.clone(),
                verb: verb.to_string(),
            });
        }

        let factory = self.factory;
        let parent_id = self.resolve_parent(descriptor, &invocation, err).await?;
        let parent_id = parent_id.as_deref();
        let resource = factory.resource(descriptor);

        let target_id = if verb.needs_target() {
            let arg = invocation.target.as_deref().ok_or_else(|| {
                CliError::usage(format!("{} {} requires an id or name", descriptor.key, verb))
            })?;
            Some(self.resolve_id(&resource, descriptor, parent_id, arg, invocation.dry_run, err).await?)
        } else {
            None
        };

        let operation = self.build_operation(descriptor, &invocation, parent_id, target_id).await?;

        if invocation.dry_run {
            self.enter(Phase::DryRun);
            let request = resource.describe(parent_id, &operation)?;
            writeln!(out, "{}", self.renderer.render_request(&request)?)?;
            return Ok(());
        }

        if verb == Verb::Remove && !invocation.auto_confirm {
            let message = format!(
                "Are you sure you want to delete the {} {}?",
                descriptor.display_name,
                invocation.target.as_deref().unwrap_or_default()
            );
            if !self.prompter.confirm(&message)? {
                return Err(CliError::Aborted);
            }
        }

        self.enter(Phase::Executing);
        let response = resource.call(parent_id, &operation).await?;

        self.enter(Phase::Rendering);
        if self.renderer.options.quiet {
            return Ok(());
        }
        let text = self.render(descriptor, &invocation, &response)?;
        if !text.is_empty() {
            writeln!(out, "{}", text)?;
        }
        Ok(())
    }

    /// Parent id for scoped resources, `None` otherwise
    async fn resolve_parent(
        &self,
        descriptor: &ResourceDescriptor,
        invocation: &Invocation,
        err: &mut dyn Write,
    ) -> CliResult<Option<String>> {
        let Some(parent) = self.registry.parent_of(descriptor)? else {
            return Ok(None);
        };
        let Some(arg) = invocation.parent.as_deref() else {
            return Err(CliError::MissingParent {
                resource: descriptor.display_name.clone(),
                parent: parent.display_name.clone(),
            });
        };
        let factory = self.factory;
        let resource = factory.resource(parent);
        let id = self
            .resolve_id(&resource, parent, None, arg, invocation.dry_run, err)
            .await?;
        Ok(Some(id))
    }

    /// Id for a positional argument. Dry runs never look names up.
    async fn resolve_id<R: ResourceInterface>(
        &self,
        resource: &R,
        descriptor: &ResourceDescriptor,
        parent_id: Option<&str>,
        arg: &str,
        dry_run: bool,
        err: &mut dyn Write,
    ) -> CliResult<String> {
        if dry_run {
            if let Target::Name(name) = classify(descriptor, arg) {
                tracing::debug!("Dry run: {} '{}' left unresolved", descriptor.display_name, name);
                return Ok(name);
            }
        }
        match resolve_target(resource, descriptor, parent_id, arg).await? {
            Resolution::Found(id) => Ok(id),
            Resolution::NotFound => {
                writeln!(
                    err,
                    "Run `cloudctl {} list` to see the available {}.",
                    descriptor.key, descriptor.plural_name
                )?;
                Err(CliError::NotFound {
                    kind: descriptor.display_name.clone(),
                    query: arg.to_string(),
                })
            }
            Resolution::Ambiguous(candidates) => {
                writeln!(err, "{}", self.renderer.render_candidates(&candidates, &descriptor.columns))?;
                Err(CliError::Ambiguous {
                    kind: descriptor.plural_name.clone(),
                    query: arg.to_string(),
                    count: candidates.len(),
                })
            }
        }
    }

    async fn build_operation(
        &mut self,
        descriptor: &ResourceDescriptor,
        invocation: &Invocation,
        parent_id: Option<&str>,
        target_id: Option<String>,
    ) -> CliResult<Operation> {
        let id = target_id.unwrap_or_default();
        let query = invocation.query.clone();
        Ok(match invocation.verb {
            Verb::List => Operation::List { query },
            Verb::Get => Operation::Get { id, query },
            Verb::Remove => Operation::Destroy { id, query },
            Verb::Add => {
                let mut overrides = invocation.overrides.clone();
                if let Some(name) = &invocation.target {
                    if !overrides.contains_key(&descriptor.name_field) {
                        overrides.insert(descriptor.name_field.clone(), Value::String(name.clone()));
                    }
                }
                let prompted = match &invocation.raw_payload {
                    Some(_) => Map::new(),
                    None => {
                        self.prompt(descriptor, &descriptor.fields, &overrides, invocation.mode, parent_id)
                            .await?
                    }
                };
                let payload =
                    payload_builder(descriptor).build(invocation.raw_payload.as_ref(), &prompted, &overrides);
                Operation::Create {
                    payload: Value::Object(payload),
                }
            }
            Verb::Update => {
                let prompted = match &invocation.raw_payload {
                    Some(_) => Map::new(),
                    None => {
                        let fields: Vec<_> = descriptor.fields.iter().map(|f| f.for_update()).collect();
                        self.prompt(
                            descriptor,
                            &fields,
                            &invocation.overrides,
                            PromptMode::NonInteractive,
                            parent_id,
                        )
                        .await?
                    }
                };
                let payload = payload_builder(descriptor).build(
                    invocation.raw_payload.as_ref(),
                    &prompted,
                    &invocation.overrides,
                );
                ensure_update_has_fields(&payload, &descriptor.object_key)?;
                Operation::Update {
                    id,
                    payload: Value::Object(payload),
                }
            }
            Verb::Refresh => {
                let base = invocation.raw_payload.clone().unwrap_or_default();
                Operation::Refresh {
                    id,
                    payload: Value::Object(merge_nested(base, &invocation.overrides)),
                }
            }
        })
    }

    async fn prompt(
        &mut self,
        descriptor: &ResourceDescriptor,
        fields: &[crate::options::FieldSpec],
        overrides: &ValueMap,
        mode: PromptMode,
        parent_id: Option<&str>,
    ) -> CliResult<ValueMap> {
        let mut context = Map::new();
        if let Some(parent_id) = parent_id {
            context.insert("parentId".to_string(), Value::String(parent_id.to_string()));
        }
        let mut engine = PromptEngine::new(self.choices, &mut *self.prompter)
            .with_context(context)
            .with_flatten_contexts(descriptor.flatten_contexts.clone());
        engine.run(fields, overrides, mode).await
    }

    fn render(&self, descriptor: &ResourceDescriptor, invocation: &Invocation, response: &Value) -> CliResult<String> {
        let renderer = &self.renderer;
        match invocation.verb {
            Verb::List => renderer.render_list(
                response,
                &descriptor.list_key,
                &descriptor.columns,
                &descriptor.plural_name,
            ),
            Verb::Get | Verb::Add | Verb::Update => {
                renderer.render_record(response, &descriptor.object_key, &descriptor.columns)
            }
            Verb::Remove | Verb::Refresh if renderer.format().is_structured() => renderer.render_value(response),
            Verb::Remove => Ok(format!(
                "Removed {} {}",
                descriptor.display_name,
                invocation.target.as_deref().unwrap_or_default()
            )),
            Verb::Refresh => Ok(format!(
                "Refresh requested for {} {}",
                descriptor.display_name,
                invocation.target.as_deref().unwrap_or_default()
            )),
        }
    }
}
