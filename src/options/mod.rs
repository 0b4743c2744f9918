//! Option prompting and payload construction
//!
//! Commands describe their inputs as [`FieldSpec`] lists. The
//! [`PromptEngine`] turns those into a nested value map, asking the user or
//! falling back to defaults, and the [`PayloadBuilder`] layers that map with
//! `-O` overrides and raw `--payload` documents into a request body.
//!
//! # Module Structure
//!
//! - [`field`] - field descriptors and choice sources
//! - [`choices`] - memoized choice resolution
//! - [`prompt`] - the prompt engine and terminal prompter
//! - [`payload`] - nested map helpers and the payload builder

pub mod choices;
pub mod field;
pub mod payload;
pub mod prompt;

pub use choices::{ChoiceProvider, ChoiceResolver};
pub use field::{Choice, ChoiceSource, DependsOn, FieldKind, FieldSpec};
pub use payload::{build_payload, merge_nested, PayloadBuilder, ValueMap};
pub use prompt::{PromptEngine, PromptMode, Prompter, TerminalPrompter};
