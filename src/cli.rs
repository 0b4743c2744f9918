//! Command-line surface
//!
//! `cloudctl [GLOBAL] <resource> <verb> [ARGS]`. The resource name is taken
//! as an external subcommand and looked up in the registry; the verb and its
//! flags are parsed by a second parser shared by every resource.

use crate::api::{ApiChoiceSource, ApiClient, Query};
use crate::config::{Config, SessionContext};
use crate::error::{CliError, CliResult, EXIT_FAILURE, EXIT_OK};
use crate::options::payload::{load_payload_file, parse_overrides};
use crate::options::{PromptMode, TerminalPrompter};
use crate::output::{OutputFormat, RenderOptions, ResultRenderer};
use crate::resource::{get_registry, CrudDispatcher, Invocation, ResourceDescriptor, Verb};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use tracing::Level;

/// Command-line client for a cloud-management REST API
#[derive(Parser, Debug)]
#[command(name = "cloudctl", version = crate::VERSION, about, long_about = None)]
pub struct Cli {
    /// Base URL of the remote appliance
    #[arg(long, env = "CLOUDCTL_URL")]
    pub remote_url: Option<String>,

    /// Access token sent as a bearer token
    #[arg(long, env = "CLOUDCTL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    pub log_level: LogLevel,

    /// Alternate configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the resource types this client knows
    Resources,
    /// `<resource> <verb> ...`
    #[command(external_subcommand)]
    Resource(Vec<String>),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Verb parser applied after the resource name
#[derive(Parser, Debug)]
struct ResourceCommand {
    #[command(subcommand)]
    verb: VerbCommand,
}

#[derive(Subcommand, Debug)]
enum VerbCommand {
    /// List records
    List(ListArgs),
    /// Show one record
    Get(TargetArgs),
    /// Create a record
    Add(AddArgs),
    /// Update a record
    Update(UpdateArgs),
    /// Delete a record
    Remove(RemoveArgs),
    /// Ask the server to refresh a record
    Refresh(UpdateArgs),
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct FormatArgs {
    /// JSON output
    #[arg(long)]
    json: bool,
    /// YAML output
    #[arg(long)]
    yaml: bool,
    /// CSV output
    #[arg(long)]
    csv: bool,
}

impl FormatArgs {
    fn selected(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else if self.yaml {
            Some(OutputFormat::Yaml)
        } else if self.csv {
            Some(OutputFormat::Csv)
        } else {
            None
        }
    }
}

#[derive(Args, Debug, Default)]
struct CommonArgs {
    /// Parent record (id or name) for scoped resources
    #[arg(long)]
    parent: Option<String>,

    #[command(flatten)]
    format: FormatArgs,

    /// Only show these fields
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Print the request instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Option override, e.g. -O config.port=443
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    /// Never prompt; use defaults and fail on missing required options
    #[arg(short = 'N', long)]
    no_prompt: bool,

    /// Suppress success output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    Asc,
    Desc,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Page size
    #[arg(short, long)]
    max: Option<u32>,

    /// Records to skip
    #[arg(short, long)]
    offset: Option<u32>,

    /// Sort by field
    #[arg(short, long)]
    sort: Option<String>,

    #[arg(long, value_enum)]
    direction: Option<Direction>,

    /// Search phrase
    #[arg(long)]
    search: Option<String>,

    /// Extra query parameter
    #[arg(short = 'Q', long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Id or name
    target: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Name of the new record
    name: Option<String>,

    #[command(flatten)]
    common: CommonArgs,

    /// Request body from a JSON or YAML file
    #[arg(long, value_name = "FILE")]
    payload: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Id or name
    target: String,

    #[command(flatten)]
    common: CommonArgs,

    /// Request body from a JSON or YAML file
    #[arg(long, value_name = "FILE")]
    payload: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RemoveArgs {
    /// Id or name
    target: String,

    #[command(flatten)]
    common: CommonArgs,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Extra query parameter, e.g. -Q force=true
    #[arg(short = 'Q', long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,
}

/// Split `key=value` query arguments
fn parse_query_pairs(pairs: &[String]) -> CliResult<Query> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| CliError::usage(format!("invalid query '{}', expected key=value", pair)))
        })
        .collect()
}

impl ListArgs {
    fn query(&self, config: &Config) -> CliResult<Query> {
        let mut query = Vec::new();
        if let Some(max) = self.max.or(config.page_size) {
            query.push(("max".to_string(), max.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), sort.clone()));
        }
        if let Some(direction) = self.direction {
            let direction = match direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            query.push(("direction".to_string(), direction.to_string()));
        }
        if let Some(search) = &self.search {
            query.push(("phrase".to_string(), search.clone()));
        }
        query.extend(parse_query_pairs(&self.query)?);
        Ok(query)
    }
}

/// Parsed verb plus the common flags it carried
struct Request {
    invocation: Invocation,
    common: CommonArgs,
    payload: Option<PathBuf>,
}

impl VerbCommand {
    fn into_request(self, config: &Config) -> CliResult<Request> {
        let (invocation, common, payload) = match self {
            VerbCommand::List(args) => {
                let mut invocation = Invocation::new(Verb::List);
                invocation.query = args.query(config)?;
                (invocation, args.common, None)
            }
            VerbCommand::Get(args) => (Invocation::new(Verb::Get).with_target(&args.target), args.common, None),
            VerbCommand::Add(args) => {
                let mut invocation = Invocation::new(Verb::Add);
                invocation.target = args.name;
                (invocation, args.common, args.payload)
            }
            VerbCommand::Update(args) => (
                Invocation::new(Verb::Update).with_target(&args.target),
                args.common,
                args.payload,
            ),
            VerbCommand::Refresh(args) => (
                Invocation::new(Verb::Refresh).with_target(&args.target),
                args.common,
                args.payload,
            ),
            VerbCommand::Remove(args) => {
                let mut invocation = Invocation::new(Verb::Remove).with_target(&args.target);
                invocation.auto_confirm = args.yes;
                invocation.query = parse_query_pairs(&args.query)?;
                (invocation, args.common, None)
            }
        };
        Ok(Request {
            invocation,
            common,
            payload,
        })
    }
}

/// Entry point used by the binary; returns the process exit code
pub async fn run(cli: Cli) -> i32 {
    let Cli {
        remote_url,
        token,
        config,
        command,
        ..
    } = cli;
    match command {
        Command::Resources => {
            print_resources();
            EXIT_OK
        }
        Command::Resource(args) => {
            run_resource(args, remote_url.as_deref(), token.as_deref(), config).await
        }
    }
}

fn print_resources() {
    let registry = get_registry();
    let width = registry.keys().iter().map(|k| k.len()).max().unwrap_or(0);
    for key in registry.keys() {
        if let Some(descriptor) = registry.get(key) {
            let verbs: Vec<&str> = descriptor.verbs.iter().map(|v| v.as_str()).collect();
            println!("{:<width$}  {} ({})", key, descriptor.plural_name, verbs.join(", "), width = width);
        }
    }
}

async fn run_resource(
    args: Vec<String>,
    remote_url: Option<&str>,
    token: Option<&str>,
    config_path: Option<PathBuf>,
) -> i32 {
    let Some(key) = args.first() else {
        eprintln!("missing resource name");
        return EXIT_FAILURE;
    };
    let Some(descriptor) = get_registry().get(key) else {
        eprintln!("unknown resource '{}'. Run `cloudctl resources` to list them.", key);
        return EXIT_FAILURE;
    };

    let command = match ResourceCommand::try_parse_from(&args) {
        Ok(command) => command,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { EXIT_FAILURE } else { EXIT_OK };
        }
    };

    let config = match config_path {
        Some(path) => match Config::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err);
                return err.exit_code();
            }
        },
        None => Config::load(),
    };

    let request = match command.verb.into_request(&config) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{}", err);
            return err.exit_code();
        }
    };
    let renderer = ResultRenderer::new(RenderOptions {
        format: request
            .common
            .format
            .selected()
            .unwrap_or_else(|| config.effective_format()),
        fields: request.common.fields.clone(),
        quiet: request.common.quiet,
    });

    match execute(descriptor, request, &config, remote_url, token, renderer).await {
        Ok(code) => code,
        Err((err, renderer)) => {
            if let Some(envelope) = renderer.error_envelope(&err) {
                println!("{}", envelope);
            }
            eprintln!("{}", err);
            err.exit_code()
        }
    }
}

async fn execute(
    descriptor: &ResourceDescriptor,
    request: Request,
    config: &Config,
    remote_url: Option<&str>,
    token: Option<&str>,
    renderer: ResultRenderer,
) -> Result<i32, (CliError, ResultRenderer)> {
    let prepared = prepare(request, config, remote_url, token);
    let (invocation, session) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return Err((err, renderer)),
    };
    let client = match ApiClient::new(session) {
        Ok(client) => client,
        Err(err) => return Err((err, renderer)),
    };
    tracing::debug!(
        "{} {} against {} (request {})",
        descriptor.key,
        invocation.verb,
        client.session.base_url,
        client.session.request_id
    );

    let choices = ApiChoiceSource::new(&client);
    let mut prompter = TerminalPrompter;
    let mut dispatcher = CrudDispatcher::new(get_registry(), &client, &choices, &mut prompter, renderer);

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let outcome = dispatcher.execute(descriptor, invocation, &mut out, &mut err).await;
    Ok(outcome.exit_code)
}

/// Overrides, payload file and session for one invocation
fn prepare(
    request: Request,
    config: &Config,
    remote_url: Option<&str>,
    token: Option<&str>,
) -> CliResult<(Invocation, SessionContext)> {
    let Request {
        mut invocation,
        common,
        payload,
    } = request;
    invocation.parent = common.parent;
    invocation.dry_run = common.dry_run;
    invocation.overrides = parse_overrides(&common.options)?;
    invocation.mode = if common.no_prompt {
        PromptMode::NonInteractive
    } else {
        PromptMode::Interactive
    };
    if let Some(path) = payload {
        invocation.raw_payload = Some(load_payload_file(&path)?);
    }
    let session = SessionContext::from_config(config, remote_url, token)?;
    Ok((invocation, session))
}
