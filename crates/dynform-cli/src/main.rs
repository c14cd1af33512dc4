mod backend;
mod wizard;

use backend::{FileBackend, Output};
use clap::{Parser, Subcommand, ValueEnum};
use dynform_spec::{
    EngineConfig, FieldId, FieldType, RenderField, ResponseStore, SchemaService, SubmitOutcome,
    ValidationErrors, Validator, Wizard, build_render_payload, build_step_payload, render_json_ui,
    render_text, schema_document,
};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wizard::{AnswerParseError, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const BACK: &str = ":back";
const CLEAR: &str = "-";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Dynamic form CLI",
    long_about = "Validates, cleans, renders and fills dynform schemas from the terminal"
)]
struct Cli {
    /// Optional engine config JSON (section placement, email check, messages).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a label-keyed response payload against a schema.
    Validate {
        /// Schema JSON, bare or wrapped in a `{success, schema}` envelope.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Response payload JSON keyed by field label.
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
    },
    /// Run the cleanup pass and write the schema that would be persisted.
    Clean {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Output file (stdout when omitted).
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Fill the form step by step on stdin. Type `:back` to return to the
    /// previous step.
    Wizard {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Initial answers as a label-keyed payload.
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
        /// Where the submitted payload goes (stdout when omitted).
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
        /// CBOR draft file, restored on start and updated after every step.
        #[arg(long, value_name = "DRAFT")]
        draft: Option<PathBuf>,
        /// Show status lines and skipped fields.
        #[arg(long, alias = "debug")]
        verbose: bool,
    },
    /// Render one step of the form.
    Render {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
        /// Step number, starting at 1.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        step: u32,
        /// Include validation errors for the step.
        #[arg(long)]
        show_errors: bool,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the JSON Schema of the form schema format.
    JsonSchema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Validate { schema, responses } => run_validate(&config, &schema, &responses),
        Command::Clean { schema, out } => run_clean(&config, &schema, out),
        Command::Wizard {
            schema,
            responses,
            out,
            draft,
            verbose,
        } => run_wizard(
            &config,
            &schema,
            responses.as_deref(),
            out,
            draft.as_deref(),
            verbose,
        ),
        Command::Render {
            schema,
            responses,
            step,
            show_errors,
            format,
        } => run_render(
            &config,
            &schema,
            responses.as_deref(),
            step as usize - 1,
            show_errors,
            format,
        ),
        Command::JsonSchema => {
            println!("{}", serde_json::to_string_pretty(&schema_document()?)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_service(
    config: &EngineConfig,
    schema_path: &Path,
    output: Output,
) -> CliResult<SchemaService<FileBackend>> {
    let mut service = SchemaService::new(FileBackend::new(schema_path, output), config.clone());
    service.load()?;
    debug!(path = %service.backend().schema_path().display(), "schema loaded");
    Ok(service)
}

fn read_json(path: &Path) -> CliResult<Value> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn run_validate(config: &EngineConfig, schema_path: &Path, responses_path: &Path) -> CliResult<()> {
    let service = load_service(config, schema_path, Output::Stdout)?;
    let schema = service.schema();
    let responses = ResponseStore::from_payload(schema, &read_json(responses_path)?);
    let validator = Validator::new(config)?;
    let errors = validator.validate_all(schema, &responses, &schema.all_fields());

    println!(
        "Validation result: {}",
        if errors.is_empty() { "valid" } else { "invalid" }
    );
    describe_validation(&errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(errors: &ValidationErrors) {
    for error in errors.iter() {
        println!("  - {}: {}", error.label, error.message);
    }
}

fn run_clean(config: &EngineConfig, schema_path: &Path, out: Option<PathBuf>) -> CliResult<()> {
    let target = out.clone();
    let mut service = load_service(config, schema_path, Output::from_path(out))?;
    service.save()?;
    if let Some(path) = target {
        println!("Cleaned schema written to {}", path.display());
    }
    Ok(())
}

fn run_render(
    config: &EngineConfig,
    schema_path: &Path,
    responses_path: Option<&Path>,
    step: usize,
    show_errors: bool,
    format: RenderMode,
) -> CliResult<()> {
    let service = load_service(config, schema_path, Output::Stdout)?;
    let schema = service.schema();
    let section = schema.sections.get(step).ok_or_else(|| {
        format!(
            "step {} is out of range; the form has {} step(s)",
            step + 1,
            schema.sections.len()
        )
    })?;
    let responses = match responses_path {
        Some(path) => ResponseStore::from_payload(schema, &read_json(path)?),
        None => ResponseStore::for_schema(schema),
    };
    let validator = Validator::new(config)?;
    let errors = if show_errors {
        validator.validate_section(section, &responses, &schema.all_fields())
    } else {
        ValidationErrors::default()
    };
    let payload = build_step_payload(schema, &responses, step, &validator, &errors);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!(
            "{}",
            serde_json::to_string_pretty(&render_json_ui(&payload))?
        ),
    }
    Ok(())
}

enum StepAction {
    Next,
    Back,
}

enum Prompted {
    Answered,
    Back,
    Retry(AnswerParseError),
}

fn run_wizard(
    config: &EngineConfig,
    schema_path: &Path,
    responses_path: Option<&Path>,
    out: Option<PathBuf>,
    draft_path: Option<&Path>,
    verbose: bool,
) -> CliResult<()> {
    let to_stdout = out.is_none();
    let mut service = load_service(config, schema_path, Output::from_path(out))?;
    let mut wizard = service.start_wizard()?;
    if let Some(path) = responses_path {
        let initial = ResponseStore::from_payload(wizard.schema(), &read_json(path)?);
        wizard = wizard.with_responses(&initial);
    }
    if let Some(path) = draft_path
        && path.exists()
    {
        wizard.restore_draft(&fs::read(path)?)?;
        info!(path = %path.display(), "restored draft");
    }

    let presenter = WizardPresenter::new(Verbosity::from_verbose(verbose));
    if wizard.step_count() == 0 {
        println!("The form has no sections.");
        return Ok(());
    }

    loop {
        presenter.show_step(&build_render_payload(&wizard));
        if let StepAction::Back = fill_step(&mut wizard, &presenter)? {
            wizard.prev();
            continue;
        }
        if let Some(path) = draft_path {
            fs::write(path, wizard.save_draft()?)?;
        }
        if !wizard.is_last_step() {
            if !wizard.next() {
                presenter.show_errors(wizard.errors());
            }
            continue;
        }
        match service.submit(&mut wizard) {
            SubmitOutcome::Submitted(_) | SubmitOutcome::AlreadySubmitted => {
                if let Some(path) = draft_path
                    && path.exists()
                {
                    fs::remove_file(path)?;
                }
                presenter.show_completion(to_stdout);
                return Ok(());
            }
            SubmitOutcome::Invalid(errors) => presenter.show_errors(&errors),
            SubmitOutcome::Failed(err) => {
                if let Some(note) = service.notification() {
                    eprintln!("{}", note.message);
                }
                return Err(err.into());
            }
        }
    }
}

/// Prompts for every visible field of the current step. Visibility is
/// re-checked before each field so earlier answers can reveal later ones.
fn fill_step(wizard: &mut Wizard, presenter: &WizardPresenter) -> CliResult<StepAction> {
    let ids = wizard
        .current_section()
        .map(|section| {
            section
                .fields
                .iter()
                .map(|field| field.id.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    for id in ids {
        loop {
            let payload = build_render_payload(wizard);
            let Some(field) = payload
                .fields
                .into_iter()
                .find(|field| field.id == id.as_str())
            else {
                break;
            };
            if !field.visible {
                presenter.show_hidden(&field.label);
                break;
            }
            presenter.show_prompt(&field);
            match prompt_field(wizard, &id, &field)? {
                Prompted::Answered => break,
                Prompted::Back => return Ok(StepAction::Back),
                Prompted::Retry(err) => presenter.show_parse_error(&err),
            }
        }
    }
    Ok(StepAction::Next)
}

fn prompt_field(wizard: &mut Wizard, id: &FieldId, field: &RenderField) -> CliResult<Prompted> {
    let options = field.options.clone().unwrap_or_default();
    match field.kind {
        FieldType::Text | FieldType::Email | FieldType::Date => {
            let raw = read_input("> ")?;
            if raw == BACK {
                return Ok(Prompted::Back);
            }
            if !raw.is_empty() {
                wizard.set(id, raw)?;
            }
        }
        FieldType::Select | FieldType::Radio => {
            let raw = read_input("> ")?;
            if raw == BACK {
                return Ok(Prompted::Back);
            }
            if !raw.is_empty() {
                match parse_choice(&options, &raw) {
                    Ok(choice) => wizard.set(id, choice)?,
                    Err(err) => return Ok(Prompted::Retry(err)),
                }
            }
        }
        FieldType::Checkbox => {
            let raw = read_input("> ")?;
            if raw == BACK {
                return Ok(Prompted::Back);
            }
            if !raw.is_empty() {
                let wanted = match parse_choices(&options, &raw) {
                    Ok(wanted) => wanted,
                    Err(err) => return Ok(Prompted::Retry(err)),
                };
                let current = wizard
                    .responses()
                    .get(id)
                    .and_then(|answer| answer.as_choices())
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                for option in options.iter() {
                    if current.contains(option) != wanted.contains(option) {
                        wizard.toggle(id, option)?;
                    }
                }
            }
        }
        FieldType::Multiple => {
            let rows = field.rows.clone().unwrap_or_default();
            let columns = field.columns.clone().unwrap_or_default();
            for (row, label) in rows.iter().enumerate() {
                let raw = read_input(&format!("  {}> ", label))?;
                if raw == BACK {
                    return Ok(Prompted::Back);
                }
                if raw.is_empty() {
                    continue;
                }
                let cells = match parse_row_cells(columns.len(), &raw) {
                    Ok(cells) => cells,
                    Err(err) => return Ok(Prompted::Retry(err)),
                };
                for (column, cell) in cells.into_iter().enumerate() {
                    wizard.set_cell(id, row, column, cell)?;
                }
            }
        }
        FieldType::CheckboxMatrix => {
            let rows = field.rows.clone().unwrap_or_default();
            let columns = field.columns.clone().unwrap_or_default();
            let grid = field.current_value.as_array().cloned().unwrap_or_default();
            for (row, label) in rows.iter().enumerate() {
                let raw = read_input(&format!("  {}> ", label))?;
                if raw == BACK {
                    return Ok(Prompted::Back);
                }
                if raw.is_empty() {
                    continue;
                }
                let wanted = match parse_choices(&columns, &raw) {
                    Ok(wanted) => wanted,
                    Err(err) => return Ok(Prompted::Retry(err)),
                };
                for (column, name) in columns.iter().enumerate() {
                    let ticked = grid
                        .get(row)
                        .and_then(|cells| cells.get(column))
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if ticked != wanted.contains(name) {
                        wizard.toggle_cell(id, row, column)?;
                    }
                }
            }
        }
    }
    Ok(Prompted::Answered)
}

/// Accepts an option by 1-based position or by case-insensitive text.
fn parse_choice(options: &[String], raw: &str) -> Result<String, AnswerParseError> {
    let raw = raw.trim();
    if let Ok(position) = raw.parse::<usize>()
        && (1..=options.len()).contains(&position)
    {
        return Ok(options[position - 1].clone());
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("'{}' is not one of the options", raw),
                Some(format!("one of: {}", options.join(", "))),
            )
        })
}

/// Comma separated choices; `-` clears the selection.
fn parse_choices(options: &[String], raw: &str) -> Result<Vec<String>, AnswerParseError> {
    if raw.trim() == CLEAR {
        return Ok(Vec::new());
    }
    let mut chosen = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let choice = parse_choice(options, part)?;
        if !chosen.contains(&choice) {
            chosen.push(choice);
        }
    }
    Ok(chosen)
}

/// Splits a `|`-separated row into at most `width` cells.
fn parse_row_cells(width: usize, raw: &str) -> Result<Vec<String>, AnswerParseError> {
    let cells = raw
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect::<Vec<_>>();
    if cells.len() > width {
        return Err(AnswerParseError::new(
            format!("expected at most {} cell(s), got {}", width, cells.len()),
            Some("cells separated by '|'".to_string()),
        ));
    }
    Ok(cells)
}

fn read_input(prompt: &str) -> CliResult<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input ended before the form was submitted".into());
    }
    Ok(line.trim().to_string())
}
