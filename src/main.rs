//! mg CLI - A local event tracker for fans attending meet-and-greet events.

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser};
use meetgreet::action_log;
use meetgreet::cli::{
    Cli, Commands, ConfigCommands, ExpenseCommands, LineCommands, MessageCommands,
    ReportCommands, ScheduleCommands, ScriptCommands, SettingsCommands,
};
use meetgreet::commands::{self, Output, parse_datetime, parse_opt};
use meetgreet::config::{
    ConfigOverrides, OutputFormat, Resolved, ResolvedConfig, resolve_config, resolve_data_dir,
};
use meetgreet::models::{
    ExpenseDraft, ExpensePatch, PracticeScriptDraft, ReportDraft, ScheduleDraft, SchedulePatch,
    Speaker, UiSettingsPatch,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = match resolve_data_dir(cli.data_dir.clone()) {
        Ok(dir) => dir,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };

    let overrides = config_overrides(&cli);
    let config = match resolve_config(&data_dir.value, &overrides) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };
    let human = config.output_format() == OutputFormat::Human;
    tracing::debug!(data_dir = %data_dir.value.display(), source = %data_dir.source, "resolved data directory");

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let data_path = data_dir.value.clone();
    let result = run_command(cli.command, data_dir, &config, &overrides, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // A failed log write never fails the command
    if config.action_log_enabled() {
        if let Err(e) =
            action_log::log_action(&data_path, &cmd_name, args_json, success, error, duration)
        {
            tracing::warn!(error = %e, "failed to write action log");
        }
    }

    if let Err(e) = result {
        exit_with_error(&e, human);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if let Some(Commands::Rehearse {
        grace_ms: Some(grace_ms),
        ..
    }) = &cli.command
    {
        overrides = overrides.with_grace_ms(*grace_ms);
    }
    overrides
}

fn exit_with_error(e: &meetgreet::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

fn parse_dt(input: Option<String>) -> Result<Option<DateTime<Utc>>, meetgreet::Error> {
    input.as_deref().map(parse_datetime).transpose()
}

/// `--clear-x` wins over `--x <value>`; neither leaves the field unchanged.
fn parse_dt_patch(
    input: Option<String>,
    clear: bool,
) -> Result<Option<Option<DateTime<Utc>>>, meetgreet::Error> {
    if clear {
        return Ok(Some(None));
    }
    Ok(parse_dt(input)?.map(Some))
}

fn run_command(
    command: Option<Commands>,
    data_dir: Resolved<PathBuf>,
    config: &ResolvedConfig,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), meetgreet::Error> {
    let dir = data_dir.value.as_path();
    match command {
        None => {
            let _ = Cli::command().print_help();
            println!();
        }

        Some(Commands::Init) => output(&commands::init(dir)?, human),

        Some(Commands::Schedule { command }) => match command {
            ScheduleCommands::Add {
                title,
                date,
                location,
                category,
                description,
                notes,
                ticket_deadline,
                payment_deadline,
            } => {
                let draft = ScheduleDraft {
                    title: Some(title),
                    event_date: Some(parse_datetime(&date)?),
                    location,
                    category: parse_opt(category.as_deref())?,
                    description,
                    notes,
                    ticket_deadline: parse_dt(ticket_deadline)?,
                    payment_deadline: parse_dt(payment_deadline)?,
                    ..Default::default()
                };
                output(&commands::schedule_add(dir, draft)?, human);
            }
            ScheduleCommands::List {
                category,
                month,
                open,
                done,
            } => {
                let month = month
                    .as_deref()
                    .map(|m| commands::parse_month(Some(m)))
                    .transpose()?;
                let completed = match (open, done) {
                    (true, _) => Some(false),
                    (_, true) => Some(true),
                    _ => None,
                };
                let result = commands::schedule_list(
                    dir,
                    parse_opt(category.as_deref())?,
                    month,
                    completed,
                )?;
                output(&result, human);
            }
            ScheduleCommands::Show { id } => output(&commands::schedule_show(dir, &id)?, human),
            ScheduleCommands::Update {
                id,
                title,
                date,
                location,
                category,
                description,
                notes,
                ticket_deadline,
                clear_ticket_deadline,
                payment_deadline,
                clear_payment_deadline,
            } => {
                let patch = SchedulePatch {
                    title,
                    event_date: parse_dt(date)?,
                    location,
                    category: parse_opt(category.as_deref())?,
                    description,
                    notes,
                    ticket_deadline: parse_dt_patch(ticket_deadline, clear_ticket_deadline)?,
                    payment_deadline: parse_dt_patch(payment_deadline, clear_payment_deadline)?,
                    ..Default::default()
                };
                output(&commands::schedule_update(dir, &id, patch)?, human);
            }
            ScheduleCommands::Done { id } => output(&commands::schedule_done(dir, &id)?, human),
            ScheduleCommands::Delete { id } => {
                output(&commands::schedule_delete(dir, &id)?, human)
            }
            ScheduleCommands::Upcoming { limit } => {
                output(&commands::schedule_upcoming(dir, limit)?, human)
            }
            ScheduleCommands::Day { date } => {
                let date = date.as_deref().map(commands::parse_date).transpose()?;
                output(&commands::schedule_day(dir, date)?, human);
            }
            ScheduleCommands::Calendar { month } => {
                let (year, month) = commands::parse_month(month.as_deref())?;
                output(&commands::schedule_calendar(dir, year, month)?, human);
            }
            ScheduleCommands::Attach { id, path } => {
                output(&commands::schedule_attach(dir, &id, &path)?, human)
            }
        },

        Some(Commands::Expense { command }) => match command {
            ExpenseCommands::Add {
                title,
                amount,
                category,
                method,
                date,
                paid,
                notes,
            } => {
                let draft = ExpenseDraft {
                    title: Some(title),
                    amount: Some(amount),
                    category: parse_opt(category.as_deref())?,
                    expense_date: parse_dt(date)?,
                    payment_method: parse_opt(method.as_deref())?,
                    is_paid: Some(paid),
                    notes,
                };
                output(&commands::expense_add(dir, draft)?, human);
            }
            ExpenseCommands::List {
                month,
                category,
                unpaid,
            } => {
                let month = month
                    .as_deref()
                    .map(|m| commands::parse_month(Some(m)))
                    .transpose()?;
                let result =
                    commands::expense_list(dir, month, parse_opt(category.as_deref())?, unpaid)?;
                output(&result, human);
            }
            ExpenseCommands::Update {
                id,
                title,
                amount,
                category,
                method,
                date,
                notes,
            } => {
                let patch = ExpensePatch {
                    title,
                    amount,
                    category: parse_opt(category.as_deref())?,
                    expense_date: parse_dt(date)?,
                    payment_method: parse_opt(method.as_deref())?,
                    notes,
                    ..Default::default()
                };
                output(&commands::expense_update(dir, &id, patch)?, human);
            }
            ExpenseCommands::Paid { id } => output(&commands::expense_paid(dir, &id)?, human),
            ExpenseCommands::Delete { id } => output(&commands::expense_delete(dir, &id)?, human),
            ExpenseCommands::Summary { month, all } => {
                let month = if all {
                    None
                } else {
                    Some(commands::parse_month(month.as_deref())?)
                };
                output(&commands::expense_summary(dir, month)?, human);
            }
        },

        Some(Commands::Script { command }) => match command {
            ScriptCommands::Add {
                title,
                event_type,
                description,
                favorite,
            } => {
                let draft = PracticeScriptDraft {
                    title: Some(title),
                    description,
                    event_type: parse_opt(event_type.as_deref())?,
                    is_favorite: Some(favorite),
                };
                output(&commands::script_add(dir, draft)?, human);
            }
            ScriptCommands::List { favorites } => {
                output(&commands::script_list(dir, favorites)?, human)
            }
            ScriptCommands::Show { id } => output(&commands::script_show(dir, &id)?, human),
            ScriptCommands::Favorite { id } => {
                output(&commands::script_favorite(dir, &id)?, human)
            }
            ScriptCommands::Delete { id } => output(&commands::script_delete(dir, &id)?, human),
            ScriptCommands::Lines { id, lines } => {
                output(&commands::script_lines(dir, &id, &lines)?, human)
            }
        },

        Some(Commands::Line { command }) => match command {
            LineCommands::Add {
                script_id,
                content,
                speaker,
            } => {
                let speaker: Speaker = speaker.parse()?;
                output(
                    &commands::line_add(dir, &script_id, speaker, &content)?,
                    human,
                );
            }
            LineCommands::Delete { id } => output(&commands::line_delete(dir, &id)?, human),
        },

        Some(Commands::Rehearse { script_id, .. }) => {
            let summary = commands::rehearse(dir, &script_id, config.grace(), human)?;
            output(&summary, human);
        }

        Some(Commands::Report { command }) => match command {
            ReportCommands::Add {
                title,
                event_name,
                date,
                location,
                rating,
                notes,
            } => {
                let draft = ReportDraft {
                    title: Some(title),
                    event_date: parse_dt(date)?,
                    event_name,
                    location,
                    rating,
                    notes,
                };
                output(&commands::report_add(dir, draft)?, human);
            }
            ReportCommands::List => output(&commands::report_list(dir)?, human),
            ReportCommands::Show { id } => output(&commands::report_show(dir, &id)?, human),
            ReportCommands::Delete { id } => output(&commands::report_delete(dir, &id)?, human),
        },

        Some(Commands::Message { command }) => match command {
            MessageCommands::Add {
                report_id,
                content,
                sender,
                at,
            } => {
                let sender: Speaker = sender.parse()?;
                let result =
                    commands::message_add(dir, &report_id, sender, &content, parse_dt(at)?)?;
                output(&result, human);
            }
            MessageCommands::Delete { id } => {
                output(&commands::message_delete(dir, &id)?, human)
            }
        },

        Some(Commands::Settings { command }) => match command {
            SettingsCommands::Show => output(&commands::settings_show(dir)?, human),
            SettingsCommands::Update {
                theme,
                rate,
                pitch,
                volume,
                animations,
            } => {
                let patch = UiSettingsPatch {
                    theme,
                    narration_rate: rate,
                    narration_pitch: pitch,
                    narration_volume: volume,
                    animations_enabled: animations,
                };
                output(&commands::settings_update(dir, patch)?, human);
            }
        },

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => output(&commands::config_show(data_dir, overrides)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(dir, &key, &value)?, human)
            }
        },

        Some(Commands::Version) => output(&commands::version(), human),
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize command to extract name and arguments for logging.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        None => ("help".to_string(), serde_json::json!({})),

        Some(Commands::Init) => ("init".to_string(), serde_json::json!({})),

        Some(Commands::Schedule { command }) => match command {
            ScheduleCommands::Add {
                title,
                date,
                location,
                category,
                description,
                notes,
                ticket_deadline,
                payment_deadline,
            } => (
                "schedule add".to_string(),
                serde_json::json!({
                    "title": title,
                    "date": date,
                    "location": location,
                    "category": category,
                    "description": description,
                    "notes": notes,
                    "ticket_deadline": ticket_deadline,
                    "payment_deadline": payment_deadline,
                }),
            ),
            ScheduleCommands::List {
                category,
                month,
                open,
                done,
            } => (
                "schedule list".to_string(),
                serde_json::json!({ "category": category, "month": month, "open": open, "done": done }),
            ),
            ScheduleCommands::Show { id } => {
                ("schedule show".to_string(), serde_json::json!({ "id": id }))
            }
            ScheduleCommands::Update {
                id,
                title,
                date,
                location,
                category,
                description,
                notes,
                ticket_deadline,
                clear_ticket_deadline,
                payment_deadline,
                clear_payment_deadline,
            } => (
                "schedule update".to_string(),
                serde_json::json!({
                    "id": id,
                    "title": title,
                    "date": date,
                    "location": location,
                    "category": category,
                    "description": description,
                    "notes": notes,
                    "ticket_deadline": ticket_deadline,
                    "clear_ticket_deadline": clear_ticket_deadline,
                    "payment_deadline": payment_deadline,
                    "clear_payment_deadline": clear_payment_deadline,
                }),
            ),
            ScheduleCommands::Done { id } => {
                ("schedule done".to_string(), serde_json::json!({ "id": id }))
            }
            ScheduleCommands::Delete { id } => {
                ("schedule delete".to_string(), serde_json::json!({ "id": id }))
            }
            ScheduleCommands::Upcoming { limit } => (
                "schedule upcoming".to_string(),
                serde_json::json!({ "limit": limit }),
            ),
            ScheduleCommands::Day { date } => {
                ("schedule day".to_string(), serde_json::json!({ "date": date }))
            }
            ScheduleCommands::Calendar { month } => (
                "schedule calendar".to_string(),
                serde_json::json!({ "month": month }),
            ),
            ScheduleCommands::Attach { id, path } => (
                "schedule attach".to_string(),
                serde_json::json!({ "id": id, "path": path }),
            ),
        },

        Some(Commands::Expense { command }) => match command {
            ExpenseCommands::Add {
                title,
                amount,
                category,
                method,
                date,
                paid,
                notes,
            } => (
                "expense add".to_string(),
                serde_json::json!({
                    "title": title,
                    "amount": amount,
                    "category": category,
                    "method": method,
                    "date": date,
                    "paid": paid,
                    "notes": notes,
                }),
            ),
            ExpenseCommands::List {
                month,
                category,
                unpaid,
            } => (
                "expense list".to_string(),
                serde_json::json!({ "month": month, "category": category, "unpaid": unpaid }),
            ),
            ExpenseCommands::Update {
                id,
                title,
                amount,
                category,
                method,
                date,
                notes,
            } => (
                "expense update".to_string(),
                serde_json::json!({
                    "id": id,
                    "title": title,
                    "amount": amount,
                    "category": category,
                    "method": method,
                    "date": date,
                    "notes": notes,
                }),
            ),
            ExpenseCommands::Paid { id } => {
                ("expense paid".to_string(), serde_json::json!({ "id": id }))
            }
            ExpenseCommands::Delete { id } => {
                ("expense delete".to_string(), serde_json::json!({ "id": id }))
            }
            ExpenseCommands::Summary { month, all } => (
                "expense summary".to_string(),
                serde_json::json!({ "month": month, "all": all }),
            ),
        },

        Some(Commands::Script { command }) => match command {
            ScriptCommands::Add {
                title,
                event_type,
                description,
                favorite,
            } => (
                "script add".to_string(),
                serde_json::json!({
                    "title": title,
                    "event_type": event_type,
                    "description": description,
                    "favorite": favorite,
                }),
            ),
            ScriptCommands::List { favorites } => (
                "script list".to_string(),
                serde_json::json!({ "favorites": favorites }),
            ),
            ScriptCommands::Show { id } => {
                ("script show".to_string(), serde_json::json!({ "id": id }))
            }
            ScriptCommands::Favorite { id } => {
                ("script favorite".to_string(), serde_json::json!({ "id": id }))
            }
            ScriptCommands::Delete { id } => {
                ("script delete".to_string(), serde_json::json!({ "id": id }))
            }
            ScriptCommands::Lines { id, lines } => (
                "script lines".to_string(),
                serde_json::json!({ "id": id, "line_count": lines.len() }),
            ),
        },

        Some(Commands::Line { command }) => match command {
            LineCommands::Add {
                script_id,
                content,
                speaker,
            } => (
                "line add".to_string(),
                serde_json::json!({ "script_id": script_id, "content": content, "speaker": speaker }),
            ),
            LineCommands::Delete { id } => {
                ("line delete".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Rehearse {
            script_id,
            grace_ms,
        }) => (
            "rehearse".to_string(),
            serde_json::json!({ "script_id": script_id, "grace_ms": grace_ms }),
        ),

        Some(Commands::Report { command }) => match command {
            ReportCommands::Add {
                title,
                event_name,
                date,
                location,
                rating,
                notes,
            } => (
                "report add".to_string(),
                serde_json::json!({
                    "title": title,
                    "event_name": event_name,
                    "date": date,
                    "location": location,
                    "rating": rating,
                    "notes": notes,
                }),
            ),
            ReportCommands::List => ("report list".to_string(), serde_json::json!({})),
            ReportCommands::Show { id } => {
                ("report show".to_string(), serde_json::json!({ "id": id }))
            }
            ReportCommands::Delete { id } => {
                ("report delete".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Message { command }) => match command {
            MessageCommands::Add {
                report_id,
                content,
                sender,
                at,
            } => (
                "message add".to_string(),
                serde_json::json!({
                    "report_id": report_id,
                    "content": content,
                    "sender": sender,
                    "at": at,
                }),
            ),
            MessageCommands::Delete { id } => {
                ("message delete".to_string(), serde_json::json!({ "id": id }))
            }
        },

        Some(Commands::Settings { command }) => match command {
            SettingsCommands::Show => ("settings show".to_string(), serde_json::json!({})),
            SettingsCommands::Update {
                theme,
                rate,
                pitch,
                volume,
                animations,
            } => (
                "settings update".to_string(),
                serde_json::json!({
                    "theme": theme,
                    "rate": rate,
                    "pitch": pitch,
                    "volume": volume,
                    "animations": animations,
                }),
            ),
        },

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => ("config show".to_string(), serde_json::json!({})),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({ "key": key, "value": value }),
            ),
        },

        Some(Commands::Version) => ("version".to_string(), serde_json::json!({})),
    }
}
