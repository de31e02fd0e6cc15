//! CLI argument definitions for meetgreet.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// meetgreet - Plan events, track spending and rehearse what you want to say.
///
/// Start with `mg init`, then add schedules, expenses, practice scripts and
/// event reports.
#[derive(Parser, Debug)]
#[command(name = "mg")]
#[command(author, version, about = "A local event tracker for fans attending meet-and-greet events", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Use <path> as the data directory. Can also be set via MG_DATA_DIR.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and database
    Init,

    /// Event schedule commands
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },

    /// Expense tracking commands
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },

    /// Practice script commands
    Script {
        #[command(subcommand)]
        command: ScriptCommands,
    },

    /// Dialogue line commands (lines of a practice script)
    Line {
        #[command(subcommand)]
        command: LineCommands,
    },

    /// Rehearse a practice script interactively
    ///
    /// Counterpart lines are printed; press Enter to say each of your lines.
    /// Type `p` to pause, `r` to resume, `s` to skip, `q` to quit.
    /// Ctrl-C resets the session.
    Rehearse {
        /// Script ID (or unique prefix)
        script_id: String,

        /// Pause after each counterpart line, in milliseconds
        #[arg(long)]
        grace_ms: Option<u64>,
    },

    /// Event report commands
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Chat message commands (messages of an event report)
    Message {
        #[command(subcommand)]
        command: MessageCommands,
    },

    /// Display and narration settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version and build information
    Version,
}

/// Schedule subcommands
#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Add a scheduled event
    Add {
        /// Event title
        title: String,

        /// Event date and time (YYYY-MM-DD, "YYYY-MM-DD HH:MM" or RFC 3339)
        #[arg(short, long)]
        date: String,

        /// Venue
        #[arg(short, long)]
        location: Option<String>,

        /// Category (live, meet_and_greet, release, festival, fan_meeting, other)
        #[arg(short, long)]
        category: Option<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Ticket application deadline
        #[arg(long)]
        ticket_deadline: Option<String>,

        /// Payment deadline
        #[arg(long)]
        payment_deadline: Option<String>,
    },

    /// List scheduled events
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Only events in this month (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,

        /// Only events not yet done
        #[arg(long, conflicts_with = "done")]
        open: bool,

        /// Only events already done
        #[arg(long)]
        done: bool,
    },

    /// Show an event
    Show {
        /// Schedule ID (or unique prefix)
        id: String,
    },

    /// Update an event
    Update {
        /// Schedule ID (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long, conflicts_with = "clear_ticket_deadline")]
        ticket_deadline: Option<String>,

        /// Remove the ticket deadline
        #[arg(long)]
        clear_ticket_deadline: bool,

        #[arg(long, conflicts_with = "clear_payment_deadline")]
        payment_deadline: Option<String>,

        /// Remove the payment deadline
        #[arg(long)]
        clear_payment_deadline: bool,
    },

    /// Toggle whether an event is done
    Done {
        /// Schedule ID (or unique prefix)
        id: String,
    },

    /// Delete an event and its image
    Delete {
        /// Schedule ID (or unique prefix)
        id: String,
    },

    /// Open events from today onwards, soonest first
    Upcoming {
        /// Show at most this many events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Events on one day
    Day {
        /// Date (YYYY-MM-DD); defaults to today
        date: Option<String>,
    },

    /// Event count per day of a month
    Calendar {
        /// Month (YYYY-MM); defaults to the current month
        month: Option<String>,
    },

    /// Attach an image (e.g. a ticket photo) to an event
    Attach {
        /// Schedule ID (or unique prefix)
        id: String,

        /// Image file to copy into the data directory
        path: PathBuf,
    },
}

/// Expense subcommands
#[derive(Subcommand, Debug)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// What was bought
        title: String,

        /// Amount in whole currency units
        #[arg(short, long, allow_negative_numbers = true)]
        amount: i64,

        /// Category (ticket, transportation, accommodation, goods, food, gift, other)
        #[arg(short, long)]
        category: Option<String>,

        /// Payment method (cash, credit_card, electronic_money, bank_transfer, other)
        #[arg(short = 'p', long)]
        method: Option<String>,

        /// Date of the expense; defaults to now
        #[arg(short, long)]
        date: Option<String>,

        /// Mark as already paid
        #[arg(long)]
        paid: bool,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List expenses
    List {
        /// Only expenses in this month (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Only unpaid expenses
        #[arg(long)]
        unpaid: bool,
    },

    /// Update an expense
    Update {
        /// Expense ID (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        amount: Option<i64>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        method: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Toggle whether an expense is paid
    Paid {
        /// Expense ID (or unique prefix)
        id: String,
    },

    /// Delete an expense
    Delete {
        /// Expense ID (or unique prefix)
        id: String,
    },

    /// Totals and breakdowns by category and payment method
    Summary {
        /// Month to summarize (YYYY-MM); defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Summarize every expense instead of one month
        #[arg(long, conflicts_with = "month")]
        all: bool,
    },
}

/// Practice script subcommands
#[derive(Subcommand, Debug)]
pub enum ScriptCommands {
    /// Create a practice script
    Add {
        /// Script title
        title: String,

        /// Event type (meet_and_greet, handshake, photo_session, signing, talk_event, other)
        #[arg(short, long)]
        event_type: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },

    /// List practice scripts
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Show a script with its lines
    Show {
        /// Script ID (or unique prefix)
        id: String,
    },

    /// Toggle favorite
    Favorite {
        /// Script ID (or unique prefix)
        id: String,
    },

    /// Delete a script and all of its lines
    Delete {
        /// Script ID (or unique prefix)
        id: String,
    },

    /// Replace all lines of a script
    ///
    /// Each --line is `speaker: text`, e.g. `--line "self: Hi!"
    /// --line "counterpart: Thanks for coming"`. Lines with empty text are
    /// dropped.
    Lines {
        /// Script ID (or unique prefix)
        id: String,

        /// A line as `speaker: text` (repeatable, in order)
        #[arg(short, long = "line")]
        lines: Vec<String>,
    },
}

/// Dialogue line subcommands
#[derive(Subcommand, Debug)]
pub enum LineCommands {
    /// Append a line to a script
    Add {
        /// Script ID (or unique prefix)
        script_id: String,

        /// What is said
        content: String,

        /// Who says it (self, counterpart)
        #[arg(short, long, default_value = "self")]
        speaker: String,
    },

    /// Delete a line; later lines move up
    Delete {
        /// Line ID (or unique prefix)
        id: String,
    },
}

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Write a report about an event you attended
    Add {
        /// Report title
        title: String,

        /// Event name
        #[arg(short, long)]
        event_name: Option<String>,

        /// Event date; defaults to now
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Rating (1-5)
        #[arg(short, long, allow_negative_numbers = true)]
        rating: Option<i64>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List reports
    List,

    /// Show a report with its messages
    Show {
        /// Report ID (or unique prefix)
        id: String,
    },

    /// Delete a report and all of its messages
    Delete {
        /// Report ID (or unique prefix)
        id: String,
    },
}

/// Chat message subcommands
#[derive(Subcommand, Debug)]
pub enum MessageCommands {
    /// Append a message to a report
    Add {
        /// Report ID (or unique prefix)
        report_id: String,

        /// What was said
        content: String,

        /// Who said it (self, counterpart)
        #[arg(short, long, default_value = "self")]
        sender: String,

        /// When it was said; defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete a message; later messages move up
    Delete {
        /// Message ID (or unique prefix)
        id: String,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Update settings
    Update {
        #[arg(long)]
        theme: Option<String>,

        /// Narration rate (0.0-1.0)
        #[arg(long)]
        rate: Option<f32>,

        /// Narration pitch (0.5-2.0)
        #[arg(long)]
        pitch: Option<f32>,

        /// Narration volume (0.0-1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// Enable or disable animations
        #[arg(long)]
        animations: Option<bool>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,

    /// Set a configuration value (output-format, grace-ms, action-log)
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // This will panic if the CLI is misconfigured
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repeated_lines() {
        let cli = Cli::parse_from([
            "mg",
            "script",
            "lines",
            "abc",
            "--line",
            "self: Hi",
            "-l",
            "counterpart: Hello",
        ]);
        match cli.command {
            Some(Commands::Script {
                command: ScriptCommands::Lines { id, lines },
            }) => {
                assert_eq!(id, "abc");
                assert_eq!(lines, vec!["self: Hi", "counterpart: Hello"]);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mg", "expense", "list", "-H", "-vv"]);
        assert!(cli.human_readable);
        assert_eq!(cli.verbose, 2);
    }
}
