use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use eyre::Result;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use tracing::{Level, debug, info};
use visitstore::record::DATE_FORMAT;
use visitstore::sample::sample_drafts;
use visitstore::{
    Command, Config, ConsoleNotifier, CsvRepository, FileActivityLog, Filter, Notifier, Options, ReportKind, Role,
    Session, SortField, Store, VisitChanges, VisitDraft, VisitKind,
};

#[derive(Parser)]
#[command(name = "visitstore")]
#[command(about = "VisitStore CLI - Patient visit records with undo/redo and CSV persistence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the store directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    store_path: PathBuf,

    /// Visit data file (default: <store-path>/patient_visits.csv)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Fee rate file, JSON or YAML (default: <store-path>/rates.json, then the user config dir)
    #[arg(long)]
    rates: Option<PathBuf>,

    /// Activity log file (default: <store-path>/activity_log.txt)
    #[arg(long)]
    activity_log: Option<PathBuf>,

    /// Role to act as: admin or receptionist
    #[arg(short, long, default_value = "admin")]
    role: Role,

    /// Generate this many sample visits when the data file does not exist yet
    #[arg(long, default_value_t = 0)]
    sample_data: usize,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// One line typed at the interactive prompt
#[derive(Parser)]
#[command(name = "visitstore", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new visit
    Add(AddArgs),

    /// Change fields of an existing visit (admin only)
    Update(UpdateArgs),

    /// Delete a visit (admin only)
    Delete {
        id: u32,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show a single visit
    Show { id: u32 },

    /// List all visits
    List {
        #[arg(long)]
        json: bool,
    },

    /// Search visits by one criterion
    Find(FindArgs),

    /// List visits sorted by a field
    Sort {
        #[arg(long, value_enum, default_value = "date")]
        by: SortKey,

        #[arg(long)]
        json: bool,
    },

    /// Generate a report
    Report {
        #[command(subcommand)]
        report: ReportCommand,

        #[arg(long, global = true)]
        json: bool,
    },

    /// Undo the last change made in this session
    Undo,

    /// Redo the last undone change
    Redo,

    /// Interactive prompt; undo/redo history lasts until exit
    Shell,
}

#[derive(Args)]
struct AddArgs {
    #[arg(short, long)]
    patient: String,

    /// Visit date and time, "YYYY-MM-DD HH:MM"
    #[arg(short, long, value_parser = parse_visit_date)]
    date: Option<NaiveDateTime>,

    /// Consultation, FollowUp or Emergency
    #[arg(short, long, value_parser = parse_kind)]
    kind: VisitKind,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    doctor: String,

    /// Duration in minutes
    #[arg(long)]
    duration: u32,

    /// Add even if the patient has another visit within 30 minutes
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
struct UpdateArgs {
    id: u32,

    #[arg(short, long)]
    patient: Option<String>,

    #[arg(short, long, value_parser = parse_visit_date)]
    date: Option<NaiveDateTime>,

    #[arg(short, long, value_parser = parse_kind)]
    kind: Option<VisitKind>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    doctor: Option<String>,

    #[arg(long)]
    duration: Option<u32>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("criterion").required(true).args(["patient", "doctor", "date", "kind"])))]
struct FindArgs {
    /// Patient name contains (case-insensitive)
    #[arg(short, long)]
    patient: Option<String>,

    /// Doctor name contains (case-insensitive)
    #[arg(long)]
    doctor: Option<String>,

    /// Calendar day, "YYYY-MM-DD"
    #[arg(short, long)]
    date: Option<NaiveDate>,

    #[arg(short, long, value_parser = parse_kind)]
    kind: Option<VisitKind>,

    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Summary of one visit
    Summary { id: u32 },

    /// Number of visits of each kind
    ByKind,

    /// Visits per day in the Sunday-to-Saturday week containing a date
    Weekly {
        /// Any day of the week (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    Date,
    Patient,
    Doctor,
}

impl From<SortKey> for SortField {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Date => SortField::Date,
            SortKey::Patient => SortField::PatientName,
            SortKey::Doctor => SortField::DoctorName,
        }
    }
}

impl Commands {
    /// Convert to a session command; `None` for `shell`
    fn into_command(self) -> Option<Command> {
        let command = match self {
            Commands::Add(args) => Command::Add {
                draft: VisitDraft {
                    patient_name: args.patient,
                    visit_date: args.date,
                    kind: args.kind,
                    description: args.description,
                    doctor_name: args.doctor,
                    duration_minutes: args.duration,
                },
                force: args.force,
            },
            Commands::Update(args) => Command::Update {
                id: args.id,
                changes: VisitChanges {
                    patient_name: args.patient,
                    visit_date: args.date,
                    kind: args.kind,
                    description: args.description,
                    doctor_name: args.doctor,
                    duration_minutes: args.duration,
                },
            },
            Commands::Delete { id, yes } => Command::Delete { id, force: yes },
            Commands::Show { id } => Command::Show { id },
            Commands::List { json } => Command::List { json },
            Commands::Find(args) => {
                let json = args.json;
                Command::Find {
                    filter: args.filter()?,
                    json,
                }
            }
            Commands::Sort { by, json } => Command::Sort { field: by.into(), json },
            Commands::Report { report, json } => Command::Report {
                kind: match report {
                    ReportCommand::Summary { id } => ReportKind::Summary(id),
                    ReportCommand::ByKind => ReportKind::CountByKind,
                    ReportCommand::Weekly { date } => {
                        ReportKind::Weekly(date.unwrap_or_else(|| Local::now().date_naive()))
                    }
                },
                json,
            },
            Commands::Undo => Command::Undo,
            Commands::Redo => Command::Redo,
            Commands::Shell => return None,
        };
        Some(command)
    }
}

impl FindArgs {
    fn filter(self) -> Option<Filter> {
        if let Some(name) = self.patient {
            return Some(Filter::PatientName(name));
        }
        if let Some(name) = self.doctor {
            return Some(Filter::DoctorName(name));
        }
        if let Some(date) = self.date {
            return Some(Filter::Date(date));
        }
        self.kind.map(Filter::Kind)
    }
}

fn parse_visit_date(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD HH:MM", s))
}

fn parse_kind(s: &str) -> Result<VisitKind, String> {
    let wanted = s.trim().to_lowercase().replace('-', "");
    VisitKind::ALL
        .into_iter()
        .find(|kind| kind.as_str().to_lowercase() == wanted)
        .ok_or_else(|| format!("unknown visit type '{}', expected Consultation, FollowUp or Emergency", s))
}

/// Split a prompt line into words, honoring single and double quotes
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn run_shell(session: &mut Session, notifier: &dyn Notifier) -> Result<()> {
    notifier.message(&format!(
        "Logged in as {}. Type a command (e.g. `list`, `add --help`), or `exit` to quit.",
        session.role()
    ));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("visitstore> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let words = match split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                notifier.error(&e);
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit") | Some("quit") => break,
            _ => {}
        }

        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(e) => {
                e.print()?;
                continue;
            }
        };

        match parsed.command.into_command() {
            Some(command) => {
                session.execute(command);
            }
            None => notifier.warning("Already in the shell."),
        }
    }

    if !session.flush() {
        notifier.error("Some changes could not be saved.");
    }
    session.logout();
    notifier.message("Goodbye.");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing; stdout is reserved for command output
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = Config::resolve(Options {
        store_path: cli.store_path,
        data_file: cli.data_file,
        rates_file: cli.rates,
        activity_log: cli.activity_log,
        role: Some(cli.role),
        sample_count: cli.sample_data,
        interactive: io::stdin().is_terminal(),
    })?;

    let notifier: Rc<dyn Notifier> = Rc::new(ConsoleNotifier::new(config.interactive));
    let mut store = Store::open(
        Box::new(CsvRepository::new(&config.data_file)),
        config.rates,
        notifier.clone(),
    );

    if store.is_fresh() && config.sample_count > 0 {
        let drafts = sample_drafts(&mut rand::thread_rng(), config.sample_count, Local::now().naive_local());
        // A failed save has already been reported; the samples stay in memory
        if let Ok(added) = store.seed(drafts) {
            notifier.message(&format!("Generated {} sample visits.", added));
        }
    }

    let activity = FileActivityLog::new(&config.activity_log);
    info!(role = %config.role, data_file = ?config.data_file, "Starting session");
    let mut session = Session::new(store, config.role, notifier.clone(), Box::new(activity));

    match cli.command.into_command() {
        Some(command) => {
            let ok = session.execute(command);
            debug!(ok, "Command finished");
            if !ok {
                process::exit(1);
            }
        }
        None => run_shell(&mut session, notifier.as_ref())?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_quotes() {
        assert_eq!(
            split_words(r#"add -p "Jane Doe" --doctor 'Dr. Smith' --duration 20"#).unwrap(),
            vec!["add", "-p", "Jane Doe", "--doctor", "Dr. Smith", "--duration", "20"]
        );
        assert_eq!(split_words("  list  ").unwrap(), vec!["list"]);
        assert_eq!(split_words(r#"find --doctor """#).unwrap(), vec!["find", "--doctor", ""]);
        assert!(split_words(r#"add -p "Jane"#).is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_kind("follow-up").unwrap(), VisitKind::FollowUp);
        assert_eq!(parse_kind("EMERGENCY").unwrap(), VisitKind::Emergency);
        assert!(parse_kind("surgery").is_err());

        let date = parse_visit_date("2024-03-01 09:30").unwrap();
        assert_eq!(date.format(DATE_FORMAT).to_string(), "2024-03-01 09:30");
        assert_eq!(parse_visit_date("2024-03-01").unwrap().format(DATE_FORMAT).to_string(), "2024-03-01 00:00");
        assert!(parse_visit_date("yesterday").is_err());
    }

    #[test]
    fn test_shell_line_parses_into_command() {
        let parsed = ShellLine::try_parse_from(["find", "--patient", "jane"]).unwrap();
        assert_eq!(
            parsed.command.into_command(),
            Some(Command::Find {
                filter: Filter::PatientName("jane".to_string()),
                json: false
            })
        );

        assert!(ShellLine::try_parse_from(["find"]).is_err());
        assert!(ShellLine::try_parse_from(["shell"]).unwrap().command.into_command().is_none());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
