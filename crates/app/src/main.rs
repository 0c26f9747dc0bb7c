use std::fmt;
use std::io::{self, BufRead, Write};

use rand::rng;
use revise_core::model::{Confidence, Question, QuestionKind, Response, TopicId};
use services::dashboard::{due_count, practiced_percent, topic_reports};
use services::{
    AppServices, Clock, PersistStatus, SessionError, SessionOptions, StudySession, TutorChat,
};
use storage::{ContentCatalogue, RemoteConfig, RemoteSync};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCap { raw: String },
    InvalidTopic { raw: String },
    InvalidDbUrl { raw: String },
    MissingQuestion,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCap { raw } => write!(f, "invalid --cap value: {raw}"),
            ArgsError::InvalidTopic { raw } => write!(f, "invalid --topic value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingQuestion => write!(f, "ask needs a question"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- study [--topic <id>] [--due] [--cap <n>] [common flags]");
    eprintln!("  cargo run -p app -- stats [common flags]");
    eprintln!("  cargo run -p app -- ask   [--topic <id>] <question...> [common flags]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>      default sqlite:revise.sqlite3");
    eprintln!("  --content <path>       default content/catalogue.json");
    eprintln!("  --remote <base_url>    remote progress mirror (needs REVISE_USER_ID)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  REVISE_DB_URL, REVISE_CONTENT, REVISE_REMOTE_URL, REVISE_USER_ID,");
    eprintln!("  REVISE_REMOTE_TOKEN, REVISE_AI_API_KEY, REVISE_AI_BASE_URL, REVISE_AI_MODEL,");
    eprintln!("  RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Study,
    Stats,
    Ask,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "study" => Some(Self::Study),
            "stats" => Some(Self::Stats),
            "ask" => Some(Self::Ask),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    content_path: String,
    remote_url: Option<String>,
    session: SessionOptions,
    question: Vec<String>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("REVISE_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:revise.sqlite3".into()), normalize_sqlite_url);
        let mut content_path =
            std::env::var("REVISE_CONTENT").unwrap_or_else(|_| "content/catalogue.json".into());
        let mut remote_url = None;
        let mut session = SessionOptions::default();
        let mut question = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--content" => content_path = require_value(args, "--content")?,
                "--remote" => remote_url = Some(require_value(args, "--remote")?),
                "--topic" if cmd != Command::Stats => {
                    let value = require_value(args, "--topic")?;
                    let topic: TopicId = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTopic { raw: value.clone() })?;
                    session.topic_id = Some(topic);
                }
                "--due" if cmd == Command::Study => session.due_only = true,
                "--cap" if cmd == Command::Study => {
                    let value = require_value(args, "--cap")?;
                    session.cap = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCap { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Ask && !arg.starts_with("--") => question.push(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Ask && question.is_empty() {
            return Err(ArgsError::MissingQuestion);
        }

        Ok(Self {
            db_url,
            content_path,
            remote_url,
            session,
            question,
        })
    }

    /// `--remote` overrides `REVISE_REMOTE_URL`; the rest comes from the environment.
    fn remote(&self) -> Option<RemoteConfig> {
        let config = RemoteConfig::from_env(self.remote_url.clone());
        if config.is_none() && self.remote_url.is_some() {
            tracing::warn!("remote url given without REVISE_USER_ID, remote sync disabled");
        }
        config
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── TERMINAL PROMPTS ──────────────────────────────────────────────────────────
//

/// Read one trimmed line; `None` on end of input.
fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_response(question: &Question) -> io::Result<Option<Response>> {
    match question.kind {
        QuestionKind::Mcq => {
            for (idx, option) in question.options.iter().enumerate() {
                println!("  [{}] {option}", idx + 1);
            }
            loop {
                let Some(line) = read_line("Your answer: ")? else {
                    return Ok(None);
                };
                match line.parse::<usize>() {
                    Ok(n) if (1..=question.options.len()).contains(&n) => {
                        return Ok(Some(Response::Choice(n - 1)));
                    }
                    _ => println!("Pick a number between 1 and {}.", question.options.len()),
                }
            }
        }
        QuestionKind::ShortAnswer | QuestionKind::Scenario => {
            if read_line("Think of your answer, then press Enter to reveal. ")?.is_none() {
                return Ok(None);
            }
            if let Some(model) = question.correct_answer_text() {
                println!("Model answer: {model}");
            }
            loop {
                let Some(line) = read_line("Did you get it right? [y/n] ")? else {
                    return Ok(None);
                };
                match line.to_ascii_lowercase().as_str() {
                    "y" | "yes" => return Ok(Some(Response::SelfAssessed { correct: true })),
                    "n" | "no" => return Ok(Some(Response::SelfAssessed { correct: false })),
                    _ => println!("Answer y or n."),
                }
            }
        }
    }
}

fn ask_confidence() -> io::Result<Option<Confidence>> {
    loop {
        let Some(line) = read_line("Confidence? [1] low [2] medium [3] high ")? else {
            return Ok(None);
        };
        match line.parse::<u8>().ok().map(Confidence::from_level) {
            Some(Ok(confidence)) if confidence.is_set() => return Ok(Some(confidence)),
            _ => println!("Pick 1, 2 or 3."),
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn study(app: &mut AppServices, options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut session: StudySession = match app.session_loop().start_session(options, &mut rng()) {
        Ok(session) => session,
        Err(SessionError::Empty) => {
            println!("All caught up: nothing matches this session right now.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    while let Some(question) = session.current_question().cloned() {
        let progress = session.progress();
        println!();
        println!(
            "Question {}/{} [{}]",
            progress.answered + 1,
            progress.total,
            question.topic_id
        );
        println!("{}", question.text);

        let Some(response) = ask_response(&question)? else {
            break;
        };
        let Some(confidence) = ask_confidence()? else {
            break;
        };

        let result = app
            .session_loop_mut()
            .answer_current(&mut session, &response, confidence)
            .await?;

        if result.answer.correct {
            println!("Correct.");
        } else {
            println!(
                "Not quite. Answer: {}",
                question.correct_answer_text().unwrap_or("-")
            );
        }
        if !question.explanation.is_empty() {
            println!("{}", question.explanation);
        }
        match &result.persist {
            PersistStatus::Saved {
                remote: RemoteSync::Failed(_),
            } => println!("(saved locally; remote sync will retry on next start)"),
            PersistStatus::LocalFailed(_) => println!("(could not save progress; continuing)"),
            PersistStatus::Saved { .. } => {}
        }
    }

    let now = app.session_loop().progress().now();
    let summary = session.summary(now)?;
    println!();
    println!(
        "Session done: {}/{} correct ({}%).",
        summary.correct(),
        summary.total(),
        summary.score_percent()
    );
    Ok(())
}

fn stats(app: &AppServices) {
    let loop_svc = app.session_loop();
    let catalogue = loop_svc.catalogue();
    let progress = &loop_svc.state().progress;
    let now = loop_svc.progress().now();

    println!(
        "Due now: {}   Practiced: {}%",
        due_count(catalogue.questions(), progress, now),
        practiced_percent(catalogue.questions(), progress)
    );
    for report in topic_reports(catalogue.topics(), catalogue.questions(), progress, now) {
        println!(
            "  {:<32} {:>3}% {:<9} {} due of {}",
            report.title,
            report.mastery,
            report.band.label(),
            report.due,
            report.question_count
        );
    }
}

async fn ask(app: &AppServices, parsed: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let topic = parsed
        .session
        .topic_id
        .as_ref()
        .and_then(|id| app.session_loop().catalogue().topic(id));
    let mut chat = TutorChat::new();
    let mut message = parsed.question.join(" ");
    loop {
        let reply = chat.send(app.tutor(), message, topic).await?;
        println!("{reply}");
        println!();
        match read_line("You (empty line to finish): ")? {
            Some(line) if !line.is_empty() => message = line,
            _ => return Ok(()),
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: studying when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalogue = ContentCatalogue::load(&parsed.content_path)?;
    tracing::debug!(
        topics = catalogue.topics().len(),
        questions = catalogue.questions().len(),
        path = %parsed.content_path,
        "catalogue loaded"
    );

    prepare_sqlite_file(&parsed.db_url)?;
    let mut app = AppServices::new_sqlite(
        &parsed.db_url,
        catalogue,
        parsed.remote(),
        Clock::Default,
    )
    .await?;
    if app.remote_on_load().is_failed() {
        println!("Remote progress unavailable; using this device's saved progress.");
    }

    match cmd {
        Command::Study => study(&mut app, parsed.session.clone()).await,
        Command::Stats => {
            stats(&app);
            Ok(())
        }
        Command::Ask => ask(&app, &parsed).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn study_flags_fill_session_options() {
        let args = parse(Command::Study, &["--topic", "creatine", "--due", "--cap", "5"]).unwrap();
        assert_eq!(args.session.topic_id, Some(TopicId::new("creatine")));
        assert!(args.session.due_only);
        assert_eq!(args.session.cap, 5);
    }

    #[test]
    fn bad_cap_is_rejected() {
        let err = parse(Command::Study, &["--cap", "many"]).err().unwrap();
        assert!(matches!(err, ArgsError::InvalidCap { .. }));
    }

    #[test]
    fn stats_rejects_session_flags() {
        let err = parse(Command::Stats, &["--due"]).err().unwrap();
        assert!(matches!(err, ArgsError::UnknownArg(_)));
    }

    #[test]
    fn ask_collects_question_words() {
        let args = parse(Command::Ask, &["why", "--topic", "iron", "ferritin?"]).unwrap();
        assert_eq!(args.question, vec!["why", "ferritin?"]);
        assert!(parse(Command::Ask, &[]).is_err());
    }

    #[test]
    fn remote_flag_overrides_environment_url() {
        let args = parse(Command::Stats, &["--remote", "https://sync.example.com"]).unwrap();
        assert_eq!(args.remote_url.as_deref(), Some("https://sync.example.com"));
        if std::env::var_os("REVISE_USER_ID").is_none() {
            assert!(args.remote().is_none());
        }
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/revise.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/revise.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
