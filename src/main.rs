use std::env;
use std::process;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record};

use lexsearch::{Condition, Engine, EngineConfig, Query, QueryError};

#[macro_use]
extern crate text_io;

/// Parsed `LEXSEARCH_LOG`, e.g. `warn,lexsearch::query=trace`
#[derive(Debug, PartialEq)]
struct LogFilter {
    default: LevelFilter,
    /// Module path prefixes with their own level
    targets: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    fn parse(spec: &str) -> Self {
        let mut filter = LogFilter {
            default: LevelFilter::Info,
            targets: Vec::new(),
        };
        for directive in spec.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                Some((target, level)) => {
                    if let Ok(level) = level.trim().parse() {
                        filter.targets.push((target.trim().to_string(), level));
                    }
                }
                None => {
                    if let Ok(level) = directive.parse() {
                        filter.default = level;
                    }
                }
            }
        }
        filter
    }

    /// Level of the longest matching target prefix
    fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, Ord::max)
    }
}

fn format_record(elapsed: Duration, record: &Record) -> String {
    format!(
        "{:>4}.{:03} {:<5} {}: {}",
        elapsed.as_secs(),
        elapsed.subsec_millis(),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Writes log records to stderr, stamped with the time since startup
struct StderrLogger {
    filter: LogFilter,
    start: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", format_record(self.start.elapsed(), record));
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let filter = LogFilter::parse(&env::var("LEXSEARCH_LOG").unwrap_or_default());
    let max_level = filter.max_level();
    let logger: &'static StderrLogger = Box::leak(Box::new(StderrLogger {
        filter,
        start: Instant::now(),
    }));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(max_level);
    }
}

fn print_words(engine: &Engine, lexicon: &str, query: &Query) -> Result<(), QueryError> {
    let found = engine.search(lexicon, query)?;
    for warning in found.warnings.iter() {
        println!("warning: {}", warning);
    }
    for m in found.iter() {
        if m.blanks.is_empty() {
            println!("{}", m.word);
        } else {
            println!("{} (blanks at {:?})", m.word, m.blanks);
        }
    }
    println!("{} words", found.len());
    Ok(())
}

/// Runs one input line against the lexicon
fn run_command(engine: &Engine, lexicon: &str, line: &str) -> Result<(), QueryError> {
    if line.starts_with('{') {
        return match serde_json::from_str::<Query>(line) {
            Ok(query) => print_words(engine, lexicon, &query),
            Err(e) => Err(QueryError::InvalidCondition(e.to_string())),
        };
    }
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };
    match command {
        "is" => {
            let verdict = if engine.contains(lexicon, arg)? {
                "valid"
            } else {
                "not a word"
            };
            println!("{}: {}", arg.to_uppercase(), verdict);
        }
        "anagram" => print_words(engine, lexicon, &Query::new().with(Condition::anagram(arg)))?,
        "sub" => print_words(engine, lexicon, &Query::new().with(Condition::subanagram(arg)))?,
        "pattern" => print_words(engine, lexicon, &Query::new().with(Condition::pattern(arg)))?,
        "hooks" => {
            let front = engine.front_hooks(lexicon, arg)?;
            let back = engine.back_hooks(lexicon, arg)?;
            println!("{} {} {}", front, arg.to_uppercase(), back);
        }
        _ => println!("Commands: is WORD, anagram LETTERS, sub LETTERS, pattern P, hooks WORD, or a JSON query"),
    }
    Ok(())
}

fn main() {
    init_logging();
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: lexsearch <config.json> [lexicon]");
            process::exit(2);
        }
    };
    let config = match EngineConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let (engine, failures) = Engine::from_config(&config);
    for (name, e) in failures.iter() {
        eprintln!("{}: {}", name, e);
    }
    let lexicon = match env::args().nth(2).or_else(|| engine.names().into_iter().next()) {
        Some(name) => name,
        None => {
            eprintln!("no lexicon could be loaded");
            process::exit(1);
        }
    };

    println!("Searching {} (empty line to quit)", lexicon);
    loop {
        let line: String = match try_read!("{}\n") {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() || line == "quit" {
            break;
        }
        if let Err(e) = run_command(&engine, &lexicon, line) {
            println!("error: {}", e);
        }
    }
}
