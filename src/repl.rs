//! querylens interactive shell
//!
//! A line editor with keyword and table name completion, history and
//! backslash line continuation. Lines starting with `.` are shell commands;
//! everything else is run as a statement.

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow;

use querylens_core::lexer::{AGGREGATE_FUNCTIONS, DEBUG_WORDS, KEYWORDS};
use querylens_core::{BuiltinFunctions, DataSource};

use crate::config::{Config, OutputFormat};
use crate::render::{render_outcome, render_session_error};
use crate::session::{Outcome, Session};

/// Tab completion helper
pub struct QueryHelper {
    words: Vec<String>,
    tables: Vec<String>,
}

impl QueryHelper {
    pub fn new(tables: Vec<String>) -> Self {
        let mut words: Vec<String> = KEYWORDS
            .iter()
            .chain(AGGREGATE_FUNCTIONS)
            .chain(BuiltinFunctions::NAMES)
            .chain(DEBUG_WORDS)
            .map(|word| word.to_string())
            .collect();
        words.sort();
        words.dedup();
        Self { words, tables }
    }

    pub fn set_tables(&mut self, tables: Vec<String>) {
        self.tables = tables;
    }

    fn candidates<'s>(&'s self, word: &'s str) -> impl Iterator<Item = &'s String> + 's {
        let lower = word.to_lowercase();
        self.tables
            .iter()
            .chain(&self.words)
            .filter(move |candidate| candidate.to_lowercase().starts_with(&lower))
    }
}

fn word_start(line: &str) -> usize {
    line.rfind(|c: char| c.is_whitespace() || c == '(' || c == ',' || c == '.')
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for QueryHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let start = word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }

        let matches: Vec<Pair> = self
            .candidates(word)
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for QueryHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }

        let word = &line[word_start(line)..];
        if word.is_empty() {
            return None;
        }

        self.candidates(word)
            .find(|c| c.len() > word.len())
            .and_then(|c| c.get(word.len()..))
            .map(str::to_string)
    }
}

impl Highlighter for QueryHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.truecolor(100, 100, 100).to_string())
    }
}

impl Validator for QueryHelper {}

impl Helper for QueryHelper {}

/// Shell state besides the session.
pub struct Shell {
    session: Session,
    format: OutputFormat,
    max_rows: usize,
    trace: bool,
}

/// What the loop does after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

impl Shell {
    pub fn new(session: Session, config: &Config) -> Self {
        Self {
            session,
            format: config.output.format,
            max_rows: config.output.max_rows,
            trace: false,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a statement and print its outcome. Returns false on error.
    pub fn execute(&mut self, text: &str) -> bool {
        match self.session.run(text, self.trace) {
            Ok(outcome) => {
                let rendered = render_outcome(text, &outcome, self.format, self.max_rows);
                match outcome {
                    Outcome::Table(_) | Outcome::Traced { .. } => print!("{}", rendered),
                    _ => println!("  {}", rendered.trim_end().dimmed()),
                }
                true
            }
            Err(err) => {
                eprint!("{} {}", "Error:".red().bold(), render_session_error(text, &err));
                false
            }
        }
    }

    /// Handle a line starting with `.`.
    pub fn command(&mut self, line: &str) -> Control {
        let parts: Vec<&str> = line.splitn(2, ' ').collect();
        let argument = parts.get(1).map(|arg| arg.trim()).unwrap_or_default();

        match parts[0] {
            ".exit" | ".quit" | ".q" => {
                println!("{}", "Goodbye!".dimmed());
                return Control::Exit;
            }
            ".help" | ".h" | ".?" => print_help(),
            ".clear" => {
                print!("\x1B[2J\x1B[1;1H");
                print_banner();
            }
            ".tables" => {
                let tables = self.session.table_names();
                if tables.is_empty() {
                    println!("  {}", "(no tables)".dimmed());
                }
                for table in tables {
                    println!("  {}", table.cyan());
                }
            }
            ".databases" | ".dbs" => {
                let active = self.session.active_database().to_string();
                for database in self.session.source().database_names() {
                    if database == active {
                        println!("  {} {}", database.cyan().bold(), "(active)".dimmed());
                    } else {
                        println!("  {}", database.cyan());
                    }
                }
            }
            ".format" => match argument.parse::<OutputFormat>() {
                Ok(format) => {
                    self.format = format;
                    println!("  {} {:?}", "Output format:".dimmed(), format);
                }
                Err(_) => println!("  {}", "Usage: .format table|json".yellow()),
            },
            ".trace" => {
                self.trace = !self.trace;
                let state = if self.trace { "on" } else { "off" };
                println!("  {} {}", "Tracing:".dimmed(), state.white());
            }
            ".status" => {
                println!(
                    "  {} {}",
                    "Data directory:".dimmed(),
                    self.session.data_dir().display().to_string().white()
                );
                println!(
                    "  {} {}",
                    "Database:".dimmed(),
                    self.session.active_database().cyan()
                );
                println!("  {} {:?}", "Format:".dimmed(), self.format);
            }
            _ => {
                println!("  {} {}", "Unknown command:".red(), parts[0]);
                println!("  Type {} for help", ".help".yellow());
            }
        }
        Control::Continue
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
                        _
   __ _ _  _ ___ _ _ _ | |___ _ _  ___
  / _` | || / -_) '_| || / -_) ' \(_-<
  \__, |\_,_\___|_|  \_, |_\___|_||_/__/
     |_|             |__/
"#
        .cyan()
    );
    println!(
        "  {} {}",
        "querylens interactive shell".white().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!(
        "  Type {} for help, {} to quit\n",
        ".help".yellow(),
        ".exit".yellow()
    );
}

fn print_help() {
    println!("\n{}", "Commands:".white().bold());
    println!("  {}          Show this help", ".help".yellow());
    println!("  {}          Exit the shell", ".exit".yellow());
    println!("  {}         Clear the screen", ".clear".yellow());
    println!("  {}        List tables of the active database", ".tables".yellow());
    println!("  {}     List loaded databases", ".databases".yellow());
    println!("  {} <fmt>   Output as table or json", ".format".yellow());
    println!("  {}         Toggle execution traces", ".trace".yellow());
    println!("  {}        Show current settings", ".status".yellow());

    println!("\n{}", "Statements:".white().bold());
    println!("  {}      Switch database", "load <name>".cyan());
    println!("  {}        Reload the data directory", "load new".cyan());
    println!("  {}     Forget all loaded databases", "clear cache".cyan());
    println!("  {}            Write the last result to result.txt", "save".cyan());
    println!("  {}   Run a query and show its steps", "debug <query>".cyan());

    println!("\n{}", "Examples:".white().bold());
    println!(
        "  {}",
        "select title, year from songs where year > 1980 order by year desc".green()
    );
    println!(
        "  {}",
        "select artist, count(*) from songs group by artist having count(*) > 1".green()
    );
    println!("  {} End a line with \\ to continue it", "-- ".dimmed());
    println!();
}

/// Run the interactive shell until `.exit` or end of input.
pub fn run(session: Session, config: &Config, trace: bool) -> anyhow::Result<()> {
    print_banner();

    let mut shell = Shell::new(session, config).with_trace(trace);

    println!(
        "  {} {}",
        "Data directory:".dimmed(),
        shell.session().data_dir().display().to_string().white()
    );
    println!(
        "  {} {}\n",
        "Database:".dimmed(),
        shell.session().active_database().white()
    );

    let helper = QueryHelper::new(shell.session().table_names());
    let mut rl: Editor<QueryHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));

    // Load history
    let history_file = config.history_file();
    let _ = rl.load_history(&history_file);

    let mut multiline_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline {
            format!("{} ", "...".dimmed())
        } else {
            format!("{}{} ", shell.session().active_database().cyan(), ">".white())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                // Handle multiline input
                if let Some(continued) = line.strip_suffix('\\') {
                    multiline_buffer.push_str(continued);
                    multiline_buffer.push('\n');
                    in_multiline = true;
                    continue;
                }

                let text = if in_multiline {
                    multiline_buffer.push_str(line);
                    let text = multiline_buffer.clone();
                    multiline_buffer.clear();
                    in_multiline = false;
                    text
                } else {
                    line.to_string()
                };

                if text.trim().is_empty() {
                    continue;
                }

                // Add to history
                let _ = rl.add_history_entry(text.as_str());

                if text.starts_with('.') {
                    if shell.command(&text) == Control::Exit {
                        break;
                    }
                    continue;
                }

                shell.execute(&text);

                // Table names change with load, load new and clear cache
                let tables = shell.session().table_names();
                if let Some(helper) = rl.helper_mut() {
                    helper.set_tables(tables);
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("{}", "Cancelled".dimmed());
                    multiline_buffer.clear();
                    in_multiline = false;
                } else {
                    println!("{}", "Type .exit to quit".dimmed());
                }
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".dimmed());
                break;
            }
            Err(err) => {
                println!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_file);
    Ok(())
}
