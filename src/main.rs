//! Quran Search - interactive terminal front end
//!
//! Type a chapter (`2`), a verse range (`2 255` / `2 255 257`) or Arabic text
//! to search. Lines starting with `:` are commands, see `:help`.

use anyhow::{Context, Result};
use clap::Parser;
use quran_search::{
    match_spans, parse, AppState, BatchSink, Config, Direction, HistoryStore, Match, Query,
    SearchSession, StreamHandle, TextPattern,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "quran-search", version, about = "Search the Quran from the terminal")]
struct Cli {
    /// Configuration file (defaults to ./quran-search.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding uthmani.txt and simplified.txt
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Neither restore nor save the query history
    #[arg(long)]
    no_history: bool,
}

const HELP: &str = "\
Queries:
  2              whole chapter
  2 255          chapter 2 from verse 255 to the end
  2 255 257      verses 255 to 257 of chapter 2
  الرحمن         text search (diacritics ignored)
  %word%         whole word, word% starts with, %word ends with
  @إياك          keep hamza forms distinct
Commands:
  :older :newer  walk the history (an empty line runs the recalled query)
  :history       list the history
  :cancel        stop delivering the current results
  :context C V   verse C:V with its neighbours
  :chapters      list chapters
  :help          this text
  :quit          exit";

/// Prints background batches as they arrive.
struct TerminalSink {
    pattern: Option<TextPattern>,
    out: Mutex<io::Stdout>,
}

impl BatchSink for TerminalSink {
    fn on_batch(&self, batch: &[Match], is_final: bool) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for m in batch {
            let _ = writeln!(out, "{}", render(m, self.pattern.as_ref()));
        }
        if is_final {
            let _ = writeln!(out, "-- end of results --");
        }
        let _ = out.flush();
    }
}

fn render(m: &Match, pattern: Option<&TextPattern>) -> String {
    let text = m.verse.text(m.matched_script);
    let text = match pattern {
        Some(pattern) => mark(text, &match_spans(text, pattern)),
        None => text.to_string(),
    };
    format!("[{}] {}", m.key(), text)
}

fn mark(text: &str, spans: &[std::ops::Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 4);
    let mut last = 0;
    for span in spans {
        out.push_str(&text[last..span.start]);
        out.push('«');
        out.push_str(&text[span.clone()]);
        out.push('»');
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

struct Repl<'a> {
    state: &'a AppState,
    session: SearchSession,
    active: Option<StreamHandle>,
    recalled: Option<String>,
}

impl Repl<'_> {
    fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            print!("> ");
            io::stdout().flush()?;
            let Some(line) = lines.next() else { break };
            let line = line.context("Failed to read input")?;
            let line = line.trim();

            if line.is_empty() {
                if let Some(recalled) = self.recalled.take() {
                    self.submit(&recalled);
                }
                continue;
            }
            self.recalled = None;

            match line.strip_prefix(':') {
                Some(command) => {
                    if !self.command(command) {
                        break;
                    }
                }
                None => self.submit(line),
            }
        }

        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        Ok(())
    }

    /// Returns false when the REPL should exit.
    fn command(&mut self, command: &str) -> bool {
        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or("") {
            "quit" | "q" => return false,
            "help" | "h" => println!("{}", HELP),
            "older" | "o" => self.recall(Direction::Older),
            "newer" | "n" => self.recall(Direction::Newer),
            "history" => {
                for (i, raw) in self.session.history_snapshot().iter().enumerate() {
                    println!("{:>3}  {}", i + 1, raw);
                }
            }
            "cancel" => {
                self.session.cancel();
                println!("Cancelled");
            }
            "context" => {
                let numbers: Vec<u32> = parts.filter_map(|p| p.parse().ok()).collect();
                match numbers.as_slice() {
                    [chapter, verse] => self.context(*chapter, *verse),
                    _ => println!("usage: :context <chapter> <verse>"),
                }
            }
            "chapters" => self.chapters(),
            other => println!("Unknown command ':{}', try :help", other),
        }
        true
    }

    fn recall(&mut self, direction: Direction) {
        self.recalled = self.session.navigate(direction);
        match &self.recalled {
            Some(raw) => println!("history: {}", raw),
            None => println!("history: (end)"),
        }
    }

    fn submit(&mut self, raw: &str) {
        let pattern = match parse(raw) {
            Ok(Query::Text { raw }) => TextPattern::parse(&raw).ok(),
            _ => None,
        };
        let sink = Arc::new(TerminalSink {
            pattern: pattern.clone(),
            out: Mutex::new(io::stdout()),
        });

        match self.session.submit(raw, sink) {
            Ok(submission) => {
                let first = &submission.first;
                println!("{} matches for {} query '{}'", first.total, submission.query.kind(), submission.query);
                for m in &first.matches {
                    println!("{}", render(m, pattern.as_ref()));
                }
                if !first.is_final {
                    println!("-- {} more arriving --", first.total - first.matches.len());
                }
                self.active = Some(submission.handle);
            }
            Err(e) if e.is_validation() => println!("{}", e),
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                println!("{}", e);
            }
        }
    }

    fn context(&self, chapter: u32, verse: u32) {
        let corpus = self.state.search_engine.corpus();
        match corpus.verses_around(chapter, verse, self.state.settings.context_radius) {
            Ok(verses) => {
                for v in verses {
                    let marker = if v.verse == verse { ">" } else { " " };
                    println!("{} [{}] {}", marker, v.key(), v.text_uthmani);
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    fn chapters(&self) {
        let corpus = self.state.search_engine.corpus();
        for chapter in 1..=corpus.chapter_count() {
            let verses = corpus.verse_count(chapter).unwrap_or(0);
            match corpus.chapter_name(chapter) {
                Some(name) => println!("{:>3}  {}  ({} verses)", chapter, name, verses),
                None => println!("{:>3}  ({} verses)", chapter, verses),
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let mut settings = config.engine()?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = Some(data_dir);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the runtime")?;

    let state = AppState::new(settings)?;
    tracing::info!("Using data directory: {}", state.data_dir.display());

    let mut session = state.session(runtime.handle().clone());

    let store: Option<HistoryStore> = if cli.no_history {
        None
    } else {
        match state.history_store() {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!("History disabled: {:#}", e);
                None
            }
        }
    };
    if let Some(store) = &store {
        match store.load() {
            Ok(entries) => session.restore_history_entries(entries),
            Err(e) => tracing::warn!("Failed to restore history: {}", e),
        }
    }

    let mut repl = Repl {
        state: &state,
        session,
        active: None,
        recalled: None,
    };
    repl.run()?;

    if let Some(store) = &store {
        if let Err(e) = store.save(&repl.session.history_entries()) {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
    Ok(())
}
