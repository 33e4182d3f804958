use std::process::ExitCode;

use anyhow::Context;
use ca65::{GrammarHandle, ParserConfig, load_grammar};
use ca65_db::{File, check_file};
use ca65_errors::{Diagnostic, Renderer};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use salsa::DatabaseImpl;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "ca65", about = "Parse ca65 assembly sources")]
struct Options {
    /// Log parser decisions (overrides `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the syntax tree of a file.
    Parse {
        path: Utf8PathBuf,
        #[command(flatten)]
        parser: ParserArgs,
        /// Parse a second time, incrementally against the first tree.
        #[arg(long)]
        reparse: bool,
    },
    /// Report syntax errors; exits with failure if there are any.
    Check { path: Utf8PathBuf },
    /// Print parse table statistics.
    Grammar,
}

#[derive(Args)]
struct ParserArgs {
    /// Maximum number of stacks kept alive while the input is ambiguous.
    #[arg(long, default_value_t = ParserConfig::default().max_heads)]
    max_heads: usize,
    /// Maximum number of stack frames error recovery may discard.
    #[arg(long, default_value_t = ParserConfig::default().max_recovery_depth)]
    max_recovery_depth: usize,
    /// Never reuse subtrees of the previous tree.
    #[arg(long)]
    no_reuse: bool,
}

impl ParserArgs {
    fn config(&self) -> ParserConfig {
        ParserConfig::default()
            .with_max_heads(self.max_heads)
            .with_max_recovery_depth(self.max_recovery_depth)
            .with_reuse(!self.no_reuse)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let options = Options::parse();
    init_logging(options.verbose);

    match options.command {
        Command::Parse { path, parser, reparse } => {
            let text = read(&path)?;
            let grammar = grammar()?;
            let parser = grammar.parser().with_config(parser.config());

            let mut tree = parser.parse(&text);
            if reparse {
                tree = parser.reparse(&tree, &text)?;
            }
            print!("{tree}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { path } => {
            let db = DatabaseImpl::default();
            let text = read(&path)?;

            let renderer = Renderer::styled();

            let file = File::new(&db, path, text);
            let diagnostics = check_file::accumulated::<Diagnostic>(&db, file);

            let path = file.path(&db).as_str();
            let text = file.text(&db);

            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic.render(&renderer, path, text));
            }

            Ok(if diagnostics.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Grammar => {
            let grammar = grammar()?;
            println!("states:       {}", grammar.state_count());
            println!("rules:        {}", grammar.rule_count());
            println!("nonterminals: {}", grammar.nonterminal_count());
            println!("conflicts:    {}", grammar.conflict_count());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn read(path: &Utf8Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))
}

fn grammar() -> anyhow::Result<GrammarHandle> {
    load_grammar().context("failed to build the ca65 grammar")
}
