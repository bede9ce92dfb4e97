//! CLI: Run a Brainfuck program on the notion walker.
//!
//! The program comes from a file or from `--eval`. Output goes to stdout
//! exactly as the program prints it.
//!
//! Usage: `bf [OPTIONS] [path-to-program]`
//! Example: bf --format parens -e '++[.-]'
//!
//! Set RUST_LOG=notion_walker=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use notion_walker::ProcessConfig;
use notion_walker::brainfuck::{self, CellFormat};
use notion_walker::checkpoint_io::{load_checkpoint, save_checkpoint};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Run a Brainfuck program.
#[derive(Parser, Debug)]
#[command(name = "bf")]
#[command(after_help = r#"Environment variables:
  BF_FORMAT   Cell format for `.` when --format is not given (ascii | parens).

Exit status: 0 when the program finishes, 2 when it is waiting for more input,
1 on errors.

Examples:
  bf hello.bf
  bf --format parens -e '++[.-]'
  bf --input abc -e ',.,.,.'
  bf --checkpoint walk.json -e ',.,.'
  bf --resume walk.json --input b -e ',.,.'"#)]
struct Args {
  /// Program text, instead of a file.
  #[arg(short = 'e', long, value_name = "PROGRAM", conflicts_with = "path")]
  eval: Option<String>,

  /// How `.` renders a cell.
  #[arg(long, env = "BF_FORMAT", default_value = "ascii")]
  format: CellFormat,

  /// Input consumed by `,`.
  #[arg(long, default_value = "")]
  input: String,

  /// Stop the walk after this many steps.
  #[arg(long, value_name = "N")]
  max_steps: Option<usize>,

  /// Print every element query to stderr.
  #[arg(long)]
  trace: bool,

  /// Where to save the paused walk when the program waits for input.
  #[arg(long, value_name = "FILE")]
  checkpoint: Option<PathBuf>,

  /// Continue a walk saved with --checkpoint; --input is fed to the waiting `,`.
  #[arg(long, value_name = "FILE")]
  resume: Option<PathBuf>,

  /// Path to the program file
  #[arg(value_name = "path-to-program", required_unless_present = "eval")]
  path: Option<PathBuf>,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  info!(format = %args.format, max_steps = ?args.max_steps, "bf starting");

  let source = match (&args.eval, &args.path) {
    (Some(program), _) => program.clone(),
    (None, Some(path)) => match fs::read_to_string(path) {
      Ok(s) => s,
      Err(e) => {
        eprintln!("Error reading {}: {}", path.display(), e);
        process::exit(1);
      }
    },
    (None, None) => {
      eprintln!("Error: no program given");
      process::exit(1);
    }
  };

  let mut program = match brainfuck::compile(&source, args.format) {
    Ok(p) => p,
    Err(e) => {
      eprintln!("Error compiling program: {}", e);
      process::exit(1);
    }
  };
  if let Some(max) = args.max_steps {
    program = program.with_config(ProcessConfig::default().with_max_steps(max));
  }
  if let Some(path) = &args.resume {
    let checkpoint = match load_checkpoint(path) {
      Ok(c) => c,
      Err(e) => {
        eprintln!("Error reading checkpoint {}: {}", path.display(), e);
        process::exit(1);
      }
    };
    program = match program.restored(checkpoint) {
      Ok(p) => p,
      Err(e) => {
        eprintln!("Error restoring checkpoint {}: {}", path.display(), e);
        process::exit(1);
      }
    };
    info!(path = %path.display(), "checkpoint restored");
  }
  let already_printed = program.output().chars().count();
  let steps = args.trace.then(|| program.process_mut().record_steps());

  let result = if args.resume.is_some() {
    program.feed(&args.input)
  } else {
    program.run(&args.input)
  };
  let run = match result {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Error: {}", e);
      process::exit(1);
    }
  };

  let mut stdout = std::io::stdout();
  let fresh: Vec<u8> = run.bytes().into_iter().skip(already_printed).collect();
  let _ = stdout.write_all(&fresh);
  let _ = stdout.flush();
  if let Some(steps) = steps {
    eprint!("{}", steps.render());
  }

  if run.outcome.is_step_limited() {
    eprintln!("Step limit reached.");
    process::exit(1);
  }
  if run.is_waiting() {
    if let Some(path) = &args.checkpoint {
      if let Err(e) = save_checkpoint(path, &program.process().checkpoint()) {
        eprintln!("Error writing checkpoint {}: {}", path.display(), e);
        process::exit(1);
      }
      info!(path = %path.display(), "checkpoint saved");
    }
    eprintln!("Waiting for input.");
    process::exit(2);
  }
  if !run.outcome.is_ok() {
    eprintln!("Program failed: {}", run.outcome.reply.kind());
    process::exit(1);
  }
}
