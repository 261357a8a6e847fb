use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use intcode::batch::{SearchConfig, SearchHit, search};
use intcode::disasm::disassemble;
use intcode::trace::WriteTracer;
use intcode::{Machine, RunConfig, load_file};

/// Largest value `search --max` accepts.
const MAX_INPUT: i64 = 9_999;

#[derive(Parser)]
#[command(name = "intcode", about = "Load and run Intcode programs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print selected cells afterwards.
    Run {
        /// Program file: comma-separated integers.
        file: PathBuf,

        /// Print every executed instruction.
        #[arg(long)]
        trace: bool,

        /// Write VALUE to ADDR before running (repeatable).
        #[arg(long, value_name = "ADDR=VALUE", value_parser = parse_poke)]
        poke: Vec<(i64, i64)>,

        /// Print the cell at ADDR after the run (repeatable, default 0).
        #[arg(long, value_name = "ADDR")]
        peek: Vec<i64>,

        /// Give up after this many instructions.
        #[arg(long)]
        step_limit: Option<usize>,
    },

    /// Print a static listing of a program.
    Disasm {
        file: PathBuf,
    },

    /// Find the pair of inputs that makes a program produce a target value.
    Search {
        file: PathBuf,

        /// Value wanted at the output address.
        #[arg(long, allow_hyphen_values = true)]
        target: i64,

        /// Address receiving the first input.
        #[arg(long, default_value_t = 1)]
        first: i64,

        /// Address receiving the second input.
        #[arg(long, default_value_t = 2)]
        second: i64,

        /// Address holding the result after the run.
        #[arg(long, default_value_t = 0)]
        output: i64,

        /// Largest input value tried; inputs range over 0..=MAX.
        #[arg(long, default_value_t = 99, value_parser = clap::value_parser!(i64).range(0..=MAX_INPUT))]
        max: i64,

        /// Max instructions per candidate run.
        #[arg(long, default_value_t = 1 << 16)]
        step_limit: usize,
    },
}

/// `100 * first + second`, or `None` if that does not fit in an `i64`.
fn answer(hit: SearchHit) -> Option<i64> {
    hit.first.checked_mul(100)?.checked_add(hit.second)
}

/// Parse an "ADDR=VALUE" poke argument.
fn parse_poke(s: &str) -> Result<(i64, i64), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid poke '{s}', expected ADDR=VALUE (e.g. 1=12)"))?;
    let addr = addr.trim().parse::<i64>().map_err(|e| format!("Invalid poke address: {e}"))?;
    let value = value.trim().parse::<i64>().map_err(|e| format!("Invalid poke value: {e}"))?;
    Ok((addr, value))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).init()?;

    match cli.command {
        Command::Run {
            file,
            trace,
            poke,
            peek,
            step_limit,
        } => run(&file, trace, &poke, &peek, step_limit),
        Command::Disasm { file } => {
            let memory = load_file(&file)?;
            print!("{}", disassemble(&memory));
            Ok(())
        }
        Command::Search {
            file,
            target,
            first,
            second,
            output,
            max,
            step_limit,
        } => {
            let memory = load_file(&file)?;
            let config = SearchConfig {
                first_address: first,
                second_address: second,
                output_address: output,
                range: 0..=max,
                target,
                step_limit,
            };
            match search(&memory, &config)? {
                Some(hit) => match answer(hit) {
                    Some(answer) => {
                        println!("first={} second={} answer={answer}", hit.first, hit.second)
                    }
                    None => println!("first={} second={}", hit.first, hit.second),
                },
                None => eprintln!("No inputs in 0..={max} produce {target}"),
            }
            Ok(())
        }
    }
}

fn run(
    file: &Path,
    trace: bool,
    pokes: &[(i64, i64)],
    peeks: &[i64],
    step_limit: Option<usize>,
) -> Result<()> {
    let mut machine = Machine::new(load_file(file)?);
    for &(addr, value) in pokes {
        machine
            .write(addr, value)
            .wrap_err_with(|| format!("poke {addr}={value}"))?;
    }

    let config = RunConfig { trace, step_limit };
    let mut tracer = WriteTracer::new(io::stdout().lock());
    machine
        .run_with(&config, &mut tracer)
        .wrap_err_with(|| format!("running {}", file.display()))?;
    drop(tracer);

    let peeks = if peeks.is_empty() { &[0][..] } else { peeks };
    for &addr in peeks {
        println!("{addr}={}", machine.read(addr)?);
    }
    Ok(())
}
