use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use chronospatial::computer;
use chronospatial::parse;
use chronospatial::quine;

#[derive(Parser)]
#[command(
    name = "chronospatial",
    about = "Chronospatial computer: run three-register octal programs and search for self-reproducing seeds"
)]
struct Cli {
    /// Input file: a register block followed by a `Program:` line.
    #[arg(long, default_value = "input.txt")]
    input: PathBuf,

    /// Instead of running the program, search for the smallest register-A
    /// seed that makes it output its own code words.
    #[arg(long)]
    find_seed: bool,

    /// Print a disassembly of the program and exit.
    #[arg(long)]
    disassemble: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: {e}", cli.input.display());
            exit(1);
        }
    };
    let (registers, program) = match parse::parse_input(&text) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}: {e}", cli.input.display());
            exit(1);
        }
    };

    if cli.disassemble {
        print!("{}", program.disassemble());
        return;
    }

    if cli.find_seed {
        match quine::find_seed(&program) {
            Ok(Some(seed)) => println!("{seed}"),
            Ok(None) => {
                eprintln!("no seed reproduces the program");
                exit(1);
            }
            Err(e) => {
                eprintln!("seed search failed: {e}");
                exit(1);
            }
        }
    } else {
        match computer::execute(registers, &program) {
            Ok(output) => println!("{}", join(&output)),
            Err(e) => {
                eprintln!("execution failed: {e}");
                exit(1);
            }
        }
    }
}

/// Comma-join the emitted values, the canonical answer format.
fn join(output: &[u8]) -> String {
    output
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
