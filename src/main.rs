use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{LevelFilter, info};
use simple_logger::SimpleLogger;

use ls8::cpu::Cpu;
use ls8::error::{Fault, LoadError};
use ls8::isa::disassemble;
use ls8::loader::load_file;

#[derive(Parser)]
#[command(name = "ls8", about = "LS-8 instruction-set simulator")]
struct Cli {
    /// Program image: one binary byte per line, `#` starts a comment.
    program: PathBuf,

    /// Log every executed instruction (same as --log-level trace).
    #[arg(long, short)]
    trace: bool,

    /// Diagnostic verbosity on stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Stop after this many instructions instead of running until HLT.
    #[arg(long)]
    step_limit: Option<usize>,

    /// Print a disassembly of the program and exit without running it.
    #[arg(long)]
    disassemble: bool,

    /// Print the processor state to stderr once execution stops.
    #[arg(long)]
    dump_state: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Exit status for a missing program file. Clap already uses 2 for usage
/// errors.
const EXIT_NOT_FOUND: u8 = 4;
/// Exit status for a memory or register access fault.
const EXIT_ACCESS_FAULT: u8 = 3;

/// Flush program output. A flush failure after a clean run is reported as an
/// output fault; an earlier fault takes precedence.
fn finish<W: Write>(out: &mut W, result: Result<usize, Fault>) -> Result<usize, Fault> {
    let flushed = out.flush();
    let steps = result?;
    flushed?;
    Ok(steps)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        LevelFilter::Trace
    } else {
        cli.log_level.into()
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let image = match load_file(&cli.program) {
        Ok(image) => image,
        Err(e @ LoadError::FileNotFound { .. }) => {
            eprintln!("ls8: {e}");
            return ExitCode::from(EXIT_NOT_FOUND);
        }
        Err(e) => {
            eprintln!("ls8: {}: {e}", cli.program.display());
            return ExitCode::FAILURE;
        }
    };
    info!("loaded {} bytes from {}", image.len(), cli.program.display());

    if cli.disassemble {
        print!("{}", disassemble(&image));
        return ExitCode::SUCCESS;
    }

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load(&image) {
        eprintln!("ls8: {e}");
        return ExitCode::FAILURE;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match cli.step_limit {
        Some(limit) => cpu.run_for(&mut out, limit),
        None => cpu.run(&mut out),
    };
    let result = finish(&mut out, result);
    drop(out);

    if cli.dump_state {
        eprint!("{}", cpu.dump_state());
    }

    match result {
        Ok(steps) => {
            info!("executed {steps} instructions");
            ExitCode::SUCCESS
        }
        // An unknown opcode ends the run but is not a process failure.
        Err(fault @ Fault::UnknownOpcode { .. }) => {
            println!("{fault}");
            ExitCode::SUCCESS
        }
        Err(Fault::Access(e)) => {
            eprintln!("ls8: fault at pc {:#04X}: {e}", cpu.pc());
            ExitCode::from(EXIT_ACCESS_FAULT)
        }
        Err(Fault::Output(e)) => {
            eprintln!("ls8: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn exit_codes_are_distinct() {
        let err = match Cli::try_parse_from(["ls8"]) {
            Ok(_) => panic!("missing program path should not parse"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let usage = err.exit_code();
        let codes = [1, usage, EXIT_NOT_FOUND as i32, EXIT_ACCESS_FAULT as i32];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn flush_failure_is_an_output_fault() {
        let result = finish(&mut BrokenPipe, Ok(3));
        assert!(matches!(result, Err(Fault::Output(_))));
    }

    #[test]
    fn earlier_fault_wins_over_flush_failure() {
        let fault = Fault::UnknownOpcode { opcode: 0xFF, pc: 0 };
        let result = finish(&mut BrokenPipe, Err(fault));
        assert!(matches!(result, Err(Fault::UnknownOpcode { opcode: 0xFF, .. })));
    }

    #[test]
    fn clean_flush_keeps_step_count() {
        let mut out = Vec::new();
        assert_eq!(finish(&mut out, Ok(6)).unwrap(), 6);
    }
}
