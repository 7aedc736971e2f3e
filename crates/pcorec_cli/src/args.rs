//! the args for running pcorec

use clap::{value_parser, ArgAction};
use pcorec::{BackendKind, Emit};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// The args struct
#[derive(Debug, clap::Parser)]
#[clap(author, version, about = "Compiles pcore programs")]
pub struct Args {
    #[command(flatten)]
    logging: LoggingArgs,

    /// The source file to compile
    #[clap(value_name = "source file", value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,
    /// Where to write the output
    #[clap(short = 'o', long = "output", default_value = "output.ir")]
    pub output: PathBuf,
    /// The backend to lower into, either `ssa` or `stack`
    #[clap(short = 'b', long, default_value = "ssa")]
    pub backend: BackendKind,
    /// What to write to the output, one of `tokens`, `ast` or `module`
    #[clap(long, default_value = "module")]
    pub emit: Emit,
    /// Runs `main` after compiling and prints what it returns. Only works with the ssa backend.
    #[clap(long)]
    pub run: bool,
}

impl Args {
    pub fn log_level_filter(&self) -> LevelFilter {
        self.logging.log_level_filter()
    }
}

/// Common way to set logging levels
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct LoggingArgs {
    #[clap(short = 'v', value_parser = value_parser!(u8).range(0..=2), action=ArgAction::Count, conflicts_with="quiet")]
    verbose: u8,
    #[clap(short = 'q', value_parser = value_parser!(u8).range(0..=2), action=ArgAction::Count, conflicts_with="verbose")]
    quiet: u8,
}

impl LoggingArgs {
    /// Gets the logging level based on whether `-v[v]` or `-q[q]` has been used,
    pub fn log_level_filter(&self) -> LevelFilter {
        let sum = self.verbose as i8 - self.quiet as i8;
        match sum {
            -2 => LevelFilter::OFF,
            -1 => LevelFilter::ERROR,
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            2 => LevelFilter::TRACE,
            _ => unreachable!("verbosity is limited to two levels"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn test_args_parsing() {
        let test = "pcorec file.pc";
        let args = Args::try_parse_from(test.split(" ")).expect("could not parse test string");
        assert_eq!(args.file, Path::new("file.pc"));
        assert_eq!(args.output, Path::new("output.ir"));
        assert_eq!(args.backend, BackendKind::Ssa);
        assert_eq!(args.emit, Emit::Module);
        assert!(!args.run);
    }

    #[test]
    fn test_backend_and_emit() {
        let test = "pcorec file.pc -o out.stack --backend stack --emit ast";
        let args = Args::try_parse_from(test.split(" ")).expect("could not parse test string");
        assert_eq!(args.output, Path::new("out.stack"));
        assert_eq!(args.backend, BackendKind::Stack);
        assert_eq!(args.emit, Emit::Ast);
    }

    #[test]
    fn test_unknown_backend() {
        let test = "pcorec file.pc --backend llvm";
        assert!(Args::try_parse_from(test.split(" ")).is_err());
    }

    #[test]
    fn test_verbosity() {
        let args = Args::try_parse_from(["pcorec", "-vv", "f.pc"]).unwrap();
        assert_eq!(args.log_level_filter(), LevelFilter::TRACE);
        let args = Args::try_parse_from(["pcorec", "-q", "f.pc"]).unwrap();
        assert_eq!(args.log_level_filter(), LevelFilter::ERROR);
        assert!(Args::try_parse_from(["pcorec", "-v", "-q", "f.pc"]).is_err());
    }
}
