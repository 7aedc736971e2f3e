use crate::args::Args;
use clap::Parser;
use owo_colors::{OwoColorize, Stream};
use pcorec::{PCoreC, PCoreCError};
use std::fmt::Display;
use std::io::stderr;
use tracing::level_filters::LevelFilter;
use tracing::{debug, trace};
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

mod args;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.log_level_filter())?;
    trace!("starting pcorec with args: {args:?}");
    debug!("pcorec version: {}", env!("CARGO_PKG_VERSION"));

    let pcorec = PCoreC::builder()
        .backend(args.backend)
        .output_path(&args.output)
        .emit(args.emit)
        .run(args.run)
        .build()?;

    match pcorec.compile_file(&args.file) {
        Ok(compiled) => {
            if let Some(result) = compiled.result {
                println!("{result}");
            }
            Ok(())
        }
        Err(error) => {
            let prefix = "error".if_supports_color(Stream::Stderr, |text| text.red());
            for line in diagnostic(&error, prefix) {
                eprintln!("{line}");
            }
            std::process::exit(error.exit_code());
        }
    }
}

/// The lines reported for a failed compilation. Lexer and parser errors already say what kind of
/// error they are and are printed as is.
fn diagnostic(error: &PCoreCError, prefix: impl Display) -> Vec<String> {
    let message = error.to_string();
    match error {
        PCoreCError::Lex(_) | PCoreCError::Parse(_) => {
            message.lines().map(str::to_string).collect()
        }
        _ => message.lines().map(|line| format!("{prefix}: {line}")).collect(),
    }
}

fn init_logging(level_filter: LevelFilter) -> eyre::Result<()> {
    let registry = Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format().without_time())
                .with_writer(stderr)
                .with_filter(level_filter),
        )
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(registry)?;

    Ok(())
}
