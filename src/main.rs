use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use declbuild::compiler::{CompileOptions, Compiler};

/// Build TypeScript projects and merge their declaration files into flat ambient modules
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Project directories. `'<dir>/*'` (quoted, so the shell doesn't expand it) builds every
    /// package in `<dir>` in dependency order.
    /// Defaults to the current directory.
    paths: Vec<PathBuf>,
    /// TypeScript compiler executable
    #[arg(long, env = "DECLBUILD_TSC", default_value = "tsc")]
    tsc: PathBuf,
    /// Don't run the compiler, merge the declaration files already in each output directory
    #[arg(long)]
    no_compile: bool,
    /// Log per-file details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let compiler = Compiler::new(CompileOptions {
        tsc: args.tsc,
        compile: !args.no_compile
    });
    let output = compiler.run(args.paths)?;
    std::process::exit(output.report())
}
