// tova - build driver CLI
//
// The wider toolchain (scaffolding, dev server, REPL, LSP) lives
// elsewhere; this binary drives builds and checks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tova::config::TovaConfig;
use tova::{build, BuildOptions};

#[derive(Parser)]
#[command(name = "tova")]
#[command(about = "Tova - one language for the whole stack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Tova project to JavaScript
    Build {
        /// Source directory or file
        #[arg(short, long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "OUTPUT")]
        out: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Run the pipeline and report diagnostics without writing output
    Check {
        /// Source directory or file
        #[arg(short, long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let config = TovaConfig::discover(&std::env::current_dir()?).unwrap_or_default();

    let (path, out, strict, check_only) = match cli.command {
        Commands::Build { path, out, strict } => (path, out, strict, false),
        Commands::Check { path, strict } => (path, None, strict, true),
    };

    let options = BuildOptions {
        path: path.unwrap_or_else(|| {
            PathBuf::from(config.build.src.clone().unwrap_or_else(|| "src".to_string()))
        }),
        out: out.unwrap_or_else(|| {
            PathBuf::from(config.build.out.clone().unwrap_or_else(|| "build".to_string()))
        }),
        strict: strict || config.build.strict,
        check_only,
    };

    let verb = if check_only { "Checking" } else { "Building" };
    println!(
        "{} {} (out: {})",
        verb.green().bold(),
        options.path.display(),
        options.out.display()
    );

    let summary = build(&options)?;

    for diagnostic in &summary.diagnostics {
        eprintln!("{}", diagnostic.render_colored());
        eprintln!();
    }

    let totals = tova::error::summarize(&summary.diagnostics);
    if summary.has_errors() {
        eprintln!("{} {}", "Build failed:".red().bold(), totals);
        Ok(false)
    } else {
        println!(
            "{} {} compiled, {} cached, {} ({})",
            "Done:".green().bold(),
            summary.compiled,
            summary.cached,
            if summary.failed > 0 {
                format!("{} failed", summary.failed)
            } else {
                "0 failed".to_string()
            },
            totals
        );
        Ok(summary.failed == 0)
    }
}
