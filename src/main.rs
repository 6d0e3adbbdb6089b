// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Validates ChromeOS hardware configuration files.

mod logger;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::{LevelFilter, info, warn};

use cros_config::compile::{Compiler, DEFAULT_COMPILER};
use cros_config::diagnostics::{self, Diagnostic};
use cros_config::error::ValidateError;
use cros_config::schema::chromeos;
use cros_config::validator::{Policy, Validator};

/// Validates ChromeOS hardware configuration files against the built-in
/// schema.
#[derive(Parser, Debug)]
#[command(name = "validate-config", version, about)]
struct Args {
    /// Configuration files to validate: device-tree source, compiled blobs
    /// (.dtb) or Markdown with a fenced source block (.md).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Stop at the first problem in each file instead of reporting all.
    #[arg(long)]
    raise_on_error: bool,

    /// The device-tree compiler used for source files.
    #[arg(long, env = "DTC", default_value = DEFAULT_COMPILER)]
    dtc: PathBuf,

    /// A directory to search for included source files.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Log more; repeat for even more.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(err) = logger::init(level) {
        eprintln!("cannot install logger: {err}");
    }

    let compiler = args
        .include_dirs
        .iter()
        .fold(Compiler::new(&args.dtc), |compiler, dir| compiler.include_dir(dir));
    let policy = if args.raise_on_error {
        Policy::FailFast
    } else {
        Policy::Accumulate
    };
    let validator = Validator::new(chromeos::schema()).with_policy(policy);

    let mut invalid = false;
    let mut unreadable = false;
    for file in &args.files {
        match validate_file(&compiler, &validator, file) {
            Ok(found) if found.is_empty() => info!("{}: no problems", file.display()),
            Ok(found) => {
                warn!("{}: {} problem(s)", file.display(), found.len());
                print!("{}", diagnostics::render(file, &found));
                invalid = true;
            }
            Err(err) => {
                eprintln!("{}: {err:#}", file.display());
                unreadable = true;
            }
        }
    }

    if unreadable {
        ExitCode::from(2)
    } else if invalid {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn validate_file(
    compiler: &Compiler,
    validator: &Validator<'_>,
    file: &Path,
) -> anyhow::Result<Vec<Diagnostic>> {
    let tree = compiler
        .load(file)
        .with_context(|| format!("cannot load {}", file.display()))?;
    info!("validating {} ({} nodes)", file.display(), tree.len());
    match validator.validate(&tree) {
        Ok(found) => Ok(found),
        Err(ValidateError::Violation(diagnostic)) => Ok(vec![diagnostic]),
        Err(err) => Err(err).context("the schema is inconsistent"),
    }
}
