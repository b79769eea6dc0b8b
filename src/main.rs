use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use confed::{CliArgs, ConfedError, InputSource, Registry, run_session};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ConfedError::UnknownSettingsKeys(errors)) => {
            for err in errors {
                eprintln!("confed: {err}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("confed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "confed=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<(), ConfedError> {
    let overrides = args.overrides();
    let invocation = args.into_invocation();

    if invocation.print_settings {
        print!("{}", confed::template());
        return Ok(());
    }

    let settings = confed::load_settings(overrides)?;
    let registry = Registry::with_defaults(settings.render_options());

    let input = match &invocation.input {
        InputSource::Stdin => read_stdin()?,
        InputSource::File(path) => std::fs::read(path).map_err(|e| ConfedError::IoError {
            path: path.clone(),
            source: e,
        })?,
    };
    let script = if invocation.run_commands {
        Some(String::from_utf8_lossy(&read_stdin()?).into_owned())
    } else {
        None
    };

    let output = run_session(&registry, &settings, &input, script.as_deref())?;

    let mut stdout = io::stdout().lock();
    for result in &output.results {
        let text = result.to_string();
        let newline = if text.ends_with('\n') { "" } else { "\n" };
        write!(stdout, "{text}{newline}").map_err(stdout_error)?;
    }
    if let Some(document) = output.document {
        stdout.write_all(&document).map_err(stdout_error)?;
    }
    stdout.flush().map_err(stdout_error)
}

fn read_stdin() -> Result<Vec<u8>, ConfedError> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .map_err(|e| ConfedError::IoError {
            path: PathBuf::from("<stdin>"),
            source: e,
        })?;
    Ok(buf)
}

fn stdout_error(source: io::Error) -> ConfedError {
    ConfedError::IoError {
        path: PathBuf::from("<stdout>"),
        source,
    }
}
