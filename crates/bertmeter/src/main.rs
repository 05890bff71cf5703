use std::io;

use anyhow::{anyhow, Context};
use byteorder::ReadBytesExt;
use clap::Parser;
use log::{info, warn, LevelFilter};

use pnbert::Lines;

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match bertmeter() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn bertmeter() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // settings: stored, then overridden
    let builder = app::load_settings(&args)?;
    if !args.quiet {
        println!("{}", builder);
    }

    if args.save {
        if let Some(path) = &args.settings {
            app::save_settings(path, &builder)?;
        }
        return Ok(());
    }

    let mut bert = builder.build();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.demo {
        warn!("demonstration (--demo) mode: the following results are NOT LIVE!");
        app::run(&args, &mut bert, app::demo_lines(&args, &builder), &mut out)?;
        return Ok(());
    }

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let mut inbuf = file_setup(&args, stdin_handle)?;

    // processing: one byte per line sample
    app::run(
        &args,
        &mut bert,
        std::iter::from_fn(|| Some(Lines::from_byte(inbuf.read_u8().ok()?))),
        &mut out,
    )?;

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("pnbert", log_filter)
            .filter_module("bertmeter", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("BER tester reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read line samples from a terminal.

Pipe a raw logic-analyzer capture, one byte per sample, from
sigrok-cli or similar into this program. Or try --demo."
            ))
        }
    } else {
        info!("BER tester reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
