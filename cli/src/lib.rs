//! The `riscos-zip` command-line tool: `run()` parses argv, dispatches to a
//! mode handler, and reports a plain-text error to stderr on failure, the way
//! the underlying library leaves all user-facing output to its caller.

mod args;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;
use std::sync::Arc;

use riscos_zip::archive::{ArchiveReader, ArchiveWriter, PrintStyle};
use riscos_zip::config::{self, Config};
use riscos_zip::zip_adapter::{ZipContainerReader, ZipContainerWriter};

use args::{ArgParseError, Args, Mode};

pub const NON_FAILURE_EXIT_CODE: u8 = 0;
pub const RUNTIME_FAILURE_EXIT_CODE: u8 = 1;
pub const ARGV_PARSE_FAILED_EXIT_CODE: u8 = 2;

/// Parse argv and run the requested command, returning a process exit code.
pub fn run(argv: impl IntoIterator<Item = std::ffi::OsString>) -> ExitCode {
    let args = match args::parse_argv(argv) {
        Ok(args) => args,
        Err(ArgParseError::StdoutMessage(msg)) => {
            print!("{msg}");
            return ExitCode::from(NON_FAILURE_EXIT_CODE);
        }
        Err(ArgParseError::StderrMessage(msg)) => {
            eprint!("{msg}");
            return ExitCode::from(ARGV_PARSE_FAILED_EXIT_CODE);
        }
    };

    if args.verbose {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    if let Some(dir) = &args.chdir {
        if let Err(err) = std::env::set_current_dir(dir) {
            eprintln!("{}: cannot chdir to {}: {err}", args::binary_name(), dir.display());
            return ExitCode::from(RUNTIME_FAILURE_EXIT_CODE);
        }
    }

    match dispatch(&args) {
        Ok(()) => ExitCode::from(NON_FAILURE_EXIT_CODE),
        Err(err) => {
            eprintln!("{}: {err}", args::binary_name());
            ExitCode::from(RUNTIME_FAILURE_EXIT_CODE)
        }
    }
}

fn build_config(args: &Args) -> Result<Arc<Config>, io::Error> {
    let mut config = Config::default();
    if let Some(arg) = &args.default_filetype {
        let filetype =
            config::parse_filetype_arg(arg).ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!(
                "'{arg}' is not a recognised filetype name or hex literal"
            )))?;
        config.default_filetype = filetype;
    }
    Ok(Arc::new(config))
}

fn dispatch(args: &Args) -> io::Result<()> {
    match args.mode {
        Mode::Create => create(args),
        Mode::Extract => extract(args),
        Mode::List => list(args),
        Mode::SetTypes => settypes(args),
    }
}

fn create(args: &Args) -> io::Result<()> {
    let config = build_config(args)?;
    let file = File::create(&args.archive)?;
    let container = ZipContainerWriter::new(BufWriter::new(file));
    let mut writer = ArchiveWriter::new(container, config, args.compression);

    for member in &args.members {
        let path = std::path::Path::new(member);
        let arcname = member.trim_end_matches('/');
        let meta = fs::metadata(path)?;
        if meta.is_dir() {
            writer.add_dir(path, arcname)?;
        } else {
            writer.add_file(path, arcname)?;
        }
    }
    writer.finish()?;
    Ok(())
}

fn open_reader(args: &Args) -> io::Result<(ArchiveReader<ZipContainerReader<BufReader<File>>>, Arc<Config>)> {
    let config = build_config(args)?;
    let file = File::open(&args.archive)?;
    let container = ZipContainerReader::new(BufReader::new(file))
        .map_err(riscos_zip::Error::from)?;
    Ok((ArchiveReader::new(container, config.clone()), config))
}

fn extract(args: &Args) -> io::Result<()> {
    let (mut reader, _config) = open_reader(args)?;
    let records: Vec<_> = reader.list().map_err(io::Error::from)?;
    let dest = std::path::Path::new(".");
    for (index, record) in records.iter().enumerate() {
        if !args.members.is_empty() && !args.members.iter().any(|m| m == record.filename()) {
            continue;
        }
        reader.extract(index, record, dest).map_err(io::Error::from)?;
    }
    Ok(())
}

fn list(args: &Args) -> io::Result<()> {
    let (mut reader, _config) = open_reader(args)?;
    let style = if args.verbose { PrintStyle::Verbose } else { PrintStyle::Compact };
    let out = reader.printdir(style).map_err(io::Error::from)?;
    print!("{out}");
    Ok(())
}

/// Rewrite every named member's (or, with no members given, every member's)
/// RISC OS filetype to `--default-filetype`, preserving bodies and every
/// other attribute, then replace the archive in place.
fn settypes(args: &Args) -> io::Result<()> {
    let Some(filetype_arg) = &args.default_filetype else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "--settypes requires -T/--default-filetype to give the new filetype",
        ));
    };
    let filetype = config::parse_filetype_arg(filetype_arg).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("'{filetype_arg}' is not a recognised filetype name or hex literal"))
    })?;

    let (mut reader, config) = open_reader(args)?;
    let mut records = reader.list().map_err(io::Error::from)?;
    let mut bodies = Vec::with_capacity(records.len());
    for index in 0..records.len() {
        bodies.push(reader.read_member_bytes(index).map_err(io::Error::from)?);
    }
    drop(reader);

    for record in &mut records {
        if !args.members.is_empty() && !args.members.iter().any(|m| m == record.filename()) {
            continue;
        }
        record.set_nfs_encoding(false);
        record.set_riscos_filetype(filetype);
    }

    let tmp_path = args.archive.with_extension("riscoszip-tmp");
    let out_file = File::create(&tmp_path)?;
    let container = ZipContainerWriter::new(BufWriter::new(out_file));
    let mut writer = ArchiveWriter::new(container, config, args.compression);
    for (record, body) in records.iter().zip(bodies.iter()) {
        writer.write_record(record, body).map_err(io::Error::from)?;
    }
    writer.finish().map_err(io::Error::from)?;

    fs::rename(&tmp_path, &args.archive)?;
    Ok(())
}
