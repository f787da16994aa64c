//! Manual `VecDeque<OsString>` argument parser for the `riscos-zip` binary.
//!
//! The command surface is flag-selected rather than subcommand-based (one
//! mode flag picks `create`/`extract`/`list`/`settypes`, everything else is
//! an option or a positional archive/member path), so there is no per-mode
//! parser trait here — just one pass over argv building up an `Args`.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

use riscos_zip::Compression;

static PARSED_EXE_NAME: OnceLock<String> = OnceLock::new();

pub fn binary_name() -> &'static str {
    PARSED_EXE_NAME.get().map(String::as_str).unwrap_or("riscos-zip")
}

#[derive(Debug)]
pub enum ArgParseError {
    StdoutMessage(String),
    StderrMessage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Extract,
    List,
    SetTypes,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub verbose: bool,
    pub compression: Compression,
    pub default_filetype: Option<String>,
    pub chdir: Option<PathBuf>,
    pub archive: PathBuf,
    pub members: Vec<String>,
}

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn usage_line() -> String {
    format!(
        "Usage: {} (-c|-e|-l|-t) [-0|-1|-6|-9] [-v] [-T <filetype>] [-C <dir>] <archive> [members...]",
        binary_name()
    )
}

fn full_help_text() -> String {
    format!(
        "\
{DESCRIPTION}

{}

Commands (exactly one required):
  -c, --create           create an archive from the given member paths
  -e, --extract          extract members (or all members) to the current directory
  -l, --list             list members and their RISC OS metadata
  -t, --settypes         rewrite members' RISC OS filetype in place

Options:
  -0, --store            store members uncompressed
  -1, --faster           deflate, fastest (compatibility alias for deflate)
  -6, --deflate          deflate, normal level (default)
  -9, --better           deflate, best compression (compatibility alias for deflate)
  -v, --verbose          use the verbose listing form, and log at debug level
  -T, --default-filetype <hex or name>   filetype for --settypes, or --create defaults
  -C, --chdir <dir>      change directory before resolving archive/member paths
  -h, --help             print this help
  -V, --version          print version
",
        usage_line()
    )
}

fn brief_help(context: &str) -> String {
    format!("error: {context}\n\n{}\n", usage_line())
}

/// Parse a full `argv` (including argv[0]) into [`Args`].
pub fn parse_argv(argv: impl IntoIterator<Item = OsString>) -> Result<Args, ArgParseError> {
    let mut argv: VecDeque<OsString> = argv.into_iter().collect();
    let exe_name = argv
        .pop_front()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "riscos-zip".to_owned());
    let _ = PARSED_EXE_NAME.set(exe_name);

    let mut mode: Option<Mode> = None;
    let mut verbose = false;
    let mut compression = Compression::Deflated;
    let mut default_filetype: Option<String> = None;
    let mut chdir: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = argv.pop_front() {
        let Some(arg_str) = arg.to_str() else {
            return Err(ArgParseError::StderrMessage(brief_help("argument is not valid UTF-8")));
        };
        match arg_str {
            "-c" | "--create" => mode = Some(Mode::Create),
            "-e" | "--extract" => mode = Some(Mode::Extract),
            "-l" | "--list" => mode = Some(Mode::List),
            "-t" | "--settypes" => mode = Some(Mode::SetTypes),
            "-0" | "--store" => compression = Compression::Stored,
            "-1" | "--faster" | "-6" | "--deflate" | "-9" | "--better" => compression = Compression::Deflated,
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => return Err(ArgParseError::StdoutMessage(full_help_text())),
            "-V" | "--version" => return Err(ArgParseError::StdoutMessage(format!("{} {VERSION}\n", binary_name()))),
            "-T" | "--default-filetype" => {
                let value = argv
                    .pop_front()
                    .and_then(|s| s.into_string().ok())
                    .ok_or_else(|| ArgParseError::StderrMessage(brief_help("-T/--default-filetype needs an argument")))?;
                default_filetype = Some(value);
            }
            "-C" | "--chdir" => {
                let value = argv
                    .pop_front()
                    .ok_or_else(|| ArgParseError::StderrMessage(brief_help("-C/--chdir needs an argument")))?;
                chdir = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(ArgParseError::StderrMessage(brief_help(&format!("unrecognized flag {other:?}"))));
            }
            other => positional.push(other.to_owned()),
        }
    }

    let mode = mode.ok_or_else(|| ArgParseError::StderrMessage(brief_help("no command given (one of -c/-e/-l/-t is required)")))?;
    if positional.is_empty() {
        return Err(ArgParseError::StderrMessage(brief_help("no archive path given")));
    }
    let archive = PathBuf::from(positional.remove(0));

    Ok(Args { mode, verbose, compression, default_filetype, chdir, archive, members: positional })
}
