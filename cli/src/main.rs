use std::process::ExitCode;

fn main() -> ExitCode {
    riscos_zip_cli::run(std::env::args_os())
}
