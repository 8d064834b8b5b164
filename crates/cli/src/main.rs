use std::process::ExitCode;

fn main() -> ExitCode {
    ecosim_cli::run()
}
