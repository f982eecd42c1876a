use std::process::ExitCode;

fn main() -> ExitCode {
    kirana_cli::run()
}
