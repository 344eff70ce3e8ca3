use std::process::ExitCode;

fn main() -> ExitCode {
    ordercopilot_cli::run()
}
