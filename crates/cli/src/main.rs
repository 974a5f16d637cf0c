use std::process::ExitCode;

fn main() -> ExitCode {
    amlbot_cli::run()
}
