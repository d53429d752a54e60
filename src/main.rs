use std::process::ExitCode;

fn main() -> ExitCode {
    orion_health_lib::run()
}
