use std::process::ExitCode;

use yaml_update::cli;
use yaml_update::ui::output;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
