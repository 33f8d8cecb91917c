#![forbid(unsafe_code)]

use std::process::ExitCode;

fn main() -> ExitCode {
    dbt_lens_cli::main_entry()
}
