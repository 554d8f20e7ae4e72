use std::env;
use std::process::ExitCode;

use crafting_interpreters::runner::{run_file, stringify};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let path = match args.as_slice() {
        [_, path] => path,
        _ => {
            eprintln!("Usage: crafting-interpreters <script>");
            return ExitCode::from(64);
        }
    };

    match run_file(path) {
        Ok(outcome) => {
            println!("{}", stringify(&outcome.value));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
