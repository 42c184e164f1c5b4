use std::{env, fs, process::ExitCode};

use willow::{ConsoleSink, Limits, NoopTracer, Runner, StdOutput};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { args[1].as_str() } else { "example.wil" };

    let source = match read_file(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = Runner::new(Box::leak(file_path.to_owned().into_boxed_str()), Limits::default_bounded());
    let (sink, _output, outcome) = runner.run(&source, ConsoleSink::default(), StdOutput, NoopTracer);

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        debug_assert!(sink.had_error, "a failed run should have reported at least one error");
        ExitCode::FAILURE
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => return Err(format!("reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("reading {file_path}: {err}"))
}
