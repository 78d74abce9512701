use std::env;
use std::fs;
use std::process;

use log::debug;
use timeslice::{api, validate_score, EngineConfig};

fn usage() -> ! {
    eprintln!("Usage: timeslice layout <score.json> [--config engine.yaml]");
    eprintln!("       timeslice breakdown <score.json> [--config engine.yaml]");
    eprintln!(
        "       timeslice insert <score.json> <bar> <beat> <note> <duration> [output.json] [--config engine.yaml]"
    );
    eprintln!("       timeslice validate <score.json>");
    process::exit(1);
}

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> T {
    match value.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Invalid {}: {}", what, value);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    // Pull out --config before reading positionals
    let mut config = EngineConfig::default();
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        let Some(path) = args.get(pos + 1).cloned() else {
            usage();
        };
        config = match EngineConfig::from_yaml(&read_file(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in '{}': {}", path, e);
                process::exit(1);
            }
        };
        args.drain(pos..=pos + 1);
    }
    debug!("config: {:?}", config);

    if args.len() < 2 {
        usage();
    }

    let source = read_file(&args[1]);
    let mut output_path: Option<&String> = None;

    let result = match args[0].as_str() {
        "layout" => api::layout_json(&source, &config),
        "breakdown" => api::breakdown_json(&source, &config),
        "insert" => {
            if args.len() < 6 {
                usage();
            }
            let bar: usize = parse_number(&args[2], "bar number");
            let beat: f64 = parse_number(&args[3], "beat");
            let duration: f64 = parse_number(&args[5], "duration");
            output_path = args.get(6);
            api::insert_json(&source, bar, beat, &args[4], duration, &config)
        }
        "validate" => api::score_from_json(&source)
            .and_then(|score| validate_score(&score))
            .map(|()| format!("{}: ok", args[1])),
        _ => usage(),
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &output) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote score to {}", path);
        }
        None => {
            println!("{}", output);
        }
    }
}
