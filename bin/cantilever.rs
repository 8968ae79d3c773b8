use std::{env, fs::File, io::Write, process};

use dersim::config::{read_config_from_file, RodConfig};

/// Steps a rod clamped at its first edge under gravity and writes the z
/// coordinate of the last node over time.
///
/// Usage: `cantilever [config.yaml] [output.csv]`. Without a config file the
/// built-in ring scenario is used.
fn main() {
    let args = env::args().collect::<Vec<_>>();

    let config = match args.get(1) {
        Some(path) => match read_config_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to read {path}: {e}");
                process::exit(1);
            }
        },
        None => RodConfig::ring(),
    };
    let output = args.get(2).map(String::as_str).unwrap_or("cantilever.csv");

    let (state, solver) = match config
        .build_model()
        .map_err(|e| e.to_string())
        .and_then(|(model, state)| {
            let solver = model.create_solver().map_err(|e| e.to_string())?;
            Ok((state, solver))
        }) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("invalid model: {e}");
            process::exit(1);
        }
    };

    let mut file = match File::create(output) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("failed to create {output}: {e}");
            process::exit(1);
        }
    };

    let last = state.n_nodes() - 1;
    let mut state = state;
    let mut lines = vec!["time,z_last".to_string()];

    for _ in 0..config.n_steps() {
        let out = match solver.step(&state) {
            Ok(out) => out,
            Err(e) => {
                eprintln!("t = {:.4}: {e}", state.time);
                process::exit(1);
            }
        };
        state = out.state;
        lines.push(format!("{},{}", state.time, state.node_position(last)[2]));
    }

    if let Err(e) = writeln!(file, "{}", lines.join("\n")) {
        eprintln!("failed to write {output}: {e}");
        process::exit(1);
    }

    println!(
        "t = {:.3}, z_last = {:.6}",
        state.time,
        state.node_position(last)[2]
    );
}
