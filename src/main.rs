//! NK OEE CLI - Run NK landscape evolution from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use nk_oee::{
    compute::evolution::NkWorld,
    output::{OutputError, RunRecorder},
    schema::RunConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output_dir]", args[0]);
        eprintln!();
        eprintln!("Evolve a population on an NK landscape and record OEE metrics.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  output_dir   Directory for CSV output (overrides output.directory)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(dir) = args.get(2) {
        config.output.directory = PathBuf::from(dir);
    }

    println!("NK Landscape Evolution");
    println!("======================");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting config: {}", e),
    }
    println!();

    let generations = config.population.max_generations;
    let directory = config.output.directory.clone();

    let mut world = NkWorld::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    println!("Seed: {}", world.seed());

    let mut recorder = RunRecorder::create(&directory).unwrap_or_else(|e| {
        eprintln!("Error opening output: {}", e);
        std::process::exit(1);
    });

    println!("Running {} generations...", generations);
    let start = Instant::now();
    let progress_every = (generations / 10).max(1);

    let summary = world
        .run_with_callback(|report| {
            recorder.record(report)?;

            // Print progress every 10%
            if report.generation > 0 && report.generation % progress_every == 0 {
                let elapsed = start.elapsed().as_secs_f32();
                let rate = report.generation as f32 / elapsed;
                match &report.oee {
                    Some(oee) => println!(
                        "  Generation {}/{}: change={} novelty={} ecology={} complexity={}, {:.1} gens/s",
                        report.generation,
                        generations,
                        oee.change,
                        oee.novelty,
                        oee.ecology,
                        oee.complexity,
                        rate
                    ),
                    None => println!(
                        "  Generation {}/{}: {:.1} gens/s",
                        report.generation, generations, rate
                    ),
                }
            }
            Ok::<(), OutputError>(())
        })
        .unwrap_or_else(|e| {
            eprintln!("Error writing output: {}", e);
            std::process::exit(1);
        });

    let recorded = recorder.finalize(&summary).unwrap_or_else(|e| {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    });

    println!();
    println!("Final state:");
    if let Some(oee) = &summary.final_oee {
        println!("  Change potential: {}", oee.change);
        println!("  Novelty potential: {}", oee.novelty);
        println!("  Ecology potential: {}", oee.ecology);
        println!("  Complexity potential: {}", oee.complexity);
        println!("  Skeleton entropy: {:.4}", oee.diversity);
    }
    println!(
        "  Fitness: mean={:.4} max={:.4}",
        summary.final_fitness.mean, summary.final_fitness.max
    );
    println!(
        "  Landscapes built: {} ({} environment changes)",
        summary.landscapes_built, summary.environment_changes
    );
    println!();
    println!("Wrote {} to {}", recorded, directory.display());
    println!(
        "Time: {:.2}s ({:.1} gens/s)",
        summary.elapsed_seconds,
        summary.generations as f64 / summary.elapsed_seconds.max(f64::EPSILON)
    );
}

fn print_example_config() {
    let config = RunConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting config: {}", e),
    }
}
