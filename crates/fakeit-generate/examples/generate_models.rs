use std::env;
use std::path::PathBuf;

use fakeit_generate::{
    ConsoleDestination, DirectoryDestination, FsInputLoader, GenerateOptions, GenerationEngine,
    GeneratorRegistry, OutputFormat, compile_models, write_outputs,
};
use fakeit_model::load_models;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut models_path: Option<PathBuf> = None;
    let mut inputs_dir: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--models" => models_path = args.next().map(PathBuf::from),
            "--inputs" => inputs_dir = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from),
            "--seed" => seed = args.next().map(|value| value.parse()).transpose()?,
            _ => {
                if models_path.is_none() {
                    models_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let models_path = models_path.ok_or("missing --models path")?;
    let inputs_dir = inputs_dir.unwrap_or_else(|| PathBuf::from("."));

    let mut options = GenerateOptions::default();
    if let Some(seed) = seed {
        options.seed = seed;
    }

    let validated = load_models(&models_path)?;
    let registry = compile_models(&validated.models, &GeneratorRegistry::new(), options.seed)?;
    let engine = GenerationEngine::new(options, FsInputLoader::new(inputs_dir));
    let result = engine.run(&registry)?;

    let formatter = OutputFormat::Ndjson.formatter();
    match out_dir {
        Some(dir) => {
            let files = write_outputs(
                &result.stores,
                formatter.as_ref(),
                &mut DirectoryDestination::new(dir),
            )?;
            for file in files {
                eprintln!("{}: {} documents", file.model, file.documents);
            }
        }
        None => {
            write_outputs(&result.stores, formatter.as_ref(), &mut ConsoleDestination)?;
        }
    }

    eprintln!("{}", result.report.summary());
    Ok(())
}
