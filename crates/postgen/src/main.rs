//! postgen: generate API client code from a Postman collection.

mod config;

use clap::{ArgAction, Parser, ValueEnum};
use config::{ConfigError, PostgenConfig};
use postgen_codegen::{
    CollisionPolicy, ExistingDirPolicy, FsSink, GenerateOptions, builtin_emitter, emitter_names,
    generate, load_collection,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "POSTGEN_LOG";

/// Generate request models and client calls from a Postman collection
#[derive(Parser)]
#[command(name = "postgen", version, about)]
struct Cli {
    /// Postman collection JSON file
    #[arg(default_value = "postman_collection.json")]
    input: PathBuf,

    /// Directory to create the collection directory in [default: .]
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Emitter (target language) [default: go]
    #[arg(short, long)]
    emitter: Option<String>,

    /// What to do when the output directory already exists [default: fail]
    #[arg(long, value_enum)]
    on_existing: Option<OnExisting>,

    /// What to do when two requests map to the same file name [default: suffix]
    #[arg(long, value_enum)]
    collisions: Option<Collisions>,

    /// Directory with models.tmpl, model.tmpl or request.tmpl overrides
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Code inserted verbatim into every request function
    #[arg(long)]
    target_code: Option<String>,

    /// Package or module name for generated code
    #[arg(long)]
    package: Option<String>,

    /// Keep {{variable}} references instead of substituting collection variables
    #[arg(long)]
    no_variables: bool,

    /// Config file to use instead of the global and project configs
    #[arg(long)]
    config: Option<PathBuf>,

    /// List built-in emitters and exit
    #[arg(long)]
    list_emitters: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OnExisting {
    /// Stop with an error
    Fail,
    /// Write into the existing directory
    Merge,
    /// Create name_2, name_3, ...
    Version,
}

impl From<OnExisting> for ExistingDirPolicy {
    fn from(value: OnExisting) -> Self {
        match value {
            OnExisting::Fail => ExistingDirPolicy::Fail,
            OnExisting::Merge => ExistingDirPolicy::Merge,
            OnExisting::Version => ExistingDirPolicy::Version,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Collisions {
    /// Append _2, _3, ... to later requests
    Suffix,
    /// Keep only the last request
    Overwrite,
    /// Stop with an error
    Error,
}

impl From<Collisions> for CollisionPolicy {
    fn from(value: Collisions) -> Self {
        match value {
            Collisions::Suffix => CollisionPolicy::Suffix,
            Collisions::Overwrite => CollisionPolicy::Overwrite,
            Collisions::Error => CollisionPolicy::Error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Codegen(#[from] postgen_codegen::Error),
}

/// Config layers and flags resolved into one set of settings.
struct Settings {
    emitter: String,
    out_dir: PathBuf,
    on_existing: ExistingDirPolicy,
    templates: Option<PathBuf>,
    options: GenerateOptions,
}

impl Settings {
    fn resolve(cli: &Cli, config: PostgenConfig) -> Self {
        let output = config.output;
        let render = config.render;
        Self {
            emitter: cli
                .emitter
                .clone()
                .or(output.emitter)
                .unwrap_or_else(|| "go".to_string()),
            out_dir: cli
                .out_dir
                .clone()
                .or(output.dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            on_existing: cli
                .on_existing
                .map(Into::into)
                .or(output.on_existing)
                .unwrap_or_default(),
            templates: cli.templates.clone().or(render.templates),
            options: GenerateOptions {
                collisions: cli
                    .collisions
                    .map(Into::into)
                    .or(output.collisions)
                    .unwrap_or_default(),
                resolve_variables: !cli.no_variables && render.resolve_variables.unwrap_or(true),
                target_code: cli.target_code.clone().or(render.target_code),
                package: cli.package.clone().or(render.package),
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.list_emitters {
        for name in emitter_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => PostgenConfig::load_explicit(path)?,
        None => PostgenConfig::load(Path::new("."))?,
    };
    let settings = Settings::resolve(cli, config);

    let collection = load_collection(&cli.input)?;
    let mut emitter = builtin_emitter(&settings.emitter)?;
    if let Some(dir) = &settings.templates {
        emitter = emitter.with_templates_from(dir)?;
    }

    let generated = generate(&collection, &emitter, &settings.options)?;
    let mut sink = FsSink::new(&settings.out_dir, settings.on_existing);
    let dir = generated.write_to(&mut sink)?;

    if !cli.quiet {
        println!(
            "Generated {} files for \"{}\" in {}",
            generated.artifacts.len(),
            collection.name,
            dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("postgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let cli = parse(&[]);
        let settings = Settings::resolve(&cli, PostgenConfig::default());
        assert_eq!(cli.input, PathBuf::from("postman_collection.json"));
        assert_eq!(settings.emitter, "go");
        assert_eq!(settings.out_dir, PathBuf::from("."));
        assert_eq!(settings.on_existing, ExistingDirPolicy::Fail);
        assert_eq!(settings.options.collisions, CollisionPolicy::Suffix);
        assert!(settings.options.resolve_variables);
    }

    #[test]
    fn flags_override_config() {
        let config: PostgenConfig = toml::from_str(
            "[output]\nemitter = \"go\"\ncollisions = \"error\"\n[render]\npackage = \"cfg\"\n",
        )
        .unwrap();
        let cli = parse(&["--emitter", "rust", "--on-existing", "version", "--no-variables"]);
        let settings = Settings::resolve(&cli, config);

        assert_eq!(settings.emitter, "rust");
        assert_eq!(settings.on_existing, ExistingDirPolicy::Version);
        assert_eq!(settings.options.collisions, CollisionPolicy::Error);
        assert_eq!(settings.options.package.as_deref(), Some("cfg"));
        assert!(!settings.options.resolve_variables);
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["postgen", "-v", "-q"]).is_err());
    }
}
