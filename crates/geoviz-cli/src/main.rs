use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use geoviz_fragment::{
    FailurePolicy, FragmentConfig, Fragmenter, MemoryRiskPolicy, ParticleClass, RunOutcome, SizeClass,
    EXAMPLE_CONFIG,
};
use geoviz_validator::{Validator, ValidatorConfig};
use geoviz_zarr::{ZarrSink, ZarrSource};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn cli() -> Command {
    Command::new("geoviz")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fragment and validate particle-tracking datasets for GeoViz")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging; with `validate`, full variable details"),
        )
        .subcommand(
            Command::new("fragment")
                .about("Split a dataset into trajectory fragments with SedimentDrift variables")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Input Zarr store"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file; flags override its values"),
                )
                .arg(
                    Arg::new("percentage")
                        .long("percentage")
                        .short('p')
                        .value_parser(value_parser!(f64))
                        .help("Share of trajectories per fragment, in (0, 100]"),
                )
                .arg(
                    Arg::new("prefix")
                        .long("prefix")
                        .help("Output prefix (default: input path without extension)"),
                )
                .arg(
                    Arg::new("class")
                        .long("class")
                        .value_parser(ParticleClass::ALL.map(ParticleClass::as_str))
                        .help("Particle class"),
                )
                .arg(
                    Arg::new("size-class")
                        .long("size-class")
                        .value_parser(SizeClass::ALL.map(SizeClass::as_str))
                        .help("Particle size class"),
                )
                .arg(
                    Arg::new("diameter-mm")
                        .long("diameter-mm")
                        .value_parser(value_parser!(f64))
                        .help("Particle diameter in millimeters"),
                )
                .arg(
                    Arg::new("density")
                        .long("density")
                        .value_parser(value_parser!(f64))
                        .help("Particle density in kg/m³"),
                )
                .arg(
                    Arg::new("no-sediment-vars")
                        .long("no-sediment-vars")
                        .action(ArgAction::SetTrue)
                        .help("Do not add missing SedimentDrift variables"),
                )
                .arg(
                    Arg::new("on-memory-risk")
                        .long("on-memory-risk")
                        .value_parser(["prompt", "accept", "abort"])
                        .help("What to do when a fragment may not fit in memory"),
                )
                .arg(
                    Arg::new("on-failure")
                        .long("on-failure")
                        .value_parser(["keep", "remove"])
                        .help("Keep or remove written fragments when a later one fails"),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_parser(value_parser!(usize))
                        .help("Fragments produced at once"),
                )
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .action(ArgAction::SetTrue)
                        .help("Replace fragments that already exist"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a dataset against the GeoViz schema")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Zarr store to validate"),
                )
                .arg(
                    Arg::new("quick")
                        .long("quick")
                        .short('q')
                        .action(ArgAction::SetTrue)
                        .help("Skip data sampling"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Seed for the data sample"),
                ),
        )
        .subcommand(Command::new("example-config").about("Print a commented example configuration"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Configuration file (if any) with command-line overrides applied
fn fragment_config(args: &ArgMatches) -> Result<FragmentConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => FragmentConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FragmentConfig::new(),
    };

    if let Some(&percentage) = args.get_one::<f64>("percentage") {
        config = config.with_percentage(percentage);
    }
    if let Some(prefix) = args.get_one::<String>("prefix") {
        config = config.with_prefix(prefix.clone());
    }
    if let Some(class) = args.get_one::<String>("class") {
        config = config.with_particle_class(class.parse::<ParticleClass>()?);
    }
    if let Some(size_class) = args.get_one::<String>("size-class") {
        config = config.with_size_class(size_class.parse::<SizeClass>()?);
    }
    if let Some(&diameter) = args.get_one::<f64>("diameter-mm") {
        config = config.with_diameter_mm(diameter);
    }
    if let Some(&density) = args.get_one::<f64>("density") {
        config = config.with_density(density);
    }
    if args.get_flag("no-sediment-vars") {
        config = config.with_sediment_vars(false);
    }
    if let Some(policy) = args.get_one::<String>("on-memory-risk") {
        config = config.with_memory_risk(policy.parse::<MemoryRiskPolicy>().map_err(anyhow::Error::msg)?);
    }
    if let Some(policy) = args.get_one::<String>("on-failure") {
        config = config.with_failure_policy(policy.parse::<FailurePolicy>().map_err(anyhow::Error::msg)?);
    }
    if let Some(&concurrency) = args.get_one::<usize>("concurrency") {
        config = config.with_concurrency(concurrency);
    }
    if args.get_flag("overwrite") {
        config = config.with_overwrite(true);
    }
    Ok(config)
}

fn run_fragment(input: &Path, config: FragmentConfig) -> Result<bool> {
    let sink = ZarrSink::new().with_overwrite(config.overwrite);
    let policy = config.on_memory_risk.into_policy();
    let fragmenter = Fragmenter::new(config, &sink).context("invalid fragmentation parameters")?;

    let source = ZarrSource::open(input).with_context(|| format!("opening {}", input.display()))?;
    let report = fragmenter
        .run(&source, policy.as_ref())
        .with_context(|| format!("fragmenting {}", input.display()))?;
    source.close();

    println!("{report}");
    Ok(report.outcome == RunOutcome::Completed)
}

fn run_validate(input: &Path, config: ValidatorConfig) -> bool {
    let validation = Validator::new(config).validate_path(input);
    println!("{validation}");
    validation.exit_success()
}

fn run(matches: &ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("fragment", args)) => {
            let input = args.get_one::<PathBuf>("input").context("missing input")?;
            let config = fragment_config(args)?;
            run_fragment(input, config)
        }
        Some(("validate", args)) => {
            let input = args.get_one::<PathBuf>("input").context("missing input")?;
            let mut config = ValidatorConfig::new()
                .with_verbose(args.get_flag("verbose"))
                .with_quick(args.get_flag("quick"));
            if let Some(&seed) = args.get_one::<u64>("seed") {
                config = config.with_seed(seed);
            }
            Ok(run_validate(input, config))
        }
        Some(("example-config", _)) => {
            print!("{EXAMPLE_CONFIG}");
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(success) => std::process::exit(if success { 0 } else { 1 }),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
