use clap::Parser;
use doe_slice::config::{ProgramSpace, ProjectConfig};
use doe_slice::doe::{DoeStrategy, FractionalFactorial, NHot, OneHot, Random};
use doe_slice::driver::{self, RunOptions};
use doe_slice::evaluate::ScriptEvaluator;
use doe_slice::factor::{FactorSpace, LineFactorSpace, TreeFactorSpace};
use doe_slice::matrix::ExperimentMatrix;
use doe_slice::toolchain::SrcmlToolchain;
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doe_slice")]
#[command(about = "Run deletion experiments over a program and record the observed responses")]
struct Args {
    /// Path to a project directory (config/config.toml, program, scripts)
    #[arg(value_name = "PROJECT")]
    project: PathBuf,

    /// Granularity of deletion units
    #[arg(long, default_value = "tree", require_equals = true)]
    factor_level: FactorLevel,

    /// Experiment generation strategy
    #[arg(long, default_value = "onehot", require_equals = true)]
    strategy: Strategy,

    /// Per-unit deletion probability for the random strategy (default 1/size)
    #[arg(long, require_equals = true)]
    threshold: Option<f64>,

    /// Largest simultaneous deletion for the n-hot strategy
    #[arg(long, default_value_t = 2, require_equals = true)]
    max_n: usize,

    /// Distinct-mask budget for the random strategy
    #[arg(long, default_value_t = 100, require_equals = true)]
    budget: usize,

    /// Stop after this many experiments (0 = run the whole plan)
    #[arg(long, default_value_t = 0, require_equals = true)]
    max_experiments: usize,

    /// Matrix output path (default <project>/doe_matrix.csv)
    #[arg(long, require_equals = true)]
    output: Option<PathBuf>,

    /// Keep every variant in its own directory instead of one shared work dir
    #[arg(long)]
    save_variants: bool,

    /// Seed for the random strategy (default: OS entropy)
    #[arg(long, require_equals = true)]
    seed: Option<u64>,

    /// Run rows START..END of the saved plan instead of generating one (0 0 = all rows)
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    planned: Option<Vec<usize>>,

    /// Logging verbosity (use -v for info, or -v=LEVEL for specific level)
    #[arg(long, short = 'v', value_name = "LEVEL", num_args = 0..=1, default_missing_value = "info", require_equals = true)]
    verbose: Option<Option<LogLevel>>,
}

#[derive(Clone, clap::ValueEnum)]
enum FactorLevel {
    Line,
    Tree,
}

#[derive(Clone, clap::ValueEnum)]
enum Strategy {
    #[value(name = "onehot")]
    OneHot,
    #[value(name = "nhot")]
    NHot,
    #[value(name = "random")]
    Random,
    #[value(name = "ff2l")]
    FractionalFactorial,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Handle verbose flag: None = not specified, Some(None) = specified
    // without value (defaults to info), Some(Some(level)) = specified with value
    let log_level = match args.verbose {
        None => LevelFilter::Off,
        Some(None) => LevelFilter::Info,
        Some(Some(level)) => level.into(),
    };
    Builder::from_default_env().filter_level(log_level).init();

    let config = ProjectConfig::load(&args.project).unwrap_or_else(|e| {
        eprintln!("Failed to load project configuration: {}", e);
        std::process::exit(1);
    });
    let program = ProgramSpace::new(&args.project, &config).unwrap_or_else(|e| {
        eprintln!("Failed to resolve program space: {}", e);
        std::process::exit(1);
    });

    println!(
        "Loaded project with {} target file(s), {} test(s), {} criterion(s).",
        program.files.len(),
        program.num_tests,
        program.num_criteria
    );

    let space: Box<dyn FactorSpace> = match args.factor_level {
        FactorLevel::Line => LineFactorSpace::new(&program.orig_dir, &program.files)
            .map(|s| Box::new(s) as Box<dyn FactorSpace>),
        FactorLevel::Tree => TreeFactorSpace::new(
            &program.orig_dir,
            &program.files,
            &program.marker_prefix,
            Box::new(SrcmlToolchain::new()),
        )
        .map(|s| Box::new(s) as Box<dyn FactorSpace>),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to build factor space: {}", e);
        std::process::exit(1);
    });

    println!("Factor space has {} deletion unit(s).", space.size());

    let mut strategy: Box<dyn DoeStrategy> = match args.strategy {
        Strategy::OneHot => Box::new(OneHot),
        Strategy::NHot => match NHot::new(args.max_n) {
            Ok(s) => Box::new(s),
            Err(e) => {
                eprintln!("Invalid strategy parameters: {}", e);
                std::process::exit(1);
            }
        },
        Strategy::Random => Box::new(Random::new(args.threshold, args.budget, args.seed)),
        Strategy::FractionalFactorial => Box::new(FractionalFactorial),
    };

    let planned = args.planned.as_deref().map(|rows| (rows[0], rows[1]));
    let mut queue = driver::plan_queue(
        space.as_ref(),
        strategy.as_mut(),
        planned,
        &program.plan_path(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to prepare the experiment plan: {}", e);
        std::process::exit(1);
    });

    println!("Plan holds {} experiment(s).", queue.len());

    let evaluator = ScriptEvaluator::new(
        program.compile_script.clone(),
        program.execute_script.clone(),
        program.terminate_script.clone(),
        program.response_len(),
        program.timeout,
    )
    .keep_artifacts(args.save_variants);

    let options = RunOptions {
        max_experiments: (args.max_experiments > 0).then_some(args.max_experiments),
        save_variants: args.save_variants,
    };

    let mut matrix = ExperimentMatrix::new();
    let summary = driver::run_experiments(
        space.as_ref(),
        &mut queue,
        &evaluator,
        &mut matrix,
        &program,
        &options,
    )
    .unwrap_or_else(|e| {
        eprintln!("Experiment run aborted: {}", e);
        std::process::exit(1);
    });

    let output = args.output.unwrap_or_else(|| program.matrix_path());
    matrix
        .save(&output, program.num_tests, program.num_criteria)
        .unwrap_or_else(|e| {
            eprintln!("Failed to save the matrix: {}", e);
            std::process::exit(1);
        });

    println!(
        "Recorded {} experiment(s) ({} evaluation failure(s)) to {}.",
        summary.executed,
        summary.failures,
        output.display()
    );
}
