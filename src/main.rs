use clap::{crate_version, value_parser, Arg, Command};
use log::{error, info, warn};
use std::fs::File;
use std::path::PathBuf;

use zadankai::solver::SolveParams;
use zadankai::{io, rotation};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Command::new("zadankai")
        .version(crate_version!())
        .about("Assign students to company rotation groups over several terms")
        .arg(
            Arg::new("INPUT")
                .help("Input JSON file with companies, students, terms, ratings and weights")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("OUTPUT")
                .short('o')
                .long("output")
                .help("Write the result to this file instead of stdout")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of search threads. Defaults to the number of CPUs")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed of the random search order, overriding the input's seed")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Search time limit in seconds, overriding the input's maxTimeout")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    let input_path = match args.get_one::<PathBuf>("INPUT") {
        Some(path) => path,
        None => {
            error!("No input file given");
            std::process::exit(exitcode::USAGE);
        }
    };
    let file = match File::open(input_path) {
        Ok(file) => file,
        Err(e) => {
            error!("Could not open input file {}: {}", input_path.display(), e);
            std::process::exit(exitcode::NOINPUT);
        }
    };
    let mut payload = match io::simple::read(file) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Could not read input file: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };

    if let Some(timeout) = args.get_one::<u64>("timeout") {
        payload.max_timeout = *timeout;
    }
    if let Some(seed) = args.get_one::<u64>("seed") {
        payload.seed = Some(*seed);
    }
    let problem = match payload.validate() {
        Ok(problem) => problem,
        Err(e) => {
            error!("Invalid input: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!(
        "Read {} companies, {} students and {} terms",
        problem.num_companies, problem.num_students, problem.num_terms
    );

    let mut params = SolveParams::for_problem(&problem);
    params.threads = args
        .get_one::<usize>("threads")
        .copied()
        .unwrap_or_else(num_cpus::get);
    if params.threads > 1 && params.strategy.seed.is_some() {
        warn!("A seeded search is only reproducible with a single thread");
    }

    let outcome = match rotation::solve(&problem, &params) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    match &outcome {
        Some(outcome) => info!("Found rotation with objective {}", outcome.summary.objective),
        None => warn!("No rotation found within {:?}", params.time_limit),
    }

    let result = match args.get_one::<PathBuf>("OUTPUT") {
        Some(path) => match File::create(path) {
            Ok(file) => io::simple::write(file, outcome.as_ref()),
            Err(e) => {
                error!("Could not create output file {}: {}", path.display(), e);
                std::process::exit(exitcode::CANTCREAT);
            }
        },
        None => io::simple::write(std::io::stdout().lock(), outcome.as_ref()),
    };
    if let Err(e) = result {
        error!("Could not write result: {}", e);
        std::process::exit(exitcode::IOERR);
    }

    if outcome.is_none() {
        std::process::exit(exitcode::TEMPFAIL);
    }
}
