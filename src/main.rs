use clap::Parser;
use fvc_actor::cli::{self, Args, Command};
use fvc_actor::config::Config;

fn load_env() {
    // Load .env file, don't override existing env vars
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_to(&mut config);

    match args.command {
        Some(Command::Config { action }) => {
            if let Err(e) = cli::handle_config_action(action, args.config.as_deref(), &config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Command::Exec { ref words }) => match cli::exec(&config, words) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            if let Err(e) = cli::run_server(&config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
