use popfield::cli::CliOverrides;
use popfield::run_with_overrides;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    match run_with_overrides(&cli) {
        Ok(summary) => println!("{summary}"),
        Err(err) => {
            eprintln!("Application error: {err:?}");
            std::process::exit(1);
        }
    }
}
