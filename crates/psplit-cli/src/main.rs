use clap::Parser;
use psplit_cli::cli_args::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = psplit_cli::run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
