use clap::Parser;
use gorev_tree::cli::commands::Cli;
use gorev_tree::cli::handlers;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
