use articulate_scanner::handlers::EXIT_INTERRUPTED;
use articulate_scanner::{command_argument_builder, handle_scan, init_tracing};
use colored::Colorize;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    init_tracing();

    // Dropping the scan future on Ctrl-C tears the browser down with it.
    let code = tokio::select! {
        code = handle_scan(&matches) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n\n{} Scan interrupted by user", "⚠".yellow().bold());
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}
