// tcphex - hex payload exchange over TCP
use clap::Parser;
use std::process::ExitCode;
use tcphex::cli::{execute_command, Args};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match execute_command(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
