use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    homequote_cli::run().await
}
