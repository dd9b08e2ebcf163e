//! Demoforge binary entry point.

#[tokio::main]
async fn main() {
    let exit_code = demoforge::cli::run().await;
    std::process::exit(exit_code);
}
