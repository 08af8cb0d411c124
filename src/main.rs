use clap::Parser;
use git_duplicator::{duplicator_main, DuplicatorCli};
use std::process::exit;

#[tokio::main]
async fn main() {
    println!(concat!(
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION")
    ));
    let cli_args = DuplicatorCli::parse();
    env_logger::builder()
        .filter_level(cli_args.log_level())
        .format_target(false)
        .format_timestamp(None)
        .init();
    // a missing .env file is fine, the token may come from the environment
    let _ = dotenv::dotenv();
    match duplicator_main(cli_args).await {
        Ok(_) => {
            exit(0);
        }
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };
}
