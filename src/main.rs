#![deny(warnings)]

use anyhow::Result;
use server_account::api_call::ReqwestTransport;
use server_account::args::Args;
use server_account::refresh_account;
use std::env;
use std::sync::Arc;

fn init_logger(debug: bool) {
    let mut builder = env_logger::Builder::from_default_env();

    if env::var("RUST_LOG").is_err() && debug {
        builder.filter_level(log::LevelFilter::Debug);
    }

    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.debug);

    println!("{}", refresh_account(args, Arc::new(ReqwestTransport::new())).await?);

    Ok(())
}
