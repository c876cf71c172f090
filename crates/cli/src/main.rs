#![deny(rust_2018_idioms)]

use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
	palkeeper_cli::run().await
}
