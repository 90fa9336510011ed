#![forbid(unsafe_code)]
#![deny(warnings, dead_code, unused, unused_imports, unreachable_pub, clippy::all, rustdoc::broken_intra_doc_links)]

//! Binary entrypoint that wires the ccbt daemon together and blocks until
//! shutdown.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ccbt_app::run_app().await?;
    Ok(())
}
