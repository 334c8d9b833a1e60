//! # OptiPOS Entry Point
//!
//! Setup lives in `lib.rs` for testability.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    optipos_app::run().await
}
