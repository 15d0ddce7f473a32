use anyhow::Result;
use std::env;

use vergen_gix::{BuildBuilder, Emitter, RustcBuilder};
fn main() -> Result<()> {
    let build = BuildBuilder::all_build()?;
    let rustc = RustcBuilder::all_rustc()?;
    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&rustc)?
        .emit()?;
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
    Ok(())
}
