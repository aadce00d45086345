use std::error::Error;

use vergen_gitcl::{CargoBuilder, Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn Error>> {
	let cargo = CargoBuilder::default().target_triple(true).build()?;
	// `sha(false)` enables the full (non-short) SHA.
	let gitcl = GitclBuilder::default().sha(false).build()?;

	Emitter::default().add_instructions(&cargo)?.add_instructions(&gitcl)?.emit()?;

	Ok(())
}
