use anyhow::Result;

use ferrite::movegen::magic::init_attack_tables;
use ferrite::uci::protocol::UciEngine;

fn main() -> Result<()> {
    init_attack_tables();

    let mut engine = UciEngine::new()?;
    engine.run();

    Ok(())
}
