//! Levels command - prints the configured chain

use super::bootstrap;

pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap();
    let definition = config.chain.to_definition()?;

    println!("{}", serde_json::to_string_pretty(&definition)?);

    Ok(())
}
