//! `askfolio ask`: Answer one question from the terminal.

use std::path::Path;

use askfolio_agent::RagPipeline;
use askfolio_core::{ChatRequest, Error};

use super::load_config;

pub async fn run(config_path: Option<&Path>, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let pipeline = RagPipeline::from_config(&config);

    match pipeline.answer(&ChatRequest::new(message)).await {
        Ok(reply) => {
            println!("{}", reply.response);
            if reply.retries > 0 {
                eprintln!("(answered after {} retr{})", reply.retries, if reply.retries == 1 { "y" } else { "ies" });
            }
            Ok(())
        }
        Err(Error::Upstream(failure)) => {
            eprintln!("{}", failure.user_message);
            eprintln!("  type:    {}", failure.kind);
            eprintln!("  retries: {}", failure.retries);
            eprintln!("  detail:  {}", failure.detail);
            Err(format!("{} failure", failure.kind).into())
        }
        Err(e) => Err(e.into()),
    }
}
