//! `askfolio inspect`: Show what retrieval sees, without calling the LLM.

use std::path::Path;

use askfolio_agent::RagPipeline;

use super::load_config;

const PREVIEW_CHARS: usize = 100;

pub fn run(config_path: Option<&Path>, query: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let pipeline = RagPipeline::from_config(&config);

    match pipeline.store().resolve() {
        Some(path) => println!("Knowledge base: {}", path.display()),
        None => println!("Knowledge base: none found (tried {} candidates)", pipeline.store().candidates().len()),
    }

    let Some(query) = query else {
        let chunks = pipeline.chunks();
        println!("{} chunks\n", chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            println!("  [{i:>2}] {:<10} {}", chunk.source.as_str(), preview(&chunk.text));
        }
        return Ok(());
    };

    let retrieval = pipeline.retrieve(&query);
    println!(
        "Query: {query}\nStrategy: {}, selected {} of {} chunks\n",
        pipeline.strategy(),
        retrieval.selected.len(),
        retrieval.total_chunks
    );
    for scored in &retrieval.selected {
        println!(
            "  [{:>2}] {:.3} {:<10} {}",
            scored.index,
            scored.score,
            scored.source().as_str(),
            preview(scored.text())
        );
    }

    println!("\n--- context ---\n{}", retrieval.context);
    Ok(())
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
