use anyhow::Result;

use vibra::Config;

use super::ready_resolver;

pub async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let resolver = ready_resolver(config).await?;
    let candidates = resolver.search(query, limit).await?;

    println!("🔎 {} result(s) for {query:?}:\n", candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        println!("{:>2}. {} [{}]", i + 1, candidate.title, candidate.identifier);
        if let Some(artist) = &candidate.artist {
            println!("    by {artist}");
        }
        if let Some(seconds) = candidate.duration_seconds {
            println!("    {}:{:02}", seconds / 60, seconds % 60);
        }
    }
    Ok(())
}
