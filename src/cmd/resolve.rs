use anyhow::Result;
use serde_json::json;

use vibra::{Config, ResolutionRequest};

use super::ready_resolver;

pub async fn cmd_resolve(
    config: &Config,
    query: Option<String>,
    video_id: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let resolver = ready_resolver(config).await?;
    let request = ResolutionRequest { query, video_id, limit };
    let resolution = resolver.resolve(&request).await?;

    let stream = &resolution.stream;
    let mut output = json!({
        "videoId": stream.identifier,
        "url": stream.chosen_encoding.url,
        "encoding": stream.chosen_encoding,
        "contentType": stream.chosen_encoding.content_type(),
        "provider": stream.provider.base_address,
    });
    if let Some(candidates) = &resolution.candidates {
        output["candidates"] = serde_json::to_value(candidates)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
