//! Query OMDb through the library client and print what the app would show.
//! Usage:
//!   cargo run --bin omdb_props -- search <term> [movie|series|episode] [year]
//!   cargo run --bin omdb_props -- detail <imdb_id>
//! Requires OMDB_API_KEY in the environment (.env supported).

use anyhow::{bail, Context, Result};
use cinescope::config::Config;
use cinescope::models::parse_media_filter;
use cinescope::omdb::{MovieApi, OmdbClient};
use dotenvy::dotenv;
use serde_json::{json, Value};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env()?;
    let client = OmdbClient::from_config(&config)?;

    let output: Value = match args.first().map(String::as_str) {
        Some("search") => {
            let term = args.get(1).context("search needs a term")?;
            let media_type = parse_media_filter(args.get(2).map(String::as_str).unwrap_or(""))?;
            let year = match args.get(3) {
                Some(y) => Some(y.parse::<i32>().context("year must be a number")?),
                None => None,
            };
            serde_json::to_value(client.search(term, media_type, year).await)?
        }
        Some("detail") => {
            let id = args.get(1).context("detail needs an IMDb id")?;
            let detail = client.get_detail(id).await?;
            let scores: Vec<Value> = detail
                .ratings
                .iter()
                .map(|r| json!({ "source": r.source, "score": r.normalized_score() }))
                .collect();
            json!({ "detail": detail, "normalized_ratings": scores })
        }
        _ => bail!("usage: omdb_props search <term> [type] [year] | detail <imdb_id>"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
