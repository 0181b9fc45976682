//! Placeholder detail served when a detail fetch fails.
use crate::models::{MediaType, MovieDetail, MovieSummary, Rating};
use crate::omdb::split_list;

pub const PLACEHOLDER_ID: &str = "tt0000000";

pub fn placeholder_detail(id: &str) -> MovieDetail {
    let id = match id.trim() {
        "" => PLACEHOLDER_ID.to_string(),
        other => other.to_string(),
    };
    MovieDetail {
        summary: MovieSummary {
            id,
            title: "Sample Movie".to_string(),
            year: "2023".to_string(),
            poster_url: Some("/placeholder.svg?height=600&width=400".to_string()),
            media_type: MediaType::Movie,
        },
        rated: Some("PG-13".to_string()),
        released: Some("01 Jan 2023".to_string()),
        runtime: Some("120 min".to_string()),
        genres: split_list("Action, Drama"),
        director: Some("Sample Director".to_string()),
        writer: Some("Sample Writer".to_string()),
        actors: Some("Actor 1, Actor 2, Actor 3".to_string()),
        plot: Some(
            "This is a fallback movie description used when the API is unavailable.".to_string(),
        ),
        language: Some("English".to_string()),
        country: Some("USA".to_string()),
        awards: None,
        ratings: vec![
            Rating {
                source: "Internet Movie Database".to_string(),
                value: "7.5/10".to_string(),
            },
            Rating {
                source: "Rotten Tomatoes".to_string(),
                value: "85%".to_string(),
            },
        ],
        metascore: Some("75".to_string()),
        imdb_rating: Some(7.5),
        imdb_votes: Some("10,000".to_string()),
        box_office: None,
        fallback: true,
    }
}
