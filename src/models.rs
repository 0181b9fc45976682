use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MovieError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Episode,
}

impl MediaType {
    pub fn as_param(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Episode => "episode",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for MediaType {
    type Err = MovieError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "series" => Ok(MediaType::Series),
            "episode" => Ok(MediaType::Episode),
            other => Err(MovieError::Validation(format!(
                "media type must be movie, series or episode (got '{}')",
                other
            ))),
        }
    }
}

/// Parses a media type filter where `""` and `"any"` mean unfiltered.
pub fn parse_media_filter(input: &str) -> Result<Option<MediaType>, MovieError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster_url: Option<String>,
    pub media_type: MediaType,
}

impl MovieSummary {
    /// Leading digits of the year field, so "2010–2015" and "2019–" still parse.
    pub fn parsed_year(&self) -> Option<i32> {
        parse_leading_year(&self.year)
    }
}

pub fn parse_leading_year(year: &str) -> Option<i32> {
    let digits: String = year
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub source: String,
    pub value: String,
}

const NEUTRAL_SCORE: f32 = 50.0;

impl Rating {
    /// Score on a 0-100 scale; unknown sources and unparseable values score 50.
    pub fn normalized_score(&self) -> f32 {
        let value = self.value.trim();
        let parsed = match self.source.as_str() {
            "Internet Movie Database" => value
                .split_once('/')
                .and_then(|(n, _)| n.trim().parse::<f32>().ok())
                .map(|n| n * 10.0),
            "Rotten Tomatoes" => value
                .strip_suffix('%')
                .and_then(|n| n.trim().parse::<f32>().ok()),
            "Metacritic" => value
                .split_once('/')
                .and_then(|(n, _)| n.trim().parse::<f32>().ok()),
            _ => None,
        };
        parsed.unwrap_or(NEUTRAL_SCORE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub ratings: Vec<Rating>,
    pub metascore: Option<String>,
    pub imdb_rating: Option<f32>,
    pub imdb_votes: Option<String>,
    pub box_office: Option<String>,
    /// Set when this is placeholder data standing in for a failed fetch.
    #[serde(default)]
    pub fallback: bool,
}

/// Uniform envelope for a search call. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<MovieSummary>,
    pub total_count: u64,
    pub ok: bool,
    pub error: Option<String>,
}

impl SearchResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            ok: false,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(source: &str, value: &str) -> Rating {
        Rating {
            source: source.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn normalizes_known_rating_sources() {
        assert_eq!(rating("Internet Movie Database", "8.5/10").normalized_score(), 85.0);
        assert_eq!(rating("Rotten Tomatoes", "91%").normalized_score(), 91.0);
        assert_eq!(rating("Metacritic", "69/100").normalized_score(), 69.0);
        assert_eq!(rating("Letterboxd", "4/5").normalized_score(), 50.0);
        assert_eq!(rating("Rotten Tomatoes", "N/A").normalized_score(), 50.0);
    }

    #[test]
    fn year_parsing_takes_leading_digits() {
        assert_eq!(parse_leading_year("2012"), Some(2012));
        assert_eq!(parse_leading_year("2010–2015"), Some(2010));
        assert_eq!(parse_leading_year("2019–"), Some(2019));
        assert_eq!(parse_leading_year("N/A"), None);
        assert_eq!(parse_leading_year(""), None);
    }

    #[test]
    fn media_filter_accepts_any_and_empty() {
        assert_eq!(parse_media_filter("").unwrap(), None);
        assert_eq!(parse_media_filter("any").unwrap(), None);
        assert_eq!(parse_media_filter("Series").unwrap(), Some(MediaType::Series));
        assert!(matches!(
            parse_media_filter("game"),
            Err(MovieError::Validation(_))
        ));
    }
}
