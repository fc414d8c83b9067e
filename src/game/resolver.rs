//! Resolution of message targets against the online roster.
//!
//! The literal token `all` is reserved and checked first. After that an
//! exact case-insensitive full-name match wins; failing that, the query is
//! treated as a case-insensitive prefix of each name's first word. More
//! than one prefix hit is reported as ambiguous with the candidate names,
//! never guessed at.

use crate::game::errors::GameError;

/// A resolved message destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Everyone,
    One(String),
}

/// One online character as seen by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineName {
    pub character_id: String,
    pub name: String,
}

pub fn resolve(query: &str, online: &[OnlineName]) -> Result<Target, GameError> {
    let trimmed = query.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(Target::Everyone);
    }
    let needle = normalize(trimmed);
    if needle.is_empty() {
        return Err(GameError::NotFound(trimmed.to_string()));
    }

    for entry in online {
        if normalize(&entry.name) == needle {
            return Ok(Target::One(entry.character_id.clone()));
        }
    }

    let mut hits: Vec<&OnlineName> = online
        .iter()
        .filter(|entry| {
            entry
                .name
                .split_whitespace()
                .next()
                .map_or(false, |first| first.to_lowercase().starts_with(&needle))
        })
        .collect();

    match hits.len() {
        0 => Err(GameError::NotFound(trimmed.to_string())),
        1 => Ok(Target::One(hits.remove(0).character_id.clone())),
        _ => Err(GameError::Ambiguous {
            query: trimmed.to_string(),
            candidates: hits.iter().map(|entry| entry.name.clone()).collect(),
        }),
    }
}

/// Lowercase with runs of whitespace collapsed to single spaces.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<OnlineName> {
        vec![
            OnlineName {
                character_id: "char_bob".to_string(),
                name: "Bob the Brave".to_string(),
            },
            OnlineName {
                character_id: "char_boris".to_string(),
                name: "Boris the Bold".to_string(),
            },
        ]
    }

    #[test]
    fn all_is_reserved_before_name_matching() {
        assert_eq!(resolve("all", &roster()).unwrap(), Target::Everyone);
        assert_eq!(resolve("ALL", &roster()).unwrap(), Target::Everyone);
        assert_eq!(resolve("all", &[]).unwrap(), Target::Everyone);
    }

    #[test]
    fn exact_full_name_wins() {
        assert_eq!(
            resolve("bob the brave", &roster()).unwrap(),
            Target::One("char_bob".to_string())
        );
        assert_eq!(
            resolve("Boris   the  Bold", &roster()).unwrap(),
            Target::One("char_boris".to_string())
        );
    }

    #[test]
    fn shared_prefix_is_ambiguous_with_candidates() {
        let err = resolve("bo", &roster()).unwrap_err();
        assert_eq!(
            err,
            GameError::Ambiguous {
                query: "bo".to_string(),
                candidates: vec!["Bob the Brave".to_string(), "Boris the Bold".to_string()],
            }
        );
    }

    #[test]
    fn longer_prefixes_disambiguate() {
        assert_eq!(
            resolve("bob", &roster()).unwrap(),
            Target::One("char_bob".to_string())
        );
        assert_eq!(
            resolve("boris", &roster()).unwrap(),
            Target::One("char_boris".to_string())
        );
        assert_eq!(
            resolve("BOR", &roster()).unwrap(),
            Target::One("char_boris".to_string())
        );
    }

    #[test]
    fn misses_are_not_found() {
        assert_eq!(
            resolve("lina", &roster()).unwrap_err(),
            GameError::NotFound("lina".to_string())
        );
        assert_eq!(
            resolve("", &roster()).unwrap_err(),
            GameError::NotFound("".to_string())
        );
    }
}
