use std::collections::BTreeSet;

use crate::game::errors::GameError;
use crate::world::types::CharacterTemplate;

/// Exclusive binding of character identities to live sessions. Every call
/// happens at the serialization boundary, which is what makes checkout and
/// teardown for one id mutually exclusive: two concurrent checkouts of the
/// same id are applied one after the other, and the second loses.
#[derive(Debug)]
pub struct CharacterRegistry {
    templates: Vec<CharacterTemplate>,
    in_use: BTreeSet<String>,
}

impl CharacterRegistry {
    pub fn new(templates: Vec<CharacterTemplate>) -> Self {
        Self {
            templates,
            in_use: BTreeSet::new(),
        }
    }

    /// Templates not currently bound, in definition order.
    pub fn list_available(&self) -> Vec<&CharacterTemplate> {
        self.templates
            .iter()
            .filter(|template| !self.in_use.contains(&template.id))
            .collect()
    }

    pub fn checkout(&mut self, character_id: &str) -> Result<CharacterTemplate, GameError> {
        let template = self
            .templates
            .iter()
            .find(|template| template.id == character_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownCharacter(character_id.to_string()))?;
        if !self.in_use.insert(character_id.to_string()) {
            return Err(GameError::AlreadyInUse(character_id.to_string()));
        }
        Ok(template)
    }

    /// Returns whether the id was actually bound. Safe to call twice.
    pub fn release(&mut self, character_id: &str) -> bool {
        self.in_use.remove(character_id)
    }

    pub fn is_in_use(&self, character_id: &str) -> bool {
        self.in_use.contains(character_id)
    }
}
