//! Entity builders.

use crate::game::Entity;
use crate::modifier::BuildParameters;
use strum::IntoEnumIterator;

/// Selects the entities a stat is built for.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::EntityBuilder;
/// use zzmod::game::Entity;
/// use zzmod::source::ModifierSource;
/// use zzmod::BuildParameters;
///
/// let params = BuildParameters::new(ModifierSource::Global, Entity::Minion);
/// assert_eq!(EntityBuilder::ModifierSourceEntity.build(&params), vec![Entity::Minion]);
/// assert_eq!(EntityBuilder::AllEntities.build(&params).len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityBuilder {
    /// The entity the modifier comes from.
    #[default]
    ModifierSourceEntity,
    Entities(Vec<Entity>),
    AllEntities,
}

impl EntityBuilder {
    pub fn build(&self, parameters: &BuildParameters) -> Vec<Entity> {
        match self {
            EntityBuilder::ModifierSourceEntity => vec![parameters.modifier_source_entity],
            EntityBuilder::Entities(entities) => entities.clone(),
            EntityBuilder::AllEntities => Entity::iter().collect(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            EntityBuilder::ModifierSourceEntity => "ModifierSource".to_string(),
            EntityBuilder::Entities(entities) => entities
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            EntityBuilder::AllEntities => "All".to_string(),
        }
    }
}

impl From<Entity> for EntityBuilder {
    fn from(entity: Entity) -> Self {
        EntityBuilder::Entities(vec![entity])
    }
}

impl From<Vec<Entity>> for EntityBuilder {
    fn from(entities: Vec<Entity>) -> Self {
        EntityBuilder::Entities(entities)
    }
}
