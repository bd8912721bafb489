use crate::config::{AbilityConfig, ContentFileConfig};
use crate::link::validate_effect;
use crate::{ConfigError, ContentError};
use combat_types::{AbilityDefinition, AbilityId, EffectDefinition, EffectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of all ability and effect templates, loaded from TOML files
#[derive(Debug, Default)]
pub struct ContentRegistry {
    abilities: HashMap<AbilityId, Arc<AbilityDefinition>>,
    effects: HashMap<EffectId, EffectDefinition>,
    /// Abilities awaiting effect resolution, with the file they came from
    pending: Vec<(PathBuf, AbilityConfig)>,
}

impl ContentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all content from a directory (recursively)
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.load_dir(dir)?;
        registry.link()?;
        info!(
            abilities = registry.abilities.len(),
            effects = registry.effects.len(),
            dir = %dir.display(),
            "Loaded combat content"
        );
        Ok(registry)
    }

    /// Load content from a single TOML document
    ///
    /// `origin` is only used in error messages.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.load_content(content, origin)?;
        registry.link()?;
        Ok(registry)
    }

    /// Load content files from a directory recursively
    fn load_dir(&mut self, dir: &Path) -> Result<(), ConfigError> {
        if !dir.exists() {
            return Ok(());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(dir.to_path_buf()),
        })?;

        // Directory order is platform dependent; sort for stable errors
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::Io {
                error: e,
                path: Some(dir.to_path_buf()),
            })?;
            paths.push(entry.path());
        }
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.load_dir(&path)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                self.load_file(&path)?;
            }
        }

        Ok(())
    }

    /// Load a single content file
    fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            error: e,
            path: Some(path.to_path_buf()),
        })?;
        self.load_content(&content, path)
    }

    fn load_content(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let config: ContentFileConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse {
                error: e,
                path: path.to_path_buf(),
            })?;

        let validation = |e: ContentError| ConfigError::Validation {
            message: e.to_string(),
            path: path.to_path_buf(),
        };

        for effect in config.effects {
            validate_effect(&effect).map_err(validation)?;
            if self.effects.contains_key(&effect.id) {
                return Err(validation(ContentError::DuplicateId(effect.id.to_string())));
            }
            debug!(effect = %effect.id, "Registered effect");
            self.effects.insert(effect.id.clone(), effect);
        }

        for ability in config.abilities {
            if self.pending.iter().any(|(_, a)| a.id == ability.id) {
                return Err(validation(ContentError::DuplicateId(ability.id)));
            }
            self.pending.push((path.to_path_buf(), ability));
        }

        Ok(())
    }

    /// Resolve effect references now that every file has been read
    fn link(&mut self) -> Result<(), ConfigError> {
        for (path, config) in std::mem::take(&mut self.pending) {
            let definition =
                config
                    .into_definition(&self.effects)
                    .map_err(|e| ConfigError::Validation {
                        message: e.to_string(),
                        path: path.clone(),
                    })?;
            debug!(ability = %definition.id, "Registered ability");
            self.abilities
                .insert(definition.id.clone(), Arc::new(definition));
        }
        Ok(())
    }

    /// Get an ability by ID
    pub fn get_ability(&self, id: &str) -> Option<Arc<AbilityDefinition>> {
        self.abilities.get(&AbilityId::from(id)).cloned()
    }

    /// Get an effect by ID
    pub fn get_effect(&self, id: &str) -> Option<&EffectDefinition> {
        self.effects.get(&EffectId::from(id))
    }

    /// Check if an ability exists
    pub fn contains_ability(&self, id: &str) -> bool {
        self.abilities.contains_key(&AbilityId::from(id))
    }

    /// List all ability IDs
    pub fn ability_ids(&self) -> impl Iterator<Item = &str> {
        self.abilities.keys().map(|id| id.as_str())
    }

    /// List all effect IDs
    pub fn effect_ids(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(|id| id.as_str())
    }

    /// Resolve an ordered action-bar loadout
    pub fn loadout<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Vec<Arc<AbilityDefinition>>, ContentError> {
        ids.iter()
            .map(|id| {
                self.get_ability(id.as_ref())
                    .ok_or_else(|| ContentError::UnknownAbility(id.as_ref().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_types::{CcCategory, ResourceKind};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_content(dir: &Path, name: &str, content: &str) {
        let path = dir.join(format!("{}.toml", name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const FROST: &str = r#"
[[effects]]
id = "frost_nova_root"
name = "Frost Nova"
duration = 8.0
category = { type = "crowd_control", cc = "root" }

[[abilities]]
id = "frost_nova"
name = "Frost Nova"
cooldown = 25.0
is_spell = true
cost = { kind = "mana", amount = 20.0 }
applies = ["frost_nova_root"]
"#;

    #[test]
    fn test_load_abilities_and_effects() {
        let dir = TempDir::new().unwrap();
        create_test_content(dir.path(), "frost", FROST);

        let registry = ContentRegistry::load(dir.path()).unwrap();
        let nova = registry.get_ability("frost_nova").unwrap();
        assert!(nova.is_instant());
        assert!(nova.is_spell);
        assert_eq!(nova.cost.unwrap().kind, ResourceKind::Mana);
        assert_eq!(nova.payload.applies.len(), 1);
        assert_eq!(
            nova.payload.applies[0].crowd_control_category(),
            Some(CcCategory::Root)
        );
        assert!(registry.get_effect("frost_nova_root").is_some());
    }

    #[test]
    fn test_cross_file_effect_reference() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("warlock");
        std::fs::create_dir(&nested).unwrap();
        create_test_content(
            dir.path(),
            "effects",
            r#"
[[effects]]
id = "corruption"
name = "Corruption"
duration = 12.0
category = { type = "damage_over_time", damage_type = "shadow", tick_damage = 10.0, tick_interval = 2.0 }
"#,
        );
        create_test_content(
            &nested,
            "abilities",
            r#"
[[abilities]]
id = "corruption"
name = "Corruption"
range = 30.0
applies = ["corruption"]
"#,
        );

        let registry = ContentRegistry::load(dir.path()).unwrap();
        let ability = registry.get_ability("corruption").unwrap();
        assert!(ability.requires_target);
        assert_eq!(ability.range, Some(30.0));
    }

    #[test]
    fn test_unknown_effect_reference() {
        let dir = TempDir::new().unwrap();
        create_test_content(
            dir.path(),
            "broken",
            r#"
[[abilities]]
id = "fear"
name = "Fear"
applies = ["missing"]
"#,
        );

        let result = ContentRegistry::load(dir.path());
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_effect_duration() {
        let result = ContentRegistry::from_toml_str(
            r#"
[[effects]]
id = "zero"
name = "Zero"
duration = 0.0
category = { type = "buff" }
"#,
            Path::new("inline.toml"),
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_interrupt_and_dispel_payloads() {
        let registry = ContentRegistry::from_toml_str(
            r#"
[[abilities]]
id = "kick"
name = "Kick"
range = 5.0
triggers_gcd = false
interrupt_lockout = 4.0

[[abilities]]
id = "purify"
name = "Purify"
is_spell = true
dispel = { polarity = "debuff", count = 2 }
"#,
            Path::new("inline.toml"),
        )
        .unwrap();

        let kick = registry.get_ability("kick").unwrap();
        assert_eq!(kick.payload.interrupt_lockout, Some(4.0));
        let purify = registry.get_ability("purify").unwrap();
        assert_eq!(purify.payload.dispel.map(|d| d.count), Some(2));
    }

    #[test]
    fn test_interrupt_must_be_instant() {
        let result = ContentRegistry::from_toml_str(
            r#"
[[abilities]]
id = "slow_kick"
name = "Slow Kick"
range = 5.0
cast_time = 1.0
interrupt_lockout = 4.0
"#,
            Path::new("inline.toml"),
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_parse_error() {
        let result = ContentRegistry::from_toml_str("[[abilities]\n", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_loadout_order() {
        let registry = ContentRegistry::from_toml_str(
            r#"
[[abilities]]
id = "a"
name = "A"

[[abilities]]
id = "b"
name = "B"
"#,
            Path::new("inline.toml"),
        )
        .unwrap();

        let bar = registry.loadout(&["b", "a"]).unwrap();
        assert_eq!(bar[0].id.as_str(), "b");
        assert_eq!(bar[1].id.as_str(), "a");
        assert!(matches!(
            registry.loadout(&["c"]),
            Err(ContentError::UnknownAbility(_))
        ));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = ContentRegistry::load(&dir.path().join("nope")).unwrap();
        assert_eq!(registry.ability_ids().count(), 0);
    }
}
