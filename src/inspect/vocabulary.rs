use crate::config::AssetLayout;
use crate::error::{CensusError, Result};
use crate::inspect::table;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Character and skin codenames of the reference build.
///
/// Built once per batch and only read afterwards; inspections borrow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineVocabulary {
    character_codenames: HashSet<String>,
    skin_codenames: HashSet<String>,
}

impl BaselineVocabulary {
    pub fn new<C, S>(characters: C, skins: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            character_codenames: characters.into_iter().map(Into::into).collect(),
            skin_codenames: skins.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads both tables from an unpacked reference build.
    ///
    /// Missing or unreadable tables are fatal: without a baseline every
    /// count would be meaningless.
    pub fn load(reference_dir: &Path, layout: &AssetLayout) -> Result<Self> {
        let unavailable = |error: CensusError| CensusError::BaselineUnavailable {
            path: reference_dir.display().to_string(),
            message: error.to_string(),
        };

        if !reference_dir.is_dir() {
            return Err(CensusError::BaselineUnavailable {
                path: reference_dir.display().to_string(),
                message: "directory does not exist".to_string(),
            });
        }

        let characters = table::first_column_where(
            &reference_dir.join(&layout.characters_table),
            &layout.type_column,
            &layout.playable_type,
        )
        .map_err(unavailable)?;
        let skins = table::first_column(&reference_dir.join(&layout.skins_table))
            .map_err(unavailable)?;

        let vocabulary = Self::new(characters, skins);
        info!(
            reference = %reference_dir.display(),
            characters = vocabulary.character_count(),
            skins = vocabulary.skin_count(),
            "baseline vocabulary loaded"
        );
        Ok(vocabulary)
    }

    pub fn knows_character(&self, codename: &str) -> bool {
        self.character_codenames.contains(codename)
    }

    pub fn knows_skin(&self, codename: &str) -> bool {
        self.skin_codenames.contains(codename)
    }

    pub fn character_count(&self) -> usize {
        self.character_codenames.len()
    }

    pub fn skin_count(&self) -> usize {
        self.skin_codenames.len()
    }
}
