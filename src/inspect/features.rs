use crate::config::AssetLayout;
use crate::error::Result;
use crate::inspect::table;
use crate::inspect::vocabulary::BaselineVocabulary;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Result of a content check that may not be implemented yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Detection {
    Present,
    Absent,
    #[default]
    Unknown,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Detection::Present => "yes",
            Detection::Absent => "no",
            Detection::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureReport {
    pub is_offline: bool,
    pub new_character_count: usize,
    /// Signed on purpose: a negative value flags data the curator should look at.
    pub new_skin_count: i64,
    pub custom_shaders: Detection,
    pub custom_icons: Detection,
    pub modified_skins: Detection,
    pub new_models: Detection,
}

/// Counts how many codenames the baseline has never seen.
pub fn count_unknown<'a, I>(codenames: I, known: impl Fn(&str) -> bool) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    codenames.into_iter().filter(|name| !known(name)).count()
}

/// Skin novelty with the new characters' base skins taken back out.
///
/// Assumes every new character adds exactly one default entry to the skin table.
pub fn adjusted_skin_count(new_skins: usize, new_characters: usize) -> i64 {
    new_skins as i64 - new_characters as i64
}

pub struct FeatureInspector<'a> {
    vocabulary: &'a BaselineVocabulary,
    layout: &'a AssetLayout,
}

impl<'a> FeatureInspector<'a> {
    pub fn new(vocabulary: &'a BaselineVocabulary, layout: &'a AssetLayout) -> Self {
        Self { vocabulary, layout }
    }

    /// Inspects an unpacked tree; `None` (failed extraction) yields defaults.
    pub fn inspect(&self, root: Option<&Path>, diagnostics: &mut Vec<String>) -> FeatureReport {
        let Some(root) = root else {
            return FeatureReport::default();
        };

        let new_character_count = self.count_new_characters(root, diagnostics);
        let new_skin_count = self.count_new_skins(root, new_character_count, diagnostics);

        FeatureReport {
            is_offline: self.is_offline(Some(root)),
            new_character_count,
            new_skin_count,
            custom_shaders: self.check_custom_shaders(),
            custom_icons: self.check_custom_icons(),
            modified_skins: self.check_modified_skins(),
            new_models: self.check_new_models(),
        }
    }

    /// A bundled local server marks a private/offline build.
    pub fn is_offline(&self, root: Option<&Path>) -> bool {
        root.is_some_and(|root| root.join(&self.layout.server_asset).exists())
    }

    pub fn count_new_characters(&self, root: &Path, diagnostics: &mut Vec<String>) -> usize {
        let path = root.join(&self.layout.characters_table);
        let characters = read_table(&path, diagnostics, |path| {
            table::first_column_where(path, &self.layout.type_column, &self.layout.playable_type)
        });

        let count = count_unknown(&characters, |name| self.vocabulary.knows_character(name));
        debug!(total = characters.len(), new = count, "characters compared");
        count
    }

    pub fn count_new_skins(
        &self,
        root: &Path,
        new_characters: usize,
        diagnostics: &mut Vec<String>,
    ) -> i64 {
        let path = root.join(&self.layout.skins_table);
        let skins = read_table(&path, diagnostics, table::first_column);

        let new_skins = count_unknown(&skins, |name| self.vocabulary.knows_skin(name));
        debug!(total = skins.len(), new = new_skins, "skins compared");
        adjusted_skin_count(new_skins, new_characters)
    }

    // Content checks below have no detection logic yet.

    pub fn check_custom_shaders(&self) -> Detection {
        Detection::Unknown
    }

    pub fn check_custom_icons(&self) -> Detection {
        Detection::Unknown
    }

    pub fn check_modified_skins(&self) -> Detection {
        Detection::Unknown
    }

    pub fn check_new_models(&self) -> Detection {
        Detection::Unknown
    }
}

/// An absent table reads as empty; only an unreadable one is worth a diagnostic.
fn read_table(
    path: &Path,
    diagnostics: &mut Vec<String>,
    read: impl FnOnce(&Path) -> Result<Vec<String>>,
) -> Vec<String> {
    if !path.is_file() {
        debug!(table = %path.display(), "table not present");
        return Vec::new();
    }

    read(path).unwrap_or_else(|e| {
        debug!(table = %path.display(), error = %e, "table unreadable");
        diagnostics.push(e.to_string());
        Vec::new()
    })
}
