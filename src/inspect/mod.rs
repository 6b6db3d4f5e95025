pub mod features;
pub mod record;
pub mod resolver;
pub mod table;
pub mod vocabulary;

pub use features::{Detection, FeatureInspector, FeatureReport};
pub use record::{InspectionRecord, PackageInspector, PackageOutcome};
pub use resolver::{PackageIdentity, ResourceResolver};
pub use vocabulary::BaselineVocabulary;
