mod classify;
mod explode;
mod options;
mod properties;
mod rank;
mod rollup;
mod stages;
mod util;

pub use classify::Classify;
pub use explode::Explode;
pub use options::Options;
pub use properties::Properties;
pub use rank::Rank;
pub use rollup::Rollup;
pub use stages::Stages;
