//! scheda - Workout programming and logging engine
//!
//! Training blocks, percentage progressions, session metrics, muscle
//! volume and plan-to-log reconciliation. Pure functions over plain
//! records: every operation returns new values.

pub mod block;
pub mod error;
pub mod exercises;
pub mod metrics;
pub mod program;
pub mod progression;
pub mod reconcile;
pub mod schema;
pub mod session;
pub mod technique;

pub use block::{Block, RepTarget};
pub use error::{Error, Result};
pub use exercises::{default_library, ExerciseDefinition, ExerciseLibrary};
pub use metrics::Analytics;
pub use program::{Program, Week};
pub use progression::{PercentageProgression, RoundingPolicy};
pub use reconcile::WeekRemap;
pub use session::{LoggedSession, LoggedSet, SessionOrigin};
pub use technique::{CustomTechniques, Technique};
