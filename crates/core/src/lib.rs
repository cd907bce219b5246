#![forbid(unsafe_code)]

pub mod change;
pub mod criteria;
mod error;
pub mod model;
pub mod patch;
pub mod schema;

pub use change::{ChangeColumns, ChangeFamily, ChangeRecord, PullRequestChange, SprintChange, TaskChange};
pub use criteria::{Criteria, FieldPath, Operator, TypedCriteria, Value};
pub use error::{ChangeDecodeError, QueryError, ValidationError};
pub use patch::{FieldChange, FieldChanges, Patch, Patchable, Patched};
pub use schema::{EntityType, ResolvedPath, ScalarType};
