pub mod amount;
pub mod error;
pub mod event;
pub mod id;
pub mod keys;
pub mod mission;

pub use amount::{HonorAmount, UsdAmount};
pub use error::{Result, SettlementError};
pub use event::{CompletionEvent, CompletionStatus};
pub use id::{MissionId, ParticipationId, TaskId, UserId};
pub use keys::{CompletionKey, ReviewKey};
pub use mission::{Mission, MissionModel, MissionStatus, MissionTask, Platform};
