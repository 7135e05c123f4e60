use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::InvocationId;

// Shared by every generator in the process so ids never repeat across profilers.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Sequential,
    Random,
}

#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    strategy: IdStrategy,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    pub fn next_id(&self) -> InvocationId {
        match self.strategy {
            IdStrategy::Sequential => {
                InvocationId::Sequential(NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
            }
            IdStrategy::Random => InvocationId::Random(Uuid::new_v4()),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}
