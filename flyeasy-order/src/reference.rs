use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rand::Rng;

use flyeasy_core::repository::BookingRepository;
use flyeasy_core::{CoreError, CoreResult};

pub const REFERENCE_LEN: usize = 6;
pub const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const MAX_REFERENCE_ATTEMPTS: u32 = 8;

/// Produces candidate booking references. Uniqueness is checked by the caller.
pub trait ReferenceSource: Send + Sync {
    fn sample(&self) -> String;
}

/// Uniform over `[A-Z0-9]` per character.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReferences;

impl ReferenceSource for RandomReferences {
    fn sample(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..REFERENCE_LEN)
            .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Replays a fixed sequence, then falls back to random sampling.
#[derive(Debug, Default)]
pub struct ScriptedReferences {
    queue: Mutex<VecDeque<String>>,
}

impl ScriptedReferences {
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(references.into_iter().map(Into::into).collect()),
        }
    }
}

impl ReferenceSource for ScriptedReferences {
    fn sample(&self) -> String {
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| RandomReferences.sample())
    }
}

pub fn is_valid_reference(reference: &str) -> bool {
    reference.len() == REFERENCE_LEN
        && reference
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Draws references that are not yet in use, sharing one attempt budget per
/// booking across existence checks and insert-time collisions.
#[derive(Clone)]
pub struct ReferenceGenerator {
    source: Arc<dyn ReferenceSource>,
    bookings: Arc<dyn BookingRepository>,
    max_attempts: u32,
}

impl ReferenceGenerator {
    pub fn new(source: Arc<dyn ReferenceSource>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self {
            source,
            bookings,
            max_attempts: MAX_REFERENCE_ATTEMPTS,
        }
    }

    pub fn budget(&self) -> ReferenceBudget {
        ReferenceBudget {
            used: 0,
            max: self.max_attempts,
        }
    }

    pub async fn next_unused(&self, budget: &mut ReferenceBudget) -> CoreResult<String> {
        while budget.used < budget.max {
            budget.used += 1;
            let candidate = self.source.sample();
            if !self.bookings.reference_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(attempt = budget.used, "booking reference collision");
        }
        Err(CoreError::ReferenceExhausted(budget.max))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceBudget {
    used: u32,
    max: u32,
}

impl ReferenceBudget {
    pub fn used(&self) -> u32 {
        self.used
    }
}
