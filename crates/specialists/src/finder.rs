//! Merchant finder: suggests nearby merchants with a shorter wait.

use crate::backend::LogisticsBackend;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use synapse_common::{Result, Specialist, SpecialistId, SynapseError};
use tracing::info;

/// Wait ceiling used when the directive does not name one.
pub const DEFAULT_MAX_WAIT_MINUTES: u32 = 20;

/// Number of suggestions requested from the platform.
pub const SEARCH_LIMIT: usize = 5;

static EXPLICIT_CUISINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcuisine\s*[:=]?\s*([a-z]+)").unwrap());

static CUISINE_BEFORE_VENUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\s+(?:places?|restaurants?|joints?|shops?|merchants?|spots?)\b")
        .unwrap()
});

static MAX_WAIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:under|less than|below|within|at most|max(?:imum)?(?: wait)?(?: of)?)\s+(?:an?\s+)?(\d{1,3})\s*-?\s*min",
    )
    .unwrap()
});

/// Words that sit before "places"/"restaurants" without naming a cuisine.
const NOT_A_CUISINE: &[&str] = &[
    "other", "nearby", "similar", "alternative", "more", "some", "any", "local", "different",
    "new", "few", "open", "the", "a",
];

pub struct MerchantFinder {
    id: SpecialistId,
    backend: Arc<dyn LogisticsBackend>,
}

impl MerchantFinder {
    pub fn new(backend: Arc<dyn LogisticsBackend>) -> Self {
        Self {
            id: SpecialistId::merchant_finder(),
            backend,
        }
    }

    fn cuisine(directive: &str) -> Option<String> {
        if let Some(c) = EXPLICIT_CUISINE_PATTERN.captures(directive) {
            return Some(c[1].to_lowercase());
        }
        CUISINE_BEFORE_VENUE_PATTERN
            .captures_iter(directive)
            .map(|c| c[1].to_lowercase())
            .find(|word| !NOT_A_CUISINE.contains(&word.as_str()))
    }

    fn max_wait(directive: &str) -> u32 {
        MAX_WAIT_PATTERN
            .captures(directive)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(DEFAULT_MAX_WAIT_MINUTES)
    }
}

#[async_trait]
impl Specialist for MerchantFinder {
    fn id(&self) -> &SpecialistId {
        &self.id
    }

    fn description(&self) -> &str {
        "Finds nearby merchants of a cuisine with a shorter wait, as alternatives to a \
         delayed merchant. Name the cuisine (e.g. 'pizza places') and the maximum wait \
         (e.g. 'under 20 minutes')."
    }

    async fn invoke(&self, directive: &str) -> Result<String> {
        let cuisine = Self::cuisine(directive).ok_or_else(|| {
            SynapseError::Specialist("directive does not name a cuisine".into())
        })?;
        let max_wait = Self::max_wait(directive);

        let found = self
            .backend
            .search_merchants(&cuisine, max_wait, SEARCH_LIMIT)
            .await?;
        info!(cuisine = %cuisine, max_wait, found = found.len(), "Merchant search finished");

        if found.is_empty() {
            return Ok(format!(
                "No {} merchants found with a wait under {} minutes.",
                cuisine, max_wait
            ));
        }

        let listed = found
            .iter()
            .map(|m| format!("{} ({} min)", m.name, m.wait_time_minutes))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "Found {} {} merchants with a wait under {} minutes: {}.",
            found.len(),
            cuisine,
            max_wait,
            listed
        ))
    }
}
