//! Game settings and the one-shot bonus round trigger.

use chrono::Utc;
use log::info;

use super::errors::FamilyError;
use crate::storage::types::{BonusTrigger, RoundSettings};
use crate::storage::FamilyStore;

/// Stored settings, or the defaults when nothing was saved yet.
pub fn get_settings(store: &FamilyStore) -> Result<RoundSettings, FamilyError> {
    Ok(store.get_settings()?.unwrap_or_default().normalized())
}

/// Change any subset of the settings. The threshold is clamped to at least 1.
pub fn update_settings(
    store: &FamilyStore,
    incorrect_threshold: Option<u32>,
    daily_cap: Option<u32>,
) -> Result<RoundSettings, FamilyError> {
    let mut settings = get_settings(store)?;
    if let Some(threshold) = incorrect_threshold {
        settings.incorrect_threshold = threshold;
    }
    if let Some(cap) = daily_cap {
        settings.daily_cap = cap;
    }
    let settings = settings.normalized();
    store.put_settings(&settings)?;
    info!(
        "settings: threshold={} daily_cap={}",
        settings.incorrect_threshold, settings.daily_cap
    );
    Ok(settings)
}

/// Arm a bonus round. The next game start consumes it.
pub fn launch_bonus(store: &FamilyStore) -> Result<(), FamilyError> {
    store.set_bonus_trigger(&BonusTrigger {
        triggered_at: Utc::now(),
    })?;
    info!("bonus round launched");
    Ok(())
}

/// Consume the bonus trigger. True for exactly one caller per launch.
pub fn take_bonus_trigger(store: &FamilyStore) -> Result<bool, FamilyError> {
    Ok(store.take_bonus_trigger()?.is_some())
}
