//! Prize store: the parent's catalogue, the kid's purchase requests and the trophy case.
//!
//! A purchase is a two-step flow. The kid asks for a prize ([`request_prize`]); the
//! request waits until a parent approves or declines it. Approval is the only path that
//! moves currency, and it re-checks the balance at that moment because other spending or
//! manual deductions may have happened since the request was made.

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use super::errors::FamilyError;
use crate::logutil::escape_log;
use crate::storage::errors::StoreError;
use crate::storage::types::{
    Glyph, Prize, PrizeKind, PurchaseHistoryEntry, PurchaseRequest, RequestStatus,
    TransactionKind, TransactionRecord,
};
use crate::storage::FamilyStore;
use crate::validation::{validate_glyph, validate_prize_name, InputError};

pub fn add_prize(
    store: &FamilyStore,
    name: &str,
    price: u32,
    kind: PrizeKind,
    emoji: &str,
) -> Result<Prize, FamilyError> {
    let name = validate_prize_name(name)?;
    if price == 0 {
        return Err(InputError::InvalidAmount.into());
    }
    let glyph = Glyph::Emoji(validate_glyph(emoji)?);
    let prize = Prize::new(name, price, kind, glyph);
    store.put_prize(&prize)?;
    info!("shop: added {} for {}", escape_log(&prize.name), prize.price);
    Ok(prize)
}

/// Change price and/or availability of an existing prize.
pub fn update_prize(
    store: &FamilyStore,
    id: &str,
    price: Option<u32>,
    available: Option<bool>,
) -> Result<Prize, FamilyError> {
    if price == Some(0) {
        return Err(InputError::InvalidAmount.into());
    }
    // Fields left as None keep whatever is stored now, including a concurrent retirement.
    Ok(store.update_prize(id, |mut prize| {
        if let Some(price) = price {
            prize.price = price;
        }
        if let Some(available) = available {
            prize.available = available;
        }
        Ok(prize)
    })?)
}

pub fn delete_prize(store: &FamilyStore, id: &str) -> Result<bool, FamilyError> {
    Ok(store.delete_prize(id)?)
}

pub fn list_prizes(store: &FamilyStore) -> Result<Vec<Prize>, FamilyError> {
    Ok(store.list_prizes()?)
}

/// Find a prize by id or by case-insensitive name.
pub fn find_prize(store: &FamilyStore, key: &str) -> Result<Prize, FamilyError> {
    let needle = key.trim();
    store
        .list_prizes()?
        .into_iter()
        .find(|p| p.id == needle || p.name.eq_ignore_ascii_case(needle))
        .ok_or_else(|| StoreError::NotFound(format!("prize: {}", needle)).into())
}

/// Find a request by full id or a unique id prefix (the CLI shows the first 8 characters).
pub fn find_request(store: &FamilyStore, key: &str) -> Result<PurchaseRequest, FamilyError> {
    let needle = key.trim();
    let mut matches: Vec<PurchaseRequest> = store
        .list_requests()?
        .into_iter()
        .filter(|r| !needle.is_empty() && r.id.starts_with(needle))
        .collect();
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(StoreError::NotFound(format!("request: {}", needle)).into()),
        n => Err(StoreError::NotFound(format!("request: {} is ambiguous ({} matches)", needle, n)).into()),
    }
}

/// Prizes the kid can currently see in the store.
pub fn available_prizes(store: &FamilyStore) -> Result<Vec<Prize>, FamilyError> {
    Ok(store
        .list_prizes()?
        .into_iter()
        .filter(|p| p.available)
        .collect())
}

/// Kid asks for a prize. Creates a pending request after the affordability checks.
pub fn request_prize(
    store: &FamilyStore,
    user_id: &str,
    prize_id: &str,
) -> Result<PurchaseRequest, FamilyError> {
    let prize = store.get_prize(prize_id)?;
    if !prize.available {
        return Err(FamilyError::PrizeUnavailable(prize.name));
    }
    let balance = store.balance(user_id)?;
    if balance < prize.price as i64 {
        return Err(FamilyError::InsufficientFunds {
            balance,
            needed: prize.price as i64,
        });
    }
    let duplicate = store.list_requests()?.into_iter().any(|r| {
        r.user_id == user_id && r.prize_id == prize.id && r.status == RequestStatus::Pending
    });
    if duplicate {
        return Err(FamilyError::DuplicateRequest(prize.name));
    }

    let request = PurchaseRequest {
        id: Uuid::new_v4().to_string(),
        prize_id: prize.id.clone(),
        prize_name: prize.name.clone(),
        prize_price: prize.price,
        prize_kind: prize.kind,
        user_id: user_id.to_string(),
        status: RequestStatus::Pending,
        requested_at: Utc::now(),
        decided_at: None,
    };
    store.put_request(&request)?;
    info!("shop: {} requested {}", user_id, escape_log(&prize.name));
    Ok(request)
}

/// Requests still waiting for a parent, newest first.
pub fn pending_requests(store: &FamilyStore) -> Result<Vec<PurchaseRequest>, FamilyError> {
    Ok(store
        .list_requests()?
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .collect())
}

/// Move a pending request to `status`. A request that is no longer pending is refused.
fn decide(
    store: &FamilyStore,
    request_id: &str,
    status: RequestStatus,
) -> Result<PurchaseRequest, FamilyError> {
    let mut already_decided = false;
    let result = store.update_request(request_id, |current: Option<PurchaseRequest>| {
        already_decided = false;
        let mut request =
            current.ok_or_else(|| StoreError::NotFound(format!("request: {}", request_id)))?;
        if request.status != RequestStatus::Pending {
            already_decided = true;
            return Err(StoreError::Internal("request already decided".into()));
        }
        request.status = status;
        request.decided_at = Some(Utc::now());
        Ok(request)
    });
    match result {
        Ok(request) => Ok(request),
        Err(_) if already_decided => Err(FamilyError::RequestNotPending(request_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn reopen(store: &FamilyStore, request_id: &str) -> Result<(), StoreError> {
    store.update_request(request_id, |current: Option<PurchaseRequest>| {
        let mut request =
            current.ok_or_else(|| StoreError::NotFound(format!("request: {}", request_id)))?;
        request.status = RequestStatus::Pending;
        request.decided_at = None;
        Ok(request)
    })?;
    Ok(())
}

/// Parent approves a request: deducts the price, records the purchase and retires
/// one-off items. Returns the new balance.
pub fn approve_request(store: &FamilyStore, request_id: &str) -> Result<i64, FamilyError> {
    let request = decide(store, request_id, RequestStatus::Approved)?;
    let price = request.prize_price as i64;

    let balance = match store.adjust_balance(&request.user_id, -price, false) {
        Ok(balance) => balance,
        Err(e) => {
            if let Err(reopen_err) = reopen(store, request_id) {
                warn!("shop: could not reopen request {}: {}", request_id, reopen_err);
            }
            return Err(FamilyError::from_store(e));
        }
    };

    let glyph = store
        .get_prize(&request.prize_id)
        .map(|p| p.glyph)
        .unwrap_or_else(|_| Glyph::Emoji("🎁".to_string()));
    store.append_history(&PurchaseHistoryEntry {
        id: Uuid::new_v4().to_string(),
        prize_id: request.prize_id.clone(),
        prize_name: request.prize_name.clone(),
        glyph,
        price: request.prize_price,
        user_id: request.user_id.clone(),
        purchased_at: Utc::now(),
    })?;
    store.put_transaction(
        &request.user_id,
        TransactionRecord::new(
            -price,
            TransactionKind::Purchase,
            format!("Bought {}", request.prize_name),
        ),
    )?;
    if request.prize_kind == PrizeKind::Item
        && !store.set_prize_available(&request.prize_id, false)?
    {
        warn!("shop: approved item {} no longer exists", request.prize_id);
    }

    info!(
        "shop: approved {} for {}, balance now {}",
        escape_log(&request.prize_name),
        request.user_id,
        balance
    );
    Ok(balance)
}

/// Parent declines a request. No currency moves.
pub fn decline_request(store: &FamilyStore, request_id: &str) -> Result<PurchaseRequest, FamilyError> {
    let request = decide(store, request_id, RequestStatus::Declined)?;
    info!("shop: declined {}", escape_log(&request.prize_name));
    Ok(request)
}

/// Everything ever bought, newest first.
pub fn trophy_case(store: &FamilyStore) -> Result<Vec<PurchaseHistoryEntry>, FamilyError> {
    Ok(store.list_history()?)
}
