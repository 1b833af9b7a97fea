//! Affiliate summary projection.
//!
//! Aggregates per-affiliate dashboard numbers (earnings, withdrawn,
//! balance, referral and ledger counts) from the account event stream.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use thiserror::Error;

use bramble_affiliate::{AffiliateEvent, AffiliateId};
use bramble_core::AggregateId;
use bramble_events::EventEnvelope;

use crate::store::KeyStore;

/// Read model: one affiliate's headline numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateSummary {
    pub account_id: AffiliateId,
    pub affiliate_code: Option<String>,
    pub total_earnings: Decimal,
    pub total_withdrawn: Decimal,
    pub available_balance: Decimal,
    pub total_referrals: u32,
    pub ledger_entries: u32,
}

impl AffiliateSummary {
    pub fn new(account_id: AffiliateId) -> Self {
        Self {
            account_id,
            affiliate_code: None,
            total_earnings: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            total_referrals: 0,
            ledger_entries: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AffiliateSummaryProjectionError {
    #[error("failed to deserialize affiliate event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Projection over `affiliate.account` envelopes.
///
/// Rebuildable; idempotent against duplicate delivery via per-aggregate
/// sequence cursors.
#[derive(Debug)]
pub struct AffiliateSummaryProjection<S>
where
    S: KeyStore<AffiliateId, AffiliateSummary>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> AffiliateSummaryProjection<S>
where
    S: KeyStore<AffiliateId, AffiliateSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    /// Summary for one affiliate.
    pub fn get(&self, account_id: &AffiliateId) -> Option<AffiliateSummary> {
        self.store.get(account_id)
    }

    /// All summaries.
    pub fn list(&self) -> Vec<AffiliateSummary> {
        self.store.list()
    }

    /// Affiliates with a positive available balance.
    pub fn list_with_balance(&self) -> Vec<AffiliateSummary> {
        self.store
            .list()
            .into_iter()
            .filter(|s| s.available_balance > Decimal::ZERO)
            .collect()
    }

    /// Apply one envelope into the read model.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), AffiliateSummaryProjectionError> {
        if envelope.aggregate_type() != "affiliate.account" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(AffiliateSummaryProjectionError::NonMonotonicSequence { last, found: seq });
        }

        // Duplicate delivery: already applied, skip.
        if seq <= last {
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(AffiliateSummaryProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: AffiliateEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| AffiliateSummaryProjectionError::Deserialize(e.to_string()))?;

        let account_id = AffiliateId::new(aggregate_id);
        let mut summary = self
            .store
            .get(&account_id)
            .unwrap_or_else(|| AffiliateSummary::new(account_id));

        match event {
            AffiliateEvent::Enrolled { code, .. } => {
                summary.affiliate_code = Some(code.to_string());
            }
            AffiliateEvent::CommissionAccrued { .. } => {
                summary.total_referrals += 1;
            }
            AffiliateEvent::CommissionCompleted {
                amount,
                balance_after,
                ..
            }
            | AffiliateEvent::BonusGranted {
                amount,
                balance_after,
                ..
            } => {
                summary.total_earnings += amount;
                summary.available_balance = balance_after;
                summary.ledger_entries += 1;
            }
            AffiliateEvent::CommissionRevoked {
                amount,
                balance_after,
                ..
            } => {
                summary.total_earnings -= amount;
                summary.available_balance = balance_after;
                summary.ledger_entries += 1;
            }
            AffiliateEvent::WithdrawalPaid {
                amount,
                balance_after,
                ..
            } => {
                summary.total_withdrawn += amount;
                summary.available_balance = balance_after;
                summary.ledger_entries += 1;
            }
            _ => {}
        }

        self.store.upsert(account_id, summary);
        self.update_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), AffiliateSummaryProjectionError> {
        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
