//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! Every collection lives in an in-memory [`Store`]. When a Postgres pool is
//! configured, handlers write through to the database and the stores are
//! hydrated from it on startup, so reads never touch the database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use edufund_core::{Email, Npsn, Rupiah};
use edufund_npsn::NpsnClient;
use edufund_state::{ProposalStatus, ReportStatus, TransitionRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Role, SessionKeys};
use crate::config::AppConfig;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and synchronous; it is never held across an
/// `.await`.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert unless `conflict` reports a clash with an existing record.
    ///
    /// The scan and the insert happen under one write lock, so two
    /// concurrent registrations with the same key cannot both succeed.
    pub fn insert_unless<E>(
        &self,
        id: Uuid,
        value: T,
        conflict: impl Fn(&T) -> Option<E>,
    ) -> Result<(), E> {
        let mut guard = self.data.write();
        if let Some(err) = guard.values().find_map(conflict) {
            return Err(err);
        }
        guard.insert(id, value);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Records matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.data.read().values().filter(|v| pred(v)).count()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current value, check preconditions, and
    /// mutate it, all under a single write lock. Returns `None` if the record
    /// doesn't exist, or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Apply `f` to every record `pred` accepts. Returns how many changed.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, mut f: impl FnMut(&mut T)) -> usize {
        let mut guard = self.data.write();
        let mut changed = 0;
        for value in guard.values_mut().filter(|v| pred(v)) {
            f(value);
            changed += 1;
        }
        changed
    }

    /// Like [`Store::try_update`], but `f` also gets write access to
    /// `other`'s records. Both write locks are held for the whole call, so
    /// readers never see one change without the other.
    ///
    /// Lock order is `self` then `other`. Every caller pairing the same two
    /// stores must use the same receiver or the locks can deadlock.
    pub fn try_update_with<U, R, E>(
        &self,
        id: &Uuid,
        other: &Store<U>,
        f: impl FnOnce(&mut T, &mut HashMap<Uuid, U>) -> Result<R, E>,
    ) -> Option<Result<R, E>>
    where
        U: Clone + Send + Sync,
    {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        let mut other_guard = other.data.write();
        Some(f(entry, &mut other_guard))
    }

    /// Read a record together with `other`'s records under both read locks,
    /// taken in the same order as [`Store::try_update_with`].
    pub fn read_with<U, R>(
        &self,
        id: &Uuid,
        other: &Store<U>,
        f: impl FnOnce(&T, &HashMap<Uuid, U>) -> R,
    ) -> Option<R>
    where
        U: Clone + Send + Sync,
    {
        let guard = self.data.read();
        let entry = guard.get(id)?;
        let other_guard = other.data.read();
        Some(f(entry, &other_guard))
    }

    /// Remove a record if `pred` accepts it. The check and the removal share
    /// one write lock.
    pub fn remove_if<E>(
        &self,
        id: &Uuid,
        pred: impl FnOnce(&T) -> Result<(), E>,
    ) -> Option<Result<T, E>> {
        let mut guard = self.data.write();
        if let Err(err) = pred(guard.get(id)?) {
            return Some(Err(err));
        }
        guard.remove(id).map(Ok)
    }

    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Drop every record `keep` rejects. Returns how many were removed.
    pub fn retain(&self, keep: impl Fn(&T) -> bool) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, v| keep(v));
        before - guard.len()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Record Types -------------------------------------------------------------

/// A registered school account.
///
/// Never serialized to clients directly: the password hash stays server-side.
/// Handlers respond with [`crate::routes::schools::SchoolProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub id: Uuid,
    pub name: String,
    pub npsn: Npsn,
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub npsn_verified: bool,
    /// Name returned by the NPSN registry, when verified.
    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub principal_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A school's funding proposal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProposalRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    #[schema(value_type = u64)]
    pub target_amount: Rupiah,
    pub deadline: Option<NaiveDate>,
    pub cover_image_url: Option<String>,
    /// draft | pending | approved | rejected.
    #[schema(value_type = String)]
    pub status: ProposalStatus,
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<TransitionRecord<ProposalStatus>>,
    /// Admin's note on the decision, if any.
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProposalRecord {
    /// Apply a validated transition.
    pub fn apply(&mut self, record: TransitionRecord<ProposalStatus>) {
        self.status = record.to_state;
        self.updated_at = Utc::now();
        self.transitions.push(record);
    }
}

/// The donor-facing projection of an approved proposal.
///
/// Shares its id with the proposal it was created from.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampaignRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub school_name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub cover_image_url: Option<String>,
    #[schema(value_type = u64)]
    pub target_amount: Rupiah,
    #[schema(value_type = u64)]
    pub collected_amount: Rupiah,
    pub donors_count: u64,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRecord {
    /// Build the campaign for a freshly approved proposal.
    pub fn from_proposal(proposal: &ProposalRecord, school_name: String) -> Self {
        Self {
            id: proposal.id,
            school_id: proposal.school_id,
            school_name,
            title: proposal.title.clone(),
            description: proposal.description.clone(),
            category: proposal.category.clone(),
            cover_image_url: proposal.cover_image_url.clone(),
            target_amount: proposal.target_amount,
            collected_amount: Rupiah::ZERO,
            donors_count: 0,
            deadline: proposal.deadline,
            created_at: proposal.updated_at,
            updated_at: proposal.updated_at,
        }
    }

    /// Add one donation to the running totals.
    pub fn apply_donation(&mut self, amount: Rupiah) -> Result<(), edufund_core::ValidationError> {
        self.collected_amount = self.collected_amount.checked_add(amount)?;
        self.donors_count += 1;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A simulated donation. No payment is processed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationRecord {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub donor_name: String,
    #[schema(value_type = u64)]
    pub amount: Rupiah,
    pub anonymous: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One line of a fund-usage report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportItem {
    pub description: String,
    #[schema(value_type = u64)]
    pub amount: Rupiah,
}

/// A fund-usage disclosure for an approved proposal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub proposal_id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = u64)]
    pub amount_used: Rupiah,
    pub items: Vec<ReportItem>,
    pub attachments: Vec<String>,
    /// draft | submitted | approved | rejected.
    #[schema(value_type = String)]
    pub status: ReportStatus,
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<TransitionRecord<ReportStatus>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn apply(&mut self, record: TransitionRecord<ReportStatus>) {
        self.status = record.to_state;
        self.updated_at = Utc::now();
        self.transitions.push(record);
    }
}

/// A dated activity in a campaign's gallery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimelineEntryRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub proposal_id: Uuid,
    pub title: String,
    pub description: String,
    pub activity_date: NaiveDate,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Server-side record of an issued session token. Deleting it revokes the
/// token even though its signature and expiry are still valid.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub subject: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppState {
    pub schools: Store<SchoolRecord>,
    pub proposals: Store<ProposalRecord>,
    pub campaigns: Store<CampaignRecord>,
    pub donations: Store<DonationRecord>,
    pub reports: Store<ReportRecord>,
    pub timeline: Store<TimelineEntryRecord>,
    pub sessions: Store<SessionRecord>,

    /// Signing and verification keys for session tokens.
    pub session_keys: SessionKeys,

    /// When `None`, registration marks every school unverified.
    pub npsn_client: Option<NpsnClient>,

    /// When `Some`, every mutation is written through to Postgres.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration and no collaborators.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None, None)
    }

    pub fn with_config(
        config: AppConfig,
        npsn_client: Option<NpsnClient>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let session_keys = SessionKeys::new(&config.session_secret, config.session_ttl_secs);
        Self {
            schools: Store::new(),
            proposals: Store::new(),
            campaigns: Store::new(),
            donations: Store::new(),
            reports: Store::new(),
            timeline: Store::new(),
            sessions: Store::new(),
            session_keys,
            npsn_client,
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup. Campaign counters are reconciled against the
    /// donation log; a drifted counter is corrected in memory and in the
    /// database and logged at `warn`.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let schools = crate::db::schools::load_all(pool).await?;
        let school_count = schools.len();
        for record in schools {
            self.schools.insert(record.id, record);
        }

        let proposals = crate::db::proposals::load_all(pool).await?;
        let proposal_count = proposals.len();
        for record in proposals {
            self.proposals.insert(record.id, record);
        }

        let donations = crate::db::campaigns::load_all_donations(pool).await?;
        let donation_count = donations.len();
        let mut totals: HashMap<Uuid, (Rupiah, u64)> = HashMap::new();
        for record in donations {
            let entry = totals.entry(record.campaign_id).or_insert((Rupiah::ZERO, 0));
            entry.0 = Rupiah(entry.0.value().saturating_add(record.amount.value()));
            entry.1 += 1;
            self.donations.insert(record.id, record);
        }

        let campaigns = crate::db::campaigns::load_all(pool).await?;
        let campaign_count = campaigns.len();
        for mut record in campaigns {
            let (collected, donors) = totals.get(&record.id).copied().unwrap_or((Rupiah::ZERO, 0));
            if record.collected_amount != collected || record.donors_count != donors {
                tracing::warn!(
                    campaign_id = %record.id,
                    stored_collected = record.collected_amount.value(),
                    stored_donors = record.donors_count,
                    ledger_collected = collected.value(),
                    ledger_donors = donors,
                    "campaign counters drifted from donation log; reconciling"
                );
                record.collected_amount = collected;
                record.donors_count = donors;
                crate::db::campaigns::set_counters(pool, record.id, collected, donors).await?;
            }
            self.campaigns.insert(record.id, record);
        }

        let reports = crate::db::reports::load_all(pool).await?;
        let report_count = reports.len();
        for record in reports {
            self.reports.insert(record.id, record);
        }

        let entries = crate::db::timeline::load_all(pool).await?;
        let timeline_count = entries.len();
        for record in entries {
            self.timeline.insert(record.id, record);
        }

        tracing::info!(
            schools = school_count,
            proposals = proposal_count,
            campaigns = campaign_count,
            donations = donation_count,
            reports = report_count,
            timeline_entries = timeline_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
