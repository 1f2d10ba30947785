//! Billing settings resolution and updates.

use chrono::Utc;
use medibill_core::{BillingSettings, BillingSettingsUpdate};
use medibill_db::Database;
use std::sync::Arc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::services::directory::{found, ClinicalDirectory};

#[derive(Clone)]
pub struct SettingsService {
    db: Database,
    directory: Arc<dyn ClinicalDirectory>,
}

impl SettingsService {
    pub fn new(db: Database, directory: Arc<dyn ClinicalDirectory>) -> Self {
        SettingsService { db, directory }
    }

    /// Returns the hospital's settings, creating the defaults on first use.
    ///
    /// `user_id` is recorded as `updatedBy` only when the defaults are created.
    pub async fn resolve(&self, hospital_id: &str, user_id: Option<&str>) -> ServiceResult<BillingSettings> {
        let settings = match self.db.settings().get(hospital_id).await? {
            Some(settings) => settings,
            None => {
                found(self.directory.hospital(hospital_id).await?, "Hospital", hospital_id)?;
                self.db.settings().get_or_create(hospital_id, user_id).await?
            }
        };
        Ok(settings)
    }

    /// Applies a partial update. Unset fields keep their current values.
    pub async fn update(
        &self,
        hospital_id: &str,
        user_id: &str,
        update: BillingSettingsUpdate,
    ) -> ServiceResult<BillingSettings> {
        if update.is_empty() {
            return Err(ServiceError::Validation("No settings fields supplied".to_string()));
        }

        let mut settings = self.resolve(hospital_id, Some(user_id)).await?;
        update.apply_to(&mut settings, user_id, Utc::now())?;
        self.db.settings().save(&settings).await?;

        info!(
            hospital_id = %hospital_id,
            updated_by = %user_id,
            prefix = %settings.invoice_prefix,
            tax_rate = %settings.tax_rate_bps,
            "Billing settings updated"
        );
        Ok(settings)
    }
}
