use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::alerts::detect_crossings;
use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::executor;
use crate::limit::{enforced_limit, evaluate, utc_day_window};
use crate::models::{
    Account, AccountAlert, AccountLimit, TransferRequest, TransferTxResult, UpsertAccountAlert,
    UpsertAccountLimit,
};
use crate::store::AccountStore;
use crate::tasks::TaskDistributor;
use crate::LedgerResult;

/// Alerts produced by one transfer. Failures here never fail the transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertDispatchReport {
    pub enqueued: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub result: TransferTxResult,
    pub alerts: AlertDispatchReport,
}

pub struct TransferService {
    store: Arc<dyn AccountStore>,
    distributor: Option<TaskDistributor>,
    clock: Arc<dyn Clock>,
}

impl TransferService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            distributor: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_distributor(mut self, distributor: TaskDistributor) -> Self {
        self.distributor = Some(distributor);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Book a transfer, then enqueue alerts for any thresholds it crossed.
    ///
    /// Currency and ownership must already have been checked by the caller.
    /// Once the booking commits the transfer is final: alert lookups and
    /// enqueue failures are logged and counted in the report only.
    pub async fn execute_transfer(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> LedgerResult<TransferOutcome> {
        let request = TransferRequest {
            from_account_id,
            to_account_id,
            amount,
        };
        executor::validate(&request)?;

        let result = self.store.transfer_tx(request, self.clock.now()).await?;
        info!(
            transfer_id = result.transfer.id,
            from_account_id,
            to_account_id,
            amount,
            "transfer committed"
        );

        let mut alerts = AlertDispatchReport::default();
        self.dispatch_alerts(&result.from_account_before, &result.from_account, &mut alerts)
            .await;
        self.dispatch_alerts(&result.to_account_before, &result.to_account, &mut alerts)
            .await;

        Ok(TransferOutcome { result, alerts })
    }

    async fn dispatch_alerts(
        &self,
        before: &Account,
        after: &Account,
        report: &mut AlertDispatchReport,
    ) {
        let Some(distributor) = &self.distributor else {
            return;
        };

        let config = match self.store.get_account_alert(after.id).await {
            Ok(config) => config,
            Err(err) => {
                warn!(account_id = after.id, error = %err, "failed to load alert config");
                report.failed += 1;
                return;
            }
        };

        for event in detect_crossings(config.as_ref(), before, after) {
            match distributor.distribute_send_account_alert(&event).await {
                Ok(_) => report.enqueued += 1,
                Err(err) => {
                    warn!(
                        account_id = event.account_id,
                        direction = %event.direction,
                        error = %err,
                        "failed to distribute account alert"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    /// Early, lock-free evaluation of the daily limit. The booking repeats
    /// the check under the account lock, so passing here is not a promise.
    pub async fn check_daily_limit(&self, account_id: i64, amount: i64) -> LedgerResult<()> {
        let limit = self.store.get_account_limit(account_id).await?;
        if enforced_limit(limit.as_ref()).is_none() {
            return Ok(());
        }

        let (day_start, day_end) = utc_day_window(self.clock.now());
        let used = self
            .store
            .sum_outgoing_transfers(account_id, day_start, day_end)
            .await?;
        evaluate(limit.as_ref(), used, amount).into_result(account_id)
    }

    pub async fn get_account(&self, id: i64) -> LedgerResult<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub async fn get_account_limit(&self, account_id: i64) -> LedgerResult<Option<AccountLimit>> {
        Ok(self.store.get_account_limit(account_id).await?)
    }

    pub async fn upsert_account_limit(
        &self,
        params: UpsertAccountLimit,
    ) -> LedgerResult<AccountLimit> {
        if params.daily_transfer_limit < 0 {
            return Err(LedgerError::validation(
                "daily_transfer_limit must not be negative",
            ));
        }
        self.get_account(params.account_id).await?;
        Ok(self.store.upsert_account_limit(params).await?)
    }

    pub async fn get_account_alert(&self, account_id: i64) -> LedgerResult<Option<AccountAlert>> {
        Ok(self.store.get_account_alert(account_id).await?)
    }

    pub async fn upsert_account_alert(
        &self,
        params: UpsertAccountAlert,
    ) -> LedgerResult<AccountAlert> {
        let UpsertAccountAlert {
            low_balance_threshold: low,
            high_balance_threshold: high,
            ..
        } = params;
        if low < 0 || high < 0 {
            return Err(LedgerError::validation(
                "alert thresholds must not be negative",
            ));
        }
        if low > 0 && high > 0 && low > high {
            return Err(LedgerError::validation(
                "low_balance_threshold must not exceed high_balance_threshold",
            ));
        }
        self.get_account(params.account_id).await?;
        Ok(self.store.upsert_account_alert(params).await?)
    }
}
