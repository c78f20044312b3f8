use super::DBClient;
use tokio_cron_scheduler::{Job, JobScheduler};

impl DBClient {
    /// Nightly job deleting accounts that never activated before their token
    /// expired.
    pub async fn start_cleanup_task(&self) {
        let sched = JobScheduler::new().await.unwrap();
        let pool = self.pool.clone();

        let job = Job::new_async("0 0 1 * * *", move |uuid, _l| {
            let pool = pool.clone();
            Box::pin(async move {
                tracing::info!("Running account cleanup job {:?}", uuid);

                let result = sqlx::query(
                    "DELETE FROM users
                     WHERE verified = false
                       AND token_expires_at < NOW()",
                )
                .execute(&pool)
                .await;

                match result {
                    Ok(r) => {
                        tracing::info!(
                            "Account cleanup job {:?} finished, deleted {} rows",
                            uuid,
                            r.rows_affected()
                        );
                    }
                    Err(e) => {
                        tracing::error!("Account cleanup job {:?} failed: {:?}", uuid, e);
                    }
                }
            })
        })
        .unwrap();

        sched.add(job).await.unwrap();
        // start() does not block
        sched.start().await.unwrap();
    }
}
