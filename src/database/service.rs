//! Database service layer
//!
//! Bundles the repositories over one shared pool

use crate::database::{
    AdminRepository, BroadcastRepository, DatabasePool, SubscriptionRepository, UserRepository,
};
use crate::utils::errors::TorahBotError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub subscriptions: SubscriptionRepository,
    pub broadcasts: BroadcastRepository,
    pub admins: AdminRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            broadcasts: BroadcastRepository::new(pool.clone()),
            admins: AdminRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), TorahBotError> {
        super::health_check(&self.pool).await
    }

    /// Close the pool, waiting for checked out connections to be returned
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
