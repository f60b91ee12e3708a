//! Data layer with every call routed through the mutation interceptor

use legisync_storage::{RecordStore, StorageError, WriteOperation};
use std::sync::Arc;

use crate::error::InterceptError;
use crate::interceptor::{Intercepted, MutationInterceptor};

#[derive(Clone)]
pub struct InterceptedStore {
    records: Arc<dyn RecordStore>,
    interceptor: MutationInterceptor,
}

impl InterceptedStore {
    pub fn new(records: Arc<dyn RecordStore>, interceptor: MutationInterceptor) -> Self {
        Self {
            records,
            interceptor,
        }
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn interceptor(&self) -> &MutationInterceptor {
        &self.interceptor
    }

    /// Apply `op` to the record store, then propagate if it is watched
    pub async fn execute(
        &self,
        op: WriteOperation,
    ) -> Result<Intercepted, InterceptError<StorageError>> {
        let records = Arc::clone(&self.records);
        self.interceptor
            .intercept(op, |op| async move { records.apply(&op).await })
            .await
    }
}
