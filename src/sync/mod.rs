use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::{sync::mpsc::Receiver, time::timeout};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReceiveTimeoutError {
    #[error("timed out waiting for message")]
    Timeout,
    #[error("channel closed")]
    Closed,
}

/// Channel receivers that can timeout when receiving messages
pub trait TimeoutReceiver<T> {
    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<T, ReceiveTimeoutError>> + Send;
}

impl<T> TimeoutReceiver<T> for Receiver<T>
where
    T: Send + Sync,
{
    async fn recv_timeout(&mut self, duration: Duration) -> Result<T, ReceiveTimeoutError> {
        match timeout(duration, self.recv()).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ReceiveTimeoutError::Closed),
            Err(_) => Err(ReceiveTimeoutError::Timeout),
        }
    }
}
