//! Handles for non-blocking operations.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// A handle to one in-flight non-blocking operation.
///
/// The operation's outcome is only reachable through [`Request::wait`], which
/// consumes the handle, so a payload can never be read before its operation
/// has been joined.
///
/// # Example
///
/// ```
/// use comm::LocalUniverse;
///
/// #[tokio::main]
/// async fn main() -> Result<(), comm::Error> {
///     let ranks = LocalUniverse::new(2).communicators();
///
///     let receive = ranks[1].irecv::<String>(0, 3)?;
///     let send = ranks[0].isend(&"ping".to_string(), 1, 3)?;
///
///     send.wait().await?;
///     assert_eq!(receive.wait().await?, "ping");
///     Ok(())
/// }
/// ```
#[must_use = "a request must be waited on to observe its outcome"]
pub struct Request<T> {
    handle: JoinHandle<Result<T>>,
}

impl<T> Request<T> {
    pub(crate) fn new(handle: JoinHandle<Result<T>>) -> Self {
        Self { handle }
    }

    /// Reports whether the operation has finished, without consuming it.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the operation completes and yields its outcome.
    pub async fn wait(self) -> Result<T> {
        self.handle.await?
    }
}

/// A set of pending operations joined together.
///
/// Operations are added as they are issued and consumed only by
/// [`RequestList::wait_all`] or [`RequestList::wait_all_with`].
#[must_use = "pending operations must be joined"]
pub struct RequestList<T> {
    requests: Vec<Request<T>>,
}

impl<T> RequestList<T> {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    pub fn add(&mut self, request: Request<T>) {
        self.requests.push(request);
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Waits for every operation and returns their outcomes in issue order.
    ///
    /// Fails with the first error observed, in issue order.
    pub async fn wait_all(self) -> Result<Vec<T>> {
        let mut outcomes = Vec::with_capacity(self.requests.len());
        for request in self.requests {
            outcomes.push(request.wait().await?);
        }
        Ok(outcomes)
    }

    /// Waits for every operation, handing each outcome to `on_complete` as
    /// soon as that operation finishes.
    ///
    /// `on_complete` runs on the caller's task, one outcome at a time, so it
    /// may hold exclusive access to state owned by the caller. Returns the
    /// first error from either an operation or the callback; operations still
    /// pending at that point are left to finish unobserved.
    pub async fn wait_all_with<F, E>(self, mut on_complete: F) -> std::result::Result<(), E>
    where
        F: FnMut(T) -> std::result::Result<(), E>,
        E: From<Error>,
    {
        let mut pending: FuturesUnordered<_> =
            self.requests.into_iter().map(Request::wait).collect();

        while let Some(outcome) = pending.next().await {
            on_complete(outcome?)?;
        }
        Ok(())
    }
}

impl<T> Default for RequestList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<Request<T>> for RequestList<T> {
    fn extend<I: IntoIterator<Item = Request<T>>>(&mut self, iter: I) {
        self.requests.extend(iter);
    }
}

impl<T> FromIterator<Request<T>> for RequestList<T> {
    fn from_iter<I: IntoIterator<Item = Request<T>>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn delayed(value: u32, millis: u64) -> Request<u32> {
        Request::new(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(value)
        }))
    }

    #[tokio::test]
    async fn empty_list_joins_immediately() {
        let list: RequestList<u32> = RequestList::new();
        assert!(list.is_empty());
        assert!(list.wait_all().await.unwrap().is_empty());

        let mut calls = 0;
        RequestList::<u32>::new()
            .wait_all_with(|_| {
                calls += 1;
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn wait_all_keeps_issue_order() {
        let list: RequestList<u32> = [delayed(1, 40), delayed(2, 0), delayed(3, 20)]
            .into_iter()
            .collect();
        assert_eq!(list.len(), 3);
        assert_eq!(list.wait_all().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn wait_all_with_follows_completion_order() {
        let mut list = RequestList::new();
        list.add(delayed(1, 60));
        list.add(delayed(2, 0));
        list.add(delayed(3, 30));

        let mut seen = Vec::new();
        list.wait_all_with(|value| {
            seen.push(value);
            Ok::<_, Error>(())
        })
        .await
        .unwrap();
        assert_eq!(seen, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn failed_operation_surfaces_from_join() {
        let mut list = RequestList::new();
        list.add(delayed(1, 0));
        list.add(Request::new(tokio::spawn(async {
            Err::<u32, _>(Error::ConnectionClosed)
        })));

        assert!(matches!(
            list.wait_all().await,
            Err(Error::ConnectionClosed)
        ));
    }
}
