//! All-settle helpers for fanning out independent units of work.
//!
//! Every future runs to completion; one failure never cancels its siblings.

use std::future::Future;

use futures::future::join_all;
use itertools::{Either, Itertools};

/// Await every future jointly and return each outcome in input order.
pub async fn settle_all<I, F, T, E>(futures: I) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(futures).await
}

/// Partition settled outcomes into successes and failures, keeping order.
pub fn split_outcomes<T, E>(outcomes: Vec<Result<T, E>>) -> (Vec<T>, Vec<E>) {
    outcomes.into_iter().partition_map(|outcome| match outcome {
        Ok(value) => Either::Left(value),
        Err(error) => Either::Right(error),
    })
}
