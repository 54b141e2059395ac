use anyhow::Result;
use futures::{stream, try_join, StreamExt as _, TryStreamExt as _};

use crate::node_api::NodeRpc;

/// Knows how to address one input on the node and decode its answer.
/// Batch semantics (ordering, bounded concurrency, fail-fast) live in
/// the drivers below, not in implementations.
pub trait DataFetcher: Sync {
    type In: Send;
    type Out;

    fn command(&self, input: &Self::In) -> String;

    fn decode(&self, input: &Self::In, response: &str) -> Result<Self::Out>;

    /// Gives a fetcher the chance to substitute a value for a failed
    /// call. Used to map the node's 404 on genesis sub-resources to
    /// empty collections; everything else propagates.
    fn recover(&self, _input: &Self::In, _error: &anyhow::Error) -> Option<Self::Out> {
        None
    }
}

/// Issues one GET per input with at most `concurrency` requests in
/// flight; excess inputs wait their turn. Outputs preserve input order
/// and the first failure in input order fails the whole batch.
pub async fn fetch<F: DataFetcher>(
    rpc: &impl NodeRpc,
    fetcher: &F,
    inputs: Vec<F::In>,
    concurrency: usize,
) -> Result<Vec<(F::In, F::Out)>> {
    stream::iter(inputs)
        .map(|input| async move {
            let output = run(rpc, fetcher, &input).await?;
            Ok((input, output))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Product of two fetchers over the same inputs: both commands are
/// issued concurrently per input and combined with `merge` once both
/// succeed.
pub async fn fetch_merge<F1, F2, In, Merged>(
    rpc: &impl NodeRpc,
    first: &F1,
    second: &F2,
    inputs: Vec<In>,
    concurrency: usize,
    merge: impl Fn(F1::Out, F2::Out) -> Merged + Sync,
) -> Result<Vec<(In, Merged)>>
where
    In: Send,
    F1: DataFetcher<In = In>,
    F2: DataFetcher<In = In>,
{
    let merge = &merge;

    stream::iter(inputs)
        .map(|input| async move {
            let (left, right) = try_join!(run(rpc, first, &input), run(rpc, second, &input))?;
            Ok((input, merge(left, right)))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// [`fetch_merge`] with the outputs kept as a pair.
pub async fn fetch_tupled<F1, F2, In>(
    rpc: &impl NodeRpc,
    first: &F1,
    second: &F2,
    inputs: Vec<In>,
    concurrency: usize,
) -> Result<Vec<(In, (F1::Out, F2::Out))>>
where
    In: Send,
    F1: DataFetcher<In = In>,
    F2: DataFetcher<In = In>,
{
    fetch_merge(rpc, first, second, inputs, concurrency, |left, right| {
        (left, right)
    })
    .await
}

async fn run<F: DataFetcher>(
    rpc: &impl NodeRpc,
    fetcher: &F,
    input: &F::In,
) -> Result<F::Out> {
    let command = fetcher.command(input);

    match rpc.get(&command).await {
        Ok(response) => fetcher.decode(input, &response),
        Err(error) => match fetcher.recover(input, &error) {
            Some(output) => Ok(output),
            None => Err(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use anyhow::Context as _;

    use crate::mock::MockNode;

    use super::*;

    struct Doubler;

    impl DataFetcher for Doubler {
        type In = u64;
        type Out = u64;

        fn command(&self, input: &Self::In) -> String {
            format!("numbers/{input}")
        }

        fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
            let value = response.parse::<u64>().context("not a number")?;
            Ok(value * 2)
        }
    }

    struct Echo;

    impl DataFetcher for Echo {
        type In = u64;
        type Out = String;

        fn command(&self, input: &Self::In) -> String {
            format!("numbers/{input}")
        }

        fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
            Ok(response.to_owned())
        }
    }

    struct NotFoundAsZero;

    impl DataFetcher for NotFoundAsZero {
        type In = u64;
        type Out = u64;

        fn command(&self, input: &Self::In) -> String {
            format!("numbers/{input}")
        }

        fn decode(&self, _input: &Self::In, response: &str) -> Result<Self::Out> {
            response.parse().context("not a number")
        }

        fn recover(&self, _input: &Self::In, error: &anyhow::Error) -> Option<Self::Out> {
            error
                .downcast_ref::<crate::Error>()
                .is_some_and(crate::Error::is_not_found)
                .then_some(0)
        }
    }

    fn node_with_numbers() -> MockNode {
        MockNode::new()
            .respond("numbers/1", "10")
            .respond("numbers/2", "20")
            .respond("numbers/3", "30")
    }

    #[tokio::test]
    async fn fetch_preserves_input_order() -> Result<()> {
        let node = node_with_numbers().with_latency(Duration::from_millis(5));

        let results = fetch(&node, &Doubler, vec![3, 1, 2], 3).await?;

        assert_eq!(results, vec![(3, 60), (1, 20), (2, 40)]);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_bounds_in_flight_requests() -> Result<()> {
        let node = node_with_numbers().with_latency(Duration::from_millis(10));

        fetch(&node, &Doubler, vec![1, 2, 3], 2).await?;

        assert!(node.max_in_flight() <= 2);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_fails_fast_on_first_error_in_input_order() {
        let node = MockNode::new()
            .respond("numbers/1", "not a number at all")
            .respond("numbers/2", "20");

        fetch(&node, &Doubler, vec![1, 2], 2)
            .await
            .expect_err("a single decode failure should fail the batch");
    }

    #[tokio::test]
    async fn fetch_merge_combines_both_outputs() -> Result<()> {
        let node = node_with_numbers();

        let results = fetch_merge(&node, &Doubler, &Echo, vec![1, 2], 2, |doubled, raw| {
            format!("{doubled}/{raw}")
        })
        .await?;

        assert_eq!(
            results,
            vec![(1, "20/10".to_owned()), (2, "40/20".to_owned())],
        );

        Ok(())
    }

    #[tokio::test]
    async fn fetch_tupled_pairs_outputs() -> Result<()> {
        let node = node_with_numbers();

        let results = fetch_tupled(&node, &Doubler, &Echo, vec![3], 1).await?;

        assert_eq!(results, vec![(3, (60, "30".to_owned()))]);

        Ok(())
    }

    #[tokio::test]
    async fn recover_substitutes_for_missing_resources() -> Result<()> {
        let node = MockNode::new().respond("numbers/1", "10");

        let results = fetch(&node, &NotFoundAsZero, vec![1, 99], 2).await?;

        assert_eq!(results, vec![(1, 10), (99, 0)]);

        Ok(())
    }

    #[tokio::test]
    async fn recover_does_not_mask_other_failures() {
        let node = MockNode::new().respond("numbers/1", "10");
        node.reject();

        fetch(&node, &NotFoundAsZero, vec![1], 1)
            .await
            .expect_err("a shutdown error is not recoverable as an empty value");
    }
}
