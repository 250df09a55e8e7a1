//! Concurrent fan-out over a fixed set of providers.
//!
//! [`Aggregator::temperature`] starts one task per provider, collects their
//! outcomes through a bounded channel sized to the provider count, and either
//! averages all readings or returns the first failure it observes.
//!
//! Tasks still in flight after a failure are left to finish on their own.
//! They are neither awaited nor cancelled; their results are dropped. There is
//! no aggregator-level timeout, so a provider that never answers blocks the
//! call unless another provider fails first.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    error::{ProviderError, WeatherError},
    model::Temperature,
    provider::WeatherProvider,
};

type Outcome = (String, Result<Temperature, ProviderError>);

/// Averages readings from an ordered, non-empty set of providers.
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl Aggregator {
    /// Rejects an empty provider list.
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Result<Self, WeatherError> {
        if providers.is_empty() {
            return Err(WeatherError::NoProviders);
        }

        Ok(Self { providers })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Mean temperature across all providers, or the first provider failure.
    #[tracing::instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn temperature(&self, city: &str) -> Result<Temperature, WeatherError> {
        let expected = self.providers.len();
        let (tx, mut rx) = mpsc::channel::<Outcome>(expected);

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let tx = tx.clone();
            let city = city.to_owned();

            tokio::spawn(async move {
                let outcome = provider.temperature(&city).await;
                // Fails only once the aggregator has already returned.
                let _ = tx.send((provider.name().to_owned(), outcome)).await;
            });
        }
        drop(tx);

        let mut sum = 0.0;
        let mut received = 0;
        while received < expected {
            let Some((provider, outcome)) = rx.recv().await else {
                return Err(WeatherError::ProviderTaskAborted { received, expected });
            };

            match outcome {
                Ok(temp) => {
                    sum += temp.kelvin();
                    received += 1;
                }
                Err(source) => {
                    tracing::warn!(provider = %provider, error = %source, "provider failed");
                    return Err(WeatherError::ProviderCallFailed { provider, source });
                }
            }
        }

        // `new` guarantees expected >= 1
        Ok(Temperature::from_kelvin(sum / expected as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    const EPS: f64 = 1e-9;

    #[derive(Debug)]
    struct Fixed(&'static str, f64);

    #[async_trait]
    impl WeatherProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            Ok(Temperature::from_kelvin(self.1))
        }
    }

    #[derive(Debug)]
    struct Failing(&'static str);

    #[async_trait]
    impl WeatherProvider for Failing {
        fn name(&self) -> &str {
            self.0
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            Err(ProviderError::Status { status: 502, body: "simulated network error".into() })
        }
    }

    /// Never answers.
    #[derive(Debug)]
    struct Hanging;

    #[async_trait]
    impl WeatherProvider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            std::future::pending().await
        }
    }

    /// Answers after a delay and records that it finished.
    #[derive(Debug)]
    struct Slow {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl WeatherProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Temperature::from_kelvin(300.0))
        }
    }

    #[derive(Debug)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl WeatherProvider for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Temperature::from_kelvin(290.0))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait]
    impl WeatherProvider for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
            panic!("provider bug")
        }
    }

    fn aggregator(providers: Vec<Arc<dyn WeatherProvider>>) -> Aggregator {
        Aggregator::new(providers).expect("non-empty provider list")
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        let err = Aggregator::new(Vec::new()).unwrap_err();
        assert!(matches!(err, WeatherError::NoProviders));
    }

    #[tokio::test]
    async fn averages_all_readings() {
        let agg = aggregator(vec![Arc::new(Fixed("a", 280.0)), Arc::new(Fixed("b", 290.0))]);

        let temp = agg.temperature("berlin").await.unwrap();
        assert!((temp.kelvin() - 285.0).abs() < EPS);
    }

    #[tokio::test]
    async fn two_providers_scenario() {
        let agg = aggregator(vec![Arc::new(Fixed("a", 300.0)), Arc::new(Fixed("b", 310.0))]);

        let temp = agg.temperature("madrid").await.unwrap();
        assert!((temp.kelvin() - 305.0).abs() < EPS);
    }

    #[tokio::test]
    async fn single_provider_value_is_returned_unchanged() {
        let agg = aggregator(vec![Arc::new(Fixed("only", 271.3))]);

        let temp = agg.temperature("reykjavik").await.unwrap();
        assert_eq!(temp.kelvin(), 271.3);
    }

    #[tokio::test]
    async fn provider_order_does_not_change_the_mean() {
        let values = [281.7, 293.25, 276.05, 300.0];
        let forward: Vec<Arc<dyn WeatherProvider>> =
            values.iter().map(|v| Arc::new(Fixed("p", *v)) as Arc<dyn WeatherProvider>).collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregator(forward).temperature("x").await.unwrap();
        let b = aggregator(reversed).temperature("x").await.unwrap();

        assert!((a.kelvin() - b.kelvin()).abs() < EPS);
        assert!((a.kelvin() - values.iter().sum::<f64>() / 4.0).abs() < EPS);
    }

    #[tokio::test]
    async fn celsius_provider_is_normalized_before_averaging() {
        #[derive(Debug)]
        struct Freezing;

        #[async_trait]
        impl WeatherProvider for Freezing {
            fn name(&self) -> &str {
                "freezing"
            }

            async fn temperature(&self, _city: &str) -> Result<Temperature, ProviderError> {
                Ok(Temperature::from_celsius(0.0))
            }
        }

        let agg = aggregator(vec![Arc::new(Freezing), Arc::new(Fixed("k", 283.15))]);

        let temp = agg.temperature("x").await.unwrap();
        assert!((temp.kelvin() - 278.15).abs() < EPS);
    }

    #[tokio::test]
    async fn any_failure_fails_the_aggregate() {
        let agg = aggregator(vec![Arc::new(Fixed("a", 280.0)), Arc::new(Failing("b"))]);

        let err = agg.temperature("paris").await.unwrap_err();
        match err {
            WeatherError::ProviderCallFailed { provider, .. } => assert_eq!(provider, "b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_failures_report_one_of_them() {
        let agg = aggregator(vec![Arc::new(Failing("a")), Arc::new(Failing("b"))]);

        let err = agg.temperature("paris").await.unwrap_err();
        assert!(matches!(err, WeatherError::ProviderCallFailed { .. }));
    }

    #[tokio::test]
    async fn failure_returns_without_waiting_for_hanging_provider() {
        let agg = aggregator(vec![
            Arc::new(Fixed("a", 280.0)),
            Arc::new(Failing("b")),
            Arc::new(Hanging),
        ]);

        let result = tokio::time::timeout(Duration::from_secs(5), agg.temperature("rome"))
            .await
            .expect("fail-fast must not wait for the hanging provider");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn abandoned_calls_keep_running_after_failure() {
        let finished = Arc::new(AtomicBool::new(false));
        let agg = aggregator(vec![
            Arc::new(Fixed("a", 280.0)),
            Arc::new(Failing("b")),
            Arc::new(Slow { delay: Duration::from_millis(50), finished: finished.clone() }),
        ]);

        assert!(agg.temperature("rome").await.is_err());
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn duplicate_providers_are_called_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared: Arc<dyn WeatherProvider> = Arc::new(Counting(calls.clone()));
        let agg = aggregator(vec![shared.clone(), shared, Arc::new(Fixed("b", 300.0))]);

        let temp = agg.temperature("lima").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!((temp.kelvin() - (290.0 + 290.0 + 300.0) / 3.0).abs() < EPS);
    }

    #[tokio::test]
    async fn panicking_provider_is_reported_as_aborted() {
        let agg = aggregator(vec![Arc::new(Fixed("a", 280.0)), Arc::new(Panicking)]);

        let err = agg.temperature("x").await.unwrap_err();
        match err {
            WeatherError::ProviderTaskAborted { received, expected } => {
                assert_eq!(received, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn provider_names_keep_order() {
        let agg = aggregator(vec![Arc::new(Fixed("z", 1.0)), Arc::new(Fixed("a", 2.0))]);
        assert_eq!(agg.provider_names(), ["z", "a"]);
        assert_eq!(agg.len(), 2);
        assert!(!agg.is_empty());
    }
}
