use corpusdb_core::config::EngineConfig;
use corpusdb_core::error::{Error, Result};
use corpusdb_core::traits::QualityProvider;
use corpusdb_core::types::{ConsensusResult, Metadata, ProviderAssessment};
use corpusdb_core::usage::UsageTracker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct ConsensusValidator {
    config: Arc<EngineConfig>,
    providers: Vec<Arc<dyn QualityProvider>>,
    usage: Arc<UsageTracker>,
    semaphore: Arc<Semaphore>,
}

impl ConsensusValidator {
    /// Fails when fewer providers are configured than `min_providers`
    /// requires; a validator that cannot reach quorum is a config error.
    pub fn new(
        config: Arc<EngineConfig>,
        providers: Vec<Arc<dyn QualityProvider>>,
        usage: Arc<UsageTracker>,
    ) -> Result<Self> {
        if providers.len() < config.min_providers {
            return Err(Error::InvalidConfig(format!(
                "{} providers configured, min_providers is {}",
                providers.len(),
                config.min_providers
            )));
        }
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests));
        Ok(Self {
            config,
            providers,
            usage,
            semaphore,
        })
    }

    /// Query every provider and compute an agreement-weighted verdict.
    ///
    /// Once the daily spend reaches `cost_limit_per_day`, calls
    /// short-circuit without contacting any provider. Individual provider
    /// failures degrade to a confidence-0 assessment instead of aborting
    /// the validation.
    pub async fn validate_quality(
        &self,
        doc_id: &str,
        content: &str,
        embedding: Option<&[f32]>,
    ) -> Result<ConsensusResult> {
        let mut metadata = Metadata::new();
        metadata.insert("doc_id".to_string(), serde_json::json!(doc_id));
        if let Some(embedding) = embedding {
            metadata.insert("embedding_dimension".to_string(), serde_json::json!(embedding.len()));
        }

        let spent = self.usage.cost_today();
        if spent >= self.config.cost_limit_per_day {
            tracing::warn!(doc_id, spent, "cost ceiling reached, skipping validation");
            return Ok(ConsensusResult {
                consensus_reached: false,
                overall_quality_score: 0.0,
                provider_results: HashMap::new(),
                reasoning: format!(
                    "daily cost limit of ${:.2} reached (spent ${spent:.2}); no providers queried",
                    self.config.cost_limit_per_day
                ),
                metadata,
            });
        }

        // Fan out behind the concurrency gate; gather all, then combine.
        // join_all keeps provider order, so results are deterministic
        // regardless of response arrival order.
        let futures = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let semaphore = Arc::clone(&self.semaphore);
            let usage = Arc::clone(&self.usage);
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            provider.name().to_string(),
                            ProviderAssessment::failed("concurrency gate closed"),
                        )
                    }
                };
                usage.record_cost(provider.cost_per_call());
                match provider.assess(content).await {
                    Ok(assessment) => (provider.name().to_string(), assessment),
                    Err(e) => {
                        tracing::warn!(provider = provider.name(), error = %e, "provider failed");
                        (provider.name().to_string(), ProviderAssessment::failed(&e.to_string()))
                    }
                }
            }
        });
        let assessments = futures::future::join_all(futures).await;

        Ok(self.combine(assessments, metadata))
    }

    fn combine(
        &self,
        assessments: Vec<(String, ProviderAssessment)>,
        metadata: Metadata,
    ) -> ConsensusResult {
        let responsive: Vec<&ProviderAssessment> = assessments
            .iter()
            .map(|(_, a)| a)
            .filter(|a| a.confidence > 0.0)
            .collect();

        let provider_results: HashMap<String, ProviderAssessment> =
            assessments.iter().cloned().collect();

        if responsive.is_empty() {
            return ConsensusResult {
                consensus_reached: false,
                overall_quality_score: 0.0,
                provider_results,
                reasoning: "no provider returned a usable assessment".to_string(),
                metadata,
            };
        }

        let total_confidence: f32 = responsive.iter().map(|a| a.confidence).sum();
        let weighted_mean: f32 = responsive
            .iter()
            .map(|a| a.quality_score * a.confidence)
            .sum::<f32>()
            / total_confidence;

        // Spread is taken over responsive providers only: a dead provider's
        // default 0.0 score must not masquerade as disagreement.
        let min = responsive.iter().map(|a| a.quality_score).fold(f32::INFINITY, f32::min);
        let max = responsive
            .iter()
            .map(|a| a.quality_score)
            .fold(f32::NEG_INFINITY, f32::max);
        let spread = max - min;

        let above_threshold = weighted_mean > self.config.consensus_threshold;
        let agrees = spread <= self.config.max_provider_spread;
        let consensus_reached = above_threshold && agrees;

        let reasoning = if !above_threshold {
            format!(
                "weighted quality {weighted_mean:.3} does not exceed threshold {:.3}",
                self.config.consensus_threshold
            )
        } else if !agrees {
            format!(
                "providers disagree: score spread {spread:.3} exceeds {:.3}",
                self.config.max_provider_spread
            )
        } else {
            format!(
                "{} of {} providers agree, weighted quality {weighted_mean:.3}",
                responsive.len(),
                assessments.len()
            )
        };

        ConsensusResult {
            consensus_reached,
            overall_quality_score: weighted_mean,
            provider_results,
            reasoning,
            metadata,
        }
    }
}
