use crate::config::IngestConfig;
use crate::domain::IngestionResult;
use crate::error::Result;
use crate::normalize::Normalizer;
use crate::source::{LiveFeedPort, SourceLoader};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Orchestrates Source Loader → Record Normalizer → Epoch Classifier into
/// the final in-memory dataset plus a tally of everything that was dropped.
pub struct IngestionPipeline {
    normalizer: Normalizer,
    loader: SourceLoader,
}

impl IngestionPipeline {
    pub fn new(config: IngestConfig) -> Result<Self> {
        let normalizer = Normalizer::from_config(&config)?;
        let loader = SourceLoader::new(config)?;
        Ok(Self { normalizer, loader })
    }

    /// Builds a pipeline with an injected live-feed client (used by tests).
    pub fn with_feed(config: IngestConfig, feed: Box<dyn LiveFeedPort>) -> Result<Self> {
        let normalizer = Normalizer::from_config(&config)?;
        let loader = SourceLoader::with_feed(config, feed);
        Ok(Self { normalizer, loader })
    }

    /// Runs one ingestion pass. Record-level defects are tallied and never
    /// abort the run; only exhaustion of both sources is an error, in which
    /// case no partial result exists.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<IngestionResult> {
        let (raw_records, source_used) = self.loader.load().await?;
        let total = raw_records.len();

        let mut records = Vec::new();
        let mut rejects = BTreeMap::new();
        // One sequential pass, insertion order preserved, no deduplication.
        for raw in &raw_records {
            match self.normalizer.normalize(raw) {
                Ok(tree) => records.push(tree),
                Err(reason) => {
                    debug!(reason = %reason, "Dropped raw record");
                    *rejects.entry(reason).or_insert(0) += 1;
                }
            }
        }

        let result = IngestionResult { records, rejects, source_used };
        info!(
            source = %result.source_used,
            accepted = result.records.len(),
            rejected = result.rejected_count(),
            total,
            "Ingestion finished"
        );
        for (reason, count) in &result.rejects {
            warn!(reason = %reason, count, "Records excluded");
        }
        Ok(result)
    }
}
