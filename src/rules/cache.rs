//! Persisted rule cache: a JSON array of `{id, text, embedding}` records.
//!
//! A refresh segments a rule corpus, embeds every chunk and writes the cache.
//! A sidecar `<cache>.meta.json` records what the cache was built from, so a
//! later refresh can reuse it when neither the corpus nor the model changed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Rule, RuleError, RuleResult};
use crate::documents::segment;
use crate::semantic::EmbeddingProvider;
use crate::utils::{calculate_hash, get_utc_timestamp};

/// Embedding requests per provider call during a refresh.
const EMBED_BATCH_SIZE: usize = 32;

/// Wire record; all three keys are always written.
#[derive(Debug, Serialize)]
struct CacheRecord<'a> {
    id: &'a str,
    text: &'a str,
    embedding: &'a [f32],
}

/// What a cache was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFingerprint {
    /// SHA-256 of the corpus text.
    pub source_hash: String,
    /// Embedding model identifier.
    pub model: String,
    /// Vector length.
    pub dimension: usize,
    /// Words per rule chunk.
    pub chunk_size: usize,
    /// UTC seconds when written.
    pub created_at: u64,
}

impl CacheFingerprint {
    /// Whether a cache with this fingerprint may serve `source_hash` / `model`.
    pub fn matches(&self, source_hash: &str, model: &str, chunk_size: usize) -> bool {
        self.source_hash == source_hash && self.model == model && self.chunk_size == chunk_size
    }
}

/// Path of the fingerprint sidecar for `cache_path`.
pub fn meta_path(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.as_os_str().to_os_string();
    name.push(".meta.json");
    PathBuf::from(name)
}

/// Read every rule from a cache file.
pub fn load_rules(path: &Path) -> RuleResult<Vec<Rule>> {
    let content = std::fs::read_to_string(path)?;
    let rules: Vec<Rule> =
        serde_json::from_str(&content).map_err(|e| RuleError::InvalidCache {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::debug!(target: "rules", "loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// Write rules to a cache file. Every rule must carry an embedding.
pub fn save_rules(path: &Path, rules: &[Rule]) -> RuleResult<()> {
    let records = rules
        .iter()
        .map(|rule| {
            let embedding = rule
                .embedding
                .as_deref()
                .ok_or_else(|| RuleError::MissingEmbedding(rule.id.clone()))?;
            Ok(CacheRecord {
                id: &rule.id,
                text: &rule.text,
                embedding,
            })
        })
        .collect::<RuleResult<Vec<_>>>()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string(&records).map_err(|e| RuleError::InvalidCache {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Read the fingerprint sidecar, if present and readable.
pub fn load_fingerprint(cache_path: &Path) -> Option<CacheFingerprint> {
    let content = std::fs::read_to_string(meta_path(cache_path)).ok()?;
    serde_json::from_str(&content).ok()
}

fn save_fingerprint(cache_path: &Path, fingerprint: &CacheFingerprint) -> RuleResult<()> {
    let content =
        serde_json::to_string_pretty(fingerprint).map_err(|e| RuleError::InvalidCache {
            path: meta_path(cache_path),
            reason: e.to_string(),
        })?;
    std::fs::write(meta_path(cache_path), content)?;
    Ok(())
}

/// Outcome of [`refresh_cache`].
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The existing cache matched the corpus and model.
    Reused { rules: usize },
    /// The cache was (re)generated.
    Rebuilt { rules: usize, dimension: usize },
}

/// Split a corpus into rules of `chunk_size` words with ids `rule-<n>`.
pub fn rules_from_corpus(corpus: &str, chunk_size: usize) -> RuleResult<Vec<Rule>> {
    Ok(segment(corpus, chunk_size)?
        .into_iter()
        .map(|chunk| Rule::new(format!("rule-{}", chunk.id), chunk.text))
        .collect())
}

/// Embed every rule that has no embedding yet, in batches.
pub async fn embed_rules(rules: &mut [Rule], embedder: &dyn EmbeddingProvider) -> RuleResult<()> {
    let pending: Vec<usize> = rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.embedding.is_none())
        .map(|(i, _)| i)
        .collect();

    for batch in pending.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|&i| rules[i].text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(RuleError::Provider(
                crate::error::ProviderError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )),
            ));
        }
        for (&i, vector) in batch.iter().zip(vectors) {
            rules[i].embedding = Some(vector);
        }
    }

    Ok(())
}

/// Build or reuse the cache at `cache_path` for `corpus`.
///
/// Reuse requires the cache file and a fingerprint matching the corpus hash,
/// embedding model and chunk size. `force` always rebuilds.
pub async fn refresh_cache(
    corpus: &str,
    cache_path: &Path,
    chunk_size: usize,
    embedder: &dyn EmbeddingProvider,
    force: bool,
) -> RuleResult<RefreshOutcome> {
    let source_hash = calculate_hash(corpus);

    if !force && cache_path.exists() {
        if let Some(fingerprint) = load_fingerprint(cache_path) {
            if fingerprint.matches(&source_hash, embedder.model_id(), chunk_size) {
                let rules = load_rules(cache_path)?;
                crate::log_event!("rules", "cache reused", "{}", cache_path.display());
                return Ok(RefreshOutcome::Reused { rules: rules.len() });
            }
        }
    }

    let mut rules = rules_from_corpus(corpus, chunk_size)?;
    embed_rules(&mut rules, embedder).await?;

    let dimension = rules
        .first()
        .and_then(|r| r.embedding.as_ref())
        .map_or(0, Vec::len);

    save_rules(cache_path, &rules)?;
    save_fingerprint(
        cache_path,
        &CacheFingerprint {
            source_hash,
            model: embedder.model_id().to_string(),
            dimension,
            chunk_size,
            created_at: get_utc_timestamp(),
        },
    )?;

    crate::log_event!(
        "rules",
        "cache rebuilt",
        "{} rules -> {}",
        rules.len(),
        cache_path.display()
    );

    Ok(RefreshOutcome::Rebuilt {
        rules: rules.len(),
        dimension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::HashingEmbeddingProvider;
    use tempfile::TempDir;

    const CORPUS: &str = "The purpose must be stated. Confidential information stays confidential. \
                          Either party may terminate with notice.";

    #[test]
    fn test_cache_file_has_exactly_three_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let mut rule = Rule::new("rule-1", "Purpose must be stated.");
        rule.embedding = Some(vec![0.5, -0.25]);

        save_rules(&path, &[rule]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let record = raw.as_array().unwrap()[0].as_object().unwrap();
        let mut keys: Vec<&str> = record.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["embedding", "id", "text"]);

        let loaded = load_rules(&path).unwrap();
        assert_eq!(loaded[0].embedding.as_deref(), Some(&[0.5, -0.25][..]));
    }

    #[test]
    fn test_save_rejects_rules_without_embeddings() {
        let dir = TempDir::new().unwrap();
        let err = save_rules(&dir.path().join("r.json"), &[Rule::new("r", "t")]).unwrap_err();
        assert!(matches!(err, RuleError::MissingEmbedding(id) if id == "r"));
    }

    #[test]
    fn test_invalid_cache_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"id": 1}]"#).unwrap();
        assert!(matches!(
            load_rules(&path),
            Err(RuleError::InvalidCache { .. })
        ));
    }

    #[test]
    fn test_rules_from_corpus_ids() {
        let rules = rules_from_corpus("a b c d e", 2).unwrap();
        let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rule-1", "rule-2", "rule-3"]);
        assert_eq!(rules[2].text, "e");
    }

    #[tokio::test]
    async fn test_refresh_reuses_until_corpus_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("rules.json");
        let embedder = HashingEmbeddingProvider::new(32);

        let first = refresh_cache(CORPUS, &path, 5, &embedder, false).await.unwrap();
        assert!(matches!(first, RefreshOutcome::Rebuilt { dimension: 32, .. }));
        assert!(meta_path(&path).exists());

        let second = refresh_cache(CORPUS, &path, 5, &embedder, false).await.unwrap();
        assert!(matches!(second, RefreshOutcome::Reused { .. }));

        let forced = refresh_cache(CORPUS, &path, 5, &embedder, true).await.unwrap();
        assert!(matches!(forced, RefreshOutcome::Rebuilt { .. }));

        let changed = format!("{CORPUS} Disputes go to arbitration.");
        let third = refresh_cache(&changed, &path, 5, &embedder, false).await.unwrap();
        assert!(matches!(third, RefreshOutcome::Rebuilt { .. }));

        let other_model = HashingEmbeddingProvider::new(16);
        let fourth = refresh_cache(&changed, &path, 5, &other_model, false).await.unwrap();
        assert!(matches!(fourth, RefreshOutcome::Rebuilt { dimension: 16, .. }));
    }
}
