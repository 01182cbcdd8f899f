//! The version store: per-spec history plus everything derived from it.
//!
//! History is append-only. Status changes are gated by [`Governance`]
//! before a version carrying the new status is appended. With an impact
//! graph attached, the store also answers staleness, drift and
//! deprecation-impact questions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use specmem_core::persist::check_format_version;
use specmem_core::{
    read_json, write_json_atomic, LifecycleStatus, NodeId, NodeKind, SpecBlock, StoreError,
    FORMAT_VERSION,
};
use specmem_governance::Governance;
use specmem_impact::{GraphNode, ImpactGraph};

use crate::contradiction::{Contradiction, ContradictionDetector, NegationHeuristic};
use crate::deprecation::{self, Deprecation};
use crate::diff::{diff_texts, SpecChange};
use crate::drift::{DriftItem, DriftReport, DriftScorer, DriftSeverity, RecencyScorer};
use crate::error::{DiffError, Result};
use crate::segment::segments;
use crate::staleness::{Acknowledgment, StalenessWarning};
use crate::version::{SpecVersion, VersionRecord};

/// Traversal depths and thresholds for the derived queries.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Hops from a spec searched for code modified after a cached version.
    pub staleness_depth: usize,
    /// Hops from a deprecated spec counted as still depending on it.
    pub deprecation_depth: usize,
    /// Code modified within this long after a spec change is not drift.
    pub drift_grace: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            staleness_depth: 1,
            deprecation_depth: 2,
            drift_grace: Duration::seconds(3600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreFile {
    format_version: u32,
    #[serde(default)]
    specs: BTreeMap<String, Vec<SpecVersion>>,
    #[serde(default)]
    acknowledgments: Vec<Acknowledgment>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct StoreFileRef<'a> {
    format_version: u32,
    specs: BTreeMap<&'a str, Vec<VersionRecord<'a>>>,
    acknowledgments: &'a [Acknowledgment],
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct StoreState {
    specs: BTreeMap<String, Vec<SpecVersion>>,
    acknowledgments: Vec<Acknowledgment>,
    extra: BTreeMap<String, Value>,
}

impl StoreState {
    fn history(&self, key: &str) -> Result<&[SpecVersion]> {
        self.specs
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| DiffError::SpecNotFound(key.to_string()))
    }

    fn latest_status(&self, key: &str) -> Option<LifecycleStatus> {
        self.specs.get(key).and_then(|h| h.last()).map(|v| v.status)
    }
}

/// Append-only history of every tracked spec.
#[derive(Debug)]
pub struct VersionStore {
    storage_path: Option<PathBuf>,
    governance: Arc<Governance>,
    graph: Option<Arc<ImpactGraph>>,
    options: StoreOptions,
    detector: Box<dyn ContradictionDetector>,
    scorer: Box<dyn DriftScorer>,
    state: RwLock<StoreState>,
}

impl VersionStore {
    /// A store that never touches disk.
    pub fn in_memory(governance: Arc<Governance>) -> Self {
        Self::with_state(StoreState::default(), None, governance)
    }

    /// Open the store at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>, governance: Arc<Governance>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no version store yet");
            return Ok(Self::with_state(StoreState::default(), Some(path), governance));
        }
        let file: StoreFile = read_json(&path)?;
        let state = validate_file(file, &path)?;
        tracing::debug!(
            path = %path.display(),
            specs = state.specs.len(),
            "version store loaded"
        );
        Ok(Self::with_state(state, Some(path), governance))
    }

    fn with_state(state: StoreState, storage_path: Option<PathBuf>, governance: Arc<Governance>) -> Self {
        Self {
            storage_path,
            governance,
            graph: None,
            options: StoreOptions::default(),
            detector: Box::new(NegationHeuristic::default()),
            scorer: Box::new(RecencyScorer::default()),
            state: RwLock::new(state),
        }
    }

    /// Builder: attach the impact graph used for staleness, drift and
    /// deprecation impact.
    pub fn with_impact_graph(mut self, graph: Arc<ImpactGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Builder: override the traversal depths and drift grace period.
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder: replace the default [`NegationHeuristic`].
    pub fn with_contradiction_detector(mut self, detector: impl ContradictionDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_drift_scorer(mut self, scorer: impl DriftScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Backing file, or `None` for an in-memory store.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // --- Recording ---

    /// Append a new version of `block`.
    ///
    /// A status different from the latest tracked one is first checked by
    /// governance; a rejected change appends nothing.
    pub fn track_version(&self, block: &SpecBlock) -> Result<SpecVersion> {
        let key = spec_key(&block.id)?;
        let mut state = self.state.write();
        if let Some(prev) = state.latest_status(&key) {
            if prev != block.status {
                self.governance.transition(
                    &entity_id(&key),
                    prev,
                    block.status,
                    None,
                    Some("status changed in tracked block"),
                )?;
            }
        }
        self.append_locked(&mut state, &key, &block.text, block.status, block.deadline)
    }

    /// True when the latest tracked version already matches `block`.
    pub fn is_current(&self, block: &SpecBlock) -> bool {
        let Ok(key) = spec_key(&block.id) else {
            return false;
        };
        let state = self.state.read();
        state
            .specs
            .get(&key)
            .and_then(|h| h.last())
            .is_some_and(|v| {
                v.text == block.text && v.status == block.status && v.deadline == block.deadline
            })
    }

    /// Move a spec to a new lifecycle status, recording a version with the
    /// same text and the new status.
    pub fn transition_status(
        &self,
        spec_id: &str,
        to: LifecycleStatus,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<SpecVersion> {
        let key = spec_key(spec_id)?;
        let mut state = self.state.write();
        let latest = state
            .history(&key)?
            .last()
            .cloned()
            .ok_or_else(|| DiffError::SpecNotFound(key.clone()))?;
        self.governance
            .transition(&entity_id(&key), latest.status, to, actor, reason)?;
        self.append_locked(&mut state, &key, &latest.text, to, latest.deadline)
    }

    fn append_locked(
        &self,
        state: &mut StoreState,
        key: &str,
        text: &str,
        status: LifecycleStatus,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<SpecVersion> {
        let version = {
            let history = state.specs.entry(key.to_string()).or_default();
            let (sequence, floor) = history
                .last()
                .map_or((1, None), |v| (v.sequence + 1, Some(v.timestamp)));
            // versions of one spec never go back in time
            let now = Utc::now();
            let timestamp = floor.map_or(now, |f| f.max(now));
            let version = SpecVersion::new(key, sequence, timestamp, text, status, deadline);
            history.push(version.clone());
            version
        };
        if let Err(e) = self.persist(state) {
            if let Some(history) = state.specs.get_mut(key) {
                history.pop();
                if history.is_empty() {
                    state.specs.remove(key);
                }
            }
            return Err(e);
        }
        tracing::info!(
            spec = key,
            sequence = version.sequence,
            version = %version.version_id,
            status = %version.status,
            "spec version tracked"
        );
        Ok(version)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        if let Some(path) = &self.storage_path {
            let file = StoreFileRef {
                format_version: FORMAT_VERSION,
                specs: state
                    .specs
                    .iter()
                    .map(|(key, history)| {
                        (key.as_str(), history.iter().map(SpecVersion::record).collect())
                    })
                    .collect(),
                acknowledgments: &state.acknowledgments,
                extra: &state.extra,
            };
            write_json_atomic(path, &file)?;
        }
        Ok(())
    }

    // --- History ---

    /// Versions of one spec, oldest first; with `limit`, only the newest
    /// `limit` of them.
    pub fn get_history(&self, spec_id: &str, limit: Option<usize>) -> Result<Vec<SpecVersion>> {
        let key = spec_key(spec_id)?;
        let state = self.state.read();
        let history = state.history(&key)?;
        let skip = limit.map_or(0, |n| history.len().saturating_sub(n));
        Ok(history[skip..].to_vec())
    }

    /// Newest version, or `None` for an untracked or invalid id.
    pub fn latest(&self, spec_id: &str) -> Option<SpecVersion> {
        let key = spec_key(spec_id).ok()?;
        self.state.read().specs.get(&key)?.last().cloned()
    }

    /// Ids of every tracked spec, sorted.
    pub fn spec_ids(&self) -> Vec<String> {
        self.state.read().specs.keys().cloned().collect()
    }

    /// Look up one version by id, `N` or `#N`.
    pub fn get_version(&self, spec_id: &str, marker: &str) -> Result<SpecVersion> {
        let key = spec_key(spec_id)?;
        let state = self.state.read();
        let history = state.history(&key)?;
        let idx = find_marker(history, &key, marker)?;
        Ok(history[idx].clone())
    }

    /// Statement-level changes between two versions.
    ///
    /// `to` defaults to the newest version and `from` to the one before
    /// `to`, or to the second-newest when `to` is the first version.
    /// Returns `None` for a spec with a single version.
    pub fn get_diff(
        &self,
        spec_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Option<SpecChange>> {
        let key = spec_key(spec_id)?;
        let state = self.state.read();
        let history = state.history(&key)?;
        if history.len() < 2 {
            return Ok(None);
        }
        let to_idx = match to {
            Some(m) => find_marker(history, &key, m)?,
            None => history.len() - 1,
        };
        let from_idx = match from {
            Some(m) => find_marker(history, &key, m)?,
            None if to_idx == 0 => history.len() - 2,
            None => to_idx - 1,
        };
        let (old, new) = (&history[from_idx], &history[to_idx]);
        Ok(Some(SpecChange {
            spec_id: key.clone(),
            from_version: old.version_id.clone(),
            to_version: new.version_id.clone(),
            changes: diff_texts(&old.text, &new.text, self.detector.as_ref()),
        }))
    }

    /// Statements in earlier versions contradicted by later versions.
    pub fn get_contradictions(&self, spec_id: &str) -> Result<Vec<Contradiction>> {
        let key = spec_key(spec_id)?;
        let state = self.state.read();
        let history = state.history(&key)?;
        let segmented: Vec<Vec<String>> = history.iter().map(|v| segments(&v.text)).collect();

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for (i, earlier) in history.iter().enumerate() {
            for (j, later) in history.iter().enumerate().skip(i + 1) {
                for a in &segmented[i] {
                    for b in &segmented[j] {
                        if seen.contains(&(a, b)) || !self.detector.conflicts(a, b) {
                            continue;
                        }
                        seen.insert((a, b));
                        found.push(Contradiction {
                            spec_id: key.clone(),
                            earlier_version: earlier.version_id.clone(),
                            later_version: later.version_id.clone(),
                            earlier_text: a.clone(),
                            later_text: b.clone(),
                        });
                    }
                }
            }
        }
        Ok(found)
    }

    // --- Staleness ---

    /// Unacknowledged staleness warnings for `spec_ids` (every tracked spec
    /// when empty). `cached` maps spec ids to the version the caller holds;
    /// a spec without an entry is checked against its latest version.
    pub fn check_staleness<S: AsRef<str>>(
        &self,
        spec_ids: &[S],
        cached: &HashMap<String, String>,
    ) -> Result<Vec<StalenessWarning>> {
        self.check_staleness_with(spec_ids, cached, false)
    }

    /// Like [`check_staleness`](Self::check_staleness), optionally keeping
    /// acknowledged warnings (flagged as such).
    pub fn check_staleness_with<S: AsRef<str>>(
        &self,
        spec_ids: &[S],
        cached: &HashMap<String, String>,
        include_acknowledged: bool,
    ) -> Result<Vec<StalenessWarning>> {
        let mut cached_by_key = HashMap::new();
        for (id, version) in cached {
            cached_by_key.insert(spec_key(id)?, version.as_str());
        }

        let state = self.state.read();
        let keys: Vec<String> = if spec_ids.is_empty() {
            state.specs.keys().cloned().collect()
        } else {
            spec_ids
                .iter()
                .map(|id| spec_key(id.as_ref()))
                .collect::<Result<_>>()?
        };

        let mut warnings = Vec::new();
        for key in keys {
            let history = state.history(&key)?;
            let Some(latest) = history.last() else {
                continue;
            };
            let reference = cached_by_key
                .get(&key)
                .map(|marker| history.iter().find(|v| v.matches_marker(marker)));
            let (cached_version, since) = match reference {
                None => (latest.version_id.clone(), latest.timestamp),
                Some(Some(v)) => (v.version_id.clone(), v.timestamp),
                Some(None) => (
                    cached_by_key[&key].to_string(),
                    latest.timestamp,
                ),
            };

            let newer_version = cached_version != latest.version_id;
            let drifted_nodes =
                self.modified_since(&key, since, self.options.staleness_depth)?;
            if !newer_version && drifted_nodes.is_empty() {
                continue;
            }
            let acknowledged = state
                .acknowledgments
                .iter()
                .any(|a| a.covers(&key, &cached_version, &latest.version_id));
            if acknowledged && !include_acknowledged {
                continue;
            }
            warnings.push(StalenessWarning {
                spec_id: key.clone(),
                cached_version,
                current_version: latest.version_id.clone(),
                newer_version,
                drifted_nodes,
                acknowledged,
            });
        }
        Ok(warnings)
    }

    /// Record that the caller has seen the staleness of `version`.
    ///
    /// Returns `false` if the same pairing was already acknowledged while
    /// the current latest version was latest.
    pub fn acknowledge_staleness(&self, spec_id: &str, version: &str) -> Result<bool> {
        let key = spec_key(spec_id)?;
        let mut state = self.state.write();
        let history = state.history(&key)?;
        let latest = history
            .last()
            .map(|v| v.version_id.clone())
            .ok_or_else(|| DiffError::SpecNotFound(key.clone()))?;
        let version = history
            .iter()
            .find(|v| v.matches_marker(version))
            .map_or_else(|| version.trim().to_string(), |v| v.version_id.clone());

        if state
            .acknowledgments
            .iter()
            .any(|a| a.covers(&key, &version, &latest))
        {
            return Ok(false);
        }
        state
            .acknowledgments
            .push(Acknowledgment::new(&key, &version, &latest));
        if let Err(e) = self.persist(&state) {
            state.acknowledgments.pop();
            return Err(e);
        }
        tracing::info!(spec = %key, version = %version, latest = %latest, "staleness acknowledged");
        Ok(true)
    }

    /// Code and test files within `depth` explicit hops of the spec that were
    /// modified after `since`.
    fn modified_since(&self, key: &str, since: DateTime<Utc>, depth: usize) -> Result<Vec<NodeId>> {
        Ok(self
            .linked_files(key, depth)?
            .into_iter()
            .filter(|n| n.modified_at.is_some_and(|m| m > since))
            .map(|n| n.id)
            .collect())
    }

    fn linked_files(&self, key: &str, depth: usize) -> Result<Vec<GraphNode>> {
        let Some(graph) = &self.graph else {
            return Ok(Vec::new());
        };
        let id = NodeId::spec(key)?;
        if !graph.contains(&id) {
            return Ok(Vec::new());
        }
        Ok(graph
            .reachable(&id, depth, false)?
            .into_iter()
            .filter(|n| n.kind.is_file())
            .collect())
    }

    // --- Drift ---

    /// Explicitly linked code and tests modified after their spec's latest
    /// version, beyond the grace period.
    pub fn get_drift_report(&self) -> Result<DriftReport> {
        let state = self.state.read();
        let mut items = Vec::new();
        for (key, history) in &state.specs {
            let Some(latest) = history.last() else {
                continue;
            };
            let cutoff = latest.timestamp + self.options.drift_grace;
            let drifted: Vec<GraphNode> = self
                .linked_files(key, 1)?
                .into_iter()
                .filter(|n| n.modified_at.is_some_and(|m| m > cutoff))
                .collect();
            if drifted.is_empty() {
                continue;
            }
            let diff_size = match history.len() {
                0 | 1 => 0,
                n => diff_texts(&history[n - 2].text, &latest.text, self.detector.as_ref()).len(),
            };
            for node in drifted {
                let Some(modified) = node.modified_at else {
                    continue;
                };
                let elapsed = modified - latest.timestamp;
                let severity = self.scorer.score(elapsed, diff_size);
                items.push(DriftItem {
                    spec_id: key.clone(),
                    node_id: node.id,
                    spec_version: latest.version_id.clone(),
                    spec_updated_at: latest.timestamp,
                    node_modified_at: modified,
                    elapsed_days: elapsed.num_seconds() as f64 / 86_400.0,
                    diff_size,
                    severity,
                    level: DriftSeverity::from_score(severity),
                });
            }
        }
        let report = DriftReport::new(items);
        tracing::debug!(items = report.items.len(), "drift report built");
        Ok(report)
    }

    // --- Deprecations ---

    /// Deprecated and obsolete specs, most urgent first.
    pub fn get_deprecations(&self, include_expired: bool) -> Result<Vec<Deprecation>> {
        self.get_deprecations_at(include_expired, Utc::now())
    }

    /// [`get_deprecations`](Self::get_deprecations) evaluated at `now`.
    pub fn get_deprecations_at(
        &self,
        include_expired: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Deprecation>> {
        let state = self.state.read();
        let mut list = Vec::new();
        for (key, history) in &state.specs {
            let Some(latest) = history.last() else {
                continue;
            };
            if !latest.status.is_deprecated_class() {
                continue;
            }
            let deprecated_at = history
                .iter()
                .rev()
                .take_while(|v| v.status.is_deprecated_class())
                .last()
                .map_or(latest.timestamp, |v| v.timestamp);
            let deadline = latest.deadline;
            let expired = deadline.is_some_and(|d| d <= now);
            if expired && !include_expired {
                continue;
            }
            let impacted = self.live_dependents(&state, key)?;
            list.push(Deprecation {
                spec_id: key.clone(),
                status: latest.status,
                deprecated_at,
                deadline,
                impacted,
                urgency: deprecation::urgency(deadline, impacted, now),
                expired,
            });
        }
        deprecation::rank(&mut list);
        Ok(list)
    }

    /// Nodes within the deprecation depth that are not themselves retired.
    fn live_dependents(&self, state: &StoreState, key: &str) -> Result<usize> {
        let Some(graph) = &self.graph else {
            return Ok(0);
        };
        let id = NodeId::spec(key)?;
        if !graph.contains(&id) {
            return Ok(0);
        }
        let reached = graph.reachable(&id, self.options.deprecation_depth, false)?;
        Ok(reached
            .iter()
            .filter(|n| match n.kind {
                NodeKind::Code | NodeKind::Test => true,
                NodeKind::Spec => {
                    let status = state.latest_status(n.id.local()).or_else(|| {
                        n.meta_str("status").and_then(|s| s.parse().ok())
                    });
                    !status.is_some_and(|s: LifecycleStatus| s.is_deprecated_class())
                }
            })
            .count())
    }
}

/// Store key for a spec id: the block id without any `spec:` prefix.
fn spec_key(spec_id: &str) -> Result<String> {
    Ok(NodeId::spec(spec_id.trim())?.local().to_string())
}

/// Audit entity id for a spec.
fn entity_id(key: &str) -> String {
    format!("{}{key}", NodeKind::Spec.prefix())
}

fn find_marker(history: &[SpecVersion], key: &str, marker: &str) -> Result<usize> {
    history
        .iter()
        .position(|v| v.matches_marker(marker))
        .ok_or_else(|| DiffError::VersionNotFound {
            spec_id: key.to_string(),
            marker: marker.to_string(),
        })
}

fn validate_file(file: StoreFile, path: &Path) -> std::result::Result<StoreState, StoreError> {
    check_format_version(path, file.format_version)?;
    let mut specs = BTreeMap::new();
    for (key, mut history) in file.specs {
        let canonical = spec_key(&key).map_err(|e| StoreError::corrupt(path, e))?;
        if canonical != key {
            return Err(StoreError::corrupt(path, format!("non-canonical spec id '{key}'")));
        }
        for (i, version) in history.iter_mut().enumerate() {
            version.spec_id = key.clone();
            if version.sequence != i as u64 + 1 {
                return Err(StoreError::corrupt(
                    path,
                    format!("{key}: expected sequence {}, found {}", i + 1, version.sequence),
                ));
            }
            if !version.id_is_consistent() {
                return Err(StoreError::corrupt(
                    path,
                    format!("{key}: version {} does not match its content", version.sequence),
                ));
            }
        }
        specs.insert(key, history);
    }
    Ok(StoreState {
        specs,
        acknowledgments: file.acknowledgments,
        extra: file.extra,
    })
}
