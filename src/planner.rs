//! Diff planner: scanned documents + fingerprint map → ordered operations.
//!
//! Pure function of its inputs; the only CPU work is content hashing. The
//! resulting plan groups operations per collection, with inserts/updates
//! (path order) ahead of deletes (path order) so a rename never leaves a
//! transient gap in the vector store.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::fingerprint::compute_fingerprint;
use crate::models::{Document, FingerprintRecord, IndexOperation};
use crate::resolver::CollectionResolver;
use crate::scanner::ScanFilter;

/// A scanned document that produced no operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    pub path: String,
    pub reason: String,
}

/// Ordered operations for one collection.
#[derive(Debug, Clone)]
pub struct CollectionPlan {
    pub collection: String,
    pub ops: Vec<IndexOperation>,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// One entry per touched collection, sorted by collection name.
    pub collections: Vec<CollectionPlan>,
    /// Documents that matched no route ("skipped: unmapped").
    pub skipped: Vec<SkipEntry>,
    /// Documents whose fingerprint matched the stored record.
    pub unchanged: u64,
}

impl Plan {
    pub fn op_count(&self) -> usize {
        self.collections.iter().map(|c| c.ops.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.op_count() == 0
    }

    /// (inserts, updates, deletes) across all collections.
    pub fn counts(&self) -> (u64, u64, u64) {
        let mut counts = (0, 0, 0);
        for cp in &self.collections {
            for op in &cp.ops {
                match op {
                    IndexOperation::Insert { .. } => counts.0 += 1,
                    IndexOperation::Update { .. } => counts.1 += 1,
                    IndexOperation::Delete { .. } => counts.2 += 1,
                }
            }
        }
        counts
    }
}

/// Compute the operation plan for one run.
///
/// `full` forces an `Update` for every resolvable document with an existing
/// record, ignoring stored hashes (the delete pass is unaffected).
pub fn plan(
    documents: &[Document],
    resolver: &CollectionResolver,
    fingerprints: &HashMap<String, FingerprintRecord>,
    filter: &ScanFilter,
    full: bool,
) -> Plan {
    let mut upserts: BTreeMap<String, Vec<IndexOperation>> = BTreeMap::new();
    let mut deletes: BTreeMap<String, Vec<IndexOperation>> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut unchanged = 0u64;
    let mut seen: HashSet<&str> = HashSet::new();

    for doc in documents {
        seen.insert(doc.rel_path.as_str());

        let resolution = match resolver.resolve(&doc.rel_path) {
            Ok(resolution) => resolution,
            Err(_) => {
                skipped.push(SkipEntry {
                    path: doc.rel_path.clone(),
                    reason: "unmapped".to_string(),
                });
                // A record under a route that no longer exists is cleaned up
                // from its old collection.
                if let Some(record) = fingerprints.get(&doc.rel_path) {
                    deletes
                        .entry(record.collection.clone())
                        .or_default()
                        .push(IndexOperation::Delete {
                            path: doc.rel_path.clone(),
                            collection: record.collection.clone(),
                        });
                }
                continue;
            }
        };

        let hash = compute_fingerprint(&doc.content);
        match fingerprints.get(&doc.rel_path) {
            None => {
                upserts
                    .entry(resolution.collection.clone())
                    .or_default()
                    .push(IndexOperation::Insert {
                        doc: doc.clone(),
                        collection: resolution.collection,
                        hash,
                    });
            }
            Some(record) if record.collection != resolution.collection => {
                // Same path, different collection: remove from the old home,
                // insert into the new one.
                deletes
                    .entry(record.collection.clone())
                    .or_default()
                    .push(IndexOperation::Delete {
                        path: doc.rel_path.clone(),
                        collection: record.collection.clone(),
                    });
                upserts
                    .entry(resolution.collection.clone())
                    .or_default()
                    .push(IndexOperation::Insert {
                        doc: doc.clone(),
                        collection: resolution.collection,
                        hash,
                    });
            }
            Some(record) if full || record.hash != hash => {
                upserts
                    .entry(resolution.collection.clone())
                    .or_default()
                    .push(IndexOperation::Update {
                        doc: doc.clone(),
                        collection: resolution.collection,
                        hash,
                        previous: record.clone(),
                    });
            }
            Some(_) => unchanged += 1,
        }
    }

    // Records not seen in this scan, inside the filter scope, are deletions.
    for (path, record) in fingerprints {
        if seen.contains(path.as_str()) {
            continue;
        }
        if !in_scope(path, record, resolver, filter) {
            continue;
        }
        deletes
            .entry(record.collection.clone())
            .or_default()
            .push(IndexOperation::Delete {
                path: path.clone(),
                collection: record.collection.clone(),
            });
    }

    let mut collections: BTreeMap<String, Vec<IndexOperation>> = BTreeMap::new();
    for (collection, mut ops) in upserts {
        ops.sort_by(|a, b| a.path().cmp(b.path()));
        collections.entry(collection).or_default().extend(ops);
    }
    for (collection, mut ops) in deletes {
        ops.sort_by(|a, b| a.path().cmp(b.path()));
        collections.entry(collection).or_default().extend(ops);
    }

    skipped.sort_by(|a, b| a.path.cmp(&b.path));

    Plan {
        collections: collections
            .into_iter()
            .map(|(collection, ops)| CollectionPlan { collection, ops })
            .collect(),
        skipped,
        unchanged,
    }
}

/// Whether an unseen fingerprint record falls under the scanned scope and
/// should therefore be treated as a deletion.
fn in_scope(
    path: &str,
    record: &FingerprintRecord,
    resolver: &CollectionResolver,
    filter: &ScanFilter,
) -> bool {
    if !filter.paths.is_empty() {
        return filter.paths.iter().any(|p| p == path);
    }
    if let Some(dir) = &filter.directory {
        let under = path
            .strip_prefix(dir.as_str())
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false);
        if !under {
            return false;
        }
    }
    if let Some(doc_type) = filter.doc_type {
        return match resolver.resolve(path) {
            Ok(resolution) => {
                resolution.doc_type == doc_type && resolution.collection == record.collection
            }
            Err(_) => false,
        };
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_routes;
    use crate::models::DocType;

    fn doc(rel: &str, content: &str) -> Document {
        Document {
            rel_path: rel.to_string(),
            content: content.as_bytes().to_vec(),
            doc_type: None,
            modified_at: 0,
        }
    }

    fn record(rel: &str, content: &str, collection: &str) -> FingerprintRecord {
        FingerprintRecord {
            path: rel.to_string(),
            hash: compute_fingerprint(content.as_bytes()),
            collection: collection.to_string(),
            indexed_at: 1_700_000_000,
            chunk_count: 1,
        }
    }

    fn resolver() -> CollectionResolver {
        CollectionResolver::new(&default_routes()).unwrap()
    }

    #[test]
    fn fresh_root_plans_inserts_only() {
        let docs = vec![
            doc("docs/features/a.feature", "Feature: a"),
            doc("docs/features/b.feature", "Feature: b"),
            doc("docs/features/c.feature", "Feature: c"),
        ];
        let plan = plan(
            &docs,
            &resolver(),
            &HashMap::new(),
            &ScanFilter::default(),
            false,
        );
        assert_eq!(plan.counts(), (3, 0, 0));
        assert_eq!(plan.unchanged, 0);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn unchanged_content_plans_nothing() {
        let docs = vec![doc("docs/features/a.feature", "Feature: a")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn changed_content_plans_update() {
        let docs = vec![doc("docs/features/a.feature", "Feature: a v2")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        assert_eq!(plan.counts(), (0, 1, 0));
    }

    #[test]
    fn missing_file_plans_exactly_one_delete() {
        let docs = vec![doc("docs/features/a.feature", "Feature: a")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        fps.insert(
            "docs/features/gone.feature".to_string(),
            record("docs/features/gone.feature", "Feature: gone", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        assert_eq!(plan.counts(), (0, 0, 1));
        let ops: Vec<_> = plan.collections.iter().flat_map(|c| &c.ops).collect();
        assert_eq!(ops[0].path(), "docs/features/gone.feature");
    }

    #[test]
    fn unmapped_document_is_skipped_not_planned() {
        let docs = vec![doc("docs/notes/todo.md", "todo")];
        let plan = plan(
            &docs,
            &resolver(),
            &HashMap::new(),
            &ScanFilter::default(),
            false,
        );
        assert!(plan.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, "unmapped");
    }

    #[test]
    fn collection_change_plans_delete_then_insert() {
        let docs = vec![doc("docs/features/a.feature", "Feature: a")];
        let mut fps = HashMap::new();
        // Previously routed elsewhere (configuration change).
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "tech-specs"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        assert_eq!(plan.counts(), (1, 0, 1));

        let features = plan
            .collections
            .iter()
            .find(|c| c.collection == "features")
            .unwrap();
        assert!(matches!(features.ops[0], IndexOperation::Insert { .. }));
        let old = plan
            .collections
            .iter()
            .find(|c| c.collection == "tech-specs")
            .unwrap();
        assert!(old.ops[0].is_delete());
    }

    #[test]
    fn record_that_no_longer_resolves_is_deleted_and_skipped() {
        let docs = vec![doc("docs/notes/todo.md", "todo")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/notes/todo.md".to_string(),
            record("docs/notes/todo.md", "todo", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        assert_eq!(plan.counts(), (0, 0, 1));
        assert_eq!(plan.skipped.len(), 1);
    }

    #[test]
    fn deletes_ordered_after_upserts_within_collection() {
        let docs = vec![doc("docs/features/new.feature", "Feature: new")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/old.feature".to_string(),
            record("docs/features/old.feature", "Feature: old", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), false);
        let features = &plan.collections[0];
        assert_eq!(features.ops.len(), 2);
        assert!(matches!(features.ops[0], IndexOperation::Insert { .. }));
        assert!(features.ops[1].is_delete());
    }

    #[test]
    fn plan_is_deterministic_path_order() {
        let docs = vec![
            doc("docs/features/b.feature", "Feature: b"),
            doc("docs/features/a.feature", "Feature: a"),
        ];
        let plan = plan(
            &docs,
            &resolver(),
            &HashMap::new(),
            &ScanFilter::default(),
            false,
        );
        let paths: Vec<&str> = plan.collections[0].ops.iter().map(|o| o.path()).collect();
        assert_eq!(paths, vec!["docs/features/a.feature", "docs/features/b.feature"]);
    }

    #[test]
    fn directory_filter_scopes_deletes() {
        let docs: Vec<Document> = Vec::new();
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        fps.insert(
            "docs/ts4/x.ts4".to_string(),
            record("docs/ts4/x.ts4", "spec", "tech-specs"),
        );
        let filter = ScanFilter {
            directory: Some("docs/features".to_string()),
            ..Default::default()
        };
        let plan = plan(&docs, &resolver(), &fps, &filter, false);
        // Only the record under the filtered directory becomes a delete.
        assert_eq!(plan.counts(), (0, 0, 1));
        assert_eq!(plan.collections[0].collection, "features");
    }

    #[test]
    fn type_filter_scopes_deletes() {
        let docs: Vec<Document> = Vec::new();
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        fps.insert(
            "docs/ts4/x.ts4".to_string(),
            record("docs/ts4/x.ts4", "spec", "tech-specs"),
        );
        let filter = ScanFilter {
            doc_type: Some(DocType::Ts4),
            ..Default::default()
        };
        let plan = plan(&docs, &resolver(), &fps, &filter, false);
        assert_eq!(plan.counts(), (0, 0, 1));
        assert_eq!(plan.collections[0].collection, "tech-specs");
    }

    #[test]
    fn explicit_path_scope_ignores_other_records() {
        let docs: Vec<Document> = Vec::new();
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        fps.insert(
            "docs/features/b.feature".to_string(),
            record("docs/features/b.feature", "Feature: b", "features"),
        );
        let filter = ScanFilter {
            paths: vec!["docs/features/a.feature".to_string()],
            ..Default::default()
        };
        let plan = plan(&docs, &resolver(), &fps, &filter, false);
        // Naming a removed file explicitly deletes it; b is out of scope.
        assert_eq!(plan.counts(), (0, 0, 1));
        let ops: Vec<_> = plan.collections.iter().flat_map(|c| &c.ops).collect();
        assert_eq!(ops[0].path(), "docs/features/a.feature");
    }

    #[test]
    fn full_mode_updates_unchanged_documents() {
        let docs = vec![doc("docs/features/a.feature", "Feature: a")];
        let mut fps = HashMap::new();
        fps.insert(
            "docs/features/a.feature".to_string(),
            record("docs/features/a.feature", "Feature: a", "features"),
        );
        let plan = plan(&docs, &resolver(), &fps, &ScanFilter::default(), true);
        assert_eq!(plan.counts(), (0, 1, 0));
        assert_eq!(plan.unchanged, 0);
    }
}
