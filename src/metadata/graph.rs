//! Transitive dependency closure over the Workshop "required items" graph.

use futures_util::stream::{self, StreamExt};
use log::debug;
use std::collections::HashSet;

use super::{MetadataResolver, NameResolution};
use crate::package::PackageRecord;
use crate::workshop::MetadataSource;

/// Walks the dependency graph of Workshop items.
pub struct DependencyGraphBuilder<'a, S: MetadataSource> {
    resolver: &'a MetadataResolver<S>,
}

/// An edge waiting on the worklist.
struct PendingEdge {
    display_name: String,
    external_id: String,
    /// Declared directly by the root item.
    direct: bool,
}

impl<'a, S: MetadataSource> DependencyGraphBuilder<'a, S> {
    pub fn new(resolver: &'a MetadataResolver<S>) -> Self {
        Self { resolver }
    }

    /// Every dependency name reachable from `external_id`, in pre-order of
    /// discovery, without duplicates.
    ///
    /// Each item is expanded at most once. An edge leading back to the root
    /// only counts when the root declares itself directly.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_closure(&self, external_id: &str) -> Vec<String> {
        let mut visited = HashSet::from([external_id.to_string()]);
        let mut seen = HashSet::new();
        let mut closure = Vec::new();

        let mut stack: Vec<PendingEdge> = self
            .resolver
            .resolve_direct_dependencies(external_id)
            .await
            .into_iter()
            .rev()
            .map(|edge| PendingEdge {
                display_name: edge.display_name,
                external_id: edge.external_id,
                direct: true,
            })
            .collect();

        while let Some(edge) = stack.pop() {
            let back_to_root = edge.external_id == external_id;
            if (edge.direct || !back_to_root) && seen.insert(edge.display_name.clone()) {
                closure.push(edge.display_name);
            }

            if !visited.insert(edge.external_id.clone()) {
                continue;
            }

            let next = self
                .resolver
                .resolve_direct_dependencies(&edge.external_id)
                .await;
            stack.extend(next.into_iter().rev().map(|e| PendingEdge {
                display_name: e.display_name,
                external_id: e.external_id,
                direct: false,
            }));
        }

        debug!(
            "Closure of {}: {} item(s) over {} node(s)",
            external_id,
            closure.len(),
            visited.len()
        );
        closure
    }

    /// Resolve display names and closures for every record.
    ///
    /// Up to `concurrency` packages are resolved at once; each resolution
    /// keeps its own visited set. Records already carrying a closure keep it.
    pub async fn resolve_all(&self, records: &mut [PackageRecord], concurrency: usize) {
        let ids: Vec<String> = records.iter().map(|r| r.external_id.clone()).collect();

        let results: Vec<(NameResolution, Vec<String>)> = stream::iter(ids)
            .map(|id| async move {
                let name = self.resolver.resolve_name(&id).await;
                let closure = self.resolve_closure(&id).await;
                (name, closure)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        for (record, (name, closure)) in records.iter_mut().zip(results) {
            record.display_name = name;
            record.set_dependencies(closure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workshop::{DependencyEdge, MockMetadataSource, WorkshopPage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory graph: id -> (title, [(name, id)]). Counts fetches per id.
    struct Graph {
        nodes: HashMap<String, (String, Vec<(String, String)>)>,
        fetches: Mutex<HashMap<String, usize>>,
    }

    impl Graph {
        fn new(nodes: &[(&str, &str, &[(&str, &str)])]) -> Arc<Self> {
            let nodes = nodes
                .iter()
                .map(|(id, title, deps)| {
                    (
                        id.to_string(),
                        (
                            title.to_string(),
                            deps.iter()
                                .map(|(n, i)| (n.to_string(), i.to_string()))
                                .collect(),
                        ),
                    )
                })
                .collect();
            Arc::new(Self {
                nodes,
                fetches: Mutex::new(HashMap::new()),
            })
        }
    }

    #[async_trait]
    impl MetadataSource for Arc<Graph> {
        async fn fetch(&self, external_id: &str) -> anyhow::Result<WorkshopPage> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(external_id.to_string())
                .or_default() += 1;
            let (title, deps) = self
                .nodes
                .get(external_id)
                .ok_or_else(|| anyhow::anyhow!("no such item {}", external_id))?;
            Ok(WorkshopPage {
                title: Some(title.clone()),
                required_items: deps
                    .iter()
                    .map(|(name, id)| DependencyEdge {
                        display_name: name.clone(),
                        external_id: id.clone(),
                    })
                    .collect(),
            })
        }
    }

    async fn closure_of(graph: &Arc<Graph>, root: &str) -> Vec<String> {
        let resolver = MetadataResolver::new(Arc::clone(graph), Duration::from_secs(5));
        DependencyGraphBuilder::new(&resolver)
            .resolve_closure(root)
            .await
    }

    #[tokio::test]
    async fn test_two_node_cycle_excludes_root() {
        let graph = Graph::new(&[("A", "A", &[("B", "B")]), ("B", "B", &[("A", "A")])]);

        assert_eq!(closure_of(&graph, "A").await, vec!["B"]);
    }

    #[tokio::test]
    async fn test_self_dependency_is_kept() {
        let graph = Graph::new(&[("A", "A", &[("A", "A")])]);

        assert_eq!(closure_of(&graph, "A").await, vec!["A"]);
    }

    #[tokio::test]
    async fn test_preorder_and_dedup_on_diamond() {
        // A -> B, C; B -> D; C -> D; D -> E
        let graph = Graph::new(&[
            ("A", "A", &[("B", "B"), ("C", "C")]),
            ("B", "B", &[("D", "D")]),
            ("C", "C", &[("D", "D")]),
            ("D", "D", &[("E", "E")]),
            ("E", "E", &[]),
        ]);

        assert_eq!(closure_of(&graph, "A").await, vec!["B", "D", "E", "C"]);
        // every node fetched exactly once
        let fetches = graph.fetches.lock().unwrap();
        assert!(fetches.values().all(|&n| n == 1), "{:?}", fetches);
        assert_eq!(fetches.len(), 5);
    }

    #[tokio::test]
    async fn test_long_cycle_terminates_without_duplicates() {
        // 0 -> 1 -> 2 -> ... -> 49 -> 0, plus every node pointing at 25
        let ids: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let edges: Vec<Vec<(String, String)>> = (0..50)
            .map(|i| {
                let next = ((i + 1) % 50).to_string();
                vec![
                    (format!("mod{}", next), next),
                    ("mod25".to_string(), "25".to_string()),
                ]
            })
            .collect();
        let graph = Arc::new(Graph {
            nodes: ids
                .iter()
                .zip(edges)
                .map(|(id, deps)| (id.clone(), (format!("mod{}", id), deps)))
                .collect(),
            fetches: Mutex::new(HashMap::new()),
        });

        let closure = closure_of(&graph, "0").await;

        let unique: HashSet<&String> = closure.iter().collect();
        assert_eq!(unique.len(), closure.len());
        assert_eq!(closure.len(), 49);
        assert!(!closure.contains(&"mod0".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_dependency_still_named() {
        // "Gone" has no page; its name comes from the parent's edge.
        let graph = Graph::new(&[("A", "A", &[("Gone", "404"), ("B", "B")]), ("B", "B", &[])]);

        assert_eq!(closure_of(&graph, "A").await, vec!["Gone", "B"]);
    }

    #[tokio::test]
    async fn test_unavailable_root_has_empty_closure() {
        let mut source = MockMetadataSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let resolver = MetadataResolver::new(source, Duration::from_secs(5));

        let closure = DependencyGraphBuilder::new(&resolver)
            .resolve_closure("1")
            .await;
        assert!(closure.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_record_order() {
        let graph = Graph::new(&[
            ("1", "One", &[("Two", "2")]),
            ("2", "Two", &[]),
            ("3", "Three", &[("One", "1")]),
        ]);
        let resolver = MetadataResolver::new(Arc::clone(&graph), Duration::from_secs(5));
        let mut records = vec![
            PackageRecord::new("1", "one"),
            PackageRecord::new("2", "two"),
            PackageRecord::new("3", "three"),
            PackageRecord::new("999", "ghost"),
        ];

        DependencyGraphBuilder::new(&resolver)
            .resolve_all(&mut records, 2)
            .await;

        assert_eq!(records[0].display_name.resolved(), Some("One"));
        assert_eq!(records[0].dependencies(), ["Two"]);
        assert!(records[1].dependencies().is_empty());
        assert_eq!(records[2].dependencies(), ["One", "Two"]);
        assert!(matches!(
            records[3].display_name,
            NameResolution::Degraded(_)
        ));
        // ids shared between packages are fetched once across the whole run
        let fetches = graph.fetches.lock().unwrap();
        assert!(fetches.values().all(|&n| n == 1), "{:?}", fetches);
    }
}
