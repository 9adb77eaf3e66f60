//! Upstream group management.
//!
//! # Responsibilities
//! - Own the fixed replica list and rotation cursor of each group
//! - Hand out the next replica for a group under concurrent access
//! - Report per-group cursor and per-replica selection counts

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::config::UpstreamConfig;
use crate::load_balancer::{replica::Replica, round_robin::RoundRobin, LoadBalancer, SelectorError};
use crate::observability::metrics;

/// One backend service family: a named, non-empty replica pool.
#[derive(Debug)]
pub struct UpstreamGroup {
    name: String,
    replicas: Vec<Arc<Replica>>,
    balancer: RoundRobin,
}

/// Snapshot of a group's rotation state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupStats {
    pub cursor: usize,
    pub replicas: BTreeMap<String, u64>,
}

impl UpstreamGroup {
    /// Build a group, failing fast when it has no replicas or a bad address.
    pub fn new<I, S>(name: impl Into<String>, addresses: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let replicas = addresses
            .into_iter()
            .map(|addr| Replica::new(addr).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        if replicas.is_empty() {
            return Err(SelectorError::NoReplicas(name));
        }

        Ok(Self {
            name,
            replicas,
            balancer: RoundRobin::new(),
        })
    }

    /// Select the replica at the cursor and advance the cursor.
    pub fn next_replica(&self) -> Arc<Replica> {
        // Construction guarantees a non-empty list.
        let replica = self
            .balancer
            .next_replica(&self.replicas)
            .unwrap_or_else(|| self.replicas[0].clone());

        replica.record_selection();
        metrics::record_replica_selection(&self.name, &replica.address);
        replica
    }

    pub fn stats(&self) -> GroupStats {
        GroupStats {
            cursor: self.balancer.cursor(),
            replicas: self
                .replicas
                .iter()
                .map(|r| (r.address.clone(), r.selections()))
                .collect(),
        }
    }
}

/// Registry of all upstream groups, keyed by group name.
#[derive(Debug, Default)]
pub struct UpstreamRegistry {
    groups: HashMap<String, Arc<UpstreamGroup>>,
}

impl UpstreamRegistry {
    /// Build every configured group. Any invalid group aborts construction.
    pub fn from_config(configs: &[UpstreamConfig]) -> Result<Self, SelectorError> {
        let mut groups = HashMap::new();
        for config in configs {
            let group = UpstreamGroup::new(config.name.clone(), config.replicas.iter().cloned())?;
            tracing::info!(
                group = %config.name,
                replicas = ?config.replicas,
                "Upstream group registered"
            );
            groups.insert(config.name.clone(), Arc::new(group));
        }
        Ok(Self { groups })
    }

    /// Select the next replica of the named group.
    pub fn next_replica(&self, group: &str) -> Result<Arc<Replica>, SelectorError> {
        self.groups
            .get(group)
            .map(|g| g.next_replica())
            .ok_or_else(|| SelectorError::UnknownGroup(group.to_string()))
    }

    /// Stats for every group, ordered by name.
    pub fn stats(&self) -> BTreeMap<String, GroupStats> {
        self.groups
            .iter()
            .map(|(name, group)| (name.clone(), group.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_replicas_fails_at_construction() {
        let err = UpstreamGroup::new("empty", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, SelectorError::NoReplicas(ref name) if name == "empty"));
    }

    #[test]
    fn test_six_selections_over_three_replicas() {
        let group = UpstreamGroup::new("marketplace", ["a:1", "b:2", "c:3"]).unwrap();

        let picked: Vec<String> = (0..6).map(|_| group.next_replica().address.clone()).collect();
        assert_eq!(picked, vec!["a:1", "b:2", "c:3", "a:1", "b:2", "c:3"]);

        let stats = group.stats();
        assert_eq!(stats.cursor, 0);
        assert!(stats.replicas.values().all(|&count| count == 2));
    }

    #[test]
    fn test_registry_unknown_group() {
        let registry = UpstreamRegistry::from_config(&[UpstreamConfig {
            name: "discourse".into(),
            path_prefix: "/discourse".into(),
            replicas: vec!["127.0.0.1:4001".into()],
            cacheable: true,
        }])
        .unwrap();

        assert_eq!(registry.next_replica("discourse").unwrap().address, "127.0.0.1:4001");
        assert!(matches!(
            registry.next_replica("marketplace"),
            Err(SelectorError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_registry_rejects_bad_address() {
        let result = UpstreamRegistry::from_config(&[UpstreamConfig {
            name: "discourse".into(),
            path_prefix: "/discourse".into(),
            replicas: vec!["no-port".into()],
            cacheable: false,
        }]);
        assert!(matches!(result, Err(SelectorError::InvalidAddress(_))));
    }
}
