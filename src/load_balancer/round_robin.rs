//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{replica::Replica, LoadBalancer};

/// Round-robin selector.
/// Stores a rotation cursor that always stays within `0..len`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor value (the index the next selection will return).
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Read the cursor and advance it modulo `len` in a single atomic step.
    fn advance(&self, len: usize) -> usize {
        // The closure never returns None, so fetch_update cannot fail.
        match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
        {
            Ok(prev) | Err(prev) => prev % len,
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn next_replica(&self, replicas: &[Arc<Replica>]) -> Option<Arc<Replica>> {
        if replicas.is_empty() {
            return None;
        }

        let index = self.advance(replicas.len());
        Some(replicas[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    fn replicas(n: usize) -> Vec<Arc<Replica>> {
        (0..n)
            .map(|i| Arc::new(Replica::new(format!("127.0.0.1:{}", 9000 + i)).unwrap()))
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = replicas(2);

        let s1 = lb.next_replica(&backends).unwrap();
        assert_eq!(s1.address, backends[0].address);

        let s2 = lb.next_replica(&backends).unwrap();
        assert_eq!(s2.address, backends[1].address);

        let s3 = lb.next_replica(&backends).unwrap();
        assert_eq!(s3.address, backends[0].address);
        assert_eq!(lb.cursor(), 1);
    }

    #[test]
    fn test_empty_returns_none() {
        let lb = RoundRobin::new();
        assert!(lb.next_replica(&[]).is_none());
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_concurrent_selection_is_fair() {
        let lb = Arc::new(RoundRobin::new());
        let backends = Arc::new(replicas(3));
        let threads = 8;
        let per_thread = 125; // 1000 selections total

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lb = lb.clone();
                let backends = backends.clone();
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| lb.next_replica(&backends).unwrap().address.clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for addr in handle.join().unwrap() {
                *counts.entry(addr).or_default() += 1;
            }
        }

        let total: usize = threads * per_thread;
        let (floor, ceil) = (total / 3, total.div_ceil(3));
        assert_eq!(counts.len(), 3);
        for count in counts.values() {
            assert!(*count == floor || *count == ceil, "unfair count {}", count);
        }
        assert_eq!(lb.cursor(), total % 3);
    }
}
