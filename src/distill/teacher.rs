// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! The teacher query seam and the fan-out over it.
//!
//! Teachers are queried concurrently and independently, each on its own
//! thread. Any subset may fail or run past the deadline; those replicas are
//! logged and left out, and the session carries on with whoever answered.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::crdt::tag::ReplicaId;
use crate::distill::artifact::TeacherReply;

/// Free-form key/value context passed along with a query.
pub type QueryContext = BTreeMap<String, String>;

/// Why a teacher produced no reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeacherError {
    #[error("teacher timed out")]
    Timeout,

    #[error("teacher unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// A source of teacher replies, e.g. one model behind an HTTP API.
pub trait TeacherService: Send + Sync {
    /// A stable name, used as the replica id.
    fn name(&self) -> &str;

    /// Answer a query.
    fn query(&self, query: &str, context: &QueryContext) -> Result<TeacherReply, TeacherError>;
}

/// A reply that made it back in time.
#[derive(Clone, Debug, PartialEq)]
pub struct Answered {
    pub replica: ReplicaId,
    pub reply: TeacherReply,
    pub elapsed: Duration,
}

type Outcome = (usize, Result<TeacherReply, TeacherError>, Duration);

/// Query every service concurrently and wait at most `deadline`.
///
/// Replies come back in service order. Failed services are dropped, and so
/// are services that have not answered when the deadline passes. A call
/// that never returns is abandoned on its thread rather than waited for.
pub fn query_all(
    services: &[Arc<dyn TeacherService>],
    query: &str,
    context: &QueryContext,
    deadline: Option<Duration>,
) -> Vec<Answered> {
    let replicas = distinct_replica_ids(services.iter().map(|s| s.name()));
    let started = Instant::now();
    let (sender, receiver) = mpsc::channel::<Outcome>();

    let mut running = vec![false; services.len()];
    for (index, service) in services.iter().enumerate() {
        let service = Arc::clone(service);
        let sender = sender.clone();
        let query = query.to_string();
        let context = context.clone();
        let spawned = thread::Builder::new()
            .name(format!("teacher-{index}"))
            .spawn(move || {
                let begin = Instant::now();
                let result = service.query(&query, &context);
                // The receiver is gone once the deadline has passed.
                let _ = sender.send((index, result, begin.elapsed()));
            });
        match spawned {
            Ok(_) => running[index] = true,
            Err(error) => {
                tracing::warn!(replica = %replicas[index], %error, "could not start teacher query, dropping replica");
            }
        }
    }
    drop(sender);

    let mut outcomes: Vec<Option<(Result<TeacherReply, TeacherError>, Duration)>> =
        (0..services.len()).map(|_| None).collect();
    loop {
        let received = match deadline {
            Some(limit) => match limit.checked_sub(started.elapsed()) {
                Some(remaining) => receiver.recv_timeout(remaining).ok(),
                None => None,
            },
            None => receiver.recv().ok(),
        };
        let Some((index, result, elapsed)) = received else {
            break;
        };
        outcomes[index] = Some((result, elapsed));
    }

    let mut answered = Vec::with_capacity(services.len());
    for ((replica, outcome), running) in replicas.into_iter().zip(outcomes).zip(running) {
        match outcome {
            Some((Ok(reply), elapsed)) => answered.push(Answered { replica, reply, elapsed }),
            Some((Err(error), _)) => {
                tracing::warn!(%replica, %error, "teacher query failed, dropping replica");
            }
            None if running => {
                tracing::warn!(%replica, ?deadline, "teacher missed the deadline, dropping replica");
            }
            None => {}
        }
    }

    tracing::info!(
        queried = services.len(),
        answered = answered.len(),
        elapsed = ?started.elapsed(),
        "teacher fan-out finished"
    );
    return answered;
}

/// Turn service names into distinct replica ids.
///
/// The first use of a name keeps it as is. Later uses get a `#n` suffix,
/// with `n` raised until the id is not already taken, so a service that is
/// literally named `m#2` still gets an id of its own.
pub fn distinct_replica_ids<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ReplicaId> {
    let mut taken: FxHashSet<String> = FxHashSet::default();
    let mut suffix: FxHashMap<&str, usize> = FxHashMap::default();
    let mut ids = Vec::new();
    for name in names {
        let mut id = name.to_string();
        while taken.contains(&id) {
            let n = suffix.entry(name).or_insert(1);
            *n += 1;
            id = format!("{name}#{n}");
        }
        taken.insert(id.clone());
        ids.push(ReplicaId::from(id));
    }
    return ids;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        result: Result<&'static str, TeacherError>,
        delay: Duration,
    }

    impl TeacherService for Fixed {
        fn name(&self) -> &str {
            return self.name;
        }

        fn query(&self, _query: &str, _context: &QueryContext) -> Result<TeacherReply, TeacherError> {
            std::thread::sleep(self.delay);
            return self.result.clone().map(|content| TeacherReply {
                model: self.name.to_string(),
                content: content.to_string(),
            });
        }
    }

    fn service(name: &'static str, result: Result<&'static str, TeacherError>) -> Arc<dyn TeacherService> {
        return Arc::new(Fixed { name, result, delay: Duration::ZERO });
    }

    #[test]
    fn failures_are_dropped() {
        let services = vec![
            service("a", Ok("one")),
            service("b", Err(TeacherError::Timeout)),
            service("c", Err(TeacherError::Unavailable { reason: "503".into() })),
            service("d", Ok("four")),
        ];
        let answered = query_all(&services, "q", &QueryContext::new(), None);
        let names: Vec<&str> = answered.iter().map(|a| a.replica.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(answered[1].reply.content, "four");
    }

    #[test]
    fn slow_replies_miss_the_deadline() {
        let services: Vec<Arc<dyn TeacherService>> = vec![
            service("fast", Ok("quick")),
            Arc::new(Fixed {
                name: "slow",
                result: Ok("late"),
                delay: Duration::from_millis(200),
            }),
        ];
        let answered = query_all(&services, "q", &QueryContext::new(), Some(Duration::from_millis(100)));
        assert_eq!(answered.len(), 1);
        assert_eq!(answered[0].replica.as_str(), "fast");
    }

    #[test]
    fn no_services_no_replies() {
        let services: Vec<Arc<dyn TeacherService>> = Vec::new();
        assert!(query_all(&services, "q", &QueryContext::new(), None).is_empty());
    }

    #[test]
    fn hanging_teacher_does_not_hold_up_the_fan_out() {
        let services: Vec<Arc<dyn TeacherService>> = vec![
            service("fast", Ok("quick")),
            Arc::new(Fixed {
                name: "hung",
                result: Ok("never seen"),
                delay: Duration::from_secs(3),
            }),
        ];
        let start = Instant::now();
        let answered = query_all(&services, "q", &QueryContext::new(), Some(Duration::from_millis(100)));
        assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());
        assert_eq!(answered.len(), 1);
        assert_eq!(answered[0].replica.as_str(), "fast");
    }

    #[test]
    fn without_deadline_every_reply_is_awaited() {
        let services: Vec<Arc<dyn TeacherService>> = vec![
            Arc::new(Fixed {
                name: "slow",
                result: Ok("late"),
                delay: Duration::from_millis(50),
            }),
            service("fast", Ok("quick")),
        ];
        let answered = query_all(&services, "q", &QueryContext::new(), None);
        let names: Vec<&str> = answered.iter().map(|a| a.replica.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[test]
    fn duplicate_names_get_distinct_replicas() {
        let ids = distinct_replica_ids(["m", "m", "n", "m"]);
        let ids: Vec<&str> = ids.iter().map(|r| r.as_str()).collect();
        assert_eq!(ids, vec!["m", "m#2", "n", "m#3"]);
    }

    #[test]
    fn suffixes_skip_names_already_taken() {
        let ids = distinct_replica_ids(["m", "m", "m#2"]);
        let ids: Vec<&str> = ids.iter().map(|r| r.as_str()).collect();
        assert_eq!(ids, vec!["m", "m#2", "m#2#2"]);

        let ids = distinct_replica_ids(["m#2", "m", "m"]);
        let ids: Vec<&str> = ids.iter().map(|r| r.as_str()).collect();
        assert_eq!(ids, vec!["m#2", "m", "m#3"]);
    }
}
