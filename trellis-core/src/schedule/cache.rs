//! Schedule Cache
//!
//! Holds the last schedule built for a graph and hands it back until the
//! graph's structure changes. Rebuilding is the expensive part of
//! scheduling, and most solver iterations run against an unchanged graph.

use tracing::debug;

use crate::error::Result;
use crate::graph::{FactorGraph, GraphKey};

use super::{Schedule, Scheduler};

/// Version-checked cache in front of a [`Scheduler`].
#[derive(Debug)]
pub struct ScheduleCache<S> {
    scheduler: S,
    root: Option<GraphKey>,
    cached: Option<Schedule>,
    rebuilds: usize,
}

impl<S: Scheduler> ScheduleCache<S> {
    /// Create an empty cache.
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            root: None,
            cached: None,
            rebuilds: 0,
        }
    }

    /// Schedule for `root`, rebuilt if the graph changed or a different root
    /// is asked for.
    pub fn schedule(&mut self, graph: &FactorGraph, root: GraphKey) -> Result<&Schedule> {
        let fresh = match &self.cached {
            Some(schedule) => self.root == Some(root) && !schedule.is_stale(graph),
            None => false,
        };
        if !fresh {
            let schedule = self.scheduler.create_schedule(graph, root)?;
            self.rebuilds += 1;
            debug!(
                graph = %root,
                entries = schedule.len(),
                version = schedule.version(),
                "schedule rebuilt"
            );
            self.root = Some(root);
            self.cached = Some(schedule);
        }
        match &self.cached {
            Some(schedule) => Ok(schedule),
            None => unreachable!("schedule cached above"),
        }
    }

    /// Cached schedule without checking it, if any.
    pub fn cached(&self) -> Option<&Schedule> {
        self.cached.as_ref()
    }

    /// Forget the cached schedule.
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.root = None;
    }

    /// Number of times a schedule has been built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// The wrapped scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}
