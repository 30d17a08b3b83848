//! Minimal state graph for multi-stage LLM flows
//!
//! A [`Graph`] is an ordered list of nodes that each take the state by value
//! and hand back the updated state. Graphs nest: a graph is itself a node,
//! and [`GraphBuilder::repeat_until`] loops a sub-graph until a predicate on
//! the state holds or an iteration cap is reached.

use crate::{ResearchError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};

/// A step of a graph
#[async_trait]
pub trait Node<S: Send + 'static>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: S) -> Result<S>;
}

/// Ordered sequence of nodes
pub struct Graph<S> {
    name: String,
    nodes: Vec<Arc<dyn Node<S>>>,
}

impl<S: Send + 'static> Graph<S> {
    pub fn builder(name: impl Into<String>) -> GraphBuilder<S> {
        GraphBuilder::new(name)
    }

    /// Run every node in order, each inside its own tracing span
    pub async fn execute(&self, mut state: S) -> Result<S> {
        for node in &self.nodes {
            let span = info_span!("node", graph = %self.name, node = node.name());
            state = node.run(state).instrument(span).await?;
        }
        Ok(state)
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }
}

#[async_trait]
impl<S: Send + 'static> Node<S> for Graph<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: S) -> Result<S> {
        self.execute(state).await
    }
}

type Predicate<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;

/// Runs `body` until `predicate` holds, at most `max_iterations` times
struct RepeatUntil<S> {
    name: String,
    body: Graph<S>,
    predicate: Predicate<S>,
    max_iterations: usize,
}

#[async_trait]
impl<S: Send + 'static> Node<S> for RepeatUntil<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, mut state: S) -> Result<S> {
        for iteration in 1..=self.max_iterations {
            state = self.body.execute(state).await?;
            if (self.predicate)(&state) {
                debug!(iteration, "Loop condition met");
                return Ok(state);
            }
        }
        warn!(max_iterations = self.max_iterations, "Loop stopped at iteration limit");
        Ok(state)
    }
}

pub struct GraphBuilder<S> {
    name: String,
    nodes: Vec<Arc<dyn Node<S>>>,
}

impl<S: Send + 'static> GraphBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn node(mut self, node: impl Node<S> + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Nest a sub-graph as a single step
    pub fn graph(mut self, graph: Graph<S>) -> Self {
        self.nodes.push(Arc::new(graph));
        self
    }

    /// Loop `body` until `predicate` holds; `max_iterations` is at least 1
    pub fn repeat_until<P>(mut self, body: Graph<S>, predicate: P, max_iterations: usize) -> Self
    where
        P: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.nodes.push(Arc::new(RepeatUntil {
            name: format!("repeat({})", body.name),
            body,
            predicate: Box::new(predicate),
            max_iterations: max_iterations.max(1),
        }));
        self
    }

    pub fn build(self) -> Result<Graph<S>> {
        if self.nodes.is_empty() {
            return Err(ResearchError::Graph(format!("graph '{}' has no nodes", self.name)));
        }
        Ok(Graph {
            name: self.name,
            nodes: self.nodes,
        })
    }
}
