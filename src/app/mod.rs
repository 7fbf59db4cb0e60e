//! Example program framework
//!
//! Every example runs the same script against a graph opened from a
//! properties file:
//!
//! ```text
//! open -> schema -> create -> read -> update -> read -> delete -> read -> close
//! ```
//!
//! A dataset implements [`GraphApp`]; [`AppRunner`] drives the script, wraps
//! each step in its transaction and logs (never propagates) step failures.

pub mod follow;
pub mod gods;
pub mod social;

pub use follow::FollowApp;
pub use gods::GodsApp;
pub use social::SocialApp;

use crate::graph::{EdgeId, GraphError, GraphResult, PropertyMap, PropertyValue, VertexId};
use crate::schema::Management;
use crate::traversal::{Graph, GraphFactory, GraphTraversalSource};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// One example dataset
pub trait GraphApp {
    /// Program name, used in logs
    fn name(&self) -> &str;

    /// Declare property keys, vertex labels, edge labels and indexes
    fn define_schema(&self, mgmt: &mut Management) -> GraphResult<()>;

    /// Whether the sample data was created before
    fn elements_exist(&self, g: &mut GraphTraversalSource) -> GraphResult<bool> {
        g.v().has_next()
    }

    fn create_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()>;

    fn read_elements(&self, g: &mut GraphTraversalSource) -> GraphResult<()>;

    fn update_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()>;

    fn delete_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()>;
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// Nothing to do, e.g. the schema already existed
    Skipped,
    /// The step failed and its transaction was rolled back
    Failed,
}

/// Drives a [`GraphApp`] through the example script
pub struct AppRunner<A> {
    app: A,
    config_path: PathBuf,
    graph: Option<Graph>,
    g: Option<GraphTraversalSource>,
}

impl<A: GraphApp> AppRunner<A> {
    pub fn new(app: A, config_path: impl AsRef<Path>) -> Self {
        AppRunner {
            app,
            config_path: config_path.as_ref().to_path_buf(),
            graph: None,
            g: None,
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn traversal(&mut self) -> Option<&mut GraphTraversalSource> {
        self.g.as_mut()
    }

    /// Full script: open, create, read/update/delete with reads in between, close
    pub fn run(&mut self) -> GraphResult<()> {
        self.open_graph()?;
        self.create_schema();
        self.create_elements();
        self.read_elements();
        self.update_elements();
        self.read_elements();
        self.delete_elements();
        self.read_elements();
        self.close_graph()
    }

    /// Open the graph and drop it
    pub fn run_drop(&mut self) -> GraphResult<()> {
        self.open_graph()?;
        self.drop_graph()
    }

    /// Open the graph described by the properties file
    pub fn open_graph(&mut self) -> GraphResult<()> {
        info!("{}", banner("Opening graph"));
        let graph = GraphFactory::open_file(&self.config_path)?;
        self.g = Some(graph.traversal());
        self.graph = Some(graph);
        Ok(())
    }

    /// Declare the schema unless any relation type already exists
    pub fn create_schema(&mut self) -> StepOutcome {
        let Some(graph) = self.graph.as_ref() else {
            warn!("Graph is not open, skipping schema creation");
            return StepOutcome::Skipped;
        };
        let mut mgmt = match graph.open_management() {
            Ok(mgmt) => mgmt,
            Err(e) => {
                error!("Cannot open schema management: {}", e);
                return StepOutcome::Failed;
            }
        };
        // naive check: any relation type means the schema was created before
        if mgmt.has_relation_types() {
            mgmt.rollback();
            return StepOutcome::Skipped;
        }

        info!("{}", banner("Creating schema"));
        match self.app.define_schema(&mut mgmt).and_then(|_| mgmt.commit()) {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                error!("{}: schema creation failed: {}", self.app.name(), e);
                mgmt.rollback();
                StepOutcome::Failed
            }
        }
    }

    /// Create the sample data unless the dataset's existence check finds it
    pub fn create_elements(&mut self) -> StepOutcome {
        self.transactional("Creating elements", |app, g| {
            if app.elements_exist(g)? {
                info!("{}: sample data already present", app.name());
                return Ok(StepOutcome::Skipped);
            }
            app.create_elements(g)?;
            Ok(StepOutcome::Completed)
        })
    }

    /// Run the read traversals; the transaction is always rolled back
    pub fn read_elements(&mut self) -> StepOutcome {
        let Some(g) = self.g.as_mut() else {
            return StepOutcome::Skipped;
        };
        info!("{}", banner("Reading elements"));
        let outcome = match self.app.read_elements(g) {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                error!("{}: reading elements failed: {}", self.app.name(), e);
                StepOutcome::Failed
            }
        };
        g.tx().rollback();
        outcome
    }

    pub fn update_elements(&mut self) -> StepOutcome {
        self.transactional("Updating elements", |app, g| {
            app.update_elements(g)?;
            Ok(StepOutcome::Completed)
        })
    }

    pub fn delete_elements(&mut self) -> StepOutcome {
        self.transactional("Deleting elements", |app, g| {
            app.delete_elements(g)?;
            Ok(StepOutcome::Completed)
        })
    }

    /// Close the traversal source and the graph, releasing both
    pub fn close_graph(&mut self) -> GraphResult<()> {
        info!("{}", banner("Closing graph"));
        let closed_g = match self.g.take() {
            Some(mut g) => g.close(),
            None => Ok(()),
        };
        let closed_graph = match self.graph.take() {
            Some(graph) => graph.close(),
            None => Ok(()),
        };
        closed_g.and(closed_graph)
    }

    /// Delete the graph's data and storage
    pub fn drop_graph(&mut self) -> GraphResult<()> {
        self.g = None;
        match self.graph.take() {
            Some(graph) => {
                info!("{}", banner("Dropping graph"));
                GraphFactory::drop(&graph)
            }
            None => Ok(()),
        }
    }

    /// Run a mutating step: commit when it completes, roll back otherwise
    fn transactional<F>(&mut self, title: &str, f: F) -> StepOutcome
    where
        F: FnOnce(&mut A, &mut GraphTraversalSource) -> GraphResult<StepOutcome>,
    {
        let Some(g) = self.g.as_mut() else {
            return StepOutcome::Skipped;
        };
        info!("{}", banner(title));
        let result = f(&mut self.app, &mut *g).and_then(|outcome| {
            if outcome == StepOutcome::Completed {
                g.tx().commit()?;
            }
            Ok(outcome)
        });
        // no-op after a commit
        g.tx().rollback();
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: {} failed: {}", self.app.name(), title.to_lowercase(), e);
                StepOutcome::Failed
            }
        }
    }
}

/// Step banner in the `==== Title ====` style
pub fn banner(title: &str) -> String {
    let bar = "=".repeat(28);
    format!("{} {} {}", bar, title, bar)
}

/// Render a property map as a JSON object
pub fn describe(properties: &PropertyMap) -> String {
    let map: serde_json::Map<String, serde_json::Value> = properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A calendar date as a `DateTime` value at midnight UTC
pub fn date(year: i32, month: u32, day: u32) -> GraphResult<PropertyValue> {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .map(PropertyValue::from)
        .ok_or_else(|| GraphError::InvalidValue(format!("{:04}-{:02}-{:02}", year, month, day)))
}

pub(crate) fn add_vertex(
    g: &mut GraphTraversalSource,
    label: &str,
    properties: &[(&str, PropertyValue)],
) -> GraphResult<VertexId> {
    let mut t = g.add_v(label);
    for (key, value) in properties {
        t = t.property(key, value.clone());
    }
    Ok(t.next_vertex()?.id)
}

pub(crate) fn add_edge(
    g: &mut GraphTraversalSource,
    label: &str,
    from: VertexId,
    to: VertexId,
    properties: &[(&str, PropertyValue)],
) -> GraphResult<EdgeId> {
    let mut t = g.add_e(label, from, to);
    for (key, value) in properties {
        t = t.property(key, value.clone());
    }
    Ok(t.next_edge()?.id)
}

/// Name of a vertex, or its id when it has none
pub(crate) fn name_of(g: &mut GraphTraversalSource, id: VertexId) -> GraphResult<String> {
    Ok(g.v_ids([id])
        .values(&["name"])
        .try_next()?
        .and_then(|t| t.as_value().map(|v| v.to_string()))
        .unwrap_or_else(|| id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner() {
        assert_eq!(
            banner("Creating schema"),
            "============================ Creating schema ============================"
        );
    }

    #[test]
    fn test_describe() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "jupiter".into());
        props.insert("age".to_string(), 5000i64.into());
        // serde_json maps are sorted by key
        assert_eq!(describe(&props), r#"{"age":5000,"name":"jupiter"}"#);
    }

    #[test]
    fn test_date() {
        assert_eq!(date(1970, 1, 2).unwrap(), PropertyValue::DateTime(86_400_000));
        assert!(matches!(date(2018, 2, 30), Err(GraphError::InvalidValue(_))));
    }
}
