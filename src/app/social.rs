//! A fixed five-person social graph with dated `following` edges

use super::{add_edge, add_vertex, date, describe, name_of, now_millis, GraphApp};
use crate::graph::{GraphResult, VertexId};
use crate::schema::{DataType, ElementKind, Management, Multiplicity};
use crate::traversal::{GraphTraversalSource, P};
use std::collections::HashMap;
use tracing::info;

/// (name, age)
const PEOPLE: [(&str, i64); 5] = [
    ("Alice", 34),
    ("Bob", 29),
    ("Carol", 41),
    ("Dave", 25),
    ("Eve", 38),
];

/// (follower, followed, year, month, day)
const FOLLOWS: [(&str, &str, i32, u32, u32); 8] = [
    ("Alice", "Bob", 2012, 3, 14),
    ("Bob", "Alice", 2013, 7, 2),
    ("Bob", "Carol", 2014, 1, 30),
    ("Bob", "Dave", 2015, 6, 21),
    ("Carol", "Bob", 2016, 11, 20),
    ("Dave", "Bob", 2017, 5, 9),
    ("Eve", "Alice", 2018, 8, 15),
    ("Dave", "Eve", 2019, 2, 1),
];

#[derive(Debug, Default)]
pub struct SocialApp;

impl SocialApp {
    pub fn new() -> Self {
        SocialApp
    }
}

impl GraphApp for SocialApp {
    fn name(&self) -> &str {
        "social-follow"
    }

    fn define_schema(&self, mgmt: &mut Management) -> GraphResult<()> {
        mgmt.make_property_key("name").data_type(DataType::String).make()?;
        mgmt.make_property_key("age").data_type(DataType::Integer).make()?;
        mgmt.make_property_key("date").data_type(DataType::DateTime).make()?;
        mgmt.make_property_key("timestamp").data_type(DataType::Integer).make()?;
        mgmt.make_vertex_label("person").make()?;
        mgmt.make_edge_label("following")
            .multiplicity(Multiplicity::Simple)
            .signature(&["date"])
            .make()?;
        mgmt.build_index("personByName", ElementKind::Vertex)
            .add_key("name")
            .unique()
            .build_composite_index()?;
        Ok(())
    }

    fn elements_exist(&self, g: &mut GraphTraversalSource) -> GraphResult<bool> {
        g.v().has("name", "Bob").has_next()
    }

    fn create_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let mut ids: HashMap<&str, VertexId> = HashMap::new();
        for (name, age) in PEOPLE {
            let id = add_vertex(g, "person", &[("name", name.into()), ("age", age.into())])?;
            ids.insert(name, id);
        }
        for (follower, followed, year, month, day) in FOLLOWS {
            if let (Some(&from), Some(&to)) = (ids.get(follower), ids.get(followed)) {
                add_edge(g, "following", from, to, &[("date", date(year, month, day)?)])?;
            }
        }
        info!("Created {} people and {} follows", PEOPLE.len(), FOLLOWS.len());
        Ok(())
    }

    fn read_elements(&self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let Some(bob) = g.v().has("name", "Bob").to_vertices()?.into_iter().next() else {
            info!("Bob is not in the graph");
            return Ok(());
        };
        info!("Bob: {}", describe(&bob.properties));

        let follows = g.v_ids([bob.id]).out_e(&["following"]).to_edges()?;
        for edge in &follows {
            let since = edge.property("date").map(|d| d.to_string()).unwrap_or_default();
            info!("Bob follows {} since {}", name_of(g, edge.in_v)?, since);
        }

        let followers = g.v_ids([bob.id]).in_(&["following"]).values(&["name"]).to_values()?;
        let followers: Vec<String> = followers.iter().map(|v| v.to_string()).collect();
        info!("Bob's followers ({}): {}", followers.len(), followers.join(", "));

        let recent = g
            .e()
            .has_label(&["following"])
            .has_pred("date", P::gte(date(2015, 1, 1)?))
            .to_edges()?;
        for edge in &recent {
            let since = edge.property("date").map(|d| d.to_string()).unwrap_or_default();
            info!(
                "{} -> {} since {}",
                name_of(g, edge.out_v)?,
                name_of(g, edge.in_v)?,
                since
            );
        }
        Ok(())
    }

    fn update_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let ts = now_millis();
        let updated = g.v().has("name", "Bob").property("timestamp", ts).count()?;
        info!("Set timestamp={} on {} vertex named Bob", ts, updated);
        Ok(())
    }

    fn delete_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        info!("Deleting Dave");
        g.v().has("name", "Dave").drop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::{GraphError, PropertyValue};
    use crate::traversal::{Graph, GraphFactory};

    fn seeded() -> (Graph, GraphTraversalSource) {
        let graph = GraphFactory::open(&GraphConfig::in_memory()).unwrap();
        let mut mgmt = graph.open_management().unwrap();
        SocialApp.define_schema(&mut mgmt).unwrap();
        mgmt.commit().unwrap();
        let mut g = graph.traversal();
        SocialApp.create_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        (graph, g)
    }

    fn names(g: &mut GraphTraversalSource, ids: Vec<VertexId>) -> Vec<String> {
        ids.into_iter().map(|id| name_of(g, id).unwrap()).collect()
    }

    #[test]
    fn test_follows_since_2015() {
        let (_graph, mut g) = seeded();
        let recent = g
            .e()
            .has_label(&["following"])
            .has_pred("date", P::gte(date(2015, 1, 1).unwrap()))
            .to_edges()
            .unwrap();
        assert_eq!(recent.len(), 5);
        let followers: Vec<VertexId> = recent.iter().map(|e| e.out_v).collect();
        assert_eq!(names(&mut g, followers), vec!["Bob", "Carol", "Dave", "Eve", "Dave"]);
    }

    #[test]
    fn test_bob_follows_and_followers() {
        let (_graph, mut g) = seeded();
        let follows: Vec<VertexId> = g
            .v()
            .has("name", "Bob")
            .out(&["following"])
            .to_vertices()
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(names(&mut g, follows), vec!["Alice", "Carol", "Dave"]);
        assert_eq!(g.v().has("name", "Bob").in_(&["following"]).count().unwrap(), 3);

        let edge = g.v().has("name", "Alice").out_e(&["following"]).next_edge().unwrap();
        assert_eq!(edge.property("date"), Some(&date(2012, 3, 14).unwrap()));
    }

    #[test]
    fn test_unique_name_and_simple_following() {
        let (_graph, mut g) = seeded();
        let err = add_vertex(&mut g, "person", &[("name", "Bob".into())]).unwrap_err();
        assert!(matches!(err, GraphError::UniqueConstraint(_)));
        g.tx().rollback();

        let alice = g.v().has("name", "Alice").next_vertex().unwrap().id;
        let bob = g.v().has("name", "Bob").next_vertex().unwrap().id;
        let err = add_edge(&mut g, "following", alice, bob, &[]).unwrap_err();
        assert!(matches!(err, GraphError::Multiplicity { .. }));
    }

    #[test]
    fn test_date_key_rejects_strings() {
        let (_graph, mut g) = seeded();
        let err = g
            .e()
            .has_label(&["following"])
            .limit(1)
            .property("date", "2015-01-01")
            .iterate()
            .unwrap_err();
        assert!(matches!(err, GraphError::Schema(_)));
        assert!(matches!(
            g.v().has("name", "Eve").next_value(),
            Err(GraphError::NoSuchElement)
        ));
        let age = g.v().has("name", "Eve").values(&["age"]).next_value().unwrap();
        assert_eq!(age, PropertyValue::Integer(38));
    }
}
