//! A randomly generated "following" network of people
//!
//! Each person follows up to nine others; every `following` edge carries the
//! date the follow started as an ISO `YYYY-MM-DD` string.

use super::{add_edge, add_vertex, name_of, now_millis, GraphApp};
use crate::graph::{Direction, GraphError, GraphResult, VertexId};
use crate::schema::{DataType, Management};
use crate::traversal::GraphTraversalSource;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

pub const PERSON_NUM: usize = 20;
const FOLLOWING_DATE_START: (i32, u32, u32) = (2005, 1, 1);
const FOLLOWING_DATE_END: (i32, u32, u32) = (2018, 4, 23);

const FIRST_NAMES: [&str; 24] = [
    "Ada", "Boris", "Chloe", "Dmitri", "Elena", "Farah", "Gustav", "Hana", "Ivan", "Julia",
    "Kofi", "Lena", "Mateo", "Nadia", "Oskar", "Priya", "Quentin", "Rosa", "Sven", "Tariq",
    "Uma", "Viktor", "Wen", "Yusuf",
];
const LAST_NAMES: [&str; 20] = [
    "Abbott", "Becker", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Horvat",
    "Ivanova", "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
    "Rossi", "Schmidt", "Tanaka", "Weber",
];

#[derive(Debug)]
pub struct FollowApp {
    rng: StdRng,
}

impl FollowApp {
    pub fn new() -> Self {
        FollowApp {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible data for a given seed
    pub fn with_seed(seed: u64) -> Self {
        FollowApp {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn full_name(&mut self) -> String {
        let first = FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())];
        format!("{} {}", first, last)
    }
}

impl Default for FollowApp {
    fn default() -> Self {
        Self::new()
    }
}

fn calendar(ymd: (i32, u32, u32)) -> GraphResult<NaiveDate> {
    NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2)
        .ok_or_else(|| GraphError::InvalidValue(format!("{:?}", ymd)))
}

impl GraphApp for FollowApp {
    fn name(&self) -> &str {
        "follow-network"
    }

    fn define_schema(&self, mgmt: &mut Management) -> GraphResult<()> {
        mgmt.make_property_key("name").data_type(DataType::String).make()?;
        mgmt.make_property_key("age").data_type(DataType::Integer).make()?;
        mgmt.make_property_key("date").data_type(DataType::String).make()?;
        // signature key of both edge labels, and set by the update step
        mgmt.make_property_key("timestamp").data_type(DataType::Integer).make()?;
        mgmt.make_vertex_label("person").make()?;
        mgmt.make_edge_label("following").signature(&["timestamp"]).make()?;
        mgmt.make_edge_label("followedBy").signature(&["timestamp"]).make()?;
        Ok(())
    }

    fn create_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let start = calendar(FOLLOWING_DATE_START)?;
        let span = (calendar(FOLLOWING_DATE_END)? - start).num_days();

        let mut people = Vec::with_capacity(PERSON_NUM);
        for _ in 0..PERSON_NUM {
            let name = self.full_name();
            let age: i64 = self.rng.gen_range(15..65);
            people.push(add_vertex(g, "person", &[("name", name.into()), ("age", age.into())])?);
        }

        let mut follows = 0;
        for &person in &people {
            let subscriptions = self.rng.gen_range(0..PERSON_NUM / 2);
            let others: Vec<VertexId> = people.iter().copied().filter(|p| *p != person).collect();
            let chosen: Vec<VertexId> = others
                .choose_multiple(&mut self.rng, subscriptions)
                .copied()
                .collect();
            for followed in chosen {
                let since = start + Duration::days(self.rng.gen_range(0..span));
                let since = since.format("%Y-%m-%d").to_string();
                add_edge(g, "following", person, followed, &[("date", since.into())])?;
                follows += 1;
            }
        }
        info!("Created {} people following each other {} times", people.len(), follows);
        Ok(())
    }

    fn read_elements(&self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let people = g.v().to_vertices()?;
        for (counter, person) in people.iter().enumerate() {
            let name = person.str_value("name").unwrap_or_default();
            let age = person.property("age").map(|a| a.to_string()).unwrap_or_default();
            info!("{})", counter);
            info!("Person: {}, {}", name, age);
            let values: Vec<String> = person.values().iter().map(|v| v.to_string()).collect();
            info!("Vertex property list: [{}]", values.join(", "));

            log_follows(g, person.id, name, Direction::In)?;
            log_follows(g, person.id, name, Direction::Out)?;
            info!("********************************");
        }
        Ok(())
    }

    fn update_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let ts = now_millis();
        let updated = g.v().sample(1).property("timestamp", ts).to_vertices()?;
        for vertex in &updated {
            info!("Adding 'timestamp' field to '{}' vertex", name_of(g, vertex.id)?);
        }
        Ok(())
    }

    fn delete_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let doomed = g.v().sample(1).next_vertex()?;
        info!("Deleting '{}' vertex", doomed.str_value("name").unwrap_or_default());
        g.v_ids([doomed.id]).drop()
    }
}

/// Log followers (`In`) or followed people (`Out`) with their dates
fn log_follows(
    g: &mut GraphTraversalSource,
    person: VertexId,
    name: &str,
    direction: Direction,
) -> GraphResult<()> {
    let edges = match direction {
        Direction::In => g.v_ids([person]).in_e(&["following"]).to_edges()?,
        _ => g.v_ids([person]).out_e(&["following"]).to_edges()?,
    };
    if edges.is_empty() {
        return Ok(());
    }
    if direction == Direction::In {
        info!("{} followed by:", name);
    } else {
        info!("{} follows:", name);
    }
    for edge in &edges {
        let other = name_of(g, edge.other_vertex(person))?;
        let since = edge.property("date").map(|d| d.to_string()).unwrap_or_default();
        info!("\t{} since {}", other, since);
    }
    if direction == Direction::In {
        info!("Total followers: {}", edges.len());
    } else {
        info!("Total following: {}", edges.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::traversal::GraphFactory;

    fn generate(seed: u64) -> (crate::traversal::Graph, GraphTraversalSource) {
        let graph = GraphFactory::open(&GraphConfig::in_memory()).unwrap();
        let mut mgmt = graph.open_management().unwrap();
        FollowApp::with_seed(seed).define_schema(&mut mgmt).unwrap();
        mgmt.commit().unwrap();
        let mut g = graph.traversal();
        FollowApp::with_seed(seed).create_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        (graph, g)
    }

    #[test]
    fn test_generated_network() {
        let (_graph, mut g) = generate(7);
        assert_eq!(g.v().count().unwrap(), PERSON_NUM);
        for person in g.v().to_vertices().unwrap() {
            let age = person.property("age").and_then(|a| a.as_integer()).unwrap();
            assert!((15..65).contains(&age));
            let followed: Vec<VertexId> = g
                .v_ids([person.id])
                .out(&["following"])
                .to_vertices()
                .unwrap()
                .iter()
                .map(|v| v.id)
                .collect();
            assert!(followed.len() < PERSON_NUM / 2);
            assert!(!followed.contains(&person.id));
            let mut distinct = followed.clone();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), followed.len());
        }
        for edge in g.e().to_edges().unwrap() {
            let date = edge.property("date").and_then(|d| d.as_string()).unwrap().to_string();
            assert!(date.as_str() >= "2005-01-01" && date.as_str() <= "2018-04-23", "{}", date);
        }
    }

    #[test]
    fn test_same_seed_same_network() {
        let (_a, mut g1) = generate(11);
        let (_b, mut g2) = generate(11);
        let names = |g: &mut GraphTraversalSource| g.v().values(&["name"]).to_values().unwrap();
        assert_eq!(names(&mut g1), names(&mut g2));
        assert_eq!(g1.e().count().unwrap(), g2.e().count().unwrap());
    }

    #[test]
    fn test_update_and_delete_one_sampled_person() {
        let (_graph, mut g) = generate(3);
        let mut app = FollowApp::with_seed(3);
        app.update_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        assert_eq!(g.v().has_key("timestamp").count().unwrap(), 1);

        app.delete_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        assert_eq!(g.v().count().unwrap(), PERSON_NUM - 1);
        app.read_elements(&mut g).unwrap();
    }
}
