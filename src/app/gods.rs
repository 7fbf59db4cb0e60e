//! The "graph of the gods": titans, gods, demigods, monsters and the places
//! they live.

use super::{add_edge, add_vertex, describe, name_of, now_millis, GraphApp};
use crate::graph::{GeoPoint, GraphResult, PropertyValue};
use crate::schema::{DataType, ElementKind, Management, Multiplicity};
use crate::traversal::{GraphTraversalSource, P};
use tracing::info;

const VERTEX_LABELS: [&str; 6] = ["titan", "location", "god", "demigod", "human", "monster"];

#[derive(Debug, Default)]
pub struct GodsApp;

impl GodsApp {
    pub fn new() -> Self {
        GodsApp
    }
}

impl GraphApp for GodsApp {
    fn name(&self) -> &str {
        "graph-of-the-gods"
    }

    fn define_schema(&self, mgmt: &mut Management) -> GraphResult<()> {
        mgmt.make_property_key("name").data_type(DataType::String).make()?;
        mgmt.make_property_key("age").data_type(DataType::Integer).make()?;
        mgmt.make_property_key("time").data_type(DataType::Integer).make()?;
        mgmt.make_property_key("reason").data_type(DataType::String).make()?;
        mgmt.make_property_key("place").data_type(DataType::Geoshape).make()?;
        // written by the update step
        mgmt.make_property_key("ts").data_type(DataType::Integer).make()?;

        for label in VERTEX_LABELS {
            mgmt.make_vertex_label(label).make()?;
        }

        mgmt.make_edge_label("father").multiplicity(Multiplicity::Many2One).make()?;
        mgmt.make_edge_label("mother").multiplicity(Multiplicity::Many2One).make()?;
        mgmt.make_edge_label("lives").signature(&["reason"]).make()?;
        mgmt.make_edge_label("pet").make()?;
        mgmt.make_edge_label("brother").make()?;
        mgmt.make_edge_label("battled").make()?;

        mgmt.build_index("nameIndex", ElementKind::Vertex)
            .add_key("name")
            .unique()
            .build_composite_index()?;
        if let Some(backend) = mgmt.search_backend().map(str::to_string) {
            mgmt.build_index("vAge", ElementKind::Vertex)
                .add_key("age")
                .build_mixed_index(&backend)?;
            mgmt.build_index("eReasonPlace", ElementKind::Edge)
                .add_key("reason")
                .add_key("place")
                .build_mixed_index(&backend)?;
        }
        Ok(())
    }

    fn elements_exist(&self, g: &mut GraphTraversalSource) -> GraphResult<bool> {
        g.v().has("name", "saturn").has_next()
    }

    fn create_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let saturn = add_vertex(g, "titan", &[("name", "saturn".into()), ("age", 10000.into())])?;
        let sky = add_vertex(g, "location", &[("name", "sky".into())])?;
        let sea = add_vertex(g, "location", &[("name", "sea".into())])?;
        let jupiter = add_vertex(g, "god", &[("name", "jupiter".into()), ("age", 5000.into())])?;
        let neptune = add_vertex(g, "god", &[("name", "neptune".into()), ("age", 4500.into())])?;
        let hercules =
            add_vertex(g, "demigod", &[("name", "hercules".into()), ("age", 30.into())])?;
        let alcmene = add_vertex(g, "human", &[("name", "alcmene".into()), ("age", 45.into())])?;
        let pluto = add_vertex(g, "god", &[("name", "pluto".into()), ("age", 4000.into())])?;
        let nemean = add_vertex(g, "monster", &[("name", "nemean".into())])?;
        let hydra = add_vertex(g, "monster", &[("name", "hydra".into())])?;
        let cerberus = add_vertex(g, "monster", &[("name", "cerberus".into())])?;
        let tartarus = add_vertex(g, "location", &[("name", "tartarus".into())])?;

        add_edge(g, "father", jupiter, saturn, &[])?;
        add_edge(g, "lives", jupiter, sky, &[("reason", "loves fresh breezes".into())])?;
        add_edge(g, "brother", jupiter, neptune, &[])?;
        add_edge(g, "brother", jupiter, pluto, &[])?;

        add_edge(g, "lives", neptune, sea, &[("reason", "loves waves".into())])?;
        add_edge(g, "brother", neptune, jupiter, &[])?;
        add_edge(g, "brother", neptune, pluto, &[])?;

        add_edge(g, "father", hercules, jupiter, &[])?;
        add_edge(g, "mother", hercules, alcmene, &[])?;
        add_edge(g, "battled", hercules, nemean, &battle(1, 38.1, 23.7))?;
        add_edge(g, "battled", hercules, hydra, &battle(2, 37.7, 23.9))?;
        add_edge(g, "battled", hercules, cerberus, &battle(12, 39.0, 22.0))?;

        add_edge(g, "brother", pluto, jupiter, &[])?;
        add_edge(g, "brother", pluto, neptune, &[])?;
        add_edge(g, "lives", pluto, tartarus, &[("reason", "no fear of death".into())])?;
        add_edge(g, "pet", pluto, cerberus, &[])?;

        add_edge(g, "lives", cerberus, tartarus, &[])?;

        info!("Created {} vertices and {} edges", g.v().count()?, g.e().count()?);
        Ok(())
    }

    fn read_elements(&self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        for properties in g.v().has("name", "jupiter").value_map(&[]).to_value_maps()? {
            info!("jupiter: {}", describe(&properties));
        }

        // find the edge by its endpoints
        let hydra = g.v().has("name", "hydra").to_vertices()?.into_iter().next();
        if let Some(hydra) = hydra {
            let battles = g.v().has("name", "hercules").out_e(&["battled"]).to_edges()?;
            for edge in battles.into_iter().filter(|e| e.in_v == hydra.id) {
                info!("hercules battled hydra: {}", describe(&edge.properties));
            }
        }

        let elders = g.v().has_pred("age", P::gte(5000)).values(&["name"]).to_values()?;
        info!("Aged 5000 or more: {}", join(&elders));

        let pets = g.v().has("name", "pluto").out(&["pet"]).values(&["name"]).to_values()?;
        info!("pluto's pets: {}", join(&pets));

        let cohabitants = g
            .v()
            .has("name", "pluto")
            .out(&["lives"])
            .in_(&["lives"])
            .has_pred("name", P::neq("pluto"))
            .values(&["name"])
            .to_values()?;
        info!("Living with pluto: {}", join(&cohabitants));

        let parents = g
            .v()
            .has("name", "hercules")
            .out(&["father", "mother"])
            .to_vertices()?;
        for parent in parents {
            info!(
                "hercules' parent: {} ({})",
                parent.str_value("name").unwrap_or_default(),
                parent.label
            );
        }
        Ok(())
    }

    fn update_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let ts = now_millis();
        let updated = g.v().has("name", "jupiter").property("ts", ts).to_vertices()?;
        for vertex in &updated {
            info!("Set ts={} on {}", ts, name_of(g, vertex.id)?);
        }
        Ok(())
    }

    fn delete_elements(&mut self, g: &mut GraphTraversalSource) -> GraphResult<()> {
        let doomed = g.v().has("name", "pluto").to_vertices()?;
        for vertex in &doomed {
            let edges = g.v_ids([vertex.id]).both_e(&[]).count()?;
            info!("Deleting pluto and its {} edges", edges);
        }
        g.v().has("name", "pluto").drop()
    }
}

fn battle(time: i64, lat: f64, lon: f64) -> [(&'static str, PropertyValue); 2] {
    [("time", time.into()), ("place", GeoPoint::new(lat, lon).into())]
}

fn join(values: &[PropertyValue]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppRunner;
    use crate::traversal::{Graph, GraphFactory};
    use crate::config::GraphConfig;

    fn seeded() -> (Graph, GraphTraversalSource) {
        let graph = GraphFactory::open(&GraphConfig::in_memory()).unwrap();
        let mut mgmt = graph.open_management().unwrap();
        GodsApp.define_schema(&mut mgmt).unwrap();
        mgmt.commit().unwrap();
        let mut g = graph.traversal();
        GodsApp.create_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        (graph, g)
    }

    #[test]
    fn test_sample_graph_shape() {
        let (_graph, mut g) = seeded();
        assert_eq!(g.v().count().unwrap(), 12);
        assert_eq!(g.e().count().unwrap(), 17);
        assert_eq!(g.e().has_label(&["battled"]).count().unwrap(), 3);
        let parents = g
            .v()
            .has("name", "hercules")
            .out(&["father", "mother"])
            .values(&["name"])
            .to_values()
            .unwrap();
        assert_eq!(join(&parents), "jupiter, alcmene");
        assert!(GodsApp.elements_exist(&mut g).unwrap());
    }

    #[test]
    fn test_mixed_indexes_need_a_search_backend() {
        let graph = GraphFactory::open(&GraphConfig::in_memory()).unwrap();
        let mut mgmt = graph.open_management().unwrap();
        GodsApp.define_schema(&mut mgmt).unwrap();
        assert!(mgmt.contains_graph_index("nameIndex"));
        assert!(!mgmt.contains_graph_index("vAge"));

        let config = GraphConfig::in_memory().with(crate::config::INDEX_SEARCH_BACKEND, "lucene");
        let graph = GraphFactory::open(&config).unwrap();
        let mut mgmt = graph.open_management().unwrap();
        GodsApp.define_schema(&mut mgmt).unwrap();
        assert!(mgmt.contains_graph_index("vAge"));
        assert!(mgmt.contains_graph_index("eReasonPlace"));
    }

    #[test]
    fn test_father_is_many_to_one() {
        let (_graph, mut g) = seeded();
        let hercules = g.v().has("name", "hercules").next_vertex().unwrap().id;
        let saturn = g.v().has("name", "saturn").next_vertex().unwrap().id;
        assert!(add_edge(&mut g, "father", hercules, saturn, &[]).is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let (_graph, mut g) = seeded();
        let mut app = GodsApp::new();
        app.update_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        let jupiter = g.v().has("name", "jupiter").next_vertex().unwrap();
        assert!(jupiter.property("ts").and_then(PropertyValue::as_integer).is_some());

        app.delete_elements(&mut g).unwrap();
        g.tx().commit().unwrap();
        assert_eq!(g.v().has("name", "pluto").count().unwrap(), 0);
        assert_eq!(g.v().has("name", "cerberus").in_(&["pet"]).count().unwrap(), 0);
        // reading after the delete still works
        app.read_elements(&mut g).unwrap();
    }

    #[test]
    fn test_runner_with_missing_config_fails_to_open() {
        let mut runner = AppRunner::new(GodsApp::new(), "/no/such/graph.properties");
        assert!(runner.run().is_err());
    }
}
