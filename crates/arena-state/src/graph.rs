//! Page graph derivation.
//!
//! Builds the render graph from every game's history up to a viewing
//! bound:
//! 1. Upsert one node per page title, recording a visit per state.
//! 2. Emit one `move` edge per consecutive pair of included states,
//!    keyed by game and move index.
//! 3. For each game's viewed state only, emit `optimal_path` edges along
//!    the suggested paths, adding path-only nodes as `optimal_path`.
//!
//! Nodes are keyed by title and edges by id, so renderers can diff
//! successive graphs by key. Output order follows registration and move
//! order and is stable for identical input.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use arena_protocol::GameStatus;

use crate::history::HistoryStore;
use crate::task::GameSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNodeType {
    Start,
    Target,
    Visited,
    OptimalPath,
    Error,
}

/// One game's visit to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub game_id: String,
    pub move_index: usize,
    pub distance_change: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNode {
    pub page_title: String,
    #[serde(rename = "type")]
    pub node_type: PageNodeType,
    /// Distance is a property of the page, so every visit shares it.
    pub distance_to_target: Option<u32>,
    pub visits: Vec<Visit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Move,
    OptimalPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationEdge {
    pub id: String,
    pub source_page_title: String,
    pub target_page_title: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Owning game; suggestions belong to no game.
    pub game_id: Option<String>,
    pub move_index: Option<usize>,
    pub distance_change: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageGraphData {
    pub pages: Vec<PageNode>,
    pub edges: Vec<NavigationEdge>,
    /// Registration order; renderers use it for left/right placement.
    pub game_order: Vec<String>,
}

impl PageGraphData {
    pub fn page(&self, title: &str) -> Option<&PageNode> {
        self.pages.iter().find(|p| p.page_title == title)
    }

    pub fn edge(&self, id: &str) -> Option<&NavigationEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edges_of_type(&self, edge_type: EdgeType) -> impl Iterator<Item = &NavigationEdge> {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }
}

/// Knobs for graph derivation.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Emit suggestion edges for each game's viewed page.
    pub include_optimal_paths: bool,
    /// Cap on suggested paths drawn per viewed page.
    pub max_optimal_paths: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            include_optimal_paths: true,
            max_optimal_paths: 5,
        }
    }
}

pub fn move_edge_id(game_id: &str, move_index: usize) -> String {
    format!("{game_id}-move-{move_index}")
}

pub fn optimal_edge_id(source: &str, target: &str) -> String {
    format!("optimal:{source}->{target}")
}

/// Identity used to dedup edges. Titles may contain any separator, so
/// suggestions are keyed on the title pair itself rather than the id string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EdgeKey {
    Move { game_id: String, move_index: usize },
    OptimalPath { source: String, target: String },
}

/// Derive the page graph for `viewing_index`. Pure: reads history only.
pub fn build_page_graph(history: &HistoryStore, viewing_index: usize, options: &GraphOptions) -> PageGraphData {
    let mut builder = GraphBuilder::new(history.start_page(), history.target_page());

    for game in history.games() {
        let bound = viewing_index.min(game.last_index());
        builder.add_visits(game, bound);
        builder.add_move_edges(game, bound);
    }

    if options.include_optimal_paths {
        for game in history.games() {
            let bound = viewing_index.min(game.last_index());
            builder.add_optimal_paths(game, bound, options.max_optimal_paths);
        }
    }

    PageGraphData {
        pages: builder.pages,
        edges: builder.edges,
        game_order: history.game_order(),
    }
}

struct GraphBuilder<'a> {
    start_page: &'a str,
    target_page: &'a str,
    pages: Vec<PageNode>,
    page_slots: HashMap<String, usize>,
    edges: Vec<NavigationEdge>,
    edge_keys: HashSet<EdgeKey>,
}

impl<'a> GraphBuilder<'a> {
    fn new(start_page: &'a str, target_page: &'a str) -> Self {
        Self {
            start_page,
            target_page,
            pages: Vec::new(),
            page_slots: HashMap::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
        }
    }

    /// Node for `title`, created with `fallback` type if new. Start and
    /// target titles always carry their own type.
    fn upsert(&mut self, title: &str, fallback: PageNodeType) -> &mut PageNode {
        let slot = match self.page_slots.get(title) {
            Some(&slot) => slot,
            None => {
                let node_type = if title == self.start_page {
                    PageNodeType::Start
                } else if title == self.target_page {
                    PageNodeType::Target
                } else {
                    fallback
                };
                self.pages.push(PageNode {
                    page_title: title.to_string(),
                    node_type,
                    distance_to_target: None,
                    visits: Vec::new(),
                });
                self.page_slots.insert(title.to_string(), self.pages.len() - 1);
                self.pages.len() - 1
            }
        };
        &mut self.pages[slot]
    }

    fn add_visits(&mut self, game: &GameSequence, bound: usize) {
        for state in &game.page_states()[..=bound] {
            let node = self.upsert(&state.page_title, PageNodeType::Visited);
            // A node first seen as a suggestion becomes visited once a game lands on it.
            if node.node_type == PageNodeType::OptimalPath {
                node.node_type = PageNodeType::Visited;
            }
            if state.distance_to_target.is_some() {
                node.distance_to_target = state.distance_to_target;
            }
            node.visits.push(Visit {
                game_id: game.game_id.clone(),
                move_index: state.move_index,
                distance_change: state.distance_change,
            });
        }

        if bound == game.last_index() && GameStatus::is_error_str(&game.status) {
            let tail = &game.page_states()[bound].page_title;
            let node = self.upsert(tail, PageNodeType::Visited);
            if node.node_type == PageNodeType::Visited {
                node.node_type = PageNodeType::Error;
            }
        }
    }

    fn add_move_edges(&mut self, game: &GameSequence, bound: usize) {
        for pair in game.page_states()[..=bound].windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let id = move_edge_id(&game.game_id, to.move_index);
            let key = EdgeKey::Move {
                game_id: game.game_id.clone(),
                move_index: to.move_index,
            };
            self.push_edge(key, NavigationEdge {
                id,
                source_page_title: from.page_title.clone(),
                target_page_title: to.page_title.clone(),
                edge_type: EdgeType::Move,
                game_id: Some(game.game_id.clone()),
                move_index: Some(to.move_index),
                distance_change: to.distance_change,
            });
        }
    }

    fn add_optimal_paths(&mut self, game: &GameSequence, bound: usize, max_paths: usize) {
        let viewed = &game.page_states()[bound];
        for path in viewed.optimal_paths.iter().take(max_paths) {
            for step in path.windows(2) {
                let (source, target) = (&step[0], &step[1]);
                self.upsert(source, PageNodeType::OptimalPath);
                self.upsert(target, PageNodeType::OptimalPath);
                let key = EdgeKey::OptimalPath {
                    source: source.clone(),
                    target: target.clone(),
                };
                self.push_edge(key, NavigationEdge {
                    id: optimal_edge_id(source, target),
                    source_page_title: source.clone(),
                    target_page_title: target.clone(),
                    edge_type: EdgeType::OptimalPath,
                    game_id: None,
                    move_index: None,
                    distance_change: None,
                });
            }
        }
    }

    fn push_edge(&mut self, key: EdgeKey, edge: NavigationEdge) {
        if self.edge_keys.insert(key) {
            self.edges.push(edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::GameConfig;
    use arena_protocol::MoveRecord;

    fn mv(from: &str, to: &str) -> MoveRecord {
        MoveRecord {
            step: 0,
            from_page_title: from.into(),
            to_page_title: Some(to.into()),
            timestamp: None,
        }
    }

    fn two_games() -> HistoryStore {
        HistoryStore::from_configs(&[GameConfig::new("g1", "A", "Z"), GameConfig::new("g2", "A", "Z")]).unwrap()
    }

    #[test]
    fn test_shared_page_is_one_node() {
        let mut history = two_games();
        history.append_move("g1", &mv("A", "B"), "in_progress").unwrap();
        history.append_move("g2", &mv("A", "B"), "in_progress").unwrap();

        let graph = build_page_graph(&history, 1, &GraphOptions::default());
        assert_eq!(graph.pages.len(), 2);
        assert_eq!(graph.page("B").unwrap().visits.len(), 2);
        assert_eq!(graph.page("A").unwrap().node_type, PageNodeType::Start);
    }

    #[test]
    fn test_bound_clips_each_game() {
        let mut history = two_games();
        history.append_move("g1", &mv("A", "B"), "in_progress").unwrap();
        history.append_move("g1", &mv("B", "C"), "in_progress").unwrap();
        history.append_move("g2", &mv("A", "D"), "in_progress").unwrap();

        let graph = build_page_graph(&history, 1, &GraphOptions::default());
        assert!(graph.page("C").is_none(), "g1 is clipped at index 1");
        assert!(graph.page("D").is_some());
        assert!(graph.edge("g1-move-1").is_some());
        assert!(graph.edge("g1-move-2").is_none());

        let full = build_page_graph(&history, 2, &GraphOptions::default());
        assert!(full.edge("g1-move-2").is_some());
        assert!(full.edge("g2-move-2").is_none(), "shorter game gets no fabricated step");
    }

    #[test]
    fn test_suggestions_only_for_viewed_state() {
        let mut history = two_games();
        history
            .attach_optimal_paths("g1", Some("A"), &[vec!["A".into(), "X".into(), "Z".into()]], Some(2))
            .unwrap();
        history.append_move("g1", &mv("A", "B"), "in_progress").unwrap();
        history
            .attach_optimal_paths("g1", Some("B"), &[vec!["B".into(), "Y".into(), "Z".into()]], Some(2))
            .unwrap();

        let graph = build_page_graph(&history, 1, &GraphOptions::default());
        assert!(graph.edge("optimal:B->Y").is_some());
        assert!(graph.edge("optimal:A->X").is_none(), "A is no longer g1's viewed page");
        assert_eq!(graph.page("Y").unwrap().node_type, PageNodeType::OptimalPath);
        assert_eq!(graph.page("Z").unwrap().node_type, PageNodeType::Target);
        assert!(graph.page("Y").unwrap().visits.is_empty());

        let earlier = build_page_graph(&history, 0, &GraphOptions::default());
        assert!(earlier.edge("optimal:A->X").is_some());
        assert!(earlier.page("B").is_none());
    }

    #[test]
    fn test_suggestions_can_be_disabled() {
        let mut history = two_games();
        history
            .attach_optimal_paths("g1", Some("A"), &[vec!["A".into(), "Z".into()]], Some(1))
            .unwrap();
        let options = GraphOptions {
            include_optimal_paths: false,
            ..Default::default()
        };
        let graph = build_page_graph(&history, 0, &options);
        assert_eq!(graph.edges_of_type(EdgeType::OptimalPath).count(), 0);
        assert!(graph.page("Z").is_none());
    }

    #[test]
    fn test_errored_game_marks_tail() {
        let mut history = two_games();
        history.append_move("g1", &mv("A", "B"), "in_progress").unwrap();
        let ended = arena_protocol::GameEventKind::GameEnded {
            state: None,
            final_status: Some("error".into()),
            error_message: Some("model timed out".into()),
        };
        history.apply_event("g1", &ended).unwrap();

        let graph = build_page_graph(&history, 1, &GraphOptions::default());
        assert_eq!(graph.page("B").unwrap().node_type, PageNodeType::Error);

        let earlier = build_page_graph(&history, 0, &GraphOptions::default());
        assert!(earlier.page("B").is_none());
    }

    #[test]
    fn test_game_order_is_registration_order() {
        let history = HistoryStore::from_configs(&[
            GameConfig::new("zeta", "A", "Z"),
            GameConfig::new("alpha", "A", "Z"),
        ])
        .unwrap();
        let graph = build_page_graph(&history, 0, &GraphOptions::default());
        assert_eq!(graph.game_order, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn test_json_shape_for_renderers() {
        let mut history = two_games();
        history.append_move("g1", &mv("A", "B"), "in_progress").unwrap();
        let graph = build_page_graph(&history, 1, &GraphOptions::default());
        let value = serde_json::to_value(&graph).unwrap();

        assert_eq!(value["pages"][1]["type"], "visited");
        assert_eq!(value["edges"][0]["type"], "move");
        assert_eq!(value["edges"][0]["id"], "g1-move-1");
        assert_eq!(value["edges"][0]["source_page_title"], "A");
        assert!(value["edges"][0]["distance_change"].is_null());
    }

    #[test]
    fn test_hyphenated_titles_keep_distinct_suggestions() {
        let mut history = HistoryStore::from_configs(&[GameConfig::new("g1", "A", "Z")]).unwrap();
        history
            .attach_optimal_paths(
                "g1",
                Some("A"),
                &[
                    vec!["A".into(), "A-B".into(), "C".into(), "Z".into()],
                    vec!["A".into(), "B-C".into(), "Z".into()],
                ],
                Some(3),
            )
            .unwrap();

        let graph = build_page_graph(&history, 0, &GraphOptions::default());
        let pairs: Vec<(&str, &str)> = graph
            .edges_of_type(EdgeType::OptimalPath)
            .map(|e| (e.source_page_title.as_str(), e.target_page_title.as_str()))
            .collect();
        assert!(pairs.contains(&("A-B", "C")));
        assert!(pairs.contains(&("A", "B-C")), "distinct pair must not be dropped as a duplicate");
        assert_ne!(optimal_edge_id("A-B", "C"), optimal_edge_id("A", "B-C"));
    }

    #[test]
    fn test_shared_suggestion_is_one_edge() {
        let mut history = two_games();
        for game_id in ["g1", "g2"] {
            history
                .attach_optimal_paths(game_id, Some("A"), &[vec!["A".into(), "X".into(), "Z".into()]], Some(2))
                .unwrap();
        }
        let graph = build_page_graph(&history, 0, &GraphOptions::default());
        assert_eq!(graph.edges_of_type(EdgeType::OptimalPath).count(), 2);
    }
}
