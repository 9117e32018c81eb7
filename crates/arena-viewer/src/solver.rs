//! In-memory link graph and a shortest-path solver over it.
//!
//! Stands in for the wiki link database so the viewer can produce its own
//! `OPTIMAL_PATHS_UPDATED` events.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::ViewerError;

/// Directed page links, kept in insertion order per page.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    links: BTreeMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_link(&mut self, from: &str, to: &str) {
        let out = self.links.entry(from.to_string()).or_default();
        if !out.iter().any(|t| t == to) {
            out.push(to.to_string());
        }
        self.links.entry(to.to_string()).or_default();
    }

    pub fn with_links<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (from, to) in pairs {
            graph.add_link(from, to);
        }
        graph
    }

    pub fn contains(&self, page: &str) -> bool {
        self.links.contains_key(page)
    }

    pub fn links(&self, page: &str) -> &[String] {
        self.links.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A small built-in wiki used by `simulate`.
    pub fn sample() -> Self {
        Self::with_links([
            ("Potato", "Vegetable"),
            ("Potato", "Peru"),
            ("Potato", "Ireland"),
            ("Potato", "Starch"),
            ("Vegetable", "Plant"),
            ("Vegetable", "Cooking"),
            ("Peru", "Inca Empire"),
            ("Peru", "South America"),
            ("Ireland", "Great Famine"),
            ("Ireland", "Europe"),
            ("Starch", "Chemistry"),
            ("Starch", "Potato"),
            ("Plant", "Biology"),
            ("Plant", "Vegetable"),
            ("Cooking", "Culture"),
            ("Inca Empire", "History"),
            ("South America", "Europe"),
            ("Great Famine", "History"),
            ("Europe", "Ancient Greece"),
            ("Europe", "Culture"),
            ("Chemistry", "Science"),
            ("Biology", "Science"),
            ("Culture", "Aesthetics"),
            ("History", "Ancient Greece"),
            ("Ancient Greece", "Philosophy"),
            ("Science", "Epistemology"),
            ("Science", "Chemistry"),
            ("Aesthetics", "Philosophy"),
            ("Epistemology", "Philosophy"),
            ("Philosophy", "Science"),
        ])
    }
}

/// Every shortest path from `from` to `to`, at most `max_paths`, sorted.
///
/// Empty when the target is unreachable. A page is its own path of
/// length zero.
pub fn shortest_paths(graph: &LinkGraph, from: &str, to: &str, max_paths: usize) -> Result<Vec<Vec<String>>, ViewerError> {
    for page in [from, to] {
        if !graph.contains(page) {
            return Err(ViewerError::UnknownPage(page.to_string()));
        }
    }
    if from == to {
        return Ok(vec![vec![from.to_string()]]);
    }

    // Level-synchronous BFS, recording every parent on a shortest route.
    let mut depth: HashMap<&str, usize> = HashMap::from([(from, 0)]);
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    let mut found_at: Option<usize> = None;

    while let Some(page) = queue.pop_front() {
        let d = depth[page];
        if found_at.is_some_and(|f| d >= f) {
            break;
        }
        for next in graph.links(page) {
            let next = next.as_str();
            match depth.get(next) {
                None => {
                    depth.insert(next, d + 1);
                    parents.insert(next, vec![page]);
                    if next == to {
                        found_at = Some(d + 1);
                    } else {
                        queue.push_back(next);
                    }
                }
                Some(&nd) if nd == d + 1 => {
                    parents.entry(next).or_default().push(page);
                }
                Some(_) => {}
            }
        }
    }

    if found_at.is_none() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    let mut partial = vec![to];
    collect_paths(&parents, from, &mut partial, &mut paths);
    paths.sort();
    paths.truncate(max_paths);
    Ok(paths)
}

fn collect_paths<'a>(
    parents: &HashMap<&'a str, Vec<&'a str>>,
    from: &str,
    partial: &mut Vec<&'a str>,
    out: &mut Vec<Vec<String>>,
) {
    let Some(&head) = partial.last() else {
        return;
    };
    if head == from {
        out.push(partial.iter().rev().map(|p| p.to_string()).collect());
        return;
    }
    for &parent in parents.get(head).map(Vec::as_slice).unwrap_or(&[]) {
        partial.push(parent);
        collect_paths(parents, from, partial, out);
        partial.pop();
    }
}
