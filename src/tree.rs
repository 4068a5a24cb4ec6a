//! Project hierarchy derived from the flat project list.
//!
//! The forest borrows the store's projects; expansion is separate view state
//! keyed by project id so it survives rebuilding the forest after edits.

use std::collections::{HashMap, HashSet};

use crate::project::Project;
use crate::task::Task;

/// Parent to children index over a project list.
#[derive(Debug, Clone)]
pub struct ProjectForest<'a> {
    roots: Vec<&'a Project>,
    children: HashMap<&'a str, Vec<&'a Project>>,
}

/// One line of a flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow<'a> {
    pub project: &'a Project,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Build the forest for `projects`; see [`ProjectForest::build`].
pub fn build_forest(projects: &[Project]) -> ProjectForest<'_> {
    ProjectForest::build(projects)
}

impl<'a> ProjectForest<'a> {
    /// Roots are projects without a parent. A project whose parent id names
    /// no existing project is treated as a root so it stays reachable.
    /// Siblings keep their store order.
    pub fn build(projects: &'a [Project]) -> Self {
        let known: HashSet<&str> = projects.iter().map(|p| p.id.as_str()).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<&'a str, Vec<&'a Project>> = HashMap::new();
        for p in projects {
            match p.parent_id.as_deref() {
                Some(pid) if known.contains(pid) => children.entry(pid).or_default().push(p),
                _ => roots.push(p),
            }
        }
        ProjectForest { roots, children }
    }

    pub fn roots(&self) -> &[&'a Project] {
        &self.roots
    }

    /// Direct children of `id`, possibly empty.
    pub fn children(&self, id: &str) -> &[&'a Project] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: &str) -> bool {
        !self.children(id).is_empty()
    }

    /// Depth-first rows, descending only into expanded nodes.
    pub fn visible_rows(&self, expand: &ExpandState) -> Vec<TreeRow<'a>> {
        self.rows(|id| expand.is_expanded(id))
    }

    /// Depth-first rows with every node expanded.
    pub fn all_rows(&self) -> Vec<TreeRow<'a>> {
        self.rows(|_| true)
    }

    fn rows(&self, open: impl Fn(&str) -> bool) -> Vec<TreeRow<'a>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<(&'a Project, usize)> = self.roots.iter().rev().map(|p| (*p, 0)).collect();
        while let Some((project, depth)) = stack.pop() {
            // Stored data may contain a parent loop; visit each node once.
            if !seen.insert(project.id.as_str()) {
                continue;
            }
            let kids = self.children(&project.id);
            let expanded = !kids.is_empty() && open(&project.id);
            out.push(TreeRow { project, depth, has_children: !kids.is_empty(), expanded });
            if expanded {
                stack.extend(kids.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        out
    }
}

/// Which projects are expanded in a tree view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<String>,
}

impl ExpandState {
    pub fn new() -> Self {
        ExpandState::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    /// Flip a node; returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    /// Make the selected project visible by expanding its parent.
    pub fn reveal(&mut self, selected: &Project) {
        if let Some(pid) = &selected.parent_id {
            self.expand(pid);
        }
    }
}

/// Number of tasks per referenced project id.
pub fn task_counts(tasks: &[Task]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for t in tasks {
        if let Some(pid) = t.project_id.as_deref() {
            *counts.entry(pid).or_default() += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn project(id: &str, parent: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: id.into(),
            name: id.to_uppercase(),
            description: None,
            parent_id: parent.map(Into::into),
            color: crate::project::DEFAULT_COLOR.into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn names(rows: &[TreeRow<'_>]) -> Vec<(String, usize)> {
        rows.iter().map(|r| (r.project.id.clone(), r.depth)).collect()
    }

    fn sample() -> Vec<Project> {
        vec![
            project("work", None),
            project("home", None),
            project("reports", Some("work")),
            project("q3", Some("reports")),
            project("hiring", Some("work")),
        ]
    }

    #[test]
    fn test_forest_roots_and_children() {
        let projects = sample();
        let forest = build_forest(&projects);
        let roots: Vec<_> = forest.roots().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(roots, vec!["work", "home"]);
        let kids: Vec<_> = forest.children("work").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(kids, vec!["reports", "hiring"]);
        assert!(forest.children("home").is_empty());
        assert!(!forest.has_children("q3"));
    }

    #[test]
    fn test_visible_rows_follow_expansion() {
        let projects = sample();
        let forest = build_forest(&projects);
        let mut expand = ExpandState::new();
        assert_eq!(names(&forest.visible_rows(&expand)), vec![("work".into(), 0), ("home".into(), 0)]);

        assert!(expand.toggle("work"));
        let rows = forest.visible_rows(&expand);
        assert_eq!(
            names(&rows),
            vec![("work".into(), 0), ("reports".into(), 1), ("hiring".into(), 1), ("home".into(), 0)]
        );
        assert!(rows[0].expanded && rows[1].has_children && !rows[1].expanded);

        assert!(!expand.toggle("work"));
        assert_eq!(forest.visible_rows(&expand).len(), 2);
        assert_eq!(forest.all_rows().len(), 5);
    }

    #[test]
    fn test_reveal_expands_parent_of_selection() {
        let projects = sample();
        let mut expand = ExpandState::new();
        expand.reveal(&projects[3]);
        assert!(expand.is_expanded("reports"));
        expand.reveal(&projects[0]);
        assert!(!expand.is_expanded("work"));
    }

    #[test]
    fn test_orphans_and_loops_stay_finite() {
        let projects = vec![project("a", Some("b")), project("b", Some("a")), project("lost", Some("gone"))];
        let forest = build_forest(&projects);
        let roots: Vec<_> = forest.roots().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(roots, vec!["lost"]);
        assert_eq!(forest.all_rows().len(), 1);
    }

    #[test]
    fn test_task_counts() {
        let now = Utc::now();
        let mk = |pid: Option<&str>| Task {
            id: "t".into(),
            title: "t".into(),
            description: String::new(),
            priority: Default::default(),
            status: Default::default(),
            due_date: None,
            project_id: pid.map(Into::into),
            created_at: now,
            updated_at: now,
        };
        let tasks = vec![mk(Some("a")), mk(Some("a")), mk(None), mk(Some("b"))];
        let counts = task_counts(&tasks);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
