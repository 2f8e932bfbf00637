//! Repository denylist applied to every source before any totals are taken.

use std::collections::BTreeSet;

use crate::models::{GroupStats, RepoCommits};

/// Repositories that never appear in the report.
pub const DEFAULT_EXCLUDED_REPOS: &[&str] = &["zeta"];

/// Set of repository / group names removed from all rankings and totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionList {
    names: BTreeSet<String>,
}

impl ExclusionList {
    /// The built-in denylist plus any extra names.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeSet<String> =
            DEFAULT_EXCLUDED_REPOS.iter().map(|s| s.to_string()).collect();
        names.extend(extra.into_iter().map(Into::into));
        Self { names }
    }

    /// An empty list.
    pub fn none() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Drop excluded groups in place and return what was removed.
    pub fn split_groups(&self, groups: &mut Vec<GroupStats>) -> Vec<GroupStats> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            groups.drain(..).partition(|g| self.contains(&g.group));
        *groups = kept;
        removed
    }

    /// Drop excluded repositories in place and return what was removed.
    pub fn split_repos(&self, repos: &mut Vec<RepoCommits>) -> Vec<RepoCommits> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            repos.drain(..).partition(|r| self.contains(&r.repo));
        *repos = kept;
        removed
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, sessions: u64) -> GroupStats {
        GroupStats {
            group: name.to_string(),
            sessions,
            turns: sessions * 2,
        }
    }

    #[test]
    fn test_default_contains_builtin() {
        let list = ExclusionList::default();
        assert!(list.contains("zeta"));
        assert!(!list.contains("alpha"));
    }

    #[test]
    fn test_extra_names_added() {
        let list = ExclusionList::new(["work-repo"]);
        assert!(list.contains("zeta"));
        assert!(list.contains("work-repo"));
    }

    #[test]
    fn test_split_groups() {
        let list = ExclusionList::default();
        let mut groups = vec![group("alpha", 3), group("zeta", 5), group("beta", 1)];
        let removed = list.split_groups(&mut groups);

        assert_eq!(removed, vec![group("zeta", 5)]);
        let names: Vec<&str> = groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_split_repos() {
        let list = ExclusionList::default();
        let mut repos = vec![
            RepoCommits {
                repo: "zeta".into(),
                commits: 10,
            },
            RepoCommits {
                repo: "alpha".into(),
                commits: 2,
            },
        ];
        let removed = list.split_repos(&mut repos);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].commits, 10);
        assert_eq!(repos.len(), 1);
    }
}
