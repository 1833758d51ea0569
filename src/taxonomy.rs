//! Term resolution with a run-scoped cache.
//!
//! A `(taxonomy, name)` pair is looked up at most once per run: the first
//! resolution searches the taxonomy and creates the term if no exact match
//! exists; every later resolution is answered from [`TermCache`].
use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::Result;
use crate::wp::{Taxonomy, WordPress};

/// `(taxonomy, trimmed name) → term id` for the duration of one run.
#[derive(Debug, Default, Clone)]
pub struct TermCache {
    ids: HashMap<(Taxonomy, String), u64>,
}

impl TermCache {
    pub fn get(&self, taxonomy: Taxonomy, name: &str) -> Option<u64> {
        self.ids.get(&(taxonomy, name.to_string())).copied()
    }

    pub fn insert(&mut self, taxonomy: Taxonomy, name: &str, id: u64) {
        self.ids.insert((taxonomy, name.to_string()), id);
    }
}

/// Counts of platform calls made by the resolver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TermStats {
    pub searched: usize,
    pub reused: usize,
    pub created: usize,
}

pub struct TermResolver<'a> {
    wp: &'a dyn WordPress,
    cache: TermCache,
    stats: TermStats,
}

impl<'a> TermResolver<'a> {
    pub fn new(wp: &'a dyn WordPress) -> Self {
        Self {
            wp,
            cache: TermCache::default(),
            stats: TermStats::default(),
        }
    }

    /// Resolve one name to a term id, creating the term when no exact match exists.
    ///
    /// Only a case-sensitive exact match on the trimmed name is reused; the
    /// platform's search is fuzzy and near-matches would merge distinct terms.
    pub async fn resolve(&mut self, taxonomy: Taxonomy, name: &str) -> Result<Option<u64>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(id) = self.cache.get(taxonomy, name) {
            return Ok(Some(id));
        }

        self.stats.searched += 1;
        let found = self.wp.search_terms(taxonomy, name).await?;
        let id = match found.iter().find(|t| t.name.trim() == name) {
            Some(term) => {
                self.stats.reused += 1;
                debug!(%taxonomy, name, id = term.id, "terms: reusing existing term");
                term.id
            }
            None => {
                let term = self.wp.create_term(taxonomy, name).await?;
                self.stats.created += 1;
                info!(%taxonomy, name, id = term.id, "terms: created term");
                term.id
            }
        };
        self.cache.insert(taxonomy, name, id);
        Ok(Some(id))
    }

    /// Resolve names in order, skipping blanks and repeated ids.
    pub async fn resolve_all<S>(&mut self, taxonomy: Taxonomy, names: &[S]) -> Result<Vec<u64>>
    where
        S: AsRef<str> + Sync,
    {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            if let Some(id) = self.resolve(taxonomy, name.as_ref()).await? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    pub fn cache(&self) -> &TermCache {
        &self.cache
    }

    pub fn stats(&self) -> TermStats {
        self.stats
    }
}
