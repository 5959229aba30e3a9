//! Expansion of raw instance tags into routable tag combinations.
//!
//! Per service, an allow-list of 2- and 3-element pattern combinations decides
//! which tag pairs and triples are published next to the plain tags. Each
//! pattern element is a regular expression matched against the whole tag.
//! Pattern elements are stored sorted by their source so they line up with
//! tag tuples, which are always generated in lexicographic order.

use meshsync_types::error::ConfigError;
use meshsync_types::models::ServiceTagsConfig;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct ServiceRules {
    pairs: Vec<[Regex; 2]>,
    triples: Vec<[Regex; 3]>,
}

impl ServiceRules {
    fn pair_allowed(&self, tag1: &str, tag2: &str) -> bool {
        self.pairs.iter().any(|[p1, p2]| p1.is_match(tag1) && p2.is_match(tag2))
    }

    fn triple_allowed(&self, tag1: &str, tag2: &str, tag3: &str) -> bool {
        self.triples
            .iter()
            .any(|[p1, p2, p3]| p1.is_match(tag1) && p2.is_match(tag2) && p3.is_match(tag3))
    }
}

#[derive(Debug)]
pub struct TagCombinationResolver {
    deny: Regex,
    rules: HashMap<String, ServiceRules>,
}

impl TagCombinationResolver {
    /// Compile the deny pattern and every allowed combination.
    ///
    /// Fails on a combination with other than 2 or 3 elements and on any
    /// pattern that does not compile.
    pub fn new(config: &ServiceTagsConfig) -> Result<Self, ConfigError> {
        let deny = full_match(&config.routing_excluded_tags.join("|"))?;

        let mut sources: HashMap<&str, (BTreeSet<[&str; 2]>, BTreeSet<[&str; 3]>)> = HashMap::new();
        for combination in &config.allowed_tags_combinations {
            let mut tags: Vec<&str> = combination.tags.iter().map(String::as_str).collect();
            tags.sort_unstable();

            let (pairs, triples) = sources.entry(combination.service_name.as_str()).or_default();
            match tags.as_slice() {
                &[a, b] => {
                    pairs.insert([a, b]);
                }
                &[a, b, c] => {
                    triples.insert([a, b, c]);
                }
                _ => {
                    return Err(ConfigError::validation(
                        "service_tags.allowed_tags_combinations",
                        format!(
                            "A tags combination must contain 2 or 3 tags. Combination with {} tags found",
                            tags.len()
                        ),
                    ))
                }
            }
        }

        let mut compiled: HashMap<String, Regex> = HashMap::new();
        let mut compile = |source: &str| -> Result<Regex, ConfigError> {
            if let Some(regex) = compiled.get(source) {
                return Ok(regex.clone());
            }
            let regex = full_match(source)?;
            compiled.insert(source.to_string(), regex.clone());
            Ok(regex)
        };

        let mut rules = HashMap::new();
        for (service, (mut pairs, triples)) in sources {
            // a triple (a, b, c) also allows (a, b), (a, c) and (b, c)
            for &[a, b, c] in &triples {
                pairs.insert([a, b]);
                pairs.insert([a, c]);
                pairs.insert([b, c]);
            }

            let mut service_rules = ServiceRules::default();
            for [a, b] in pairs {
                service_rules.pairs.push([compile(a)?, compile(b)?]);
            }
            for [a, b, c] in triples {
                service_rules.triples.push([compile(a)?, compile(b)?, compile(c)?]);
            }
            rules.insert(service.to_string(), service_rules);
        }

        Ok(Self { deny, rules })
    }

    /// Routable tags of one instance of `service_name`.
    ///
    /// `None` when no tag survives the deny pattern, meaning the tag entry
    /// should be left out of the instance metadata entirely.
    pub fn routable_tags<'a, I>(&'a self, service_name: &str, tags: I) -> Option<RoutableTags<'a>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tags: Vec<&'a str> = tags.into_iter().filter(|tag| !self.deny.is_match(tag)).collect();
        if tags.is_empty() {
            return None;
        }
        tags.sort_unstable();
        tags.dedup();

        Some(RoutableTags {
            rules: self.rules.get(service_name),
            tags,
            phase: Phase::Singles,
            i: 0,
            j: 0,
            pair_idx: 0,
            k: 0,
            pairs: Vec::new(),
        })
    }

    /// Whether `service_name` has any allowed combination.
    pub fn has_combinations(&self, service_name: &str) -> bool {
        self.rules.contains_key(service_name)
    }
}

fn full_match(source: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{source})$")).map_err(|e| ConfigError::InvalidPattern {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Singles,
    Pairs,
    Triples,
    Done,
}

/// Lazily generated routable tags: plain tags, then `"a,b"` pairs, then
/// `"a,b,c"` triples, each in lexicographic order.
///
/// Combination strings are only built when they are pulled, and never for a
/// service without an allow-list.
#[derive(Debug)]
pub struct RoutableTags<'a> {
    rules: Option<&'a ServiceRules>,
    tags: Vec<&'a str>,
    phase: Phase,
    i: usize,
    j: usize,
    pair_idx: usize,
    k: usize,
    /// Matched pairs as indexes into `tags`; triples extend them
    pairs: Vec<(usize, usize)>,
}

impl Iterator for RoutableTags<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match self.phase {
                Phase::Singles => {
                    if let Some(tag) = self.tags.get(self.i) {
                        self.i += 1;
                        return Some((*tag).to_string());
                    }
                    self.phase = if self.rules.is_some() { Phase::Pairs } else { Phase::Done };
                    self.i = 0;
                    self.j = 1;
                }
                Phase::Pairs => {
                    let rules = self.rules?;
                    let len = self.tags.len();
                    while self.i < len {
                        while self.j < len {
                            let (a, b) = (self.i, self.j);
                            self.j += 1;
                            if rules.pair_allowed(self.tags[a], self.tags[b]) {
                                self.pairs.push((a, b));
                                return Some(format!("{},{}", self.tags[a], self.tags[b]));
                            }
                        }
                        self.i += 1;
                        self.j = self.i + 1;
                    }
                    self.phase = if rules.triples.is_empty() { Phase::Done } else { Phase::Triples };
                }
                Phase::Triples => {
                    let rules = self.rules?;
                    let len = self.tags.len();
                    while let Some(&(a, b)) = self.pairs.get(self.pair_idx) {
                        if self.k <= b {
                            self.k = b + 1;
                        }
                        while self.k < len {
                            let c = self.k;
                            self.k += 1;
                            if rules.triple_allowed(self.tags[a], self.tags[b], self.tags[c]) {
                                return Some(format!(
                                    "{},{},{}",
                                    self.tags[a], self.tags[b], self.tags[c]
                                ));
                            }
                        }
                        self.pair_idx += 1;
                        self.k = 0;
                    }
                    self.phase = Phase::Done;
                }
                Phase::Done => return None,
            }
        }
    }
}
