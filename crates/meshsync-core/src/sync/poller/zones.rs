use std::collections::BTreeSet;

/// Computes which zones get a poller.
pub struct RemoteZones;

impl RemoteZones {
    /// Known zones minus the local one and the blacklisted ones, sorted, without duplicates.
    pub fn resolve<I, S>(known: I, local_zone: &str, blacklisted: &BTreeSet<String>) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        known
            .into_iter()
            .map(Into::into)
            .filter(|zone| zone != local_zone && !blacklisted.contains(zone))
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }
}
