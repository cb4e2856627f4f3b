// glspace/src/matcher.rs
//
//! Selection of concrete configurations that satisfy a template.
//!
//! A configuration satisfies a template when every requested ranked attribute is met or exceeded
//! and every requested exact attribute is equal. Among the satisfying configurations, the
//! preferred one is chosen by, in order:
//!
//! 1. the least total excess over the requested ranked attributes;
//! 2. the least total size of unrequested ancillary buffers (depth, stencil, accumulation,
//!    auxiliary and multisample buffers);
//! 3. the platform's catalog order.
//!
//! The ranking is a total order over a catalog, so matching is deterministic.

use crate::attributes::{Attribute, AttributeKind, ConfigAttributes, Template};
use crate::error::Error;

/// Returns true if the attributes meet or exceed every request in the template.
pub fn satisfies(template: &Template, attributes: &ConfigAttributes) -> bool {
    template.requests().all(|(attribute, requested)| {
        let value = attributes.get(attribute);
        match attribute.kind() {
            AttributeKind::Ranked => value >= requested,
            AttributeKind::Exact => value == requested,
        }
    })
}

/// Returns the catalog entries that satisfy the template, in catalog order.
///
/// An empty template returns the whole catalog.
pub fn filter<'a, C>(template: &Template, catalog: &'a [C]) -> Vec<&'a C>
where
    C: AsRef<ConfigAttributes>,
{
    catalog.iter().filter(|entry| satisfies(template, entry.as_ref())).collect()
}

/// Returns the catalog entries that satisfy the template, best first.
pub fn rank<'a, C>(template: &Template, catalog: &'a [C]) -> Vec<&'a C>
where
    C: AsRef<ConfigAttributes>,
{
    let mut candidates: Vec<(RankKey, &'a C)> = catalog
        .iter()
        .enumerate()
        .filter(|(_, entry)| satisfies(template, entry.as_ref()))
        .map(|(index, entry)| (RankKey::new(template, entry.as_ref(), index), entry))
        .collect();
    candidates.sort_by_key(|&(key, _)| key);
    log::trace!(
        "{} of {} configs satisfy {}",
        candidates.len(),
        catalog.len(),
        template
    );
    candidates.into_iter().map(|(_, entry)| entry).collect()
}

/// Returns the best catalog entry for the template.
///
/// Fails with `Error::NoSuchConfig` if no entry satisfies it. A weaker entry is never returned.
pub fn best<'a, C>(template: &Template, catalog: &'a [C]) -> Result<&'a C, Error>
where
    C: AsRef<ConfigAttributes>,
{
    catalog
        .iter()
        .enumerate()
        .filter(|(_, entry)| satisfies(template, entry.as_ref()))
        .min_by_key(|&(index, entry)| RankKey::new(template, entry.as_ref(), index))
        .map(|(_, entry)| entry)
        .ok_or(Error::NoSuchConfig)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    excess: u64,
    ancillary: u64,
    index: usize,
}

impl RankKey {
    fn new(template: &Template, attributes: &ConfigAttributes, index: usize) -> RankKey {
        let mut excess = 0;
        let mut ancillary = 0;
        for &attribute in Attribute::ALL {
            let value = attributes.get(attribute) as u64;
            match template.get(attribute) {
                Some(requested) if attribute.kind() == AttributeKind::Ranked => {
                    excess += value.saturating_sub(requested as u64);
                }
                Some(_) => {}
                None if attribute.is_ancillary() => ancillary += value,
                None => {}
            }
        }
        RankKey { excess, ancillary, index }
    }
}

impl AsRef<ConfigAttributes> for ConfigAttributes {
    #[inline]
    fn as_ref(&self) -> &ConfigAttributes {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(double_buffer: bool, depth_size: u32) -> ConfigAttributes {
        ConfigAttributes { double_buffer, depth_size, ..ConfigAttributes::default() }
    }

    #[test]
    fn test_exact_attributes_must_be_equal() {
        let catalog = [config(false, 24)];
        let template = Template { double_buffer: Some(true), ..Template::default() };
        assert_eq!(best(&template, &catalog), Err(Error::NoSuchConfig));
        assert!(filter(&template, &catalog).is_empty());
    }

    #[test]
    fn test_least_excess_wins() {
        let catalog = [config(true, 32), config(true, 24), config(true, 16)];
        let template = Template { depth_size: Some(20), ..Template::default() };
        assert_eq!(best(&template, &catalog), Ok(&catalog[1]));
        assert_eq!(rank(&template, &catalog), vec![&catalog[1], &catalog[0]]);
    }

    #[test]
    fn test_unrequested_ancillary_buffers_are_avoided() {
        let mut multisampled = config(true, 24);
        multisampled.sample_buffers = 1;
        multisampled.samples = 4;
        let catalog = [multisampled, config(true, 24)];
        let template = Template::window_default();
        assert_eq!(best(&template, &catalog), Ok(&catalog[1]));
    }

    #[test]
    fn test_catalog_order_breaks_ties() {
        let mut rgb = config(true, 24);
        rgb.red_size = 8;
        let mut rgb565 = config(true, 24);
        rgb565.red_size = 5;
        let catalog = [rgb, rgb565];
        assert_eq!(best(&Template::window_default(), &catalog), Ok(&catalog[0]));
    }
}
