//! Fetch-more trigger bound to the last rendered post.

use crate::api::{Post, PostId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    index: usize,
    id: PostId,
}

/// Watches exactly one item: the post currently last in the list.
///
/// Every list change re-attaches the observation, discarding the previous
/// one, so a superseded last item can never fire. While a fetch is
/// outstanding nothing is observed. Firing consumes the observation, so a
/// single scroll position triggers at most one fetch.
#[derive(Debug, Default)]
pub struct ScrollObserver {
    observed: Option<Observation>,
}

impl ScrollObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-target the observation after the list or loading state changed.
    pub fn attach(&mut self, posts: &[Post], loading: bool) {
        self.observed = if loading {
            None
        } else {
            posts.last().map(|post| Observation {
                index: posts.len() - 1,
                id: post.id.clone(),
            })
        };
    }

    /// Report that the item at `index` became visible.
    ///
    /// Returns true when the caller should request the next page.
    pub fn on_visible(&mut self, index: usize, exhausted: bool) -> bool {
        match &self.observed {
            Some(obs) if obs.index == index && !exhausted => {
                tracing::debug!(index, post_id = %obs.id, "Last post visible, requesting more");
                self.observed = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the observation without firing.
    pub fn disconnect(&mut self) {
        self.observed = None;
    }

    pub fn observed_index(&self) -> Option<usize> {
        self.observed.as_ref().map(|o| o.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts(n: usize) -> Vec<Post> {
        (0..n)
            .map(|i| Post {
                id: PostId::from(format!("p{i}").as_str()),
                image_url: String::new(),
                title: String::new(),
                tags: Vec::new(),
                created_at: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_observes_last_item() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(10), false);
        assert_eq!(observer.observed_index(), Some(9));
    }

    #[test]
    fn test_fires_once_per_observation() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(10), false);
        assert!(observer.on_visible(9, false));
        assert!(!observer.on_visible(9, false));
    }

    #[test]
    fn test_other_items_do_not_fire() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(10), false);
        assert!(!observer.on_visible(8, false));
        assert!(observer.on_visible(9, false));
    }

    #[test]
    fn test_no_observation_while_loading() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(10), true);
        assert_eq!(observer.observed_index(), None);
        assert!(!observer.on_visible(9, false));
    }

    #[test]
    fn test_reattach_moves_to_new_last_item() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(10), false);
        observer.attach(&posts(20), false);
        assert!(!observer.on_visible(9, false));
        assert!(observer.on_visible(19, false));
    }

    #[test]
    fn test_exhausted_never_fires() {
        let mut observer = ScrollObserver::new();
        observer.attach(&posts(5), false);
        assert!(!observer.on_visible(4, true));
    }

    #[test]
    fn test_empty_list_observes_nothing() {
        let mut observer = ScrollObserver::new();
        observer.attach(&[], false);
        assert_eq!(observer.observed_index(), None);
    }
}
