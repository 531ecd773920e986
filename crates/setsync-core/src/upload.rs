//! Outbound list upload.

use crate::list::{same_content, Marker};
use std::fmt::Debug;
use tracing::trace;

/// Frames a local list into marker-tagged messages for the device, skipping
/// lists the device is already known to hold.
///
/// The reference list is whatever was last uploaded or last assembled from
/// device reports ([`ListUploader::sync_from`]). Comparison ignores order.
#[derive(Debug, Clone, Default)]
pub struct ListUploader<T> {
    known: Option<Vec<T>>,
}

impl<T: Clone + PartialEq + Debug> ListUploader<T> {
    /// Create an uploader with no knowledge of the device list.
    pub fn new() -> Self {
        ListUploader { known: None }
    }

    /// The list the device is believed to hold.
    pub fn known(&self) -> Option<&[T]> {
        self.known.as_deref()
    }

    /// Record the list the device reported.
    pub fn sync_from(&mut self, items: &[T]) {
        self.known = Some(items.to_vec());
    }

    /// Drop all knowledge, e.g. once the device is gone.
    pub fn forget(&mut self) {
        self.known = None;
    }

    /// Upload `items` unless the device already holds the same content.
    ///
    /// `send` is called once per message: an empty list goes out as a single
    /// `Empty` message without an item, otherwise items are framed
    /// `First .. None .. Last` (or `FirstLast` for a single item).
    pub fn push<S>(&mut self, items: &[T], mut send: S) -> bool
    where
        S: FnMut(Option<&T>, Marker),
    {
        if let Some(known) = &self.known {
            if same_content(known, items) {
                trace!(len = items.len(), "list already on device, not uploading");
                return false;
            }
        }

        let last = items.len().saturating_sub(1);
        if items.is_empty() {
            send(None, Marker::Empty);
        }
        for (index, item) in items.iter().enumerate() {
            let marker = match (index == 0, index == last) {
                (true, true) => Marker::FirstLast,
                (true, false) => Marker::First,
                (false, true) => Marker::Last,
                (false, false) => Marker::None,
            };
            send(Some(item), marker);
        }
        self.known = Some(items.to_vec());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(uploader: &mut ListUploader<char>, items: &[char]) -> Vec<(Option<char>, Marker)> {
        let mut sent = Vec::new();
        uploader.push(items, |item, marker| sent.push((item.copied(), marker)));
        sent
    }

    #[test]
    fn test_framing() {
        let mut uploader = ListUploader::new();
        let sent = collect(&mut uploader, &['x', 'y', 'z']);
        assert_eq!(
            sent,
            vec![
                (Some('x'), Marker::First),
                (Some('y'), Marker::None),
                (Some('z'), Marker::Last),
            ]
        );
    }

    #[test]
    fn test_single_and_empty() {
        let mut uploader = ListUploader::new();
        assert_eq!(collect(&mut uploader, &['x']), vec![(Some('x'), Marker::FirstLast)]);
        assert_eq!(collect(&mut uploader, &[]), vec![(None, Marker::Empty)]);
    }

    #[test]
    fn test_reordered_list_is_not_resent() {
        let mut uploader = ListUploader::new();
        assert_eq!(collect(&mut uploader, &['x', 'y']).len(), 2);
        assert!(collect(&mut uploader, &['y', 'x']).is_empty());
    }

    #[test]
    fn test_synced_list_is_not_resent() {
        let mut uploader = ListUploader::new();
        uploader.sync_from(&['a', 'b']);
        assert!(!uploader.push(&['b', 'a'], |_, _| panic!("already on device")));

        uploader.forget();
        assert!(uploader.push(&['b', 'a'], |_, _| {}));
    }
}
