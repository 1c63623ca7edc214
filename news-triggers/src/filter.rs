use tracing::debug;

use crate::trigger::TriggerList;
use crate::types::NewsItem;

/// Keep the items at least one active trigger fires on.
///
/// Input order is preserved and each item appears at most once, however many
/// triggers accept it. Items sharing a guid are not merged here; that is up
/// to the presenter.
pub fn filter_items(items: &[NewsItem], active: &TriggerList) -> Vec<NewsItem> {
    matching(items, active).cloned().collect()
}

/// Borrowing form of [`filter_items`].
pub fn matching<'a>(
    items: &'a [NewsItem],
    active: &'a TriggerList,
) -> impl Iterator<Item = &'a NewsItem> + 'a {
    items.iter().filter(move |item| {
        let fired = active.fires(item);
        if fired {
            debug!("Trigger fired for '{}' ({})", item.title, item.guid);
        }
        fired
    })
}
